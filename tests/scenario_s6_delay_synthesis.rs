//! S6. Delay synthesis (`spec.md` §8): a rank's two consecutive MPI calls
//! with wall-clock gap 500 ns produce exactly one `Delay{500}` op between
//! them; a gap of 40 ns produces no `Delay`.

use nw_replay::op::WorkloadOp;
use nw_replay::testkit::ScriptedSource;
use nw_replay::trace::reader::{RawCall, RawCallEvent, TraceReaderAdapter, WallTime};

fn event(call: RawCall, start_ns: f64, end_ns: f64) -> RawCallEvent {
    RawCallEvent { call, wall: WallTime { start_ns, end_ns } }
}

#[test]
fn gap_of_500ns_synthesizes_one_delay() {
    let events = vec![
        event(RawCall::Wait { req_id: 1 }, 0.0, 0.0),
        event(RawCall::Wait { req_id: 2 }, 500.0, 510.0),
    ];
    let mut adapter = TraceReaderAdapter::new(ScriptedSource::new(events), 0, 0);
    adapter.pull().unwrap();
    let ops = adapter.pull().unwrap();

    assert_eq!(ops.len(), 2, "a leading Delay, then the call's own op");
    match &ops[0].op {
        WorkloadOp::Delay { nanoseconds } => assert_eq!(*nanoseconds, 500),
        other => panic!("expected Delay, got {other:?}"),
    }
    assert!(matches!(ops[1].op, WorkloadOp::Wait { req_id: 2 }));
}

#[test]
fn gap_of_40ns_produces_no_delay() {
    let events = vec![
        event(RawCall::Wait { req_id: 1 }, 0.0, 0.0),
        event(RawCall::Wait { req_id: 2 }, 40.0, 45.0),
    ];
    let mut adapter = TraceReaderAdapter::new(ScriptedSource::new(events), 0, 0);
    adapter.pull().unwrap();
    let ops = adapter.pull().unwrap();

    assert_eq!(ops.len(), 1, "below the threshold, no Delay is synthesized");
    assert!(matches!(ops[0].op, WorkloadOp::Wait { req_id: 2 }));
}
