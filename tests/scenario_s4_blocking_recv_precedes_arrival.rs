//! S4. Blocking recv precedes arrival (`spec.md` §8): LP0 executes
//! `Recv(src=1, tag=0, 100B)` (blocking). LP1 sends 100B 1 ms later. LP0 is
//! suspended for ~1 ms of simulated time; `recv_time` accumulates
//! approximately that duration; LP0 then issues `GET_NEXT`.

use nw_replay::lp::dispatcher;
use nw_replay::lp::state::{LpState, LpStatus};
use nw_replay::net::{InternalEvent, NetworkTopology};
use nw_replay::op::{TimedOp, WorkloadOp};
use nw_replay::testkit::{IdentityRankMapper, RecordingKernel, RecordingNet, ScriptedSource};
use nw_replay::trace::buffer::TraceBuffer;
use nw_replay::trace::reader::{RawCall, RawCallEvent, WallTime};

fn call(c: RawCall) -> RawCallEvent {
    RawCallEvent { call: c, wall: WallTime { start_ns: 0.0, end_ns: 0.0 } }
}

#[test]
fn blocking_recv_suspends_until_arrival_then_resumes() {
    let topology = NetworkTopology::Simplenet;
    let mapper = IdentityRankMapper;
    let mut net = RecordingNet::default();

    let mut lp0 = LpState::new(0, 0, 11);
    let mut kernel = RecordingKernel::new(0.001);
    let mut buf = TraceBuffer::new(
        ScriptedSource::new(vec![call(RawCall::Recv {
            tag: 0,
            src: 1,
            bytes: 100,
            blocking: true,
            req_id: None,
        })]),
        0,
        0,
    );

    dispatcher::on_get_next(&mut lp0, 0, &topology, &mut buf, &mut kernel, &mut net, &mapper).unwrap();
    assert_eq!(lp0.status, LpStatus::WaitingOnBlockingRecv);
    assert_eq!(lp0.pending_recvs.len(), 1);
    assert!(kernel.scheduled.is_empty(), "a blocking recv with no match does not self-schedule");

    kernel.now = 0.001;
    let send_from_lp1 = TimedOp::new(
        WorkloadOp::Send { tag: 0, src: 1, dst: 0, bytes: 100, req_id: None, blocking: true },
        0.0,
        0.0,
    );
    dispatcher::on_send_arrived(&mut lp0, 0, &mut kernel, &send_from_lp1);

    assert_eq!(lp0.status, LpStatus::Running, "the matched blocking recv resumes the LP directly");
    assert!(lp0.pending_recvs.is_empty());
    assert!((lp0.timing.recv_time - 0.001).abs() < 1e-9);
    assert!(
        matches!(kernel.scheduled.last(), Some((_, _, InternalEvent::GetNext))),
        "resuming a blocking recv self-schedules the next GET_NEXT"
    );
}
