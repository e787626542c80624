//! S1. Ordered pair (`spec.md` §8): LP0 `ISend(to=1, tag=7, 100B, req=1);
//! Wait(1)`, LP1 `IRecv(src=0, tag=7, 100B, req=1); Wait(1)`. Both reach
//! `End` with empty `completed_reqs`, matching byte counters, and no
//! unmatched queues.

use nw_replay::lp::dispatcher;
use nw_replay::lp::state::{LpState, LpStatus};
use nw_replay::net::{InternalEvent, NetworkTopology};
use nw_replay::testkit::{IdentityRankMapper, RecordingKernel, RecordingNet, ScriptedSource};
use nw_replay::trace::buffer::TraceBuffer;
use nw_replay::trace::reader::{RawCall, RawCallEvent, WallTime};

fn call(c: RawCall) -> RawCallEvent {
    RawCallEvent { call: c, wall: WallTime { start_ns: 0.0, end_ns: 0.0 } }
}

#[test]
fn ordered_pair_reaches_end_with_clean_state() {
    let topology = NetworkTopology::Simplenet;
    let mapper = IdentityRankMapper;
    let mut net = RecordingNet::default();

    let mut lp0 = LpState::new(0, 0, 1);
    let mut kernel0 = RecordingKernel::new(0.001);
    let mut buf0 = TraceBuffer::new(
        ScriptedSource::new(vec![
            call(RawCall::Send { tag: 7, dst: 1, bytes: 100, blocking: false, req_id: Some(1) }),
            call(RawCall::Wait { req_id: 1 }),
        ]),
        0,
        0,
    );

    let mut lp1 = LpState::new(0, 1, 2);
    let mut kernel1 = RecordingKernel::new(0.001);
    let mut buf1 = TraceBuffer::new(
        ScriptedSource::new(vec![
            call(RawCall::Recv { tag: 7, src: 0, bytes: 100, blocking: false, req_id: Some(1) }),
            call(RawCall::Wait { req_id: 1 }),
        ]),
        0,
        1,
    );

    dispatcher::on_get_next(&mut lp0, 0, &topology, &mut buf0, &mut kernel0, &mut net, &mapper).unwrap();
    let (_, _, _, sent) = net.sent.last().expect("Send issues a send_event").clone();
    kernel0.scheduled.clear();
    dispatcher::on_send_posted(&mut lp0, 0, &mut kernel0, &sent);
    advance(&mut kernel0);

    dispatcher::on_get_next(&mut lp0, 0, &topology, &mut buf0, &mut kernel0, &mut net, &mapper).unwrap();
    dispatcher::on_get_next(&mut lp0, 0, &topology, &mut buf0, &mut kernel0, &mut net, &mapper).unwrap();

    dispatcher::on_get_next(&mut lp1, 1, &topology, &mut buf1, &mut kernel1, &mut net, &mapper).unwrap();
    dispatcher::on_get_next(&mut lp1, 1, &topology, &mut buf1, &mut kernel1, &mut net, &mapper).unwrap();
    kernel1.scheduled.clear();
    dispatcher::on_send_arrived(&mut lp1, 1, &mut kernel1, &sent);
    advance(&mut kernel1);
    dispatcher::on_get_next(&mut lp1, 1, &topology, &mut buf1, &mut kernel1, &mut net, &mapper).unwrap();

    assert_eq!(lp0.status, LpStatus::Done);
    assert_eq!(lp1.status, LpStatus::Done);
    assert!(lp0.completed_reqs.is_empty());
    assert!(lp1.completed_reqs.is_empty());
    assert!(lp0.arrival_queue.is_empty());
    assert!(lp1.pending_recvs.is_empty());
    assert_eq!(lp0.counters.bytes_sent, 100);
    assert_eq!(lp1.counters.bytes_recvd, 100);
}

fn advance(kernel: &mut RecordingKernel) {
    if let Some((_, delay, InternalEvent::GetNext)) = kernel.scheduled.last() {
        kernel.advance(*delay);
    }
}
