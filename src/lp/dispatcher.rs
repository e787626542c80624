//! Event Dispatcher & Reverse Handlers: the state machine that drives one
//! NW-LP through `GET_NEXT` / `SEND_POSTED` / `SEND_ARRIVED` and back,
//! wiring the Trace Buffer, Matching Engine, Wait Engine, and jittered
//! self-scheduling together (`SPEC_FULL.md` §4.4).
//!
//! Every `on_*` function returns a small descriptor capturing exactly what
//! it changed; the matching `reverse_*` function takes that descriptor and
//! undoes it bit for bit, never by re-deriving forward logic. `now` is
//! passed into every reverse function rather than re-read from the kernel,
//! since a rollback replays the same event timestamp the forward call saw.

use tracing::warn;

use crate::error::{EngineError, TraceError};
use crate::lp::matching;
use crate::lp::state::{ArrivedSend, LpState, LpStatus, PostedRecv, WaitKind};
use crate::lp::wait::{self, NotifyOutcome, WaitEntry};
use crate::net::{dragonfly_destination, InternalEvent, Kernel, LpId, NetworkModel, NetworkTopology, RankMapper};
use crate::op::{Rank, SimTime, TimedOp, WorkloadOp};
use crate::trace::buffer::TraceBuffer;
use crate::trace::reader::TraceSource;

/// Mean of the exponential jitter component added to every self-scheduled
/// event, the source's `noise = 5.0`.
const NOISE_MEAN: f64 = 5.0;

/// Draws the next jittered offset and self-schedules `GET_NEXT` after it,
/// `extra` simulated seconds further out (nonzero only for `Delay` ops).
/// Every call here is exactly one `Jitter::draw` — callers record that a
/// draw happened so the reverse handler unrolls it, and only it.
fn schedule_get_next<K: Kernel>(lp: &mut LpState, lp_id: LpId, kernel: &mut K, extra: SimTime) {
    let delay = extra + lp.jitter.draw(kernel.lookahead(), NOISE_MEAN);
    kernel.self_event(lp_id, delay, InternalEvent::GetNext);
}

/// Resolves the destination LP for a send to `dst`, special-casing
/// dragonfly's address formula per `SPEC_FULL.md` §6.
fn resolve_destination<M: RankMapper>(app_id: u32, dst: Rank, topology: &NetworkTopology, mapper: &M) -> LpId {
    match *topology {
        NetworkTopology::Dragonfly { num_nw_lps, num_routers } => dragonfly_destination(dst, num_nw_lps, num_routers),
        _ => mapper.lp_for_rank(app_id, dst),
    }
}

/// What `GET_NEXT` did with the op it pulled, beyond the Trace Buffer pop
/// itself.
#[derive(Debug, Clone)]
pub enum GetNextDetail {
    /// `Delay`, `Collective`, `End`: only counters/timing changed.
    Trivial,
    /// A `Send`/`ISend` was handed to the network model.
    SendIssued,
    /// A posted `Recv`/`IRecv` matched an already-arrived send immediately.
    RecvMatched {
        /// Index the matched arrival was removed from.
        index: usize,
        /// The arrival removed, for exact reinsertion on reverse.
        removed: ArrivedSend,
        /// Whether its request id was inserted into `completed_reqs`.
        req_completed: bool,
    },
    /// A posted `Recv`/`IRecv` found no match and was queued.
    RecvQueued,
    /// `Wait`/`Waitall`/`Waitsome`/`Waitany` was posted.
    Wait(WaitEntry),
    /// `MPI_Request_free`, and whether the named id actually existed.
    ReqFreed {
        /// Whether `req_id` was present in `completed_reqs`.
        existed: bool,
    },
}

/// Full reverse descriptor for one `GET_NEXT` dispatch.
#[derive(Debug, Clone)]
pub struct GetNextOutcome {
    op: TimedOp,
    prior_status: LpStatus,
    jitter_drawn: bool,
    detail: GetNextDetail,
}

/// Pulls the next op from `buffer` and dispatches it, mutating `lp` and
/// driving `kernel`/`net`/`mapper` exactly as `SPEC_FULL.md` §4.4
/// specifies for `GET_NEXT`.
pub fn on_get_next<S, K, N, M>(
    lp: &mut LpState,
    lp_id: LpId,
    topology: &NetworkTopology,
    buffer: &mut TraceBuffer<S>,
    kernel: &mut K,
    net: &mut N,
    mapper: &M,
) -> Result<GetNextOutcome, TraceError>
where
    S: TraceSource,
    K: Kernel,
    N: NetworkModel,
    M: RankMapper,
{
    let op = buffer.get_next()?;
    let prior_status = lp.status;
    let now = kernel.now();
    let mut jitter_drawn = false;

    let detail = match &op.op {
        WorkloadOp::Send { dst, bytes, blocking, .. } => {
            lp.counters.num_sends += 1;
            lp.counters.bytes_sent += bytes;
            let dest_lp = resolve_destination(lp.app_id, *dst, topology, mapper);

            // Both the local-completion and remote-arrival payloads carry
            // the simulated issue time in `start_time`, overwriting the
            // wall-clock-derived value the Trace Buffer produced — the
            // field this op no longer needs once it leaves the buffer.
            let mut wire = op.clone();
            wire.start_time = now;
            net.send_event(lp_id, dest_lp, *bytes, wire);

            if *blocking {
                lp.status = LpStatus::WaitingOnBlockingSendLocal;
            } else {
                schedule_get_next(lp, lp_id, kernel, 0.0);
                jitter_drawn = true;
            }
            GetNextDetail::SendIssued
        }
        WorkloadOp::Recv { tag, src, bytes, req_id, blocking } => {
            lp.counters.num_recvs += 1;
            lp.counters.bytes_recvd += bytes;
            match matching::find_matching_arrival(&lp.arrival_queue, *tag, *src, *bytes) {
                Some(index) => {
                    let removed = matching::remove_arrival_at(&mut lp.arrival_queue, index);
                    lp.timing.recv_time += now - removed.sim_start_time;
                    let req_completed = if let Some(id) = req_id {
                        lp.completed_reqs.insert(*id);
                        true
                    } else {
                        false
                    };
                    schedule_get_next(lp, lp_id, kernel, 0.0);
                    jitter_drawn = true;
                    GetNextDetail::RecvMatched { index, removed, req_completed }
                }
                None => {
                    lp.pending_recvs.push_back(PostedRecv {
                        tag: *tag,
                        src: *src,
                        bytes: *bytes,
                        req_id: *req_id,
                        blocking: *blocking,
                        sim_start_time: now,
                    });
                    if *blocking {
                        lp.status = LpStatus::WaitingOnBlockingRecv;
                    } else {
                        schedule_get_next(lp, lp_id, kernel, 0.0);
                        jitter_drawn = true;
                    }
                    GetNextDetail::RecvQueued
                }
            }
        }
        WorkloadOp::Delay { nanoseconds } => {
            lp.counters.num_delays += 1;
            lp.timing.compute_time += *nanoseconds as SimTime;
            schedule_get_next(lp, lp_id, kernel, *nanoseconds as SimTime);
            jitter_drawn = true;
            GetNextDetail::Trivial
        }
        WorkloadOp::Collective { .. } => {
            lp.counters.num_collectives += 1;
            schedule_get_next(lp, lp_id, kernel, 0.0);
            jitter_drawn = true;
            GetNextDetail::Trivial
        }
        WorkloadOp::Wait { req_id } => {
            lp.counters.num_waits += 1;
            let entry = wait::enter_wait(lp, WaitKind::Single(*req_id), now);
            if let WaitEntry::Satisfied(_) = &entry {
                schedule_get_next(lp, lp_id, kernel, 0.0);
                jitter_drawn = true;
            } else {
                lp.status = LpStatus::WaitingOnWaitOp;
            }
            GetNextDetail::Wait(entry)
        }
        WorkloadOp::Waitall { req_ids } => {
            lp.counters.num_waitalls += 1;
            let entry = wait::enter_wait(lp, WaitKind::All(req_ids.clone()), now);
            if let WaitEntry::Satisfied(_) = &entry {
                schedule_get_next(lp, lp_id, kernel, 0.0);
                jitter_drawn = true;
            } else {
                lp.status = LpStatus::WaitingOnWaitOp;
            }
            GetNextDetail::Wait(entry)
        }
        WorkloadOp::Waitsome { req_ids } => {
            lp.counters.num_waitsomes += 1;
            let entry = wait::enter_wait(lp, WaitKind::Some(req_ids.clone()), now);
            if let WaitEntry::Satisfied(_) = &entry {
                schedule_get_next(lp, lp_id, kernel, 0.0);
                jitter_drawn = true;
            } else {
                lp.status = LpStatus::WaitingOnWaitOp;
            }
            GetNextDetail::Wait(entry)
        }
        WorkloadOp::Waitany { req_ids } => {
            lp.counters.num_waitanys += 1;
            let entry = wait::enter_wait(lp, WaitKind::Any(req_ids.clone()), now);
            if let WaitEntry::Satisfied(_) = &entry {
                schedule_get_next(lp, lp_id, kernel, 0.0);
                jitter_drawn = true;
            } else {
                lp.status = LpStatus::WaitingOnWaitOp;
            }
            GetNextDetail::Wait(entry)
        }
        WorkloadOp::ReqFree { req_id } => {
            let existed = lp.completed_reqs.remove(req_id);
            if !existed {
                lp.counters.req_not_found += 1;
                warn!(app = lp.app_id, rank = lp.rank, req_id, "MPI_Request_free on unknown request id");
            }
            schedule_get_next(lp, lp_id, kernel, 0.0);
            jitter_drawn = true;
            GetNextDetail::ReqFreed { existed }
        }
        WorkloadOp::End => {
            lp.status = LpStatus::Done;
            lp.timing.elapsed_time = now;
            GetNextDetail::Trivial
        }
    };

    Ok(GetNextOutcome { op, prior_status, jitter_drawn, detail })
}

/// Undoes [`on_get_next`]: restores counters, queues, `completed_reqs`,
/// status, unrolls the jitter draw if one was taken, then rolls the Trace
/// Buffer back.
pub fn reverse_get_next<S: TraceSource>(
    lp: &mut LpState,
    buffer: &mut TraceBuffer<S>,
    outcome: &GetNextOutcome,
    now: SimTime,
) -> Result<(), EngineError> {
    match &outcome.detail {
        GetNextDetail::Trivial => match &outcome.op.op {
            WorkloadOp::Delay { nanoseconds } => {
                lp.counters.num_delays -= 1;
                lp.timing.compute_time -= *nanoseconds as SimTime;
            }
            WorkloadOp::Collective { .. } => {
                lp.counters.num_collectives -= 1;
            }
            WorkloadOp::End => {
                lp.timing.elapsed_time = 0.0;
            }
            other => {
                return Err(EngineError::Inconsistent(format!(
                    "GetNextDetail::Trivial paired with op kind {}",
                    other.kind_label()
                )));
            }
        },
        GetNextDetail::SendIssued => {
            lp.counters.num_sends -= 1;
            if let WorkloadOp::Send { bytes, .. } = &outcome.op.op {
                lp.counters.bytes_sent -= bytes;
            }
        }
        GetNextDetail::RecvMatched { index, removed, req_completed } => {
            lp.counters.num_recvs -= 1;
            if let WorkloadOp::Recv { bytes, .. } = &outcome.op.op {
                lp.counters.bytes_recvd -= bytes;
            }
            lp.timing.recv_time -= now - removed.sim_start_time;
            if *req_completed {
                if let WorkloadOp::Recv { req_id: Some(id), .. } = &outcome.op.op {
                    lp.completed_reqs.remove(id);
                }
            }
            matching::reinsert_arrival(&mut lp.arrival_queue, *index, removed.clone());
        }
        GetNextDetail::RecvQueued => {
            lp.counters.num_recvs -= 1;
            if let WorkloadOp::Recv { bytes, .. } = &outcome.op.op {
                lp.counters.bytes_recvd -= bytes;
            }
            lp.pending_recvs.pop_back();
        }
        GetNextDetail::Wait(entry) => {
            match &outcome.op.op {
                WorkloadOp::Wait { .. } => lp.counters.num_waits -= 1,
                WorkloadOp::Waitall { .. } => lp.counters.num_waitalls -= 1,
                WorkloadOp::Waitsome { .. } => lp.counters.num_waitsomes -= 1,
                WorkloadOp::Waitany { .. } => lp.counters.num_waitanys -= 1,
                other => {
                    return Err(EngineError::Inconsistent(format!(
                        "GetNextDetail::Wait paired with op kind {}",
                        other.kind_label()
                    )));
                }
            }
            wait::reverse_enter_wait(lp, entry);
        }
        GetNextDetail::ReqFreed { existed } => {
            if *existed {
                if let WorkloadOp::ReqFree { req_id } = &outcome.op.op {
                    lp.completed_reqs.insert(*req_id);
                }
            } else {
                lp.counters.req_not_found -= 1;
            }
        }
    }

    lp.status = outcome.prior_status;
    if outcome.jitter_drawn {
        lp.jitter.unroll();
    }
    buffer.roll_back_prev()
}

/// What `SEND_POSTED` (a send's local completion at the sender) did.
#[derive(Debug, Clone)]
pub enum SendPostedDetail {
    /// A blocking `MPI_Send` completed locally and `send_time` was
    /// charged.
    Blocking,
    /// A non-blocking `MPI_Isend` completed locally: its request id
    /// entered `completed_reqs`, then possibly satisfied a pending wait.
    NonBlocking(NotifyOutcome),
}

/// Full reverse descriptor for one `SEND_POSTED` dispatch.
#[derive(Debug, Clone)]
pub struct SendPostedOutcome {
    prior_status: LpStatus,
    jitter_drawn: bool,
    detail: SendPostedDetail,
}

/// Handles a send's local completion, delivered back to the sending LP by
/// the `NetworkModel` collaborator. `op` is the same `TimedOp` handed to
/// `send_event`, so `op.start_time` still carries the simulated issue time
/// `on_get_next` stamped onto it.
pub fn on_send_posted<K: Kernel>(lp: &mut LpState, lp_id: LpId, kernel: &mut K, op: &TimedOp) -> SendPostedOutcome {
    let prior_status = lp.status;
    let now = kernel.now();
    let WorkloadOp::Send { req_id, blocking, .. } = &op.op else {
        panic!("SEND_POSTED delivered for a non-Send op");
    };

    let mut jitter_drawn = false;
    let detail = if *blocking {
        lp.timing.send_time += now - op.start_time;
        lp.status = LpStatus::Running;
        schedule_get_next(lp, lp_id, kernel, 0.0);
        jitter_drawn = true;
        SendPostedDetail::Blocking
    } else {
        let id = req_id.expect("non-blocking send always carries a request id");
        lp.completed_reqs.insert(id);
        let notify_outcome = wait::notify(lp, id, now);
        if let NotifyOutcome::Satisfied { .. } = &notify_outcome {
            schedule_get_next(lp, lp_id, kernel, 0.0);
            jitter_drawn = true;
        }
        SendPostedDetail::NonBlocking(notify_outcome)
    };

    SendPostedOutcome { prior_status, jitter_drawn, detail }
}

/// Undoes [`on_send_posted`].
pub fn reverse_send_posted(lp: &mut LpState, outcome: &SendPostedOutcome, op: &TimedOp, now: SimTime) {
    match &outcome.detail {
        SendPostedDetail::Blocking => {
            lp.timing.send_time -= now - op.start_time;
        }
        SendPostedDetail::NonBlocking(notify_outcome) => {
            wait::reverse_notify(lp, notify_outcome, now);
            if let WorkloadOp::Send { req_id: Some(id), .. } = &op.op {
                lp.completed_reqs.remove(id);
            }
        }
    }
    lp.status = outcome.prior_status;
    if outcome.jitter_drawn {
        lp.jitter.unroll();
    }
}

/// What `SEND_ARRIVED` (a peer's send landing at this LP) did.
#[derive(Debug, Clone)]
pub enum SendArrivedDetail {
    /// Matched an already-posted receive.
    Matched {
        /// Index the matched receive was removed from.
        index: usize,
        /// The receive removed, for exact reinsertion on reverse.
        removed: PostedRecv,
        /// Whether its request id was inserted into `completed_reqs`.
        req_completed: bool,
        /// `true` if the matched receive was blocking, so it resumed the
        /// LP's own `GET_NEXT` loop directly rather than going through
        /// `notify`.
        resumed_directly: bool,
        /// `notify`'s outcome, present only when the match went through
        /// the Wait Engine (non-blocking matched receive).
        notify: Option<NotifyOutcome>,
    },
    /// No posted receive matched; the send was queued onto `arrival_queue`.
    Queued,
}

/// Full reverse descriptor for one `SEND_ARRIVED` dispatch.
#[derive(Debug, Clone)]
pub struct SendArrivedOutcome {
    prior_status: LpStatus,
    jitter_drawn: bool,
    detail: SendArrivedDetail,
}

/// Handles a peer's send arriving at this LP, delivered by the
/// `NetworkModel` collaborator. `op.start_time` carries the sender's
/// simulated issue time, charged against `recv_time` on a match exactly as
/// the Matching Engine's scan from the receiving side would.
pub fn on_send_arrived<K: Kernel>(lp: &mut LpState, lp_id: LpId, kernel: &mut K, op: &TimedOp) -> SendArrivedOutcome {
    let prior_status = lp.status;
    let now = kernel.now();
    let WorkloadOp::Send { tag, src, bytes, req_id, blocking } = &op.op else {
        panic!("SEND_ARRIVED delivered for a non-Send op");
    };

    let mut jitter_drawn = false;
    let detail = match matching::find_matching_recv(&lp.pending_recvs, *tag, *src, *bytes) {
        Some(index) => {
            let removed = matching::remove_recv_at(&mut lp.pending_recvs, index);
            lp.timing.recv_time += now - op.start_time;
            let req_completed = if let Some(id) = removed.req_id {
                lp.completed_reqs.insert(id);
                true
            } else {
                false
            };
            let resumed_directly = removed.blocking;
            let notify = if resumed_directly {
                lp.status = LpStatus::Running;
                schedule_get_next(lp, lp_id, kernel, 0.0);
                jitter_drawn = true;
                None
            } else {
                let id = removed.req_id.expect("non-blocking receive always carries a request id");
                let notify_outcome = wait::notify(lp, id, now);
                if let NotifyOutcome::Satisfied { .. } = &notify_outcome {
                    schedule_get_next(lp, lp_id, kernel, 0.0);
                    jitter_drawn = true;
                }
                Some(notify_outcome)
            };
            SendArrivedDetail::Matched { index, removed, req_completed, resumed_directly, notify }
        }
        None => {
            lp.arrival_queue.push_back(ArrivedSend {
                tag: *tag,
                src: *src,
                bytes: *bytes,
                req_id: *req_id,
                blocking: *blocking,
                sim_start_time: op.start_time,
            });
            SendArrivedDetail::Queued
        }
    };

    SendArrivedOutcome { prior_status, jitter_drawn, detail }
}

/// Undoes [`on_send_arrived`].
pub fn reverse_send_arrived(lp: &mut LpState, outcome: &SendArrivedOutcome, op: &TimedOp, now: SimTime) {
    match &outcome.detail {
        SendArrivedDetail::Matched { index, removed, req_completed, notify, .. } => {
            if let Some(notify_outcome) = notify {
                wait::reverse_notify(lp, notify_outcome, now);
            }
            if *req_completed {
                if let Some(id) = removed.req_id {
                    lp.completed_reqs.remove(&id);
                }
            }
            lp.timing.recv_time -= now - op.start_time;
            matching::reinsert_recv(&mut lp.pending_recvs, *index, removed.clone());
        }
        SendArrivedDetail::Queued => {
            lp.arrival_queue.pop_back();
        }
    }
    lp.status = outcome.prior_status;
    if outcome.jitter_drawn {
        lp.jitter.unroll();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{CollectiveKind, MatchRank, MatchTag};
    use crate::trace::reader::{RawCall, RawCallEvent, WallTime};

    struct ScriptedSource {
        events: std::vec::IntoIter<RawCallEvent>,
    }

    impl ScriptedSource {
        fn new(events: Vec<RawCallEvent>) -> Self {
            ScriptedSource { events: events.into_iter() }
        }
    }

    impl TraceSource for ScriptedSource {
        fn next_call(&mut self, _app_id: u32, _rank: Rank) -> Result<Option<RawCallEvent>, TraceError> {
            Ok(self.events.next())
        }
    }

    fn call(c: RawCall) -> RawCallEvent {
        RawCallEvent { call: c, wall: WallTime { start_ns: 0.0, end_ns: 0.0 } }
    }

    fn buffer_with(events: Vec<RawCallEvent>) -> TraceBuffer<ScriptedSource> {
        TraceBuffer::new(ScriptedSource::new(events), 0, 0)
    }

    #[derive(Default)]
    struct FakeKernel {
        now: SimTime,
        lookahead: SimTime,
        scheduled: Vec<(LpId, SimTime, InternalEvent)>,
    }

    impl Kernel for FakeKernel {
        fn now(&self) -> SimTime {
            self.now
        }
        fn lookahead(&self) -> SimTime {
            self.lookahead
        }
        fn self_event(&mut self, lp: LpId, delay: SimTime, event: InternalEvent) {
            self.scheduled.push((lp, delay, event));
        }
    }

    #[derive(Default)]
    struct FakeNet {
        sent: Vec<(LpId, LpId, u64, TimedOp)>,
    }

    impl NetworkModel for FakeNet {
        fn send_event(&mut self, src: LpId, dst: LpId, bytes: u64, op: TimedOp) {
            self.sent.push((src, dst, bytes, op));
        }
    }

    struct IdentityMapper;
    impl RankMapper for IdentityMapper {
        fn lp_for_rank(&self, _app_id: u32, rank: Rank) -> LpId {
            rank as LpId
        }
    }

    fn lookahead_kernel() -> FakeKernel {
        FakeKernel { lookahead: 0.001, ..Default::default() }
    }

    #[test]
    fn blocking_send_suspends_without_jitter_draw() {
        let mut lp = LpState::new(0, 0, 1);
        let mut buf = buffer_with(vec![call(RawCall::Send { tag: 1, dst: 3, bytes: 64, blocking: true, req_id: None })]);
        let mut kernel = lookahead_kernel();
        let mut net = FakeNet::default();
        let outcome = on_get_next(&mut lp, 0, &NetworkTopology::Simplenet, &mut buf, &mut kernel, &mut net, &IdentityMapper).unwrap();
        assert_eq!(lp.status, LpStatus::WaitingOnBlockingSendLocal);
        assert_eq!(lp.counters.num_sends, 1);
        assert_eq!(kernel.scheduled.len(), 0);
        assert_eq!(net.sent.len(), 1);
        assert_eq!(lp.jitter.draw_count(), 0);

        reverse_get_next(&mut lp, &mut buf, &outcome, kernel.now()).unwrap();
        assert_eq!(lp.status, LpStatus::Running);
        assert_eq!(lp.counters.num_sends, 0);
    }

    #[test]
    fn nonblocking_send_schedules_get_next_with_jitter() {
        let mut lp = LpState::new(0, 0, 1);
        let mut buf = buffer_with(vec![call(RawCall::Send { tag: 1, dst: 3, bytes: 64, blocking: false, req_id: Some(7) })]);
        let mut kernel = lookahead_kernel();
        let mut net = FakeNet::default();
        on_get_next(&mut lp, 0, &NetworkTopology::Simplenet, &mut buf, &mut kernel, &mut net, &IdentityMapper).unwrap();
        assert_eq!(lp.status, LpStatus::Running);
        assert_eq!(kernel.scheduled.len(), 1);
        assert_eq!(lp.jitter.draw_count(), 1);
    }

    #[test]
    fn recv_matches_existing_arrival_and_charges_recv_time() {
        let mut lp = LpState::new(0, 0, 1);
        lp.arrival_queue.push_back(ArrivedSend {
            tag: 5,
            src: 2,
            bytes: 32,
            req_id: None,
            blocking: true,
            sim_start_time: 1.0,
        });
        let mut buf = buffer_with(vec![call(RawCall::Recv { tag: 5, src: 2, bytes: 32, blocking: true, req_id: None })]);
        let mut kernel = lookahead_kernel();
        kernel.now = 4.0;
        let mut net = FakeNet::default();
        let outcome = on_get_next(&mut lp, 0, &NetworkTopology::Simplenet, &mut buf, &mut kernel, &mut net, &IdentityMapper).unwrap();
        assert!(lp.arrival_queue.is_empty());
        assert_eq!(lp.timing.recv_time, 3.0);
        assert_eq!(kernel.scheduled.len(), 1);

        reverse_get_next(&mut lp, &mut buf, &outcome, kernel.now).unwrap();
        assert_eq!(lp.arrival_queue.len(), 1);
        assert_eq!(lp.timing.recv_time, 0.0);
    }

    #[test]
    fn blocking_recv_unmatched_suspends_without_jitter() {
        let mut lp = LpState::new(0, 0, 1);
        let mut buf = buffer_with(vec![call(RawCall::Recv { tag: -1, src: -1, bytes: 16, blocking: true, req_id: None })]);
        let mut kernel = lookahead_kernel();
        let mut net = FakeNet::default();
        on_get_next(&mut lp, 0, &NetworkTopology::Simplenet, &mut buf, &mut kernel, &mut net, &IdentityMapper).unwrap();
        assert_eq!(lp.status, LpStatus::WaitingOnBlockingRecv);
        assert_eq!(lp.pending_recvs.len(), 1);
        assert_eq!(kernel.scheduled.len(), 0);
    }

    #[test]
    fn nonblocking_recv_unmatched_queues_and_keeps_running() {
        let mut lp = LpState::new(0, 0, 1);
        let mut buf = buffer_with(vec![call(RawCall::Recv { tag: 1, src: 0, bytes: 16, blocking: false, req_id: Some(2) })]);
        let mut kernel = lookahead_kernel();
        let mut net = FakeNet::default();
        on_get_next(&mut lp, 0, &NetworkTopology::Simplenet, &mut buf, &mut kernel, &mut net, &IdentityMapper).unwrap();
        assert_eq!(lp.status, LpStatus::Running);
        assert_eq!(lp.pending_recvs.len(), 1);
        assert_eq!(kernel.scheduled.len(), 1);
    }

    #[test]
    fn collective_counts_and_schedules_get_next() {
        let mut lp = LpState::new(0, 0, 1);
        let mut buf = buffer_with(vec![call(RawCall::Collective { kind: CollectiveKind::Bcast, bytes: 100 })]);
        let mut kernel = lookahead_kernel();
        let mut net = FakeNet::default();
        on_get_next(&mut lp, 0, &NetworkTopology::Simplenet, &mut buf, &mut kernel, &mut net, &IdentityMapper).unwrap();
        assert_eq!(lp.counters.num_collectives, 1);
        assert_eq!(kernel.scheduled.len(), 1);
    }

    #[test]
    fn req_free_on_unknown_id_is_benign() {
        let mut lp = LpState::new(0, 0, 1);
        let mut buf = buffer_with(vec![call(RawCall::ReqFree { req_id: 9 })]);
        let mut kernel = lookahead_kernel();
        let mut net = FakeNet::default();
        let outcome = on_get_next(&mut lp, 0, &NetworkTopology::Simplenet, &mut buf, &mut kernel, &mut net, &IdentityMapper).unwrap();
        assert_eq!(lp.counters.req_not_found, 1);
        reverse_get_next(&mut lp, &mut buf, &outcome, kernel.now).unwrap();
        assert_eq!(lp.counters.req_not_found, 0);
    }

    #[test]
    fn waitall_suspends_then_send_posted_notify_resumes() {
        let mut lp = LpState::new(0, 0, 1);
        let mut buf = buffer_with(vec![call(RawCall::Waitall { req_ids: vec![1, 2] })]);
        let mut kernel = lookahead_kernel();
        let mut net = FakeNet::default();
        on_get_next(&mut lp, 0, &NetworkTopology::Simplenet, &mut buf, &mut kernel, &mut net, &IdentityMapper).unwrap();
        assert_eq!(lp.status, LpStatus::WaitingOnWaitOp);
        assert_eq!(kernel.scheduled.len(), 0);

        // request 1 completes first via a non-blocking send elsewhere in
        // the model; still not enough for Waitall.
        lp.completed_reqs.insert(1);
        let first_send = TimedOp::new(
            WorkloadOp::Send { tag: 1, src: 0, dst: 9, bytes: 8, req_id: Some(3), blocking: false },
            0.0,
            0.0,
        );
        on_send_posted(&mut lp, 0, &mut kernel, &first_send);
        assert_eq!(lp.status, LpStatus::WaitingOnWaitOp);
        assert_eq!(kernel.scheduled.len(), 0);

        // request 2 completes: now both ids are present and Waitall
        // resolves, resuming GET_NEXT.
        let second_send = TimedOp::new(
            WorkloadOp::Send { tag: 1, src: 0, dst: 9, bytes: 8, req_id: Some(2), blocking: false },
            0.0,
            0.0,
        );
        let sp_outcome = on_send_posted(&mut lp, 0, &mut kernel, &second_send);
        assert!(matches!(
            sp_outcome.detail,
            SendPostedDetail::NonBlocking(NotifyOutcome::Satisfied { .. })
        ));
        assert!(lp.pending_wait.is_none());
        assert_eq!(lp.status, LpStatus::Running);
    }

    #[test]
    fn send_arrived_matches_blocking_recv_and_resumes_directly() {
        let mut lp = LpState::new(0, 0, 1);
        lp.pending_recvs.push_back(PostedRecv {
            tag: MatchTag::Any,
            src: MatchRank::Any,
            bytes: 64,
            req_id: None,
            blocking: true,
            sim_start_time: 0.0,
        });
        lp.status = LpStatus::WaitingOnBlockingRecv;
        let mut kernel = lookahead_kernel();
        kernel.now = 2.5;
        let send_op = TimedOp::new(
            WorkloadOp::Send { tag: 7, src: 1, dst: 0, bytes: 64, req_id: None, blocking: true },
            1.0,
            1.0,
        );
        let outcome = on_send_arrived(&mut lp, 0, &mut kernel, &send_op);
        assert_eq!(lp.status, LpStatus::Running);
        assert_eq!(lp.timing.recv_time, 1.5);
        assert_eq!(kernel.scheduled.len(), 1);

        reverse_send_arrived(&mut lp, &outcome, &send_op, kernel.now);
        assert_eq!(lp.status, LpStatus::WaitingOnBlockingRecv);
        assert_eq!(lp.pending_recvs.len(), 1);
        assert_eq!(lp.timing.recv_time, 0.0);
    }

    #[test]
    fn send_arrived_unmatched_queues_onto_arrival_queue() {
        let mut lp = LpState::new(0, 0, 1);
        let mut kernel = lookahead_kernel();
        let send_op = TimedOp::new(
            WorkloadOp::Send { tag: 3, src: 1, dst: 0, bytes: 16, req_id: None, blocking: true },
            0.0,
            0.0,
        );
        let outcome = on_send_arrived(&mut lp, 0, &mut kernel, &send_op);
        assert_eq!(lp.arrival_queue.len(), 1);
        assert!(matches!(outcome.detail, SendArrivedDetail::Queued));

        reverse_send_arrived(&mut lp, &outcome, &send_op, kernel.now);
        assert!(lp.arrival_queue.is_empty());
    }
}
