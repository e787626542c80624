//! Per-NW-LP bookkeeping: the arrival/pending-receive FIFOs, the completed
//! request set, the single pending-wait slot, and every scalar counter and
//! timing accumulator reported at finalize.

use std::collections::{HashSet, VecDeque};

use crate::op::{MatchRank, MatchTag, Rank, RequestId, RequestIdList, SimTime, Tag};
use crate::rng::Jitter;

/// A send that arrived at this LP and either matched a posted receive
/// immediately or was queued in `arrival_queue` awaiting one.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivedSend {
    /// Tag the sender attached.
    pub tag: Tag,
    /// Rank it was sent from.
    pub src: Rank,
    /// Payload size in bytes.
    pub bytes: u64,
    /// The sender's own request id, echoed back on completion.
    pub req_id: Option<RequestId>,
    /// Whether the sender issued this as a blocking `MPI_Send`.
    pub blocking: bool,
    /// Simulated time the send was issued, used to charge `recv_time` once
    /// matched: `recv_time += now - sim_start_time`.
    pub sim_start_time: SimTime,
}

/// A receive this LP posted and either matched an arrived send immediately
/// or was queued in `pending_recvs` awaiting one.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedRecv {
    /// Tag constraint, possibly wildcard.
    pub tag: MatchTag,
    /// Source constraint, possibly wildcard.
    pub src: MatchRank,
    /// Buffer capacity in bytes.
    pub bytes: u64,
    /// This receive's own request id.
    pub req_id: Option<RequestId>,
    /// Whether this was a blocking `MPI_Recv`.
    pub blocking: bool,
    /// Simulated time the receive was posted.
    pub sim_start_time: SimTime,
}

/// The kind of wait the LP is currently suspended on.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitKind {
    /// `MPI_Wait` on a single request.
    Single(RequestId),
    /// `MPI_Waitall`: ready only once every id is complete.
    All(RequestIdList),
    /// `MPI_Waitsome`: ready once at least one id is complete.
    Some(RequestIdList),
    /// `MPI_Waitany`: ready once at least one id is complete, resolving
    /// exactly one (the REDESIGNED semantics; see `SPEC_FULL.md` §4.3).
    Any(RequestIdList),
}

impl WaitKind {
    /// The full id list this wait was posted against, regardless of kind.
    pub fn ids(&self) -> &[RequestId] {
        match self {
            WaitKind::Single(id) => std::slice::from_ref(id),
            WaitKind::All(ids) | WaitKind::Some(ids) | WaitKind::Any(ids) => ids,
        }
    }
}

/// At most one of these exists on an `LpState` at a time — the invariant
/// that an LP has at most one outstanding wait.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWait {
    /// Which wait call, and on which ids.
    pub op: WaitKind,
    /// How many of `op`'s ids have completed so far.
    pub num_completed: usize,
    /// Simulated time the wait was posted, for charging `wait_time`.
    pub start_time: SimTime,
}

/// Monotonic call counters, reported verbatim in the per-LP finalize line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    /// Total `Send`/`ISend` ops pulled from the buffer.
    pub num_sends: u64,
    /// Total `Recv`/`IRecv` ops pulled from the buffer.
    pub num_recvs: u64,
    /// Total `Collective` ops.
    pub num_collectives: u64,
    /// Total synthesized `Delay` ops.
    pub num_delays: u64,
    /// Total `Wait` (single) ops.
    pub num_waits: u64,
    /// Total `Waitall` ops.
    pub num_waitalls: u64,
    /// Total `Waitsome` ops. `[SUPPLEMENT]` — the original counts these
    /// but never reports them at finalize; kept here for introspection and
    /// the `--format json` output.
    pub num_waitsomes: u64,
    /// Total `Waitany` ops. `[SUPPLEMENT]` — the original never counts
    /// these since its `Waitany` was a no-op; meaningful now that
    /// `Waitany` has real suspend-until-one semantics (§4.3 REDESIGN).
    pub num_waitanys: u64,
    /// Total bytes sent.
    pub bytes_sent: u64,
    /// Total bytes received.
    pub bytes_recvd: u64,
    /// `MPI_Request_free` calls naming an id this LP has no record of —
    /// benign per `SPEC_FULL.md` §4.5, counted rather than propagated.
    pub req_not_found: u64,
}

/// Simulated-time accumulators, in seconds, reported at finalize.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingAccumulators {
    /// Time attributed to synthesized `Delay` ops.
    pub compute_time: SimTime,
    /// Time between issuing a blocking send and its local completion.
    pub send_time: SimTime,
    /// Time between a send's arrival and the posted receive it matched, or
    /// time spent blocked on an unmatched receive.
    pub recv_time: SimTime,
    /// Time spent suspended on any `Wait*`.
    pub wait_time: SimTime,
    /// Time spent scanning matching queues (charged per scan, not per
    /// element — a coarse proxy the original also used).
    pub search_overhead: SimTime,
    /// Total simulated lifetime of the LP, start to `End`.
    pub elapsed_time: SimTime,
}

/// The high-level phase an LP is in, mirroring `SPEC_FULL.md` §4.4's state
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LpStatus {
    /// Actively issuing ops; will self-schedule `GET_NEXT` when idle.
    Running,
    /// Blocked in a synchronous `MPI_Recv` with no matching arrival yet.
    WaitingOnBlockingRecv,
    /// Suspended in `pending_wait`.
    WaitingOnWaitOp,
    /// Blocked in a synchronous `MPI_Send` awaiting local completion.
    WaitingOnBlockingSendLocal,
    /// The trace reached `End`; terminal.
    Done,
}

/// All per-NW-LP state. Created once by `init`, mutated only by the event
/// dispatcher, finalized when the trace emits `End`.
#[derive(Debug, Clone)]
pub struct LpState {
    /// Application this rank belongs to.
    pub app_id: u32,
    /// This LP's rank within its application.
    pub rank: Rank,
    /// FIFO of arrived-but-unmatched sends, in arrival order.
    pub arrival_queue: VecDeque<ArrivedSend>,
    /// FIFO of posted-but-unmatched receives, in post order.
    pub pending_recvs: VecDeque<PostedRecv>,
    /// Request ids whose non-blocking op has concluded locally and is
    /// awaiting a matching `Wait*`/`ReqFree`.
    pub completed_reqs: HashSet<RequestId>,
    /// The single outstanding wait descriptor, if any.
    pub pending_wait: Option<PendingWait>,
    /// Scalar call counters.
    pub counters: Counters,
    /// Simulated-time accumulators.
    pub timing: TimingAccumulators,
    /// This LP's jittered self-scheduling draw stream.
    pub jitter: Jitter,
    /// Current high-level phase.
    pub status: LpStatus,
}

impl LpState {
    /// Constructs a freshly initialized LP. `seed` should be derived from
    /// `(app_id, rank)` so reruns (and the forward/reverse replay within one
    /// run) draw identical jitter sequences.
    pub fn new(app_id: u32, rank: Rank, seed: u64) -> Self {
        LpState {
            app_id,
            rank,
            arrival_queue: VecDeque::new(),
            pending_recvs: VecDeque::new(),
            completed_reqs: HashSet::new(),
            pending_wait: None,
            counters: Counters::default(),
            timing: TimingAccumulators::default(),
            jitter: Jitter::new(seed),
            status: LpStatus::Running,
        }
    }

    /// Whether this LP has reached `End`.
    pub fn is_done(&self) -> bool {
        matches!(self.status, LpStatus::Done)
    }
}
