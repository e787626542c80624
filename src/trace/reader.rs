//! Trace Reader Adapter: wraps the external streaming trace reader
//! (`TraceSource`, out of scope) and converts its raw MPI call records into
//! canonical [`TimedOp`] values, deriving `Delay` ops from inter-call wall
//! time and expanding `MPI_Sendrecv` per `SPEC_FULL.md` §4.1.

use smallvec::smallvec;

use crate::error::TraceError;
use crate::op::{
    CollectiveKind, MatchRank, MatchTag, Rank, RequestId, SimTime, Tag, TimedOp, WorkloadOp,
};

/// Minimum inter-call wall-clock gap, in nanoseconds, that is worth
/// synthesizing a `Delay` op for. Below this threshold the gap is assumed
/// to be instrumentation noise rather than application compute time.
pub const DELAY_THRESHOLD_NS: f64 = 100.0;

/// Wall-clock start/stop for one raw trace call, in nanoseconds, as the
/// trace reader reports it (not yet normalized against `init_wall`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallTime {
    /// Wall-clock start, nanoseconds.
    pub start_ns: f64,
    /// Wall-clock stop, nanoseconds.
    pub end_ns: f64,
}

/// One MPI call as the external trace reader reports it, already parsed
/// but not yet converted into a [`WorkloadOp`]. `-1` sentinels for
/// wildcard source/tag are preserved at this boundary; the adapter
/// converts them to [`MatchRank`]/[`MatchTag`] on ingestion.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCall {
    /// `MPI_Init`: carries no payload, only marks `init_wall`.
    Init,
    /// `MPI_Send` / `MPI_Isend`.
    Send {
        /// Message tag.
        tag: Tag,
        /// Destination rank.
        dst: Rank,
        /// Payload bytes.
        bytes: u64,
        /// `false` for `MPI_Isend`.
        blocking: bool,
        /// Request id, present for `MPI_Isend`.
        req_id: Option<RequestId>,
    },
    /// `MPI_Recv` / `MPI_Irecv`. `src`/`tag` of `-1` denote
    /// `MPI_ANY_SOURCE`/`MPI_ANY_TAG`.
    Recv {
        /// Tag, or `-1` for `MPI_ANY_TAG`.
        tag: Tag,
        /// Source rank, or `-1` for `MPI_ANY_SOURCE`.
        src: Rank,
        /// Buffer capacity in bytes.
        bytes: u64,
        /// `false` for `MPI_Irecv`.
        blocking: bool,
        /// Request id, present for `MPI_Irecv`.
        req_id: Option<RequestId>,
    },
    /// `MPI_Sendrecv`, expanded by the adapter into `ISend; Recv; Wait`.
    Sendrecv {
        /// Outgoing message tag.
        send_tag: Tag,
        /// Destination rank.
        dst: Rank,
        /// Outgoing payload bytes.
        send_bytes: u64,
        /// Incoming tag constraint, `-1` for `MPI_ANY_TAG`.
        recv_tag: Tag,
        /// Incoming source constraint, `-1` for `MPI_ANY_SOURCE`.
        recv_src: Rank,
        /// Incoming buffer capacity in bytes.
        recv_bytes: u64,
    },
    /// Any of the seven opaque collectives, modeled by aggregate byte
    /// count only.
    Collective {
        /// Which collective.
        kind: CollectiveKind,
        /// Aggregate bytes moved.
        bytes: u64,
    },
    /// `MPI_Wait`.
    Wait {
        /// Request to wait on.
        req_id: RequestId,
    },
    /// `MPI_Waitall`.
    Waitall {
        /// Requests to wait on.
        req_ids: Vec<RequestId>,
    },
    /// `MPI_Waitsome`.
    Waitsome {
        /// Requests to wait on.
        req_ids: Vec<RequestId>,
    },
    /// `MPI_Waitany`.
    Waitany {
        /// Requests to wait on.
        req_ids: Vec<RequestId>,
    },
    /// `MPI_Request_free`.
    ReqFree {
        /// Request being released.
        req_id: RequestId,
    },
    /// `MPI_Finalize`, or end of trace.
    Finalize,
    /// A datatype the reader could not size. Fatal per §4.1.
    UnknownDatatype {
        /// The offending datatype token.
        datatype: String,
    },
    /// A call this crate never models (`Comm_dup`, `Comm_create`). Fatal
    /// per §4.1 — these rebind the communicator.
    UnsupportedCall {
        /// Name of the call.
        name: &'static str,
    },
    /// Any other unmapped call: timing-only per §4.1 — produces no op of
    /// its own, only the `Delay` the adapter may prepend.
    TimingOnly,
}

/// One raw call plus the wall-clock interval the reader measured for it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCallEvent {
    /// The parsed call.
    pub call: RawCall,
    /// Its wall-clock interval.
    pub wall: WallTime,
}

/// The external streaming trace reader this crate depends on only through
/// this "read next MPI call" callback API. Out of scope per `SPEC_FULL.md`
/// §1 — no concrete implementation ships in this crate.
pub trait TraceSource {
    /// Reads the next raw call for `(app_id, rank)`. Returns `Ok(None)`
    /// once the underlying trace is exhausted (`finalize_reached`).
    fn next_call(&mut self, app_id: u32, rank: Rank) -> Result<Option<RawCallEvent>, TraceError>;

    /// Whether this source synthesizes its trace in-process rather than
    /// reading per-rank files off disk — the `--workload-file none` mode
    /// (`SPEC_FULL.md` §6). Defaults to `false`; a production `TraceSource`
    /// bound to in-process synthesis overrides it. The synthesis logic
    /// itself is out of scope here, same as every other `TraceSource`
    /// concern — this only lets the adapter log which mode it's in.
    fn is_synthetic(&self) -> bool {
        false
    }
}

/// Per-rank adapter state: the `init_wall` captured at the first observed
/// `MPI_Init`, the running `last_op_wall` cursor used for delay
/// derivation, and the synthetic request-id counter `MPI_Sendrecv`
/// expansion mints from.
#[derive(Debug, Clone, Copy, Default)]
struct AdapterState {
    init_wall: Option<f64>,
    last_op_wall: f64,
    next_synthetic_req: RequestId,
}

impl AdapterState {
    /// Normalizes a raw wall-clock timestamp against `init_wall`,
    /// capturing `init_wall` from this call if it is the first one seen.
    fn normalize(&mut self, ns: f64) -> f64 {
        let init = *self.init_wall.get_or_insert(ns);
        ns - init
    }
}

/// Converts one rank's raw MPI call stream into canonical [`TimedOp`]
/// values, owning the per-rank wall-clock and synthetic-request-id state
/// `SPEC_FULL.md` §3 calls out (`init_wall`, `last_op_wall`, `num_reqs`).
pub struct TraceReaderAdapter<S> {
    source: S,
    app_id: u32,
    rank: Rank,
    state: AdapterState,
}

impl<S: TraceSource> TraceReaderAdapter<S> {
    /// Builds an adapter bound to one `(app_id, rank)`'s call stream.
    pub fn new(source: S, app_id: u32, rank: Rank) -> Self {
        TraceReaderAdapter {
            source,
            app_id,
            rank,
            state: AdapterState::default(),
        }
    }

    /// Reads a single call from the underlying `TraceSource` and returns
    /// the ops it produces, in emission order (a leading `Delay` if the
    /// gap exceeded [`DELAY_THRESHOLD_NS`], then the call's own op(s)).
    /// Returns an empty vec, never `[End]`, when the source is exhausted —
    /// the Trace Buffer is responsible for synthesizing `End` once both
    /// the adapter and its own queue run dry.
    pub fn pull(&mut self) -> Result<Vec<TimedOp>, TraceError> {
        let event = match self.source.next_call(self.app_id, self.rank)? {
            Some(event) => event,
            None => return Ok(Vec::new()),
        };

        let start = self.state.normalize(event.wall.start_ns);
        let end = self.state.normalize(event.wall.end_ns);

        let mut ops = Vec::new();
        let gap = start - self.state.last_op_wall;
        if gap > DELAY_THRESHOLD_NS {
            ops.push(TimedOp::new(
                WorkloadOp::Delay {
                    nanoseconds: gap as u64,
                },
                self.state.last_op_wall,
                start,
            ));
        }
        self.state.last_op_wall = end;

        self.convert(event.call, start, end, &mut ops)?;
        Ok(ops)
    }

    fn convert(
        &mut self,
        call: RawCall,
        start: SimTime,
        end: SimTime,
        ops: &mut Vec<TimedOp>,
    ) -> Result<(), TraceError> {
        match call {
            RawCall::Init | RawCall::TimingOnly => {}
            RawCall::Send {
                tag,
                dst,
                bytes,
                blocking,
                req_id,
            } => ops.push(TimedOp::new(
                WorkloadOp::Send {
                    tag,
                    src: self.rank,
                    dst,
                    bytes,
                    req_id,
                    blocking,
                },
                start,
                end,
            )),
            RawCall::Recv {
                tag,
                src,
                bytes,
                blocking,
                req_id,
            } => ops.push(TimedOp::new(
                WorkloadOp::Recv {
                    tag: MatchTag::from_wire(tag),
                    src: MatchRank::from_wire(src),
                    bytes,
                    req_id,
                    blocking,
                },
                start,
                end,
            )),
            RawCall::Sendrecv {
                send_tag,
                dst,
                send_bytes,
                recv_tag,
                recv_src,
                recv_bytes,
            } => {
                let req_id = self.state.next_synthetic_req;
                self.state.next_synthetic_req = self.state.next_synthetic_req.wrapping_add(1);
                ops.push(TimedOp::new(
                    WorkloadOp::Send {
                        tag: send_tag,
                        src: self.rank,
                        dst,
                        bytes: send_bytes,
                        req_id: Some(req_id),
                        blocking: false,
                    },
                    start,
                    end,
                ));
                ops.push(TimedOp::new(
                    WorkloadOp::Recv {
                        tag: MatchTag::from_wire(recv_tag),
                        src: MatchRank::from_wire(recv_src),
                        bytes: recv_bytes,
                        req_id: None,
                        blocking: true,
                    },
                    start,
                    end,
                ));
                ops.push(TimedOp::new(WorkloadOp::Wait { req_id }, start, end));
            }
            RawCall::Collective { kind, bytes } => {
                ops.push(TimedOp::new(WorkloadOp::Collective { kind, bytes }, start, end))
            }
            RawCall::Wait { req_id } => ops.push(TimedOp::new(WorkloadOp::Wait { req_id }, start, end)),
            RawCall::Waitall { req_ids } => ops.push(TimedOp::new(
                WorkloadOp::Waitall {
                    req_ids: smallvec_from(req_ids),
                },
                start,
                end,
            )),
            RawCall::Waitsome { req_ids } => ops.push(TimedOp::new(
                WorkloadOp::Waitsome {
                    req_ids: smallvec_from(req_ids),
                },
                start,
                end,
            )),
            RawCall::Waitany { req_ids } => ops.push(TimedOp::new(
                WorkloadOp::Waitany {
                    req_ids: smallvec_from(req_ids),
                },
                start,
                end,
            )),
            RawCall::ReqFree { req_id } => {
                ops.push(TimedOp::new(WorkloadOp::ReqFree { req_id }, start, end))
            }
            RawCall::Finalize => ops.push(TimedOp::new(WorkloadOp::End, start, end)),
            RawCall::UnknownDatatype { datatype } => {
                return Err(TraceError::UnknownDatatype {
                    app_id: self.app_id,
                    rank: self.rank,
                    datatype,
                })
            }
            RawCall::UnsupportedCall { name } => {
                return Err(TraceError::UnsupportedCall {
                    app_id: self.app_id,
                    rank: self.rank,
                    call: name,
                })
            }
        }
        Ok(())
    }
}

fn smallvec_from(v: Vec<RequestId>) -> crate::op::RequestIdList {
    let mut out = smallvec![];
    out.extend(v);
    out
}
