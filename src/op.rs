//! The canonical operation type produced by the Trace Buffer, and the
//! matching-constraint sum types that replace the trace's sentinel `-1`
//! wildcards.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// An MPI rank, as assigned by the application's communicator.
pub type Rank = i32;

/// An MPI message tag.
pub type Tag = i32;

/// A non-blocking request identifier as recorded in the trace.
///
/// Reused by the application: unique only over the set of currently
/// outstanding requests for one rank, never globally.
pub type RequestId = u16;

/// Simulated time, in seconds, as reported by the `Kernel` collaborator.
pub type SimTime = f64;

/// Inline capacity for request-id lists on `Waitall`/`Waitsome`/`Waitany` —
/// sized for the common small collective wait groups traces exhibit, falling
/// back to a heap allocation past that without changing the type.
pub type RequestIdList = SmallVec<[RequestId; 8]>;

/// A source-rank matching constraint: either a specific rank or the
/// wildcard `MPI_ANY_SOURCE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchRank {
    /// `MPI_ANY_SOURCE`.
    Any,
    /// A specific source rank.
    Specific(Rank),
}

impl MatchRank {
    /// Converts the trace wire sentinel (`-1` means wildcard) into the sum
    /// type representation.
    pub fn from_wire(value: Rank) -> Self {
        if value == -1 {
            MatchRank::Any
        } else {
            MatchRank::Specific(value)
        }
    }

    /// Converts back to the sentinel representation, for logging or
    /// re-serialization at a boundary that still speaks raw trace values.
    pub fn to_wire(self) -> Rank {
        match self {
            MatchRank::Any => -1,
            MatchRank::Specific(r) => r,
        }
    }

    /// Whether this constraint accepts the given concrete rank.
    pub fn matches(self, rank: Rank) -> bool {
        match self {
            MatchRank::Any => true,
            MatchRank::Specific(r) => r == rank,
        }
    }
}

/// A tag matching constraint: either a specific tag or `MPI_ANY_TAG`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchTag {
    /// `MPI_ANY_TAG`.
    Any,
    /// A specific tag.
    Specific(Tag),
}

impl MatchTag {
    /// Converts the trace wire sentinel (`-1` means wildcard) into the sum
    /// type representation.
    pub fn from_wire(value: Tag) -> Self {
        if value == -1 {
            MatchTag::Any
        } else {
            MatchTag::Specific(value)
        }
    }

    /// Converts back to the sentinel representation.
    pub fn to_wire(self) -> Tag {
        match self {
            MatchTag::Any => -1,
            MatchTag::Specific(t) => t,
        }
    }

    /// Whether this constraint accepts the given concrete tag.
    pub fn matches(self, tag: Tag) -> bool {
        match self {
            MatchTag::Any => true,
            MatchTag::Specific(t) => t == tag,
        }
    }
}

/// The aggregate collectives modeled by byte count only — never decomposed
/// into their constituent point-to-point messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectiveKind {
    /// `MPI_Bcast`.
    Bcast,
    /// `MPI_Allgather`.
    Allgather,
    /// `MPI_Allgatherv`.
    Allgatherv,
    /// `MPI_Alltoall`.
    Alltoall,
    /// `MPI_Alltoallv`.
    Alltoallv,
    /// `MPI_Reduce`.
    Reduce,
    /// `MPI_Allreduce`.
    Allreduce,
}

/// The unit produced by the Trace Buffer: a tagged variant over every kind
/// of replayed MPI call, plus the internal `Delay` op synthesized from
/// wall-clock gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorkloadOp {
    /// A point-to-point send, blocking (`MPI_Send`) or non-blocking
    /// (`MPI_Isend`) per `blocking`.
    Send {
        /// Message tag.
        tag: Tag,
        /// Sending rank (always this rank, carried anyway as recorded).
        src: Rank,
        /// Destination rank.
        dst: Rank,
        /// Payload size in bytes.
        bytes: u64,
        /// Request id, present for non-blocking sends.
        req_id: Option<RequestId>,
        /// `false` for `MPI_Isend`.
        blocking: bool,
    },
    /// A point-to-point receive, blocking (`MPI_Recv`) or non-blocking
    /// (`MPI_Irecv`) per `blocking`.
    Recv {
        /// Tag constraint, possibly `MPI_ANY_TAG`.
        tag: MatchTag,
        /// Source constraint, possibly `MPI_ANY_SOURCE`.
        src: MatchRank,
        /// Buffer capacity in bytes.
        bytes: u64,
        /// Request id, present for non-blocking receives.
        req_id: Option<RequestId>,
        /// `false` for `MPI_Irecv`.
        blocking: bool,
    },
    /// A synthesized compute delay, derived from an inter-call wall-clock
    /// gap exceeding the 100ns threshold.
    Delay {
        /// Duration of the delay.
        nanoseconds: u64,
    },
    /// An opaque collective, modeled only by aggregate byte count.
    Collective {
        /// Which collective this call was.
        kind: CollectiveKind,
        /// Aggregate bytes moved.
        bytes: u64,
    },
    /// `MPI_Wait` on a single request.
    Wait {
        /// The request to wait on.
        req_id: RequestId,
    },
    /// `MPI_Waitall` on every request in the list.
    Waitall {
        /// Requests to wait on; all must complete.
        req_ids: RequestIdList,
    },
    /// `MPI_Waitsome`: ready once at least one request in the list
    /// completes.
    Waitsome {
        /// Requests to wait on.
        req_ids: RequestIdList,
    },
    /// `MPI_Waitany`: ready once at least one request in the list
    /// completes, resolving exactly one.
    Waitany {
        /// Requests to wait on.
        req_ids: RequestIdList,
    },
    /// `MPI_Request_free`, releasing a request id without waiting on it.
    ReqFree {
        /// The request being released.
        req_id: RequestId,
    },
    /// The trace is exhausted; finalizes the LP.
    End,
}

impl WorkloadOp {
    /// A short, stable label for the op's discriminant, used in `tracing`
    /// fields where logging the full payload would be noisy.
    pub fn kind_label(&self) -> &'static str {
        match self {
            WorkloadOp::Send { .. } => "send",
            WorkloadOp::Recv { .. } => "recv",
            WorkloadOp::Delay { .. } => "delay",
            WorkloadOp::Collective { .. } => "collective",
            WorkloadOp::Wait { .. } => "wait",
            WorkloadOp::Waitall { .. } => "waitall",
            WorkloadOp::Waitsome { .. } => "waitsome",
            WorkloadOp::Waitany { .. } => "waitany",
            WorkloadOp::ReqFree { .. } => "req_free",
            WorkloadOp::End => "end",
        }
    }
}

/// A `WorkloadOp` together with the timing and ordering metadata every op
/// carries per the data model: wall-clock-derived `start_time`/`end_time`
/// (seconds, normalized against the rank's `init_wall`) and the
/// monotonically increasing `sequence_id` the Trace Buffer assigns at pop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedOp {
    /// The operation itself.
    pub op: WorkloadOp,
    /// Wall-clock-derived start time, seconds since `init_wall`.
    pub start_time: SimTime,
    /// Wall-clock-derived end time, seconds since `init_wall`.
    pub end_time: SimTime,
    /// Assigned by `TraceBuffer::get_next`; decremented back by
    /// `roll_back_prev`.
    pub sequence_id: u64,
}

impl TimedOp {
    /// Builds a `TimedOp` with a not-yet-assigned sequence id (`0`); the
    /// Trace Buffer overwrites it at pop time.
    pub fn new(op: WorkloadOp, start_time: SimTime, end_time: SimTime) -> Self {
        TimedOp {
            op,
            start_time,
            end_time,
            sequence_id: 0,
        }
    }

    /// Encodes this op with `bincode`, the wire format a `NetworkModel`
    /// implementation that actually crosses a process or node boundary
    /// would ship instead of the in-process value `send_event` carries
    /// here. Not used by this crate's own trait boundary — `send_event`
    /// passes `TimedOp` by value since every collaborator in this crate's
    /// tests and bundled demo lives in the same process — but available to
    /// a production `NetworkModel` that needs to actually serialize the
    /// payload, per `SPEC_FULL.md` §6.
    pub fn to_wire_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Decodes a `TimedOp` previously encoded with [`TimedOp::to_wire_bytes`].
    pub fn from_wire_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip_preserves_the_op() {
        let op = TimedOp::new(
            WorkloadOp::Send {
                tag: 7,
                src: 0,
                dst: 1,
                bytes: 100,
                req_id: Some(1),
                blocking: false,
            },
            1.0,
            1.5,
        );
        let bytes = op.to_wire_bytes().unwrap();
        let decoded = TimedOp::from_wire_bytes(&bytes).unwrap();
        assert_eq!(decoded, op);
    }
}
