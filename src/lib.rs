//! Replays captured MPI communication traces inside a parallel
//! discrete-event simulator (PDES) to predict application runtime on a
//! modeled interconnect. Each simulated process (a network logical process,
//! "NW-LP") reads a sequence of MPI operations recorded from a real run and
//! injects the corresponding message events into a pluggable network model,
//! honoring MPI matching semantics (sender/tag/rank/wildcards), non-blocking
//! request tracking, and compute delays between calls.
//!
//! The two tightly coupled subsystems this crate owns are the MPI matching
//! and wait engine per NW-LP ([`lp`]) and the trace-stream driver
//! ([`trace`]). The PDES kernel itself, the network model that transports
//! bytes, the LP↔global-rank mapping facility, and the on-disk trace format
//! reader are out of scope — modeled as traits ([`net::Kernel`],
//! [`net::NetworkModel`], [`net::RankMapper`], [`trace::TraceSource`]) with
//! no concrete production implementation here. `[AMBIENT]` test doubles for
//! all four live in [`testkit`].
//!
//! # Glossary
//!
//! - **NW-LP.** A logical process in the PDES world representing one MPI
//!   rank replaying its trace.
//! - **PDES.** Parallel discrete-event simulator; schedules timestamped
//!   events across cooperating executors with optimistic rollback.
//! - **Reverse handler.** A function that undoes exactly what its paired
//!   forward handler did, restoring LP state.
//! - **Arrival queue.** Per-LP FIFO of sends that arrived before a matching
//!   receive was posted.
//! - **Pending-receives queue.** Per-LP FIFO of posted receives with no
//!   matching arrival yet.
//! - **Completed requests set.** Per-LP set of request IDs whose
//!   non-blocking operation has concluded and is awaiting a matching
//!   `Wait*`.
//! - **Wildcard.** An MPI matching constraint of "any source" or "any tag",
//!   represented by the sentinel `-1` in traces and by [`op::MatchRank`] /
//!   [`op::MatchTag`] everywhere else in this crate.
//! - **Lookahead.** The minimum positive timestamp delta the PDES kernel
//!   requires for any self-scheduled event; guarantees causal correctness
//!   under conservative synchronization.

pub mod config;
pub mod error;
pub mod lp;
pub mod net;
pub mod op;
pub mod rng;
pub mod summary;
pub mod trace;

pub mod testkit;

pub use config::Config;
pub use error::{ConfigError, EngineError, TraceError};
pub use lp::LpState;
pub use op::{MatchRank, MatchTag, TimedOp, WorkloadOp};
