//! Error taxonomy for the crate, split along the boundaries `SPEC_FULL.md`
//! §7 draws: configuration, trace format, and internal state-machine
//! consistency. Benign anomalies (an unknown request ID freed, an unmatched
//! op left at `End`) are deliberately not represented here — they are
//! `tracing::warn!` events plus a counter bump on `LpState`, never an `Err`.

use thiserror::Error;

use crate::op::Rank;

/// Errors raised while parsing and validating the CLI/config surface.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// `--workload-type scalatrace` was selected without `--offset-file`.
    ///
    /// Validated eagerly in [`crate::config::Config::parse`], not lazily at
    /// LP construction time — see `SPEC_FULL.md` §9 on the scalatrace
    /// uninitialized-offset-file bug this sidesteps.
    #[error("--offset-file is required when --workload-type=scalatrace")]
    MissingOffsetFile,

    /// `--network` named something outside the four supported topologies.
    #[error("unknown network model `{0}`, expected one of: torus, dragonfly, simplenet, loggp")]
    UnknownNetwork(String),

    /// `--num-net-traces` failed to parse as a positive integer.
    #[error("invalid --num-net-traces value `{0}`: must be a positive integer")]
    InvalidTraceCount(String),

    /// Argument parsing itself failed (missing required flag, bad syntax).
    #[error(transparent)]
    Parse(#[from] clap::Error),
}

/// Errors surfaced by the Trace Buffer / Trace Reader Adapter.
///
/// All three variants are fatal per `SPEC_FULL.md` §4.1's failure model;
/// callers propagate them with `?` up to the binary, which reports them and
/// exits rather than attempting to continue the replay.
#[derive(Debug, Error)]
pub enum TraceError {
    /// The per-rank trace file named by `--workload-file` does not exist.
    #[error("no trace file for app {app_id} rank {rank}")]
    MissingTraceFile {
        /// Application id the rank belongs to.
        app_id: u32,
        /// Rank within the application.
        rank: Rank,
    },

    /// A raw trace call named an MPI datatype the reader cannot size.
    #[error("unknown datatype `{datatype}` for app {app_id} rank {rank}")]
    UnknownDatatype {
        /// Application id the rank belongs to.
        app_id: u32,
        /// Rank within the application.
        rank: Rank,
        /// The datatype token the trace reader could not resolve.
        datatype: String,
    },

    /// The trace named an MPI call this crate never models (`Comm_dup`,
    /// `Comm_create`): these rebind the communicator the whole engine
    /// assumes is `MPI_COMM_WORLD`, so there is no sound way to continue.
    #[error("unsupported MPI call `{call}` for app {app_id} rank {rank}")]
    UnsupportedCall {
        /// Application id the rank belongs to.
        app_id: u32,
        /// Rank within the application.
        rank: Rank,
        /// Name of the unsupported call.
        call: &'static str,
    },
}

/// An internal consistency violation: a mis-paired forward/reverse handler,
/// or a matching scan that found a condition the invariants rule out.
///
/// `SPEC_FULL.md` §7 classifies these as fatal: logged via `tracing::error!`
/// and then panicked, since there is no separate "abort but keep going"
/// signal available at this layer — the `Kernel` collaborator's own
/// supervision is expected to catch the unwind.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The reverse stack was empty on `roll_back_prev`, or a queue removal
    /// was asked to undo at an index past the queue's current length.
    #[error("internal consistency violation: {0}")]
    Inconsistent(String),
}
