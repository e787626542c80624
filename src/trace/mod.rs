//! The trace-stream driver: a lazy, restartable producer of `WorkloadOp`
//! records per rank, with a *pull next* + *push back* contract matching the
//! simulator's forward/reverse event model.

pub mod buffer;
pub mod reader;
pub mod registry;

pub use buffer::TraceBuffer;
pub use reader::{RawCall, RawCallEvent, TraceReaderAdapter, TraceSource, WallTime};
pub use registry::RankRegistry;
