//! Per-NW-LP state and behavior: bookkeeping (`state`), the MPI matching
//! predicate and FIFO queues (`matching`), the suspension/resume machine
//! for `Wait*` ops (`wait`), and the event dispatcher tying them together
//! with the Trace Buffer and the out-of-scope collaborators (`dispatcher`).

pub mod dispatcher;
pub mod matching;
pub mod state;
pub mod wait;

pub use state::LpState;
