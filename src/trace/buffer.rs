//! Trace Buffer: the per-rank double-ended op stream — a FIFO of
//! not-yet-consumed ops and a LIFO of consumed ops backing reverse
//! execution — lazily topped up from the Trace Reader Adapter.

use std::collections::VecDeque;

use tracing::trace;

use crate::error::{EngineError, TraceError};
use crate::op::{SimTime, TimedOp, WorkloadOp};
use crate::trace::reader::{TraceReaderAdapter, TraceSource};

/// A per-rank double-ended operation stream implementing the `get_next` /
/// `roll_back_prev` contract `SPEC_FULL.md` §4.1 specifies: a FIFO queue of
/// ops not yet handed to the LP, and a LIFO stack of ops already handed out
/// (for undoing them on rollback).
pub struct TraceBuffer<S> {
    app_id: u32,
    queue: VecDeque<TimedOp>,
    reverse_stack: Vec<TimedOp>,
    sequence_id: u64,
    finalize_reached: bool,
    adapter: TraceReaderAdapter<S>,
}

impl<S: TraceSource> TraceBuffer<S> {
    /// Builds a fresh buffer for `(app_id, rank)`, with nothing yet pulled
    /// from the reader.
    pub fn new(source: S, app_id: u32, rank: crate::op::Rank) -> Self {
        TraceBuffer {
            app_id,
            queue: VecDeque::new(),
            reverse_stack: Vec::new(),
            sequence_id: 0,
            finalize_reached: false,
            adapter: TraceReaderAdapter::new(source, app_id, rank),
        }
    }

    /// Returns the next op, lazily pulling from the Trace Reader Adapter if
    /// the queue is empty, assigning and bumping `sequence_id`, and pushing
    /// the returned op onto the reverse stack. A single pull may enqueue
    /// several ops (e.g. a leading `Delay`, or a `Sendrecv` expansion); this
    /// call only ever returns one. Once the reader is exhausted, every
    /// subsequent call returns `WorkloadOp::End`.
    pub fn get_next(&mut self) -> Result<TimedOp, TraceError> {
        if self.queue.is_empty() && !self.finalize_reached {
            let pulled = self.adapter.pull()?;
            if pulled.is_empty() {
                self.finalize_reached = true;
                let now = self.last_end_time();
                self.queue.push_back(TimedOp::new(WorkloadOp::End, now, now));
            } else {
                self.queue.extend(pulled);
            }
        }

        let mut op = self
            .queue
            .pop_front()
            .expect("queue replenished or End synthesized above");
        op.sequence_id = self.sequence_id;
        self.sequence_id += 1;
        self.reverse_stack.push(op.clone());

        trace!(
            app = self.app_id,
            sequence_id = op.sequence_id,
            kind = op.op.kind_label(),
            "trace buffer get_next"
        );

        Ok(op)
    }

    /// Pops the reverse stack and reinserts the op at the front of the
    /// queue, decrementing `sequence_id`. Fatal if the reverse stack is
    /// empty — that indicates a mis-paired forward/reverse handler.
    pub fn roll_back_prev(&mut self) -> Result<(), EngineError> {
        let op = self.reverse_stack.pop().ok_or_else(|| {
            EngineError::Inconsistent(format!(
                "roll_back_prev on app {} with an empty reverse stack",
                self.app_id
            ))
        })?;
        self.sequence_id -= 1;
        trace!(
            app = self.app_id,
            sequence_id = op.sequence_id,
            kind = op.op.kind_label(),
            "trace buffer roll_back_prev"
        );
        self.queue.push_front(op);
        Ok(())
    }

    /// The sequence id that will be assigned to the *next* `get_next` call.
    /// Exposed for the reverse-idempotence property test.
    pub fn next_sequence_id(&self) -> u64 {
        self.sequence_id
    }

    fn last_end_time(&self) -> SimTime {
        self.reverse_stack.last().map(|op| op.end_time).unwrap_or(0.0)
    }
}
