//! Rank Registry: a hash-indexed directory from `(app_id, rank)` to that
//! rank's Trace Buffer.

use std::collections::HashMap;

use crate::op::Rank;
use crate::trace::buffer::TraceBuffer;
use crate::trace::reader::TraceSource;

/// Directory of every rank's Trace Buffer, keyed by `(app_id, rank)`.
/// Entries are created lazily on first reference and live for the
/// simulation's duration — `SPEC_FULL.md` §3's lifecycle for Trace Buffer
/// state.
pub struct RankRegistry<S> {
    buffers: HashMap<(u32, Rank), TraceBuffer<S>>,
}

impl<S: TraceSource> RankRegistry<S> {
    /// An empty registry.
    pub fn new() -> Self {
        RankRegistry {
            buffers: HashMap::new(),
        }
    }

    /// Returns the Trace Buffer for `(app_id, rank)`, creating it via
    /// `make_source` on first reference.
    pub fn get_or_insert_with(
        &mut self,
        app_id: u32,
        rank: Rank,
        make_source: impl FnOnce() -> S,
    ) -> &mut TraceBuffer<S> {
        self.buffers
            .entry((app_id, rank))
            .or_insert_with(|| TraceBuffer::new(make_source(), app_id, rank))
    }

    /// Returns the Trace Buffer for `(app_id, rank)` if it has already been
    /// referenced.
    pub fn get_mut(&mut self, app_id: u32, rank: Rank) -> Option<&mut TraceBuffer<S>> {
        self.buffers.get_mut(&(app_id, rank))
    }

    /// Number of ranks currently registered.
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether any rank has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

impl<S: TraceSource> Default for RankRegistry<S> {
    fn default() -> Self {
        RankRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TraceError;
    use crate::trace::reader::RawCallEvent;

    struct EmptySource;
    impl TraceSource for EmptySource {
        fn next_call(&mut self, _app_id: u32, _rank: Rank) -> Result<Option<RawCallEvent>, TraceError> {
            Ok(None)
        }
    }

    #[test]
    fn lazily_creates_one_buffer_per_rank() {
        let mut registry: RankRegistry<EmptySource> = RankRegistry::new();
        assert!(registry.is_empty());
        registry.get_or_insert_with(0, 3, || EmptySource);
        registry.get_or_insert_with(0, 3, || EmptySource);
        registry.get_or_insert_with(0, 4, || EmptySource);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn get_mut_is_none_before_first_reference() {
        let mut registry: RankRegistry<EmptySource> = RankRegistry::new();
        assert!(registry.get_mut(0, 0).is_none());
    }
}
