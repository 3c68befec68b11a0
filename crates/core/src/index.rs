//! Per-collection identifier allocation
//!
//! Every `IdentifiedCollection` owns one `IndexAllocator`. There is no
//! process-wide registry: two collections of the same kind issue ids
//! independently.

use crate::types::Id;

/// Counter issuing stable, collision-free ids for one collection.
///
/// Issued values are `>= start` and consecutive values differ by `step`.
/// Issuing is monotonic until `reset` or `rewind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexAllocator {
    origin: Id,
    start: Id,
    step: Id,
    next: Id,
    max_issued: Option<Id>,
}

impl IndexAllocator {
    /// Create an allocator starting at `start`. A zero step is treated as 1.
    pub fn new(start: Id, step: Id) -> Self {
        Self {
            origin: start,
            start,
            step: step.max(1),
            next: start,
            max_issued: None,
        }
    }

    /// Issue the next id and advance by the step
    pub fn next_id(&mut self) -> Id {
        let id = self.next;
        self.next = self.next.saturating_add(self.step);
        self.max_issued = Some(self.max_issued.map_or(id, |m| m.max(id)));
        id
    }

    /// The id `next_id` would return, without issuing it
    pub fn peek(&self) -> Id {
        self.next
    }

    /// Reprogram the starting point and rewind issuance to it
    pub fn reset(&mut self, start: Id) {
        self.start = start;
        self.next = start;
        self.max_issued = None;
    }

    /// Return to the configuration the allocator was created with
    pub fn rewind(&mut self) {
        self.reset(self.origin);
    }

    /// Highest id issued or observed since the last reset
    pub fn current_max(&self) -> Option<Id> {
        self.max_issued
    }

    /// Record an explicitly supplied id.
    ///
    /// If `id` is at or past the next value, issuance continues from
    /// `id + step` so later automatic ids cannot collide with it.
    pub fn observe(&mut self, id: Id) {
        if id >= self.next {
            self.next = id.saturating_add(self.step);
        }
        self.max_issued = Some(self.max_issued.map_or(id, |m| m.max(id)));
    }

    /// Starting value of the current epoch
    pub fn start(&self) -> Id {
        self.start
    }

    /// Increment between consecutive ids
    pub fn step(&self) -> Id {
        self.step
    }
}

impl Default for IndexAllocator {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_issues_from_start_by_step() {
        let mut alloc = IndexAllocator::new(1, 2);
        assert_eq!(alloc.next_id(), 1);
        assert_eq!(alloc.next_id(), 3);
        assert_eq!(alloc.next_id(), 5);
        assert_eq!(alloc.current_max(), Some(5));
    }

    #[test]
    fn test_zero_step_clamped() {
        let mut alloc = IndexAllocator::new(0, 0);
        assert_eq!(alloc.step(), 1);
        assert_eq!(alloc.next_id(), 0);
        assert_eq!(alloc.next_id(), 1);
    }

    #[test]
    fn test_reset_reprograms_start() {
        let mut alloc = IndexAllocator::new(0, 1);
        alloc.next_id();
        alloc.next_id();
        alloc.reset(10);
        assert_eq!(alloc.current_max(), None);
        assert_eq!(alloc.next_id(), 10);
    }

    #[test]
    fn test_rewind_restores_origin() {
        let mut alloc = IndexAllocator::new(1, 1);
        alloc.reset(50);
        alloc.next_id();
        alloc.rewind();
        assert_eq!(alloc.start(), 1);
        assert_eq!(alloc.next_id(), 1);
    }

    #[test]
    fn test_observe_skips_past_explicit_id() {
        let mut alloc = IndexAllocator::new(0, 1);
        alloc.observe(7);
        assert_eq!(alloc.next_id(), 8);
        assert_eq!(alloc.current_max(), Some(8));
    }

    #[test]
    fn test_observe_below_next_keeps_counter() {
        let mut alloc = IndexAllocator::new(0, 1);
        alloc.next_id();
        alloc.next_id();
        alloc.observe(0);
        assert_eq!(alloc.peek(), 2);
    }

    proptest! {
        #[test]
        fn prop_issued_ids_strictly_increase_by_step(start in 0u64..1000, step in 1u64..10, n in 1usize..100) {
            let mut alloc = IndexAllocator::new(start, step);
            let ids: Vec<Id> = (0..n).map(|_| alloc.next_id()).collect();
            prop_assert_eq!(ids[0], start);
            for pair in ids.windows(2) {
                prop_assert_eq!(pair[1] - pair[0], step);
            }
            prop_assert_eq!(alloc.current_max(), ids.last().copied());
        }
    }
}
