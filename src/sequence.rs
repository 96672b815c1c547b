//! Per-template sequence number allocation.
//!
//! Each template has its own counter holding the last issued value, starting at 0. Counters are
//! atomics held in a read-mostly map: the map's write lock is only taken the first time a
//! template is seen, so allocations for unrelated templates never serialize on each other.
//!
//! Issued values are never handed out again, even when the caller fails before reserving them.
//! Such gaps are tolerated and not corrected.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// `SharedAllocator` is the single process-wide [`SequenceAllocator`], handed to every
/// consumer.
pub type SharedAllocator = Arc<SequenceAllocator>;

#[derive(Debug, Default)]
pub struct SequenceAllocator {
    counters: RwLock<HashMap<u64, Arc<AtomicU64>>>,
}

impl SequenceAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next sequence number for a template. The first value issued is 1.
    pub fn next(&self, template_id: u64) -> u64 {
        self.counter(template_id).fetch_add(1, Ordering::AcqRel) + 1
    }

    /// The value [`SequenceAllocator::next`] would issue, without consuming it.
    #[must_use]
    pub fn peek(&self, template_id: u64) -> u64 {
        self.counters
            .read()
            .get(&template_id)
            .map_or(0, |c| c.load(Ordering::Acquire))
            + 1
    }

    /// Raise a template's counter so that values up to and including `last_issued` are never
    /// issued. Counters are never lowered.
    pub fn resume(&self, template_id: u64, last_issued: u64) {
        self.counter(template_id)
            .fetch_max(last_issued, Ordering::AcqRel);
    }

    fn counter(&self, template_id: u64) -> Arc<AtomicU64> {
        if let Some(counter) = self.counters.read().get(&template_id) {
            return Arc::clone(counter);
        }
        Arc::clone(self.counters.write().entry(template_id).or_default())
    }
}
