//! Bounded in-process run history.

use std::collections::VecDeque;

use crate::composite::CompositeResult;

/// Oldest-first ring of composite results owned by one orchestrator.
#[derive(Debug, Clone)]
pub struct RunHistory {
    entries: VecDeque<CompositeResult>,
    capacity: usize,
}

impl RunHistory {
    /// A history keeping at most `capacity` runs (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a run, dropping the oldest one when full.
    pub fn push(&mut self, result: CompositeResult) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(result);
    }

    /// The most recent `limit` runs, newest last.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<&CompositeResult> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).collect()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&CompositeResult> {
        self.entries.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
