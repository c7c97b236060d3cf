//! Bounded, newest-first buffer of recently known results.

use crate::model::TestResult;
use std::collections::VecDeque;

/// Maximum number of results held in memory.
pub const RESULT_BUFFER_CAPACITY: usize = 100;

/// Insert `incoming` at the front of `existing`, dropping the oldest entry
/// once the capacity is exceeded.
///
/// No deduplication by id is performed.
pub fn merge(existing: &[TestResult], incoming: TestResult) -> Vec<TestResult> {
    let keep = existing.len().min(RESULT_BUFFER_CAPACITY - 1);
    let mut merged = Vec::with_capacity(keep + 1);
    merged.push(incoming);
    merged.extend_from_slice(&existing[..keep]);
    merged
}

/// The authoritative in-memory result set, newest first.
#[derive(Debug, Clone)]
pub struct ResultBuffer {
    results: VecDeque<TestResult>,
    capacity: usize,
}

impl Default for ResultBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultBuffer {
    pub fn new() -> Self {
        Self::with_capacity(RESULT_BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a pushed result as the newest entry.
    pub fn push(&mut self, result: TestResult) {
        self.results.push_front(result);
        self.results.truncate(self.capacity);
    }

    /// Replace the whole buffer with fetched history.
    ///
    /// The history query does not guarantee an order, so the results are
    /// sorted newest-first before the capacity is applied.
    pub fn replace(&mut self, mut all: Vec<TestResult>) {
        all.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        all.truncate(self.capacity);
        self.results = all.into();
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter()
    }

    pub fn newest(&self) -> Option<&TestResult> {
        self.results.front()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn to_vec(&self) -> Vec<TestResult> {
        self.results.iter().cloned().collect()
    }
}
