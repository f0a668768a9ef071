//! Bounded history of accepted fixes.
//!
//! # Design
//!
//! - Stores the last N accepted fixes (default 10), oldest first
//! - Evicts FIFO when full
//! - Timestamps are non-decreasing; the ingestor enforces this before
//!   calling [`HistoryBuffer::push`]

use std::collections::VecDeque;
use std::time::Duration;

use super::fix::PositionFix;

/// Default maximum fixes to retain.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Bounded, time-ordered ring buffer of accepted fixes.
///
/// # Usage
///
/// ```ignore
/// let mut history = HistoryBuffer::new(10);
/// history.push(fix);
///
/// if let Some(latest) = history.latest() {
///     println!("Last fix at {}", latest.timestamp);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    /// Accepted fixes (oldest first).
    fixes: VecDeque<PositionFix>,
    /// Maximum fixes retained.
    capacity: usize,
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryBuffer {
    /// Create an empty buffer. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            fixes: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a fix, evicting the oldest entry when full.
    ///
    /// Returns the evicted fix, if any.
    pub fn push(&mut self, fix: PositionFix) -> Option<PositionFix> {
        debug_assert!(
            self.latest().is_none_or(|last| last.timestamp <= fix.timestamp),
            "history timestamps must be non-decreasing"
        );

        let evicted = if self.fixes.len() >= self.capacity {
            self.fixes.pop_front()
        } else {
            None
        };
        self.fixes.push_back(fix);
        evicted
    }

    /// The most recently accepted fix.
    pub fn latest(&self) -> Option<&PositionFix> {
        self.fixes.back()
    }

    /// The oldest retained fix.
    pub fn oldest(&self) -> Option<&PositionFix> {
        self.fixes.front()
    }

    /// Number of fixes held.
    pub fn len(&self) -> usize {
        self.fixes.len()
    }

    /// True if no fixes are held.
    pub fn is_empty(&self) -> bool {
        self.fixes.is_empty()
    }

    /// Maximum number of fixes held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate fixes, oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PositionFix> + ExactSizeIterator {
        self.fixes.iter()
    }

    /// Time covered from the oldest to the newest fix.
    pub fn time_span(&self) -> Option<Duration> {
        let oldest = self.oldest()?;
        let newest = self.latest()?;
        Some(crate::time::age_between(oldest.timestamp, newest.timestamp))
    }

    /// Drop all fixes.
    pub fn clear(&mut self) {
        self.fixes.clear();
    }
}
