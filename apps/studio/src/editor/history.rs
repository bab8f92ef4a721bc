//! History hook: where applied commands report the resulting content.
//!
//! Undo/redo is the host's concern. The editor only guarantees that every
//! applied command calls [`HistoryHook::record`] exactly once.

use std::collections::VecDeque;

pub trait HistoryHook: Send {
    fn record(&mut self, snapshot: String);
}

/// Keeps the most recent `capacity` HTML snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    entries: VecDeque<String>,
    capacity: usize,
}

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl SnapshotHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(DEFAULT_HISTORY_CAPACITY)),
            capacity: capacity.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&str> {
        self.entries.back().map(String::as_str)
    }
}

impl HistoryHook for SnapshotHistory {
    fn record(&mut self, snapshot: String) {
        // Consecutive identical snapshots collapse into one entry.
        if self.latest() == Some(snapshot.as_str()) {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }
}
