//! Bounded in-memory Φ history.
//!
//! A strict FIFO of the most recent readings. The buffer is an explicit
//! object owned by the service rather than process-global state; it is
//! created empty, never persisted, and reset only through [`PhiHistory::clear`].

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use ethereum_types::U256;
use serde::Serialize;

use crate::engine::serialize_decimal;
use crate::source::Provenance;

/// Default number of retained readings.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Default number of readings returned by [`PhiHistory::recent`] callers.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// One recorded Φ reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    /// The Φ value as a decimal string.
    #[serde(serialize_with = "serialize_decimal")]
    pub value: U256,
    /// When the reading was taken (Unix milliseconds on the wire).
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Where the reading came from.
    pub source: Provenance,
}

/// Thread-safe bounded FIFO of [`HistoryEntry`] values.
#[derive(Debug)]
pub struct PhiHistory {
    capacity: usize,
    // Held only for the push/evict pair or a copy-out, never across `.await`.
    entries: Mutex<VecDeque<HistoryEntry>>,
}

impl PhiHistory {
    /// Creates an empty history holding at most `capacity` entries.
    ///
    /// A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Appends an entry, evicting the oldest if the buffer is full.
    ///
    /// Returns the evicted entry, if any.
    pub fn record(&self, entry: HistoryEntry) -> Option<HistoryEntry> {
        let mut entries = self.lock();
        entries.push_back(entry);
        if entries.len() > self.capacity {
            entries.pop_front()
        } else {
            None
        }
    }

    /// Returns up to `limit` of the most recent entries, oldest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<HistoryEntry> {
        let entries = self.lock();
        let skip = entries.len().saturating_sub(limit);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Most recent entry.
    #[must_use]
    pub fn latest(&self) -> Option<HistoryEntry> {
        self.lock().back().cloned()
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded (or everything was cleared).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of retained entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<HistoryEntry>> {
        // A panic while holding the lock cannot leave the deque half-updated,
        // so the data is still usable.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PhiHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
