//! Bounded history with oldest-first eviction

use std::collections::VecDeque;

use cadence_core::Segment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{HistoryError, Result};

/// Default number of segments retained
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// One recorded segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Arrival order, starting at 1 and never reused
    pub sequence: u64,

    /// When the segment was recorded
    pub recorded_at: DateTime<Utc>,

    /// The original segment as produced by the recognizer
    pub segment: Segment,
}

/// Transcript of original segments in arrival order
#[derive(Debug)]
pub struct TranscriptHistory {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
    next_sequence: u64,
    evicted_total: u64,
}

impl Default for TranscriptHistory {
    fn default() -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: DEFAULT_MAX_ENTRIES,
            next_sequence: 1,
            evicted_total: 0,
        }
    }
}

impl TranscriptHistory {
    /// Create a history holding at most `max_entries` segments
    pub fn new(max_entries: usize) -> Result<Self> {
        if max_entries == 0 {
            return Err(HistoryError::InvalidCapacity(max_entries));
        }
        Ok(Self {
            max_entries,
            ..Default::default()
        })
    }

    /// Record a segment, evicting the oldest entry when full
    ///
    /// Returns the sequence number assigned to it.
    pub fn record(&mut self, segment: Segment) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        tracing::trace!(sequence, segment_id = %segment.id, "Recording segment");
        self.entries.push_back(HistoryEntry {
            sequence,
            recorded_at: Utc::now(),
            segment,
        });
        self.enforce_limit();
        sequence
    }

    /// Change the capacity, evicting immediately if the history is over it
    pub fn set_max_entries(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(HistoryError::InvalidCapacity(max_entries));
        }
        self.max_entries = max_entries;
        self.enforce_limit();
        Ok(())
    }

    /// Current capacity
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Entries, oldest first
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    /// Most recent entry
    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry; sequence numbers keep counting
    pub fn clear(&mut self) {
        let removed = self.entries.len();
        self.entries.clear();
        if removed > 0 {
            tracing::info!(removed, "Transcript history cleared");
        }
    }

    /// Entries evicted by the capacity limit since creation
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }

    fn enforce_limit(&mut self) {
        let excess = self.entries.len().saturating_sub(self.max_entries);
        if excess == 0 {
            return;
        }

        self.entries.drain(..excess);
        self.evicted_total += excess as u64;
        tracing::debug!(
            evicted = excess,
            max_entries = self.max_entries,
            "History full, evicted oldest entries"
        );
    }
}
