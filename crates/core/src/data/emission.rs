//! Paced emission - the unit delivered to sinks

use serde::{Deserialize, Serialize};

use super::Segment;

/// A segment released by the pacer together with its display duration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacedEmission {
    /// The released segment, or a word-prefix revision of it in streaming mode
    pub segment: Segment,

    /// How long the display should dwell on it (milliseconds).
    /// 0 means show immediately with no implied dwell.
    pub duration_ms: u64,
}

impl PacedEmission {
    /// Create an emission with a declared duration
    pub fn new(segment: Segment, duration_ms: u64) -> Self {
        Self {
            segment,
            duration_ms,
        }
    }

    /// Create a zero-duration emission (instant mode, flush)
    pub fn immediate(segment: Segment) -> Self {
        Self::new(segment, 0)
    }

    /// Whether the emission carries no dwell time
    pub fn is_immediate(&self) -> bool {
        self.duration_ms == 0
    }
}
