//! Transcript segment data structure
//!
//! A segment is produced by the speech recognizer and consumed exactly once by
//! the pacer. The pacer never inspects the payload beyond splitting it into
//! words.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One finalized unit of recognized text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Opaque identifier, shared by all streaming revisions of the segment
    #[serde(default = "new_segment_id")]
    pub id: String,

    /// Recognized text
    pub text: String,

    /// When the recognizer produced the segment
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Recognizer confidence (0.0 - 1.0)
    #[serde(default = "default_confidence")]
    pub confidence: f32,

    /// Whether this is the last revision of the segment
    #[serde(default = "default_is_final")]
    pub is_final: bool,
}

fn new_segment_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_confidence() -> f32 {
    1.0
}

fn default_is_final() -> bool {
    true
}

impl Segment {
    /// Create a final segment with the given id, stamped now
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            timestamp: Utc::now(),
            confidence: default_confidence(),
            is_final: true,
        }
    }

    /// Create a final segment with a fresh random id
    pub fn finalized(text: impl Into<String>) -> Self {
        Self::new(new_segment_id(), text)
    }

    /// Parse a segment from a JSON object
    ///
    /// Only `text` is required; missing fields get a fresh id, the current
    /// time, confidence 1.0 and `is_final = true`.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the recognizer confidence
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Set the origination timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the finality flag
    pub fn with_final(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    /// Whitespace-separated words, empty tokens discarded
    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.text.split_whitespace()
    }

    /// Number of whitespace-separated words
    pub fn word_count(&self) -> usize {
        self.words().count()
    }

    /// Derive a revision carrying the same id, timestamp and confidence
    pub(crate) fn revision(&self, text: String, is_final: bool) -> Self {
        Self {
            id: self.id.clone(),
            text,
            timestamp: self.timestamp,
            confidence: self.confidence,
            is_final,
        }
    }
}
