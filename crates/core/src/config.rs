//! Pacing configuration
//!
//! The active configuration is replaceable at any time. Updates are partial:
//! only the fields present in a [`PacingConfigUpdate`] change. An update that
//! would leave the pacer with an undefined duration formula (WPM <= 0, NaN or
//! infinite) is rejected whole and the previous configuration stays active.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Default target reading rate
pub const DEFAULT_WPM: f64 = 150.0;

/// Default pause appended after each sentence-mode release (milliseconds)
pub const DEFAULT_SENTENCE_DELAY_MS: u64 = 500;

/// Release algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacingMode {
    /// One segment at a time, dwelling for its reading time plus a fixed pause
    #[default]
    Sentence,

    /// Word by word, each prefix revision shown for one word interval
    Streaming,

    /// No pacing, segments are released as they arrive
    Instant,
}

impl PacingMode {
    /// Lowercase name as used in config files and commands
    pub fn as_str(&self) -> &'static str {
        match self {
            PacingMode::Sentence => "sentence",
            PacingMode::Streaming => "streaming",
            PacingMode::Instant => "instant",
        }
    }
}

impl fmt::Display for PacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PacingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sentence" => Ok(PacingMode::Sentence),
            "streaming" => Ok(PacingMode::Streaming),
            "instant" => Ok(PacingMode::Instant),
            other => Err(Error::InvalidConfig(format!(
                "unknown pacing mode '{}' (expected sentence, streaming or instant)",
                other
            ))),
        }
    }
}

/// Active pacing configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Release algorithm
    #[serde(default)]
    pub mode: PacingMode,

    /// Target reading rate in words per minute (must be > 0)
    #[serde(default = "default_wpm")]
    pub wpm: f64,

    /// Extra dwell after each sentence-mode release (milliseconds)
    #[serde(default = "default_sentence_delay_ms")]
    pub sentence_delay_ms: u64,
}

fn default_wpm() -> f64 {
    DEFAULT_WPM
}

fn default_sentence_delay_ms() -> u64 {
    DEFAULT_SENTENCE_DELAY_MS
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            mode: PacingMode::default(),
            wpm: default_wpm(),
            sentence_delay_ms: default_sentence_delay_ms(),
        }
    }
}

impl PacingConfig {
    /// Create a config for the given mode with default rate and delay
    pub fn with_mode(mode: PacingMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Set the target reading rate
    pub fn with_wpm(mut self, wpm: f64) -> Self {
        self.wpm = wpm;
        self
    }

    /// Set the sentence-mode delay
    pub fn with_sentence_delay_ms(mut self, sentence_delay_ms: u64) -> Self {
        self.sentence_delay_ms = sentence_delay_ms;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validate_wpm(self.wpm)
    }

    /// Merge a partial update, rejecting it whole if any field is invalid
    pub fn apply(&mut self, update: &PacingConfigUpdate) -> Result<()> {
        update.validate()?;

        if let Some(mode) = update.mode {
            self.mode = mode;
        }
        if let Some(wpm) = update.wpm {
            self.wpm = wpm;
        }
        if let Some(delay) = update.sentence_delay_ms {
            self.sentence_delay_ms = delay;
        }
        Ok(())
    }
}

/// Partial configuration; `None` fields are left unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PacingConfigUpdate {
    /// New release algorithm
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<PacingMode>,

    /// New target reading rate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wpm: Option<f64>,

    /// New sentence-mode delay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_delay_ms: Option<u64>,
}

impl PacingConfigUpdate {
    /// Update that only changes the mode
    pub fn mode(mode: PacingMode) -> Self {
        Self {
            mode: Some(mode),
            ..Default::default()
        }
    }

    /// Update that only changes the reading rate
    pub fn wpm(wpm: f64) -> Self {
        Self {
            wpm: Some(wpm),
            ..Default::default()
        }
    }

    /// Update that only changes the sentence delay
    pub fn sentence_delay_ms(sentence_delay_ms: u64) -> Self {
        Self {
            sentence_delay_ms: Some(sentence_delay_ms),
            ..Default::default()
        }
    }

    /// Whether the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.wpm.is_none() && self.sentence_delay_ms.is_none()
    }

    /// Validate the fields that are present
    pub fn validate(&self) -> Result<()> {
        match self.wpm {
            Some(wpm) => validate_wpm(wpm),
            None => Ok(()),
        }
    }
}

impl From<PacingConfig> for PacingConfigUpdate {
    fn from(config: PacingConfig) -> Self {
        Self {
            mode: Some(config.mode),
            wpm: Some(config.wpm),
            sentence_delay_ms: Some(config.sentence_delay_ms),
        }
    }
}

fn validate_wpm(wpm: f64) -> Result<()> {
    if !wpm.is_finite() || wpm <= 0.0 {
        return Err(Error::InvalidConfig(format!(
            "wpm must be a positive finite number, got {}",
            wpm
        )));
    }
    Ok(())
}
