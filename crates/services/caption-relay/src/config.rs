//! Configuration for the caption relay
//!
//! Configuration can be loaded from a TOML file and/or environment variables.

use cadence_core::{PacingConfig, PacingMode};
use cadence_transcript_history::{ExportFormat, DEFAULT_MAX_ENTRIES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration for the caption relay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Initial pacing configuration
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Transcript history retention and export
    #[serde(default)]
    pub history: HistoryConfig,

    /// Input parsing
    #[serde(default)]
    pub input: InputConfig,
}

/// Transcript history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum segments retained (oldest evicted first)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Where to write the transcript on shutdown; no export when unset
    #[serde(default)]
    pub export_path: Option<PathBuf>,

    /// Export file format
    #[serde(default)]
    pub export_format: ExportFormat,
}

fn default_max_entries() -> usize {
    DEFAULT_MAX_ENTRIES
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            export_path: None,
            export_format: ExportFormat::default(),
        }
    }
}

/// How non-command input lines are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// Each line is the text of one finalized segment
    #[default]
    Text,

    /// Each line is a JSON segment object (`{"text": ...}` at minimum)
    Jsonl,
}

/// Input configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Line format
    #[serde(default)]
    pub format: InputFormat,
}

impl RelayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: RelayConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = RelayConfig::default();

        // Pacing
        if let Some(mode) = var("CADENCE_MODE") {
            config.pacing.mode = mode
                .parse::<PacingMode>()
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        if let Some(wpm) = var("CADENCE_WPM") {
            config.pacing.wpm = parse_var("CADENCE_WPM", &wpm)?;
        }
        if let Some(delay) = var("CADENCE_SENTENCE_DELAY_MS") {
            config.pacing.sentence_delay_ms = parse_var("CADENCE_SENTENCE_DELAY_MS", &delay)?;
        }

        // History
        if let Some(max) = var("CADENCE_HISTORY_MAX_ENTRIES") {
            config.history.max_entries = parse_var("CADENCE_HISTORY_MAX_ENTRIES", &max)?;
        }
        if let Some(path) = var("CADENCE_HISTORY_EXPORT_PATH") {
            config.history.export_path = Some(PathBuf::from(path));
        }
        if let Some(format) = var("CADENCE_HISTORY_EXPORT_FORMAT") {
            config.history.export_format = format
                .parse()
                .map_err(|e: cadence_transcript_history::HistoryError| {
                    ConfigError::Invalid(e.to_string())
                })?;
        }

        // Input
        if let Some(format) = var("CADENCE_INPUT_FORMAT") {
            config.input.format = match format.trim().to_ascii_lowercase().as_str() {
                "text" => InputFormat::Text,
                "jsonl" => InputFormat::Jsonl,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "CADENCE_INPUT_FORMAT must be text or jsonl, got '{}'",
                        other
                    )))
                }
            };
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file if it exists, otherwise from environment
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self, ConfigError> {
        if let Some(p) = path {
            if p.as_ref().exists() {
                return Self::from_file(p);
            }
            tracing::warn!(
                path = %p.as_ref().display(),
                "Config file not found, using environment"
            );
        }
        Self::from_env()
    }

    /// Check values the engine and history would reject
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pacing
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if self.history.max_entries == 0 {
            return Err(ConfigError::Invalid(
                "history.max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{} has invalid value '{}'", key, value)))
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
