//! Error types for cadence-core

use thiserror::Error;

/// Result type alias for cadence-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cadence-core
///
/// The pacer itself never fails while scheduling; these cover the edges
/// around it (configuration, the engine task, parsing input).
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration rejected; the previous configuration stays active
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The engine task has exited and no longer accepts commands
    #[error("Pacing engine is not running")]
    EngineClosed,

    /// Logging subscriber could not be installed
    #[error("Logging init failed: {0}")]
    Logging(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
