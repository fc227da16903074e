//! Error types for transcript history

/// Result type alias for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// Transcript history errors
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// Capacity must allow at least one entry
    #[error("Invalid history capacity: {0}")]
    InvalidCapacity(usize),

    /// Unknown export format name
    #[error("Unknown export format '{0}' (expected jsonl or text)")]
    UnknownFormat(String),

    /// Writing the export failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Entry could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
