//! Cadence Transcript History
//!
//! Records every finalized segment as it arrives from the recognizer, before
//! any pacing, and exports the session transcript. Capacity is fixed; once it
//! is reached the oldest entries are evicted first.
//!
//! The pacing engine knows nothing about this crate. The composition root
//! records each segment here and then hands it to the engine.

mod error;
mod export;
mod history;

pub use error::{HistoryError, Result};
pub use export::ExportFormat;
pub use history::{HistoryEntry, TranscriptHistory, DEFAULT_MAX_ENTRIES};
