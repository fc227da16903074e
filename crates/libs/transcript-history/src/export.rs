//! Transcript export

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

use crate::{HistoryError, Result, TranscriptHistory};

/// Export file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One [`HistoryEntry`](crate::HistoryEntry) JSON object per line
    #[default]
    Jsonl,

    /// Human-readable `[timestamp] text` lines
    Text,
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExportFormat::Jsonl => f.write_str("jsonl"),
            ExportFormat::Text => f.write_str("text"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = HistoryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonl" | "json" => Ok(ExportFormat::Jsonl),
            "text" | "txt" => Ok(ExportFormat::Text),
            other => Err(HistoryError::UnknownFormat(other.to_string())),
        }
    }
}

impl TranscriptHistory {
    /// Write every entry as a JSON line, oldest first
    pub fn export_jsonl<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut written = 0;
        for entry in self.entries() {
            serde_json::to_writer(&mut writer, entry)?;
            writer.write_all(b"\n")?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }

    /// Write the transcript as plain text, one segment per line
    pub fn export_text<W: Write>(&self, mut writer: W) -> Result<usize> {
        let mut written = 0;
        for entry in self.entries() {
            writeln!(
                writer,
                "[{}] {}",
                entry
                    .segment
                    .timestamp
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
                entry.segment.text.trim()
            )?;
            written += 1;
        }
        writer.flush()?;
        Ok(written)
    }

    /// Export to a file, creating or truncating it
    pub fn export_to_path(&self, path: impl AsRef<Path>, format: ExportFormat) -> Result<usize> {
        let path = path.as_ref();
        let writer = BufWriter::new(File::create(path)?);
        let written = match format {
            ExportFormat::Jsonl => self.export_jsonl(writer)?,
            ExportFormat::Text => self.export_text(writer)?,
        };

        tracing::info!(
            path = %path.display(),
            format = %format,
            entries = written,
            "Transcript exported"
        );
        Ok(written)
    }
}
