//! Relay loop: input lines in, engine commands out
//!
//! Every segment is recorded into the transcript history before it is handed
//! to the pacing engine, so the history always holds the original text.

use std::future::Future;
use std::io::{self, BufRead};

use cadence_core::{PacerStatus, PacingHandle};
use cadence_transcript_history::TranscriptHistory;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::command::{parse_line, ControlCommand, InputLine};
use crate::config::InputFormat;

/// Lines buffered between the reader thread and the relay
const LINE_BUFFER: usize = 64;

/// Why the relay stopped reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Input reached end of file and the engine drained
    EndOfInput,
    /// Shutdown signal; whatever was queued was flushed
    Signal,
}

/// Counters for one relay run
#[derive(Debug, Clone)]
pub struct RelaySummary {
    /// Segments recorded and enqueued
    pub segments: u64,
    /// Control commands applied
    pub commands: u64,
    /// Lines skipped as malformed or unreadable
    pub rejected: u64,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run ended
    pub ended_at: DateTime<Utc>,
    /// Why the run ended
    pub end_reason: EndReason,
}

/// Relay errors that end the run
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Reading the input stream failed
    #[error("Input error: {0}")]
    Io(#[from] std::io::Error),

    /// The pacing engine is gone
    #[error("Engine error: {0}")]
    Engine(#[from] cadence_core::Error),
}

/// Read lines on a dedicated thread
///
/// Blocking reads happen off the runtime, so an unfinished read never holds up
/// runtime shutdown. A line that is not valid UTF-8 is forwarded as an
/// `InvalidData` error and reading continues. The channel closes at end of
/// input or after the first read error, which is forwarded.
pub fn spawn_line_reader<R>(mut reader: R) -> mpsc::Receiver<io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(LINE_BUFFER);
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let line = match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => decode_line(&buf),
                Err(e) => {
                    let _ = tx.blocking_send(Err(e));
                    break;
                }
            };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Strip the line ending and decode
fn decode_line(buf: &[u8]) -> io::Result<String> {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8(line.to_vec()).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Drives one pacing engine from an input line stream
pub struct Relay {
    handle: PacingHandle,
    history: TranscriptHistory,
    input_format: InputFormat,
    segments: u64,
    commands: u64,
    rejected: u64,
}

impl Relay {
    /// Relay feeding `handle` and recording into `history`
    pub fn new(handle: PacingHandle, history: TranscriptHistory, input_format: InputFormat) -> Self {
        Self {
            handle,
            history,
            input_format,
            segments: 0,
            commands: 0,
            rejected: 0,
        }
    }

    /// Recorded transcript
    pub fn history(&self) -> &TranscriptHistory {
        &self.history
    }

    /// Take the transcript for export
    pub fn into_history(self) -> TranscriptHistory {
        self.history
    }

    /// Process lines until end of input or `shutdown` resolves
    ///
    /// At end of input the relay waits for the engine to finish pacing what
    /// is queued (flushing first if it was left stopped). On shutdown it
    /// flushes immediately.
    pub async fn run<F>(
        &mut self,
        mut lines: mpsc::Receiver<io::Result<String>>,
        shutdown: F,
    ) -> Result<RelaySummary, RelayError>
    where
        F: Future<Output = ()>,
    {
        let started_at = Utc::now();
        tokio::pin!(shutdown);

        let end_reason = loop {
            tokio::select! {
                line = lines.recv() => match line {
                    Some(Ok(line)) => self.handle_line(&line).await?,
                    Some(Err(e)) if e.kind() == io::ErrorKind::InvalidData => {
                        self.reject("<unreadable>", e);
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => {
                        tracing::info!("End of input, waiting for captions to drain");
                        self.drain().await?;
                        break EndReason::EndOfInput;
                    }
                },
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received, flushing captions");
                    self.handle.flush()?;
                    self.handle.snapshot().await?;
                    break EndReason::Signal;
                }
            }
        };

        Ok(RelaySummary {
            segments: self.segments,
            commands: self.commands,
            rejected: self.rejected,
            started_at,
            ended_at: Utc::now(),
            end_reason,
        })
    }

    /// Handle one input line
    ///
    /// Malformed lines are logged and skipped; only a closed engine is an
    /// error.
    pub async fn handle_line(&mut self, line: &str) -> Result<(), RelayError> {
        match parse_line(line, self.input_format) {
            Ok(InputLine::Blank) => {}
            Ok(InputLine::Segment(segment)) => {
                let sequence = self.history.record(segment.clone());
                tracing::debug!(sequence, segment_id = %segment.id, "Segment received");
                self.handle.enqueue(segment)?;
                self.segments += 1;
            }
            Ok(InputLine::Control(command)) => {
                self.apply(command).await?;
                self.commands += 1;
            }
            Err(e) => self.reject(line, e),
        }
        Ok(())
    }

    async fn apply(&mut self, command: ControlCommand) -> Result<(), RelayError> {
        match command {
            ControlCommand::Flush => self.handle.flush()?,
            ControlCommand::Stop => self.handle.stop()?,
            ControlCommand::Clear => self.handle.clear()?,
            ControlCommand::Reset => {
                self.handle.reset()?;
                self.history.clear();
            }
            ControlCommand::Status => {
                let status = self.handle.snapshot().await?;
                self.log_status(&status);
            }
            ControlCommand::Configure(update) => self.handle.update_configuration(update)?,
        }
        Ok(())
    }

    async fn drain(&self) -> Result<PacerStatus, RelayError> {
        if self.handle.snapshot().await?.is_paused() {
            tracing::info!("Engine stopped with captions queued, flushing");
            self.handle.flush()?;
        }
        Ok(self.handle.wait_idle().await?)
    }

    fn reject(&mut self, line: &str, error: impl std::fmt::Display) {
        self.rejected += 1;
        tracing::warn!(line = %line.trim(), error = %error, "Skipping input line");
    }

    fn log_status(&self, status: &PacerStatus) {
        tracing::info!(
            running = status.running,
            queue_length = status.queue_length,
            mode = %status.config.mode,
            wpm = status.config.wpm,
            sentence_delay_ms = status.config.sentence_delay_ms,
            emitted_total = status.emitted_total,
            last_emission_at = ?status.last_emission_at,
            history_len = self.history.len(),
            "Relay status"
        );
    }
}
