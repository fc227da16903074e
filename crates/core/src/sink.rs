//! Emission sink trait and implementations
//!
//! Sinks are fire-and-forget observers of paced output. The engine calls every
//! registered sink, in registration order, for each emission. A failing sink is
//! logged and never affects pacing or the other sinks.

use std::io::Write;
use std::sync::Mutex;

use tokio::sync::{broadcast, mpsc};

use crate::PacedEmission;

/// Trait for emission delivery targets
///
/// Implementations include:
/// - `JsonlSink` - JSONL output to terminal/file
/// - `ChannelSink` - Broadcast channel for remote viewers
/// - `QueueSink` - Unbounded channel for a single in-process renderer
/// - `FnSink` - Closure
pub trait EmissionSink: Send + Sync {
    /// Deliver an emission to this sink
    fn emit(&self, emission: PacedEmission) -> Result<(), SinkError>;

    /// Close the sink and perform any cleanup
    fn close(&self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Error type for sink operations
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// Writing to the underlying output failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Emission could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Receiving side is gone
    #[error("Channel send error: {0}")]
    Channel(String),
}

/// Terminal/file JSONL sink
///
/// Writes emissions as newline-delimited JSON to a writer.
pub struct JsonlSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonlSink<W> {
    /// Create a new JSONL sink writing to the specified output
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl JsonlSink<std::io::Stdout> {
    /// Create a JSONL sink writing to stdout
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> EmissionSink for JsonlSink<W> {
    fn emit(&self, emission: PacedEmission) -> Result<(), SinkError> {
        let line = serde_json::to_string(&emission)
            .map_err(|e| SinkError::Serialization(e.to_string()))?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SinkError::Channel(format!("writer lock poisoned: {}", e)))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }

    fn close(&self) -> Result<(), SinkError> {
        if let Ok(mut writer) = self.writer.lock() {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Broadcast channel sink for remote viewers
///
/// Any number of subscribers may attach or detach at any time; emitting with
/// nobody subscribed is not an error.
pub struct ChannelSink {
    sender: broadcast::Sender<PacedEmission>,
}

impl ChannelSink {
    /// Create a new channel sink with the specified capacity
    pub fn new(capacity: usize) -> (Self, broadcast::Receiver<PacedEmission>) {
        let (sender, receiver) = broadcast::channel(capacity);
        (Self { sender }, receiver)
    }

    /// Create a new channel sink with default capacity (256)
    pub fn with_default_capacity() -> (Self, broadcast::Receiver<PacedEmission>) {
        Self::new(256)
    }

    /// Subscribe to receive emissions from this sink
    pub fn subscribe(&self) -> broadcast::Receiver<PacedEmission> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl EmissionSink for ChannelSink {
    fn emit(&self, emission: PacedEmission) -> Result<(), SinkError> {
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender
            .send(emission)
            .map_err(|e| SinkError::Channel(e.to_string()))?;
        Ok(())
    }
}

/// Unbounded mpsc sink for a single consumer
pub struct QueueSink {
    sender: mpsc::UnboundedSender<PacedEmission>,
}

impl QueueSink {
    /// Create a sink and the receiver that will observe its emissions
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PacedEmission>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl EmissionSink for QueueSink {
    fn emit(&self, emission: PacedEmission) -> Result<(), SinkError> {
        self.sender
            .send(emission)
            .map_err(|_| SinkError::Channel("receiver dropped".to_string()))
    }
}

/// Sink backed by a closure
pub struct FnSink<F>
where
    F: Fn(PacedEmission) + Send + Sync,
{
    callback: F,
}

impl<F> FnSink<F>
where
    F: Fn(PacedEmission) + Send + Sync,
{
    /// Wrap a closure
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> EmissionSink for FnSink<F>
where
    F: Fn(PacedEmission) + Send + Sync,
{
    fn emit(&self, emission: PacedEmission) -> Result<(), SinkError> {
        (self.callback)(emission);
        Ok(())
    }
}
