//! Cadence Core - Caption pacing engine
//!
//! This crate releases finalized transcript segments to human-facing displays
//! at a rate suited to reading, independent of how bursty the upstream
//! recognizer is.
//!
//! # Architecture
//!
//! ```text
//!   Segment source ──enqueue──▶ PacingHandle ──mpsc──▶ PacingEngine task
//!                                                       │  owns Pacer
//!                                                       │  (queue, timer id,
//!                                                       │   stream cursor)
//!                                                       ▼
//!                                     EmissionSink, EmissionSink, ...
//! ```
//!
//! - [`pacer::Pacer`] is the pure state machine: queue, single outstanding
//!   timer, the three release algorithms and the flush/stop/clear surface. It
//!   never sleeps; it reports which wakeup it wants.
//! - [`engine::PacingEngine`] owns a `Pacer` inside one tokio task and turns
//!   its wakeup requests into `tokio::time::Sleep`s, so public calls and timer
//!   expiry are serialized without locks.
//! - [`sink::EmissionSink`] implementations receive every [`PacedEmission`].
//!
//! # Example
//!
//! ```ignore
//! use cadence_core::{PacingConfig, PacingEngine, Segment};
//! use cadence_core::sink::QueueSink;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> cadence_core::Result<()> {
//!     let (sink, mut rx) = QueueSink::new();
//!     let (engine, handle) = PacingEngine::new(PacingConfig::default())?;
//!     let _task = engine.with_sink(Arc::new(sink)).start();
//!
//!     handle.enqueue(Segment::finalized("hello there general kenobi"))?;
//!     let emission = rx.recv().await.unwrap();
//!     println!("{} ms: {}", emission.duration_ms, emission.segment.text);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod data;
pub mod engine;
pub mod pacer;
pub mod sink;

mod error;

pub use config::{PacingConfig, PacingConfigUpdate, PacingMode};
pub use data::{PacedEmission, Segment};
pub use engine::{PacerStatus, PacingEngine, PacingHandle};
pub use error::{Error, Result};

/// Initialize logging for a process embedding the pacing engine
///
/// Installs a `tracing-subscriber` fmt subscriber honouring `RUST_LOG`,
/// defaulting to `info`. Calling it twice is harmless.
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing::info!("Cadence pacing core initialized");
    Ok(())
}
