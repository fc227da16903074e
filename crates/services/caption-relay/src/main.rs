//! Caption Relay Binary
//!
//! Usage: `caption-relay [config.toml]`
//!
//! Transcript lines are read from stdin and paced captions are written to
//! stdout as JSONL. Logs go to stderr.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cadence_caption_relay::{spawn_line_reader, Relay, RelayConfig};
use cadence_core::sink::JsonlSink;
use cadence_core::PacingEngine;
use cadence_transcript_history::TranscriptHistory;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing on stderr; stdout carries captions only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting caption relay...");

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CADENCE_CONFIG").ok());
    let config = RelayConfig::load(config_path.as_deref()).context("loading configuration")?;

    tracing::info!(
        "Configuration: mode={}, wpm={}, sentence_delay_ms={}, history={}, input={:?}",
        config.pacing.mode,
        config.pacing.wpm,
        config.pacing.sentence_delay_ms,
        config.history.max_entries,
        config.input.format
    );

    // Start the pacing engine
    let (engine, handle) = PacingEngine::new(config.pacing)?;
    let engine_task = engine.with_sink(Arc::new(JsonlSink::stdout())).start();

    // Relay stdin until EOF or shutdown signal
    let history = TranscriptHistory::new(config.history.max_entries)?;
    let mut relay = Relay::new(handle.clone(), history, config.input.format);
    let lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
    let outcome = relay.run(lines, shutdown_signal()).await;

    // Stop the engine and export even when the run failed, so queued
    // captions and the transcript are not lost
    if let Err(e) = handle.shutdown() {
        tracing::warn!("Pacing engine already closed: {}", e);
    }
    engine_task.await.context("pacing engine task panicked")?;

    if let Some(path) = &config.history.export_path {
        relay
            .history()
            .export_to_path(path, config.history.export_format)
            .with_context(|| format!("exporting transcript to {}", path.display()))?;
    }

    let summary = outcome.context("relaying input")?;
    tracing::info!(
        segments = summary.segments,
        commands = summary.commands,
        rejected = summary.rejected,
        end_reason = ?summary.end_reason,
        elapsed_ms = (summary.ended_at - summary.started_at).num_milliseconds(),
        "Caption relay shutdown complete"
    );
    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
