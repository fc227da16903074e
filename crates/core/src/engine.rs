//! Pacing engine - tokio driver for the [`Pacer`] state machine
//!
//! The engine owns one `Pacer` inside a single task. Callers talk to it through
//! a cloneable [`PacingHandle`]; every call becomes a command message on an
//! unbounded channel, and the pacer's requested wakeup becomes a
//! `tokio::time::Sleep` polled in the same `select!` loop. Public calls and
//! timer expiry are therefore never interleaved.

use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;

use crate::config::{PacingConfig, PacingConfigUpdate};
use crate::data::{PacedEmission, Segment};
use crate::pacer::{Pacer, TimerId};
use crate::sink::EmissionSink;
use crate::{Error, Result};

/// Observable snapshot of the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacerStatus {
    /// A drain cycle is in progress
    pub running: bool,

    /// Segments waiting to be released
    pub queue_length: usize,

    /// Active configuration
    pub config: PacingConfig,

    /// Emissions delivered since start (or the last reset)
    pub emitted_total: u64,

    /// Wall-clock time of the most recent emission
    pub last_emission_at: Option<DateTime<Utc>>,
}

impl PacerStatus {
    fn initial(config: PacingConfig) -> Self {
        Self {
            running: false,
            queue_length: 0,
            config,
            emitted_total: 0,
            last_emission_at: None,
        }
    }

    /// Idle with an empty queue
    pub fn is_idle(&self) -> bool {
        !self.running && self.queue_length == 0
    }

    /// Idle with segments still queued (after `stop`)
    pub fn is_paused(&self) -> bool {
        !self.running && self.queue_length > 0
    }
}

/// Messages from handles to the engine task
enum Command {
    Enqueue(Segment),
    Configure(PacingConfigUpdate),
    Flush,
    Stop,
    Clear,
    Reset,
    AddSink(Arc<dyn EmissionSink>),
    Snapshot(oneshot::Sender<PacerStatus>),
    Shutdown,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Enqueue(_) => "enqueue",
            Command::Configure(_) => "configure",
            Command::Flush => "flush",
            Command::Stop => "stop",
            Command::Clear => "clear",
            Command::Reset => "reset",
            Command::AddSink(_) => "add_sink",
            Command::Snapshot(_) => "snapshot",
            Command::Shutdown => "shutdown",
        }
    }
}

enum Event {
    Command(Option<Command>),
    Timer(TimerId),
}

/// The real timer backing the pacer's pending wakeup
struct ArmedTimer {
    id: TimerId,
    sleep: Pin<Box<Sleep>>,
}

/// Single-owner pacing task
pub struct PacingEngine {
    pacer: Pacer,
    sinks: Vec<Arc<dyn EmissionSink>>,
    command_rx: mpsc::UnboundedReceiver<Command>,
    status_tx: watch::Sender<PacerStatus>,
    armed: Option<ArmedTimer>,
    emitted_total: u64,
    last_emission_at: Option<DateTime<Utc>>,
}

impl PacingEngine {
    /// Create an engine and the handle that controls it
    ///
    /// Nothing runs until [`PacingEngine::start`] is called.
    pub fn new(config: PacingConfig) -> Result<(Self, PacingHandle)> {
        let pacer = Pacer::new(config)?;
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(PacerStatus::initial(config));

        let engine = Self {
            pacer,
            sinks: Vec::new(),
            command_rx,
            status_tx,
            armed: None,
            emitted_total: 0,
            last_emission_at: None,
        };
        let handle = PacingHandle {
            command_tx,
            status_rx,
        };
        Ok((engine, handle))
    }

    /// Register a sink before starting
    pub fn with_sink(mut self, sink: Arc<dyn EmissionSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Spawn the engine task on the current runtime
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run until shutdown or until every handle is dropped
    pub async fn run(mut self) {
        tracing::info!(
            mode = %self.pacer.config().mode,
            wpm = self.pacer.config().wpm,
            sinks = self.sinks.len(),
            "Pacing engine started"
        );

        loop {
            let event = tokio::select! {
                biased;
                command = self.command_rx.recv() => Event::Command(command),
                timer_id = next_expiry(&mut self.armed) => Event::Timer(timer_id),
            };

            match event {
                Event::Command(Some(Command::Shutdown)) => {
                    tracing::info!("Pacing engine shutdown requested");
                    break;
                }
                Event::Command(None) => {
                    tracing::info!("All pacing handles dropped, engine exiting");
                    break;
                }
                Event::Command(Some(command)) => self.handle_command(command),
                Event::Timer(timer_id) => {
                    self.armed = None;
                    let emissions = self.pacer.on_timer(timer_id);
                    self.deliver(emissions);
                }
            }

            self.sync_timer();
            self.publish_status();
        }

        self.finish();
    }

    fn handle_command(&mut self, command: Command) {
        tracing::trace!("Pacing command: {}", command.name());
        match command {
            Command::Enqueue(segment) => {
                let emissions = self.pacer.enqueue(segment);
                self.deliver(emissions);
            }
            Command::Configure(update) => {
                if let Err(e) = self.pacer.update_config(&update) {
                    tracing::warn!(error = %e, "Rejected pacing config update");
                }
            }
            Command::Flush => {
                let emissions = self.pacer.flush();
                self.deliver(emissions);
            }
            Command::Stop => self.pacer.stop(),
            Command::Clear => {
                self.pacer.clear();
            }
            Command::Reset => {
                let discarded = self.pacer.clear();
                self.emitted_total = 0;
                self.last_emission_at = None;
                tracing::info!(discarded, "Pacing engine reset");
            }
            Command::AddSink(sink) => {
                self.sinks.push(sink);
                tracing::debug!("Sink added ({} total)", self.sinks.len());
            }
            Command::Snapshot(reply) => {
                self.sync_timer();
                let status = self.publish_status();
                let _ = reply.send(status);
            }
            Command::Shutdown => {}
        }
    }

    /// Hand emissions to every sink in registration order
    fn deliver(&mut self, emissions: Vec<PacedEmission>) {
        for emission in emissions {
            self.emitted_total += 1;
            self.last_emission_at = Some(Utc::now());

            tracing::debug!(
                segment_id = %emission.segment.id,
                duration_ms = emission.duration_ms,
                is_final = emission.segment.is_final,
                "Emitting caption"
            );

            for sink in &self.sinks {
                if let Err(e) = sink.emit(emission.clone()) {
                    tracing::warn!(
                        segment_id = %emission.segment.id,
                        error = %e,
                        "Sink failed to accept emission"
                    );
                }
            }
        }
    }

    /// Make the armed sleep match the pacer's pending wakeup
    fn sync_timer(&mut self) {
        match self.pacer.pending_timer() {
            Some(wakeup) => {
                let already_armed = self
                    .armed
                    .as_ref()
                    .is_some_and(|timer| timer.id == wakeup.timer_id);
                if !already_armed {
                    self.armed = Some(ArmedTimer {
                        id: wakeup.timer_id,
                        sleep: Box::pin(tokio::time::sleep(wakeup.after)),
                    });
                }
            }
            None => self.armed = None,
        }
    }

    fn status(&self) -> PacerStatus {
        PacerStatus {
            running: self.pacer.is_running(),
            queue_length: self.pacer.queue_length(),
            config: *self.pacer.config(),
            emitted_total: self.emitted_total,
            last_emission_at: self.last_emission_at,
        }
    }

    fn publish_status(&self) -> PacerStatus {
        let status = self.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status.clone();
            true
        });
        status
    }

    fn finish(&mut self) {
        let undelivered = self.pacer.clear();
        if undelivered > 0 {
            tracing::warn!(undelivered, "Pacing engine exited with segments still queued");
        }

        for sink in &self.sinks {
            if let Err(e) = sink.close() {
                tracing::warn!(error = %e, "Failed to close sink");
            }
        }

        let status = self.status();
        self.status_tx.send_replace(status);
        tracing::info!(emitted_total = self.emitted_total, "Pacing engine stopped");
    }
}

/// Resolves when the armed sleep expires; never resolves when nothing is armed
async fn next_expiry(armed: &mut Option<ArmedTimer>) -> TimerId {
    match armed {
        Some(timer) => {
            timer.sleep.as_mut().await;
            timer.id
        }
        None => std::future::pending().await,
    }
}

/// Cloneable control surface of a running [`PacingEngine`]
///
/// Commands are fire-and-forget; they are applied in the order they were sent.
/// `is_running` and `queue_length` read the most recently published status,
/// which trails the engine by at most one command; use
/// [`PacingHandle::snapshot`] for an exact value.
#[derive(Clone)]
pub struct PacingHandle {
    command_tx: mpsc::UnboundedSender<Command>,
    status_rx: watch::Receiver<PacerStatus>,
}

impl PacingHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::EngineClosed)
    }

    /// Hand a finalized segment to the engine
    pub fn enqueue(&self, segment: Segment) -> Result<()> {
        self.send(Command::Enqueue(segment))
    }

    /// Merge a partial configuration
    ///
    /// An invalid update is rejected here, whole, and never reaches the
    /// engine.
    pub fn update_configuration(&self, update: PacingConfigUpdate) -> Result<()> {
        if let Err(e) = update.validate() {
            tracing::warn!(error = %e, "Rejected pacing config update");
            return Err(e);
        }
        self.send(Command::Configure(update))
    }

    /// Release everything queued now, with zero duration
    pub fn flush(&self) -> Result<()> {
        self.send(Command::Flush)
    }

    /// Pause: cancel the pending wakeup and keep the queue
    pub fn stop(&self) -> Result<()> {
        self.send(Command::Stop)
    }

    /// Discard the queue without emitting
    pub fn clear(&self) -> Result<()> {
        self.send(Command::Clear)
    }

    /// Between-session reset: clear plus zeroed counters
    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    /// Register an additional sink on the running engine
    pub fn add_sink(&self, sink: Arc<dyn EmissionSink>) -> Result<()> {
        self.send(Command::AddSink(sink))
    }

    /// Ask the engine task to exit; queued segments are dropped
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }

    /// Whether a drain cycle is in progress (last published status)
    pub fn is_running(&self) -> bool {
        self.status_rx.borrow().running
    }

    /// Segments waiting to be released (last published status)
    pub fn queue_length(&self) -> usize {
        self.status_rx.borrow().queue_length
    }

    /// Last published status
    pub fn status(&self) -> PacerStatus {
        self.status_rx.borrow().clone()
    }

    /// Receiver notified on every status change
    pub fn subscribe_status(&self) -> watch::Receiver<PacerStatus> {
        self.status_rx.clone()
    }

    /// Whether the engine task has exited
    pub fn is_closed(&self) -> bool {
        self.command_tx.is_closed()
    }

    /// Exact status after every previously sent command was applied
    pub async fn snapshot(&self) -> Result<PacerStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(Command::Snapshot(reply_tx))?;
        reply_rx.await.map_err(|_| Error::EngineClosed)
    }

    /// Wait until the engine is idle with an empty queue
    ///
    /// Never resolves while the engine is paused with segments queued; flush
    /// or clear first.
    pub async fn wait_idle(&self) -> Result<PacerStatus> {
        let current = self.snapshot().await?;
        if current.is_idle() {
            return Ok(current);
        }

        let mut status_rx = self.status_rx.clone();
        let status = status_rx
            .wait_for(PacerStatus::is_idle)
            .await
            .map_err(|_| Error::EngineClosed)?
            .clone();
        Ok(status)
    }
}
