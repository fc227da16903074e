//! Pacer - the pacing state machine
//!
//! The pacer owns the pending queue, the single outstanding timer and the
//! active configuration. It never sleeps: whenever it wants to be woken it
//! records a [`Wakeup`] (timer id + delay) that the driver turns into a real
//! timer, and the driver reports expiry back through [`Pacer::on_timer`].
//!
//! # States
//!
//! - Idle: no timer pending. The queue may still hold segments after `stop()`;
//!   that combination is the paused state.
//! - Draining: a timer is pending.
//!
//! `enqueue` on an idle pacer schedules an immediate (zero-delay) drain step.
//! A drain step that finds the queue empty returns to idle. `flush`, `stop` and `clear`
//! force idle.
//!
//! # Release algorithms
//!
//! | Mode      | Per drain step                                              |
//! |-----------|-------------------------------------------------------------|
//! | Sentence  | emit head with reading time + delay, wake after that long   |
//! | Streaming | emit growing word prefixes one interval apart, then go on   |
//! | Instant   | never queued by `enqueue`; queued leftovers go out at once  |
//!
//! Timer ids increase monotonically. Cancelling replaces the pending id, so a
//! late firing of a cancelled timer no longer matches and is ignored.

mod timing;

pub use timing::{sentence_duration_ms, word_interval_ms};

use std::collections::VecDeque;
use std::time::Duration;

use crate::config::{PacingConfig, PacingConfigUpdate, PacingMode};
use crate::data::{PacedEmission, Segment};
use crate::Result;

/// Identifier of a scheduled wakeup
pub type TimerId = u64;

/// A wakeup requested by the pacer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wakeup {
    /// Id to pass back to [`Pacer::on_timer`]
    pub timer_id: TimerId,
    /// Delay from the moment it was scheduled
    pub after: Duration,
}

/// Streaming continuation: the segment being revealed word by word
#[derive(Debug, Clone)]
struct StreamCursor {
    segment: Segment,
    words: Vec<String>,
    next_index: usize,
}

impl StreamCursor {
    fn new(segment: Segment) -> Self {
        let words = segment.words().map(str::to_owned).collect();
        Self {
            segment,
            words,
            next_index: 0,
        }
    }

    /// The complete segment as a final revision
    fn into_final(self) -> Segment {
        let text = self.words.join(" ");
        self.segment.revision(text, true)
    }
}

/// Pacing state machine
#[derive(Debug)]
pub struct Pacer {
    config: PacingConfig,
    queue: VecDeque<Segment>,
    timer: Option<Wakeup>,
    cursor: Option<StreamCursor>,
    next_timer_id: TimerId,
}

impl Pacer {
    /// Create an idle pacer with the given configuration
    pub fn new(config: PacingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            queue: VecDeque::new(),
            timer: None,
            cursor: None,
            next_timer_id: 0,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Whether a drain cycle is in progress
    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Segments waiting to be released
    pub fn queue_length(&self) -> usize {
        self.queue.len()
    }

    /// The wakeup the driver should currently have armed, if any
    pub fn pending_timer(&self) -> Option<Wakeup> {
        self.timer
    }

    /// Merge a partial configuration
    ///
    /// Applies to the next scheduling decision; an already scheduled wakeup
    /// keeps its delay.
    pub fn update_config(&mut self, update: &PacingConfigUpdate) -> Result<()> {
        self.config.apply(update)?;
        tracing::info!(
            "Pacing config updated: mode={}, wpm={}, sentence_delay_ms={}",
            self.config.mode,
            self.config.wpm,
            self.config.sentence_delay_ms
        );
        Ok(())
    }

    /// Accept a segment from the source
    ///
    /// In instant mode the segment is returned as a zero-duration emission and
    /// never queued. Otherwise it is queued and, if the pacer is idle, a
    /// zero-delay wakeup is scheduled so draining starts on the next tick. A
    /// `flush` issued in the same tick therefore still sees every segment.
    pub fn enqueue(&mut self, segment: Segment) -> Vec<PacedEmission> {
        if self.config.mode == PacingMode::Instant {
            tracing::debug!("Instant release of segment {}", segment.id);
            return vec![PacedEmission::immediate(segment)];
        }

        tracing::debug!(
            "Queued segment {} ({} waiting)",
            segment.id,
            self.queue.len() + 1
        );
        self.queue.push_back(segment);

        if !self.is_running() {
            self.schedule(0);
        }
        Vec::new()
    }

    /// Handle expiry of a wakeup
    ///
    /// A firing whose id is not the pending timer (cancelled, or already
    /// handled) is a no-op.
    pub fn on_timer(&mut self, timer_id: TimerId) -> Vec<PacedEmission> {
        match self.timer {
            Some(pending) if pending.timer_id == timer_id => {
                self.timer = None;
            }
            _ => {
                tracing::debug!("Ignoring stale timer {}", timer_id);
                return Vec::new();
            }
        }

        let mut emissions = Vec::new();
        self.drain(&mut emissions);
        emissions
    }

    /// Release everything now with zero duration, in order
    ///
    /// A segment interrupted mid-way through streaming is released first, in
    /// full and final.
    pub fn flush(&mut self) -> Vec<PacedEmission> {
        self.cancel_timer();

        let mut emissions = Vec::with_capacity(self.queue.len() + 1);
        if let Some(cursor) = self.cursor.take() {
            emissions.push(PacedEmission::immediate(cursor.into_final()));
        }
        emissions.extend(self.queue.drain(..).map(PacedEmission::immediate));

        if !emissions.is_empty() {
            tracing::info!("Flushed {} segments", emissions.len());
        }
        emissions
    }

    /// Stop scheduling without losing data
    ///
    /// Queued segments stay queued. A segment interrupted mid-way through
    /// streaming goes back to the head of the queue.
    pub fn stop(&mut self) {
        self.cancel_timer();
        if let Some(cursor) = self.cursor.take() {
            self.queue.push_front(cursor.segment);
        }
        tracing::info!("Pacer stopped with {} segments queued", self.queue.len());
    }

    /// Discard the queue without emitting; returns how many segments were dropped
    pub fn clear(&mut self) -> usize {
        self.cancel_timer();
        let interrupted = usize::from(self.cursor.take().is_some());
        let discarded = self.queue.len() + interrupted;
        self.queue.clear();
        if discarded > 0 {
            tracing::info!("Cleared {} segments", discarded);
        }
        discarded
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            tracing::debug!("Cancelled timer {}", timer.timer_id);
        }
    }

    fn schedule(&mut self, after_ms: u64) {
        debug_assert!(self.timer.is_none(), "a wakeup is already pending");
        self.next_timer_id += 1;
        let wakeup = Wakeup {
            timer_id: self.next_timer_id,
            after: Duration::from_millis(after_ms),
        };
        tracing::debug!("Scheduled timer {} in {}ms", wakeup.timer_id, after_ms);
        self.timer = Some(wakeup);
    }

    /// Run drain steps until a wakeup is scheduled or the queue is empty
    fn drain(&mut self, out: &mut Vec<PacedEmission>) {
        loop {
            if let Some(cursor) = self.cursor.take() {
                if self.step_word(cursor, out) {
                    return;
                }
                continue;
            }

            let Some(segment) = self.queue.pop_front() else {
                tracing::debug!("Queue drained, pacer idle");
                return;
            };

            match self.config.mode {
                PacingMode::Sentence => {
                    let duration_ms = sentence_duration_ms(
                        segment.word_count(),
                        self.config.wpm,
                        self.config.sentence_delay_ms,
                    );
                    tracing::debug!("Sentence release of {} for {}ms", segment.id, duration_ms);
                    out.push(PacedEmission::new(segment, duration_ms));
                    self.schedule(duration_ms);
                    return;
                }
                PacingMode::Streaming => {
                    let cursor = StreamCursor::new(segment);
                    if cursor.words.is_empty() {
                        // Nothing to reveal; release once and move on
                        out.push(PacedEmission::immediate(cursor.segment.with_final(true)));
                        continue;
                    }
                    self.cursor = Some(cursor);
                }
                PacingMode::Instant => {
                    out.push(PacedEmission::immediate(segment));
                }
            }
        }
    }

    /// Emit the next word prefix; returns true if a wakeup was scheduled
    fn step_word(&mut self, mut cursor: StreamCursor, out: &mut Vec<PacedEmission>) -> bool {
        let interval_ms = word_interval_ms(self.config.wpm);
        let index = cursor.next_index;
        let is_last = index + 1 == cursor.words.len();

        let text = cursor.words[..=index].join(" ");
        out.push(PacedEmission::new(
            cursor.segment.revision(text, is_last),
            interval_ms,
        ));

        if is_last {
            return false;
        }

        cursor.next_index += 1;
        self.cursor = Some(cursor);
        self.schedule(interval_ms);
        true
    }
}
