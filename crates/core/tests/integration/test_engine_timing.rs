//! Integration tests for release timing
//!
//! All tests run on a paused tokio clock, so every sleep the engine arms
//! completes at exactly its deadline and elapsed times are deterministic.

use std::sync::Arc;
use std::time::Duration;

use cadence_core::sink::QueueSink;
use cadence_core::{
    PacedEmission, PacingConfig, PacingConfigUpdate, PacingEngine, PacingHandle, PacingMode,
    Segment,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;

const TEN_WORDS: &str = "one two three four five six seven eight nine ten";

/// Running engine plus a receiver that timestamps emissions
struct Harness {
    handle: PacingHandle,
    rx: UnboundedReceiver<PacedEmission>,
    start: Instant,
}

impl Harness {
    fn start(config: PacingConfig) -> Self {
        let (sink, rx) = QueueSink::new();
        let (engine, handle) = PacingEngine::new(config).unwrap();
        engine.with_sink(Arc::new(sink)).start();
        Self {
            handle,
            rx,
            start: Instant::now(),
        }
    }

    /// Next emission and the milliseconds elapsed since start
    async fn next(&mut self) -> (PacedEmission, u64) {
        let emission = self.rx.recv().await.expect("engine dropped its sink");
        let elapsed = self.start.elapsed().as_millis() as u64;
        (emission, elapsed)
    }

    fn enqueue(&self, id: &str, text: &str) {
        self.handle.enqueue(Segment::new(id, text)).unwrap();
    }
}

fn assert_at(elapsed_ms: u64, expected_ms: u64) {
    assert!(
        (expected_ms..=expected_ms + 2).contains(&elapsed_ms),
        "expected emission at {}ms, got {}ms",
        expected_ms,
        elapsed_ms
    );
}

#[tokio::test(start_paused = true)]
async fn test_sentence_mode_dwells_for_reading_time() {
    let mut harness = Harness::start(PacingConfig::default());
    harness.enqueue("a", TEN_WORDS);
    harness.enqueue("b", TEN_WORDS);
    harness.enqueue("c", "hello world");

    let (a, at) = harness.next().await;
    assert_eq!(a.segment.id, "a");
    assert_eq!(a.duration_ms, 4500);
    assert_at(at, 0);

    let (b, at) = harness.next().await;
    assert_eq!(b.segment.id, "b");
    assert_at(at, 4500);

    // 2 words at 150 WPM = 800ms + 500ms pause
    let (c, at) = harness.next().await;
    assert_eq!(c.segment.id, "c");
    assert_eq!(c.duration_ms, 1300);
    assert_at(at, 9000);

    // Still draining until the last dwell has elapsed
    let status = harness.handle.wait_idle().await.unwrap();
    assert_at(harness.start.elapsed().as_millis() as u64, 10300);
    assert_eq!(status.emitted_total, 3);
    assert!(status.last_emission_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_enqueue_during_final_dwell_is_paced() {
    let mut harness = Harness::start(PacingConfig::default());
    harness.enqueue("a", TEN_WORDS);

    let (a, at) = harness.next().await;
    assert_eq!(a.segment.id, "a");
    assert_at(at, 0);

    // "a" is alone but still on screen when "b" arrives
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert!(harness.handle.is_running());
    harness.enqueue("b", "hello world");

    let (b, at) = harness.next().await;
    assert_eq!(b.segment.id, "b");
    assert_at(at, 4500);
}

#[tokio::test(start_paused = true)]
async fn test_streaming_mode_reveals_word_by_word() {
    let mut harness = Harness::start(PacingConfig::with_mode(PacingMode::Streaming));
    harness.enqueue("s", "alpha beta gamma");
    harness.enqueue("t", "delta");

    let mut received = Vec::new();
    for _ in 0..4 {
        received.push(harness.next().await);
    }

    let texts: Vec<&str> = received.iter().map(|(e, _)| e.segment.text.as_str()).collect();
    assert_eq!(texts, vec!["alpha", "alpha beta", "alpha beta gamma", "delta"]);

    let finals: Vec<bool> = received.iter().map(|(e, _)| e.segment.is_final).collect();
    assert_eq!(finals, vec![false, false, true, true]);
    assert!(received.iter().all(|(e, _)| e.duration_ms == 400));
    assert!(received[..3].iter().all(|(e, _)| e.segment.id == "s"));

    // Next segment starts right after the last word, no extra pause
    let times: Vec<u64> = received.iter().map(|(_, at)| *at).collect();
    assert_at(times[0], 0);
    assert_at(times[1], 400);
    assert_at(times[2], 800);
    assert_at(times[3], 800);
}

#[tokio::test(start_paused = true)]
async fn test_wpm_change_mid_drain_applies_to_next_segment() {
    let mut harness = Harness::start(PacingConfig::default());
    harness.enqueue("a", TEN_WORDS);
    harness.enqueue("b", TEN_WORDS);

    let (a, _) = harness.next().await;
    harness
        .handle
        .update_configuration(PacingConfigUpdate::wpm(300.0))
        .unwrap();

    // A keeps its declared duration and its scheduled wakeup
    assert_eq!(a.duration_ms, 4500);
    let (b, at) = harness.next().await;
    assert_at(at, 4500);
    assert_eq!(b.duration_ms, 2500);
}

#[tokio::test(start_paused = true)]
async fn test_instant_mode_releases_without_queueing() {
    let mut harness = Harness::start(PacingConfig::with_mode(PacingMode::Instant));
    harness.enqueue("a", TEN_WORDS);
    harness.enqueue("b", "second");

    let (a, at) = harness.next().await;
    assert_eq!(a.duration_ms, 0);
    assert_at(at, 0);
    let (b, at) = harness.next().await;
    assert_eq!(b.segment.id, "b");
    assert_at(at, 0);

    let status = harness.handle.snapshot().await.unwrap();
    assert_eq!(status.queue_length, 0);
    assert!(!status.running);
}

#[tokio::test(start_paused = true)]
async fn test_instant_segment_overtakes_queued_ones() {
    let mut harness = Harness::start(PacingConfig::default());
    harness.enqueue("a", TEN_WORDS);
    harness.enqueue("b", TEN_WORDS);
    let (a, _) = harness.next().await;
    assert_eq!(a.segment.id, "a");

    harness
        .handle
        .update_configuration(PacingConfigUpdate::mode(PacingMode::Instant))
        .unwrap();
    harness.enqueue("c", "urgent");

    let (c, at) = harness.next().await;
    assert_eq!(c.segment.id, "c");
    assert_at(at, 0);

    // B was already waiting on A's dwell; it goes out when that wakeup fires
    let (b, at) = harness.next().await;
    assert_eq!(b.segment.id, "b");
    assert_eq!(b.duration_ms, 0);
    assert_at(at, 4500);
}

#[tokio::test(start_paused = true)]
async fn test_fifo_order_under_bursty_input() {
    let mut harness = Harness::start(PacingConfig::with_mode(PacingMode::Streaming));
    let ids = ["s1", "s2", "s3", "s4", "s5"];
    for (i, id) in ids.iter().enumerate() {
        let text = vec!["word"; i + 1].join(" ");
        harness.enqueue(id, &text);
    }

    // 1 + 2 + 3 + 4 + 5 revisions
    let mut seen = Vec::new();
    for _ in 0..15 {
        let (emission, _) = harness.next().await;
        seen.push(emission.segment.id);
    }
    seen.dedup();
    assert_eq!(seen, ids);

    harness.handle.wait_idle().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_empty_segment_does_not_stall() {
    let mut harness = Harness::start(PacingConfig::default());
    harness.enqueue("empty", "");
    harness.enqueue("next", "hi");

    let (empty, _) = harness.next().await;
    assert_eq!(empty.duration_ms, 500);
    let (next, at) = harness.next().await;
    assert_eq!(next.segment.id, "next");
    assert_at(at, 500);

    let status = harness.handle.wait_idle().await.unwrap();
    assert_eq!(status.emitted_total, 2);
    assert!(tokio::time::timeout(Duration::from_secs(60), harness.rx.recv())
        .await
        .is_err());
}
