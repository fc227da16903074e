//! Integration tests for flush / stop / clear / reset and sink management

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cadence_core::sink::{ChannelSink, FnSink, QueueSink};
use cadence_core::{
    Error, PacedEmission, PacingConfig, PacingConfigUpdate, PacingEngine, PacingHandle,
    PacingMode, Segment,
};
use tokio::sync::mpsc::UnboundedReceiver;

const TEN_WORDS: &str = "one two three four five six seven eight nine ten";

fn start(config: PacingConfig) -> (PacingHandle, UnboundedReceiver<PacedEmission>) {
    let (sink, rx) = QueueSink::new();
    let (engine, handle) = PacingEngine::new(config).unwrap();
    engine.with_sink(Arc::new(sink)).start();
    (handle, rx)
}

/// Assert nothing is emitted for a minute of (paused) time
async fn assert_silent(rx: &mut UnboundedReceiver<PacedEmission>) {
    let next = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
    assert!(next.is_err(), "unexpected emission: {:?}", next);
}

#[tokio::test(start_paused = true)]
async fn test_flush_and_clear_on_empty_engine_are_noops() {
    let (handle, mut rx) = start(PacingConfig::default());

    handle.flush().unwrap();
    handle.clear().unwrap();
    handle.stop().unwrap();

    let status = handle.snapshot().await.unwrap();
    assert!(status.is_idle());
    assert_eq!(status.emitted_total, 0);
    assert_silent(&mut rx).await;
}

#[tokio::test(start_paused = true)]
async fn test_flush_collapses_pacing() {
    let (handle, mut rx) = start(PacingConfig::default());
    for (id, text) in [("a", TEN_WORDS), ("b", TEN_WORDS), ("c", TEN_WORDS)] {
        handle.enqueue(Segment::new(id, text)).unwrap();
    }
    handle.flush().unwrap();

    let mut ids = Vec::new();
    for _ in 0..3 {
        let emission = rx.recv().await.unwrap();
        assert_eq!(emission.duration_ms, 0);
        ids.push(emission.segment.id);
    }
    assert_eq!(ids, vec!["a", "b", "c"]);

    let status = handle.snapshot().await.unwrap();
    assert_eq!(status.queue_length, 0);
    assert!(!status.running);
    assert_silent(&mut rx).await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_preserves_queue() {
    let (handle, mut rx) = start(PacingConfig::default());
    handle.enqueue(Segment::new("a", TEN_WORDS)).unwrap();
    handle.enqueue(Segment::new("b", TEN_WORDS)).unwrap();

    assert_eq!(rx.recv().await.unwrap().segment.id, "a");
    handle.stop().unwrap();

    let status = handle.snapshot().await.unwrap();
    assert_eq!(status.queue_length, 1);
    assert!(!status.running);
    assert!(status.is_paused());
    assert_silent(&mut rx).await;

    // A later enqueue resumes from the head of the queue
    handle.enqueue(Segment::new("c", "third")).unwrap();
    assert_eq!(rx.recv().await.unwrap().segment.id, "b");
    assert_eq!(rx.recv().await.unwrap().segment.id, "c");
}

#[tokio::test(start_paused = true)]
async fn test_flush_after_stop_releases_paused_queue() {
    let (handle, mut rx) = start(PacingConfig::default());
    handle.enqueue(Segment::new("a", TEN_WORDS)).unwrap();
    handle.enqueue(Segment::new("b", TEN_WORDS)).unwrap();
    rx.recv().await.unwrap();
    handle.stop().unwrap();

    handle.flush().unwrap();
    let b = rx.recv().await.unwrap();
    assert_eq!(b.segment.id, "b");
    assert!(b.is_immediate());
    assert!(handle.snapshot().await.unwrap().is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_clear_discards_without_emitting() {
    let (handle, mut rx) = start(PacingConfig::with_mode(PacingMode::Streaming));
    handle.enqueue(Segment::new("a", "one two three")).unwrap();
    handle.enqueue(Segment::new("b", "four")).unwrap();

    assert_eq!(rx.recv().await.unwrap().segment.text, "one");
    handle.clear().unwrap();

    let status = handle.snapshot().await.unwrap();
    assert!(status.is_idle());
    assert_eq!(status.emitted_total, 1);
    assert_silent(&mut rx).await;
}

#[tokio::test(start_paused = true)]
async fn test_reset_zeroes_counters() {
    let (handle, mut rx) = start(PacingConfig::default());
    handle.enqueue(Segment::new("a", TEN_WORDS)).unwrap();
    handle.enqueue(Segment::new("b", TEN_WORDS)).unwrap();
    rx.recv().await.unwrap();

    handle.reset().unwrap();
    let status = handle.snapshot().await.unwrap();
    assert!(status.is_idle());
    assert_eq!(status.emitted_total, 0);
    assert_eq!(status.last_emission_at, None);
    assert_eq!(status.config, PacingConfig::default());
    assert_silent(&mut rx).await;
}

#[tokio::test(start_paused = true)]
async fn test_invalid_update_keeps_previous_config() {
    let (handle, mut rx) = start(PacingConfig::default());

    let result = handle.update_configuration(PacingConfigUpdate {
        mode: Some(PacingMode::Streaming),
        wpm: Some(-5.0),
        sentence_delay_ms: None,
    });
    assert!(matches!(result, Err(Error::InvalidConfig(_))));

    handle.enqueue(Segment::new("a", TEN_WORDS)).unwrap();
    let a = rx.recv().await.unwrap();
    assert_eq!(a.duration_ms, 4500);
    assert_eq!(handle.snapshot().await.unwrap().config.mode, PacingMode::Sentence);
}

#[tokio::test(start_paused = true)]
async fn test_sink_added_at_runtime_receives_later_emissions() {
    let (handle, mut rx) = start(PacingConfig::with_mode(PacingMode::Instant));
    handle.enqueue(Segment::new("before", "x")).unwrap();
    rx.recv().await.unwrap();

    let (channel, mut viewer) = ChannelSink::with_default_capacity();
    handle.add_sink(Arc::new(channel)).unwrap();
    handle.enqueue(Segment::new("after", "y")).unwrap();

    assert_eq!(viewer.recv().await.unwrap().segment.id, "after");
    assert_eq!(rx.recv().await.unwrap().segment.id, "after");
}

#[tokio::test(start_paused = true)]
async fn test_failing_sink_does_not_affect_others() {
    let count = Arc::new(AtomicUsize::new(0));
    let (dead, dead_rx) = QueueSink::new();
    drop(dead_rx);
    let counter = {
        let count = count.clone();
        FnSink::new(move |_| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    };

    let (engine, handle) = PacingEngine::new(PacingConfig::default()).unwrap();
    engine
        .with_sink(Arc::new(dead))
        .with_sink(Arc::new(counter))
        .start();

    handle.enqueue(Segment::new("a", "one")).unwrap();
    handle.enqueue(Segment::new("b", "two")).unwrap();
    let status = handle.wait_idle().await.unwrap();

    assert_eq!(status.emitted_total, 2);
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_handles_share_one_engine() {
    let (handle, mut rx) = start(PacingConfig::with_mode(PacingMode::Instant));
    let other = handle.clone();

    handle.enqueue(Segment::new("a", "from one")).unwrap();
    other.enqueue(Segment::new("b", "from other")).unwrap();

    assert_eq!(rx.recv().await.unwrap().segment.id, "a");
    assert_eq!(rx.recv().await.unwrap().segment.id, "b");
    assert_eq!(other.snapshot().await.unwrap().emitted_total, 2);
}

#[tokio::test]
async fn test_commands_fail_after_shutdown() {
    let (engine, handle) = PacingEngine::new(PacingConfig::default()).unwrap();
    let task = engine.start();
    handle.enqueue(Segment::new("a", TEN_WORDS)).unwrap();
    handle.shutdown().unwrap();
    task.await.unwrap();

    assert!(matches!(handle.flush(), Err(Error::EngineClosed)));
    assert!(matches!(handle.wait_idle().await, Err(Error::EngineClosed)));
}
