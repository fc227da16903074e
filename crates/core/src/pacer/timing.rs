//! Reading-time formulas
//!
//! Durations are rounded to whole milliseconds so the declared duration of an
//! emission and the wakeup scheduled after it are always the same value.

/// Milliseconds per minute
const MS_PER_MINUTE: f64 = 60_000.0;

/// Sentence-mode dwell: reading time of `word_count` words plus the fixed delay
///
/// A segment without words dwells for the delay alone.
pub fn sentence_duration_ms(word_count: usize, wpm: f64, sentence_delay_ms: u64) -> u64 {
    if word_count == 0 {
        return sentence_delay_ms;
    }
    let reading_ms = word_count as f64 / wpm * MS_PER_MINUTE;
    (reading_ms.round() as u64).saturating_add(sentence_delay_ms)
}

/// Streaming-mode interval between successive words
pub fn word_interval_ms(wpm: f64) -> u64 {
    (MS_PER_MINUTE / wpm).round() as u64
}
