//! Session transcript: ordered, append-only, in-memory.
//!
//! The dispatcher guarantees results arrive in window-index order, so
//! `append` is a plain push. Durability is a sink concern — this structure
//! does no I/O.

use std::time::Duration;

use crate::task::TaskConfig;

/// One window's transcription outcome. Immutable once created.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// Index of the window this text was produced from.
    pub window_index: u64,
    /// Recognised (or translated) text.
    pub text: String,
    /// Wall-clock time the inference call took.
    pub processing_time: Duration,
    /// Task configuration the result was produced under.
    pub task: TaskConfig,
}

/// Ordered collection of results for one session.
#[derive(Debug, Default)]
pub struct TranscriptAggregator {
    results: Vec<TranscriptionResult>,
}

impl TranscriptAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result. Indices must be strictly increasing; gaps from
    /// skipped failed windows are expected and preserved.
    pub fn append(&mut self, result: TranscriptionResult) {
        debug_assert!(
            self.results
                .last()
                .map(|last| last.window_index < result.window_index)
                .unwrap_or(true),
            "results must arrive in window-index order"
        );
        self.results.push(result);
    }

    /// Rolling live view: the most recent `last_n` result texts joined with
    /// spaces.
    pub fn current_view(&self, last_n: usize) -> String {
        let start = self.results.len().saturating_sub(last_n);
        self.results[start..]
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Total words across all result texts.
    pub fn word_count(&self) -> usize {
        self.results
            .iter()
            .map(|r| r.text.split_whitespace().count())
            .sum()
    }

    /// Number of results collected.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn results(&self) -> &[TranscriptionResult] {
        &self.results
    }

    /// The persisted form: result texts newline-joined in window order.
    pub fn to_text(&self) -> String {
        self.results
            .iter()
            .map(|r| r.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: u64, text: &str) -> TranscriptionResult {
        TranscriptionResult {
            window_index: index,
            text: text.to_string(),
            processing_time: Duration::from_millis(10),
            task: TaskConfig::default(),
        }
    }

    #[test]
    fn view_shows_most_recent_results() {
        let mut transcript = TranscriptAggregator::new();
        for (i, text) in ["alpha", "bravo", "charlie", "delta"].iter().enumerate() {
            transcript.append(result(i as u64, text));
        }
        assert_eq!(transcript.current_view(3), "bravo charlie delta");
        assert_eq!(transcript.current_view(10), "alpha bravo charlie delta");
    }

    #[test]
    fn word_count_sums_all_results() {
        let mut transcript = TranscriptAggregator::new();
        transcript.append(result(0, "hello there"));
        transcript.append(result(1, "general kenobi"));
        assert_eq!(transcript.word_count(), 4);
    }

    #[test]
    fn gaps_from_failed_windows_are_preserved() {
        let mut transcript = TranscriptAggregator::new();
        transcript.append(result(0, "first"));
        // Window 1 failed and was skipped.
        transcript.append(result(2, "third"));
        let indices: Vec<u64> = transcript.results().iter().map(|r| r.window_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(transcript.to_text(), "first\nthird");
    }

    #[test]
    fn empty_transcript_persists_as_empty_text() {
        let transcript = TranscriptAggregator::new();
        assert!(transcript.is_empty());
        assert_eq!(transcript.to_text(), "");
        assert_eq!(transcript.word_count(), 0);
    }
}
