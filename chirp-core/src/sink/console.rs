//! Console sink: the live terminal display.

use std::io::Write;

use crate::error::Result;
use crate::sink::{TranscriptSaved, TranscriptSink};
use crate::transcript::TranscriptionResult;

/// Writes one line per result and a summary on save to stdout.
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl TranscriptSink for ConsoleSink {
    fn name(&self) -> &'static str {
        "console"
    }

    fn publish(&mut self, result: &TranscriptionResult) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(
            stdout,
            "[{:>4} {:>6.2}s] {}",
            result.window_index,
            result.processing_time.as_secs_f64(),
            result.text
        )?;
        Ok(())
    }

    fn publish_saved(&mut self, saved: &TranscriptSaved) -> Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(
            stdout,
            "transcript saved to {} ({} chunks, {} words)",
            saved.filename.display(),
            saved.count,
            saved.word_count
        )?;
        Ok(())
    }
}
