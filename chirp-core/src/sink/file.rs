//! Transcript file sink.
//!
//! Accumulates result lines in memory and writes the transcript file exactly
//! once, when the saved notification arrives — the file is never partially
//! overwritten mid-session. A session with zero results still produces the
//! (empty) file.

use std::fs;

use tracing::info;

use crate::error::Result;
use crate::sink::{TranscriptSaved, TranscriptSink};
use crate::transcript::TranscriptionResult;

#[derive(Debug, Default)]
pub struct TranscriptFileSink {
    lines: Vec<String>,
}

impl TranscriptFileSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TranscriptSink for TranscriptFileSink {
    fn name(&self) -> &'static str {
        "file"
    }

    fn publish(&mut self, result: &TranscriptionResult) -> Result<()> {
        self.lines.push(result.text.clone());
        Ok(())
    }

    fn publish_saved(&mut self, saved: &TranscriptSaved) -> Result<()> {
        if let Some(parent) = saved.filename.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&saved.filename, self.lines.join("\n"))?;
        info!(
            filename = %saved.filename.display(),
            count = saved.count,
            "transcript written"
        );
        Ok(())
    }
}
