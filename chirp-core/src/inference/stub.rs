//! `StubEngine` — placeholder backend that echoes manifest metadata.
//!
//! Used when no external engine command is configured, so the full capture →
//! window → dispatch → sink pipeline can be exercised end-to-end. Reads the
//! manifest file back like a real engine would, which also makes it useful
//! for asserting artifact lifetimes in tests.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{ChirpError, Result};
use crate::inference::manifest::ManifestEntry;
use crate::inference::InferenceEngine;

/// Echo-style stub engine.
///
/// For every manifest entry it returns
/// `"[stub: <taskname> <src>-><tgt> <duration>s]"`.
pub struct StubEngine {
    beam_width: u32,
}

impl StubEngine {
    pub fn new() -> Self {
        Self { beam_width: 1 }
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceEngine for StubEngine {
    fn warm_up(&mut self) -> Result<()> {
        debug!("StubEngine::warm_up — no-op");
        Ok(())
    }

    fn set_beam_width(&mut self, beam_width: u32) -> Result<()> {
        self.beam_width = beam_width.max(1);
        Ok(())
    }

    fn transcribe_manifest(
        &mut self,
        manifest_path: &Path,
        _batch_size: usize,
    ) -> Result<Vec<String>> {
        debug!(beam_width = self.beam_width, "stub transcribe");
        let raw = fs::read_to_string(manifest_path)?;
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                let entry: ManifestEntry = serde_json::from_str(line)
                    .map_err(|e| ChirpError::Inference(format!("malformed manifest: {e}")))?;
                Ok(format!(
                    "[stub: {} {}->{} {:.1}s]",
                    entry.taskname,
                    entry.source_lang.code(),
                    entry.target_lang.code(),
                    entry.duration
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskConfig;
    use std::path::PathBuf;

    #[test]
    fn stub_echoes_one_line_per_entry() {
        let dir = std::env::temp_dir();
        let manifest = dir.join(format!("chirp-stub-test-{}.json", std::process::id()));
        let entry = ManifestEntry::new(&PathBuf::from("/tmp/a.wav"), 2.0, &TaskConfig::default());
        fs::write(&manifest, serde_json::to_string(&entry).unwrap()).unwrap();

        let mut engine = StubEngine::new();
        let out = engine.transcribe_manifest(&manifest, 1).unwrap();
        assert_eq!(out, vec!["[stub: asr en->en 2.0s]".to_string()]);

        let _ = fs::remove_file(&manifest);
    }
}
