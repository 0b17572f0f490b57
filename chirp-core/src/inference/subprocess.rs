//! `SubprocessEngine` — external inference engine behind a process boundary.
//!
//! The engine is a separate program (typically a Python worker hosting the
//! actual speech model) invoked once per dispatch:
//!
//! ```text
//! <command> <extra args…> --manifest <path> --batch-size <n> --beam-size <w>
//! ```
//!
//! It must print exactly one result line per manifest entry to stdout, in
//! entry order. Non-zero exit status or a result-count mismatch is an
//! inference failure for that window; the session keeps running.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{ChirpError, Result};
use crate::inference::InferenceEngine;

pub struct SubprocessEngine {
    command: PathBuf,
    extra_args: Vec<String>,
    beam_width: u32,
}

impl SubprocessEngine {
    pub fn new(command: impl Into<PathBuf>, extra_args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            extra_args,
            beam_width: 1,
        }
    }
}

impl InferenceEngine for SubprocessEngine {
    fn warm_up(&mut self) -> Result<()> {
        // The worker process loads its model lazily; all we can verify up
        // front is that the command exists when given as a path.
        if self.command.components().count() > 1 && !self.command.exists() {
            return Err(ChirpError::Inference(format!(
                "engine command not found: {}",
                self.command.display()
            )));
        }
        info!(command = %self.command.display(), "inference engine configured");
        Ok(())
    }

    fn set_beam_width(&mut self, beam_width: u32) -> Result<()> {
        self.beam_width = beam_width.max(1);
        debug!(beam_width = self.beam_width, "beam width updated");
        Ok(())
    }

    fn transcribe_manifest(
        &mut self,
        manifest_path: &Path,
        batch_size: usize,
    ) -> Result<Vec<String>> {
        let output = Command::new(&self.command)
            .args(&self.extra_args)
            .arg("--manifest")
            .arg(manifest_path)
            .arg("--batch-size")
            .arg(batch_size.to_string())
            .arg("--beam-size")
            .arg(self.beam_width.to_string())
            .output()
            .map_err(|e| {
                ChirpError::Inference(format!(
                    "failed to spawn {}: {e}",
                    self.command.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = ?output.status.code(), "engine process failed");
            return Err(ChirpError::Inference(format!(
                "engine exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let results: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|line| line.trim_end().to_string())
            .filter(|line| !line.is_empty())
            .collect();

        if results.is_empty() {
            return Err(ChirpError::Inference(
                "engine produced no output lines".into(),
            ));
        }

        Ok(results)
    }
}
