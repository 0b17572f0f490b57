//! Window dispatch: temp artifacts in, one transcription result out.
//!
//! Per window the dispatcher writes a WAV artifact plus a manifest record,
//! takes the engine lock, runs inference, and removes both files. Removal
//! happens on every exit path — success, engine failure, serialization
//! failure — via [`TempArtifacts`], whose `Drop` impl backstops the explicit
//! `cleanup()` call. Cleanup is best-effort by contract: a missing file is
//! ignored, anything else is logged and swallowed.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::buffering::assembler::AudioWindow;
use crate::error::{ChirpError, Result};
use crate::inference::manifest::ManifestEntry;
use crate::inference::EngineHandle;
use crate::task::TaskConfig;
use crate::transcript::TranscriptionResult;

/// Remove a temp artifact without ever failing the caller. `NotFound` is
/// the idempotent case (already cleaned) and is silently accepted.
fn remove_quiet(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), "temp artifact cleanup failed: {e}"),
    }
}

/// Scoped pair of temp files for one dispatch call.
struct TempArtifacts {
    audio: PathBuf,
    manifest: PathBuf,
    cleaned: bool,
}

impl TempArtifacts {
    fn new(audio: PathBuf, manifest: PathBuf) -> Self {
        Self {
            audio,
            manifest,
            cleaned: false,
        }
    }

    fn remove_both(&mut self) {
        remove_quiet(&self.audio);
        remove_quiet(&self.manifest);
        self.cleaned = true;
    }

    fn cleanup(mut self) {
        self.remove_both();
    }
}

impl Drop for TempArtifacts {
    fn drop(&mut self) {
        if !self.cleaned {
            self.remove_both();
        }
    }
}

/// Serializes windows to disk and feeds them to the engine one at a time.
pub struct InferenceDispatcher {
    engine: EngineHandle,
    /// Absolute directory for per-window temp artifacts.
    temp_dir: PathBuf,
    session_id: String,
}

impl InferenceDispatcher {
    /// Create a dispatcher writing artifacts under `temp_dir`.
    ///
    /// The directory is created if missing and resolved to an absolute path
    /// so manifest records always carry absolute `audio_filepath`s.
    pub fn new(engine: EngineHandle, temp_dir: &Path, session_id: &str) -> Result<Self> {
        fs::create_dir_all(temp_dir)?;
        let temp_dir = temp_dir.canonicalize()?;
        Ok(Self {
            engine,
            temp_dir,
            session_id: session_id.to_string(),
        })
    }

    /// Run one window through the engine.
    ///
    /// Windows must be dispatched in assembly order; the engine lock keeps
    /// calls serialized even across sessions, so results come back in
    /// window-index order.
    ///
    /// # Errors
    /// `ChirpError::Inference` on engine failure or an empty result set.
    /// Artifact cleanup has already happened when an error is returned.
    pub fn dispatch(&self, window: &AudioWindow, task: &TaskConfig) -> Result<TranscriptionResult> {
        let audio_path = self
            .temp_dir
            .join(format!("chunk_{}_{}.wav", self.session_id, window.index));
        let manifest_path = self
            .temp_dir
            .join(format!("manifest_{}_{}.json", self.session_id, window.index));
        let artifacts = TempArtifacts::new(audio_path, manifest_path);

        write_wav(&artifacts.audio, window)?;

        let entry = ManifestEntry::new(&artifacts.audio, window.duration_secs(), task);
        let record = serde_json::to_string(&entry)
            .map_err(|e| ChirpError::Inference(format!("manifest serialization: {e}")))?;
        fs::write(&artifacts.manifest, record)?;

        debug!(
            window = window.index,
            audio = %artifacts.audio.display(),
            "dispatching window to inference engine"
        );

        let started = Instant::now();
        let texts = {
            let mut engine = self.engine.0.lock();
            engine.transcribe_manifest(&artifacts.manifest, 1)
        }?;
        let processing_time = started.elapsed();

        let text = texts.into_iter().next().ok_or_else(|| {
            ChirpError::Inference("engine returned no result for manifest entry".into())
        })?;

        artifacts.cleanup();

        info!(
            window = window.index,
            elapsed_ms = processing_time.as_millis() as u64,
            "window transcribed"
        );

        Ok(TranscriptionResult {
            window_index: window.index,
            text,
            processing_time,
            task: task.clone(),
        })
    }
}

/// Write an audio window as a 16-bit PCM WAV file.
fn write_wav(path: &Path, window: &AudioWindow) -> Result<()> {
    let spec = hound::WavSpec {
        channels: window.channels,
        sample_rate: window.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| ChirpError::Inference(format!("wav create: {e}")))?;
    for sample in &window.samples {
        let quantized = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        writer
            .write_sample(quantized)
            .map_err(|e| ChirpError::Inference(format!("wav write: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| ChirpError::Inference(format!("wav finalize: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InferenceEngine;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn test_window(index: u64) -> AudioWindow {
        AudioWindow {
            samples: vec![0.0; 1600],
            channels: 1,
            sample_rate: 16_000,
            index,
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "chirp-dispatch-{tag}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    /// Engine that records whether the artifacts existed at call time.
    struct SnoopEngine {
        saw_audio: Arc<AtomicUsize>,
        fail: bool,
    }

    impl InferenceEngine for SnoopEngine {
        fn warm_up(&mut self) -> Result<()> {
            Ok(())
        }

        fn set_beam_width(&mut self, _beam_width: u32) -> Result<()> {
            Ok(())
        }

        fn transcribe_manifest(
            &mut self,
            manifest_path: &Path,
            _batch_size: usize,
        ) -> Result<Vec<String>> {
            let raw = fs::read_to_string(manifest_path).expect("manifest readable");
            let entry: ManifestEntry = serde_json::from_str(&raw).expect("manifest parses");
            if Path::new(&entry.audio_filepath).exists() {
                self.saw_audio.fetch_add(1, Ordering::Relaxed);
            }
            if self.fail {
                return Err(ChirpError::Inference("intentional test failure".into()));
            }
            Ok(vec![format!("heard {}", entry.duration)])
        }
    }

    #[test]
    fn dispatch_produces_result_and_removes_artifacts() {
        let dir = temp_dir("ok");
        let saw_audio = Arc::new(AtomicUsize::new(0));
        let engine = EngineHandle::new(SnoopEngine {
            saw_audio: Arc::clone(&saw_audio),
            fail: false,
        });
        let dispatcher = InferenceDispatcher::new(engine, &dir, "test").unwrap();

        let result = dispatcher
            .dispatch(&test_window(0), &TaskConfig::default())
            .expect("dispatch succeeds");

        assert_eq!(result.window_index, 0);
        assert_eq!(result.text, "heard 0.1");
        assert_eq!(saw_audio.load(Ordering::Relaxed), 1);

        // Both artifacts are gone, and the directory only ever held them.
        let leftover: Vec<_> = fs::read_dir(&dir).unwrap().collect();
        assert!(leftover.is_empty(), "temp artifacts not cleaned: {leftover:?}");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn dispatch_cleans_up_on_engine_failure() {
        let dir = temp_dir("fail");
        let engine = EngineHandle::new(SnoopEngine {
            saw_audio: Arc::new(AtomicUsize::new(0)),
            fail: true,
        });
        let dispatcher = InferenceDispatcher::new(engine, &dir, "test").unwrap();

        let err = dispatcher
            .dispatch(&test_window(3), &TaskConfig::default())
            .unwrap_err();
        assert!(matches!(err, ChirpError::Inference(_)));

        let leftover: Vec<_> = fs::read_dir(&dir).unwrap().collect();
        assert!(leftover.is_empty(), "temp artifacts not cleaned: {leftover:?}");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn remove_quiet_is_idempotent() {
        let path = std::env::temp_dir().join(format!(
            "chirp-remove-quiet-{}.tmp",
            std::process::id()
        ));
        fs::write(&path, b"x").unwrap();
        remove_quiet(&path);
        // Second removal of a missing file must not panic or warn-fail.
        remove_quiet(&path);
        assert!(!path.exists());
    }
}
