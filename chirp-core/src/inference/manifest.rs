//! Manifest records: the file-based descriptor the inference engine reads.
//!
//! One JSON object per inference call:
//!
//! ```json
//! {"audio_filepath": "/abs/path/chunk_20260806_101500_0.wav",
//!  "duration": 2.0, "taskname": "asr", "source_lang": "en",
//!  "target_lang": "en", "pnc": "yes", "answer": "na"}
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::task::{Language, Pnc, TaskConfig};

/// A single manifest entry describing one audio artifact and the task to
/// perform on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Absolute path to the audio artifact.
    pub audio_filepath: String,
    /// Audio duration in seconds. Informational for the engine.
    pub duration: f64,
    /// Engine task name (`asr` or `s2t_translation`).
    pub taskname: String,
    pub source_lang: Language,
    pub target_lang: Language,
    pub pnc: Pnc,
    /// Ground-truth slot, unused for live inference.
    pub answer: String,
}

impl ManifestEntry {
    pub fn new(audio_filepath: &Path, duration: f64, task: &TaskConfig) -> Self {
        Self {
            audio_filepath: audio_filepath.display().to_string(),
            duration,
            taskname: task.kind.manifest_name().to_string(),
            source_lang: task.source_lang,
            target_lang: task.target_lang,
            pnc: task.pnc,
            answer: "na".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{TaskKind, TaskConfig};
    use std::path::PathBuf;

    #[test]
    fn manifest_entry_serializes_with_engine_field_names() {
        let task = TaskConfig {
            kind: TaskKind::Translation,
            source_lang: Language::En,
            target_lang: Language::De,
            pnc: Pnc::No,
            beam_width: 4,
        };
        let entry = ManifestEntry::new(&PathBuf::from("/tmp/chunk_0.wav"), 2.0, &task);

        let json = serde_json::to_value(&entry).expect("serialize manifest entry");
        assert_eq!(json["audio_filepath"], "/tmp/chunk_0.wav");
        assert_eq!(json["duration"], 2.0);
        assert_eq!(json["taskname"], "s2t_translation");
        assert_eq!(json["source_lang"], "en");
        assert_eq!(json["target_lang"], "de");
        assert_eq!(json["pnc"], "no");
        assert_eq!(json["answer"], "na");
    }

    #[test]
    fn manifest_entry_round_trips() {
        let entry = ManifestEntry::new(
            &PathBuf::from("/tmp/a.wav"),
            3.0,
            &TaskConfig::default(),
        );
        let json = serde_json::to_string(&entry).unwrap();
        let back: ManifestEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.taskname, "asr");
        assert_eq!(back.pnc, Pnc::Yes);
    }
}
