//! Task configuration: what the inference engine should do with a window.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Languages supported by the inference engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
    Es,
    Fr,
}

impl Language {
    /// ISO code as it appears in manifests and protocol events.
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::De => "de",
            Language::Es => "es",
            Language::Fr => "fr",
        }
    }
}

/// Recognition vs. speech-to-text translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Asr,
    Translation,
}

impl TaskKind {
    /// Task name as the inference engine expects it in the manifest record.
    pub fn manifest_name(&self) -> &'static str {
        match self {
            TaskKind::Asr => "asr",
            TaskKind::Translation => "s2t_translation",
        }
    }
}

/// Punctuation-and-capitalization flag, serialized as `"yes"`/`"no"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Pnc {
    #[default]
    Yes,
    No,
}

/// Per-session task configuration attached to every dispatched window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    pub kind: TaskKind,
    pub source_lang: Language,
    pub target_lang: Language,
    pub pnc: Pnc,
    /// Decoding beam width, applied to the engine once at session start.
    pub beam_width: u32,
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            kind: TaskKind::Asr,
            source_lang: Language::En,
            target_lang: Language::En,
            pnc: Pnc::Yes,
            beam_width: 1,
        }
    }
}

impl TaskConfig {
    /// For plain recognition the target language must equal the source;
    /// a mismatched target is coerced with a warning.
    pub fn normalized(mut self) -> Self {
        if self.kind == TaskKind::Asr && self.target_lang != self.source_lang {
            warn!(
                source = self.source_lang.code(),
                target = self.target_lang.code(),
                "asr task with mismatched target language, coercing target to source"
            );
            self.target_lang = self.source_lang;
        }
        self.beam_width = self.beam_width.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn languages_serialize_as_lowercase_codes() {
        assert_eq!(serde_json::to_value(Language::De).unwrap(), "de");
        assert_eq!(serde_json::to_value(Pnc::No).unwrap(), "no");
        assert_eq!(serde_json::to_value(TaskKind::Translation).unwrap(), "translation");
    }

    #[test]
    fn translation_maps_to_engine_task_name() {
        assert_eq!(TaskKind::Asr.manifest_name(), "asr");
        assert_eq!(TaskKind::Translation.manifest_name(), "s2t_translation");
    }

    #[test]
    fn asr_normalization_coerces_target_language() {
        let config = TaskConfig {
            kind: TaskKind::Asr,
            source_lang: Language::Fr,
            target_lang: Language::En,
            ..TaskConfig::default()
        }
        .normalized();
        assert_eq!(config.target_lang, Language::Fr);

        let translation = TaskConfig {
            kind: TaskKind::Translation,
            source_lang: Language::En,
            target_lang: Language::De,
            ..TaskConfig::default()
        }
        .normalized();
        assert_eq!(translation.target_lang, Language::De);
    }
}
