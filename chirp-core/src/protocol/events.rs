//! Wire types for the live-control protocol.
//!
//! ## Message flow
//!
//! | Direction | Frame |
//! |-----------|-------|
//! | client → server | `{"event": "start_transcription", "data": {…}}` |
//! | client → server | `{"event": "stop_transcription"}` |
//! | server → client | `{"status": "started", "session_id": "…"}` |
//! | server → client | `{"event": "transcription", "data": {…}}` |
//! | server → client | `{"event": "transcript_saved", "data": {…}}` |

use serde::{Deserialize, Serialize};

use crate::audio::DeviceSelector;
use crate::sink::TranscriptSaved;
use crate::task::{Language, Pnc, TaskKind};
use crate::transcript::TranscriptionResult;

/// Payload of `start_transcription`. Every field has a default so minimal
/// clients can send `{}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StartPayload {
    pub device: DeviceSelector,
    pub task: TaskKind,
    pub source_lang: Language,
    pub target_lang: Language,
    pub pnc: Pnc,
    /// Window duration in seconds.
    pub buffer_size: f32,
    pub beam_size: u32,
}

impl Default for StartPayload {
    fn default() -> Self {
        Self {
            device: DeviceSelector::Default,
            task: TaskKind::Asr,
            source_lang: Language::En,
            target_lang: Language::En,
            pnc: Pnc::Yes,
            buffer_size: 2.0,
            beam_size: 1,
        }
    }
}

/// Inbound control frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ControlRequest {
    StartTranscription(StartPayload),
    StopTranscription,
}

/// Control responses, discriminated by `status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ControlAck {
    Started { session_id: String },
    Stopped,
    NoSession,
    Error { message: String },
}

/// One incremental transcription update pushed to every listener.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionEvent {
    pub text: String,
    pub chunk_index: u64,
    /// Wall-clock inference duration, formatted `"<secs>s"` with two
    /// decimals.
    pub processing_time: String,
    pub source_lang: Language,
    pub target_lang: Language,
    pub task: TaskKind,
}

impl From<&TranscriptionResult> for TranscriptionEvent {
    fn from(result: &TranscriptionResult) -> Self {
        Self {
            text: result.text.clone(),
            chunk_index: result.window_index,
            processing_time: format!("{:.2}s", result.processing_time.as_secs_f64()),
            source_lang: result.task.source_lang,
            target_lang: result.task.target_lang,
            task: result.task.kind,
        }
    }
}

/// Final notification that the session transcript reached disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptSavedEvent {
    pub filename: String,
    pub count: usize,
    pub word_count: usize,
}

impl From<&TranscriptSaved> for TranscriptSavedEvent {
    fn from(saved: &TranscriptSaved) -> Self {
        Self {
            filename: saved.filename.display().to_string(),
            count: saved.count,
            word_count: saved.word_count,
        }
    }
}

/// Outbound push events, discriminated by `event`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum LiveEvent {
    Transcription(TranscriptionEvent),
    TranscriptSaved(TranscriptSavedEvent),
}

/// Response body of the `/devices` query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<crate::audio::DeviceInfo>,
}
