//! # chirp-core
//!
//! Live speech-transcription engine SDK.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → capture callback → bounded AudioChunk queue → session worker
//!                                                                │
//!                                                        WindowAssembler
//!                                                                │
//!                                                     InferenceDispatcher
//!                                                   (WAV + manifest → engine)
//!                                                                │
//!                                              TranscriptAggregator → sinks
//!                                           (console, file, broadcast events)
//! ```
//!
//! The audio callback never blocks. All blocking (queue polls, the single
//! in-flight inference call) happens on the per-session worker thread,
//! which `SessionController` spawns on `start()` and joins on `stop()`.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod error;
pub mod inference;
pub mod protocol;
pub mod session;
pub mod sink;
pub mod task;
pub mod transcript;

// Convenience re-exports for downstream crates
pub use audio::{CaptureBackend, CaptureSpec, CaptureStream, CpalBackend, DeviceSelector};
pub use error::ChirpError;
pub use inference::{EngineHandle, InferenceEngine};
pub use protocol::events::{ControlAck, ControlRequest, LiveEvent, StartPayload};
pub use session::{SessionConfig, SessionController, SessionState};
pub use sink::{SinkBroadcaster, TranscriptSink};
pub use task::{Language, Pnc, TaskConfig, TaskKind};
pub use transcript::{TranscriptAggregator, TranscriptionResult};
