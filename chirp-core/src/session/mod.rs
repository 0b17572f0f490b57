//! `SessionController` — top-level session lifecycle.
//!
//! ## Lifecycle
//!
//! ```text
//! SessionController::new()
//!     └─► start(config)   → device open confirmed, worker spawned, id returned
//!         └─► stop()      → running=false, worker joined, transcript flushed
//! ```
//!
//! At most one session is `Running` process-wide. `start()` while a session
//! is active stops and joins the old one *inside the same critical section*
//! that installs the new one, so two concurrent `start()` calls serialize
//! and can never both construct a running session.
//!
//! ## Threading
//!
//! `cpal::Stream` is `!Send` on Windows/macOS. The capture stream is
//! therefore opened *inside* the worker thread, which also drops it. A sync
//! mpsc rendezvous propagates the open result back to the `start()` caller:
//! device failures are fatal and surfaced synchronously.

pub mod worker;

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;

use chrono::Local;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{error, info};

use crate::{
    audio::{CaptureBackend, CaptureSpec, DeviceSelector},
    buffering::{assembler::WindowAssembler, chunk_queue},
    error::{ChirpError, Result},
    inference::{dispatch::InferenceDispatcher, EngineHandle},
    protocol::events::{LiveEvent, StartPayload},
    sink::{broadcast::live_event_channel, ConsoleSink, EventSink, SinkBroadcaster, TranscriptFileSink},
    task::{TaskConfig, TaskKind},
};

pub use worker::{DiagnosticsSnapshot, WorkerDiagnostics};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Session constructed but the device is not open yet.
    Idle,
    /// Capturing and transcribing.
    Running,
    /// Stop requested; the worker is finishing its in-flight window.
    Stopping,
    /// Worker exited and the transcript is flushed.
    Stopped,
}

/// Configuration for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub device: DeviceSelector,
    /// Capture sample rate in Hz. The device must support it.
    pub sample_rate: u32,
    pub channels: u16,
    pub task: TaskConfig,
    /// Window duration in seconds.
    pub buffer_secs: f32,
    /// Overlap fraction retained between consecutive windows.
    pub overlap: f32,
    /// Also render results to stdout.
    pub echo_to_console: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device: DeviceSelector::Default,
            sample_rate: 16_000,
            channels: 1,
            task: TaskConfig::default(),
            buffer_secs: 2.0,
            overlap: 0.15,
            echo_to_console: false,
        }
    }
}

impl SessionConfig {
    /// Build a session config from a `start_transcription` payload.
    pub fn from_start_payload(payload: &StartPayload, overlap: f32, echo_to_console: bool) -> Self {
        Self {
            device: payload.device.clone(),
            task: TaskConfig {
                kind: payload.task,
                source_lang: payload.source_lang,
                target_lang: payload.target_lang,
                pnc: payload.pnc,
                beam_width: payload.beam_size,
            },
            buffer_secs: payload.buffer_size.clamp(0.5, 30.0),
            overlap,
            echo_to_console,
            ..Self::default()
        }
    }
}

/// Session id derived from the start timestamp, e.g. `20260806_101500`.
fn new_session_id() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Transcript filename encoding the task direction and session id.
fn transcript_filename(dir: &Path, task: &TaskConfig, session_id: &str) -> PathBuf {
    let name = match task.kind {
        TaskKind::Asr => format!(
            "realtime_{}_transcription_{}.txt",
            task.source_lang.code(),
            session_id
        ),
        TaskKind::Translation => format!(
            "realtime_{}_to_{}_{}.txt",
            task.source_lang.code(),
            task.target_lang.code(),
            session_id
        ),
    };
    dir.join(name)
}

struct ActiveSession {
    id: String,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<SessionState>>,
    diagnostics: Arc<WorkerDiagnostics>,
    worker: thread::JoinHandle<()>,
}

/// Owns the single process-wide active session.
pub struct SessionController {
    engine: EngineHandle,
    backend: Arc<dyn CaptureBackend>,
    transcript_dir: PathBuf,
    temp_dir: PathBuf,
    events_tx: broadcast::Sender<LiveEvent>,
    /// The active-session slot. Every start/stop transition holds this lock
    /// for its whole duration — a session swap is one critical section.
    active: Mutex<Option<ActiveSession>>,
}

impl SessionController {
    pub fn new(
        engine: EngineHandle,
        backend: Arc<dyn CaptureBackend>,
        transcript_dir: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            engine,
            backend,
            transcript_dir: transcript_dir.into(),
            temp_dir: temp_dir.into(),
            events_tx: live_event_channel(),
            active: Mutex::new(None),
        }
    }

    /// Subscribe to live events (`transcription`, `transcript_saved`).
    pub fn subscribe_events(&self) -> broadcast::Receiver<LiveEvent> {
        self.events_tx.subscribe()
    }

    /// Start a session, stopping and fully flushing any running one first.
    ///
    /// Blocks until the audio device is confirmed open (or failed), then
    /// returns the new session id; transcription continues asynchronously.
    ///
    /// # Errors
    /// Device open failures (`NoInputDevice`, `DeviceNotFound`,
    /// `AudioDevice`, `AudioStream`) are fatal: no session is installed and
    /// the error is returned to the caller.
    pub fn start(&self, config: SessionConfig) -> Result<String> {
        let mut slot = self.active.lock();

        if let Some(old) = slot.take() {
            info!(session = %old.id, "stopping previous session before start");
            Self::shutdown(old);
        }

        let task = config.task.clone().normalized();
        let session_id = new_session_id();

        // Beam width is an engine-level setting, applied once per session.
        self.engine.0.lock().set_beam_width(task.beam_width)?;

        let dispatcher =
            InferenceDispatcher::new(self.engine.clone(), &self.temp_dir, &session_id)?;
        let assembler = WindowAssembler::new(
            config.sample_rate,
            config.channels,
            config.buffer_secs,
            config.overlap,
        );

        let mut sinks = SinkBroadcaster::new();
        sinks.subscribe(Box::new(TranscriptFileSink::new()));
        sinks.subscribe(Box::new(EventSink::new(self.events_tx.clone())));
        if config.echo_to_console {
            sinks.subscribe(Box::new(ConsoleSink::new()));
        }

        let transcript_path = transcript_filename(&self.transcript_dir, &task, &session_id);

        let (chunk_tx, chunk_rx) = chunk_queue();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(SessionState::Idle));
        let diagnostics = Arc::new(WorkerDiagnostics::default());

        let spec = CaptureSpec {
            device: config.device.clone(),
            sample_rate: config.sample_rate,
            channels: config.channels,
        };
        let backend = Arc::clone(&self.backend);
        let worker_running = Arc::clone(&running);
        let worker_state = Arc::clone(&state);
        let worker_diagnostics = Arc::clone(&diagnostics);
        let worker_session_id = session_id.clone();

        // Sync rendezvous: the worker reports device open success/failure.
        let (open_tx, open_rx) = std::sync::mpsc::channel::<Result<()>>();

        let handle = thread::Builder::new()
            .name(format!("chirp-session-{session_id}"))
            .spawn(move || {
                // The capture stream must be created and dropped on THIS
                // thread (`cpal::Stream` is `!Send`).
                let mut stream =
                    match backend.open(&spec, chunk_tx, Arc::clone(&worker_running)) {
                        Ok(stream) => {
                            // Running must be observable as soon as start()
                            // returns, so transition before the rendezvous.
                            *worker_state.lock() = SessionState::Running;
                            let _ = open_tx.send(Ok(()));
                            stream
                        }
                        Err(e) => {
                            let _ = open_tx.send(Err(e));
                            worker_running.store(false, Ordering::SeqCst);
                            *worker_state.lock() = SessionState::Stopped;
                            return;
                        }
                    };

                worker::run(worker::WorkerContext {
                    session_id: worker_session_id,
                    task,
                    assembler,
                    dispatcher,
                    chunk_rx,
                    running: Arc::clone(&worker_running),
                    state: Arc::clone(&worker_state),
                    sinks,
                    transcript_path,
                    diagnostics: worker_diagnostics,
                });

                // Device released here, on the owning thread.
                stream.close();
            })
            .map_err(|e| {
                ChirpError::Other(anyhow::anyhow!("failed to spawn session worker: {e}"))
            })?;

        match open_rx.recv() {
            Ok(Ok(())) => {
                *slot = Some(ActiveSession {
                    id: session_id.clone(),
                    running,
                    state,
                    diagnostics,
                    worker: handle,
                });
                info!(session = %session_id, "session started");
                Ok(session_id)
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(ChirpError::Other(anyhow::anyhow!(
                    "session worker died before reporting device open"
                )))
            }
        }
    }

    /// Stop the active session: the worker finishes its in-flight window,
    /// flushes the transcript and notifies the sinks before this returns.
    ///
    /// # Errors
    /// `ChirpError::NotRunning` when no session is active.
    pub fn stop(&self) -> Result<()> {
        let mut slot = self.active.lock();
        let session = slot.take().ok_or(ChirpError::NotRunning)?;
        info!(session = %session.id, "session stop requested");
        Self::shutdown(session);
        Ok(())
    }

    fn shutdown(session: ActiveSession) {
        let ActiveSession {
            id,
            running,
            state,
            worker,
            ..
        } = session;
        *state.lock() = SessionState::Stopping;
        running.store(false, Ordering::SeqCst);
        if worker.join().is_err() {
            error!(session = %id, "session worker panicked during shutdown");
        }
    }

    /// Current lifecycle state; `Idle` when no session was ever installed.
    pub fn state(&self) -> SessionState {
        self.active
            .lock()
            .as_ref()
            .map(|session| *session.state.lock())
            .unwrap_or(SessionState::Idle)
    }

    /// Id of the currently installed session, if any.
    pub fn active_session_id(&self) -> Option<String> {
        self.active.lock().as_ref().map(|session| session.id.clone())
    }

    /// Pipeline counters of the currently installed session.
    pub fn diagnostics(&self) -> Option<DiagnosticsSnapshot> {
        self.active
            .lock()
            .as_ref()
            .map(|session| session.diagnostics.snapshot())
    }
}
