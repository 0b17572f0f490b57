//! Blocking session worker loop.
//!
//! ## Stages (per iteration)
//!
//! ```text
//! 1. Check the running flag
//! 2. Poll the chunk queue (100 ms timeout — empty is a retry, not an error)
//! 3. Feed the chunk to the window assembler
//! 4. Dispatch every completed window, in order, one at a time
//! 5. Append the result to the transcript and fan it out to the sinks
//! ```
//!
//! Stop is cooperative: the flag is observed on every poll timeout and after
//! every dispatch, so an in-flight inference call is never interrupted. On
//! exit the partial tail is discarded, the transcript filename notice is
//! published to every sink (the file sink performs the actual write), and
//! the session state becomes `Stopped`.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    buffering::{assembler::WindowAssembler, ChunkReceiver},
    inference::dispatch::InferenceDispatcher,
    session::SessionState,
    sink::{SinkBroadcaster, TranscriptSaved},
    task::TaskConfig,
    transcript::TranscriptAggregator,
};

/// How long one queue poll blocks before re-checking the stop flag.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Lines shown in the rolling live view.
const LIVE_VIEW_RESULTS: usize = 3;

/// Per-session pipeline counters.
pub struct WorkerDiagnostics {
    pub chunks_in: AtomicUsize,
    pub windows_assembled: AtomicUsize,
    pub inference_calls: AtomicUsize,
    pub inference_errors: AtomicUsize,
    pub results_published: AtomicUsize,
    pub frames_discarded: AtomicUsize,
}

impl Default for WorkerDiagnostics {
    fn default() -> Self {
        Self {
            chunks_in: AtomicUsize::new(0),
            windows_assembled: AtomicUsize::new(0),
            inference_calls: AtomicUsize::new(0),
            inference_errors: AtomicUsize::new(0),
            results_published: AtomicUsize::new(0),
            frames_discarded: AtomicUsize::new(0),
        }
    }
}

impl WorkerDiagnostics {
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            chunks_in: self.chunks_in.load(Ordering::Relaxed),
            windows_assembled: self.windows_assembled.load(Ordering::Relaxed),
            inference_calls: self.inference_calls.load(Ordering::Relaxed),
            inference_errors: self.inference_errors.load(Ordering::Relaxed),
            results_published: self.results_published.load(Ordering::Relaxed),
            frames_discarded: self.frames_discarded.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsSnapshot {
    pub chunks_in: usize,
    pub windows_assembled: usize,
    pub inference_calls: usize,
    pub inference_errors: usize,
    pub results_published: usize,
    pub frames_discarded: usize,
}

/// All context the worker needs, passed as one struct so the spawn closure
/// stays tidy.
pub struct WorkerContext {
    pub session_id: String,
    pub task: TaskConfig,
    pub assembler: WindowAssembler,
    pub dispatcher: InferenceDispatcher,
    pub chunk_rx: ChunkReceiver,
    pub running: Arc<std::sync::atomic::AtomicBool>,
    pub state: Arc<Mutex<SessionState>>,
    pub sinks: SinkBroadcaster,
    /// Destination for the persisted transcript.
    pub transcript_path: PathBuf,
    pub diagnostics: Arc<WorkerDiagnostics>,
}

/// Run the session worker until the running flag clears or the producer
/// disconnects.
pub fn run(mut ctx: WorkerContext) {
    info!(session = %ctx.session_id, "session worker started");

    let mut transcript = TranscriptAggregator::new();

    'consume: loop {
        if !ctx.running.load(Ordering::Relaxed) {
            break;
        }

        match ctx.chunk_rx.recv_timeout(POLL_TIMEOUT) {
            Ok(chunk) => {
                ctx.diagnostics.chunks_in.fetch_add(1, Ordering::Relaxed);
                ctx.assembler.push(&chunk);

                while let Some(window) = ctx.assembler.take_window() {
                    ctx.diagnostics
                        .windows_assembled
                        .fetch_add(1, Ordering::Relaxed);
                    dispatch_window(&mut ctx, &mut transcript, &window);

                    // Stop takes effect after the in-flight window, never
                    // in the middle of one.
                    if !ctx.running.load(Ordering::Relaxed) {
                        break 'consume;
                    }
                }
            }
            // Empty queue within the poll window — just a retry signal.
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => {
                warn!(session = %ctx.session_id, "chunk producer disconnected");
                break;
            }
        }
    }

    // Partial tail at stop is discarded, not padded into a short window.
    let discarded = ctx.assembler.discard_tail();
    if discarded > 0 {
        ctx.diagnostics
            .frames_discarded
            .fetch_add(discarded, Ordering::Relaxed);
        info!(
            session = %ctx.session_id,
            frames = discarded,
            "discarding partial window tail at stop"
        );
    }

    let saved = TranscriptSaved {
        filename: ctx.transcript_path.clone(),
        count: transcript.len(),
        word_count: transcript.word_count(),
    };
    ctx.sinks.publish_saved(&saved);

    *ctx.state.lock() = SessionState::Stopped;

    let snap = ctx.diagnostics.snapshot();
    info!(
        session = %ctx.session_id,
        chunks_in = snap.chunks_in,
        windows_assembled = snap.windows_assembled,
        inference_calls = snap.inference_calls,
        inference_errors = snap.inference_errors,
        results_published = snap.results_published,
        frames_discarded = snap.frames_discarded,
        "session worker stopped"
    );
}

/// Dispatch one window. Engine failures are recoverable: the window's
/// contribution is absent from the transcript and the loop continues.
fn dispatch_window(
    ctx: &mut WorkerContext,
    transcript: &mut TranscriptAggregator,
    window: &crate::buffering::assembler::AudioWindow,
) {
    ctx.diagnostics
        .inference_calls
        .fetch_add(1, Ordering::Relaxed);

    match ctx.dispatcher.dispatch(window, &ctx.task) {
        Ok(result) => {
            transcript.append(result.clone());
            ctx.sinks.publish(&result);
            ctx.diagnostics
                .results_published
                .fetch_add(1, Ordering::Relaxed);
            debug!(
                session = %ctx.session_id,
                view = %transcript.current_view(LIVE_VIEW_RESULTS),
                "live view updated"
            );
        }
        Err(e) => {
            ctx.diagnostics
                .inference_errors
                .fetch_add(1, Ordering::Relaxed);
            error!(
                session = %ctx.session_id,
                window = window.index,
                "inference failed, skipping window: {e}"
            );
        }
    }
}
