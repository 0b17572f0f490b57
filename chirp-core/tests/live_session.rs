//! End-to-end session scenarios driven through `SessionController` with a
//! scripted capture backend and scripted inference engines — no audio
//! hardware, no real model.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{atomic::AtomicBool, Arc};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use chirp_core::buffering::chunk::AudioChunk;
use chirp_core::buffering::ChunkSender;
use chirp_core::error::{ChirpError, Result};
use chirp_core::inference::stub::StubEngine;
use chirp_core::protocol::events::LiveEvent;
use chirp_core::{
    CaptureBackend, CaptureSpec, CaptureStream, EngineHandle, InferenceEngine, SessionConfig,
    SessionController, SessionState,
};

// ---------------------------------------------------------------------------
// Scripted fakes
// ---------------------------------------------------------------------------

/// Capture backend that feeds a fixed script of sample buffers at open time.
struct ScriptedBackend {
    feed: Mutex<Vec<Vec<f32>>>,
    /// Keep the chunk sender alive inside the stream so the queue does not
    /// disconnect after the script is exhausted.
    keep_alive: bool,
}

impl ScriptedBackend {
    fn new(feed: Vec<Vec<f32>>, keep_alive: bool) -> Self {
        Self {
            feed: Mutex::new(feed),
            keep_alive,
        }
    }

    /// `total` samples split into `chunk_len`-sized buffers.
    fn silence(total: usize, chunk_len: usize) -> Vec<Vec<f32>> {
        let mut feed = Vec::new();
        let mut remaining = total;
        while remaining > 0 {
            let len = remaining.min(chunk_len);
            feed.push(vec![0.0; len]);
            remaining -= len;
        }
        feed
    }
}

struct ScriptedStream {
    tx: Option<ChunkSender>,
}

impl CaptureStream for ScriptedStream {
    fn close(&mut self) {
        self.tx = None;
    }
}

impl CaptureBackend for ScriptedBackend {
    fn open(
        &self,
        spec: &CaptureSpec,
        tx: ChunkSender,
        _running: Arc<AtomicBool>,
    ) -> Result<Box<dyn CaptureStream>> {
        let feed = std::mem::take(&mut *self.feed.lock());
        for (seq, samples) in feed.into_iter().enumerate() {
            let chunk = AudioChunk::new(samples, spec.channels, spec.sample_rate, seq as u64);
            tx.send(chunk).expect("test queue must accept the script");
        }
        let tx = self.keep_alive.then_some(tx);
        Ok(Box::new(ScriptedStream { tx }))
    }
}

/// Backend whose device can never be opened.
struct FailingBackend;

impl CaptureBackend for FailingBackend {
    fn open(
        &self,
        _spec: &CaptureSpec,
        _tx: ChunkSender,
        _running: Arc<AtomicBool>,
    ) -> Result<Box<dyn CaptureStream>> {
        Err(ChirpError::NoInputDevice)
    }
}

/// Engine that signals when a call starts and blocks until released, so a
/// test can stop the session while an inference call is in flight.
struct GatedEngine {
    started_tx: crossbeam_channel::Sender<()>,
    release_rx: crossbeam_channel::Receiver<()>,
}

impl InferenceEngine for GatedEngine {
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_beam_width(&mut self, _beam_width: u32) -> Result<()> {
        Ok(())
    }

    fn transcribe_manifest(
        &mut self,
        _manifest_path: &Path,
        _batch_size: usize,
    ) -> Result<Vec<String>> {
        let _ = self.started_tx.send(());
        let _ = self.release_rx.recv();
        Ok(vec!["held window".to_string()])
    }
}

/// Engine that fails its first call and succeeds afterwards.
struct FlakyEngine {
    calls: usize,
}

impl InferenceEngine for FlakyEngine {
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }

    fn set_beam_width(&mut self, _beam_width: u32) -> Result<()> {
        Ok(())
    }

    fn transcribe_manifest(
        &mut self,
        _manifest_path: &Path,
        _batch_size: usize,
    ) -> Result<Vec<String>> {
        self.calls += 1;
        if self.calls == 1 {
            return Err(ChirpError::Inference("intentional first-window failure".into()));
        }
        Ok(vec!["recovered".to_string()])
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn scratch_dirs(tag: &str) -> (PathBuf, PathBuf) {
    let base = std::env::temp_dir().join(format!("chirp-e2e-{tag}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&base);
    let transcripts = base.join("transcripts");
    let temp = base.join("temp_audio");
    fs::create_dir_all(&transcripts).unwrap();
    fs::create_dir_all(&temp).unwrap();
    (transcripts, temp)
}

fn recv_event_with_timeout(
    rx: &mut broadcast::Receiver<LiveEvent>,
    timeout: Duration,
) -> LiveEvent {
    let start = Instant::now();
    loop {
        match rx.try_recv() {
            Ok(event) => return event,
            Err(TryRecvError::Empty) => {
                if start.elapsed() >= timeout {
                    panic!("timed out waiting for live event");
                }
                thread::sleep(Duration::from_millis(5));
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Closed) => panic!("event channel closed unexpectedly"),
        }
    }
}

fn assert_no_event_for(rx: &mut broadcast::Receiver<LiveEvent>, timeout: Duration) {
    let start = Instant::now();
    loop {
        match rx.try_recv() {
            Ok(event) => panic!("expected no event, got {event:?}"),
            Err(TryRecvError::Empty) => {
                if start.elapsed() >= timeout {
                    return;
                }
                thread::sleep(Duration::from_millis(5));
            }
            Err(TryRecvError::Lagged(_)) => continue,
            Err(TryRecvError::Closed) => return,
        }
    }
}

fn transcript_files(dir: &Path) -> Vec<PathBuf> {
    fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn exact_window_of_silence_yields_one_transcription_event() {
    // buffer 3 s @ 16 kHz, overlap 0.25 → W = 48000; feeding exactly 48000
    // samples yields exactly one window with index 0.
    let (transcripts, temp) = scratch_dirs("exact-window");
    let backend = ScriptedBackend::new(ScriptedBackend::silence(48_000, 1_600), true);
    let controller = SessionController::new(
        EngineHandle::new(StubEngine::new()),
        Arc::new(backend),
        &transcripts,
        &temp,
    );
    let mut events = controller.subscribe_events();

    let config = SessionConfig {
        buffer_secs: 3.0,
        overlap: 0.25,
        ..SessionConfig::default()
    };
    controller.start(config).expect("session starts");
    assert_eq!(controller.state(), SessionState::Running);

    match recv_event_with_timeout(&mut events, Duration::from_secs(2)) {
        LiveEvent::Transcription(event) => {
            assert_eq!(event.chunk_index, 0);
            assert_eq!(event.text, "[stub: asr en->en 3.0s]");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    // The retained overlap (12000 samples) never forms a second window.
    assert_no_event_for(&mut events, Duration::from_millis(200));

    controller.stop().expect("session stops");
    assert_eq!(controller.state(), SessionState::Idle);

    match recv_event_with_timeout(&mut events, Duration::from_secs(1)) {
        LiveEvent::TranscriptSaved(saved) => assert_eq!(saved.count, 1),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn stop_during_inflight_dispatch_retains_partial_buffer() {
    // Feed 4 s at 16 kHz into 2 s windows, then stop while window 0 is in
    // flight: exactly one window is dispatched and the rest of the audio is
    // retained, not dispatched.
    let (transcripts, temp) = scratch_dirs("inflight-stop");
    let (started_tx, started_rx) = crossbeam_channel::bounded(1);
    let (release_tx, release_rx) = crossbeam_channel::bounded(1);
    let backend = ScriptedBackend::new(ScriptedBackend::silence(64_000, 1_600), true);
    let controller = Arc::new(SessionController::new(
        EngineHandle::new(GatedEngine {
            started_tx,
            release_rx,
        }),
        Arc::new(backend),
        &transcripts,
        &temp,
    ));
    let mut events = controller.subscribe_events();

    controller
        .start(SessionConfig::default())
        .expect("session starts");

    // Window 0 reached the engine and is now blocked inside the call.
    started_rx
        .recv_timeout(Duration::from_secs(2))
        .expect("first dispatch starts");

    // Request stop while the call is in flight, then let it finish.
    let stopper = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || controller.stop())
    };
    thread::sleep(Duration::from_millis(100));
    release_tx.send(()).unwrap();
    stopper
        .join()
        .expect("stop thread panicked")
        .expect("stop succeeds");

    match recv_event_with_timeout(&mut events, Duration::from_secs(1)) {
        LiveEvent::Transcription(event) => {
            assert_eq!(event.chunk_index, 0);
            assert_eq!(event.text, "held window");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    match recv_event_with_timeout(&mut events, Duration::from_secs(1)) {
        LiveEvent::TranscriptSaved(saved) => {
            assert_eq!(saved.count, 1);
            assert_eq!(saved.word_count, 2);
        }
        other => panic!("unexpected event: {other:?}"),
    }
    // The second window's audio was dropped at stop, never dispatched.
    assert_no_event_for(&mut events, Duration::from_millis(200));

    let files = transcript_files(&transcripts);
    assert_eq!(files.len(), 1);
    assert_eq!(fs::read_to_string(&files[0]).unwrap(), "held window");
}

#[test]
fn stop_with_zero_windows_still_saves_an_empty_transcript() {
    let (transcripts, temp) = scratch_dirs("empty-stop");
    // Half a window of audio: never enough for a dispatch.
    let backend = ScriptedBackend::new(ScriptedBackend::silence(16_000, 1_600), true);
    let controller = SessionController::new(
        EngineHandle::new(StubEngine::new()),
        Arc::new(backend),
        &transcripts,
        &temp,
    );
    let mut events = controller.subscribe_events();

    controller
        .start(SessionConfig::default())
        .expect("session starts");
    // Give the worker time to drain the partial audio.
    thread::sleep(Duration::from_millis(150));
    controller.stop().expect("stop succeeds with zero windows");

    match recv_event_with_timeout(&mut events, Duration::from_secs(1)) {
        LiveEvent::TranscriptSaved(saved) => {
            assert_eq!(saved.count, 0);
            assert_eq!(saved.word_count, 0);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let files = transcript_files(&transcripts);
    assert_eq!(files.len(), 1);
    assert_eq!(fs::read_to_string(&files[0]).unwrap(), "");
}

#[test]
fn failed_window_is_skipped_and_the_session_continues() {
    let (transcripts, temp) = scratch_dirs("flaky");
    // Two full 1 s windows, no overlap. The engine fails the first call.
    let backend = ScriptedBackend::new(ScriptedBackend::silence(32_000, 1_600), true);
    let controller = SessionController::new(
        EngineHandle::new(FlakyEngine { calls: 0 }),
        Arc::new(backend),
        &transcripts,
        &temp,
    );
    let mut events = controller.subscribe_events();

    let config = SessionConfig {
        buffer_secs: 1.0,
        overlap: 0.0,
        ..SessionConfig::default()
    };
    controller.start(config).expect("session starts");

    // Window 0 fails silently (skipped); window 1 produces the only event.
    match recv_event_with_timeout(&mut events, Duration::from_secs(2)) {
        LiveEvent::Transcription(event) => {
            assert_eq!(event.chunk_index, 1);
            assert_eq!(event.text, "recovered");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    controller.stop().expect("session stops");
    match recv_event_with_timeout(&mut events, Duration::from_secs(1)) {
        LiveEvent::TranscriptSaved(saved) => {
            // The failed window leaves a gap, not a terminated session.
            assert_eq!(saved.count, 1);
        }
        other => panic!("unexpected event: {other:?}"),
    }

    let files = transcript_files(&transcripts);
    assert_eq!(fs::read_to_string(&files[0]).unwrap(), "recovered");
}

#[test]
fn starting_while_running_flushes_the_old_session_first() {
    let (transcripts, temp) = scratch_dirs("restart");
    // Both sessions share one backend; each start consumes the remaining
    // script (empty for the second session — it just idles).
    let backend = ScriptedBackend::new(ScriptedBackend::silence(16_000, 1_600), true);
    let controller = SessionController::new(
        EngineHandle::new(StubEngine::new()),
        Arc::new(backend),
        &transcripts,
        &temp,
    );
    let mut events = controller.subscribe_events();

    controller
        .start(SessionConfig::default())
        .expect("first session starts");
    thread::sleep(Duration::from_millis(100));

    let second_id = controller
        .start(SessionConfig::default())
        .expect("second session starts");

    // By the time the second id exists, the first session has been fully
    // stopped and its transcript flushed.
    match recv_event_with_timeout(&mut events, Duration::from_millis(500)) {
        LiveEvent::TranscriptSaved(saved) => assert_eq!(saved.count, 0),
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(controller.active_session_id(), Some(second_id));
    assert_eq!(controller.state(), SessionState::Running);

    controller.stop().expect("second session stops");
}

#[test]
fn device_open_failure_is_fatal_and_surfaced_to_the_caller() {
    let (transcripts, temp) = scratch_dirs("open-failure");
    let controller = SessionController::new(
        EngineHandle::new(StubEngine::new()),
        Arc::new(FailingBackend),
        &transcripts,
        &temp,
    );

    let err = controller.start(SessionConfig::default()).unwrap_err();
    assert!(matches!(err, ChirpError::NoInputDevice));

    // No session was installed; stop reports the absence distinctly.
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(controller.active_session_id().is_none());
    assert!(matches!(controller.stop(), Err(ChirpError::NotRunning)));
}
