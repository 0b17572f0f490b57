//! Window assembly: fixed-duration windows with trailing overlap.
//!
//! Incoming chunks accumulate in a sample buffer. Once the buffer holds a
//! full window of `W = sample_rate × buffer_secs` frames, the first `W`
//! frames are emitted as an [`AudioWindow`] and the last `⌊W·overlap⌋`
//! frames of the emitted window are retained as left context for the next
//! one. A small overlap reduces boundary-word truncation between
//! consecutive windows at the cost of minor duplication in raw output.
//!
//! A partial trailing buffer is never emitted: at session stop the tail is
//! discarded (see [`WindowAssembler::pending_frames`]), not padded into a
//! short window.

use tracing::debug;

use crate::buffering::chunk::AudioChunk;

/// A contiguous span of samples of exactly the configured window length.
///
/// Created by the assembler, handed to the inference dispatcher, then
/// dropped.
#[derive(Debug, Clone)]
pub struct AudioWindow {
    /// Interleaved f32 samples, exactly `frames × channels` long.
    pub samples: Vec<f32>,
    /// Number of interleaved channels.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Monotonically increasing window index within the session.
    pub index: u64,
}

impl AudioWindow {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    /// Window duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }
}

/// Accumulates chunks and emits exact-length windows with trailing overlap.
pub struct WindowAssembler {
    buffer: Vec<f32>,
    channels: u16,
    sample_rate: u32,
    /// Window length in frames.
    window_frames: usize,
    /// Frames retained after each emission.
    overlap_frames: usize,
    next_index: u64,
}

impl WindowAssembler {
    /// Build an assembler for `buffer_secs`-long windows at `sample_rate`.
    ///
    /// `overlap` is a fraction in `[0, 1)`; values outside that range are
    /// clamped. The retained length is `⌊window_frames × overlap⌋`.
    pub fn new(sample_rate: u32, channels: u16, buffer_secs: f32, overlap: f32) -> Self {
        let window_frames = (sample_rate as f64 * buffer_secs as f64) as usize;
        let overlap = overlap.clamp(0.0, 0.99);
        let overlap_frames = (window_frames as f64 * overlap as f64) as usize;

        Self {
            buffer: Vec::with_capacity(window_frames * channels.max(1) as usize),
            channels: channels.max(1),
            sample_rate,
            window_frames,
            overlap_frames,
            next_index: 0,
        }
    }

    /// Window length in frames.
    pub fn window_frames(&self) -> usize {
        self.window_frames
    }

    /// Frames retained after each emission.
    pub fn overlap_frames(&self) -> usize {
        self.overlap_frames
    }

    /// Frames currently buffered but not yet emitted.
    pub fn pending_frames(&self) -> usize {
        self.buffer.len() / self.channels as usize
    }

    /// Append a chunk's samples to the accumulation buffer.
    pub fn push(&mut self, chunk: &AudioChunk) {
        debug_assert_eq!(chunk.channels, self.channels, "chunk channel mismatch");
        self.buffer.extend_from_slice(&chunk.samples);
    }

    /// Emit the next completed window, if the buffer holds a full one.
    ///
    /// The emitted window is exactly `window_frames` long; the buffer is
    /// reset to the last `overlap_frames` frames of the emitted window
    /// (empty when the overlap is zero).
    pub fn take_window(&mut self) -> Option<AudioWindow> {
        let ch = self.channels as usize;
        let window_len = self.window_frames * ch;
        if self.buffer.len() < window_len {
            return None;
        }

        let samples: Vec<f32> = self.buffer[..window_len].to_vec();
        let retain_len = self.overlap_frames * ch;
        let tail: Vec<f32> = self.buffer.split_off(window_len);

        self.buffer.clear();
        self.buffer
            .extend_from_slice(&samples[window_len - retain_len..]);
        self.buffer.extend_from_slice(&tail);

        let index = self.next_index;
        self.next_index += 1;

        debug!(
            index,
            frames = self.window_frames,
            retained = self.overlap_frames,
            "window assembled"
        );

        Some(AudioWindow {
            samples,
            channels: self.channels,
            sample_rate: self.sample_rate,
            index,
        })
    }

    /// Discard any partial trailing buffer, returning the number of frames
    /// dropped. Called once at session stop; a short final window is
    /// deliberately not synthesized.
    pub fn discard_tail(&mut self) -> usize {
        let frames = self.pending_frames();
        self.buffer.clear();
        frames
    }
}
