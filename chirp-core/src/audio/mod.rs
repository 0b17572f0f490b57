//! Audio capture via cpal backend.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated priority.
//! It **must not**:
//! - Block on a mutex, condvar or channel send
//! - Perform I/O
//! - Retain the hardware buffer beyond the call
//!
//! The callback copies the buffer into an [`AudioChunk`] and `try_send`s it
//! into the bounded chunk queue. When the queue is full the chunk is dropped
//! and counted — the worker is behind, and stalling the callback would cause
//! device-level overruns instead.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on
//! macOS). The stream must be created and dropped on the same thread; the
//! session worker therefore calls [`CaptureBackend::open`] on itself and
//! keeps the returned [`CaptureStream`] for its whole lifetime.

pub mod device;

use std::sync::{atomic::AtomicBool, Arc};

use crate::{
    buffering::ChunkSender,
    error::Result,
};

pub use device::{list_input_devices, DeviceInfo, DeviceSelector};

/// Requested capture parameters for one session.
#[derive(Debug, Clone)]
pub struct CaptureSpec {
    pub device: DeviceSelector,
    /// Requested sample rate in Hz. Devices that cannot provide it fail fast.
    pub sample_rate: u32,
    pub channels: u16,
}

/// Handle to an open capture stream, owned by the session worker thread.
///
/// Not `Send` by design — see the module-level threading note. Dropping the
/// handle releases the device; `close` additionally makes the release
/// explicit in the worker's shutdown sequence.
pub trait CaptureStream {
    /// Stop capture: the callback becomes a no-op and the device is released.
    fn close(&mut self);
}

/// Seam between the session controller and a concrete capture
/// implementation. The production backend is [`CpalBackend`]; tests install
/// scripted backends that feed synthetic chunks.
pub trait CaptureBackend: Send + Sync {
    /// Open the device described by `spec` and start delivering chunks to
    /// `tx`. Must be called on the thread that will own and drop the
    /// returned stream. `running` gates the callback: once cleared, no
    /// further chunks are produced.
    ///
    /// # Errors
    /// Device-level failures (missing device, unsupported rate or channel
    /// count, stream build/play failure) are returned immediately and are
    /// fatal to the session.
    fn open(
        &self,
        spec: &CaptureSpec,
        tx: ChunkSender,
        running: Arc<AtomicBool>,
    ) -> Result<Box<dyn CaptureStream>>;
}

/// Production capture backend over cpal.
#[derive(Debug, Default)]
pub struct CpalBackend;

#[cfg(feature = "audio-cpal")]
mod cpal_impl {
    use super::*;

    use std::sync::atomic::Ordering;

    use cpal::{
        traits::{DeviceTrait, HostTrait, StreamTrait},
        SampleFormat, SampleRate, Stream, StreamConfig,
    };
    use tracing::{error, info, warn};

    use crate::buffering::chunk::AudioChunk;
    use crate::error::ChirpError;

    struct CpalStream {
        /// Kept alive so the stream is not dropped prematurely.
        _stream: Stream,
        running: Arc<AtomicBool>,
    }

    impl CaptureStream for CpalStream {
        fn close(&mut self) {
            self.running.store(false, Ordering::Release);
        }
    }

    fn resolve_device(selector: &DeviceSelector) -> Result<cpal::Device> {
        let host = cpal::default_host();
        match selector {
            DeviceSelector::Default => host
                .default_input_device()
                .ok_or(ChirpError::NoInputDevice),
            DeviceSelector::Index(index) => {
                let mut devices = host
                    .input_devices()
                    .map_err(|e| ChirpError::AudioDevice(e.to_string()))?;
                devices
                    .nth(*index)
                    .ok_or(ChirpError::DeviceNotFound { index: *index })
            }
        }
    }

    impl CaptureBackend for CpalBackend {
        fn open(
            &self,
            spec: &CaptureSpec,
            tx: ChunkSender,
            running: Arc<AtomicBool>,
        ) -> Result<Box<dyn CaptureStream>> {
            let device = resolve_device(&spec.device)?;

            info!(
                device = device.name().unwrap_or_default().as_str(),
                sample_rate = spec.sample_rate,
                channels = spec.channels,
                "opening input device"
            );

            let supported = device
                .default_input_config()
                .map_err(|e| ChirpError::AudioDevice(e.to_string()))?;

            let config = StreamConfig {
                channels: spec.channels,
                sample_rate: SampleRate(spec.sample_rate),
                buffer_size: cpal::BufferSize::Default,
            };

            let channels = spec.channels;
            let sample_rate = spec.sample_rate;
            let running_f32 = Arc::clone(&running);
            let running_i16 = Arc::clone(&running);
            let running_err = Arc::clone(&running);
            let tx_i16 = tx.clone();

            let on_error = move |err: cpal::StreamError| {
                // A mid-session device failure is fatal: clear the running
                // flag so the worker winds down through the stop path.
                error!("audio stream error: {err}");
                running_err.store(false, Ordering::Release);
            };

            let stream = match supported.sample_format() {
                SampleFormat::F32 => {
                    let mut seq = 0u64;
                    device.build_input_stream(
                        &config,
                        move |data: &[f32], _info| {
                            if !running_f32.load(Ordering::Relaxed) {
                                return;
                            }
                            let chunk =
                                AudioChunk::new(data.to_vec(), channels, sample_rate, seq);
                            seq += 1;
                            if tx.try_send(chunk).is_err() {
                                warn!("chunk queue full: dropped {} samples", data.len());
                            }
                        },
                        on_error,
                        None,
                    )
                }

                SampleFormat::I16 => {
                    let mut seq = 0u64;
                    device.build_input_stream(
                        &config,
                        move |data: &[i16], _info| {
                            if !running_i16.load(Ordering::Relaxed) {
                                return;
                            }
                            let samples: Vec<f32> =
                                data.iter().map(|s| *s as f32 / 32768.0).collect();
                            let chunk = AudioChunk::new(samples, channels, sample_rate, seq);
                            seq += 1;
                            if tx_i16.try_send(chunk).is_err() {
                                warn!("chunk queue full: dropped {} samples", data.len());
                            }
                        },
                        on_error,
                        None,
                    )
                }

                fmt => {
                    return Err(ChirpError::AudioStream(format!(
                        "unsupported sample format: {fmt:?}"
                    )))
                }
            }
            .map_err(|e| ChirpError::AudioStream(e.to_string()))?;

            stream
                .play()
                .map_err(|e| ChirpError::AudioStream(e.to_string()))?;

            Ok(Box::new(CpalStream {
                _stream: stream,
                running,
            }))
        }
    }
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl CaptureBackend for CpalBackend {
    fn open(
        &self,
        _spec: &CaptureSpec,
        _tx: ChunkSender,
        _running: Arc<AtomicBool>,
    ) -> Result<Box<dyn CaptureStream>> {
        Err(crate::error::ChirpError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }
}
