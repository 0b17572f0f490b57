//! Inference engine abstraction.
//!
//! The speech model itself is an external collaborator: chirp hands it a
//! manifest file describing one audio artifact and reads back one result
//! string per entry. The `InferenceEngine` trait decouples the dispatcher
//! from any specific realization (subprocess worker, network service, test
//! stub).
//!
//! `&mut self` on `transcribe_manifest` intentionally expresses that engines
//! are stateful — decoding configuration, warmed caches. All mutation is
//! serialised through `EngineHandle`'s `parking_lot::Mutex`, which is also
//! what enforces the at-most-one-in-flight-call contract: the engine is a
//! shared exclusive resource (typically a single GPU) for the whole process
//! lifetime, across sessions.

pub mod dispatch;
pub mod manifest;
pub mod stub;
pub mod subprocess;

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::Result;

/// Contract for speech inference backends.
pub trait InferenceEngine: Send + 'static {
    /// One-time warm-up: load weights, verify the backing process or files
    /// exist. Called once at host startup, before any session.
    ///
    /// # Errors
    /// Returns an error if the engine cannot be made ready.
    fn warm_up(&mut self) -> Result<()>;

    /// Apply a decoding beam width. Called once per session at start, not
    /// per window.
    fn set_beam_width(&mut self, beam_width: u32) -> Result<()>;

    /// Run inference for every entry in the manifest at `manifest_path`.
    ///
    /// # Returns
    /// One result string per manifest entry, in entry order.
    ///
    /// # Errors
    /// Any engine failure. The caller treats this as recoverable per window.
    fn transcribe_manifest(
        &mut self,
        manifest_path: &Path,
        batch_size: usize,
    ) -> Result<Vec<String>>;
}

/// Thread-safe reference-counted handle to any `InferenceEngine` implementor.
///
/// Uses `parking_lot::Mutex` for non-poisoning on panic; holding the lock
/// across a call is what serialises concurrent dispatch attempts.
#[derive(Clone)]
pub struct EngineHandle(pub Arc<Mutex<dyn InferenceEngine>>);

impl EngineHandle {
    /// Wrap any `InferenceEngine` in an `EngineHandle`.
    pub fn new<E: InferenceEngine>(engine: E) -> Self {
        Self(Arc::new(Mutex::new(engine)))
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle").finish_non_exhaustive()
    }
}
