//! Transcript sinks: registered consumers of session output.
//!
//! Fan-out is best-effort per sink — one sink's failure (a full pipe, a
//! disconnected listener, an unwritable directory) is logged and never
//! blocks delivery to the others.

pub mod broadcast;
pub mod console;
pub mod file;

use std::path::PathBuf;

use tracing::warn;

use crate::error::Result;
use crate::transcript::TranscriptionResult;

pub use broadcast::EventSink;
pub use console::ConsoleSink;
pub use file::TranscriptFileSink;

/// Notification that the session transcript was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptSaved {
    /// Path of the transcript file.
    pub filename: PathBuf,
    /// Number of results in the transcript.
    pub count: usize,
    /// Total words across all results.
    pub word_count: usize,
}

/// A delivery target bound to the lifetime of one session.
pub trait TranscriptSink: Send {
    /// Short name used when logging delivery failures.
    fn name(&self) -> &'static str;

    /// Deliver one incremental result.
    fn publish(&mut self, result: &TranscriptionResult) -> Result<()>;

    /// Deliver the final transcript-saved notification.
    fn publish_saved(&mut self, saved: &TranscriptSaved) -> Result<()>;
}

/// Identifies a subscription for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkId(u64);

/// Owns the registered sinks and fans every update out to all of them.
#[derive(Default)]
pub struct SinkBroadcaster {
    sinks: Vec<(SinkId, Box<dyn TranscriptSink>)>,
    next_id: u64,
}

impl SinkBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink; the returned id can be passed to [`unsubscribe`].
    ///
    /// [`unsubscribe`]: SinkBroadcaster::unsubscribe
    pub fn subscribe(&mut self, sink: Box<dyn TranscriptSink>) -> SinkId {
        let id = SinkId(self.next_id);
        self.next_id += 1;
        self.sinks.push((id, sink));
        id
    }

    /// Remove a previously registered sink. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SinkId) {
        self.sinks.retain(|(sink_id, _)| *sink_id != id);
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Deliver a result to every sink, best-effort.
    pub fn publish(&mut self, result: &TranscriptionResult) {
        for (_, sink) in &mut self.sinks {
            if let Err(e) = sink.publish(result) {
                warn!(sink = sink.name(), "sink publish failed: {e}");
            }
        }
    }

    /// Deliver the saved notification to every sink, best-effort.
    pub fn publish_saved(&mut self, saved: &TranscriptSaved) {
        for (_, sink) in &mut self.sinks {
            if let Err(e) = sink.publish_saved(saved) {
                warn!(sink = sink.name(), "sink publish_saved failed: {e}");
            }
        }
    }
}
