//! Broadcast sink: push notifications to remote listeners.
//!
//! Converts results and saved notices into protocol events on a
//! `tokio::sync::broadcast` channel. Each connected WebSocket client holds a
//! receiver; a client that lags simply misses events. Having no receivers at
//! all is not a delivery failure.

use tokio::sync::broadcast;

use crate::error::Result;
use crate::protocol::events::{LiveEvent, TranscriptSavedEvent, TranscriptionEvent};
use crate::sink::{TranscriptSaved, TranscriptSink};
use crate::transcript::TranscriptionResult;

/// Channel capacity: events buffered per slow listener before it lags.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Create the shared live-event channel.
pub fn live_event_channel() -> broadcast::Sender<LiveEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

pub struct EventSink {
    tx: broadcast::Sender<LiveEvent>,
}

impl EventSink {
    pub fn new(tx: broadcast::Sender<LiveEvent>) -> Self {
        Self { tx }
    }
}

impl TranscriptSink for EventSink {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn publish(&mut self, result: &TranscriptionResult) -> Result<()> {
        let _ = self
            .tx
            .send(LiveEvent::Transcription(TranscriptionEvent::from(result)));
        Ok(())
    }

    fn publish_saved(&mut self, saved: &TranscriptSaved) -> Result<()> {
        let _ = self
            .tx
            .send(LiveEvent::TranscriptSaved(TranscriptSavedEvent::from(saved)));
        Ok(())
    }
}
