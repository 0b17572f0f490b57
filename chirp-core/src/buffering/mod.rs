//! Chunk queue and window assembly.
//!
//! The capture callback and the session worker are connected by a bounded
//! FIFO of [`chunk::AudioChunk`] values. The producer side is the real-time
//! audio callback and must never block: it uses `try_send` and drops the
//! chunk (with a warning) when the queue is full. The consumer side polls
//! with a short timeout so a stop request is observed promptly.

pub mod assembler;
pub mod chunk;

use crossbeam_channel::{bounded, Receiver, Sender};

use chunk::AudioChunk;

/// Queue capacity in chunks. At a typical ~20 ms hardware buffer this holds
/// several seconds of audio while a slow inference call drains the consumer.
pub const CHUNK_QUEUE_CAPACITY: usize = 256;

/// Sender half — held by the capture callback.
pub type ChunkSender = Sender<AudioChunk>;

/// Receiver half — held by the session worker.
pub type ChunkReceiver = Receiver<AudioChunk>;

/// Create a matched producer/consumer pair for the capture → worker queue.
pub fn chunk_queue() -> (ChunkSender, ChunkReceiver) {
    bounded(CHUNK_QUEUE_CAPACITY)
}
