//! Live fan-out to listeners
//!
//! The dispatcher reads a stream's listener set at call time and pushes one
//! event per listener through the transport. A listener that joins after the
//! read misses that push; it gets the history through its own join backfill.

use std::sync::Arc;

use bytes::Bytes;

use crate::registry::{ChunkRef, StreamId};
use crate::stats::{DispatchCounters, DispatchStats};

use super::registry::ListenerRegistry;
use super::transport::{ListenerId, PushError, PushEvent, PushTransport};

/// Pushes audio frames and chunk-ready notices to subscribed listeners
pub struct Dispatcher {
    listeners: Arc<ListenerRegistry>,
    transport: Arc<dyn PushTransport>,
    counters: DispatchCounters,
}

impl Dispatcher {
    pub fn new(listeners: Arc<ListenerRegistry>, transport: Arc<dyn PushTransport>) -> Self {
        Self {
            listeners,
            transport,
            counters: DispatchCounters::default(),
        }
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    pub fn transport(&self) -> &Arc<dyn PushTransport> {
        &self.transport
    }

    /// Push raw bytes to every current listener of `stream_id`
    ///
    /// Fire-and-forget: failed deliveries are counted, never retried.
    pub async fn push_audio(&self, stream_id: &StreamId, data: Bytes) {
        let event = PushEvent::AudioFrame {
            stream_id: stream_id.clone(),
            data,
        };
        let (delivered, failed) = self.fan_out(stream_id, event).await;
        self.counters.record_audio(delivered, failed);
    }

    /// Notify every current listener of `stream_id` that a chunk is ready
    pub async fn push_chunk_ready(&self, stream_id: &StreamId, chunk: &ChunkRef) {
        let event = PushEvent::ChunkReady {
            chunk: chunk.clone(),
        };
        let (delivered, failed) = self.fan_out(stream_id, event).await;
        self.counters.record_chunk_notice(delivered, failed);

        tracing::debug!(
            stream = %stream_id,
            chunk = %chunk,
            delivered = delivered,
            failed = failed,
            "Chunk ready pushed"
        );
    }

    /// Push a single event to one listener, regardless of membership
    pub async fn push_to(&self, listener: &ListenerId, event: PushEvent) -> Result<(), PushError> {
        self.transport.push(listener, event).await
    }

    pub fn stats(&self) -> DispatchStats {
        self.counters.snapshot()
    }

    async fn fan_out(&self, stream_id: &StreamId, event: PushEvent) -> (u64, u64) {
        let targets = self.listeners.listeners_of(stream_id).await;
        let mut delivered = 0;
        let mut failed = 0;

        for listener in &targets {
            match self.transport.push(listener, event.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    tracing::debug!(
                        stream = %stream_id,
                        listener = %listener,
                        event = event.name(),
                        error = %e,
                        "Push failed"
                    );
                }
            }
        }

        (delivered, failed)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stats", &self.stats())
            .finish()
    }
}
