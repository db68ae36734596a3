//! Stream session
//!
//! A [`StreamSession`] owns one stream's buffering, rollover and lifecycle.
//!
//! # Locking
//!
//! ```text
//!   state lock ──► buffer / phase / chunks / frame and flush queues   (never held across I/O)
//!   fan-out lane ──► drains queued live frames in append order
//!   flush lane ──► store writes, drains the pending queue in cut order
//! ```
//!
//! The state lock makes append, rollover and end mutually exclusive. Each
//! append queues its frame under the state lock and then releases it, so
//! listener pushes and store writes never hold up `snapshot` or `end`.
//! Whoever holds a lane drains its queue front to back, so live frames
//! leave in append order and the chunk list only ever grows at the tail.
//! A caller returns once its own frame and chunk have gone out, whether it
//! drained them itself or an earlier lane holder did.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::Mutex;

use crate::error::{Error, Result};
use crate::listener::Dispatcher;
use crate::registry::{ChunkRef, RegistryConfig, StreamId, StreamSnapshot, StreamSummary};
use crate::stats::StreamStats;
use crate::store::{ChunkKey, ChunkStore};

use super::state::{SessionState, StreamPhase};

/// One stream's state machine (`Live` -> `Ended`)
pub struct StreamSession {
    id: StreamId,
    rollover_threshold: Duration,
    state: Mutex<SessionState>,
    fanout_lane: Mutex<()>,
    flush_lane: Mutex<()>,
    store: Arc<dyn ChunkStore>,
    dispatcher: Arc<Dispatcher>,
}

impl StreamSession {
    /// Create a live session with no chunks
    pub fn new(
        id: StreamId,
        config: &RegistryConfig,
        store: Arc<dyn ChunkStore>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            id,
            rollover_threshold: config.rollover_threshold,
            state: Mutex::new(SessionState::new()),
            fanout_lane: Mutex::new(()),
            flush_lane: Mutex::new(()),
            store,
            dispatcher,
        }
    }

    pub fn id(&self) -> &StreamId {
        &self.id
    }

    /// Append audio bytes
    ///
    /// Buffers `data` for the current chunk (rolling over first if the
    /// buffer is older than the threshold) and pushes it to every current
    /// listener. If a rollover happened, returns only after the sealed chunk
    /// has been persisted and announced.
    ///
    /// # Errors
    ///
    /// [`Error::StreamEnded`] once the stream has ended; nothing is buffered.
    ///
    /// [`Error::StorageFailure`] if the chunk this call sealed could not be
    /// written. That chunk holds bytes from earlier appends and is dropped.
    /// `data` itself has already been buffered and pushed, so it must not be
    /// sent again.
    pub async fn append(&self, data: Bytes) -> Result<()> {
        let sealed = {
            let mut state = self.state.lock().await;
            let sealed = match state.append(&self.id, &data, self.rollover_threshold) {
                Ok(sealed) => sealed,
                Err(e) => {
                    tracing::warn!(stream = %self.id, bytes = data.len(), "Append on ended stream");
                    return Err(e);
                }
            };
            state.frames.push_back(data);
            sealed
        };

        self.drain_frames().await;

        match sealed {
            Some(key) => self.flush(Some(key)).await,
            None => Ok(()),
        }
    }

    /// End the stream, flushing the open buffer
    ///
    /// Calling it again is harmless. The stream is ended even when the final
    /// chunk fails to persist, in which case [`Error::StorageFailure`] is
    /// returned.
    pub async fn end(&self) -> Result<()> {
        let sealed = {
            let mut state = self.state.lock().await;
            let was_live = state.is_live();
            let sealed = state.end(&self.id);
            if was_live {
                tracing::info!(
                    stream = %self.id,
                    final_chunk = sealed.is_some(),
                    bytes = state.stats.bytes_appended,
                    "Stream ended"
                );
            }
            sealed
        };

        self.flush(sealed).await
    }

    /// Push queued live frames in append order
    async fn drain_frames(&self) {
        let _lane = self.fanout_lane.lock().await;

        loop {
            let next = self.state.lock().await.frames.pop_front();
            let Some(data) = next else {
                return;
            };
            self.dispatcher.push_audio(&self.id, data).await;
        }
    }

    /// Drain the pending queue, then report the outcome of `sealed`
    async fn flush(&self, sealed: Option<ChunkKey>) -> Result<()> {
        self.drain_pending().await;

        let Some(key) = sealed else {
            return Ok(());
        };
        match self.state.lock().await.flush_failures.remove(&key) {
            Some(e) => Err(Error::StorageFailure(e)),
            None => Ok(()),
        }
    }

    /// Persist sealed buffers in cut order, then record and announce each one
    ///
    /// A failed write is parked in `flush_failures` for the caller that
    /// sealed the chunk, and draining carries on with the next one.
    async fn drain_pending(&self) {
        let _lane = self.flush_lane.lock().await;

        loop {
            let next = self.state.lock().await.pending.pop_front();
            let Some(sealed) = next else {
                return;
            };

            let len = sealed.data.len();
            if let Err(e) = self.store.put(&sealed.key, sealed.data).await {
                tracing::error!(
                    stream = %self.id,
                    chunk = %sealed.key,
                    bytes = len,
                    error = %e,
                    "Failed to persist chunk"
                );
                let mut state = self.state.lock().await;
                state.stats.failed_flushes += 1;
                state.flush_failures.insert(sealed.key, e);
                continue;
            }

            let chunk = ChunkRef::new(sealed.key, len);
            {
                let mut state = self.state.lock().await;
                state.chunks.push(chunk.clone());
                state.stats.chunks_persisted += 1;
                state.stats.bytes_persisted += len as u64;
            }
            tracing::info!(stream = %self.id, chunk = %chunk, bytes = len, "Chunk persisted");

            self.dispatcher.push_chunk_ready(&self.id, &chunk).await;
        }
    }

    /// Liveness and ordered chunk list, taken under the state lock
    pub async fn snapshot(&self) -> StreamSnapshot {
        self.state.lock().await.snapshot()
    }

    pub async fn summary(&self) -> StreamSummary {
        self.state.lock().await.summary()
    }

    pub async fn phase(&self) -> StreamPhase {
        self.state.lock().await.phase
    }

    pub async fn is_live(&self) -> bool {
        self.state.lock().await.is_live()
    }

    pub async fn chunk_count(&self) -> usize {
        self.state.lock().await.chunks.len()
    }

    /// Bytes in the open (unflushed) buffer, if one is open
    pub async fn open_buffer_len(&self) -> Option<usize> {
        self.state.lock().await.open_buffer_len()
    }

    pub async fn stats(&self) -> StreamStats {
        self.state.lock().await.stats.clone()
    }
}

impl std::fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSession")
            .field("id", &self.id)
            .field("rollover_threshold", &self.rollover_threshold)
            .finish()
    }
}
