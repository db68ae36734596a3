//! Push transport abstraction
//!
//! The relay never talks to sockets directly. Every push to a listener goes
//! through a [`PushTransport`], so WebSocket, message-queue or in-process
//! channel delivery can be swapped without touching stream logic.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

use crate::registry::{ChunkRef, StreamId};

/// Default per-listener queue depth for [`ChannelTransport`]
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Opaque identity of a listener connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(String);

impl ListenerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListenerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Event pushed to a joined listener
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// A new chunk was persisted; fetch its bytes separately
    ChunkReady { chunk: ChunkRef },
    /// Raw bytes for immediate playback
    AudioFrame { stream_id: StreamId, data: Bytes },
    /// A join request was rejected
    JoinError { message: String },
}

impl PushEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::ChunkReady { .. } => "chunk_ready",
            PushEvent::AudioFrame { .. } => "audio_frame",
            PushEvent::JoinError { .. } => "join_error",
        }
    }
}

/// Reason an individual delivery failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushError {
    /// The listener has no open connection
    #[error("listener disconnected")]
    Disconnected,
    /// The listener's queue is full
    #[error("listener queue full")]
    Full,
}

/// Push-capable channel to listener connections
///
/// Delivery is at-most-once. `push` must not wait on a slow listener; it is
/// called on the live fan-out path of every append.
#[async_trait]
pub trait PushTransport: Send + Sync + 'static {
    /// Deliver one event to one listener
    async fn push(&self, listener: &ListenerId, event: PushEvent) -> Result<(), PushError>;

    /// Release any per-listener resources after a disconnect
    async fn close(&self, _listener: &ListenerId) {}
}

/// In-process transport backed by one bounded `mpsc` queue per listener
///
/// Events that do not fit in a full queue are dropped, so a stalled
/// listener never holds up the producer.
#[derive(Debug)]
pub struct ChannelTransport {
    queues: RwLock<HashMap<ListenerId, mpsc::Sender<PushEvent>>>,
    capacity: usize,
}

impl ChannelTransport {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Open a connection for `listener` and return its event receiver
    ///
    /// Reconnecting with the same id replaces (and closes) the old queue.
    pub async fn connect(&self, listener: ListenerId) -> mpsc::Receiver<PushEvent> {
        let (tx, rx) = mpsc::channel(self.capacity);
        tracing::debug!(listener = %listener, "Listener connected");
        self.queues.write().await.insert(listener, tx);
        rx
    }

    /// Number of open connections
    pub async fn connection_count(&self) -> usize {
        self.queues.read().await.len()
    }
}

impl Default for ChannelTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PushTransport for ChannelTransport {
    async fn push(&self, listener: &ListenerId, event: PushEvent) -> Result<(), PushError> {
        let queues = self.queues.read().await;
        let tx = queues.get(listener).ok_or(PushError::Disconnected)?;

        tx.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PushError::Full,
            mpsc::error::TrySendError::Closed(_) => PushError::Disconnected,
        })
    }

    async fn close(&self, listener: &ListenerId) {
        self.queues.write().await.remove(listener);
    }
}
