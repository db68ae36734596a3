//! Relay API surface
//!
//! [`Relay`] is what an external transport (HTTP routes, WebSocket
//! handlers, RPC) calls into. It wires the stream registry, listener
//! registry, dispatcher and chunk store together and exposes one method per
//! request type.
//!
//! | Operation      | Method                    |
//! |----------------|---------------------------|
//! | CreateStream   | [`Relay::create_stream`]  |
//! | ListStreams    | [`Relay::list_streams`]   |
//! | AppendAudio    | [`Relay::append_audio`]   |
//! | EndStream      | [`Relay::end_stream`]     |
//! | GetChunks      | [`Relay::get_chunks`]     |
//! | FetchChunk     | [`Relay::fetch_chunk`]    |
//! | Join           | [`Relay::join`]           |
//! | Disconnect     | [`Relay::disconnect`]     |

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::listener::{Dispatcher, ListenerId, ListenerRegistry, PushEvent, PushTransport};
use crate::registry::{RegistryConfig, StreamId, StreamRegistry, StreamSnapshot, StreamSummary};
use crate::stats::{DispatchStats, StreamStats};
use crate::store::{ChunkKey, ChunkStore};

use super::config::RelayConfig;

/// Message pushed to a listener whose join was rejected
const JOIN_ERROR_MESSAGE: &str = "Invalid stream ID";

/// Entry point for every relay operation
#[derive(Clone)]
pub struct Relay {
    streams: Arc<StreamRegistry>,
    listeners: Arc<ListenerRegistry>,
    dispatcher: Arc<Dispatcher>,
    store: Arc<dyn ChunkStore>,
}

impl Relay {
    /// Create a relay over an existing store and transport
    pub fn new(
        config: RegistryConfig,
        store: Arc<dyn ChunkStore>,
        transport: Arc<dyn PushTransport>,
    ) -> Self {
        let listeners = Arc::new(ListenerRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&listeners), transport));
        let streams = Arc::new(StreamRegistry::new(
            config,
            Arc::clone(&store),
            Arc::clone(&dispatcher),
        ));

        Self {
            streams,
            listeners,
            dispatcher,
            store,
        }
    }

    /// Create a relay, building the chunk store from `config`
    pub async fn open(config: RelayConfig, transport: Arc<dyn PushTransport>) -> Result<Self> {
        let store = config.storage.build().await.map_err(Error::StorageFailure)?;
        Ok(Self::new(config.registry, store, transport))
    }

    pub fn streams(&self) -> &Arc<StreamRegistry> {
        &self.streams
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    /// Allocate a new live stream
    pub async fn create_stream(&self) -> StreamId {
        self.streams.create().await
    }

    /// Summary of every stream, live and ended
    pub async fn list_streams(&self) -> HashMap<StreamId, StreamSummary> {
        self.streams.list().await
    }

    /// Append producer bytes to a stream
    ///
    /// See [`StreamSession::append`](crate::session::StreamSession::append) for the error contract. A
    /// `StorageFailure` here does not mean `data` was lost.
    pub async fn append_audio(&self, stream_id: &StreamId, data: Bytes) -> Result<()> {
        self.streams.get(stream_id).await?.append(data).await
    }

    /// End a stream, persisting whatever is buffered
    pub async fn end_stream(&self, stream_id: &StreamId) -> Result<()> {
        self.streams.get(stream_id).await?.end().await
    }

    /// Liveness and ordered chunk list of a stream
    pub async fn get_chunks(&self, stream_id: &StreamId) -> Result<StreamSnapshot> {
        Ok(self.streams.get(stream_id).await?.snapshot().await)
    }

    /// Fetch chunk bytes by their textual key (`{stream_id}/{start}.raw`)
    pub async fn fetch_chunk(&self, key: &str) -> Result<Bytes> {
        let key = ChunkKey::parse(key)?;
        self.fetch(&key).await
    }

    /// Fetch chunk bytes by key
    pub async fn fetch(&self, key: &ChunkKey) -> Result<Bytes> {
        if !self.streams.contains(&key.stream_id).await {
            return Err(Error::StreamNotFound(key.stream_id.clone()));
        }
        Ok(self.store.get(key).await?)
    }

    /// Subscribe a listener to a stream and return the backfill snapshot
    ///
    /// On an unknown stream the listener is also sent a `join_error` push.
    pub async fn join(&self, stream_id: &StreamId, listener: ListenerId) -> Result<StreamSnapshot> {
        match self.listeners.join(&self.streams, stream_id, listener.clone()).await {
            Ok(snapshot) => Ok(snapshot),
            Err(e) => {
                tracing::warn!(stream = %stream_id, listener = %listener, "Join rejected: unknown stream");
                let event = PushEvent::JoinError {
                    message: JOIN_ERROR_MESSAGE.to_string(),
                };
                if let Err(push_err) = self.dispatcher.push_to(&listener, event).await {
                    tracing::debug!(listener = %listener, error = %push_err, "Join error push failed");
                }
                Err(e)
            }
        }
    }

    /// Unsubscribe a listener from one stream
    pub async fn leave(&self, stream_id: &StreamId, listener: &ListenerId) -> bool {
        self.listeners.leave_stream(listener, stream_id).await
    }

    /// Drop every membership of a listener and close its push channel
    pub async fn disconnect(&self, listener: &ListenerId) {
        let streams = self.listeners.leave(listener).await;
        self.dispatcher.transport().close(listener).await;

        tracing::info!(
            listener = %listener,
            streams = streams.len(),
            "Listener disconnected"
        );
    }

    pub async fn stream_stats(&self, stream_id: &StreamId) -> Result<StreamStats> {
        Ok(self.streams.get(stream_id).await?.stats().await)
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }
}

impl std::fmt::Debug for Relay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Relay")
            .field("streams", &self.streams)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
