//! Stream registry implementation
//!
//! The central registry that creates and looks up stream sessions. It is an
//! explicitly owned object held by the API layer, not ambient global state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::listener::Dispatcher;
use crate::session::StreamSession;
use crate::store::ChunkStore;

use super::config::RegistryConfig;
use super::types::{StreamId, StreamSummary};

/// Registry of all streams, live and ended
///
/// Streams are never removed: an ended stream stays registered so its
/// chunks remain retrievable.
pub struct StreamRegistry {
    /// Map of stream id to session
    streams: RwLock<HashMap<StreamId, Arc<StreamSession>>>,

    /// Chunk store handed to every session
    store: Arc<dyn ChunkStore>,

    /// Live fan-out shared by every session
    dispatcher: Arc<Dispatcher>,

    /// Configuration
    config: RegistryConfig,
}

impl StreamRegistry {
    pub fn new(
        config: RegistryConfig,
        store: Arc<dyn ChunkStore>,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            streams: RwLock::new(HashMap::new()),
            store,
            dispatcher,
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ChunkStore> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Create a new live stream with no chunks and return its id
    pub async fn create(&self) -> StreamId {
        let mut streams = self.streams.write().await;

        let mut id = StreamId::generate();
        while streams.contains_key(&id) {
            id = StreamId::generate();
        }

        let session = StreamSession::new(
            id.clone(),
            &self.config,
            Arc::clone(&self.store),
            Arc::clone(&self.dispatcher),
        );
        streams.insert(id.clone(), Arc::new(session));

        tracing::info!(
            stream = %id,
            rollover_secs = self.config.rollover_threshold.as_secs_f64(),
            "Stream created"
        );

        id
    }

    /// Look up a stream session
    pub async fn get(&self, id: &StreamId) -> Result<Arc<StreamSession>> {
        self.streams
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::StreamNotFound(id.clone()))
    }

    /// Check whether a stream is registered
    pub async fn contains(&self, id: &StreamId) -> bool {
        self.streams.read().await.contains_key(id)
    }

    /// Point-in-time listing of every stream
    ///
    /// Mutations made after the session handles are collected are not
    /// reflected.
    pub async fn list(&self) -> HashMap<StreamId, StreamSummary> {
        let sessions: Vec<Arc<StreamSession>> =
            self.streams.read().await.values().cloned().collect();

        let mut listing = HashMap::with_capacity(sessions.len());
        for session in sessions {
            listing.insert(session.id().clone(), session.summary().await);
        }
        listing
    }

    /// Get total number of streams
    pub async fn stream_count(&self) -> usize {
        self.streams.read().await.len()
    }
}

impl std::fmt::Debug for StreamRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamRegistry")
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::listener::{ChannelTransport, ListenerRegistry};
    use crate::store::MemoryChunkStore;

    fn registry() -> StreamRegistry {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(ListenerRegistry::new()),
            Arc::new(ChannelTransport::new()),
        ));
        StreamRegistry::new(
            RegistryConfig::default(),
            Arc::new(MemoryChunkStore::new()),
            dispatcher,
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry();

        let id = registry.create().await;
        let session = registry.get(&id).await.unwrap();

        assert_eq!(session.id(), &id);
        assert!(session.is_live().await);
        assert_eq!(session.chunk_count().await, 0);
        assert!(registry.contains(&id).await);
        assert_eq!(
            registry.config().rollover_threshold,
            std::time::Duration::from_secs(5)
        );
    }

    #[tokio::test]
    async fn test_get_unknown() {
        let registry = registry();

        let result = registry.get(&StreamId::new("missing")).await;
        assert!(matches!(result, Err(Error::StreamNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_snapshot() {
        let registry = registry();
        let live = registry.create().await;
        let ended = registry.create().await;

        let session = registry.get(&ended).await.unwrap();
        session.append(Bytes::from_static(b"abc")).await.unwrap();
        session.end().await.unwrap();

        let listing = registry.list().await;

        let chunk = session.snapshot().await.chunks[0].clone();
        assert_eq!(
            registry.store().get(&chunk.key).await.unwrap(),
            Bytes::from_static(b"abc")
        );

        assert_eq!(listing.len(), 2);
        assert_eq!(
            listing[&live],
            StreamSummary {
                is_live: true,
                chunk_count: 0
            }
        );
        assert_eq!(
            listing[&ended],
            StreamSummary {
                is_live: false,
                chunk_count: 1
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_create_unique() {
        let registry = Arc::new(registry());

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move { registry.create().await }));
        }
        let mut ids = Vec::new();
        for task in tasks {
            ids.push(task.await.unwrap());
        }
        ids.sort();
        ids.dedup();

        assert_eq!(ids.len(), 16);
        assert_eq!(registry.stream_count().await, 16);
    }
}
