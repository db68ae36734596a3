//! Listener membership
//!
//! Membership is a many-to-many relation between listeners and streams,
//! kept as one bidirectional index (stream -> listeners, listener -> streams)
//! under a single lock. Both directions are updated together, and neither
//! side ever keeps an empty set.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::registry::{StreamId, StreamRegistry, StreamSnapshot};

use super::transport::ListenerId;

#[derive(Debug, Default)]
struct ListenerIndex {
    by_stream: HashMap<StreamId, HashSet<ListenerId>>,
    by_listener: HashMap<ListenerId, HashSet<StreamId>>,
}

impl ListenerIndex {
    fn insert(&mut self, stream_id: &StreamId, listener: &ListenerId) -> bool {
        let added = self
            .by_stream
            .entry(stream_id.clone())
            .or_default()
            .insert(listener.clone());
        self.by_listener
            .entry(listener.clone())
            .or_default()
            .insert(stream_id.clone());
        added
    }

    fn remove_pair(&mut self, stream_id: &StreamId, listener: &ListenerId) -> bool {
        let removed = remove_and_prune(&mut self.by_stream, stream_id, listener);
        remove_and_prune(&mut self.by_listener, listener, stream_id);
        removed
    }

    fn remove_listener(&mut self, listener: &ListenerId) -> Vec<StreamId> {
        let streams = self.by_listener.remove(listener).unwrap_or_default();
        for stream_id in &streams {
            remove_and_prune(&mut self.by_stream, stream_id, listener);
        }
        streams.into_iter().collect()
    }
}

/// Remove `value` from the set at `key`, dropping the entry once the set is empty
fn remove_and_prune<K, V>(map: &mut HashMap<K, HashSet<V>>, key: &K, value: &V) -> bool
where
    K: std::hash::Hash + Eq,
    V: std::hash::Hash + Eq,
{
    let Some(set) = map.get_mut(key) else {
        return false;
    };
    let removed = set.remove(value);
    if set.is_empty() {
        map.remove(key);
    }
    removed
}

/// Tracks which listeners are subscribed to which streams
///
/// Synchronized independently of any stream's state, since connects and
/// disconnects are unrelated in time to a stream's appends.
#[derive(Debug, Default)]
pub struct ListenerRegistry {
    index: RwLock<ListenerIndex>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to a stream and return the stream's snapshot
    ///
    /// The snapshot is taken after the membership is recorded, so every chunk
    /// is either in the backfill or announced by a later push (possibly both).
    /// Fails with [`Error::InvalidStream`] without touching the index if the
    /// stream is unknown.
    pub async fn join(
        &self,
        streams: &StreamRegistry,
        stream_id: &StreamId,
        listener: ListenerId,
    ) -> Result<StreamSnapshot> {
        let session = streams
            .get(stream_id)
            .await
            .map_err(|_| Error::InvalidStream(stream_id.clone()))?;

        self.index.write().await.insert(stream_id, &listener);
        let snapshot = session.snapshot().await;

        tracing::info!(
            stream = %stream_id,
            listener = %listener,
            is_live = snapshot.is_live,
            backfill_chunks = snapshot.chunks.len(),
            "Listener joined"
        );

        Ok(snapshot)
    }

    /// Remove `listener` from every stream it belongs to
    ///
    /// Returns the streams it was removed from. A listener with no
    /// memberships is a no-op.
    pub async fn leave(&self, listener: &ListenerId) -> Vec<StreamId> {
        self.index.write().await.remove_listener(listener)
    }

    /// Remove `listener` from a single stream
    pub async fn leave_stream(&self, listener: &ListenerId, stream_id: &StreamId) -> bool {
        let removed = self.index.write().await.remove_pair(stream_id, listener);
        if removed {
            tracing::debug!(stream = %stream_id, listener = %listener, "Listener left stream");
        }
        removed
    }

    /// Current listeners of a stream (empty if none)
    pub async fn listeners_of(&self, stream_id: &StreamId) -> HashSet<ListenerId> {
        self.index
            .read()
            .await
            .by_stream
            .get(stream_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Streams a listener is subscribed to (empty if none)
    pub async fn streams_of(&self, listener: &ListenerId) -> HashSet<StreamId> {
        self.index
            .read()
            .await
            .by_listener
            .get(listener)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the stream has an entry (i.e. at least one listener)
    pub async fn has_stream(&self, stream_id: &StreamId) -> bool {
        self.index.read().await.by_stream.contains_key(stream_id)
    }

    /// Number of streams with at least one listener
    pub async fn stream_count(&self) -> usize {
        self.index.read().await.by_stream.len()
    }

    /// Number of listeners with at least one membership
    pub async fn listener_count(&self) -> usize {
        self.index.read().await.by_listener.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::listener::{ChannelTransport, Dispatcher};
    use crate::registry::RegistryConfig;
    use crate::store::MemoryChunkStore;

    fn setup() -> (StreamRegistry, Arc<ListenerRegistry>) {
        let listeners = Arc::new(ListenerRegistry::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&listeners),
            Arc::new(ChannelTransport::new()),
        ));
        let streams = StreamRegistry::new(
            RegistryConfig::default(),
            Arc::new(MemoryChunkStore::new()),
            dispatcher,
        );
        (streams, listeners)
    }

    #[tokio::test]
    async fn test_join_returns_snapshot() {
        let (streams, listeners) = setup();
        let id = streams.create().await;

        let snapshot = listeners.join(&streams, &id, "l1".into()).await.unwrap();

        assert!(snapshot.is_live);
        assert!(snapshot.chunks.is_empty());
        assert!(listeners.listeners_of(&id).await.contains(&ListenerId::new("l1")));
    }

    #[tokio::test]
    async fn test_join_unknown_stream() {
        let (streams, listeners) = setup();
        let ghost = StreamId::new("ghost");

        let result = listeners.join(&streams, &ghost, "l1".into()).await;

        assert!(matches!(result, Err(Error::InvalidStream(id)) if id == ghost));
        assert_eq!(listeners.stream_count().await, 0);
        assert_eq!(listeners.listener_count().await, 0);
    }

    #[tokio::test]
    async fn test_leave_prunes_empty_streams() {
        let (streams, listeners) = setup();
        let a = streams.create().await;
        let b = streams.create().await;
        let l1 = ListenerId::new("l1");
        let l2 = ListenerId::new("l2");

        listeners.join(&streams, &a, l1.clone()).await.unwrap();
        listeners.join(&streams, &b, l1.clone()).await.unwrap();
        listeners.join(&streams, &b, l2.clone()).await.unwrap();

        let mut left = listeners.leave(&l1).await;
        left.sort();
        let mut expected = vec![a.clone(), b.clone()];
        expected.sort();
        assert_eq!(left, expected);

        // `a` lost its only listener, `b` still has l2
        assert!(!listeners.has_stream(&a).await);
        assert!(listeners.listeners_of(&a).await.is_empty());
        assert_eq!(listeners.listeners_of(&b).await.len(), 1);
        assert!(listeners.streams_of(&l1).await.is_empty());
    }

    #[tokio::test]
    async fn test_leave_without_memberships() {
        let listeners = ListenerRegistry::new();

        assert!(listeners.leave(&ListenerId::new("nobody")).await.is_empty());
        assert_eq!(listeners.stream_count().await, 0);
    }

    #[tokio::test]
    async fn test_leave_single_stream() {
        let (streams, listeners) = setup();
        let a = streams.create().await;
        let b = streams.create().await;
        let l1 = ListenerId::new("l1");

        listeners.join(&streams, &a, l1.clone()).await.unwrap();
        listeners.join(&streams, &b, l1.clone()).await.unwrap();

        assert!(listeners.leave_stream(&l1, &a).await);
        assert!(!listeners.leave_stream(&l1, &a).await);

        assert!(!listeners.has_stream(&a).await);
        assert_eq!(listeners.streams_of(&l1).await, HashSet::from([b]));
    }

    #[tokio::test]
    async fn test_concurrent_join_leave() {
        let (streams, listeners) = setup();
        let streams = Arc::new(streams);
        let id = streams.create().await;

        let mut tasks = Vec::new();
        for i in 0..32 {
            let streams = Arc::clone(&streams);
            let listeners = Arc::clone(&listeners);
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                let listener = ListenerId::new(format!("l{}", i));
                listeners.join(&streams, &id, listener.clone()).await.unwrap();
                if i % 2 == 0 {
                    listeners.leave(&listener).await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(listeners.listeners_of(&id).await.len(), 16);
        assert_eq!(listeners.listener_count().await, 16);
    }
}
