//! In-memory chunk store
//!
//! Keeps chunk bytes in a map. Used in tests and as a stand-in for a remote
//! object store.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use super::error::StoreError;
use super::key::ChunkKey;
use super::ChunkStore;

/// Chunk store backed by a `HashMap`
#[derive(Debug, Default)]
pub struct MemoryChunkStore {
    blobs: RwLock<HashMap<ChunkKey, Bytes>>,
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    /// Keys currently stored, sorted
    pub async fn keys(&self) -> Vec<ChunkKey> {
        let mut keys: Vec<ChunkKey> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ChunkStore for MemoryChunkStore {
    async fn put(&self, key: &ChunkKey, data: Bytes) -> Result<(), StoreError> {
        self.blobs.write().await.insert(key.clone(), data);
        Ok(())
    }

    async fn get(&self, key: &ChunkKey) -> Result<Bytes, StoreError> {
        self.blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::StreamId;

    #[tokio::test]
    async fn test_put_get() {
        let store = MemoryChunkStore::new();
        let key = ChunkKey::new(StreamId::new("s"), 10);

        store.put(&key, Bytes::from_static(b"abc")).await.unwrap();

        assert_eq!(store.get(&key).await.unwrap(), Bytes::from_static(b"abc"));
        assert_eq!(store.len().await, 1);
        assert_eq!(store.keys().await, vec![key]);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryChunkStore::new();
        let key = ChunkKey::new(StreamId::new("s"), 10);

        let result = store.get(&key).await;
        assert!(matches!(result, Err(StoreError::NotFound(k)) if k == key));
        assert!(store.is_empty().await);
    }
}
