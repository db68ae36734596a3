//! Durable chunk storage
//!
//! The relay persists each completed chunk through the [`ChunkStore`] trait,
//! an abstract `put(key, bytes)` / `get(key)` blob service. Two backends are
//! provided:
//!
//! - [`LocalChunkStore`]: files under a root directory
//! - [`MemoryChunkStore`]: an in-process map, standing in for remote object storage
//!
//! Any other backend (S3, GCS, ...) only needs to implement the trait.

pub mod error;
pub mod key;
pub mod local;
pub mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

pub use error::StoreError;
pub use key::ChunkKey;
pub use local::LocalChunkStore;
pub use memory::MemoryChunkStore;

/// Blob storage for chunk bytes, keyed by stream id + chunk start timestamp
#[async_trait]
pub trait ChunkStore: Send + Sync + 'static {
    /// Durably store `data` under `key`
    async fn put(&self, key: &ChunkKey, data: Bytes) -> Result<(), StoreError>;

    /// Fetch the bytes stored under `key`
    ///
    /// Returns [`StoreError::NotFound`] if nothing is stored there.
    async fn get(&self, key: &ChunkKey) -> Result<Bytes, StoreError>;
}

/// Which chunk store backend to build
#[derive(Debug, Clone, Default)]
pub enum StorageConfig {
    /// In-memory store (nothing survives the process)
    #[default]
    Memory,
    /// Files under `root`
    Local { root: PathBuf },
}

impl StorageConfig {
    /// Local-disk storage rooted at `root`
    pub fn local(root: impl Into<PathBuf>) -> Self {
        StorageConfig::Local { root: root.into() }
    }

    /// Construct the configured backend
    pub async fn build(&self) -> Result<Arc<dyn ChunkStore>, StoreError> {
        match self {
            StorageConfig::Memory => Ok(Arc::new(MemoryChunkStore::new())),
            StorageConfig::Local { root } => {
                let store = LocalChunkStore::open(root.clone()).await?;
                tracing::info!(root = %root.display(), "Local chunk store opened");
                Ok(Arc::new(store))
            }
        }
    }
}
