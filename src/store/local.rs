//! Local-disk chunk store
//!
//! Chunks are written to `{root}/{stream_id}/{start}.raw`. Each write lands
//! in a hidden staging file first and is renamed into place once complete,
//! so readers never observe a partially written chunk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use super::error::StoreError;
use super::key::ChunkKey;
use super::ChunkStore;

/// Chunk store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalChunkStore {
    root: PathBuf,
}

impl LocalChunkStore {
    /// Create a store rooted at `root` without touching the filesystem
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store rooted at `root`, creating the directory if needed
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = Self::new(root);
        fs::create_dir_all(&store.root).await?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final on-disk location of a chunk
    pub fn path_for(&self, key: &ChunkKey) -> PathBuf {
        self.root
            .join(key.stream_id.as_str())
            .join(key.file_name())
    }
}

#[async_trait]
impl ChunkStore for LocalChunkStore {
    async fn put(&self, key: &ChunkKey, data: Bytes) -> Result<(), StoreError> {
        let dir = self.root.join(key.stream_id.as_str());
        fs::create_dir_all(&dir).await?;

        let staging = StagingFile::new(dir.join(format!(".{}.partial", key.file_name())));
        fs::write(staging.path(), &data).await?;
        fs::rename(staging.path(), self.path_for(key)).await?;
        staging.disarm();

        Ok(())
    }

    async fn get(&self, key: &ChunkKey) -> Result<Bytes, StoreError> {
        match fs::read(self.path_for(key)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.clone()))
            }
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

/// Staging file that is removed on drop unless disarmed
///
/// Covers every early return and cancellation between the staging write and
/// the final rename.
struct StagingFile {
    path: PathBuf,
    armed: bool,
}

impl StagingFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_file(&self.path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::debug!(path = %self.path.display(), error = %e, "Failed to remove staging file");
                }
            }
        }
    }
}
