//! Chunk store error types

use thiserror::Error;

use super::key::ChunkKey;

/// Error type returned by [`ChunkStore`](super::ChunkStore) backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// No blob stored under this key
    #[error("Chunk not found: {0}")]
    NotFound(ChunkKey),

    /// Local I/O failure
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure reported by a remote backend
    #[error("Storage backend error: {0}")]
    Backend(String),
}
