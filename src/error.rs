//! Error types for relay operations
//!
//! Every external call either succeeds with its documented payload or fails
//! with exactly one of these kinds. None of them are retried internally.

use thiserror::Error;

use crate::registry::StreamId;
use crate::store::{ChunkKey, StoreError};

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for relay operations
#[derive(Debug, Error)]
pub enum Error {
    /// Unknown stream id referenced by append, end, get-chunks or fetch
    #[error("Stream not found: {0}")]
    StreamNotFound(StreamId),

    /// Append after the stream was ended
    #[error("Stream has ended: {0}")]
    StreamEnded(StreamId),

    /// Join on an unknown stream id
    #[error("Invalid stream ID: {0}")]
    InvalidStream(StreamId),

    /// Fetch of a key that is not in the store
    #[error("Chunk not found: {0}")]
    ChunkNotFound(ChunkKey),

    /// Malformed chunk key
    #[error("Invalid chunk reference: {0:?}")]
    InvalidReference(String),

    /// Underlying blob store failure
    #[error("Storage failure: {0}")]
    StorageFailure(StoreError),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => Error::ChunkNotFound(key),
            other => Error::StorageFailure(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_chunk_not_found() {
        let key = ChunkKey::new(StreamId::new("s1"), 42);
        let err: Error = StoreError::NotFound(key.clone()).into();

        assert!(matches!(err, Error::ChunkNotFound(k) if k == key));
    }

    #[test]
    fn test_store_io_maps_to_storage_failure() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = StoreError::Io(io).into();

        assert!(matches!(err, Error::StorageFailure(StoreError::Io(_))));
        assert!(err.to_string().starts_with("Storage failure"));
    }
}
