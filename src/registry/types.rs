//! Stream identity and chunk reference types
//!
//! These are the values that cross the registry boundary: ids handed to
//! producers and listeners, references to persisted chunks, and point-in-time
//! views of a stream.

use std::fmt;

use uuid::Uuid;

use crate::store::ChunkKey;

/// Opaque unique identifier for a stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(String);

impl StreamId {
    /// Wrap an existing id (e.g. one received from a client)
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Allocate a fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StreamId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for StreamId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Reference to a persisted chunk
///
/// Carries identity and size only; the bytes are fetched separately from
/// the chunk store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkRef {
    /// Storage key (`{stream_id}/{start}.raw`)
    pub key: ChunkKey,
    /// Length of the chunk in bytes (always > 0)
    pub len: usize,
}

impl ChunkRef {
    pub fn new(key: ChunkKey, len: usize) -> Self {
        Self { key, len }
    }

    /// Stream the chunk belongs to
    pub fn stream_id(&self) -> &StreamId {
        &self.key.stream_id
    }

    /// Start timestamp of the chunk, seconds since the Unix epoch
    pub fn start(&self) -> u64 {
        self.key.start
    }
}

impl fmt::Display for ChunkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.key, f)
    }
}

/// Point-in-time view of a stream, used for GetChunks and join backfill
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSnapshot {
    pub is_live: bool,
    /// Persisted chunks in temporal order
    pub chunks: Vec<ChunkRef>,
}

/// Summary row returned by stream listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub is_live: bool,
    pub chunk_count: usize,
}
