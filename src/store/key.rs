//! Chunk storage keys
//!
//! A chunk is addressed by its stream id and start timestamp. The textual
//! form is `{stream_id}/{start}.raw`, which doubles as the relative path of
//! the chunk file in [`LocalChunkStore`](super::LocalChunkStore).

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::registry::StreamId;

/// File extension used for persisted chunk files
pub const CHUNK_EXTENSION: &str = "raw";

/// Storage key of a persisted chunk
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    /// Stream the chunk belongs to
    pub stream_id: StreamId,
    /// Start timestamp, seconds since the Unix epoch
    pub start: u64,
}

impl ChunkKey {
    pub fn new(stream_id: StreamId, start: u64) -> Self {
        Self { stream_id, start }
    }

    /// Chunk file name within the stream's directory (`{start}.raw`)
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.start, CHUNK_EXTENSION)
    }

    /// Parse a key from its textual form
    ///
    /// Accepts `{stream_id}/{start}.raw` and the bare `{stream_id}/{start}`.
    pub fn parse(s: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidReference(s.to_string());

        let (stream, file) = s.split_once('/').ok_or_else(invalid)?;
        if !is_valid_segment(stream) || file.contains('/') {
            return Err(invalid());
        }

        let start = file.strip_suffix(".raw").unwrap_or(file);
        if start.is_empty() || !start.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let start = start.parse::<u64>().map_err(|_| invalid())?;

        Ok(Self::new(StreamId::new(stream), start))
    }
}

/// A stream id segment must be usable as a single directory name
fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['\\', '\0'])
}

impl fmt::Display for ChunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stream_id, self.file_name())
    }
}

impl FromStr for ChunkKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let key = ChunkKey::new(StreamId::new("7f3c"), 1_700_000_005);

        assert_eq!(key.to_string(), "7f3c/1700000005.raw");
        assert_eq!(key.file_name(), "1700000005.raw");
    }

    #[test]
    fn test_parse_canonical_and_bare() {
        let canonical: ChunkKey = "7f3c/1700000005.raw".parse().unwrap();
        let bare: ChunkKey = "7f3c/1700000005".parse().unwrap();

        assert_eq!(canonical, bare);
        assert_eq!(canonical.stream_id.as_str(), "7f3c");
        assert_eq!(canonical.start, 1_700_000_005);
    }

    #[test]
    fn test_parse_display_is_stable() {
        let key = ChunkKey::new(StreamId::generate(), 12);
        let parsed = ChunkKey::parse(&key.to_string()).unwrap();

        assert_eq!(parsed, key);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for input in [
            "",
            "no-separator",
            "/123.raw",
            "a/b/123.raw",
            "a/",
            "a/.raw",
            "a/12x.raw",
            "a/+12",
            "a/123.wav",
            "../123.raw",
            "./123.raw",
            "a/99999999999999999999999",
        ] {
            let result = ChunkKey::parse(input);
            assert!(
                matches!(result, Err(Error::InvalidReference(_))),
                "expected InvalidReference for {:?}",
                input
            );
        }
    }
}
