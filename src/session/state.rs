//! Per-stream mutable state
//!
//! Everything here is guarded by the session's state lock: the lifecycle
//! phase, the single open buffer, the persisted chunk list, and the queues of
//! live frames and sealed buffers waiting to go out.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::registry::{ChunkRef, StreamId, StreamSnapshot, StreamSummary};
use crate::stats::StreamStats;
use crate::store::{ChunkKey, StoreError};

/// Lifecycle phase of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    /// Accepting appends
    Live,
    /// Terminal; appends are rejected
    Ended,
}

/// Buffer accumulating bytes for the next chunk
#[derive(Debug)]
pub struct OpenBuffer {
    pub data: BytesMut,
    /// Chunk start timestamp, seconds since the Unix epoch
    pub start: u64,
    /// Monotonic open time, used for the rollover check
    pub opened_at: Instant,
}

/// A closed buffer queued for persistence
#[derive(Debug)]
pub struct SealedBuffer {
    pub key: ChunkKey,
    pub data: Bytes,
}

#[derive(Debug)]
pub struct SessionState {
    pub phase: StreamPhase,
    pub buffer: Option<OpenBuffer>,
    /// Persisted chunks, in start order
    pub chunks: Vec<ChunkRef>,
    /// Sealed buffers not yet written, in cut order
    pub pending: VecDeque<SealedBuffer>,
    /// Live frames not yet pushed, in append order
    pub frames: VecDeque<Bytes>,
    /// Store errors waiting for the caller that sealed the chunk
    pub flush_failures: HashMap<ChunkKey, StoreError>,
    /// Start timestamp of the most recently opened buffer
    pub last_start: Option<u64>,
    pub stats: StreamStats,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: StreamPhase::Live,
            buffer: None,
            chunks: Vec::new(),
            pending: VecDeque::new(),
            frames: VecDeque::new(),
            flush_failures: HashMap::new(),
            last_start: None,
            stats: StreamStats::new(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.phase == StreamPhase::Live
    }

    /// Buffer `data` for persistence, rolling the open buffer over first if
    /// it has been open longer than `threshold`
    ///
    /// Returns the key of the buffer sealed into the pending queue, if any.
    pub fn append(
        &mut self,
        stream_id: &StreamId,
        data: &[u8],
        threshold: Duration,
    ) -> Result<Option<ChunkKey>> {
        if !self.is_live() {
            return Err(Error::StreamEnded(stream_id.clone()));
        }

        let now = Instant::now();
        let mut sealed = None;

        let expired = self
            .buffer
            .as_ref()
            .is_some_and(|buffer| now.duration_since(buffer.opened_at) > threshold);
        if expired {
            sealed = self.seal(stream_id);
        }
        if self.buffer.is_none() {
            self.open(now);
        }

        if let Some(buffer) = self.buffer.as_mut() {
            buffer.data.extend_from_slice(data);
        }
        self.stats.appends += 1;
        self.stats.bytes_appended += data.len() as u64;

        Ok(sealed)
    }

    /// Flush the open buffer (if any) and move to `Ended`
    ///
    /// Returns the key of the final buffer if it was sealed.
    pub fn end(&mut self, stream_id: &StreamId) -> Option<ChunkKey> {
        let sealed = self.seal(stream_id);
        if self.is_live() {
            self.phase = StreamPhase::Ended;
            self.stats.ended_at = Some(Instant::now());
        }
        sealed
    }

    /// Close the open buffer, queueing it for persistence unless it is empty
    fn seal(&mut self, stream_id: &StreamId) -> Option<ChunkKey> {
        let buffer = self.buffer.take()?;

        if buffer.data.is_empty() {
            self.stats.empty_buffers_discarded += 1;
            tracing::debug!(stream = %stream_id, start = buffer.start, "Empty buffer discarded");
            return None;
        }

        let key = ChunkKey::new(stream_id.clone(), buffer.start);
        self.pending.push_back(SealedBuffer {
            key: key.clone(),
            data: buffer.data.freeze(),
        });
        Some(key)
    }

    fn open(&mut self, now: Instant) {
        // Starts are strictly increasing so chunk keys never collide
        let wall = wall_clock_secs();
        let start = match self.last_start {
            Some(last) => wall.max(last + 1),
            None => wall,
        };
        self.last_start = Some(start);
        self.buffer = Some(OpenBuffer {
            data: BytesMut::new(),
            start,
            opened_at: now,
        });
    }

    pub fn open_buffer_len(&self) -> Option<usize> {
        self.buffer.as_ref().map(|buffer| buffer.data.len())
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            is_live: self.is_live(),
            chunks: self.chunks.clone(),
        }
    }

    pub fn summary(&self) -> StreamSummary {
        StreamSummary {
            is_live: self.is_live(),
            chunk_count: self.chunks.len(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

fn wall_clock_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: Duration = Duration::from_secs(5);

    #[tokio::test(start_paused = true)]
    async fn test_first_append_opens_buffer() {
        let id = StreamId::new("s");
        let mut state = SessionState::new();

        assert_eq!(state.open_buffer_len(), None);
        assert_eq!(state.append(&id, b"abc", THRESHOLD).unwrap(), None);
        assert_eq!(state.open_buffer_len(), Some(3));
        assert!(state.pending.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rollover_check_precedes_append() {
        let id = StreamId::new("s");
        let mut state = SessionState::new();

        state.append(&id, b"abc", THRESHOLD).unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        let sealed = state.append(&id, b"de", THRESHOLD).unwrap();

        assert_eq!(state.pending.len(), 1);
        assert_eq!(sealed.as_ref(), Some(&state.pending[0].key));
        assert_eq!(&state.pending[0].data[..], b"abc");
        assert_eq!(state.open_buffer_len(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_threshold_is_exclusive() {
        let id = StreamId::new("s");
        let mut state = SessionState::new();

        state.append(&id, b"a", THRESHOLD).unwrap();
        tokio::time::advance(THRESHOLD).await;
        assert_eq!(state.append(&id, b"b", THRESHOLD).unwrap(), None);
        assert_eq!(state.open_buffer_len(), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_strictly_increase() {
        let id = StreamId::new("s");
        let mut state = SessionState::new();
        let tiny = Duration::from_millis(1);

        for _ in 0..5 {
            state.append(&id, b"x", tiny).unwrap();
            tokio::time::advance(Duration::from_millis(2)).await;
        }
        state.end(&id);

        let starts: Vec<u64> = state.pending.iter().map(|s| s.key.start).collect();
        assert_eq!(starts.len(), 5);
        assert!(starts.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_start_is_in_epoch_seconds() {
        let id = StreamId::new("s");
        let mut state = SessionState::new();
        let before = wall_clock_secs();

        state.append(&id, b"a", THRESHOLD).unwrap();
        let key = state.end(&id).unwrap();

        assert!(key.start >= before);
        assert!(key.start <= wall_clock_secs());
        assert_eq!(key.file_name(), format!("{}.raw", key.start));
    }

    #[test]
    fn test_empty_buffer_is_discarded() {
        let id = StreamId::new("s");
        let mut state = SessionState::new();

        state.append(&id, b"", THRESHOLD).unwrap();
        assert_eq!(state.end(&id), None);

        assert!(state.pending.is_empty());
        assert_eq!(state.stats.empty_buffers_discarded, 1);
    }

    #[test]
    fn test_append_after_end_has_no_effect() {
        let id = StreamId::new("s");
        let mut state = SessionState::new();
        state.append(&id, b"abc", THRESHOLD).unwrap();
        state.end(&id);

        let result = state.append(&id, b"late", THRESHOLD);

        assert!(matches!(result, Err(Error::StreamEnded(_))));
        assert_eq!(state.open_buffer_len(), None);
        assert_eq!(state.pending.len(), 1);
        assert_eq!(state.stats.appends, 1);
        assert_eq!(state.phase, StreamPhase::Ended);
    }
}
