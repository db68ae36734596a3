//! Statistics for streams and live fan-out

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::Instant;

/// Stream-level statistics
#[derive(Debug, Clone)]
pub struct StreamStats {
    /// When the stream was created
    pub started_at: Instant,
    /// When the stream was ended
    pub ended_at: Option<Instant>,
    /// Number of accepted append calls
    pub appends: u64,
    /// Total bytes accepted by append
    pub bytes_appended: u64,
    /// Chunks written to the store
    pub chunks_persisted: u64,
    /// Bytes written to the store
    pub bytes_persisted: u64,
    /// Buffers dropped at flush time because they held no bytes
    pub empty_buffers_discarded: u64,
    /// Flushes that failed at the store
    pub failed_flushes: u64,
}

impl StreamStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            ended_at: None,
            appends: 0,
            bytes_appended: 0,
            chunks_persisted: 0,
            bytes_persisted: 0,
            empty_buffers_discarded: 0,
            failed_flushes: 0,
        }
    }

    /// Time since creation, or the stream's whole lifetime once ended
    pub fn duration(&self) -> Duration {
        match self.ended_at {
            Some(ended) => ended.duration_since(self.started_at),
            None => self.started_at.elapsed(),
        }
    }

    /// Average ingest bitrate in bits per second
    pub fn bitrate(&self) -> Option<u64> {
        let secs = self.duration().as_secs();
        if secs > 0 {
            Some((self.bytes_appended * 8) / secs)
        } else {
            None
        }
    }

    /// Bytes accepted but not yet persisted (open buffer and in-flight flushes)
    pub fn bytes_unpersisted(&self) -> u64 {
        self.bytes_appended.saturating_sub(self.bytes_persisted)
    }
}

impl Default for StreamStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of dispatcher counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Audio frames delivered to a listener queue
    pub audio_frames_pushed: u64,
    /// Chunk-ready notices delivered to a listener queue
    pub chunk_notices_pushed: u64,
    /// Individual deliveries the transport rejected
    pub failed_deliveries: u64,
}

/// Live counters behind [`DispatchStats`]
#[derive(Debug, Default)]
pub(crate) struct DispatchCounters {
    audio_frames_pushed: AtomicU64,
    chunk_notices_pushed: AtomicU64,
    failed_deliveries: AtomicU64,
}

impl DispatchCounters {
    pub(crate) fn record_audio(&self, delivered: u64, failed: u64) {
        self.audio_frames_pushed.fetch_add(delivered, Ordering::Relaxed);
        self.failed_deliveries.fetch_add(failed, Ordering::Relaxed);
    }

    pub(crate) fn record_chunk_notice(&self, delivered: u64, failed: u64) {
        self.chunk_notices_pushed.fetch_add(delivered, Ordering::Relaxed);
        self.failed_deliveries.fetch_add(failed, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DispatchStats {
        DispatchStats {
            audio_frames_pushed: self.audio_frames_pushed.load(Ordering::Relaxed),
            chunk_notices_pushed: self.chunk_notices_pushed.load(Ordering::Relaxed),
            failed_deliveries: self.failed_deliveries.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bitrate() {
        let mut stats = StreamStats::new();
        stats.bytes_appended = 10_000;

        assert_eq!(stats.bitrate(), None);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(stats.bitrate(), Some(8_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_freezes_at_end() {
        let mut stats = StreamStats::new();
        tokio::time::advance(Duration::from_secs(3)).await;
        stats.ended_at = Some(Instant::now());
        tokio::time::advance(Duration::from_secs(30)).await;

        assert_eq!(stats.duration(), Duration::from_secs(3));
    }

    #[test]
    fn test_bytes_unpersisted() {
        let mut stats = StreamStats::new();
        stats.bytes_appended = 500;
        stats.bytes_persisted = 320;
        assert_eq!(stats.bytes_unpersisted(), 180);

        stats.bytes_persisted = 500;
        assert_eq!(stats.bytes_unpersisted(), 0);
    }

    #[test]
    fn test_dispatch_counters() {
        let counters = DispatchCounters::default();
        counters.record_audio(3, 1);
        counters.record_chunk_notice(2, 0);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.audio_frames_pushed, 3);
        assert_eq!(snapshot.chunk_notices_pushed, 2);
        assert_eq!(snapshot.failed_deliveries, 1);
    }
}
