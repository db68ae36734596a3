//! Live audio relay with chunked history
//!
//! One producer per stream appends raw audio bytes; the relay fans those
//! bytes out to every joined listener immediately and, in parallel, cuts the
//! stream into time-bounded chunks that are persisted to a [`ChunkStore`]
//! for late joiners and replay.
//!
//! # Architecture
//!
//! ```text
//!  producer ──► Relay::append_audio ──► StreamSession ──┬──► Dispatcher ──► listeners
//!                                       (buffer +       │     (audio_frame, chunk_ready)
//!                                        rollover)      │
//!                                                       └──► ChunkStore (on rollover / end)
//!
//!  listener ──► Relay::join ──► ListenerRegistry + snapshot (backfill)
//!  listener ──► Relay::fetch_chunk ──► ChunkStore::get
//! ```
//!
//! The transport that carries requests and pushes (HTTP, WebSocket, a
//! message queue) sits outside this crate behind [`PushTransport`].

pub mod error;
pub mod listener;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
pub use listener::{
    ChannelTransport, Dispatcher, ListenerId, ListenerRegistry, PushEvent, PushTransport,
};
pub use registry::{
    ChunkRef, RegistryConfig, StreamId, StreamRegistry, StreamSnapshot, StreamSummary,
};
pub use server::{Relay, RelayConfig};
pub use session::{StreamPhase, StreamSession};
pub use stats::{DispatchStats, StreamStats};
pub use store::{
    ChunkKey, ChunkStore, LocalChunkStore, MemoryChunkStore, StorageConfig, StoreError,
};
