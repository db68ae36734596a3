//! Stream registry
//!
//! The registry creates and looks up [`StreamSession`](crate::session::StreamSession)s.
//! Every session shares the registry's chunk store and dispatcher.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<StreamRegistry>
//!                     ┌─────────────────────────┐
//!                     │ streams: HashMap<Id,    │
//!                     │   Arc<StreamSession> {  │
//!                     │     buffer, chunks,     │
//!                     │     phase,              │
//!                     │   }                     │
//!                     │ >                       │
//!                     └───────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Producer]             [Dispatcher]             [ChunkStore]
//!    append() / end()       push_audio()             put() on rollover
//!                           push_chunk_ready()
//! ```
//!
//! # Zero-Copy Fan-out
//!
//! Appended audio is carried as `bytes::Bytes`, so the pushes of one frame to
//! every listener share a single allocation.

pub mod config;
pub mod store;
pub mod types;

pub use config::RegistryConfig;
pub use store::StreamRegistry;
pub use types::{ChunkRef, StreamId, StreamSnapshot, StreamSummary};
