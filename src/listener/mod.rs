//! Listener membership and live delivery
//!
//! ```text
//!   StreamSession ──► Dispatcher ──► listeners_of(stream) ──► PushTransport::push
//!                         │
//!                         └── ListenerRegistry (stream <-> listener index)
//! ```

pub mod dispatch;
pub mod registry;
pub mod transport;

pub use dispatch::Dispatcher;
pub use registry::ListenerRegistry;
pub use transport::{ChannelTransport, ListenerId, PushError, PushEvent, PushTransport};
