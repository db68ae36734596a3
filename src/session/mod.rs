//! Stream session management
//!
//! Each stream has exactly one [`StreamSession`], which owns its open
//! buffer, rollover policy, persisted chunk list and `Live`/`Ended` phase.

mod state;
pub mod stream;

pub use state::StreamPhase;
pub use stream::StreamSession;
