//! Relay entry point
//!
//! Transport-facing API over the stream and listener registries.

pub mod config;
pub mod relay;

pub use config::RelayConfig;
pub use relay::Relay;
