//! Statistics and metrics

pub mod metrics;

pub(crate) use metrics::DispatchCounters;
pub use metrics::{DispatchStats, StreamStats};
