//! Registry configuration

use std::time::Duration;

/// Default time a buffer may stay open before it is rolled over into a chunk
pub const DEFAULT_ROLLOVER_THRESHOLD: Duration = Duration::from_secs(5);

/// Configuration for the stream registry and the sessions it creates
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Wall-clock age after which an open buffer is flushed on the next append
    pub rollover_threshold: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            rollover_threshold: DEFAULT_ROLLOVER_THRESHOLD,
        }
    }
}

impl RegistryConfig {
    /// Set the rollover threshold
    pub fn rollover_threshold(mut self, threshold: Duration) -> Self {
        self.rollover_threshold = threshold;
        self
    }
}
