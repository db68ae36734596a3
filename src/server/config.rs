//! Relay configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::registry::RegistryConfig;
use crate::store::StorageConfig;

/// Relay configuration options
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    /// Stream registry and session settings
    pub registry: RegistryConfig,

    /// Chunk store backend
    pub storage: StorageConfig,
}

impl RelayConfig {
    /// Set the rollover threshold
    pub fn rollover_threshold(mut self, threshold: Duration) -> Self {
        self.registry = self.registry.rollover_threshold(threshold);
        self
    }

    /// Persist chunks under a local directory
    pub fn local_storage(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage = StorageConfig::local(root);
        self
    }

    /// Keep chunks in memory
    pub fn memory_storage(mut self) -> Self {
        self.storage = StorageConfig::Memory;
        self
    }
}
