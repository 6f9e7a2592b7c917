//! Copy-on-write server list shared between the refresher and its readers.

use arc_swap::ArcSwap;
use std::sync::Arc;

use super::server::ServerConfig;

/// The current server list behind an atomically swappable pointer.
///
/// Readers take a cheap `Arc` clone of the whole list and iterate it at
/// their own pace; a writer publishes a complete new list in one store.
/// Nobody ever observes a list that mixes two payloads.
pub struct ConfigSnapshot {
    servers: ArcSwap<Vec<ServerConfig>>,
}

impl ConfigSnapshot {
    pub fn new(servers: Vec<ServerConfig>) -> Self {
        Self {
            servers: ArcSwap::from_pointee(servers),
        }
    }

    /// Gets the current server list.
    pub fn current(&self) -> Arc<Vec<ServerConfig>> {
        self.servers.load_full()
    }

    /// Replaces the whole server list.
    pub fn replace(&self, servers: Vec<ServerConfig>) {
        self.servers.store(Arc::new(servers));
    }
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
