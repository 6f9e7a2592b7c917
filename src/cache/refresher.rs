use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::BundleCache;
use crate::config::ConfigSnapshot;

/// Re-downloads every configured server's bundle on a fixed interval.
///
/// The server list is read from the snapshot on each tick, so servers added
/// by a config refresh are picked up without a restart.
pub struct BundleRefresher {
    cache: BundleCache,
    snapshot: Arc<ConfigSnapshot>,
    interval: Duration,
}

impl BundleRefresher {
    pub fn new(cache: BundleCache, snapshot: Arc<ConfigSnapshot>, interval: Duration) -> Self {
        Self {
            cache,
            snapshot,
            interval,
        }
    }

    /// Runs until `shutdown` is cancelled. The first refresh happens one full
    /// interval after start; startup is expected to have populated the cache.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            dir = %self.cache.dir().display(),
            interval_secs = self.interval.as_secs(),
            "Bundle refresher starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_once().await;
                }
                _ = shutdown.cancelled() => {
                    info!("Bundle refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Downloads the bundle of every server in the current snapshot.
    pub async fn refresh_once(&self) -> usize {
        let servers = self.snapshot.current();
        let stored = self.cache.store_all(&servers).await;
        info!(stored, total = servers.len(), "Bundle refresh complete");
        stored
    }
}
