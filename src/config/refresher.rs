use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::snapshot::ConfigSnapshot;
use super::source::ConfigSource;

/// Periodically reloads the server list and publishes it to a
/// [`ConfigSnapshot`]. A failed reload keeps the previous list.
pub struct ConfigRefresher {
    source: ConfigSource,
    snapshot: Arc<ConfigSnapshot>,
    interval: Duration,
}

impl ConfigRefresher {
    pub fn new(source: ConfigSource, snapshot: Arc<ConfigSnapshot>, interval: Duration) -> Self {
        Self {
            source,
            snapshot,
            interval,
        }
    }

    /// Runs until `shutdown` is cancelled. The first reload happens one
    /// full interval after start.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            source = %self.source.describe(),
            interval_secs = self.interval.as_secs(),
            "Config refresher starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh_once().await;
                }
                _ = shutdown.cancelled() => {
                    info!("Config refresher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Performs a single reload. Returns whether the snapshot was replaced.
    pub async fn refresh_once(&self) -> bool {
        match self.source.load().await {
            Ok(servers) => {
                if servers.is_empty() {
                    warn!("Refreshed configuration contains no servers");
                }
                let count = servers.len();
                self.snapshot.replace(servers);
                info!(servers = count, "Successfully refreshed server configuration");
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to refresh configuration, keeping previous servers");
                false
            }
        }
    }
}
