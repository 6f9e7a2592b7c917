//! The reconciliation loop.
//!
//! On every tick the collector takes the current server list and runs the
//! four checks for each server. Servers are fanned out as separate tasks,
//! bounded by a semaphore, and all of them are joined before the tick ends.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info};

use crate::cache;
use crate::checks::{self, AgencyComparison, ExpirationWindow, VehicleComparison};
use crate::config::{ConfigSnapshot, ServerConfig};
use crate::fetch::BasicClient;
use crate::gtfs_static::StaticBundle;
use crate::infra::onebusaway::ObaClient;
use crate::metrics::WatchdogMetrics;
use crate::services::TransitApi;
use crate::{Result, WatchdogError};

/// Source of "now" for the expiration check.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Builds the live API client for a server.
pub type ApiFactory = Arc<dyn Fn(&ServerConfig) -> Arc<dyn TransitApi> + Send + Sync>;

/// Outcome of one server's checks in one tick. `None` means the check failed
/// (the failure has already been logged).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReport {
    pub server_id: i64,
    pub alive: bool,
    pub expiration: Option<ExpirationWindow>,
    pub agencies: Option<AgencyComparison>,
    pub vehicles: Option<VehicleComparison>,
}

/// Everything a per-server task needs, shared across spawned tasks.
#[derive(Clone)]
struct CheckContext {
    cache_dir: PathBuf,
    http: BasicClient,
    metrics: Arc<WatchdogMetrics>,
    clock: Clock,
    api_factory: ApiFactory,
}

pub struct Collector {
    snapshot: Arc<ConfigSnapshot>,
    ctx: Arc<CheckContext>,
    interval: Duration,
    max_concurrent: usize,
}

impl Collector {
    pub fn new(
        snapshot: Arc<ConfigSnapshot>,
        cache_dir: impl Into<PathBuf>,
        metrics: Arc<WatchdogMetrics>,
        interval: Duration,
    ) -> Self {
        // One pool for every server and tick; clones are handles to it.
        let http = BasicClient::new();
        let api_http = http.clone();
        Self {
            snapshot,
            ctx: Arc::new(CheckContext {
                cache_dir: cache_dir.into(),
                http,
                metrics,
                clock: Arc::new(Utc::now),
                api_factory: Arc::new(move |server: &ServerConfig| {
                    Arc::new(ObaClient::for_server(server, &api_http)) as Arc<dyn TransitApi>
                }),
            }),
            interval,
            max_concurrent: 4,
        }
    }

    /// Replaces the clock used by the expiration check.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.ctx_mut().clock = clock;
        self
    }

    /// Replaces how live API clients are built.
    pub fn with_api_factory(mut self, api_factory: ApiFactory) -> Self {
        self.ctx_mut().api_factory = api_factory;
        self
    }

    /// Caps how many servers are checked at the same time (minimum 1).
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    fn ctx_mut(&mut self) -> &mut CheckContext {
        Arc::make_mut(&mut self.ctx)
    }

    /// Runs until `shutdown` is cancelled. The first tick fires immediately.
    pub async fn run(self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            max_concurrent = self.max_concurrent,
            "Collector starting"
        );

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.collect_once().await;
                }
                _ = shutdown.cancelled() => {
                    info!("Collector received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Runs one tick: checks every server in the current snapshot and waits
    /// for all of them. Reports come back in snapshot order.
    pub async fn collect_once(&self) -> Vec<ServerReport> {
        let servers = self.snapshot.current();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        debug!(servers = servers.len(), "Starting collection tick");

        let mut tasks = Vec::with_capacity(servers.len());
        for server in servers.iter() {
            let ctx = Arc::clone(&self.ctx);
            let sem = Arc::clone(&semaphore);
            let server = server.clone();
            let span = tracing::info_span!(
                "check_server",
                server_id = server.id,
                server_name = %server.name,
            );

            tasks.push(tokio::spawn(
                async move {
                    let _permit = sem.acquire_owned().await.ok()?;
                    Some(ctx.check_server(&server).await)
                }
                .instrument(span),
            ));
        }

        let mut reports = Vec::with_capacity(tasks.len());
        for task in tasks {
            match task.await {
                Ok(Some(report)) => reports.push(report),
                Ok(None) => {}
                Err(e) => error!(error = %e, "Server check task failed"),
            }
        }

        info!(checked = reports.len(), "Collection tick complete");
        reports
    }
}

impl CheckContext {
    async fn check_server(&self, server: &ServerConfig) -> ServerReport {
        let api = (self.api_factory)(server);
        let metrics = self.metrics.as_ref();

        let alive = checks::check_liveness(server, api.as_ref(), metrics).await;

        let bundle = self.load_bundle(server.id).await;
        if let Err(e) = &bundle {
            error!(error = %e, "Failed to load cached GTFS bundle");
        }

        let expiration = match &bundle {
            Ok(bundle) => {
                checks::check_bundle_expiration(server, bundle, (self.clock)(), metrics)
                    .inspect_err(|e| error!(error = %e, "Failed to check GTFS bundle expiration"))
                    .ok()
            }
            Err(_) => None,
        };

        let agencies = match &bundle {
            Ok(bundle) => checks::check_agency_coverage(server, bundle, api.as_ref(), metrics)
                .await
                .inspect_err(|e| error!(error = %e, "Failed to check agencies with coverage match"))
                .ok(),
            Err(_) => {
                checks::agencies::record_unavailable(server, metrics);
                None
            }
        };

        let vehicles = checks::check_vehicle_count(server, &self.http, api.as_ref(), metrics)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to check vehicle count match"))
            .ok();

        ServerReport {
            server_id: server.id,
            alive,
            expiration,
            agencies,
            vehicles,
        }
    }

    /// Parses the freshest cached bundle for `server_id` off the async runtime.
    async fn load_bundle(&self, server_id: i64) -> Result<StaticBundle> {
        let dir = self.cache_dir.clone();
        tokio::task::spawn_blocking(move || {
            let path = cache::freshest(&dir, server_id)?;
            debug!(path = %path.display(), "Using cached bundle");
            StaticBundle::open(&path)
        })
        .await
        .map_err(|e| WatchdogError::Io(std::io::Error::other(e)))?
    }
}
