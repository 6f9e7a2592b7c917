use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::gtfs_static::StaticBundle;
use crate::metrics::{WatchdogMetrics, flag};
use crate::services::TransitApi;
use crate::{Result, WatchdogError};

use super::counts_match;

/// Agency counts seen in the static bundle and on the live API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgencyComparison {
    pub static_count: usize,
    pub live_count: usize,
    pub matched: bool,
}

/// Compares the bundle's agency count with the agencies-with-coverage
/// endpoint and publishes both counts plus `agencies_match`.
///
/// Any failure leaves `agencies_match` at `0`; counts obtained before the
/// failure are still published.
pub async fn check_agency_coverage(
    server: &ServerConfig,
    bundle: &StaticBundle,
    api: &dyn TransitApi,
    metrics: &WatchdogMetrics,
) -> Result<AgencyComparison> {
    let result = compare(server, bundle, api, metrics).await;
    if result.is_err() {
        record_unavailable(server, metrics);
    }
    result
}

/// Marks the agency match as failed when no comparison could be made.
pub fn record_unavailable(server: &ServerConfig, metrics: &WatchdogMetrics) {
    metrics
        .agencies_match
        .with_label_values(&[&server.id_label()])
        .set(0.0);
}

async fn compare(
    server: &ServerConfig,
    bundle: &StaticBundle,
    api: &dyn TransitApi,
    metrics: &WatchdogMetrics,
) -> Result<AgencyComparison> {
    let id = server.id_label();

    let static_count = bundle.agency_count();
    if static_count == 0 {
        return Err(WatchdogError::Data(
            "no agencies found in GTFS bundle".to_string(),
        ));
    }
    metrics
        .agencies_in_static_bundle
        .with_label_values(&[&id])
        .set(static_count as f64);

    let live_count = api.agencies_with_coverage().await?;
    metrics
        .agencies_in_coverage_endpoint
        .with_label_values(&[&id])
        .set(live_count as f64);

    let matched = counts_match(static_count, live_count);
    metrics
        .agencies_match
        .with_label_values(&[&id])
        .set(flag(matched));

    if matched {
        info!(agencies = static_count, "Agency counts match");
    } else {
        warn!(static_count, live_count, "Agency counts differ");
    }

    Ok(AgencyComparison {
        static_count,
        live_count,
        matched,
    })
}
