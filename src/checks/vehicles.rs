use tracing::{debug, info, warn};

use crate::Result;
use crate::config::ServerConfig;
use crate::fetch::auth::ApiKey;
use crate::fetch::{BasicClient, HttpClient, fetch_bytes};
use crate::metrics::{WatchdogMetrics, flag};
use crate::parser::{count_vehicles, parse_feed};
use crate::services::TransitApi;

use super::counts_match;

/// Vehicle counts seen in the realtime feed and on the live API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleComparison {
    pub realtime_count: usize,
    pub api_count: usize,
    pub matched: bool,
}

/// Fetches the server's vehicle-position feed through `http`, sending the
/// configured auth header when there is one, and returns the number of
/// vehicle entities.
#[tracing::instrument(skip_all, fields(feed_url = %server.vehicle_position_url))]
pub async fn count_realtime_vehicles(
    server: &ServerConfig,
    http: &BasicClient,
) -> Result<usize> {
    let client: Box<dyn HttpClient> = match server.realtime_auth() {
        Some((header, value)) => Box::new(ApiKey::new(http.clone(), header, value)?),
        None => Box::new(http.clone()),
    };

    let bytes = fetch_bytes(client.as_ref(), &server.vehicle_position_url).await?;
    debug!(bytes = bytes.len(), "Feed bytes received, parsing");

    let feed = parse_feed(&bytes)?;
    Ok(count_vehicles(&feed))
}

/// Compares the realtime vehicle count with the vehicles-for-agency endpoint
/// and publishes both counts plus `vehicle_count_match`.
///
/// Any failure leaves `vehicle_count_match` at `0`.
pub async fn check_vehicle_count(
    server: &ServerConfig,
    http: &BasicClient,
    api: &dyn TransitApi,
    metrics: &WatchdogMetrics,
) -> Result<VehicleComparison> {
    let realtime = count_realtime_vehicles(server, http).await;
    let result = compare(server, realtime, api, metrics).await;
    if result.is_err() {
        metrics
            .vehicle_count_match
            .with_label_values(&[&server.agency_id, &server.id_label()])
            .set(0.0);
    }
    result
}

async fn compare(
    server: &ServerConfig,
    realtime: Result<usize>,
    api: &dyn TransitApi,
    metrics: &WatchdogMetrics,
) -> Result<VehicleComparison> {
    let id = server.id_label();

    let realtime_count = realtime?;
    metrics
        .realtime_vehicle_positions
        .with_label_values(&[&server.vehicle_position_url, &id])
        .set(realtime_count as f64);

    let api_count = api.vehicles_for_agency(&server.agency_id).await?;
    metrics
        .vehicle_count_api
        .with_label_values(&[&server.agency_id, &id])
        .set(api_count as f64);

    let matched = counts_match(realtime_count, api_count);
    metrics
        .vehicle_count_match
        .with_label_values(&[&server.agency_id, &id])
        .set(flag(matched));

    if matched {
        info!(vehicles = realtime_count, "Vehicle counts match");
    } else {
        warn!(realtime_count, api_count, "Vehicle counts differ");
    }

    Ok(VehicleComparison {
        realtime_count,
        api_count,
        matched,
    })
}
