//! Gauge registry published by the watchdog.
//!
//! One [`WatchdogMetrics`] is built at startup and shared by reference; there
//! are no process-global collectors.

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

/// Every gauge the checks publish, registered in a private [`Registry`].
pub struct WatchdogMetrics {
    registry: Registry,
    /// `1` when the live API answers with a readable time, else `0`.
    pub api_status: GaugeVec,
    pub bundle_earliest_expiration: GaugeVec,
    pub bundle_latest_expiration: GaugeVec,
    pub agencies_in_static_bundle: GaugeVec,
    pub agencies_in_coverage_endpoint: GaugeVec,
    pub agencies_match: GaugeVec,
    pub realtime_vehicle_positions: GaugeVec,
    pub vehicle_count_api: GaugeVec,
    pub vehicle_count_match: GaugeVec,
}

fn gauge(
    registry: &Registry,
    name: &str,
    help: &str,
    labels: &[&str],
) -> prometheus::Result<GaugeVec> {
    let vec = GaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(vec.clone()))?;
    Ok(vec)
}

impl WatchdogMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        Ok(Self {
            api_status: gauge(
                &registry,
                "api_status",
                "Status of the transit API server (0 = not working, 1 = working)",
                &["server_id", "server_url"],
            )?,
            bundle_earliest_expiration: gauge(
                &registry,
                "bundle_days_until_earliest_expiration",
                "Days until the earliest service end date in the static bundle",
                &["server_id"],
            )?,
            bundle_latest_expiration: gauge(
                &registry,
                "bundle_days_until_latest_expiration",
                "Days until the latest service end date in the static bundle",
                &["server_id"],
            )?,
            agencies_in_static_bundle: gauge(
                &registry,
                "agencies_in_static_bundle",
                "Number of agencies in the static bundle",
                &["server_id"],
            )?,
            agencies_in_coverage_endpoint: gauge(
                &registry,
                "agencies_in_coverage_endpoint",
                "Number of agencies reported by the agencies-with-coverage endpoint",
                &["server_id"],
            )?,
            agencies_match: gauge(
                &registry,
                "agencies_match",
                "Whether bundle and coverage agency counts match (1 = match, 0 = mismatch)",
                &["server_id"],
            )?,
            realtime_vehicle_positions: gauge(
                &registry,
                "realtime_vehicle_positions_count",
                "Number of vehicle positions in the realtime feed",
                &["feed_url", "server_id"],
            )?,
            vehicle_count_api: gauge(
                &registry,
                "vehicle_count_api",
                "Number of vehicles reported by the vehicles-for-agency endpoint",
                &["agency_id", "server_id"],
            )?,
            vehicle_count_match: gauge(
                &registry,
                "vehicle_count_match",
                "Whether realtime and API vehicle counts match (1 = match, 0 = mismatch)",
                &["agency_id", "server_id"],
            )?,
            registry,
        })
    }

    /// Get the Prometheus registry for exporting metrics
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Renders every registered gauge in the Prometheus text format.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Encodes a boolean check outcome as a gauge value.
pub fn flag(value: bool) -> f64 {
    if value { 1.0 } else { 0.0 }
}
