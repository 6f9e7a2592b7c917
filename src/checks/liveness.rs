use tracing::{debug, warn};

use crate::config::ServerConfig;
use crate::metrics::{WatchdogMetrics, flag};
use crate::services::TransitApi;

/// Pings the current-time endpoint and records `api_status`.
///
/// The gauge is always written: `1` only when the call succeeds and the
/// response carries a non-empty readable time, `0` for transport failures,
/// error statuses and malformed or empty payloads alike.
pub async fn check_liveness(
    server: &ServerConfig,
    api: &dyn TransitApi,
    metrics: &WatchdogMetrics,
) -> bool {
    let alive = match api.current_time().await {
        Ok(current) if current.is_readable() => {
            debug!(readable_time = ?current.readable_time, "Current time received");
            true
        }
        Ok(_) => {
            warn!("Current time response has no readable time");
            false
        }
        Err(e) => {
            warn!(error = %e, "Current time request failed");
            false
        }
    };

    metrics
        .api_status
        .with_label_values(&[&server.id_label(), &server.base_url])
        .set(flag(alive));

    alive
}
