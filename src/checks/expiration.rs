use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use crate::config::ServerConfig;
use crate::gtfs_static::StaticBundle;
use crate::metrics::WatchdogMetrics;
use crate::{Result, WatchdogError};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Days remaining until the earliest and latest service end dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpirationWindow {
    pub earliest_days: i64,
    pub latest_days: i64,
}

/// Whole days from `now` until midnight UTC of `end_date`, rounded down.
/// Negative once the date has passed.
pub fn days_until(end_date: NaiveDate, now: DateTime<Utc>) -> i64 {
    let end = end_date.and_time(chrono::NaiveTime::MIN).and_utc();
    let delta = end - now;
    // num_seconds truncates toward zero; a negative fraction must round down
    let secs = if delta.subsec_nanos() < 0 {
        delta.num_seconds() - 1
    } else {
        delta.num_seconds()
    };
    secs.div_euclid(SECONDS_PER_DAY)
}

/// Computes the expiration window of `bundle` relative to `now`.
///
/// Service end dates stand in for the feed's expiry; a dedicated feed
/// metadata expiry is not consulted.
///
/// # Errors
///
/// [`WatchdogError::Data`] when the bundle has no service calendar entries.
pub fn expiration_window(bundle: &StaticBundle, now: DateTime<Utc>) -> Result<ExpirationWindow> {
    let (earliest, latest) = bundle
        .end_date_range()
        .ok_or_else(|| WatchdogError::Data("no services found in GTFS bundle".to_string()))?;

    Ok(ExpirationWindow {
        earliest_days: days_until(earliest, now),
        latest_days: days_until(latest, now),
    })
}

/// Publishes both expiration offsets for `server`.
pub fn check_bundle_expiration(
    server: &ServerConfig,
    bundle: &StaticBundle,
    now: DateTime<Utc>,
    metrics: &WatchdogMetrics,
) -> Result<ExpirationWindow> {
    let window = expiration_window(bundle, now)?;
    let id = server.id_label();

    metrics
        .bundle_earliest_expiration
        .with_label_values(&[&id])
        .set(window.earliest_days as f64);
    metrics
        .bundle_latest_expiration
        .with_label_values(&[&id])
        .set(window.latest_days as f64);

    info!(
        earliest_days = window.earliest_days,
        latest_days = window.latest_days,
        "Bundle expiration checked"
    );
    Ok(window)
}
