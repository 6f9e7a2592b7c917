//! The four per-server cross-validation checks.
//!
//! Each check publishes its own gauges and reports failures through its
//! return value; none of them aborts another.

pub mod agencies;
pub mod expiration;
pub mod liveness;
pub mod vehicles;

pub use agencies::{AgencyComparison, check_agency_coverage};
pub use expiration::{ExpirationWindow, check_bundle_expiration};
pub use liveness::check_liveness;
pub use vehicles::{VehicleComparison, check_vehicle_count};

/// Match policy shared by the agency and vehicle comparisons: exact
/// equality, so two empty sides count as a match.
pub fn counts_match(expected: usize, actual: usize) -> bool {
    expected == actual
}
