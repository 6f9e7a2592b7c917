//! Trait and types for the live transit API being monitored.

use async_trait::async_trait;

use crate::Result;

/// Payload of the current-time endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentTime {
    /// Human-readable server time; its presence marks a healthy response.
    pub readable_time: Option<String>,
    /// Server time in epoch milliseconds.
    pub time: Option<i64>,
}

impl CurrentTime {
    /// `true` when the readable time marker is present and non-empty.
    pub fn is_readable(&self) -> bool {
        self.readable_time.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Abstraction over a live transit API deployment.
#[async_trait]
pub trait TransitApi: Send + Sync {
    /// Fetches the server's current time.
    async fn current_time(&self) -> Result<CurrentTime>;

    /// Counts agencies the deployment currently serves.
    async fn agencies_with_coverage(&self) -> Result<usize>;

    /// Counts vehicles the deployment reports for `agency_id`.
    async fn vehicles_for_agency(&self, agency_id: &str) -> Result<usize>;
}
