use super::client::HttpClient;
use async_trait::async_trait;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const DOWNLOAD_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Plain `reqwest` client with the watchdog's timeouts.
///
/// Clones share one connection pool.
#[derive(Clone)]
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    /// Client for API calls and small payloads: the whole exchange, body
    /// included, must finish within the request timeout.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self(client)
    }

    /// Client for large streamed downloads with no overall deadline.
    pub fn for_downloads() -> Self {
        Self::with_idle_timeout(DOWNLOAD_IDLE_TIMEOUT)
    }

    /// Fails a transfer only when no bytes arrive for `idle`, however long
    /// the transfer takes as a whole.
    pub fn with_idle_timeout(idle: Duration) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(idle)
            .build()
            .unwrap_or_default();
        Self(client)
    }
}

impl Default for BasicClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
