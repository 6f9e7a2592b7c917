use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::ServerConfig;
use crate::fetch::auth::UrlParam;
use crate::fetch::{self, BasicClient};
use crate::services::transit_api::{CurrentTime, TransitApi};
use crate::{Result, WatchdogError};

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct EntryData<T> {
    entry: Option<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentTimeEntry {
    readable_time: Option<String>,
    time: Option<i64>,
}

#[derive(Deserialize)]
struct ListData {
    #[serde(default)]
    list: Vec<serde_json::Value>,
}

/// REST client for a OneBusAway deployment.
///
/// Every call goes to `<base>/api/where/...` with the API key appended as
/// the `key` query parameter.
pub struct ObaClient {
    base_url: String,
    http: UrlParam<BasicClient>,
}

impl ObaClient {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self::with_client(BasicClient::new(), base_url, api_key)
    }

    /// Reuses `http`'s connection pool instead of opening a new one.
    pub fn with_client(http: BasicClient, base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            http: UrlParam::new(http, "key", api_key),
        }
    }

    pub fn for_server(server: &ServerConfig, http: &BasicClient) -> Self {
        Self::with_client(http.clone(), &server.base_url, &server.api_key)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = fetch::parse_url(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| {
                WatchdogError::Config(format!("invalid API base URL '{}'", self.base_url))
            })?
            .pop_if_empty()
            .extend(["api", "where"])
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let url = self.endpoint(segments)?;
        debug!(path = url.path(), "Calling transit API");

        let resp = fetch::get(&self.http, url).await?.error_for_status()?;
        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl TransitApi for ObaClient {
    async fn current_time(&self) -> Result<CurrentTime> {
        let envelope: Envelope<EntryData<CurrentTimeEntry>> =
            self.get_json(&["current-time.json"]).await?;

        let entry = envelope.data.and_then(|d| d.entry);
        Ok(CurrentTime {
            readable_time: entry.as_ref().and_then(|e| e.readable_time.clone()),
            time: entry.and_then(|e| e.time),
        })
    }

    async fn agencies_with_coverage(&self) -> Result<usize> {
        let envelope: Envelope<ListData> =
            self.get_json(&["agencies-with-coverage.json"]).await?;
        Ok(envelope.data.map_or(0, |d| d.list.len()))
    }

    async fn vehicles_for_agency(&self, agency_id: &str) -> Result<usize> {
        let file = format!("{agency_id}.json");
        let envelope: Envelope<ListData> =
            self.get_json(&["vehicles-for-agency", &file]).await?;
        Ok(envelope.data.map_or(0, |d| d.list.len()))
    }
}
