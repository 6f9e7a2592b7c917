use serde::{Deserialize, Serialize};

/// One monitored deployment: the live API plus the static and realtime
/// feeds it is expected to agree with.
///
/// Deserialized from the config wire format:
/// ```json
/// [{
///   "name": "Puget Sound", "id": 1,
///   "oba_base_url": "https://api.example.com", "oba_api_key": "key",
///   "gtfs_url": "https://example.com/gtfs.zip",
///   "trip_update_url": "https://example.com/trips.pb",
///   "vehicle_position_url": "https://example.com/vehicles.pb",
///   "gtfs_rt_api_key": "x-api-key", "gtfs_rt_api_value": "secret",
///   "agency_id": "1"
/// }]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub id: i64,
    #[serde(rename = "oba_base_url")]
    pub base_url: String,
    #[serde(rename = "oba_api_key")]
    pub api_key: String,
    pub gtfs_url: String,
    pub trip_update_url: String,
    pub vehicle_position_url: String,
    /// Header name sent with realtime feed requests.
    #[serde(rename = "gtfs_rt_api_key")]
    pub realtime_auth_header: String,
    /// Header value sent with realtime feed requests.
    #[serde(rename = "gtfs_rt_api_value")]
    pub realtime_auth_value: String,
    pub agency_id: String,
}

impl ServerConfig {
    /// Label value used for `server_id` on every published gauge.
    pub fn id_label(&self) -> String {
        self.id.to_string()
    }

    /// Returns the realtime auth header pair when both halves are set.
    pub fn realtime_auth(&self) -> Option<(&str, &str)> {
        if self.realtime_auth_header.is_empty() || self.realtime_auth_value.is_empty() {
            None
        } else {
            Some((&self.realtime_auth_header, &self.realtime_auth_value))
        }
    }
}

/// Decodes a JSON array of server objects.
pub fn parse_servers(bytes: &[u8]) -> crate::Result<Vec<ServerConfig>> {
    serde_json::from_slice(bytes)
        .map_err(|e| crate::WatchdogError::Config(format!("failed to decode server list: {e}")))
}
