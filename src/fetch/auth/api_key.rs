use crate::fetch::client::HttpClient;
use crate::{Result, WatchdogError};
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// Realtime feeds name their own header (e.g. `"x-api-key"`), so both the
/// header name and the value come from the server configuration.
pub struct ApiKey<C> {
    inner: C,
    header_name: HeaderName,
    key: HeaderValue,
}

impl<C> ApiKey<C> {
    /// Validates `header_name` and `key` up front so that every request
    /// can carry them without further checks.
    pub fn new(inner: C, header_name: &str, key: &str) -> Result<Self> {
        let header_name = HeaderName::from_bytes(header_name.as_bytes()).map_err(|e| {
            WatchdogError::Config(format!("invalid auth header name '{header_name}': {e}"))
        })?;
        let mut key = HeaderValue::from_str(key)
            .map_err(|e| WatchdogError::Config(format!("invalid auth header value: {e}")))?;
        key.set_sensitive(true);

        Ok(Self {
            inner,
            header_name,
            key,
        })
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        req.headers_mut()
            .insert(self.header_name.clone(), self.key.clone());
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;

    #[test]
    fn test_rejects_invalid_header_name() {
        let result = ApiKey::new(BasicClient::new(), "bad header", "value");
        assert!(matches!(result, Err(WatchdogError::Config(_))));
    }

    #[test]
    fn test_rejects_control_characters_in_value() {
        let result = ApiKey::new(BasicClient::new(), "x-api-key", "line\nbreak");
        assert!(matches!(result, Err(WatchdogError::Config(_))));
    }

    #[test]
    fn test_accepts_custom_header() {
        assert!(ApiKey::new(BasicClient::new(), "x-api-key", "secret").is_ok());
    }
}
