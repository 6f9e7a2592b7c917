use crate::fetch::client::HttpClient;
use async_trait::async_trait;

/// Appends a credential to every request's query string.
///
/// OneBusAway deployments authenticate with `?key=<api key>`.
pub struct UrlParam<C> {
    inner: C,
    param_name: String,
    value: String,
}

impl<C> UrlParam<C> {
    pub fn new(inner: C, param_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            inner,
            param_name: param_name.into(),
            value: value.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for UrlParam<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        // An empty key is still sent; the server decides whether it is valid.
        req.url_mut()
            .query_pairs_mut()
            .append_pair(&self.param_name, &self.value);
        self.inner.execute(req).await
    }
}
