//! HTTP fetching over a small composable client stack.
//!
//! [`BasicClient`] does the actual I/O; the wrappers in [`auth`] decorate
//! outgoing requests with credentials before delegating to it.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use bytes::Bytes;

use crate::{Result, WatchdogError};

/// Parses `url` for use as a request target.
pub fn parse_url(url: &str) -> Result<reqwest::Url> {
    url.parse()
        .map_err(|e| WatchdogError::Config(format!("invalid URL '{url}': {e}")))
}

/// Issues a GET for `url` and returns the raw response, whatever its status.
pub async fn get<C: HttpClient + ?Sized>(
    client: &C,
    url: reqwest::Url,
) -> Result<reqwest::Response> {
    let req = reqwest::Request::new(reqwest::Method::GET, url);
    Ok(client.execute(req).await?)
}

/// Fetches `url` and returns the body. Non-success statuses are errors.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes> {
    let resp = get(client, parse_url(url)?).await?.error_for_status()?;
    Ok(resp.bytes().await?)
}
