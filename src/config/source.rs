use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use super::server::{ServerConfig, parse_servers};
use crate::{Result, WatchdogError};

/// HTTP Basic credentials for a remote config source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl BasicAuth {
    /// Returns credentials only when both halves are non-empty.
    pub fn from_parts(user: Option<String>, password: Option<String>) -> Option<Self> {
        match (user, password) {
            (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
                Some(Self { user, password })
            }
            _ => None,
        }
    }
}

/// Where the server list comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Url {
        url: String,
        auth: Option<BasicAuth>,
    },
}

impl ConfigSource {
    /// Resolves the startup selection. Exactly one of `file` or `url` must be
    /// given, and no stray positional arguments may accompany it.
    pub fn select(
        file: Option<PathBuf>,
        url: Option<String>,
        extra_args: &[String],
        auth: Option<BasicAuth>,
    ) -> Result<Self> {
        let file = file.filter(|f| !f.as_os_str().is_empty());
        let url = url.filter(|u| !u.is_empty());

        match (file, url) {
            (Some(_), Some(_)) => Err(WatchdogError::Config(
                "only one of --config-file or --config-url can be specified".to_string(),
            )),
            (Some(_), None) | (None, Some(_)) if !extra_args.is_empty() => {
                Err(WatchdogError::Config(format!(
                    "unexpected arguments alongside a config source: {}",
                    extra_args.join(" ")
                )))
            }
            (Some(path), None) => Ok(ConfigSource::File(path)),
            (None, Some(url)) => Ok(ConfigSource::Url { url, auth }),
            (None, None) => Err(WatchdogError::Config(
                "no configuration provided, use --config-file or --config-url".to_string(),
            )),
        }
    }

    /// Reads and decodes the server list. An empty list is returned as-is.
    pub async fn load(&self) -> Result<Vec<ServerConfig>> {
        match self {
            ConfigSource::File(path) => {
                let data = tokio::fs::read(path).await.map_err(|e| {
                    WatchdogError::Config(format!(
                        "failed to read config file {}: {e}",
                        path.display()
                    ))
                })?;
                parse_servers(&data)
            }
            ConfigSource::Url { url, auth } => load_from_url(url, auth.as_ref()).await,
        }
    }

    /// Startup variant of [`load`](Self::load): zero servers is an error.
    pub async fn load_required(&self) -> Result<Vec<ServerConfig>> {
        let servers = self.load().await?;
        if servers.is_empty() {
            return Err(WatchdogError::Config(
                "no servers found in configuration".to_string(),
            ));
        }
        Ok(servers)
    }

    /// Short human-readable description for logs.
    pub fn describe(&self) -> String {
        match self {
            ConfigSource::File(path) => format!("file:{}", path.display()),
            ConfigSource::Url { url, .. } => url.clone(),
        }
    }
}

#[tracing::instrument(skip(auth), fields(authenticated = auth.is_some()))]
async fn load_from_url(url: &str, auth: Option<&BasicAuth>) -> Result<Vec<ServerConfig>> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()?;

    let mut request = client.get(url);
    if let Some(auth) = auth {
        request = request.basic_auth(&auth.user, Some(&auth.password));
    }

    let response = request
        .send()
        .await
        .map_err(|e| WatchdogError::Config(format!("failed to fetch remote config: {e}")))?;

    if response.status() != reqwest::StatusCode::OK {
        return Err(WatchdogError::Config(format!(
            "remote config returned status: {}",
            response.status().as_u16()
        )));
    }

    let data = response
        .bytes()
        .await
        .map_err(|e| WatchdogError::Config(format!("failed to read remote config: {e}")))?;
    debug!(bytes = data.len(), "Remote config received");

    parse_servers(&data)
}
