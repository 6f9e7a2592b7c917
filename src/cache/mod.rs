//! On-disk store of downloaded static schedule bundles.
//!
//! Every bundle lands at `<dir>/server_<id>_<sha1(url)>.zip`, so a repeated
//! download for the same server and URL overwrites its previous copy while
//! different servers or URLs never share a file.

mod refresher;

pub use refresher::BundleRefresher;

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use sha1::{Digest, Sha1};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::fetch::{self, BasicClient};
use crate::{Result, WatchdogError};

/// Hex-encoded SHA-1 of a bundle URL.
pub fn url_hash(url: &str) -> String {
    hex::encode(Sha1::digest(url.as_bytes()))
}

/// Name shared by every cached file belonging to `server_id`.
pub fn server_prefix(server_id: i64) -> String {
    format!("server_{server_id}_")
}

/// Deterministic cache file name for a (server, URL) pair.
pub fn bundle_file_name(server_id: i64, url: &str) -> String {
    format!("{}{}.zip", server_prefix(server_id), url_hash(url))
}

/// Creates `dir` if needed. An existing non-directory at that path is an error.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(WatchdogError::Cache(format!(
            "{} is not a directory",
            dir.display()
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            std::fs::create_dir_all(dir)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Returns the most recently modified cached bundle for `server_id`.
///
/// # Errors
///
/// [`WatchdogError::Cache`] when no file in `dir` carries the server's prefix.
pub fn freshest(dir: &Path, server_id: i64) -> Result<PathBuf> {
    let prefix = server_prefix(server_id);
    let mut best: Option<(SystemTime, PathBuf)> = None;

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(&prefix) {
            continue;
        }

        let modified = entry.metadata()?.modified()?;
        if best.as_ref().is_none_or(|(t, _)| modified > *t) {
            best = Some((modified, entry.path()));
        }
    }

    best.map(|(_, path)| path).ok_or_else(|| {
        WatchdogError::Cache(format!("no cached files found for server {server_id}"))
    })
}

/// Downloads bundles into a directory and looks them up again.
#[derive(Clone)]
pub struct BundleCache {
    dir: PathBuf,
    client: BasicClient,
}

impl BundleCache {
    /// Bundles can be large, so downloads only time out when the transfer
    /// stalls, never because the whole file takes long.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_client(dir, BasicClient::for_downloads())
    }

    pub fn with_client(dir: impl Into<PathBuf>, client: BasicClient) -> Self {
        Self {
            dir: dir.into(),
            client,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Downloads `url` into the cache slot for `server_id` and returns its path.
    ///
    /// The body is streamed into a hidden temporary file and renamed over the
    /// final name only once complete, so a concurrent [`freshest`] lookup
    /// never picks up a partial download.
    #[tracing::instrument(skip(self), fields(dir = %self.dir.display()))]
    pub async fn store(&self, url: &str, server_id: i64) -> Result<PathBuf> {
        let file_name = bundle_file_name(server_id, url);
        let final_path = self.dir.join(&file_name);
        let part_path = self.dir.join(format!(".{file_name}.part"));

        let mut response = fetch::get(&self.client, fetch::parse_url(url)?)
            .await?
            .error_for_status()?;

        let mut file = tokio::fs::File::create(&part_path).await?;
        let written = async {
            let mut bytes = 0usize;
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                bytes += chunk.len();
            }
            file.flush().await?;
            Ok::<_, WatchdogError>(bytes)
        }
        .await;

        let bytes = match written {
            Ok(bytes) => bytes,
            Err(e) => {
                drop(file);
                let _ = tokio::fs::remove_file(&part_path).await;
                return Err(e);
            }
        };
        drop(file);

        tokio::fs::rename(&part_path, &final_path).await?;
        debug!(bytes, path = %final_path.display(), "Bundle written");

        Ok(final_path)
    }

    /// Most recently modified bundle for `server_id`.
    pub fn freshest(&self, server_id: i64) -> Result<PathBuf> {
        freshest(&self.dir, server_id)
    }

    /// Downloads every server's bundle, logging failures without stopping.
    /// Returns how many downloads succeeded.
    pub async fn store_all(&self, servers: &[ServerConfig]) -> usize {
        let mut stored = 0;
        for server in servers {
            match self.store(&server.gtfs_url, server.id).await {
                Ok(path) => {
                    stored += 1;
                    info!(
                        server_id = server.id,
                        path = %path.display(),
                        "Successfully downloaded GTFS bundle"
                    );
                }
                Err(e) => {
                    error!(server_id = server.id, error = %e, "Failed to download GTFS bundle");
                }
            }
        }
        stored
    }
}
