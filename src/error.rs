//! Error taxonomy shared by every watchdog component.

/// Errors raised while loading configuration, fetching remote data or
/// running a check.
#[derive(thiserror::Error, Debug)]
pub enum WatchdogError {
    /// Malformed or unreachable configuration source, or an invalid
    /// source selection.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network failure or non-success HTTP status from a remote endpoint.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Malformed bundle archive, protobuf payload or JSON document.
    #[error("parse error: {0}")]
    Parse(String),

    /// A required dataset was present but empty.
    #[error("data error: {0}")]
    Data(String),

    /// No cached bundle available for a server.
    #[error("cache error: {0}")]
    Cache(String),

    /// Local filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for WatchdogError {
    fn from(e: serde_json::Error) -> Self {
        WatchdogError::Parse(format!("invalid JSON: {e}"))
    }
}

impl From<prost::DecodeError> for WatchdogError {
    fn from(e: prost::DecodeError) -> Self {
        WatchdogError::Parse(format!("invalid protobuf: {e}"))
    }
}

impl From<zip::result::ZipError> for WatchdogError {
    fn from(e: zip::result::ZipError) -> Self {
        WatchdogError::Parse(format!("invalid bundle archive: {e}"))
    }
}

impl From<csv::Error> for WatchdogError {
    fn from(e: csv::Error) -> Self {
        WatchdogError::Parse(format!("invalid bundle table: {e}"))
    }
}

/// Result type for watchdog operations.
pub type Result<T> = std::result::Result<T, WatchdogError>;
