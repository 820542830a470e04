//! Error types for the tree viewer.

use std::path::PathBuf;

use thiserror::Error;

/// A failed poll tick. Every variant is handled the same way: logged and
/// otherwise ignored until the next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed tree document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no response from {source_desc} within {after:?}")]
    Timeout {
        source_desc: String,
        after: std::time::Duration,
    },
}

/// Errors raised while assembling the viewer configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
