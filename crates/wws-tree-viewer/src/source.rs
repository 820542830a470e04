//! Where the discussion tree document comes from.
//!
//! Every fetch re-reads the resource unconditionally: no caching, no
//! conditional requests.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use wws_discussion::SourceNode;

use crate::error::FetchError;

/// Upper bound on a single fetch. A fetch still pending after this long
/// counts as a failed tick and frees the poller for the next one.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A readable discussion tree document.
pub trait TreeSource: Send + Sync + 'static {
    /// Read and parse the current document.
    fn fetch(&self) -> impl Future<Output = Result<SourceNode, FetchError>> + Send;

    /// Human-readable location, for logs and the status bar.
    fn describe(&self) -> String;
}

/// Document on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TreeSource for FileSource {
    async fn fetch(&self) -> Result<SourceNode, FetchError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|source| FetchError::Io {
                path: self.path.clone(),
                source,
            })?;
        Ok(SourceNode::parse_document(&bytes)?)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Document served over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

impl TreeSource for HttpSource {
    async fn fetch(&self) -> Result<SourceNode, FetchError> {
        let resp = self.client.get(&self.url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status,
            });
        }
        let body = resp.bytes().await?;
        Ok(SourceNode::parse_document(&body)?)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

/// Source picked at runtime from a location string.
#[derive(Debug, Clone)]
pub enum AnySource {
    File(FileSource),
    Http(HttpSource),
}

impl AnySource {
    /// `http://` and `https://` locations use HTTP; anything else is a path.
    pub fn from_location(location: &str) -> Self {
        let trimmed = location.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            AnySource::Http(HttpSource::new(trimmed))
        } else {
            AnySource::File(FileSource::new(trimmed))
        }
    }
}

impl TreeSource for AnySource {
    async fn fetch(&self) -> Result<SourceNode, FetchError> {
        match self {
            AnySource::File(src) => src.fetch().await,
            AnySource::Http(src) => src.fetch().await,
        }
    }

    fn describe(&self) -> String {
        match self {
            AnySource::File(src) => src.describe(),
            AnySource::Http(src) => src.describe(),
        }
    }
}
