//! Viewer configuration.
//!
//! Precedence: command-line flags, then the TOML config file, then the
//! compiled-in defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

/// Poll interval used when nothing else is configured.
pub const TREE_REFRESH_INTERVAL_MS: u64 = 2000;

/// Well-known relative location of the discussion tree document.
pub const DEFAULT_SOURCE: &str = "public/mock_tree.json";

/// On-disk config file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub source: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub log_file: Option<PathBuf>,
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub log_file: Option<PathBuf>,
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    /// File path or `http(s)://` URL of the tree document.
    pub source: String,
    pub poll_interval: Duration,
    /// Log destination while the TUI owns the terminal.
    pub log_file: PathBuf,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            poll_interval: Duration::from_millis(TREE_REFRESH_INTERVAL_MS),
            log_file: default_log_path(),
        }
    }
}

impl ViewerConfig {
    /// Load the config file (an explicit path must exist; the default one
    /// may be missing) and apply command-line overrides on top.
    pub fn load(explicit: Option<&Path>, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) => read_config_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_config_file(&path)?,
                _ => ConfigFile::default(),
            },
        };
        Self::resolve(file, overrides)
    }

    pub fn resolve(file: ConfigFile, overrides: ConfigOverrides) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let interval_ms = overrides
            .poll_interval_ms
            .or(file.poll_interval_ms)
            .unwrap_or(TREE_REFRESH_INTERVAL_MS);
        if interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_ms must be greater than zero".into(),
            ));
        }

        let source = overrides.source.or(file.source).unwrap_or(defaults.source);
        if source.trim().is_empty() {
            return Err(ConfigError::Invalid("source must not be empty".into()));
        }

        Ok(Self {
            source,
            poll_interval: Duration::from_millis(interval_ms),
            log_file: overrides.log_file.or(file.log_file).unwrap_or(defaults.log_file),
        })
    }
}

pub fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// `<config dir>/wws/tree-viewer.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("wws").join("tree-viewer.toml"))
}

/// `<cache dir>/wws/tree-viewer.log`, falling back to the temp dir.
pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("wws")
        .join("tree-viewer.log")
}
