//! WWS Tree Viewer
//!
//! Polls a discussion tree document on a fixed interval and draws it as a
//! node-link diagram in the terminal.

pub mod config;
pub mod error;
pub mod file_server;
pub mod layout;
pub mod logging;
pub mod poller;
pub mod source;
pub mod view;

pub use config::{ViewerConfig, TREE_REFRESH_INTERVAL_MS};
pub use error::{ConfigError, FetchError};
pub use poller::{poll_once, PollPhase, Poller, PollerHandle, SharedTreeState, TreeState};
pub use source::{AnySource, FileSource, HttpSource, TreeSource, FETCH_TIMEOUT};
