//! `wws-tree-viewer` binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::sync::RwLock;

use wws_tree_viewer::config::{ConfigOverrides, ViewerConfig};
use wws_tree_viewer::file_server::{FileServer, DEFAULT_BIND_ADDR};
use wws_tree_viewer::poller::{poll_once, PollOutcome, TreeState};
use wws_tree_viewer::source::{AnySource, TreeSource};
use wws_tree_viewer::{logging, view};

/// Auto-refreshing viewer for swarm discussion trees.
#[derive(Debug, Parser)]
#[command(name = "wws-tree-viewer", version, about)]
struct Cli {
    /// Config file (default: <config dir>/wws/tree-viewer.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tree document: file path or http(s) URL
    #[arg(long, global = true)]
    source: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    /// Log file used while the TUI is running
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Draw the tree in the terminal, refreshing on every poll tick (default)
    View,
    /// Fetch once and print the render forest as JSON
    Dump,
    /// Serve a directory so the tree document is reachable over HTTP
    Serve {
        #[arg(long, default_value = "public")]
        dir: PathBuf,
        #[arg(long, default_value = DEFAULT_BIND_ADDR)]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();
    let overrides = ConfigOverrides {
        source: cli.source,
        poll_interval_ms: cli.interval_ms,
        log_file: cli.log_file,
    };
    let config = ViewerConfig::load(cli.config.as_deref(), overrides)?;

    match cli.command.unwrap_or(Command::View) {
        Command::View => {
            logging::init_file(&config.log_file)?;
            let source = AnySource::from_location(&config.source);
            tracing::info!(source = %source.describe(), "launching tree viewer");
            view::run_tree_view(source, &config).await
        }
        Command::Dump => {
            logging::init_stderr();
            let source = AnySource::from_location(&config.source);
            let state = Arc::new(RwLock::new(TreeState::default()));
            match poll_once(&source, &state).await {
                PollOutcome::Refreshed => {
                    let st = state.read().await;
                    let forest = st.forest.clone().unwrap_or_default();
                    println!("{}", serde_json::to_string_pretty(&forest)?);
                    Ok(())
                }
                outcome => Err(anyhow::anyhow!(
                    "could not load discussion tree from {} ({:?})",
                    source.describe(),
                    outcome
                )),
            }
        }
        Command::Serve { dir, bind } => {
            logging::init_stderr();
            FileServer::new(bind, dir).run().await
        }
    }
}
