//! HTTP server that hosts the discussion tree document for development.
//!
//! Serves a directory as-is, so `<dir>/mock_tree.json` is reachable at
//! `/mock_tree.json` for the HTTP tree source.

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9371";

pub struct FileServer {
    bind_addr: String,
    root: PathBuf,
}

impl FileServer {
    pub fn new(bind_addr: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            root: root.into(),
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/api/health", get(api_health))
            .fallback_service(ServeDir::new(&self.root))
    }

    /// Bind and serve until the process exits.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let listener = TcpListener::bind(&self.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        let addr: SocketAddr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            root = %self.root.display(),
            "discussion tree file server listening"
        );
        axum::serve(listener, self.router()).await?;
        Ok(())
    }
}

async fn api_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
