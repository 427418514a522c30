//! HTTP server wiring for the front door.

use crate::handlers::{self, AppState};
use anyhow::Result;
use arcana_core::{JobStore, RpcClient};
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

/// Build the router and start serving on `host:port`.
///
/// Returns the bound address once the listener is up; the accept loop runs
/// in a spawned task. Pass port 0 to let the OS pick.
pub async fn start_server(
    rpc: RpcClient,
    card_scan_dir: Option<PathBuf>,
    host: &str,
    port: u16,
) -> Result<SocketAddr> {
    let state = Arc::new(AppState {
        jobs: JobStore::with_default_retention(),
        rpc,
    });

    // The front door sits on a LAN and serves a static page from anywhere,
    // so CORS is wide open.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut app = Router::new()
        .route("/health", get(handlers::handle_health))
        .route("/api/submit", post(handlers::handle_submit))
        .route("/api/job/:id", get(handlers::handle_job))
        .with_state(state)
        .layer(cors);

    if let Some(dir) = card_scan_dir {
        info!("Serving card scans from {}", dir.display());
        app = app.nest_service("/card-scan", ServeDir::new(dir));
    }

    let listener = TcpListener::bind(format!("{}:{}", host, port)).await?;
    let addr = listener.local_addr()?;
    info!("HTTP server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    Ok(addr)
}
