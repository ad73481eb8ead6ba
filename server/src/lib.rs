//! HTTP + SSE server exposing expert chat, MoE, and SmartRouter
//! orchestration.
//!
//! **Public API**: [`run_server`], [`run_server_on_listener`].

mod app;
mod error;
mod handlers;
mod session;

use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use maestro_orchestrator::{ExpertsConfig, Orchestrator};

pub use app::router;

const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:8080";

fn config_path() -> PathBuf {
    std::env::var("MAESTRO_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("./maestro.toml"))
}

fn data_root() -> PathBuf {
    std::env::var("MAESTRO_DATA_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Loads the structural config document and builds the orchestrator handle
/// the router is built against.
pub fn build_orchestrator() -> Result<Arc<Orchestrator>, Box<dyn std::error::Error + Send + Sync>> {
    let path = config_path();
    let config = if path.exists() {
        ExpertsConfig::load_from_path(&path)?
    } else {
        tracing::warn!("no config document at {}; starting with zero experts", path.display());
        ExpertsConfig::default()
    };
    Ok(Arc::new(Orchestrator::new(config, data_root())))
}

/// Runs the HTTP server on an existing listener, used by tests (bind to
/// `127.0.0.1:0` and pass the listener in directly).
pub async fn run_server_on_listener(
    listener: TcpListener,
    orchestrator: Arc<Orchestrator>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = listener.local_addr()?;
    info!("maestro-server listening on http://{}", addr);
    let app = router(orchestrator);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Runs the HTTP server, loading config/env the way the `maestro-server`
/// binary does. Listens on `addr` (default `127.0.0.1:8080`).
pub async fn run_server(addr: Option<&str>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = addr.unwrap_or(DEFAULT_HTTP_ADDR);
    let listener = TcpListener::bind(addr).await?;
    let orchestrator = build_orchestrator()?;
    run_server_on_listener(listener, orchestrator).await
}
