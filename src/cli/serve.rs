// src/cli/serve.rs
// `crace serve` - builds AppState and runs the axum HTTP/WebSocket
// server until interrupted.

use anyhow::Result;
use tracing::info;

use crace::api;
use crace::config::Settings;
use crace::state::AppState;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8787";

pub async fn run_serve(settings: Settings) -> Result<()> {
    let state = AppState::build(settings).await?;
    let app = api::router(state.clone());

    let listener = tokio::net::TcpListener::bind(DEFAULT_BIND_ADDR).await?;
    info!(addr = DEFAULT_BIND_ADDR, "crace listening");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    state.persist_embedding_snapshots().await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
