// src/api/mod.rs
// HTTP control plane and WebSocket streaming plane, served by a single
// axum router (§6).

pub mod http;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/files", http::files::router())
        .nest("/project", http::project::router())
        .nest("/conversations", http::conversations::router())
        .nest("/memory", http::memory::router())
        .nest("/index", http::index::router())
        .nest("/prompt", http::prompt::router())
        .route("/ws/voice", get(ws::voice::handle_upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(std::time::Duration::from_secs(30)))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
