// src/api/http/files.rs
// `files/register|unregister|register-batch|list|get|search|stats|clear`
// - File Registry CRUD (§6).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::Envelope;
use crate::error::{CraceError, Result};
use crate::indexer::Language;
use crate::registry::RegisteredFile;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/unregister", post(unregister))
        .route("/register-batch", post(register_batch))
        .route("/list", get(list))
        .route("/get", get(get_file))
        .route("/search", get(search))
        .route("/stats", get(stats))
        .route("/clear", post(clear))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub filename: String,
    pub path: String,
    pub content: String,
    pub language: Option<Language>,
}

async fn register(State(state): State<Arc<AppState>>, Json(req): Json<RegisterRequest>) -> Result<Json<Envelope<RegisteredFile>>> {
    if req.path.trim().is_empty() {
        return Err(CraceError::BadRequest("path must not be empty".to_string()));
    }
    let language = req.language.or_else(|| Language::from_path(&req.path));
    let file = state.file_registry.register(&req.filename, &req.path, req.content, language).await;
    Ok(Json(Envelope::ok(file)))
}

#[derive(Deserialize)]
pub struct RegisterBatchRequest {
    pub files: Vec<RegisterRequest>,
}

async fn register_batch(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterBatchRequest>,
) -> Result<Json<Envelope<Vec<RegisteredFile>>>> {
    let mut out = Vec::with_capacity(req.files.len());
    for file in req.files {
        let language = file.language.or_else(|| Language::from_path(&file.path));
        out.push(state.file_registry.register(&file.filename, &file.path, file.content, language).await);
    }
    Ok(Json(Envelope::ok(out)))
}

#[derive(Deserialize)]
pub struct PathQuery {
    pub path: String,
}

async fn unregister(State(state): State<Arc<AppState>>, Json(req): Json<PathQuery>) -> Result<Json<Envelope<bool>>> {
    let removed = state.file_registry.unregister(&req.path).await;
    Ok(Json(Envelope::ok(removed)))
}

async fn list(State(state): State<Arc<AppState>>) -> Json<Envelope<Vec<RegisteredFile>>> {
    Json(Envelope::ok(state.file_registry.list().await))
}

async fn get_file(State(state): State<Arc<AppState>>, Query(q): Query<PathQuery>) -> Result<Json<Envelope<RegisteredFile>>> {
    match state.file_registry.get_by_path(&q.path).await {
        Some(file) => Ok(Json(Envelope::ok(file))),
        None => Err(CraceError::NotFound(format!("file '{}' not registered", q.path))),
    }
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

async fn search(State(state): State<Arc<AppState>>, Query(q): Query<SearchQuery>) -> Json<Envelope<Vec<RegisteredFile>>> {
    Json(Envelope::ok(state.file_registry.search_by_filename(&q.q).await))
}

#[derive(Serialize)]
pub struct RegistryStats {
    pub file_count: usize,
    pub total_bytes: usize,
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<Envelope<RegistryStats>> {
    let (file_count, total_bytes) = state.file_registry.stats().await;
    Json(Envelope::ok(RegistryStats { file_count, total_bytes }))
}

async fn clear(State(state): State<Arc<AppState>>) -> Json<Envelope<()>> {
    state.file_registry.clear().await;
    Json(Envelope::ok(()))
}
