// src/api/http/memory.rs
// `memory/add|list|search|delete|stats` - long-term UserMemory
// operations (§6).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::Envelope;
use crate::error::Result;
use crate::memory::{DEFAULT_MEMORY_LIMIT, UserMemory};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/add", post(add))
        .route("/list", get(list))
        .route("/search", get(search))
        .route("/delete/{id}", post(delete))
        .route("/stats", get(stats))
}

#[derive(Deserialize)]
pub struct AddMemoryRequest {
    pub content: String,
    pub category: Option<String>,
    pub importance: Option<f32>,
}

async fn add(State(state): State<Arc<AppState>>, Json(req): Json<AddMemoryRequest>) -> Result<Json<Envelope<UserMemory>>> {
    let memory = state.memory.add_memory(req.content, req.category, req.importance).await?;
    Ok(Json(Envelope::ok(memory)))
}

async fn list(State(state): State<Arc<AppState>>) -> Json<Envelope<Vec<UserMemory>>> {
    Json(Envelope::ok(state.memory.list_memories().await))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

async fn search(State(state): State<Arc<AppState>>, Query(q): Query<SearchQuery>) -> Result<Json<Envelope<Vec<UserMemory>>>> {
    let results = state.memory.search_memories(&q.q, q.limit.unwrap_or(DEFAULT_MEMORY_LIMIT)).await?;
    Ok(Json(Envelope::ok(results)))
}

async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Envelope<()>>> {
    state.memory.delete_memory(&id).await?;
    Ok(Json(Envelope::ok(())))
}

#[derive(Serialize)]
pub struct MemoryStats {
    pub count: usize,
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<Envelope<MemoryStats>> {
    Json(Envelope::ok(MemoryStats { count: state.memory.list_memories().await.len() }))
}
