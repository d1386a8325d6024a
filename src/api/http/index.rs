// src/api/http/index.rs
// `index/project|stats|search|callers|callees` - Symbol + Embedding
// operations (§6). `search` accepts `semantic=true` to route through
// the Embedding Index.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::Envelope;
use crate::error::{CraceError, Result};
use crate::indexer::Symbol;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/project", post(project))
        .route("/stats", get(stats))
        .route("/search", get(search))
        .route("/callers", get(callers))
        .route("/callees", get(callees))
}

#[derive(Deserialize)]
pub struct IndexProjectRequest {
    pub path: PathBuf,
}

#[derive(Serialize)]
pub struct IndexProjectResponse {
    pub indexed_files: usize,
}

async fn project(State(state): State<Arc<AppState>>, Json(req): Json<IndexProjectRequest>) -> Result<Json<Envelope<IndexProjectResponse>>> {
    if !req.path.is_dir() {
        return Err(CraceError::BadRequest(format!("'{}' is not a directory", req.path.display())));
    }
    let indexed_files = state.set_project_root(&req.path).await?;
    Ok(Json(Envelope::ok(IndexProjectResponse { indexed_files })))
}

#[derive(Serialize)]
pub struct IndexStats {
    pub symbol_embeddings: usize,
    pub chunk_embeddings: usize,
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<Envelope<IndexStats>> {
    Json(Envelope::ok(IndexStats {
        symbol_embeddings: state.symbol_embeddings.len().await,
        chunk_embeddings: state.chunk_embeddings.len().await,
    }))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
    #[serde(default)]
    pub semantic: bool,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum SearchResults {
    Symbols(Vec<Symbol>),
    Semantic(Vec<crate::embeddings::SearchResult>),
}

async fn search(State(state): State<Arc<AppState>>, Query(q): Query<SearchQuery>) -> Result<Json<Envelope<SearchResults>>> {
    let limit = q.limit.unwrap_or(20);
    if q.semantic {
        let results = state.symbol_embeddings.search(&q.q, limit).await.map_err(CraceError::Other)?;
        Ok(Json(Envelope::ok(SearchResults::Semantic(results))))
    } else {
        Ok(Json(Envelope::ok(SearchResults::Symbols(state.symbol_index.search_symbols(&q.q, limit).await))))
    }
}

#[derive(Deserialize)]
pub struct NameQuery {
    pub name: String,
}

async fn callers(State(state): State<Arc<AppState>>, Query(q): Query<NameQuery>) -> Json<Envelope<Vec<String>>> {
    Json(Envelope::ok(state.symbol_index.get_callers(&q.name).await))
}

async fn callees(State(state): State<Arc<AppState>>, Query(q): Query<NameQuery>) -> Json<Envelope<Vec<String>>> {
    Json(Envelope::ok(state.symbol_index.get_callees(&q.name).await))
}
