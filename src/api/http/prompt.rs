// src/api/http/prompt.rs
// `prompt/optimize|expand` - pre-query normalization exposing the Smart
// Ranker's query-understanding helper directly; not part of CRACE's
// core retrieval behavior, but shares the same implementation (§6).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::Envelope;
use crate::ranker::understand_query;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/optimize", get(optimize)).route("/expand", get(expand))
}

#[derive(Deserialize)]
pub struct QueryParam {
    pub q: String,
}

#[derive(Serialize)]
pub struct OptimizedQuery {
    pub original: String,
    pub expanded: String,
    pub categories: Vec<&'static str>,
}

async fn optimize(State(_state): State<Arc<AppState>>, Query(q): Query<QueryParam>) -> Json<Envelope<OptimizedQuery>> {
    let understanding = understand_query(&q.q);
    Json(Envelope::ok(OptimizedQuery {
        original: q.q,
        expanded: understanding.expanded_query,
        categories: understanding.categories,
    }))
}

#[derive(Serialize)]
pub struct ExpandedQuery {
    pub expanded: String,
    pub entities: Vec<String>,
}

async fn expand(State(_state): State<Arc<AppState>>, Query(q): Query<QueryParam>) -> Json<Envelope<ExpandedQuery>> {
    let understanding = understand_query(&q.q);
    Json(Envelope::ok(ExpandedQuery { expanded: understanding.expanded_query, entities: understanding.entities }))
}
