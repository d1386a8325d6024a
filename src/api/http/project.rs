// src/api/http/project.rs
// `project/set-root|root` - sets the project root and triggers
// `index_project` (§6).

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::Envelope;
use crate::error::{CraceError, Result};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/set-root", post(set_root)).route("/root", get(root))
}

#[derive(Deserialize)]
pub struct SetRootRequest {
    pub path: PathBuf,
}

#[derive(Serialize)]
pub struct IndexSummary {
    pub root: String,
    pub indexed_files: usize,
}

async fn set_root(State(state): State<Arc<AppState>>, Json(req): Json<SetRootRequest>) -> Result<Json<Envelope<IndexSummary>>> {
    if !req.path.is_dir() {
        return Err(CraceError::BadRequest(format!("'{}' is not a directory", req.path.display())));
    }
    let indexed_files = state.set_project_root(&req.path).await?;
    Ok(Json(Envelope::ok(IndexSummary { root: req.path.display().to_string(), indexed_files })))
}

#[derive(Serialize)]
pub struct ProjectRoot {
    pub root: Option<String>,
}

async fn root(State(state): State<Arc<AppState>>) -> Json<Envelope<ProjectRoot>> {
    let root = state.settings.project_root.as_ref().map(|p| p.display().to_string());
    Json(Envelope::ok(ProjectRoot { root }))
}
