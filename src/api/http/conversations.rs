// src/api/http/conversations.rs
// `conversations/create|list|get|switch|delete|active|export` - Memory
// Store conversation operations (§6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use super::Envelope;
use crate::error::Result;
use crate::memory::Conversation;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(create))
        .route("/list", get(list))
        .route("/get/{id}", get(get_one))
        .route("/switch/{id}", post(switch))
        .route("/delete/{id}", post(delete))
        .route("/active", get(active))
        .route("/export/{id}", get(export))
}

#[derive(Deserialize, Default)]
pub struct CreateRequest {
    pub id: Option<String>,
    pub project_root: Option<String>,
}

async fn create(State(state): State<Arc<AppState>>, Json(req): Json<CreateRequest>) -> Result<Json<Envelope<Conversation>>> {
    let id = req.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let conv = state.memory.create_conversation(id, req.project_root).await?;
    Ok(Json(Envelope::ok(conv)))
}

async fn list(State(state): State<Arc<AppState>>) -> Json<Envelope<Vec<Conversation>>> {
    Json(Envelope::ok(state.memory.list_conversations().await))
}

async fn get_one(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Envelope<Conversation>>> {
    match state.memory.get_conversation(&id).await {
        Some(conv) => Ok(Json(Envelope::ok(conv))),
        None => Err(crate::error::CraceError::NotFound(format!("conversation '{id}' not found"))),
    }
}

async fn switch(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Envelope<()>>> {
    state.memory.switch_active(&id).await?;
    Ok(Json(Envelope::ok(())))
}

async fn delete(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Envelope<()>>> {
    state.memory.delete_conversation(&id).await?;
    Ok(Json(Envelope::ok(())))
}

#[derive(serde::Serialize)]
pub struct ActiveConversation {
    pub id: Option<String>,
}

async fn active(State(state): State<Arc<AppState>>) -> Json<Envelope<ActiveConversation>> {
    Json(Envelope::ok(ActiveConversation { id: state.memory.active_conversation_id().await }))
}

async fn export(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Result<Json<Envelope<Conversation>>> {
    match state.memory.get_conversation(&id).await {
        Some(conv) => Ok(Json(Envelope::ok(conv))),
        None => Err(crate::error::CraceError::NotFound(format!("conversation '{id}' not found"))),
    }
}
