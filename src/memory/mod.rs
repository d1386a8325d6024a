// src/memory/mod.rs
// C10: Memory Store - conversations and long-term memories persisted as
// JSON files under a storage directory, with no database (§4.9).

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::warn;

use crate::error::{CraceError, Result};

pub const MAX_MESSAGES_PER_CONVERSATION: usize = 50;
pub const DEFAULT_HISTORY_LIMIT: usize = 10;
pub const DEFAULT_MEMORY_LIMIT: usize = 10;
pub const DEFAULT_MEMORY_IMPORTANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Conversation {
    fn new(id: String, now: DateTime<Utc>, project_root: Option<String>) -> Self {
        Self {
            id,
            title: None,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
            project_root,
            metadata: None,
        }
    }

    /// Appends `message`, then trims the whole list (not a pre-filtered
    /// non-system sublist) down to the cap, keeping every system message
    /// plus the most recent non-system messages (§4.9).
    fn push_and_trim(&mut self, message: ChatMessage) {
        self.messages.push(message);
        if self.messages.len() <= MAX_MESSAGES_PER_CONVERSATION {
            return;
        }

        let system_count = self.messages.iter().filter(|m| m.role == Role::System).count();
        let keep_non_system = MAX_MESSAGES_PER_CONVERSATION.saturating_sub(system_count);

        let mut kept = Vec::with_capacity(MAX_MESSAGES_PER_CONVERSATION);
        let mut non_system_seen = 0usize;
        let total_non_system = self.messages.iter().filter(|m| m.role != Role::System).count();
        let skip_first_n_non_system = total_non_system.saturating_sub(keep_non_system);

        for message in std::mem::take(&mut self.messages) {
            if message.role == Role::System {
                kept.push(message);
                continue;
            }
            non_system_seen += 1;
            if non_system_seen > skip_first_n_non_system {
                kept.push(message);
            }
        }
        self.messages = kept;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMemory {
    pub id: String,
    #[serde(default)]
    pub category: Option<String>,
    pub content: String,
    pub importance: f32,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: u32,
}

impl UserMemory {
    fn new(
        id: String,
        category: Option<String>,
        content: String,
        importance: Option<f32>,
        now: DateTime<Utc>,
    ) -> Self {
        let importance = importance.unwrap_or(DEFAULT_MEMORY_IMPORTANCE).clamp(0.0, 1.0);
        Self { id, category, content, importance, created_at: now, last_accessed: now, access_count: 0 }
    }

    fn retrieval_score(&self) -> f32 {
        self.importance * (1.0 + 0.1 * self.access_count as f32)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryTurn {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemoryRetrieval {
    pub history: Vec<HistoryTurn>,
    pub memories: Vec<UserMemory>,
}

struct MemoryState {
    conversations: HashMap<String, Conversation>,
    active_conversation: Option<String>,
    memories: HashMap<String, UserMemory>,
}

/// Persists conversations (one JSON file each) and memories (one shared
/// JSON file) under `storage_dir`, rewriting the relevant file on every
/// mutation. No database is used (§4.9).
pub struct MemoryStore {
    storage_dir: PathBuf,
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    /// Loads every parseable file under `storage_dir/conversations/` and
    /// `storage_dir/memories.json`. Files that fail to parse are logged
    /// and skipped, never aborting startup.
    pub async fn load(storage_dir: PathBuf) -> Result<Self> {
        let conversations_dir = storage_dir.join("conversations");
        tokio::fs::create_dir_all(&conversations_dir).await?;

        let mut conversations = HashMap::new();
        let mut entries = tokio::fs::read_dir(&conversations_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read_to_string(&path).await {
                Ok(raw) => match serde_json::from_str::<Conversation>(&raw) {
                    Ok(conv) => {
                        conversations.insert(conv.id.clone(), conv);
                    }
                    Err(e) => warn!(path = %path.display(), error = %e, "skipping unparsable conversation file"),
                },
                Err(e) => warn!(path = %path.display(), error = %e, "failed reading conversation file"),
            }
        }

        let memories_path = storage_dir.join("memories.json");
        let memories = match tokio::fs::read_to_string(&memories_path).await {
            Ok(raw) => serde_json::from_str::<HashMap<String, UserMemory>>(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "skipping unparsable memories.json");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Ok(Self {
            storage_dir,
            state: RwLock::new(MemoryState { conversations, active_conversation: None, memories }),
        })
    }

    pub async fn create_conversation(&self, id: String, project_root: Option<String>) -> Result<Conversation> {
        let now = Utc::now();
        let conv = Conversation::new(id.clone(), now, project_root);
        {
            let mut state = self.state.write().await;
            state.conversations.insert(id.clone(), conv.clone());
            state.active_conversation = Some(id.clone());
        }
        self.persist_conversation(&conv).await?;
        Ok(conv)
    }

    pub async fn list_conversations(&self) -> Vec<Conversation> {
        self.state.read().await.conversations.values().cloned().collect()
    }

    pub async fn get_conversation(&self, id: &str) -> Option<Conversation> {
        self.state.read().await.conversations.get(id).cloned()
    }

    pub async fn active_conversation_id(&self) -> Option<String> {
        self.state.read().await.active_conversation.clone()
    }

    /// Switching the active conversation requires the target to already
    /// exist (§4.9).
    pub async fn switch_active(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.conversations.contains_key(id) {
            return Err(CraceError::NotFound(format!("conversation '{id}' not found")));
        }
        state.active_conversation = Some(id.to_string());
        Ok(())
    }

    pub async fn delete_conversation(&self, id: &str) -> Result<()> {
        let existed = {
            let mut state = self.state.write().await;
            let existed = state.conversations.remove(id).is_some();
            if state.active_conversation.as_deref() == Some(id) {
                state.active_conversation = None;
            }
            existed
        };
        if !existed {
            return Err(CraceError::NotFound(format!("conversation '{id}' not found")));
        }
        let path = self.conversation_path(id);
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }

    /// Appends a turn to the active conversation, auto-creating one first
    /// if none is active (§4.9).
    pub async fn add_message(&self, role: Role, content: String, metadata: Option<serde_json::Value>) -> Result<Conversation> {
        let active_id = {
            let state = self.state.read().await;
            state.active_conversation.clone()
        };
        let id = match active_id {
            Some(id) => id,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                self.create_conversation(id.clone(), None).await?;
                id
            }
        };

        let updated = {
            let mut state = self.state.write().await;
            let conv = state
                .conversations
                .get_mut(&id)
                .expect("conversation just created or looked up must exist");
            conv.push_and_trim(ChatMessage { role, content, timestamp: Utc::now(), metadata });
            conv.updated_at = Utc::now();
            conv.clone()
        };
        self.persist_conversation(&updated).await?;
        Ok(updated)
    }

    pub async fn add_memory(
        &self,
        content: String,
        category: Option<String>,
        importance: Option<f32>,
    ) -> Result<UserMemory> {
        let id = uuid::Uuid::new_v4().to_string();
        let memory = UserMemory::new(id.clone(), category, content, importance, Utc::now());
        {
            let mut state = self.state.write().await;
            state.memories.insert(id, memory.clone());
        }
        self.persist_memories().await?;
        Ok(memory)
    }

    pub async fn list_memories(&self) -> Vec<UserMemory> {
        self.state.read().await.memories.values().cloned().collect()
    }

    pub async fn delete_memory(&self, id: &str) -> Result<()> {
        let existed = self.state.write().await.memories.remove(id).is_some();
        if !existed {
            return Err(CraceError::NotFound(format!("memory '{id}' not found")));
        }
        self.persist_memories().await
    }

    /// Case-insensitive substring match against `query`, ranked by
    /// `importance * (1 + 0.1 * access_count)`. A hit bumps the matched
    /// memory's `access_count`/`last_accessed` as a side effect (§4.9).
    pub async fn search_memories(&self, query: &str, limit: usize) -> Result<Vec<UserMemory>> {
        let needle = query.to_lowercase();
        let mut hit_ids: Vec<String> = {
            let state = self.state.read().await;
            state
                .memories
                .values()
                .filter(|m| m.content.to_lowercase().contains(&needle))
                .map(|m| m.id.clone())
                .collect()
        };

        {
            let mut state = self.state.write().await;
            let now = Utc::now();
            for id in &hit_ids {
                if let Some(memory) = state.memories.get_mut(id) {
                    memory.access_count += 1;
                    memory.last_accessed = now;
                }
            }
        }
        self.persist_memories().await?;

        let mut results: Vec<UserMemory> = {
            let state = self.state.read().await;
            hit_ids.drain(..).filter_map(|id| state.memories.get(&id).cloned()).collect()
        };
        results.sort_by(|a, b| b.retrieval_score().partial_cmp(&a.retrieval_score()).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }

    /// Builds the `(history, memories)` bundle the orchestrator hands to
    /// the Context Assembler for one request (§4.9, §4.10 step 1).
    pub async fn retrieve_for_query(&self, query: &str, history_limit: usize, memory_limit: usize) -> MemoryRetrieval {
        let history = match self.active_conversation_id().await {
            Some(id) => match self.get_conversation(&id).await {
                Some(conv) => conv
                    .messages
                    .iter()
                    .rev()
                    .take(history_limit)
                    .rev()
                    .map(|m| HistoryTurn { role: m.role.as_str(), content: m.content.clone() })
                    .collect(),
                None => Vec::new(),
            },
            None => Vec::new(),
        };

        let memories = self.search_memories(query, memory_limit).await.unwrap_or_default();
        MemoryRetrieval { history, memories }
    }

    fn conversation_path(&self, id: &str) -> PathBuf {
        self.storage_dir.join("conversations").join(format!("{id}.json"))
    }

    async fn persist_conversation(&self, conv: &Conversation) -> Result<()> {
        let path = self.conversation_path(&conv.id);
        let body = serde_json::to_string_pretty(conv)?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }

    async fn persist_memories(&self) -> Result<()> {
        let snapshot = self.state.read().await.memories.clone();
        let path = self.storage_dir.join("memories.json");
        let body = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (MemoryStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::load(dir.path().to_path_buf()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn add_message_autocreates_conversation() {
        let (store, _dir) = store().await;
        assert!(store.active_conversation_id().await.is_none());
        store.add_message(Role::User, "hello".into(), None).await.unwrap();
        assert!(store.active_conversation_id().await.is_some());
    }

    #[tokio::test]
    async fn switch_active_requires_existing_target() {
        let (store, _dir) = store().await;
        let err = store.switch_active("missing").await.unwrap_err();
        assert!(matches!(err, CraceError::NotFound(_)));
    }

    #[tokio::test]
    async fn trim_keeps_all_system_messages_plus_recent_non_system() {
        let (store, _dir) = store().await;
        store.create_conversation("c1".into(), None).await.unwrap();
        store.switch_active("c1").await.unwrap();

        store.add_message(Role::System, "system prompt".into(), None).await.unwrap();
        for i in 0..60 {
            store.add_message(Role::User, format!("msg {i}"), None).await.unwrap();
        }

        let conv = store.get_conversation("c1").await.unwrap();
        assert_eq!(conv.messages.len(), MAX_MESSAGES_PER_CONVERSATION);
        assert!(conv.messages.iter().any(|m| m.role == Role::System));
        assert!(conv.messages.iter().any(|m| m.content == "msg 59"));
        assert!(!conv.messages.iter().any(|m| m.content == "msg 0"));
    }

    #[tokio::test]
    async fn search_memories_ranks_by_importance_and_bumps_access_count() {
        let (store, _dir) = store().await;
        store.add_memory("prefers dark mode in the editor".into(), None, Some(0.5)).await.unwrap();
        store.add_memory("likes dark roast coffee".into(), None, Some(0.9)).await.unwrap();

        let results = store.search_memories("dark", 10).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].content.contains("coffee"));
        assert_eq!(results[0].access_count, 1);
    }

    #[tokio::test]
    async fn memory_importance_defaults_to_one_and_clamps_out_of_range() {
        let (store, _dir) = store().await;
        let default_mem = store.add_memory("no importance given".into(), None, None).await.unwrap();
        assert_eq!(default_mem.importance, 1.0);

        let clamped = store.add_memory("over range".into(), None, Some(5.0)).await.unwrap();
        assert_eq!(clamped.importance, 1.0);
    }

    #[tokio::test]
    async fn persistence_round_trips_through_reload() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = MemoryStore::load(dir.path().to_path_buf()).await.unwrap();
            store.create_conversation("c1".into(), None).await.unwrap();
            store.add_message(Role::User, "hello".into(), None).await.unwrap();
            store.add_memory("remember this".into(), None, Some(0.7)).await.unwrap();
        }

        let reloaded = MemoryStore::load(dir.path().to_path_buf()).await.unwrap();
        let conv = reloaded.get_conversation("c1").await.unwrap();
        assert_eq!(conv.messages.len(), 1);
        let memories = reloaded.list_memories().await;
        assert_eq!(memories.len(), 1);
        assert_eq!(memories[0].content, "remember this");
    }
}
