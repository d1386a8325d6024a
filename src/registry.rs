// src/registry.rs
// C3: File Registry - the authoritative store of open-editor file
// contents, keyed by path with a secondary lowercased-filename multi-map.

use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::indexer::Language;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RegisteredFile {
    pub filename: String,
    pub path: String,
    pub content: String,
    pub language: Option<Language>,
    pub registered_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Default)]
struct State {
    by_path: HashMap<String, RegisteredFile>,
    by_filename: HashMap<String, Vec<String>>,
}

pub struct FileRegistry {
    state: RwLock<State>,
}

impl Default for FileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FileRegistry {
    pub fn new() -> Self {
        Self { state: RwLock::new(State::default()) }
    }

    /// Upserts `path`. Registration is unbounded - `content` is stored
    /// verbatim with no truncation at ingest (§4.3).
    pub async fn register(&self, filename: &str, path: &str, content: String, language: Option<Language>) -> RegisteredFile {
        let now = chrono::Utc::now();
        let mut state = self.state.write().await;

        let registered_at = state.by_path.get(path).map(|f| f.registered_at).unwrap_or(now);
        let file = RegisteredFile {
            filename: filename.to_string(),
            path: path.to_string(),
            content,
            language,
            registered_at,
            updated_at: now,
        };

        let lower_key = filename.to_lowercase();
        let entry = state.by_filename.entry(lower_key).or_default();
        if !entry.contains(&path.to_string()) {
            entry.push(path.to_string());
        }
        state.by_path.insert(path.to_string(), file.clone());
        file
    }

    pub async fn unregister(&self, path: &str) -> bool {
        let mut state = self.state.write().await;
        let Some(file) = state.by_path.remove(path) else { return false };
        let lower_key = file.filename.to_lowercase();
        if let Some(entry) = state.by_filename.get_mut(&lower_key) {
            entry.retain(|p| p != path);
            if entry.is_empty() {
                state.by_filename.remove(&lower_key);
            }
        }
        true
    }

    pub async fn get_by_path(&self, path: &str) -> Option<RegisteredFile> {
        let state = self.state.read().await;
        state.by_path.get(path).cloned()
    }

    pub async fn list(&self) -> Vec<RegisteredFile> {
        let state = self.state.read().await;
        state.by_path.values().cloned().collect()
    }

    /// Normalized (lowercased, spaces/underscores stripped) comparison
    /// against both the registered filename and `query`; matches on exact,
    /// substring-either-direction, or case-insensitive contains.
    pub async fn search_by_filename(&self, query: &str) -> Vec<RegisteredFile> {
        let normalized_query = normalize(query);
        let state = self.state.read().await;
        state
            .by_path
            .values()
            .filter(|f| {
                let normalized_name = normalize(&f.filename);
                normalized_name == normalized_query
                    || normalized_name.contains(&normalized_query)
                    || normalized_query.contains(&normalized_name)
                    || f.filename.to_lowercase().contains(&query.to_lowercase())
            })
            .cloned()
            .collect()
    }

    pub async fn stats(&self) -> (usize, usize) {
        let state = self.state.read().await;
        let total_bytes: usize = state.by_path.values().map(|f| f.content.len()).sum();
        (state.by_path.len(), total_bytes)
    }

    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.by_path.clear();
        state.by_filename.clear();
    }
}

fn normalize(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| *c != ' ' && *c != '_').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_upserts_and_updates_timestamp() {
        let reg = FileRegistry::new();
        reg.register("a.py", "/p/a.py", "one".to_string(), Some(Language::Python)).await;
        let first = reg.get_by_path("/p/a.py").await.unwrap();
        reg.register("a.py", "/p/a.py", "two".to_string(), Some(Language::Python)).await;
        let second = reg.get_by_path("/p/a.py").await.unwrap();
        assert_eq!(second.content, "two");
        assert_eq!(second.registered_at, first.registered_at);
        assert!(second.updated_at >= first.updated_at);
    }

    #[tokio::test]
    async fn unregister_removes_from_both_indexes() {
        let reg = FileRegistry::new();
        reg.register("a.py", "/p/a.py", "x".to_string(), None).await;
        assert!(reg.unregister("/p/a.py").await);
        assert!(reg.get_by_path("/p/a.py").await.is_none());
        assert!(reg.search_by_filename("a.py").await.is_empty());
    }

    #[tokio::test]
    async fn search_by_filename_normalizes_spaces_and_underscores() {
        let reg = FileRegistry::new();
        reg.register("my_file.py", "/p/my_file.py", "x".to_string(), None).await;
        let found = reg.search_by_filename("my file.py").await;
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let reg = FileRegistry::new();
        reg.register("a.py", "/p/a.py", "x".to_string(), None).await;
        reg.clear().await;
        assert_eq!(reg.list().await.len(), 0);
    }
}
