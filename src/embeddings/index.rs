// src/embeddings/index.rs
// C4: Embedding Index - a vector store with cosine top-k search over
// EmbeddedItems (§4.4).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::provider::EmbeddingProvider;
use crate::indexer::{Symbol, SymbolKind};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmbeddedItem {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub score: f32,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct PersistedIndex {
    dimension: usize,
    items: Vec<EmbeddedItem>,
}

struct Matrix {
    /// Row-major, each row already L2-normalized.
    rows: Vec<Vec<f32>>,
    row_to_id: Vec<String>,
}

struct State {
    items: HashMap<String, EmbeddedItem>,
    matrix: Option<Matrix>,
    dirty: bool,
}

/// One vector store per consumer (symbols, chunks - §3 "two independent
/// EmbeddingIndexes coexist").
pub struct EmbeddingIndex {
    dimension: usize,
    provider: Arc<dyn EmbeddingProvider>,
    state: RwLock<State>,
}

impl EmbeddingIndex {
    pub fn new(dimension: usize, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            dimension,
            provider,
            state: RwLock::new(State { items: HashMap::new(), matrix: None, dirty: false }),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Upserts one item, embedding `text` through the configured provider.
    pub async fn upsert(&self, id: String, text: String, metadata: serde_json::Value) -> anyhow::Result<()> {
        self.upsert_batch(vec![(id, text, metadata)]).await
    }

    /// Batch upsert - encodes all pending texts in one provider call
    /// whenever more than one item is pending (§4.4).
    pub async fn upsert_batch(&self, items: Vec<(String, String, serde_json::Value)>) -> anyhow::Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = items.iter().map(|(_, t, _)| t.clone()).collect();
        let embeddings = self.provider.embed_batch(&texts).await?;

        let mut state = self.state.write().await;
        for ((id, text, metadata), embedding) in items.into_iter().zip(embeddings) {
            state.items.insert(id.clone(), EmbeddedItem { id, text, embedding, metadata });
        }
        state.dirty = true;
        Ok(())
    }

    pub async fn remove(&self, id: &str) -> bool {
        let mut state = self.state.write().await;
        let removed = state.items.remove(id).is_some();
        if removed {
            state.dirty = true;
        }
        removed
    }

    pub async fn remove_by_prefix_metadata_path(&self, path: &str) {
        let mut state = self.state.write().await;
        let before = state.items.len();
        state.items.retain(|_, item| item.metadata.get("file_path").and_then(|v| v.as_str()) != Some(path));
        if state.items.len() != before {
            state.dirty = true;
        }
    }

    /// Embeds `query` and returns the true top-k by cosine similarity,
    /// descending. Rebuilds the dense matrix lazily if dirty.
    pub async fn search(&self, query: &str, top_k: usize) -> anyhow::Result<Vec<SearchResult>> {
        let query_vec = self.provider.embed_batch(&[query.to_string()]).await?.pop().unwrap_or_default();
        Ok(self.search_vector(&query_vec, top_k).await)
    }

    pub async fn search_vector(&self, query_vec: &[f32], top_k: usize) -> Vec<SearchResult> {
        self.rebuild_if_dirty().await;
        let state = self.state.read().await;
        let Some(matrix) = &state.matrix else { return Vec::new() };

        let mut query_norm = query_vec.to_vec();
        super::provider::normalize(&mut query_norm);

        let mut scored: Vec<(f32, &str)> = matrix
            .rows
            .iter()
            .zip(matrix.row_to_id.iter())
            .map(|(row, id)| (cosine_of_normalized(row, &query_norm), id.as_str()))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored.into_iter().map(|(score, id)| SearchResult { id: id.to_string(), score }).collect()
    }

    async fn rebuild_if_dirty(&self) {
        let needs_rebuild = self.state.read().await.dirty;
        if !needs_rebuild {
            return;
        }
        let mut state = self.state.write().await;
        if !state.dirty {
            return;
        }
        let mut rows = Vec::with_capacity(state.items.len());
        let mut row_to_id = Vec::with_capacity(state.items.len());
        for item in state.items.values() {
            let mut v = item.embedding.clone();
            super::provider::normalize(&mut v);
            rows.push(v);
            row_to_id.push(item.id.clone());
        }
        state.matrix = Some(Matrix { rows, row_to_id });
        state.dirty = false;
    }

    pub async fn save(&self, path: &Path) -> anyhow::Result<()> {
        let state = self.state.read().await;
        let persisted = PersistedIndex { dimension: self.dimension, items: state.items.values().cloned().collect() };
        let json = serde_json::to_string_pretty(&persisted)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        Ok(())
    }

    /// Loads a snapshot. Fails if the on-disk dimension doesn't match
    /// this index's configured dimension (§4.4).
    pub async fn load(&self, path: &Path) -> anyhow::Result<()> {
        let json = tokio::fs::read_to_string(path).await?;
        let persisted: PersistedIndex = serde_json::from_str(&json)?;
        if persisted.dimension != self.dimension {
            anyhow::bail!(
                "embedding index dimension mismatch: file has {}, index expects {}",
                persisted.dimension,
                self.dimension
            );
        }
        let mut state = self.state.write().await;
        state.items = persisted.items.into_iter().map(|i| (i.id.clone(), i)).collect();
        state.dirty = true;
        Ok(())
    }
}

fn cosine_of_normalized(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Symbol-to-text function (§4.4): kind, name, the CamelCase/snake_case
/// decomposition of name, signature, docstring truncated to 500 chars -
/// space-separated.
pub fn symbol_to_text(symbol: &Symbol) -> String {
    let mut parts = vec![symbol.kind.as_str().to_string(), symbol.name.clone(), decompose_identifier(&symbol.name)];
    if let Some(sig) = &symbol.signature {
        parts.push(sig.clone());
    }
    if let Some(doc) = &symbol.docstring {
        let mut d = doc.clone();
        if d.len() > 500 {
            d.truncate(500);
        }
        parts.push(d);
    }
    parts.into_iter().filter(|p| !p.is_empty()).collect::<Vec<_>>().join(" ")
}

/// Lowercased, space-joined CamelCase/snake_case decomposition, e.g.
/// `getUserName` / `get_user_name` -> `"get user name"`.
pub fn decompose_identifier(name: &str) -> String {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' || c == '-' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.push(c.to_ascii_lowercase());
        prev_lower = c.is_lowercase() || c.is_numeric();
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.join(" ")
}

pub fn stable_symbol_id(symbol: &Symbol) -> String {
    symbol.stable_id()
}

pub fn symbol_kind_metadata(kind: SymbolKind) -> serde_json::Value {
    serde_json::json!({ "kind": kind.as_str() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::provider::LocalHashProvider;
    use std::collections::BTreeSet;

    fn make_symbol(name: &str, file: &str, line: u32) -> Symbol {
        Symbol {
            name: name.to_string(),
            kind: SymbolKind::Function,
            file_path: file.to_string(),
            line,
            end_line: line + 1,
            column: 0,
            signature: Some(format!("def {name}()")),
            docstring: None,
            parent: None,
            calls: BTreeSet::new(),
            called_by: BTreeSet::new(),
        }
    }

    #[test]
    fn decomposition_handles_camel_and_snake() {
        assert_eq!(decompose_identifier("getUserName"), "get user name");
        assert_eq!(decompose_identifier("get_user_name"), "get user name");
    }

    #[tokio::test]
    async fn search_returns_true_top_k_by_cosine() {
        let index = EmbeddingIndex::new(16, Arc::new(LocalHashProvider::new(16)));
        let sym_a = make_symbol("fetch_user_profile", "a.py", 1);
        let sym_b = make_symbol("render_button", "b.py", 1);
        index
            .upsert_batch(vec![
                (sym_a.stable_id(), symbol_to_text(&sym_a), serde_json::json!({})),
                (sym_b.stable_id(), symbol_to_text(&sym_b), serde_json::json!({})),
            ])
            .await
            .unwrap();

        let results = index.search("fetch user profile", 1).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, sym_a.stable_id());
    }

    #[tokio::test]
    async fn save_load_roundtrip_checks_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("idx.json");
        let index = EmbeddingIndex::new(8, Arc::new(LocalHashProvider::new(8)));
        index.upsert("x".into(), "hello".into(), serde_json::json!({})).await.unwrap();
        index.save(&path).await.unwrap();

        let reloaded = EmbeddingIndex::new(8, Arc::new(LocalHashProvider::new(8)));
        reloaded.load(&path).await.unwrap();
        assert_eq!(reloaded.len().await, 1);

        let mismatched = EmbeddingIndex::new(16, Arc::new(LocalHashProvider::new(16)));
        assert!(mismatched.load(&path).await.is_err());
    }
}
