// src/watcher/mod.rs
// C7: File Watcher & Incremental Indexer (§4.6). A raw `notify` watcher
// bridges OS events onto a per-path debounce scheduler; at window expiry
// the final coalesced event for that path is dispatched to a handler that
// re-indexes the Symbol Index and Embedding Index.

mod debounce;
mod incremental;

pub use debounce::{ChangeKind, Debouncer};
pub use incremental::IncrementalIndexer;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::embeddings::{EmbeddingIndex, symbol_to_text};
use crate::indexer::SymbolIndex;

/// Extensions the watcher cares about (§4.6).
pub const WATCHED_EXTENSIONS: &[&str] = &["py", "ts", "tsx", "js", "jsx", "mjs", "cjs"];

pub const DEBOUNCE_MS: u64 = 500;

pub fn is_watchable(path: &Path) -> bool {
    if path.components().any(|c| {
        let name = c.as_os_str().to_string_lossy();
        crate::indexer::symbol_index::BLOCKED_DIRS.contains(&name.as_ref())
    }) {
        return false;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| WATCHED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Receives the final, coalesced event for one path (§4.6 "Handler
/// semantics").
#[async_trait]
pub trait ChangeHandler: Send + Sync {
    async fn handle(&self, path: &Path, kind: ChangeKind);
}

/// Default handler: keeps the Symbol Index and Embedding Index current.
pub struct IndexingChangeHandler {
    symbol_index: Arc<SymbolIndex>,
    embedding_index: Arc<EmbeddingIndex>,
}

impl IndexingChangeHandler {
    pub fn new(symbol_index: Arc<SymbolIndex>, embedding_index: Arc<EmbeddingIndex>) -> Self {
        Self { symbol_index, embedding_index }
    }

    async fn reindex(&self, path: &Path) {
        let path_str = path.to_string_lossy().to_string();
        match self.symbol_index.index_file(&path_str, None).await {
            Some(file_symbols) => {
                let items: Vec<_> = file_symbols
                    .symbols
                    .iter()
                    .map(|s| (s.stable_id(), symbol_to_text(s), serde_json::json!({"file_path": s.file_path})))
                    .collect();
                if let Err(e) = self.embedding_index.upsert_batch(items).await {
                    warn!(path = %path_str, error = %e, "embedding upsert failed after reindex");
                }
            }
            None => debug!(path = %path_str, "reindex skipped (unsupported or unparsable)"),
        }
    }

    async fn remove(&self, path: &Path) {
        let path_str = path.to_string_lossy().to_string();
        self.symbol_index.remove_file(&path_str).await;
        self.embedding_index.remove_by_prefix_metadata_path(&path_str).await;
    }
}

#[async_trait]
impl ChangeHandler for IndexingChangeHandler {
    async fn handle(&self, path: &Path, kind: ChangeKind) {
        match kind {
            ChangeKind::Created | ChangeKind::Modified => self.reindex(path).await,
            ChangeKind::Deleted => self.remove(path).await,
            ChangeKind::Moved { from } => {
                self.remove(&from).await;
                self.reindex(path).await;
            }
        }
    }
}

/// Bridges a raw `notify` watcher onto the debounce scheduler and runs
/// until dropped. One OS-thread bridge (per §5's "File watcher loop").
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    debouncer: Arc<Debouncer>,
}

impl FileWatcher {
    /// Starts watching `root` recursively. Failures during indexing of a
    /// single file are logged and swallowed inside the handler; the
    /// watcher itself never stops because of them.
    pub fn start(root: &Path, handler: Arc<dyn ChangeHandler>) -> notify::Result<Self> {
        let debouncer = Arc::new(Debouncer::new(std::time::Duration::from_millis(DEBOUNCE_MS), handler));
        let (tx, mut rx) = mpsc::unbounded_channel::<Event>();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(e) => error!(error = %e, "file watcher error"),
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        let debouncer_clone = debouncer.clone();
        tokio::spawn(async move {
            let mut pending_renames: Option<PathBuf> = None;
            while let Some(event) = rx.recv().await {
                dispatch_event(&event, &debouncer_clone, &mut pending_renames).await;
            }
        });

        Ok(Self { _watcher: watcher, debouncer })
    }

    pub fn debouncer(&self) -> Arc<Debouncer> {
        self.debouncer.clone()
    }
}

async fn dispatch_event(event: &Event, debouncer: &Arc<Debouncer>, pending_renames: &mut Option<PathBuf>) {
    let watched_paths: Vec<PathBuf> = event.paths.iter().filter(|p| is_watchable(p)).cloned().collect();
    if watched_paths.is_empty() && !matches!(event.kind, EventKind::Remove(_)) {
        return;
    }

    match &event.kind {
        EventKind::Create(_) => {
            for path in watched_paths {
                debouncer.record(path, ChangeKind::Created).await;
            }
        }
        EventKind::Modify(notify::event::ModifyKind::Name(notify::event::RenameMode::From)) => {
            if let Some(path) = event.paths.first() {
                *pending_renames = Some(path.clone());
            }
        }
        EventKind::Modify(notify::event::ModifyKind::Name(notify::event::RenameMode::To)) => {
            if let (Some(from), Some(to)) = (pending_renames.take(), event.paths.first()) {
                if is_watchable(to) {
                    debouncer.record(to.clone(), ChangeKind::Moved { from }).await;
                } else if is_watchable(&from) {
                    debouncer.record(from, ChangeKind::Deleted).await;
                }
            }
        }
        EventKind::Modify(_) => {
            for path in watched_paths {
                debouncer.record(path, ChangeKind::Modified).await;
            }
        }
        EventKind::Remove(_) => {
            for path in event.paths.iter().filter(|p| is_watchable(p)) {
                debouncer.record(path.clone(), ChangeKind::Deleted).await;
            }
        }
        _ => {}
    }
}

/// Exposed for `index_project`-adjacent callers that want the set of
/// extensions this watcher understands, without importing `notify`.
pub fn supported_extensions() -> HashSet<&'static str> {
    WATCHED_EXTENSIONS.iter().copied().collect()
}
