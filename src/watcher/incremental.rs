// src/watcher/incremental.rs
// Pull-mode incremental indexing: compares on-disk mtimes against a
// cached map and re-indexes only files that have advanced (§4.6).

use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;

use tokio::sync::Mutex;
use tracing::warn;

use crate::indexer::SymbolIndex;

pub struct IncrementalIndexer {
    mtimes: Mutex<HashMap<String, SystemTime>>,
}

impl Default for IncrementalIndexer {
    fn default() -> Self {
        Self::new()
    }
}

impl IncrementalIndexer {
    pub fn new() -> Self {
        Self { mtimes: Mutex::new(HashMap::new()) }
    }

    /// Walks `root`, re-indexing only files whose on-disk mtime has
    /// advanced past the cached value. Returns the count re-indexed.
    /// Failures on a single file are logged and swallowed (§4.6).
    pub async fn index_changed_files(&self, root: &Path, symbol_index: &SymbolIndex) -> usize {
        let mut count = 0usize;
        let walker = ignore::WalkBuilder::new(root)
            .hidden(false)
            .filter_entry(|entry| {
                if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    let name = entry.file_name().to_string_lossy();
                    return !crate::indexer::symbol_index::BLOCKED_DIRS.contains(&name.as_ref());
                }
                true
            })
            .build();

        for entry in walker {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            if !super::is_watchable(path) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else { continue };
            let Ok(modified) = metadata.modified() else { continue };
            let Some(path_str) = path.to_str() else { continue };

            let should_index = {
                let mtimes = self.mtimes.lock().await;
                mtimes.get(path_str).map(|cached| modified > *cached).unwrap_or(true)
            };
            if !should_index {
                continue;
            }

            if symbol_index.index_file(path_str, None).await.is_some() {
                self.mtimes.lock().await.insert(path_str.to_string(), modified);
                count += 1;
            } else {
                warn!(path = path_str, "incremental reindex skipped (unsupported or unparsable)");
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reindexes_only_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("a.py");
        std::fs::write(&file_path, "def a():\n    pass\n").unwrap();

        let symbol_index = SymbolIndex::new();
        let incremental = IncrementalIndexer::new();

        let first = incremental.index_changed_files(dir.path(), &symbol_index).await;
        assert_eq!(first, 1);

        let second = incremental.index_changed_files(dir.path(), &symbol_index).await;
        assert_eq!(second, 0);
    }
}
