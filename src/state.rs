// src/state.rs
// AppState: the single injected handle replacing every module-level
// singleton from the reference implementation (indexer, embedding
// service, registry, memory, smart-context state, file watcher). Built
// once at startup and shared via `Arc` through axum's `State` extractor
// (§9.1 redesign note).

use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::Settings;
use crate::context::gatherer::ContextGatherer;
use crate::embeddings::provider::{EmbeddingProvider, LocalHashProvider};
use crate::embeddings::EmbeddingIndex;
use crate::error::Result;
use crate::indexer::SymbolIndex;
use crate::memory::MemoryStore;
use crate::orchestrator::llm::{EchoLlmProvider, LlmProvider};
use crate::orchestrator::Orchestrator;
use crate::ranker::SmartRanker;
use crate::registry::FileRegistry;
use crate::watcher::{FileWatcher, IndexingChangeHandler};

/// Hard cap on files walked by a single `index_project` call, matching
/// the Smart Ranker's own bounded-scan convention (§4.5).
const MAX_INDEX_FILES: usize = 5000;

pub struct AppState {
    pub settings: Settings,
    pub symbol_index: Arc<SymbolIndex>,
    pub symbol_embeddings: Arc<EmbeddingIndex>,
    pub chunk_embeddings: Arc<EmbeddingIndex>,
    pub file_registry: Arc<FileRegistry>,
    pub ranker: Arc<SmartRanker>,
    pub memory: Arc<MemoryStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub watcher: RwLock<Option<FileWatcher>>,
}

impl AppState {
    pub async fn build(settings: Settings) -> Result<Arc<Self>> {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(LocalHashProvider::new(settings.embedding_dim));

        let symbol_index = Arc::new(SymbolIndex::new());
        let symbol_embeddings = Arc::new(EmbeddingIndex::new(settings.embedding_dim, provider.clone()));
        let chunk_embeddings = Arc::new(EmbeddingIndex::new(settings.embedding_dim, provider.clone()));
        let file_registry = Arc::new(FileRegistry::new());
        let ranker = Arc::new(SmartRanker::new(Some(provider.clone())));
        let memory = Arc::new(MemoryStore::load(settings.storage_dir.clone()).await?);

        load_embedding_snapshot(&symbol_embeddings, &settings.storage_dir, "symbols").await;
        load_embedding_snapshot(&chunk_embeddings, &settings.storage_dir, "chunks").await;

        let gatherer = Arc::new(ContextGatherer::new(symbol_index.clone(), ranker.clone()));
        let llm: Arc<dyn LlmProvider> = Arc::new(EchoLlmProvider);
        let orchestrator = Arc::new(Orchestrator::new(gatherer, memory.clone(), symbol_embeddings.clone(), llm));

        let state = Arc::new(Self {
            settings,
            symbol_index,
            symbol_embeddings,
            chunk_embeddings,
            file_registry,
            ranker,
            memory,
            orchestrator,
            watcher: RwLock::new(None),
        });

        if let Some(root) = state.settings.project_root.clone() {
            state.set_project_root(&root).await?;
        }

        Ok(state)
    }

    /// Indexes `root` and (re)starts the file watcher on it, replacing
    /// any watcher already running (§2's "Orchestrator -> ... File
    /// Watcher drives Incremental Indexer").
    pub async fn set_project_root(&self, root: &Path) -> Result<usize> {
        let indexed = self.symbol_index.index_project(root, MAX_INDEX_FILES).await;
        info!(root = %root.display(), indexed, "indexed project root");

        let handler = Arc::new(IndexingChangeHandler::new(self.symbol_index.clone(), self.symbol_embeddings.clone()));
        match FileWatcher::start(root, handler) {
            Ok(watcher) => {
                *self.watcher.write().await = Some(watcher);
            }
            Err(e) => warn!(root = %root.display(), error = %e, "failed to start file watcher"),
        }

        Ok(indexed)
    }

    pub async fn persist_embedding_snapshots(&self) -> Result<()> {
        let symbols_path = self.settings.storage_dir.join("project_symbols.json");
        let chunks_path = self.settings.storage_dir.join("project_chunks.json");
        self.symbol_embeddings.save(&symbols_path).await?;
        self.chunk_embeddings.save(&chunks_path).await?;
        Ok(())
    }
}

async fn load_embedding_snapshot(index: &EmbeddingIndex, storage_dir: &Path, label: &str) {
    let path = storage_dir.join(format!("project_{label}.json"));
    if !path.exists() {
        return;
    }
    if let Err(e) = index.load(&path).await {
        warn!(path = %path.display(), error = %e, "failed to load embedding snapshot, starting empty");
    }
}
