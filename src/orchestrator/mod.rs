// src/orchestrator/mod.rs
// C11: Orchestrator - a directed acyclic graph of stages with one entry
// (`gather_context`) and one terminal per detected intent (§4.10).

pub mod intent;
pub mod llm;

pub use intent::{Intent, detect_intent};
pub use llm::{LlmProvider, LlmRequest};

use std::sync::Arc;

use tracing::{error, warn};

use crate::context::{ContextAssembler, ContextItem, Intent as BudgetIntent, ItemCategory};
use crate::context::gatherer::{ContextGatherer, GatherRequest};
use crate::embeddings::EmbeddingIndex;
use crate::memory::{MemoryStore, Role};
use crate::ranker::{CandidateFile, RankedFile};
use crate::search::{KeywordResult, hybrid_search};

const ACTIVITY_FILE_LIMIT: usize = 8;
const REFERENCED_MIN_SCORE: f32 = 0.25;
const HYBRID_TOP_K: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct OrchestratorRequest {
    pub conversation_hint: Option<String>,
    pub text: String,
    pub mode: Option<String>,
    pub file_path: Option<String>,
    pub file_content: Option<String>,
    pub cursor_line: Option<u32>,
    pub selection: Option<String>,
    pub project_root: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ActivityEntry {
    pub status: &'static str,
    pub message: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct OrchestratorResponse {
    pub intent: &'static str,
    pub response_text: String,
    pub activity: Vec<ActivityEntry>,
    pub error: Option<String>,
}

/// Holds the handles every stage needs. Constructed once at startup and
/// shared via `Arc` rather than module-level singletons (§9.1).
pub struct Orchestrator {
    gatherer: Arc<ContextGatherer>,
    assembler: ContextAssembler,
    memory: Arc<MemoryStore>,
    symbol_embeddings: Arc<EmbeddingIndex>,
    llm: Arc<dyn LlmProvider>,
}

impl Orchestrator {
    pub fn new(
        gatherer: Arc<ContextGatherer>,
        memory: Arc<MemoryStore>,
        symbol_embeddings: Arc<EmbeddingIndex>,
        llm: Arc<dyn LlmProvider>,
    ) -> Self {
        Self { gatherer, assembler: ContextAssembler::new(), memory, symbol_embeddings, llm }
    }

    /// Runs the full graph for one request. Never returns `Err`: any
    /// stage failure is folded into a canned apologetic response so the
    /// caller always gets a complete envelope (§4.10, §7 propagation).
    pub async fn run(&self, request: OrchestratorRequest) -> OrchestratorResponse {
        match self.run_inner(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "orchestrator stage failed, returning fallback response");
                OrchestratorResponse {
                    intent: "chat",
                    response_text: "Sorry, something went wrong processing that request.".to_string(),
                    activity: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }

    async fn run_inner(&self, request: &OrchestratorRequest) -> crate::error::Result<OrchestratorResponse> {
        let gathered = self.gather_context(request).await;
        let intent = detect_intent(request.mode.as_deref(), &request.text);
        let budget_intent = match intent {
            Intent::Coding | Intent::Workflow | Intent::Plan => BudgetIntent::Coding,
            Intent::Debug => BudgetIntent::Debug,
            Intent::Explain => BudgetIntent::Explain,
            Intent::Chat => BudgetIntent::Chat,
        };

        let mut items = gathered.file_items.clone();
        if let Some(err_msg) = &request.error_message
            && intent == Intent::Debug
        {
            // Priority 100: same weight as a selection (§4.8, debug intent).
            items.push(ContextItem::new(ItemCategory::Selection, "error_message", err_msg.clone(), 100));
        }
        for turn in &gathered.history {
            items.push(ContextItem::new(ItemCategory::History, "history", format!("{}: {}", turn.role, turn.content), 70));
        }
        for memory in &gathered.memories {
            items.push(ContextItem::new(ItemCategory::Memory, "memory", memory.content.clone(), 40));
        }

        let assembled = self.assembler.assemble(budget_intent, items, crate::context::DEFAULT_MAX_TOKENS);

        let llm_request = LlmRequest {
            intent: intent.as_str(),
            system_context: assembled.system_context.clone(),
            user_context: assembled.user_context.clone(),
            instruction: request.text.clone(),
        };
        let llm_response = match self.llm.complete(&llm_request).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "LLM call failed, falling back to apologetic response");
                llm::LlmResponse { text: "I wasn't able to reach the language model just now.".to_string() }
            }
        };

        let activity_files = self.compute_activity_files(request, &gathered);
        let activity = vec![ActivityEntry {
            status: "done",
            message: "gathered context".to_string(),
            files: activity_files,
        }];

        self.memory.add_message(Role::User, request.text.clone(), None).await?;
        self.memory.add_message(Role::Assistant, llm_response.text.clone(), None).await?;

        Ok(OrchestratorResponse {
            intent: intent.as_str(),
            response_text: llm_response.text,
            activity,
            error: None,
        })
    }

    /// Stage 1: invoke C8, run hybrid-search enrichment over the
    /// transcript when a file is present, and pull recent history plus
    /// relevant memories from C10 (§4.10 step 1).
    async fn gather_context(&self, request: &OrchestratorRequest) -> GatheredContext {
        let mut file_items = Vec::new();
        let mut referenced_files: Vec<RankedFile> = Vec::new();

        if let (Some(file_path), Some(file_content)) = (&request.file_path, &request.file_content) {
            let gather_request = GatherRequest {
                file_path: file_path.clone(),
                file_content: file_content.clone(),
                cursor_line: request.cursor_line.unwrap_or(1),
                selection: request.selection.clone(),
                project_root: request.project_root.clone(),
                transcript: Some(request.text.clone()),
            };
            let file_context = self.gatherer.gather(&gather_request).await;
            referenced_files = file_context.referenced_files.clone();
            file_items = self.assembler.items_from_file_context(&file_context, request.selection.as_deref());
        }

        if let Some(keyword_matches) = self.hybrid_enrichment(request).await {
            for hit in keyword_matches {
                // Below the direct symbol_at_cursor/related_symbols priority (85):
                // these are hybrid-search enrichment hits, not direct matches.
                file_items.push(ContextItem::new(ItemCategory::Symbol, hit.id.clone(), format!("related: {}", hit.id), 75));
            }
        }

        let retrieval = self.memory.retrieve_for_query(&request.text, 10, 10).await;

        GatheredContext { file_items, history: retrieval.history, memories: retrieval.memories, referenced_files }
    }

    async fn hybrid_enrichment(&self, request: &OrchestratorRequest) -> Option<Vec<crate::search::HybridResult>> {
        if request.text.trim().is_empty() {
            return None;
        }
        let keyword_results: Vec<KeywordResult> = Vec::new();
        match hybrid_search(&request.text, &keyword_results, &self.symbol_embeddings, HYBRID_TOP_K, 0.4, 0.6).await {
            Ok(results) => Some(results),
            Err(e) => {
                warn!(error = %e, "hybrid search enrichment failed, continuing without it");
                None
            }
        }
    }

    /// Terminal stage's 3-tier file-activity computation (§4.10, expansion).
    fn compute_activity_files(&self, request: &OrchestratorRequest, gathered: &GatheredContext) -> Vec<String> {
        let mut files = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for referenced in &gathered.referenced_files {
            if files.len() >= ACTIVITY_FILE_LIMIT {
                break;
            }
            if referenced.score >= REFERENCED_MIN_SCORE && seen.insert(referenced.path.clone()) {
                files.push(short_name(&referenced.path));
            }
        }

        if files.len() < ACTIVITY_FILE_LIMIT
            && let Some(current) = &request.file_path
            && seen.insert(current.clone())
        {
            files.push(short_name(current));
        }

        files.truncate(ACTIVITY_FILE_LIMIT);
        files
    }
}

struct GatheredContext {
    file_items: Vec<ContextItem>,
    history: Vec<crate::memory::HistoryTurn>,
    memories: Vec<crate::memory::UserMemory>,
    referenced_files: Vec<RankedFile>,
}

fn short_name(path: &str) -> String {
    std::path::Path::new(path).file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_else(|| path.to_string())
}

/// Pulled into a free function so callers that only have a registry/scan
/// result (no live gatherer) can still build the activity-relevant
/// candidate set the same way §4.5 describes.
pub fn candidates_from_paths(paths: &[(String, String)]) -> Vec<CandidateFile> {
    paths
        .iter()
        .map(|(path, content)| CandidateFile {
            filename: short_name(path),
            path: path.clone(),
            content: content.clone(),
        })
        .collect()
}
