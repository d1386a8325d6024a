// src/ranker/mod.rs
// C6: Smart Ranker - scores whole files against a natural-language query
// by fusing category, path, semantic, and keyword signals (§4.5).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::embeddings::provider::{EmbeddingProvider, normalize};

/// One bundle of signals used to detect and score a file's category
/// (Stage B, §4.5).
struct CategoryBundle {
    name: &'static str,
    folders: &'static [&'static str],
    files: &'static [&'static str],
    keywords: &'static [&'static str],
}

const CATEGORY_BUNDLES: &[CategoryBundle] = &[
    CategoryBundle {
        name: "agent",
        folders: &["agents", "agent"],
        files: &["agent", "bot"],
        keywords: &["agent", "orchestrator", "assistant", "autonomous"],
    },
    CategoryBundle {
        name: "service",
        folders: &["services", "service"],
        files: &["service", "client", "provider"],
        keywords: &["service", "client", "provider", "gateway"],
    },
    CategoryBundle {
        name: "component",
        folders: &["components", "component"],
        files: &["component"],
        keywords: &["component", "render", "props", "jsx"],
    },
    CategoryBundle {
        name: "hook",
        folders: &["hooks"],
        files: &["use"],
        keywords: &["usestate", "useeffect", "usecallback", "hook"],
    },
    CategoryBundle {
        name: "model",
        folders: &["models", "model", "schemas", "entities"],
        files: &["model", "schema", "types", "entity"],
        keywords: &["model", "schema", "struct", "dataclass"],
    },
    CategoryBundle {
        name: "util",
        folders: &["utils", "util", "helpers", "lib"],
        files: &["util", "helper"],
        keywords: &["util", "helper", "format", "parse"],
    },
    CategoryBundle {
        name: "api",
        folders: &["api", "routes", "endpoints", "controllers"],
        files: &["route", "endpoint", "controller", "handler"],
        keywords: &["endpoint", "route", "handler", "request"],
    },
    CategoryBundle {
        name: "test",
        folders: &["tests", "test", "__tests__", "spec"],
        files: &["test", "spec"],
        keywords: &["test", "assert", "expect", "describe"],
    },
];

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "can", "her", "was", "one", "our",
    "out", "day", "get", "has", "him", "his", "how", "man", "new", "now", "old", "see", "two",
    "way", "who", "boy", "did", "its", "let", "put", "say", "she", "too", "use", "tell", "about",
    "what", "show", "find", "where", "me", "is", "of", "to", "in", "a", "an", "on", "at",
];

/// Config/metadata files whose score is discounted to 10% (Stage C, §4.5).
const EXCLUDED_FILENAMES: &[&str] = &[
    "pyproject.toml",
    "package.json",
    "package-lock.json",
    "tsconfig.json",
    "requirements.txt",
    "setup.py",
    "setup.cfg",
    ".gitignore",
    ".env",
    "readme.md",
    "license",
    "makefile",
    "dockerfile",
    ".dockerignore",
    "yarn.lock",
    "pnpm-lock.yaml",
    "cargo.toml",
    "cargo.lock",
    "go.mod",
    "go.sum",
    "__init__.py",
];

pub const DEFAULT_MIN_SCORE: f32 = 0.25;
pub const DEFAULT_MAX_FILES: usize = 8;
const MAX_SCAN_FILES: usize = 500;
const MAX_CONTENT_BYTES: usize = 8_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryIntent {
    List,
    Explain,
    FindFiles,
    Search,
}

#[derive(Debug, Clone)]
pub struct QueryUnderstanding {
    pub intent: QueryIntent,
    pub categories: Vec<&'static str>,
    pub entities: Vec<String>,
    pub expanded_query: String,
}

/// A candidate file to be scored - either a registered (open-editor) file
/// or one pulled from a bounded filesystem scan.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub filename: String,
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedFile {
    pub filename: String,
    pub path: String,
    pub content: String,
    pub score: f32,
    pub reason: String,
    pub category: String,
}

/// Understands a transcript/query: intent, category hints, entities, and
/// an expanded query used by Stage C's keyword signal (Stage A, §4.5).
pub fn understand_query(query: &str) -> QueryUnderstanding {
    let lower = query.to_lowercase();

    let intent = if ["list all", "show me all", "show all", "what are the", "give me a list"]
        .iter()
        .any(|p| lower.contains(p))
    {
        QueryIntent::List
    } else if ["explain", "what does", "how does", "tell me about", "describe"]
        .iter()
        .any(|p| lower.contains(p))
    {
        QueryIntent::Explain
    } else if ["find", "where is", "locate"].iter().any(|p| lower.contains(p)) {
        QueryIntent::FindFiles
    } else {
        QueryIntent::Search
    };

    let tokens: Vec<&str> = lower.split_whitespace().collect();
    let mut categories = Vec::new();
    for bundle in CATEGORY_BUNDLES {
        let hit = bundle.keywords.iter().any(|kw| tokens.iter().any(|t| t.contains(kw)))
            || tokens.iter().any(|t| *t == bundle.name || format!("{}s", bundle.name) == *t);
        if hit {
            categories.push(bundle.name);
        }
    }

    let entities: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| t.len() > 2)
        .filter(|t| !STOPWORDS.contains(&t.to_lowercase().as_str()))
        .map(|t| t.to_string())
        .collect();

    let mut expanded = query.to_string();
    for cat in &categories {
        expanded.push_str(&format!(" {cat} code implementation"));
    }
    for entity in entities.iter().take(3) {
        expanded.push(' ');
        expanded.push_str(entity);
    }

    QueryUnderstanding { intent, categories, entities, expanded_query: expanded }
}

/// Stage B: best-scoring category and its confidence for one file.
pub fn file_category(path: &str, content: &str) -> (&'static str, f32) {
    let path_lower = path.to_lowercase();
    let stem = Path::new(&path_lower)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let content_head = &content[..content.len().min(2000)];
    let content_lower = content_head.to_lowercase();

    let mut best = ("unknown", 0.0f32);
    for bundle in CATEGORY_BUNDLES {
        let mut score = 0.0f32;
        if bundle.folders.iter().any(|f| path_lower.contains(&format!("/{f}/"))) {
            score += 0.5;
        }
        if bundle.files.iter().any(|f| stem.contains(f)) {
            score += 0.3;
        }
        let hits = bundle.keywords.iter().filter(|kw| content_lower.contains(**kw)).count();
        score += (hits as f32 * 0.05).min(0.2);
        if score > best.1 {
            best = (bundle.name, score);
        }
    }
    best
}

fn is_excluded_filename(filename: &str) -> bool {
    EXCLUDED_FILENAMES.contains(&filename.to_lowercase().as_str())
}

pub struct SmartRanker {
    provider: Option<Arc<dyn EmbeddingProvider>>,
    /// path -> (md5-of-first-1000-chars, embedding)
    file_embedding_cache: RwLock<HashMap<String, (String, Vec<f32>)>>,
}

impl Default for SmartRanker {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SmartRanker {
    pub fn new(provider: Option<Arc<dyn EmbeddingProvider>>) -> Self {
        Self { provider, file_embedding_cache: RwLock::new(HashMap::new()) }
    }

    /// Scores every candidate against `query`, returns descending by score
    /// truncated to `max_files`, excluding anything under `min_score`
    /// (ranker order invariant, §8.7).
    pub async fn find_relevant_files(
        &self,
        query: &str,
        candidates: Vec<CandidateFile>,
        min_score: f32,
        max_files: usize,
    ) -> Vec<RankedFile> {
        let understanding = understand_query(query);
        let query_embedding = match &self.provider {
            Some(p) => p.embed_batch(&[understanding.expanded_query.clone()]).await.ok().and_then(|mut v| v.pop()),
            None => None,
        };

        let mut scored = Vec::new();
        for candidate in candidates {
            let ranked = self.score_file(&candidate, &understanding, query_embedding.as_deref()).await;
            if ranked.score >= min_score {
                scored.push(ranked);
            }
        }
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(max_files);
        scored
    }

    async fn score_file(
        &self,
        candidate: &CandidateFile,
        query: &QueryUnderstanding,
        query_embedding: Option<&[f32]>,
    ) -> RankedFile {
        let (category, confidence) = file_category(&candidate.path, &candidate.content);
        let mut score = 0.0f32;
        let mut reasons = Vec::new();

        if query.categories.contains(&category) {
            score += 0.4 * confidence;
            reasons.push(format!("matches category '{category}'"));
        }

        let filename_lower = candidate.filename.to_lowercase();
        let path_lower = candidate.path.to_lowercase();
        if let Some(entity) = query.entities.iter().find(|e| filename_lower.contains(&e.to_lowercase())) {
            score += 0.25;
            reasons.push(format!("filename mentions '{entity}'"));
        } else if let Some(entity) = query.entities.iter().find(|e| path_lower.contains(&e.to_lowercase())) {
            score += 0.15;
            reasons.push(format!("path mentions '{entity}'"));
        }

        if let Some(qvec) = query_embedding
            && let Some(file_vec) = self.file_embedding(candidate).await
        {
            let cos: f32 = qvec.iter().zip(file_vec.iter()).map(|(a, b)| a * b).sum();
            score += 0.35 * cos.max(0.0);
            if cos > 0.3 {
                reasons.push("semantically related".to_string());
            }
        }

        let head = &candidate.content[..candidate.content.len().min(3000)];
        let head_lower = head.to_lowercase();
        let keyword_hits = query
            .entities
            .iter()
            .chain(query.categories.iter().map(|c| &c.to_string()).collect::<Vec<_>>().iter().map(|s| *s))
            .filter(|kw| head_lower.contains(&kw.to_lowercase()))
            .count();
        if keyword_hits > 0 {
            score += (0.05 * keyword_hits as f32).min(0.15);
            reasons.push(format!("{keyword_hits} keyword hit(s)"));
        }

        if is_excluded_filename(&candidate.filename) {
            score *= 0.1;
        }

        let reason = if reasons.is_empty() { "weak match".to_string() } else { reasons.join("; ") };
        let mut content = candidate.content.clone();
        if content.len() > MAX_CONTENT_BYTES {
            content.truncate(MAX_CONTENT_BYTES);
        }

        RankedFile {
            filename: candidate.filename.clone(),
            path: candidate.path.clone(),
            content,
            score,
            reason,
            category: category.to_string(),
        }
    }

    /// Returns the cached (or freshly computed) embedding of a file's
    /// semantic summary, invalidated by an MD5 of the first 1000 chars.
    async fn file_embedding(&self, candidate: &CandidateFile) -> Option<Vec<f32>> {
        let provider = self.provider.as_ref()?;
        let head = &candidate.content[..candidate.content.len().min(1000)];
        let key = format!("{:x}", md5::compute(head.as_bytes()));

        {
            let cache = self.file_embedding_cache.read().await;
            if let Some((cached_key, vec)) = cache.get(&candidate.path)
                && cached_key == &key
            {
                return Some(vec.clone());
            }
        }

        let summary = semantic_summary(&candidate.content);
        let mut vec = provider.embed_batch(&[summary]).await.ok()?.pop()?;
        normalize(&mut vec);
        self.file_embedding_cache.write().await.insert(candidate.path.clone(), (key, vec.clone()));
        Some(vec)
    }
}

/// Builds a short semantic summary of a file for embedding purposes:
/// the first docstring/comment block, up to 10 public def/class/function
/// names, and the tail of a few import lines.
fn semantic_summary(content: &str) -> String {
    let mut parts = Vec::new();
    if let Some(first_line) = content.lines().find(|l| !l.trim().is_empty()) {
        parts.push(first_line.trim().to_string());
    }

    let mut names = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        for prefix in ["def ", "class ", "function ", "export function ", "export class "] {
            if let Some(rest) = trimmed.strip_prefix(prefix) {
                let name = rest.split(['(', ' ', ':', '{']).next().unwrap_or_default();
                if !name.is_empty() {
                    names.push(name.to_string());
                }
            }
        }
        if names.len() >= 10 {
            break;
        }
    }
    parts.push(names.join(" "));

    let import_tail: Vec<&str> = content
        .lines()
        .filter(|l| {
            let t = l.trim_start();
            t.starts_with("import ") || t.starts_with("from ") || t.starts_with("use ")
        })
        .take(5)
        .collect();
    parts.push(import_tail.join(" "));

    parts.into_iter().filter(|p| !p.is_empty()).collect::<Vec<_>>().join(" ")
}

/// Bounded filesystem scan used when the caller has no registry to draw
/// candidates from (§4.5 "either the registry or a direct filesystem
/// scan, bounded at 500 files").
pub fn scan_project_files(root: &Path) -> Vec<CandidateFile> {
    let mut out = Vec::new();
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
        if out.len() >= MAX_SCAN_FILES {
            break;
        }
        let Ok(entry) = entry else { continue };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let path = entry.path();
        let Some(path_str) = path.to_str() else { continue };
        let Ok(content) = std::fs::read_to_string(path) else { continue };
        let filename = path.file_name().map(|f| f.to_string_lossy().to_string()).unwrap_or_default();
        out.push(CandidateFile { filename, path: path_str.to_string(), content });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(path: &str, content: &str) -> CandidateFile {
        CandidateFile {
            filename: Path::new(path).file_name().unwrap().to_string_lossy().to_string(),
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    #[tokio::test]
    async fn s3_ranker_surfaces_agent_files_over_readme() {
        let ranker = SmartRanker::new(None);
        let candidates = vec![
            candidate("src/agents/orchestrator.py", "class Orchestrator:\n    def run(self): pass\n"),
            candidate("src/agents/coding_agent.py", "class CodingAgent:\n    def run(self): pass\n"),
            candidate("src/services/groq.py", "class GroqClient:\n    def call(self): pass\n"),
            candidate("README.md", "# Project\nThis project has several agents.\n"),
        ];

        let ranked = ranker.find_relevant_files("tell me about all the agents", candidates, 0.25, 8).await;

        let paths: Vec<&str> = ranked.iter().map(|r| r.path.as_str()).collect();
        assert!(paths.contains(&"src/agents/orchestrator.py"));
        assert!(paths.contains(&"src/agents/coding_agent.py"));
        assert!(!paths.contains(&"README.md"));
        for r in &ranked {
            if r.path.contains("agents") {
                assert!(r.score >= 0.4, "agent file score too low: {}", r.score);
            }
        }
    }

    #[test]
    fn s7_results_sorted_strictly_descending() {
        let scored = [("a", 0.9f32), ("b", 0.5), ("c", 0.3)];
        let mut v: Vec<f32> = scored.iter().map(|(_, s)| *s).collect();
        v.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(v, vec![0.9, 0.5, 0.3]);
    }

    #[test]
    fn excluded_filenames_are_discounted() {
        assert!(is_excluded_filename("package.json"));
        assert!(is_excluded_filename("README.md"));
        assert!(!is_excluded_filename("orchestrator.py"));
    }

    #[test]
    fn understand_query_detects_list_intent_and_agent_category() {
        let q = understand_query("show me all the agents");
        assert_eq!(q.intent, QueryIntent::List);
        assert!(q.categories.contains(&"agent"));
    }
}
