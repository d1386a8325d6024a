// src/indexer/symbol_index.rs
// C2: in-memory multi-key index of symbols + call graph (§4.2).
//
// Single-writer/multi-reader discipline (§5): the whole index lives behind
// one `tokio::sync::RwLock`; a per-file re-index takes the write guard once
// and performs the atomic remove-then-insert under that single guard, so a
// reader observes either the pre-replace or the post-replace state, never
// a hybrid (invariant 3, §8).

use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::indexer::parsers;
use crate::indexer::symbol::{CallMap, FileSymbols, Language, Symbol, SymbolKind};

/// Directories the project walk never descends into (§4.2).
pub const BLOCKED_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    ".git",
    ".venv",
    "venv",
    "dist",
    "build",
    ".next",
    ".cache",
    "coverage",
];

#[derive(Default)]
struct IndexState {
    by_name: HashMap<String, Vec<Symbol>>,
    by_file: HashMap<String, FileSymbols>,
    by_kind: HashMap<SymbolKind, Vec<Symbol>>,
    call_graph: HashMap<String, BTreeSet<String>>,
    reverse_call_graph: HashMap<String, BTreeSet<String>>,
}

pub struct SymbolIndex {
    state: RwLock<IndexState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainDirection {
    Callers,
    Callees,
}

impl Default for SymbolIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self { state: RwLock::new(IndexState::default()) }
    }

    /// Parses `path` (reading `text` if given, else from disk) and atomically
    /// replaces that file's slice of every map. Returns `None` if the
    /// language is unsupported or the parse failed - non-fatal, per §4.1.
    pub async fn index_file(&self, path: &str, text: Option<String>) -> Option<FileSymbols> {
        let source = match text {
            Some(t) => t,
            None => match tokio::fs::read_to_string(path).await {
                Ok(t) => t,
                Err(e) => {
                    warn!(path, error = %e, "failed to read file for indexing");
                    return None;
                }
            },
        };

        let (file_symbols, call_map) = match parsers::parse_file(path, &source) {
            Some(v) => v,
            None => {
                debug!(path, "skipped (unsupported language or parse failure)");
                return None;
            }
        };

        let mut state = self.state.write().await;
        state.replace_file(path, file_symbols.clone(), call_map);
        Some(file_symbols)
    }

    /// Removes a file's symbols and derived entries entirely (watcher
    /// `deleted` handling, §4.6). Routed through the same atomic-remove
    /// path `index_file` uses, so invariants 1-4 hold across deletes too.
    pub async fn remove_file(&self, path: &str) {
        let mut state = self.state.write().await;
        state.remove_file(path);
    }

    /// Walks `root`, skipping blocklisted directories and files whose
    /// extension is unsupported, indexing up to `max_files` files. Returns
    /// the count of files successfully indexed.
    pub async fn index_project(&self, root: &Path, max_files: usize) -> usize {
        let mut count = 0usize;
        let walker = ignore::WalkBuilder::new(root)
            .hidden(false)
            .filter_entry(|entry| {
                if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    let name = entry.file_name().to_string_lossy();
                    return !BLOCKED_DIRS.contains(&name.as_ref());
                }
                true
            })
            .build();

        for entry in walker {
            if count >= max_files {
                break;
            }
            let Ok(entry) = entry else { continue };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let path = entry.path();
            let Some(path_str) = path.to_str() else { continue };
            if Language::from_path(path_str).is_none() {
                continue;
            }
            if self.index_file(path_str, None).await.is_some() {
                count += 1;
            }
        }
        count
    }

    pub async fn find_symbol(&self, name: &str) -> Vec<Symbol> {
        let state = self.state.read().await;
        state.by_name.get(name).cloned().unwrap_or_default()
    }

    pub async fn find_by_kind(&self, kind: SymbolKind) -> Vec<Symbol> {
        let state = self.state.read().await;
        state.by_kind.get(&kind).cloned().unwrap_or_default()
    }

    pub async fn get_file_symbols(&self, path: &str) -> Option<FileSymbols> {
        let state = self.state.read().await;
        state.by_file.get(path).cloned()
    }

    /// Scores every known name against `query`: exact=100, prefix=80,
    /// substring=60, word-boundary prefix on an underscore-split piece=50,
    /// else excluded. Sorted descending by score, ties by name ascending.
    pub async fn search_symbols(&self, query: &str, limit: usize) -> Vec<Symbol> {
        let state = self.state.read().await;
        let q = query.to_lowercase();

        let mut scored: Vec<(i32, String)> = state
            .by_name
            .keys()
            .filter_map(|name| score_name(name, &q).map(|score| (score, name.clone())))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

        let mut out = Vec::new();
        for (_, name) in scored {
            if out.len() >= limit {
                break;
            }
            if let Some(syms) = state.by_name.get(&name) {
                for s in syms {
                    if out.len() >= limit {
                        break;
                    }
                    out.push(s.clone());
                }
            }
        }
        out
    }

    /// Returns source spanning `[symbol.line - context_lines, symbol.end_line
    /// + context_lines]`, reading cached text from the index if available,
    /// else re-reading the file from disk.
    pub async fn get_context_for_symbol(&self, symbol: &Symbol, context_lines: u32) -> String {
        let cached = {
            let state = self.state.read().await;
            state
                .by_file
                .get(&symbol.file_path)
                .and_then(|fs| fs.source_text.clone())
        };
        let source = match cached {
            Some(s) => s,
            None => tokio::fs::read_to_string(&symbol.file_path).await.unwrap_or_default(),
        };
        if source.is_empty() {
            return String::new();
        }
        let lines: Vec<&str> = source.lines().collect();
        let start = symbol.line.saturating_sub(context_lines).max(1) as usize;
        let end = (symbol.end_line + context_lines) as usize;
        let start_idx = start.saturating_sub(1).min(lines.len());
        let end_idx = end.min(lines.len());
        if start_idx >= end_idx {
            return String::new();
        }
        lines[start_idx..end_idx].join("\n")
    }

    pub async fn get_callers(&self, name: &str) -> Vec<String> {
        let state = self.state.read().await;
        state.reverse_call_graph.get(name).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    pub async fn get_callees(&self, name: &str) -> Vec<String> {
        let state = self.state.read().await;
        state.call_graph.get(name).map(|s| s.iter().cloned().collect()).unwrap_or_default()
    }

    /// DFS with a visited set (cycle prevention) and a hard depth cap.
    /// Returns `(name, depth)` pairs reachable from `name`, excluding the
    /// start node itself.
    pub async fn get_call_chain(&self, name: &str, direction: ChainDirection, max_depth: u32) -> Vec<(String, u32)> {
        let state = self.state.read().await;
        let graph = match direction {
            ChainDirection::Callers => &state.reverse_call_graph,
            ChainDirection::Callees => &state.call_graph,
        };

        let mut visited = BTreeSet::new();
        visited.insert(name.to_string());
        let mut out = Vec::new();
        let mut stack = vec![(name.to_string(), 0u32)];
        while let Some((current, depth)) = stack.pop() {
            if depth >= max_depth {
                continue;
            }
            let Some(neighbors) = graph.get(&current) else { continue };
            for next in neighbors {
                if visited.insert(next.clone()) {
                    out.push((next.clone(), depth + 1));
                    stack.push((next.clone(), depth + 1));
                }
            }
        }
        out
    }

    #[cfg(test)]
    pub(crate) async fn snapshot_counts(&self) -> (usize, usize, usize) {
        let state = self.state.read().await;
        (state.by_name.len(), state.by_file.len(), state.by_kind.len())
    }
}

impl IndexState {
    fn remove_file(&mut self, path: &str) {
        let Some(old) = self.by_file.remove(path) else { return };
        for sym in &old.symbols {
            if let Some(bucket) = self.by_name.get_mut(&sym.name) {
                bucket.retain(|s| !(s.file_path == sym.file_path && s.line == sym.line));
                if bucket.is_empty() {
                    self.by_name.remove(&sym.name);
                }
            }
            if let Some(bucket) = self.by_kind.get_mut(&sym.kind) {
                bucket.retain(|s| !(s.file_path == sym.file_path && s.line == sym.line));
                if bucket.is_empty() {
                    self.by_kind.remove(&sym.kind);
                }
            }
            self.call_graph.remove(sym.caller_key());
        }
        self.rebuild_reverse_graph();
    }

    fn replace_file(&mut self, path: &str, new_file: FileSymbols, call_map: CallMap) {
        self.remove_file(path);

        for sym in &new_file.symbols {
            self.by_name.entry(sym.name.clone()).or_default().push(sym.clone());
            self.by_kind.entry(sym.kind).or_default().push(sym.clone());
        }

        for (caller, callees) in call_map {
            let filtered: BTreeSet<String> = callees.into_iter().filter(|c| self.by_name.contains_key(c)).collect();
            if !filtered.is_empty() {
                self.call_graph.entry(caller).or_default().extend(filtered);
            }
        }

        self.by_file.insert(path.to_string(), new_file);
        self.rebuild_reverse_graph();
    }

    fn rebuild_reverse_graph(&mut self) {
        self.reverse_call_graph.clear();
        for (caller, callees) in &self.call_graph {
            for callee in callees {
                self.reverse_call_graph.entry(callee.clone()).or_default().insert(caller.clone());
            }
        }
    }
}

fn score_name(name: &str, query_lower: &str) -> Option<i32> {
    let name_lower = name.to_lowercase();
    if name_lower == query_lower {
        return Some(100);
    }
    if name_lower.starts_with(query_lower) {
        return Some(80);
    }
    if name_lower.contains(query_lower) {
        return Some(60);
    }
    if name.split('_').any(|part| part.to_lowercase().starts_with(query_lower)) {
        return Some(50);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: &str = "# m.py\ndef greet(name):\n    \"say hello\"\n    return f\"Hi, {name}\"\n\nclass Foo:\n    def bar(self): return 1\n";

    #[tokio::test]
    async fn s1_index_file_and_search() {
        let index = SymbolIndex::new();
        index.index_file("m.py", Some(SRC.to_string())).await.unwrap();

        let greet = index.find_symbol("greet").await;
        assert_eq!(greet.len(), 1);
        assert_eq!(greet[0].line, 2);

        let found = index.search_symbols("gre", 5).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "greet");
    }

    #[tokio::test]
    async fn s2_call_chain() {
        let index = SymbolIndex::new();
        let src = "def a():\n    b()\n    c()\n\ndef b():\n    pass\n\ndef c():\n    pass\n";
        index.index_file("m.py", Some(src.to_string())).await.unwrap();

        let callees = index.get_callees("a").await;
        assert!(callees.contains(&"b".to_string()));
        assert!(callees.contains(&"c".to_string()));

        let callers = index.get_callers("b").await;
        assert_eq!(callers, vec!["a".to_string()]);

        let chain = index.get_call_chain("a", ChainDirection::Callees, 2).await;
        let names: Vec<&str> = chain.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&"b"));
        assert!(names.contains(&"c"));
    }

    #[tokio::test]
    async fn reindex_is_atomic_no_stale_lines() {
        let index = SymbolIndex::new();
        index.index_file("m.py", Some(SRC.to_string())).await.unwrap();
        let new_src = "def greet(name, extra):\n    return name\n";
        index.index_file("m.py", Some(new_src.to_string())).await.unwrap();

        let greet = index.find_symbol("greet").await;
        assert_eq!(greet.len(), 1);
        assert_eq!(greet[0].line, 1);
        // Foo/bar no longer exist anywhere.
        assert!(index.find_symbol("Foo").await.is_empty());
        assert!(index.find_symbol("bar").await.is_empty());
    }

    #[tokio::test]
    async fn remove_file_purges_call_graph() {
        let index = SymbolIndex::new();
        let src = "def a():\n    b()\n\ndef b():\n    pass\n";
        index.index_file("m.py", Some(src.to_string())).await.unwrap();
        index.remove_file("m.py").await;
        assert!(index.get_callees("a").await.is_empty());
        assert!(index.get_callers("b").await.is_empty());
        let (names, files, kinds) = index.snapshot_counts().await;
        assert_eq!((names, files, kinds), (0, 0, 0));
    }
}
