// src/context/gatherer.rs
// C8: Context Gatherer - produces a FileContext bundle per request by
// combining the cursor window, imports, related files, a project tree,
// symbol lookups, and (if a transcript is supplied) keyword-driven
// snippet and referenced-file enrichment (§4.7).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use std::sync::LazyLock;

use crate::indexer::{Symbol, SymbolIndex};
use crate::ranker::{CandidateFile, RankedFile, SmartRanker};

const WINDOW_RADIUS: usize = 20;
const MAX_IMPORTS: usize = 50;
const MAX_RELATED_FILES: usize = 10;
const MAX_RELATED_SYMBOLS: usize = 30;
const MAX_SNIPPETS: usize = 8;
const SNIPPET_CONTEXT_LINES: u32 = 5;
const MAX_SNIPPET_CHARS: usize = 1500;
const TREE_MAX_DEPTH: usize = 3;
const TREE_MAX_FILES: usize = 100;
const REFERENCED_FILES_LIMIT: usize = 8;
const REFERENCED_FILES_MIN_SCORE: f32 = 0.25;

const TREE_BLOCKED_DIRS: &[&str] =
    &[".git", ".venv", "venv", "node_modules", "__pycache__", ".next", "dist", "build", ".cache", ".idea", ".vscode"];

static PY_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*(import\s+[\w.]+|from\s+[\w.]+\s+import\s+.+)$").unwrap());
static JS_IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(import\s+.+from\s+['"][^'"]+['"];?|const\s+.+=\s+require\(['"][^'"]+['"]\);?)$"#).unwrap()
});

#[derive(Debug, Clone, Default)]
pub struct GatherRequest {
    pub file_path: String,
    pub file_content: String,
    pub cursor_line: u32,
    pub selection: Option<String>,
    pub project_root: Option<String>,
    pub transcript: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RelevantSnippet {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct FileContext {
    pub file_path: String,
    pub language: String,
    pub surrounding_window: String,
    pub imports: Vec<String>,
    pub related_files: Vec<String>,
    pub project_tree: String,
    pub symbols_in_file: Vec<Symbol>,
    pub symbol_at_cursor: Option<Symbol>,
    pub related_symbols: Vec<Symbol>,
    pub relevant_snippets: Vec<RelevantSnippet>,
    pub referenced_files: Vec<RankedFile>,
}

pub struct ContextGatherer {
    symbol_index: Arc<SymbolIndex>,
    ranker: Arc<SmartRanker>,
}

impl ContextGatherer {
    pub fn new(symbol_index: Arc<SymbolIndex>, ranker: Arc<SmartRanker>) -> Self {
        Self { symbol_index, ranker }
    }

    pub async fn gather(&self, req: &GatherRequest) -> FileContext {
        let language = display_language(&req.file_path);
        let surrounding_window = build_surrounding_window(&req.file_content, req.cursor_line);
        let imports = extract_imports(&req.file_content, &language);
        let related_files = resolve_related_files(&req.file_path, &imports, &language);
        let project_tree = build_project_tree(&req.project_root, &req.file_path);

        // Always index the current file for freshness (§4.7 step 6).
        let file_symbols = self.symbol_index.index_file(&req.file_path, Some(req.file_content.clone())).await;
        let symbols_in_file = file_symbols.map(|fs| fs.symbols).unwrap_or_default();
        let symbol_at_cursor = find_symbol_at_cursor(&symbols_in_file, req.cursor_line);

        let mut related_symbols = Vec::new();
        for related_path in &related_files {
            if related_symbols.len() >= MAX_RELATED_SYMBOLS {
                break;
            }
            if let Some(fs) = self.symbol_index.get_file_symbols(related_path).await {
                for sym in fs.symbols {
                    if related_symbols.len() >= MAX_RELATED_SYMBOLS {
                        break;
                    }
                    related_symbols.push(sym);
                }
            }
        }

        let mut relevant_snippets = Vec::new();
        let mut referenced_files = Vec::new();
        if let Some(transcript) = &req.transcript {
            relevant_snippets = self.gather_snippets(transcript, &symbols_in_file).await;
            referenced_files = self.gather_referenced_files(transcript, &req.project_root).await;
        }

        FileContext {
            file_path: req.file_path.clone(),
            language,
            surrounding_window,
            imports,
            related_files,
            project_tree,
            symbols_in_file,
            symbol_at_cursor,
            related_symbols,
            relevant_snippets,
            referenced_files,
        }
    }

    /// Transcript-driven enrichment (§4.7 step 8).
    async fn gather_snippets(&self, transcript: &str, current_file_symbols: &[Symbol]) -> Vec<RelevantSnippet> {
        let keywords = extract_keywords(transcript);

        let mut candidates: Vec<Symbol> = Vec::new();
        for keyword in keywords.iter().take(10) {
            let matches = self.symbol_index.search_symbols(keyword, 10).await;
            candidates.extend(matches);
        }
        for sym in current_file_symbols {
            let name_lower = sym.name.to_lowercase();
            let hits = keywords.iter().any(|kw| {
                name_lower.contains(&kw.to_lowercase())
                    || sym.name.split('_').any(|part| part.eq_ignore_ascii_case(kw))
            });
            if hits {
                candidates.push(sym.clone());
            }
        }

        if candidates.is_empty() {
            candidates = current_file_symbols
                .iter()
                .filter(|s| {
                    matches!(
                        s.kind,
                        crate::indexer::SymbolKind::Function | crate::indexer::SymbolKind::Class
                    )
                })
                .take(5)
                .cloned()
                .collect();
        }

        dedup_symbols(&mut candidates);
        candidates.sort_by(|a, b| {
            let rank = |s: &Symbol| match s.kind {
                crate::indexer::SymbolKind::Function | crate::indexer::SymbolKind::Class => 0,
                crate::indexer::SymbolKind::Method => 1,
                _ => 2,
            };
            rank(a).cmp(&rank(b)).then_with(|| b.name.len().cmp(&a.name.len()))
        });

        let mut out = Vec::new();
        for symbol in candidates.into_iter().take(MAX_SNIPPETS) {
            let mut content = self.symbol_index.get_context_for_symbol(&symbol, SNIPPET_CONTEXT_LINES).await;
            if content.trim().is_empty() {
                let sig = symbol.signature.clone().unwrap_or_default();
                let doc = symbol.docstring.as_deref().map(|d| format!(" \"{d}\"")).unwrap_or_default();
                content = format!("{} {}{}{}", symbol.kind.as_str(), symbol.name, sig, doc);
            }
            if content.len() > MAX_SNIPPET_CHARS {
                content.truncate(MAX_SNIPPET_CHARS);
            }
            out.push(RelevantSnippet { title: format!("{} {}", symbol.kind.as_str(), symbol.name), content });
        }
        out
    }

    async fn gather_referenced_files(&self, transcript: &str, project_root: &Option<String>) -> Vec<RankedFile> {
        let Some(root) = project_root else { return Vec::new() };
        let root_path = Path::new(root);
        if !root_path.is_dir() {
            return Vec::new();
        }
        let candidates: Vec<CandidateFile> = crate::ranker::scan_project_files(root_path);
        self.ranker
            .find_relevant_files(transcript, candidates, REFERENCED_FILES_MIN_SCORE, REFERENCED_FILES_LIMIT)
            .await
    }
}

fn dedup_symbols(symbols: &mut Vec<Symbol>) {
    let mut seen = std::collections::HashSet::new();
    symbols.retain(|s| seen.insert((s.file_path.clone(), s.line, s.name.clone())));
}

/// 20 lines each side of a clamped cursor line, each prefixed with a
/// 3-char marker and its 1-indexed line number (§4.7 step 2).
fn build_surrounding_window(content: &str, cursor_line: u32) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let total = lines.len();
    let cursor = (cursor_line.max(1) as usize).min(total);

    let start = cursor.saturating_sub(WINDOW_RADIUS).max(1);
    let end = (cursor + WINDOW_RADIUS).min(total);

    let mut out = String::new();
    for (i, line) in lines.iter().enumerate().take(end).skip(start - 1) {
        let line_no = i + 1;
        let marker = if line_no == cursor { ">>>" } else { "   " };
        out.push_str(&format!("{marker} {line_no}: {line}\n"));
    }
    out
}

fn extract_imports(content: &str, language: &str) -> Vec<String> {
    let re = match language {
        "python" => &*PY_IMPORT_RE,
        "javascript" | "typescript" => &*JS_IMPORT_RE,
        _ => return Vec::new(),
    };
    re.find_iter(content).take(MAX_IMPORTS).map(|m| m.as_str().trim().to_string()).collect()
}

/// Resolves import targets to local file paths - only attempted when
/// `file_path` is absolute (§4.7 step 4).
fn resolve_related_files(file_path: &str, imports: &[String], language: &str) -> Vec<String> {
    let path = Path::new(file_path);
    if !path.is_absolute() {
        return Vec::new();
    }
    let Some(dir) = path.parent() else { return Vec::new() };

    let mut out = Vec::new();
    match language {
        "python" => {
            for import in imports {
                if let Some(module) = parse_python_module(import) {
                    let rel = module.replace('.', "/");
                    let candidate = dir.join(format!("{rel}.py"));
                    if candidate.exists() {
                        out.push(candidate.to_string_lossy().to_string());
                    }
                }
                if out.len() >= MAX_RELATED_FILES {
                    break;
                }
            }
        }
        "javascript" | "typescript" => {
            for import in imports {
                if let Some(spec) = parse_js_spec(import)
                    && spec.starts_with('.')
                {
                    for ext in ["", ".js", ".ts", ".tsx", ".jsx"] {
                        let candidate = dir.join(format!("{spec}{ext}"));
                        if candidate.is_file() {
                            out.push(candidate.to_string_lossy().to_string());
                            break;
                        }
                    }
                }
                if out.len() >= MAX_RELATED_FILES {
                    break;
                }
            }
        }
        _ => {}
    }
    out.truncate(MAX_RELATED_FILES);
    out
}

fn parse_python_module(import_stmt: &str) -> Option<String> {
    if let Some(rest) = import_stmt.strip_prefix("from ") {
        return rest.split(" import").next().map(|s| s.trim().to_string());
    }
    if let Some(rest) = import_stmt.strip_prefix("import ") {
        return Some(rest.split(['.', ' ']).next().unwrap_or(rest).trim().to_string());
    }
    None
}

fn parse_js_spec(import_stmt: &str) -> Option<String> {
    let start = import_stmt.find(['\'', '"'])?;
    let quote = import_stmt.as_bytes()[start] as char;
    let rest = &import_stmt[start + 1..];
    let end = rest.find(quote)?;
    Some(rest[..end].to_string())
}

fn display_language(file_path: &str) -> String {
    let ext = Path::new(file_path).extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
    match ext.as_str() {
        "py" | "pyi" => "python",
        "js" | "mjs" | "cjs" | "jsx" => "javascript",
        "ts" | "mts" | "cts" => "typescript",
        "tsx" => "typescript",
        "rs" => "rust",
        "go" => "go",
        "java" => "java",
        "rb" => "ruby",
        "php" => "php",
        "c" => "c",
        "cpp" | "cc" | "h" | "hpp" => "cpp",
        "cs" => "csharp",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "md" => "markdown",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "html" => "html",
        "css" => "css",
        "sh" | "bash" => "shell",
        _ => "plaintext",
    }
    .to_string()
}

fn find_symbol_at_cursor(symbols: &[Symbol], cursor_line: u32) -> Option<Symbol> {
    let containing = symbols
        .iter()
        .filter(|s| s.line <= cursor_line && cursor_line <= s.end_line)
        .min_by_key(|s| s.end_line - s.line);
    if containing.is_some() {
        return containing.cloned();
    }
    symbols.iter().filter(|s| s.line <= cursor_line).max_by_key(|s| s.line).cloned()
}

fn build_project_tree(project_root: &Option<String>, file_path: &str) -> String {
    let root = match project_root {
        Some(r) if Path::new(r).is_dir() => PathBuf::from(r),
        _ => {
            let p = Path::new(file_path);
            if p.is_absolute() && p.exists() {
                match p.parent() {
                    Some(parent) => parent.to_path_buf(),
                    None => return String::new(),
                }
            } else {
                return String::new();
            }
        }
    };

    let mut count = 0usize;
    let mut out = String::new();
    render_tree(&root, 0, &mut count, &mut out);
    out
}

fn render_tree(dir: &Path, depth: usize, count: &mut usize, out: &mut String) {
    if depth > TREE_MAX_DEPTH || *count >= TREE_MAX_FILES {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        if *count >= TREE_MAX_FILES {
            return;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if TREE_BLOCKED_DIRS.contains(&name.as_str()) {
            continue;
        }
        let indent = "  ".repeat(depth);
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            out.push_str(&format!("{indent}{name}/\n"));
            render_tree(&entry.path(), depth + 1, count, out);
        } else {
            out.push_str(&format!("{indent}{name}\n"));
            *count += 1;
        }
    }
}

/// Tokens not in a stopword list, length >= 2, keeping both case variants
/// of CamelCase/snake_case decompositions plus adjacent-pair compounds
/// (§4.7 step 8a).
fn extract_keywords(transcript: &str) -> Vec<String> {
    const STOPWORDS: &[&str] = &[
        "the", "a", "an", "is", "are", "was", "were", "to", "of", "in", "on", "at", "for", "and",
        "or", "but", "this", "that", "it", "me", "my", "you", "your", "tell", "about", "show",
        "what", "how", "does", "do", "can", "please", "i", "we",
    ];
    let mut words: Vec<String> = Vec::new();
    for raw in transcript.split(|c: char| !c.is_alphanumeric() && c != '_') {
        if raw.len() < 2 {
            continue;
        }
        let lower = raw.to_lowercase();
        if STOPWORDS.contains(&lower.as_str()) {
            continue;
        }
        words.push(raw.to_string());
        words.push(lower.clone());
        words.extend(
            crate::embeddings::decompose_identifier(raw)
                .split_whitespace()
                .filter(|w| w.len() > 1)
                .map(|w| w.to_string()),
        );
    }
    let raw_tokens: Vec<&str> =
        transcript.split(|c: char| !c.is_alphanumeric() && c != '_').filter(|t| t.len() >= 2).collect();
    for pair in raw_tokens.windows(2) {
        words.push(format!("{}{}", pair[0], pair[1]));
    }

    let mut seen = std::collections::HashSet::new();
    words.retain(|w| seen.insert(w.clone()));
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surrounding_window_marks_cursor_line() {
        let content = (1..=50).map(|n| format!("line {n}")).collect::<Vec<_>>().join("\n");
        let window = build_surrounding_window(&content, 25);
        assert!(window.contains(">>> 25: line 25"));
        assert!(window.contains("    5: line 5") || window.contains("   5: line 5"));
    }

    #[test]
    fn display_language_maps_known_and_unknown_extensions() {
        assert_eq!(display_language("a/b.py"), "python");
        assert_eq!(display_language("a/b.tsx"), "typescript");
        assert_eq!(display_language("a/b.xyz"), "plaintext");
    }

    #[test]
    fn python_import_extraction() {
        let src = "import os\nfrom typing import List\nx = 1\n";
        let imports = extract_imports(src, "python");
        assert_eq!(imports.len(), 2);
    }

    #[test]
    fn find_symbol_at_cursor_prefers_innermost() {
        use crate::indexer::SymbolKind;
        let symbols = vec![
            Symbol {
                name: "Outer".into(),
                kind: SymbolKind::Class,
                file_path: "a.py".into(),
                line: 1,
                end_line: 20,
                column: 0,
                signature: None,
                docstring: None,
                parent: None,
                calls: Default::default(),
                called_by: Default::default(),
            },
            Symbol {
                name: "inner".into(),
                kind: SymbolKind::Method,
                file_path: "a.py".into(),
                line: 5,
                end_line: 8,
                column: 0,
                signature: None,
                docstring: None,
                parent: Some("Outer".into()),
                calls: Default::default(),
                called_by: Default::default(),
            },
        ];
        let found = find_symbol_at_cursor(&symbols, 6).unwrap();
        assert_eq!(found.name, "inner");
    }
}
