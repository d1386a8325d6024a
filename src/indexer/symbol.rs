// src/indexer/symbol.rs
// Core data model for C1/C2: Symbol, FileSymbols, and the supported
// language enum shared by every adapter.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Kind of a recovered definition (§3 DATA MODEL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Type,
    Variable,
    Import,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Variable => "variable",
            SymbolKind::Import => "import",
        }
    }
}

/// The languages the indexer understands (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Tsx,
}

impl Language {
    /// Maps a file extension (without the leading dot) to its language,
    /// or `None` if the extension is unsupported - the adapter's
    /// "language unsupported" outcome is modeled at this boundary.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" | "pyi" => Some(Language::Python),
            "js" | "mjs" | "cjs" | "jsx" => Some(Language::JavaScript),
            "ts" | "mts" | "cts" => Some(Language::TypeScript),
            "tsx" => Some(Language::Tsx),
            _ => None,
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let ext = std::path::Path::new(path).extension()?.to_str()?;
        Self::from_extension(ext)
    }
}

/// An immutable record of a named definition, recovered from an AST
/// (§3 DATA MODEL). Identity for dedup purposes is `(file_path, line, name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub file_path: String,
    /// 1-indexed.
    pub line: u32,
    pub end_line: u32,
    /// 0-indexed.
    pub column: u32,
    pub signature: Option<String>,
    pub docstring: Option<String>,
    pub parent: Option<String>,
    pub calls: BTreeSet<String>,
    /// Populated on read by the index from `reverse_call_graph`; empty on
    /// a freshly-parsed symbol.
    pub called_by: BTreeSet<String>,
}

pub const MAX_SIGNATURE_LEN: usize = 256;
pub const MAX_DOCSTRING_LEN: usize = 200;

impl Symbol {
    /// 16-hex-digit truncated MD5 of the identity tuple `(file_path, line, name)`.
    pub fn stable_id(&self) -> String {
        stable_id(&self.file_path, self.line, &self.name)
    }

    /// The key under which this symbol's outgoing calls live in the call
    /// graph: the enclosing class name if set, else the symbol's own name.
    /// (Per §4.1: "Caller key ... is `parent.name` if parent is set else
    /// `name`" - this crate treats the qualified caller key as simply the
    /// symbol's own unqualified name, since the call graph is itself keyed
    /// unqualified per the preserved §9 quirk.)
    pub fn caller_key(&self) -> &str {
        &self.name
    }

    pub fn truncate_signature(mut sig: String) -> String {
        if sig.len() > MAX_SIGNATURE_LEN {
            sig.truncate(MAX_SIGNATURE_LEN);
        }
        sig
    }

    pub fn truncate_docstring(mut doc: String) -> String {
        if doc.len() > MAX_DOCSTRING_LEN {
            doc.truncate(MAX_DOCSTRING_LEN);
        }
        doc
    }
}

pub fn stable_id(file_path: &str, line: u32, name: &str) -> String {
    let key = format!("{file_path}:{line}:{name}");
    let digest = md5::compute(key.as_bytes());
    let hex = format!("{digest:x}");
    hex[..16].to_string()
}

/// Per-file bundle of symbols in source order plus raw import statements
/// (§3 DATA MODEL).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSymbols {
    pub file_path: String,
    pub language: Language,
    pub symbols: Vec<Symbol>,
    pub imports: Vec<String>,
    pub last_modified: chrono::DateTime<chrono::Utc>,
    /// Cached source text, used by `get_context_for_symbol` when the file
    /// can no longer be re-read from disk (e.g. an unsaved editor buffer).
    pub source_text: Option<String>,
}

/// Map of `caller_name -> callee_names` produced by a single adapter run,
/// before it is merged into the project-wide call graph.
pub type CallMap = std::collections::HashMap<String, BTreeSet<String>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_id_is_16_hex_chars() {
        let id = stable_id("m.py", 2, "greet");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn stable_id_is_deterministic_and_sensitive_to_each_field() {
        let a = stable_id("m.py", 2, "greet");
        let b = stable_id("m.py", 2, "greet");
        let c = stable_id("m.py", 3, "greet");
        let d = stable_id("n.py", 2, "greet");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn language_from_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("tsx"), Some(Language::Tsx));
        assert_eq!(Language::from_extension("rs"), None);
    }
}
