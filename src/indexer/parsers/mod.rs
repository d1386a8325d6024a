// src/indexer/parsers/mod.rs
// Adapter registry (§9 DESIGN NOTES: "Dynamic dispatch across language
// adapters is best expressed as a small capability interface"). One
// `LanguageAdapter` implementation per language, selected through a fixed
// extension->language->adapter table built once.

mod javascript;
mod python;

use crate::indexer::symbol::{CallMap, FileSymbols, Language};

/// Parses one source file into symbols plus an intra-file call map, or
/// reports the file's language as unsupported. Adapters never propagate
/// parse failures to the caller - a parse failure yields `None` and is
/// logged by the caller, never a panic or an `Err`.
pub trait LanguageAdapter: Send + Sync {
    fn language(&self) -> Language;
    fn parse(&self, file_path: &str, source: &str) -> Option<(FileSymbols, CallMap)>;
}

pub fn adapter_for(language: Language) -> &'static dyn LanguageAdapter {
    match language {
        Language::Python => &python::PythonAdapter,
        Language::JavaScript => &javascript::JavaScriptAdapter,
        Language::TypeScript => &javascript::TypeScriptAdapter,
        Language::Tsx => &javascript::TsxAdapter,
    }
}

/// Convenience entry point: resolves the language from the file's
/// extension, then dispatches. Returns `None` for both "extension
/// unsupported" and "parse failed" - the Symbol Index treats both as
/// "skip this file" (§4.1 failure semantics).
pub fn parse_file(file_path: &str, source: &str) -> Option<(FileSymbols, CallMap)> {
    let language = Language::from_path(file_path)?;
    adapter_for(language).parse(file_path, source)
}

/// Shared helper: extract the trailing callee name from a call expression's
/// function text - the bare identifier, or the text after the last `.`
/// (covers both Python attribute access and JS/TS member access).
pub(crate) fn trailing_callee_name(text: &str) -> String {
    text.rsplit(['.', '?']).next().unwrap_or(text).to_string()
}

#[cfg(test)]
mod shared_tests {
    use super::*;

    #[test]
    fn trailing_name_strips_qualification() {
        assert_eq!(trailing_callee_name("self.helper"), "helper");
        assert_eq!(trailing_callee_name("obj.method"), "method");
        assert_eq!(trailing_callee_name("bare"), "bare");
    }
}
