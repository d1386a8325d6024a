// src/indexer/parsers/python.rs
// Python language adapter (§4.1).

use std::collections::BTreeSet;
use tree_sitter::{Node, Parser};

use super::trailing_callee_name;
use crate::indexer::symbol::{CallMap, FileSymbols, Language, Symbol, SymbolKind};

pub struct PythonAdapter;

impl super::LanguageAdapter for PythonAdapter {
    fn language(&self) -> Language {
        Language::Python
    }

    fn parse(&self, file_path: &str, source: &str) -> Option<(FileSymbols, CallMap)> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into()).ok()?;
        let tree = parser.parse(source, None)?;
        let root = tree.root_node();

        let mut symbols = Vec::new();
        let mut imports = Vec::new();
        let mut call_map = CallMap::new();

        walk_block(root, source, file_path, None, &mut symbols, &mut imports, &mut call_map);

        Some((
            FileSymbols {
                file_path: file_path.to_string(),
                language: Language::Python,
                symbols,
                imports,
                last_modified: chrono::Utc::now(),
                source_text: Some(source.to_string()),
            },
            call_map,
        ))
    }
}

fn text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

/// Walks the direct statement children of a module or class body,
/// recursing into nested class bodies so methods get the right `parent`.
#[allow(clippy::too_many_arguments)]
fn walk_block(
    node: Node,
    source: &str,
    file_path: &str,
    parent_class: Option<&str>,
    symbols: &mut Vec<Symbol>,
    imports: &mut Vec<String>,
    call_map: &mut CallMap,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "function_definition" => {
                if let Some(sym) = function_symbol(child, source, file_path, parent_class) {
                    collect_calls(child, source, &sym.caller_key().to_string(), call_map);
                    symbols.push(sym);
                }
            }
            "class_definition" => {
                if let Some(name_node) = child.child_by_field_name("name") {
                    let name = text(name_node, source).to_string();
                    let body_text_start = child.start_position().row as u32 + 1;
                    let sym = Symbol {
                        name: name.clone(),
                        kind: SymbolKind::Class,
                        file_path: file_path.to_string(),
                        line: body_text_start,
                        end_line: child.end_position().row as u32 + 1,
                        column: child.start_position().column as u32,
                        signature: Some(format!("class {name}")),
                        docstring: body_docstring(child, source),
                        parent: None,
                        calls: BTreeSet::new(),
                        called_by: BTreeSet::new(),
                    };
                    symbols.push(sym);
                    if let Some(body) = child.child_by_field_name("body") {
                        walk_block(body, source, file_path, Some(&name), symbols, imports, call_map);
                    }
                }
            }
            "import_statement" | "import_from_statement" => {
                imports.push(text(child, source).trim().to_string());
            }
            "expression_statement" if parent_class.is_none() => {
                if let Some(assign) = child.named_child(0)
                    && assign.kind() == "assignment"
                    && let Some(left) = assign.child_by_field_name("left")
                    && left.kind() == "identifier"
                {
                    let name = text(left, source).to_string();
                    if !name.starts_with('_') {
                        symbols.push(Symbol {
                            name,
                            kind: SymbolKind::Variable,
                            file_path: file_path.to_string(),
                            line: child.start_position().row as u32 + 1,
                            end_line: child.end_position().row as u32 + 1,
                            column: child.start_position().column as u32,
                            signature: None,
                            docstring: None,
                            parent: None,
                            calls: BTreeSet::new(),
                            called_by: BTreeSet::new(),
                        });
                    }
                }
            }
            _ => {}
        }
    }
}

fn function_symbol(node: Node, source: &str, file_path: &str, parent_class: Option<&str>) -> Option<Symbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = text(name_node, source).to_string();
    let params = node
        .child_by_field_name("parameters")
        .map(|p| text(p, source).to_string())
        .unwrap_or_else(|| "()".to_string());
    let signature = Symbol::truncate_signature(format!("def {name}{params}"));
    let kind = if parent_class.is_some() { SymbolKind::Method } else { SymbolKind::Function };

    Some(Symbol {
        name,
        kind,
        file_path: file_path.to_string(),
        line: node.start_position().row as u32 + 1,
        end_line: node.end_position().row as u32 + 1,
        column: node.start_position().column as u32,
        signature: Some(signature),
        docstring: body_docstring(node, source),
        parent: parent_class.map(|s| s.to_string()),
        calls: BTreeSet::new(),
        called_by: BTreeSet::new(),
    })
}

/// First statement in `node`'s body if it is a standalone string literal;
/// quote delimiters (triple or single) are stripped, the inner text
/// trimmed, then truncated to 200 chars.
fn body_docstring(node: Node, source: &str) -> Option<String> {
    let body = node.child_by_field_name("body")?;
    let first = body.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    let raw = text(expr, source);
    Some(Symbol::truncate_docstring(strip_string_delimiters(raw)))
}

fn strip_string_delimiters(raw: &str) -> String {
    let mut s = raw.trim();
    // Strip an optional string-prefix letter (r, b, f, u) before the quotes.
    if let Some(rest) = s.strip_prefix(['r', 'R', 'b', 'B', 'f', 'F', 'u', 'U'])
        && rest.starts_with(['"', '\''])
    {
        s = rest;
    }
    for delim in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = s.strip_prefix(delim)
            && let Some(inner) = inner.strip_suffix(delim)
        {
            return inner.trim().to_string();
        }
    }
    s.trim().to_string()
}

/// Traverses a function-bodied node's subtree, recording every call's
/// callee name (deduplicated) under `caller_key` in `call_map`.
fn collect_calls(node: Node, source: &str, caller_key: &str, call_map: &mut CallMap) {
    let mut callees = BTreeSet::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.kind() == "call"
            && let Some(func) = n.child_by_field_name("function")
        {
            callees.insert(trailing_callee_name(text(func, source)));
        }
        let mut cursor = n.walk();
        for child in n.children(&mut cursor) {
            stack.push(child);
        }
    }
    if !callees.is_empty() {
        call_map.entry(caller_key.to_string()).or_default().extend(callees);
    }
}

#[cfg(test)]
mod tests {
    use super::super::LanguageAdapter;
    use super::*;

    const SRC: &str = "# m.py\ndef greet(name):\n    \"say hello\"\n    return f\"Hi, {name}\"\n\nclass Foo:\n    def bar(self): return 1\n";

    #[test]
    fn s1_python_function_detection() {
        let (fs, _) = PythonAdapter.parse("m.py", SRC).unwrap();
        let greet = fs.symbols.iter().find(|s| s.name == "greet").unwrap();
        assert_eq!(greet.kind, SymbolKind::Function);
        assert_eq!(greet.line, 2);
        assert_eq!(greet.end_line, 4);
        assert_eq!(greet.signature.as_deref(), Some("def greet(name)"));
        assert_eq!(greet.docstring.as_deref(), Some("say hello"));

        let bar = fs.symbols.iter().find(|s| s.name == "bar").unwrap();
        assert_eq!(bar.kind, SymbolKind::Method);
        assert_eq!(bar.parent.as_deref(), Some("Foo"));

        let foo = fs.symbols.iter().find(|s| s.name == "Foo").unwrap();
        assert_eq!(foo.kind, SymbolKind::Class);
    }

    #[test]
    fn s2_call_graph_extraction() {
        let src = "def a():\n    b()\n    c()\n\ndef b():\n    pass\n\ndef c():\n    pass\n";
        let (_, calls) = PythonAdapter.parse("m.py", src).unwrap();
        let a_calls = calls.get("a").unwrap();
        assert!(a_calls.contains("b"));
        assert!(a_calls.contains("c"));
    }

    #[test]
    fn module_level_variable_and_import() {
        let src = "import os\nfrom typing import List\n\nX = 1\n_hidden = 2\n";
        let (fs, _) = PythonAdapter.parse("m.py", src).unwrap();
        assert_eq!(fs.imports.len(), 2);
        assert!(fs.symbols.iter().any(|s| s.name == "X" && s.kind == SymbolKind::Variable));
        assert!(!fs.symbols.iter().any(|s| s.name == "_hidden"));
    }
}
