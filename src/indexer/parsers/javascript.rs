// src/indexer/parsers/javascript.rs
// JavaScript/TypeScript/TSX language adapters (§4.1). All three grammars
// share the traversal below; only the grammar handed to the parser differs.

use std::collections::BTreeSet;
use tree_sitter::{Node, Parser};

use super::trailing_callee_name;
use crate::indexer::symbol::{CallMap, FileSymbols, Language, Symbol, SymbolKind};

pub struct JavaScriptAdapter;
pub struct TypeScriptAdapter;
pub struct TsxAdapter;

impl super::LanguageAdapter for JavaScriptAdapter {
    fn language(&self) -> Language {
        Language::JavaScript
    }
    fn parse(&self, file_path: &str, source: &str) -> Option<(FileSymbols, CallMap)> {
        parse_with(Language::JavaScript, tree_sitter_javascript::LANGUAGE.into(), file_path, source)
    }
}

impl super::LanguageAdapter for TypeScriptAdapter {
    fn language(&self) -> Language {
        Language::TypeScript
    }
    fn parse(&self, file_path: &str, source: &str) -> Option<(FileSymbols, CallMap)> {
        parse_with(
            Language::TypeScript,
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            file_path,
            source,
        )
    }
}

impl super::LanguageAdapter for TsxAdapter {
    fn language(&self) -> Language {
        Language::Tsx
    }
    fn parse(&self, file_path: &str, source: &str) -> Option<(FileSymbols, CallMap)> {
        parse_with(Language::Tsx, tree_sitter_typescript::LANGUAGE_TSX.into(), file_path, source)
    }
}

fn parse_with(
    language: Language,
    grammar: tree_sitter::Language,
    file_path: &str,
    source: &str,
) -> Option<(FileSymbols, CallMap)> {
    let mut parser = Parser::new();
    parser.set_language(&grammar).ok()?;
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();

    let mut symbols = Vec::new();
    let mut imports = Vec::new();
    let mut call_map = CallMap::new();

    walk(root, source, file_path, None, &mut symbols, &mut imports, &mut call_map);

    Some((
        FileSymbols {
            file_path: file_path.to_string(),
            language,
            symbols,
            imports,
            last_modified: chrono::Utc::now(),
            source_text: Some(source.to_string()),
        },
        call_map,
    ))
}

fn text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or_default()
}

#[allow(clippy::too_many_arguments)]
fn walk(
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
            // `export` is transparent - recurse into its child.
            "export_statement" => {
                if let Some(inner) = child.named_child(0) {
                    walk_single(inner, source, file_path, parent_class, symbols, imports, call_map);
                }
            }
            _ => walk_single(child, source, file_path, parent_class, symbols, imports, call_map),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn walk_single(
    child: Node,
    source: &str,
    file_path: &str,
    parent_class: Option<&str>,
    symbols: &mut Vec<Symbol>,
    imports: &mut Vec<String>,
    call_map: &mut CallMap,
) {
    match child.kind() {
        "function_declaration" | "generator_function_declaration" => {
            if let Some(sym) = function_decl_symbol(child, source, file_path) {
                collect_calls(child, source, sym.caller_key().to_string(), call_map);
                symbols.push(sym);
            }
        }
        "variable_declaration" | "lexical_declaration" => {
            for sym in variable_function_symbols(child, source, file_path) {
                collect_calls(child, source, sym.caller_key().to_string(), call_map);
                symbols.push(sym);
            }
        }
        "class_declaration" => {
            if let Some(name_node) = child.child_by_field_name("name") {
                let name = text(name_node, source).to_string();
                symbols.push(Symbol {
                    name: name.clone(),
                    kind: SymbolKind::Class,
                    file_path: file_path.to_string(),
                    line: child.start_position().row as u32 + 1,
                    end_line: child.end_position().row as u32 + 1,
                    column: child.start_position().column as u32,
                    signature: Some(format!("class {name}")),
                    docstring: None,
                    parent: None,
                    calls: BTreeSet::new(),
                    called_by: BTreeSet::new(),
                });
                if let Some(body) = child.child_by_field_name("body") {
                    let mut cursor = body.walk();
                    for member in body.named_children(&mut cursor) {
                        if member.kind() == "method_definition"
                            && let Some(sym) = method_symbol(member, source, file_path, &name)
                        {
                            collect_calls(member, source, sym.caller_key().to_string(), call_map);
                            symbols.push(sym);
                        }
                    }
                }
            }
        }
        "interface_declaration" => {
            if let Some(name_node) = child.child_by_field_name("name") {
                push_bare(symbols, child, source, name_node, file_path, SymbolKind::Interface);
            }
        }
        "type_alias_declaration" => {
            if let Some(name_node) = child.child_by_field_name("name") {
                push_bare(symbols, child, source, name_node, file_path, SymbolKind::Type);
            }
        }
        "import_statement" => {
            imports.push(text(child, source).trim().to_string());
        }
        _ => {}
    }
}

fn push_bare(symbols: &mut Vec<Symbol>, node: Node, source: &str, name_node: Node, file_path: &str, kind: SymbolKind) {
    let name = text(name_node, source).to_string();
    symbols.push(Symbol {
        name,
        kind,
        file_path: file_path.to_string(),
        line: node.start_position().row as u32 + 1,
        end_line: node.end_position().row as u32 + 1,
        column: node.start_position().column as u32,
        signature: Some(text(node, source).lines().next().unwrap_or_default().trim().to_string()),
        docstring: None,
        parent: None,
        calls: BTreeSet::new(),
        called_by: BTreeSet::new(),
    });
}

fn function_decl_symbol(node: Node, source: &str, file_path: &str) -> Option<Symbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = text(name_node, source).to_string();
    let params = node
        .child_by_field_name("parameters")
        .map(|p| text(p, source).to_string())
        .unwrap_or_else(|| "()".to_string());
    Some(Symbol {
        name: name.clone(),
        kind: SymbolKind::Function,
        file_path: file_path.to_string(),
        line: node.start_position().row as u32 + 1,
        end_line: node.end_position().row as u32 + 1,
        column: node.start_position().column as u32,
        signature: Some(Symbol::truncate_signature(format!("function {name}{params}"))),
        docstring: None,
        parent: None,
        calls: BTreeSet::new(),
        called_by: BTreeSet::new(),
    })
}

fn method_symbol(node: Node, source: &str, file_path: &str, parent_class: &str) -> Option<Symbol> {
    let name_node = node.child_by_field_name("name")?;
    let name = text(name_node, source).to_string();
    let params = node
        .child_by_field_name("parameters")
        .map(|p| text(p, source).to_string())
        .unwrap_or_else(|| "()".to_string());
    Some(Symbol {
        name: name.clone(),
        kind: SymbolKind::Method,
        file_path: file_path.to_string(),
        line: node.start_position().row as u32 + 1,
        end_line: node.end_position().row as u32 + 1,
        column: node.start_position().column as u32,
        signature: Some(Symbol::truncate_signature(format!("{name}{params}"))),
        docstring: None,
        parent: Some(parent_class.to_string()),
        calls: BTreeSet::new(),
        called_by: BTreeSet::new(),
    })
}

/// `const NAME = (...) => ...` or `const NAME = function(...) {...}` -
/// kind `function`, signature `"const NAME = (...) =>"`.
fn variable_function_symbols(node: Node, source: &str, file_path: &str) -> Vec<Symbol> {
    let mut out = Vec::new();
    let mut cursor = node.walk();
    for declarator in node.named_children(&mut cursor) {
        if declarator.kind() != "variable_declarator" {
            continue;
        }
        let Some(name_node) = declarator.child_by_field_name("name") else { continue };
        let Some(value) = declarator.child_by_field_name("value") else { continue };
        if !matches!(value.kind(), "arrow_function" | "function" | "function_expression") {
            continue;
        }
        let name = text(name_node, source).to_string();
        let params = value
            .child_by_field_name("parameters")
            .map(|p| text(p, source).to_string())
            .unwrap_or_else(|| "()".to_string());
        let signature = if value.kind() == "arrow_function" {
            format!("const {name} = {params} =>")
        } else {
            format!("const {name} = function{params}")
        };
        out.push(Symbol {
            name,
            kind: SymbolKind::Function,
            file_path: file_path.to_string(),
            line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            column: node.start_position().column as u32,
            signature: Some(Symbol::truncate_signature(signature)),
            docstring: None,
            parent: None,
            calls: BTreeSet::new(),
            called_by: BTreeSet::new(),
        });
    }
    out
}

fn collect_calls(node: Node, source: &str, caller_key: String, call_map: &mut CallMap) {
    let mut callees = BTreeSet::new();
    let mut stack = vec![node];
    while let Some(n) = stack.pop() {
        if n.kind() == "call_expression"
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
        call_map.entry(caller_key).or_default().extend(callees);
    }
}

#[cfg(test)]
mod tests {
    use super::super::LanguageAdapter;
    use super::*;

    #[test]
    fn detects_function_declaration_and_arrow_const() {
        let src = "export function greet(name) {\n  return helper(name);\n}\n\nconst add = (a, b) => a + b;\n";
        let (fs, calls) = JavaScriptAdapter.parse("m.js", src).unwrap();
        assert!(fs.symbols.iter().any(|s| s.name == "greet" && s.kind == SymbolKind::Function));
        assert!(fs.symbols.iter().any(|s| s.name == "add" && s.kind == SymbolKind::Function));
        assert!(calls.get("greet").map(|c| c.contains("helper")).unwrap_or(false));
    }

    #[test]
    fn detects_class_with_methods() {
        let src = "class Foo {\n  bar() {\n    return 1;\n  }\n}\n";
        let (fs, _) = JavaScriptAdapter.parse("m.js", src).unwrap();
        assert!(fs.symbols.iter().any(|s| s.name == "Foo" && s.kind == SymbolKind::Class));
        let bar = fs.symbols.iter().find(|s| s.name == "bar").unwrap();
        assert_eq!(bar.kind, SymbolKind::Method);
        assert_eq!(bar.parent.as_deref(), Some("Foo"));
    }

    #[test]
    fn typescript_interface_and_type() {
        let src = "interface Point { x: number; y: number; }\ntype Id = string;\n";
        let (fs, _) = TypeScriptAdapter.parse("m.ts", src).unwrap();
        assert!(fs.symbols.iter().any(|s| s.name == "Point" && s.kind == SymbolKind::Interface));
        assert!(fs.symbols.iter().any(|s| s.name == "Id" && s.kind == SymbolKind::Type));
    }
}
