//! Python extraction on the tree-sitter grammar.
//!
//! Only the documentation surface is visited: module-level functions and
//! classes, and the functions / classes declared directly inside a class
//! body. Functions nested in function bodies are skipped.

use tree_sitter::{Node, Parser};

use crate::errors::ExtractError;
use crate::indexer::extractor::LanguageExtractor;
use crate::indexer::params::normalize_type_name;
use crate::indexer::scanner::detect_deprecation;
use crate::models::{Parameter, Signature, Symbol, SymbolKind};

#[derive(Debug, Default, Clone, Copy)]
pub struct PythonExtractor;

fn node_text<'a>(node: Node<'_>, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or_default()
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// First node (pre-order) that is an `ERROR` or a missing token.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error())
        .find_map(first_error)
}

// ---------------------------------------------------------------------------
// Docstrings
// ---------------------------------------------------------------------------

/// Strip the prefix and quotes of a string literal. f-strings and byte
/// strings are not docstrings.
fn string_literal_body(text: &str) -> Option<&str> {
    let prefix_len = text
        .find(['"', '\''])
        .filter(|&n| n <= 2)?;
    let prefix = text[..prefix_len].to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }
    let rest = &text[prefix_len..];
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(inner) = rest
            .strip_prefix(quote)
            .and_then(|r| r.strip_suffix(quote))
        {
            return Some(inner);
        }
    }
    None
}

/// Trim blank edges and the common indentation of continuation lines.
fn clean_docstring(raw: &str) -> Option<String> {
    let mut lines = raw.lines();
    let first = lines.next().unwrap_or_default().trim();
    let rest: Vec<&str> = lines.collect();
    let indent = rest
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned = vec![first.to_string()];
    cleaned.extend(rest.iter().map(|l| {
        l.get(indent..).unwrap_or(l.trim_start()).trim_end().to_string()
    }));
    let text = cleaned.join("\n");
    let text = text.trim_matches('\n').trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn docstring(body: Option<Node<'_>>, source: &[u8]) -> Option<String> {
    let body = body?;
    let mut cursor = body.walk();
    let first = body.named_children(&mut cursor).next()?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let string = first.named_child(0).filter(|n| n.kind() == "string")?;
    string_literal_body(node_text(string, source)).and_then(clean_docstring)
}

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

fn parameter(node: Node<'_>, source: &[u8]) -> Option<Parameter> {
    let type_of = |n: Node<'_>| {
        n.child_by_field_name("type")
            .and_then(|t| normalize_type_name(Some(node_text(t, source))))
    };
    let splat_name = |n: Node<'_>| {
        node_text(n, source)
            .trim_start_matches('*')
            .trim()
            .to_string()
    };
    match node.kind() {
        "identifier" => Some(Parameter::new(node_text(node, source))),
        "list_splat_pattern" | "dictionary_splat_pattern" => {
            Some(Parameter::new(splat_name(node)))
        }
        "typed_parameter" => {
            let inner = node.named_child(0)?;
            let name = match inner.kind() {
                "identifier" => node_text(inner, source).to_string(),
                _ => splat_name(inner),
            };
            Some(Parameter {
                name,
                type_annotation: type_of(node),
                has_default: false,
            })
        }
        "default_parameter" | "typed_default_parameter" => {
            let name = node.child_by_field_name("name")?;
            Some(Parameter {
                name: node_text(name, source).to_string(),
                type_annotation: type_of(node),
                has_default: true,
            })
        }
        // `*` and `/` separators
        _ => None,
    }
}

fn parameters(node: Option<Node<'_>>, source: &[u8], is_method: bool) -> Vec<Parameter> {
    let Some(node) = node else {
        return Vec::new();
    };
    let mut cursor = node.walk();
    let mut params: Vec<Parameter> = node
        .named_children(&mut cursor)
        .filter_map(|child| parameter(child, source))
        .collect();
    if is_method
        && params
            .first()
            .is_some_and(|p| p.name == "self" || p.name == "cls")
    {
        params.remove(0);
    }
    params
}

// ---------------------------------------------------------------------------
// Definitions
// ---------------------------------------------------------------------------

struct Visitor<'s> {
    source: &'s [u8],
    symbols: Vec<Symbol>,
}

impl Visitor<'_> {
    /// Visit the statements of a module or class body.
    fn visit_block(&mut self, block: Node<'_>, parent: Option<&str>) {
        let mut cursor = block.walk();
        let statements: Vec<Node<'_>> = block.named_children(&mut cursor).collect();
        for statement in statements {
            match statement.kind() {
                "function_definition" | "class_definition" => {
                    self.visit_definition(statement, Vec::new(), parent);
                }
                "decorated_definition" => {
                    let Some(definition) = statement.child_by_field_name("definition") else {
                        continue;
                    };
                    let mut cursor = statement.walk();
                    let decorators = statement
                        .named_children(&mut cursor)
                        .filter(|c| c.kind() == "decorator")
                        .map(|d| {
                            node_text(d, self.source)
                                .trim_start_matches('@')
                                .trim()
                                .to_string()
                        })
                        .collect();
                    self.visit_definition(definition, decorators, parent);
                }
                _ => {}
            }
        }
    }

    fn visit_definition(&mut self, node: Node<'_>, decorators: Vec<String>, parent: Option<&str>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = node_text(name_node, self.source).to_string();
        let body = node.child_by_field_name("body");
        let is_class = node.kind() == "class_definition";
        let kind = match (is_class, parent.is_some()) {
            (true, _) => SymbolKind::Class,
            (false, true) => SymbolKind::Method,
            (false, false) => SymbolKind::Function,
        };

        let mut symbol = Symbol::new(kind, name.clone(), line_of(node));
        symbol.parent = parent.map(str::to_string);
        symbol.line_span = (line_of(node), node.end_position().row + 1);
        symbol.docstring = docstring(body, self.source);
        if !is_class {
            let params = parameters(
                node.child_by_field_name("parameters"),
                self.source,
                kind == SymbolKind::Method,
            );
            let return_type = node
                .child_by_field_name("return_type")
                .and_then(|t| normalize_type_name(Some(node_text(t, self.source))));
            symbol.signature = Signature::new(params, return_type);
        }
        symbol.is_deprecated_marker = detect_deprecation(&decorators, symbol.docstring.as_deref());
        symbol.decorators = decorators;
        self.symbols.push(symbol);

        if is_class {
            if let Some(body) = body {
                let path = match parent {
                    Some(outer) => format!("{outer}.{name}"),
                    None => name,
                };
                self.visit_block(body, Some(path.as_str()));
            }
        }
    }
}

impl LanguageExtractor for PythonExtractor {
    fn language_name(&self) -> &str {
        "python"
    }

    fn file_extensions(&self) -> &[&str] {
        &["py", "pyi"]
    }

    fn extract(&self, source: &str) -> Result<Vec<Symbol>, ExtractError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| ExtractError::new(format!("failed to load python grammar: {e}")))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| ExtractError::new("parser returned no tree"))?;

        let root = tree.root_node();
        if root.has_error() {
            return Err(match first_error(root) {
                Some(node) => ExtractError::at_line("syntax error", line_of(node)),
                None => ExtractError::new("syntax error"),
            });
        }

        let mut visitor = Visitor {
            source: source.as_bytes(),
            symbols: Vec::new(),
        };
        visitor.visit_block(root, None);
        Ok(visitor.symbols)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
