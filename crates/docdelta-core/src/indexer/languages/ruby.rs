//! Ruby: classes, modules and `def` methods.
//!
//! Ruby blocks close with `end`, so depth is tracked by counting block
//! keywords instead of braces. `class << self` is transparent: its methods
//! belong to the enclosing class. `=begin`/`=end` blocks are ignored.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ExtractError;
use crate::indexer::extractor::LanguageExtractor;
use crate::indexer::params::{parse_parameters, ParamStyle};
use crate::indexer::scanner::{
    collect_parenthesized, detect_deprecation, drop_tag_lines, preprocess, CommentSyntax,
    DocBuffer, ScanLine,
};
use crate::models::{Signature, Symbol, SymbolKind};

static RUBY_SYNTAX: CommentSyntax = CommentSyntax {
    line: &["#"],
    block: None,
    quotes: &['"', '\''],
    multiline_quotes: &[],
    non_doc: &["#!", "# frozen_string_literal:", "# -*-", "# encoding:"],
    doc_only: None,
};

static RB_CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(class|module)\s+(<<\s*self|(?:[A-Z]\w*::)*[A-Z]\w*)").unwrap()
});

static RB_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*def\s+(?:self\.)?([A-Za-z_]\w*[?!=]?|\[\]=?|[+\-*/%<>=!~^&|]+)").unwrap()
});

static RB_OPENER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:[\w@.\[\]:]+\s*(?:\|\||&&|[+\-*/])?=\s*)?(class|module|def|if|unless|while|until|for|case|begin)\b",
    )
    .unwrap()
});

static RB_DO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bdo\b").unwrap());

static RB_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^.\w])end\b").unwrap());

#[derive(Debug, Default, Clone, Copy)]
pub struct RubyExtractor;

struct Scope {
    symbol: Option<usize>,
    /// Owner name for methods declared directly inside; `None` for def bodies.
    owner: Option<String>,
    base_depth: usize,
}

/// Blank out `=begin` ... `=end` documentation blocks.
fn strip_embedded_docs(lines: &mut [ScanLine<'_>]) {
    let mut inside = false;
    for line in lines.iter_mut() {
        if line.raw.starts_with("=begin") {
            inside = true;
        }
        if inside {
            line.code.clear();
            line.comment = None;
        }
        if line.raw.starts_with("=end") {
            inside = false;
        }
    }
}

/// Net block openers on one line, ignoring `def` bodies that close inline.
fn openers(code: &str, endless_def: bool) -> usize {
    let mut count = 0;
    let keyword = RB_OPENER_RE.captures(code).map(|c| c[1].to_string());
    if let Some(kw) = &keyword {
        if !(kw == "def" && endless_def) {
            count += 1;
        }
    }
    let loop_header = matches!(keyword.as_deref(), Some("while" | "until" | "for"));
    let dos = RB_DO_RE.find_iter(code).count();
    if loop_header {
        count += dos.saturating_sub(1);
    } else {
        count += dos;
    }
    count
}

fn closers(code: &str) -> usize {
    RB_END_RE.find_iter(code).count()
}

/// `def name(params)` / `def name params` / `def name = expr`.
fn def_parameters(
    lines: &[ScanLine<'_>],
    idx: usize,
    name_end: usize,
) -> (String, usize, bool) {
    let code = &lines[idx].code;
    let rest = &code[name_end..];
    if rest.trim_start().starts_with('(') {
        let open = name_end + rest.find('(').unwrap_or(0);
        let (params, end_idx, after) = collect_parenthesized(lines, idx, open);
        let endless = after.trim_start().starts_with('=') && !after.trim_start().starts_with("==");
        return (params, end_idx, endless);
    }
    let trimmed = rest.trim_start();
    if trimmed.starts_with('=') && !trimmed.starts_with("==") {
        return (String::new(), idx, true);
    }
    let bare = trimmed.split(';').next().unwrap_or_default();
    (bare.to_string(), idx, false)
}

fn scan_ruby(source: &str) -> Result<Vec<Symbol>, ExtractError> {
    let mut lines = preprocess(source, &RUBY_SYNTAX)?;
    strip_embedded_docs(&mut lines);

    let mut symbols: Vec<Symbol> = Vec::new();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut depth = 0usize;
    let mut doc = DocBuffer::default();
    let mut signature_end = 0usize;

    for (idx, line) in lines.iter().enumerate() {
        if !line.has_code() {
            if line.is_blank() {
                doc.clear();
            } else if let Some((text, true)) = &line.comment {
                doc.push(text);
            }
            continue;
        }
        if line.number <= signature_end {
            continue;
        }

        let owner = match scopes.last() {
            None if depth == 0 => Some(None),
            Some(top) if depth == top.base_depth + 1 => top.owner.clone().map(Some),
            _ => None,
        };
        let mut endless = false;
        let mut opened: Option<Scope> = None;

        if let Some(owner) = owner {
            if let Some(caps) = RB_CLASS_RE.captures(&line.code) {
                let target = &caps[2];
                if target.starts_with("<<") {
                    opened = Some(Scope {
                        symbol: None,
                        owner: owner.clone(),
                        base_depth: depth,
                    });
                } else {
                    let name = target.rsplit("::").next().unwrap_or(target).to_string();
                    let kind = if &caps[1] == "class" {
                        SymbolKind::Class
                    } else {
                        SymbolKind::Module
                    };
                    let mut symbol = Symbol::new(kind, name.clone(), line.number);
                    symbol.parent = owner.clone();
                    let raw_doc = doc.take();
                    symbol.is_deprecated_marker = detect_deprecation(&[], raw_doc.as_deref());
                    symbol.docstring = raw_doc.and_then(|d| drop_tag_lines(&d));
                    let path = match &owner {
                        Some(outer) => format!("{outer}.{name}"),
                        None => name,
                    };
                    opened = Some(Scope {
                        symbol: Some(symbols.len()),
                        owner: Some(path),
                        base_depth: depth,
                    });
                    symbols.push(symbol);
                }
            } else if let Some(caps) = RB_DEF_RE.captures(&line.code) {
                let name_end = caps.get(1).map_or(0, |m| m.end());
                let (params, end_idx, is_endless) = def_parameters(&lines, idx, name_end);
                endless = is_endless;
                let kind = if owner.is_some() {
                    SymbolKind::Method
                } else {
                    SymbolKind::Function
                };
                let mut symbol = Symbol::new(kind, &caps[1], line.number);
                symbol.parent = owner.clone();
                symbol.signature = Signature::new(parse_parameters(&params, ParamStyle::Ruby), None);
                let raw_doc = doc.take();
                symbol.is_deprecated_marker = detect_deprecation(&[], raw_doc.as_deref());
                symbol.docstring = raw_doc.and_then(|d| drop_tag_lines(&d));
                symbol.line_span = (line.number, lines[end_idx].number);
                signature_end = lines[end_idx].number;
                if !endless {
                    opened = Some(Scope {
                        symbol: Some(symbols.len()),
                        owner: None,
                        base_depth: depth,
                    });
                }
                symbols.push(symbol);
            }
        }
        doc.clear();

        let code_span: String = lines[idx..]
            .iter()
            .take_while(|l| l.number <= signature_end.max(line.number))
            .map(|l| l.code.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let opens = openers(&code_span, endless);
        let closes = closers(&code_span);

        if let Some(scope) = opened {
            scopes.push(scope);
        }
        depth += opens;
        if closes > depth {
            return Err(ExtractError::at_line("unmatched `end`", line.number));
        }
        depth -= closes;
        while scopes.last().is_some_and(|s| s.base_depth >= depth) {
            if let Some(scope) = scopes.pop() {
                if let Some(i) = scope.symbol {
                    symbols[i].line_span.1 = line.number.max(signature_end);
                }
            }
        }
    }

    if depth != 0 {
        let line = lines.last().map(|l| l.number).unwrap_or(0);
        return Err(ExtractError::at_line(
            format!("{depth} block(s) missing `end`"),
            line,
        ));
    }
    Ok(symbols)
}

impl LanguageExtractor for RubyExtractor {
    fn language_name(&self) -> &str {
        "ruby"
    }

    fn file_extensions(&self) -> &[&str] {
        &["rb", "rake"]
    }

    fn extract(&self, source: &str) -> Result<Vec<Symbol>, ExtractError> {
        scan_ruby(source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
