//! Rust: functions, structs, enums, unions, traits, modules, and methods
//! inside `impl` / `trait` blocks.
//!
//! `impl` blocks produce no symbol of their own; their functions become
//! methods of the implementing type. Only outer doc comments (`///`, `/**`)
//! are docstrings; inner docs (`//!`) are ignored.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ExtractError;
use crate::indexer::extractor::LanguageExtractor;
use crate::indexer::params::{normalize_type_name, ParamStyle};
use crate::indexer::scanner::{
    scan, Attribute, BodyRole, CommentSyntax, Context, Declaration, PatternLanguage, ScanLine,
};
use crate::models::{Parameter, Symbol, SymbolKind};

static RUST_SYNTAX: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &[],
    multiline_quotes: &["\""],
    non_doc: &["//!", "/*!"],
    doc_only: Some(&["///", "/**"]),
};

static RUST_MOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:pub(?:\([^)]*\))?\s+)?mod\s+([A-Za-z_]\w*)").unwrap()
});

static RUST_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:unsafe\s+)?(?:auto\s+)?(struct|enum|union|trait)\s+([A-Za-z_]\w*)",
    )
    .unwrap()
});

static RUST_IMPL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:unsafe\s+)?impl\b\s*(?:<.*?>\s*)?(?:!?([A-Za-z_][\w:]*)(?:<.*?>)?\s+for\s+)?&?(?:dyn\s+)?([A-Za-z_][\w:]*)",
    )
    .unwrap()
});

static RUST_FN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:default\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?(?:extern\s+(?:""\s+)?)?fn\s+([A-Za-z_]\w*)\s*(?:<.*?>)?\s*\("#,
    )
    .unwrap()
});

#[derive(Debug, Default, Clone, Copy)]
pub struct RustExtractor;

impl PatternLanguage for RustExtractor {
    fn syntax(&self) -> &CommentSyntax {
        &RUST_SYNTAX
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::NameColonType
    }

    fn attribute(&self, line: &ScanLine<'_>) -> Option<Attribute> {
        let text = line.source_text();
        if text.starts_with("#![") {
            return Some(Attribute::Transparent);
        }
        let inner = text.strip_prefix("#[")?;
        let inner = inner.strip_suffix(']').unwrap_or(inner);
        Some(Attribute::Decorators(vec![inner.trim().to_string()]))
    }

    fn declaration(&self, code: &str, _ctx: Context<'_>) -> Option<Declaration> {
        if let Some(caps) = RUST_FN_RE.captures(code) {
            let open = caps.get(0)?.end() - 1;
            return Some(Declaration::callable(SymbolKind::Function, &caps[1], open));
        }
        if let Some(caps) = RUST_TYPE_RE.captures(code) {
            let name = caps[2].to_string();
            let (kind, body) = match &caps[1] {
                "trait" => (SymbolKind::Trait, BodyRole::Members(name.clone())),
                "enum" => (SymbolKind::Enum, BodyRole::Opaque),
                _ => (SymbolKind::Struct, BodyRole::Opaque),
            };
            return Some(Declaration::new(kind, name, body));
        }
        if let Some(caps) = RUST_IMPL_RE.captures(code) {
            let last = |path: &str| path.rsplit("::").next().unwrap_or(path).to_string();
            let target = last(&caps[2]);
            // Trait impls get their own parent so `Display::fmt` and `Debug::fmt` stay apart.
            let owner = match caps.get(1) {
                Some(tr) => format!("{target} as {}", last(tr.as_str())),
                None => target.clone(),
            };
            return Some(Declaration::scope_only(target, BodyRole::Members(owner)));
        }
        let caps = RUST_MOD_RE.captures(code)?;
        let name = caps[1].to_string();
        Some(Declaration::new(
            SymbolKind::Module,
            name.clone(),
            BodyRole::Namespace(Some(name)),
        ))
    }

    fn return_type(&self, after_params: &str) -> Option<String> {
        let rest = after_params.trim_start().strip_prefix("->")?;
        let end = [rest.find(" where "), rest.find('{'), rest.find(';')]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(rest.len());
        normalize_type_name(Some(&rest[..end]))
    }

    fn keep_parameter(&self, parameter: &Parameter) -> bool {
        let name = parameter.name.as_str();
        !(name == "self" || name.ends_with(" self") || name.ends_with("&self"))
    }
}

impl LanguageExtractor for RustExtractor {
    fn language_name(&self) -> &str {
        "rust"
    }

    fn file_extensions(&self) -> &[&str] {
        &["rs"]
    }

    fn extract(&self, source: &str) -> Result<Vec<Symbol>, ExtractError> {
        scan(self, source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
