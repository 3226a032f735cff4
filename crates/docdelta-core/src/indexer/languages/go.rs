//! Go: functions, methods (parented to their receiver type), struct and
//! interface types. Any `//` comment block directly above a declaration is
//! its godoc.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ExtractError;
use crate::indexer::extractor::LanguageExtractor;
use crate::indexer::params::{normalize_type_name, ParamStyle};
use crate::indexer::scanner::{
    scan, BodyRole, CommentSyntax, Context, Declaration, PatternLanguage,
};
use crate::models::{Symbol, SymbolKind};

static GO_SYNTAX: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"'],
    multiline_quotes: &["`"],
    non_doc: &["//go:", "//+build", "//nolint"],
    doc_only: None,
};

static GO_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*type\s+([A-Za-z_]\w*)(?:\[[^\]]*\])?\s+(struct|interface)\b").unwrap()
});

static GO_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*func\s+\(\s*(?:[A-Za-z_]\w*\s+)?\*?\s*([A-Za-z_]\w*)(?:\[[^\]]*\])?\s*\)\s*([A-Za-z_]\w*)\s*(?:\[[^\]]*\])?\s*\(",
    )
    .unwrap()
});

static GO_FUNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*func\s+([A-Za-z_]\w*)\s*(?:\[[^\]]*\])?\s*\(").unwrap()
});

static GO_RETURN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([^{]+?)\s*(?:\{|$)").unwrap());

#[derive(Debug, Clone, Copy)]
pub struct GoExtractor {
    skip_tests: bool,
}

impl GoExtractor {
    pub fn new(skip_tests: bool) -> Self {
        Self { skip_tests }
    }
}

impl Default for GoExtractor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl PatternLanguage for GoExtractor {
    fn syntax(&self) -> &CommentSyntax {
        &GO_SYNTAX
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::Go
    }

    fn declaration(&self, code: &str, ctx: Context<'_>) -> Option<Declaration> {
        if !matches!(ctx, Context::TopLevel { .. }) {
            return None;
        }
        if let Some(caps) = GO_TYPE_RE.captures(code) {
            let kind = if &caps[2] == "struct" {
                SymbolKind::Struct
            } else {
                SymbolKind::Interface
            };
            return Some(Declaration::new(kind, &caps[1], BodyRole::Opaque));
        }
        if let Some(caps) = GO_METHOD_RE.captures(code) {
            let open = caps.get(0)?.end() - 1;
            let mut decl = Declaration::callable(SymbolKind::Method, &caps[2], open);
            decl.parent = Some(caps[1].to_string());
            return Some(decl);
        }
        let caps = GO_FUNC_RE.captures(code)?;
        let open = caps.get(0)?.end() - 1;
        Some(Declaration::callable(SymbolKind::Function, &caps[1], open))
    }

    fn return_type(&self, after_params: &str) -> Option<String> {
        let caps = GO_RETURN_RE.captures(after_params)?;
        normalize_type_name(Some(&caps[1]))
    }
}

impl LanguageExtractor for GoExtractor {
    fn language_name(&self) -> &str {
        "go"
    }

    fn file_extensions(&self) -> &[&str] {
        &["go"]
    }

    fn matches(&self, path: &Path) -> bool {
        !(self.skip_tests
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_test.go")))
    }

    fn extract(&self, source: &str) -> Result<Vec<Symbol>, ExtractError> {
        scan(self, source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
