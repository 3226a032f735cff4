//! TypeScript and JavaScript: functions, arrow functions bound to
//! `const`/`let`/`var`, classes and their methods, interfaces, enums and
//! namespaces. JSDoc (`/** ... */`) is the only doc comment form.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ExtractError;
use crate::indexer::extractor::LanguageExtractor;
use crate::indexer::params::{normalize_type_name, ParamStyle};
use crate::indexer::scanner::{
    annotation_line, drop_tag_lines, scan, strip_leading_annotations, Attribute, BodyRole,
    CommentSyntax, Context, Declaration, PatternLanguage, ScanLine,
};
use crate::models::{Symbol, SymbolKind};

static TS_SYNTAX: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"', '\''],
    multiline_quotes: &["`"],
    non_doc: &[],
    doc_only: Some(&["/**"]),
};

static TS_NAMESPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:declare\s+)?(?:namespace|module)\s+([A-Za-z_$][\w$.]*)")
        .unwrap()
});

static TS_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?(?:const\s+)?(class|interface|enum)\s+([A-Za-z_$][\w$]*)",
    )
    .unwrap()
});

static TS_FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:declare\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\(",
    )
    .unwrap()
});

static TS_ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::\s*[^=]+?)?\s*=\s*(?:async\s+)?(?:<[^>]*>\s*)?\(",
    )
    .unwrap()
});

static TS_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|private|protected|static|async|readonly|override|abstract|declare|get|set)\s+)*\*?\s*(#?[A-Za-z_$][\w$]*)\??\s*(?:<[^>]*>)?\s*\(",
    )
    .unwrap()
});

static TS_RETURN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:\s*([^{;]+?)\s*(?:\{|=>|;|$)").unwrap());

const CONTROL_KEYWORDS: &[&str] = &[
    "if", "for", "while", "switch", "catch", "return", "function", "super", "await",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct TypeScriptExtractor;

impl TypeScriptExtractor {
    fn find(code: &str, ctx: Context<'_>, offset: usize) -> Option<Declaration> {
        if let Some(caps) = TS_NAMESPACE_RE.captures(code) {
            let name = caps[1].to_string();
            return Some(Declaration::new(
                SymbolKind::Module,
                name.clone(),
                BodyRole::Namespace(Some(name)),
            ));
        }
        if let Some(caps) = TS_TYPE_RE.captures(code) {
            let name = caps[2].to_string();
            let (kind, body) = match &caps[1] {
                "interface" => (SymbolKind::Interface, BodyRole::Members(name.clone())),
                "enum" => (SymbolKind::Enum, BodyRole::Opaque),
                _ => (SymbolKind::Class, BodyRole::Members(name.clone())),
            };
            return Some(Declaration::new(kind, name, body));
        }
        match ctx {
            Context::TopLevel { .. } => {
                if let Some(caps) = TS_FUNCTION_RE.captures(code) {
                    let open = offset + caps.get(0)?.end() - 1;
                    return Some(Declaration::callable(SymbolKind::Function, &caps[1], open));
                }
                let caps = TS_ARROW_RE.captures(code)?;
                let open = offset + caps.get(0)?.end() - 1;
                let mut decl = Declaration::callable(SymbolKind::Function, &caps[1], open);
                decl.requires_arrow = true;
                Some(decl)
            }
            Context::Member { .. } => {
                let caps = TS_METHOD_RE.captures(code)?;
                let name = &caps[1];
                if CONTROL_KEYWORDS.contains(&name) {
                    return None;
                }
                let open = offset + caps.get(0)?.end() - 1;
                Some(Declaration::callable(SymbolKind::Method, name, open))
            }
        }
    }
}

impl PatternLanguage for TypeScriptExtractor {
    fn syntax(&self) -> &CommentSyntax {
        &TS_SYNTAX
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::NameColonType
    }

    fn attribute(&self, line: &ScanLine<'_>) -> Option<Attribute> {
        annotation_line(line)
    }

    fn declaration(&self, code: &str, ctx: Context<'_>) -> Option<Declaration> {
        let (decorators, offset) = strip_leading_annotations(code);
        let mut decl = Self::find(&code[offset..], ctx, offset)?;
        decl.decorators = decorators;
        Some(decl)
    }

    fn return_type(&self, after_params: &str) -> Option<String> {
        let caps = TS_RETURN_RE.captures(after_params)?;
        normalize_type_name(Some(&caps[1]))
    }

    fn clean_doc(&self, doc: &str) -> Option<String> {
        drop_tag_lines(doc)
    }
}

impl LanguageExtractor for TypeScriptExtractor {
    fn language_name(&self) -> &str {
        "typescript"
    }

    fn file_extensions(&self) -> &[&str] {
        &["ts", "tsx", "js", "jsx", "mjs", "cjs"]
    }

    fn extract(&self, source: &str) -> Result<Vec<Symbol>, ExtractError> {
        scan(self, source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
