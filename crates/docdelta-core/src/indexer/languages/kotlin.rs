//! Kotlin: classes, interfaces, objects, enum classes and functions.
//!
//! Companion objects are transparent: their functions are reported as
//! methods of the enclosing class.

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

static KOTLIN_SYNTAX: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"'],
    multiline_quotes: &["\"\"\""],
    non_doc: &[],
    doc_only: Some(&["/**"]),
};

static KT_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|private|protected|internal|abstract|open|sealed|data|inner|annotation|value|inline|expect|actual|final)\s+)*(enum\s+class|fun\s+interface|class|interface|companion\s+object|object)\b\s*([A-Za-z_][\w]*)?",
    )
    .unwrap()
});

static KT_FUN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|private|protected|internal|override|open|abstract|final|inline|suspend|operator|infix|tailrec|external|actual|expect)\s+)*fun\s+(?:<[^>]*>\s+)?(?:[\w.<>?, ]+?\.)?([A-Za-z_][\w]*)\s*\(",
    )
    .unwrap()
});

static KT_RETURN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*:\s*([^{=]+)").unwrap());

#[derive(Debug, Default, Clone, Copy)]
pub struct KotlinExtractor;

impl KotlinExtractor {
    fn type_declaration(rest: &str, ctx: Context<'_>) -> Option<Declaration> {
        let caps = KT_TYPE_RE.captures(rest)?;
        let keyword = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
        if keyword == "companion object" {
            let body = match ctx.owner() {
                Some(owner) => BodyRole::Members(owner.to_string()),
                None => BodyRole::Opaque,
            };
            return Some(Declaration::scope_only("Companion", body));
        }
        let name = caps.get(2)?.as_str().to_string();
        let kind = match keyword.as_str() {
            "enum class" => SymbolKind::Enum,
            "interface" | "fun interface" => SymbolKind::Interface,
            _ => SymbolKind::Class,
        };
        Some(Declaration::new(kind, name.clone(), BodyRole::Members(name)))
    }
}

impl PatternLanguage for KotlinExtractor {
    fn syntax(&self) -> &CommentSyntax {
        &KOTLIN_SYNTAX
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::NameColonType
    }

    fn attribute(&self, line: &ScanLine<'_>) -> Option<Attribute> {
        annotation_line(line)
    }

    fn declaration(&self, code: &str, ctx: Context<'_>) -> Option<Declaration> {
        let (annotations, offset) = strip_leading_annotations(code);
        let rest = &code[offset..];
        let mut decl = match KT_FUN_RE.captures(rest) {
            Some(caps) => {
                let open = offset + caps.get(0)?.end() - 1;
                Declaration::callable(SymbolKind::Function, &caps[1], open)
            }
            None => Self::type_declaration(rest, ctx)?,
        };
        decl.decorators = annotations;
        Some(decl)
    }

    fn return_type(&self, after_params: &str) -> Option<String> {
        let caps = KT_RETURN_RE.captures(after_params)?;
        let ty = caps[1].split(" where ").next().unwrap_or_default();
        normalize_type_name(Some(ty))
    }

    fn clean_doc(&self, doc: &str) -> Option<String> {
        drop_tag_lines(doc)
    }
}

impl LanguageExtractor for KotlinExtractor {
    fn language_name(&self) -> &str {
        "kotlin"
    }

    fn file_extensions(&self) -> &[&str] {
        &["kt", "kts"]
    }

    fn extract(&self, source: &str) -> Result<Vec<Symbol>, ExtractError> {
        scan(self, source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
