//! Java: classes, interfaces, enums, records, annotation types, methods and
//! constructors. Javadoc (`/** ... */`) is the only doc comment form.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ExtractError;
use crate::indexer::extractor::LanguageExtractor;
use crate::indexer::params::ParamStyle;
use crate::indexer::scanner::{
    annotation_line, drop_tag_lines, scan, strip_leading_annotations, Attribute, BodyRole,
    CommentSyntax, Context, Declaration, PatternLanguage, ScanLine,
};
use crate::models::{Symbol, SymbolKind};

static JAVA_SYNTAX: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"'],
    multiline_quotes: &["\"\"\""],
    non_doc: &[],
    doc_only: Some(&["/**"]),
};

static JAVA_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|protected|private|static|abstract|final|sealed|non-sealed|strictfp)\s+)*(class|interface|enum|record|@interface)\s+([A-Za-z_$][\w$]*)",
    )
    .unwrap()
});

static JAVA_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|protected|private|static|abstract|final|synchronized|native|default|strictfp)\s+)*(?:<[^>]*>\s+)?([\w$.]+(?:\s*<.*?>)?(?:\[\])*)\s+([A-Za-z_$][\w$]*)\s*\(",
    )
    .unwrap()
});

static JAVA_CTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:public|protected|private)\s+)?(?:<[^>]*>\s+)?([A-Za-z_$][\w$]*)\s*\(")
        .unwrap()
});

const NOT_A_TYPE: &[&str] = &["return", "new", "throw", "else", "case", "yield", "package", "import"];

#[derive(Debug, Default, Clone, Copy)]
pub struct JavaExtractor;

impl JavaExtractor {
    fn type_declaration(rest: &str) -> Option<Declaration> {
        let caps = JAVA_TYPE_RE.captures(rest)?;
        let name = caps[2].to_string();
        let kind = match &caps[1] {
            "interface" | "@interface" => SymbolKind::Interface,
            "enum" => SymbolKind::Enum,
            _ => SymbolKind::Class,
        };
        Some(Declaration::new(kind, name.clone(), BodyRole::Members(name)))
    }

    fn member_declaration(rest: &str, owner: &str, offset: usize) -> Option<Declaration> {
        if let Some(caps) = JAVA_CTOR_RE.captures(rest) {
            let type_name = owner.rsplit('.').next().unwrap_or(owner);
            if &caps[1] == type_name {
                let open = offset + caps.get(0)?.end() - 1;
                return Some(Declaration::callable(SymbolKind::Method, type_name, open));
            }
        }
        let caps = JAVA_METHOD_RE.captures(rest)?;
        let return_type = caps[1].trim();
        if NOT_A_TYPE.contains(&return_type) {
            return None;
        }
        let open = offset + caps.get(0)?.end() - 1;
        let mut decl = Declaration::callable(SymbolKind::Method, &caps[2], open);
        if return_type != "void" {
            decl.return_type = Some(return_type.split_whitespace().collect::<Vec<_>>().join(" "));
        }
        Some(decl)
    }
}

impl PatternLanguage for JavaExtractor {
    fn syntax(&self) -> &CommentSyntax {
        &JAVA_SYNTAX
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::TypeThenName
    }

    fn attribute(&self, line: &ScanLine<'_>) -> Option<Attribute> {
        annotation_line(line)
    }

    fn declaration(&self, code: &str, ctx: Context<'_>) -> Option<Declaration> {
        let (annotations, offset) = strip_leading_annotations(code);
        let rest = &code[offset..];
        let mut decl = Self::type_declaration(rest).or_else(|| match ctx {
            Context::Member { owner } => Self::member_declaration(rest, owner, offset),
            Context::TopLevel { .. } => None,
        })?;
        decl.decorators = annotations;
        Some(decl)
    }

    fn clean_doc(&self, doc: &str) -> Option<String> {
        drop_tag_lines(doc)
    }
}

impl LanguageExtractor for JavaExtractor {
    fn language_name(&self) -> &str {
        "java"
    }

    fn file_extensions(&self) -> &[&str] {
        &["java"]
    }

    fn extract(&self, source: &str) -> Result<Vec<Symbol>, ExtractError> {
        scan(self, source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
