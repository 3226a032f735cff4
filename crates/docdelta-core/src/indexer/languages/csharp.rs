//! C#: classes, interfaces, structs, records, enums, methods and
//! constructors. Namespaces are transparent; `///` XML doc comments are
//! reduced to their summary text.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ExtractError;
use crate::indexer::extractor::LanguageExtractor;
use crate::indexer::params::{split_top_level, ParamStyle};
use crate::indexer::scanner::{
    scan, Attribute, BodyRole, CommentSyntax, Context, Declaration, PatternLanguage, ScanLine,
};
use crate::models::{Symbol, SymbolKind};

static CSHARP_SYNTAX: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"'],
    multiline_quotes: &[],
    non_doc: &[],
    doc_only: Some(&["///"]),
};

static CS_NAMESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*namespace\s+([\w.]+)\s*(;)?").unwrap());

static CS_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|private|protected|internal|static|abstract|sealed|partial|readonly|ref|unsafe|new|file)\s+)*(class|interface|struct|enum|record(?:\s+(?:class|struct))?)\s+([A-Za-z_]\w*)",
    )
    .unwrap()
});

static CS_METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|private|protected|internal|static|virtual|override|abstract|async|new|sealed|extern|partial|unsafe|readonly)\s+)*([\w.]+(?:\s*<.*?>)?(?:\[\])*\??)\s+([A-Za-z_]\w*)\s*(?:<[^>]*>)?\s*\(",
    )
    .unwrap()
});

static CS_CTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:(?:public|private|protected|internal|static)\s+)*([A-Za-z_]\w*)\s*\(")
        .unwrap()
});

static XML_TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?summary>").unwrap());

const NOT_A_TYPE: &[&str] = &["return", "new", "throw", "else", "case", "await", "using"];

#[derive(Debug, Default, Clone, Copy)]
pub struct CSharpExtractor;

impl CSharpExtractor {
    fn member_declaration(code: &str, owner: &str) -> Option<Declaration> {
        if let Some(caps) = CS_CTOR_RE.captures(code) {
            let type_name = owner.rsplit('.').next().unwrap_or(owner);
            if &caps[1] == type_name {
                let open = caps.get(0)?.end() - 1;
                return Some(Declaration::callable(SymbolKind::Method, type_name, open));
            }
        }
        let caps = CS_METHOD_RE.captures(code)?;
        let return_type = caps[1].trim();
        if NOT_A_TYPE.contains(&return_type) {
            return None;
        }
        let open = caps.get(0)?.end() - 1;
        let mut decl = Declaration::callable(SymbolKind::Method, &caps[2], open);
        if return_type != "void" {
            decl.return_type = Some(return_type.to_string());
        }
        Some(decl)
    }
}

/// Keep `<summary>` content and any line that is not an XML element.
fn clean_xml_doc(doc: &str) -> Option<String> {
    let mut cleaned = Vec::new();
    let mut in_summary = false;
    for line in doc.lines() {
        let line = line.trim();
        if line.contains("<summary>") || line.contains("</summary>") {
            in_summary = line.contains("<summary>") && !line.contains("</summary>");
            let text = XML_TAG_RE.replace_all(line, "");
            let text = text.trim();
            if !text.is_empty() {
                cleaned.push(text.to_string());
            }
            continue;
        }
        if in_summary || !line.starts_with('<') {
            cleaned.push(line.to_string());
        }
    }
    let text = cleaned.join("\n");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl PatternLanguage for CSharpExtractor {
    fn syntax(&self) -> &CommentSyntax {
        &CSHARP_SYNTAX
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::TypeThenName
    }

    /// `[Obsolete("...")]`, `[Fact, Trait("a", "b")]`.
    fn attribute(&self, line: &ScanLine<'_>) -> Option<Attribute> {
        let text = line.source_text();
        let inner = text.strip_prefix('[')?.strip_suffix(']')?;
        let inner = inner.strip_prefix("assembly:").unwrap_or(inner);
        let found = split_top_level(inner)
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        Some(Attribute::Decorators(found))
    }

    fn declaration(&self, code: &str, ctx: Context<'_>) -> Option<Declaration> {
        if let Some(caps) = CS_NAMESPACE_RE.captures(code) {
            if caps.get(2).is_some() {
                // File-scoped namespace: nothing to open.
                return None;
            }
            return Some(Declaration::scope_only(&caps[1], BodyRole::Namespace(None)));
        }
        if let Some(caps) = CS_TYPE_RE.captures(code) {
            let name = caps[2].to_string();
            let kind = match caps[1].split_whitespace().next() {
                Some("interface") => SymbolKind::Interface,
                Some("struct") => SymbolKind::Struct,
                Some("enum") => SymbolKind::Enum,
                _ => SymbolKind::Class,
            };
            return Some(Declaration::new(kind, name.clone(), BodyRole::Members(name)));
        }
        match ctx {
            Context::Member { owner } => Self::member_declaration(code, owner),
            Context::TopLevel { .. } => None,
        }
    }

    fn clean_doc(&self, doc: &str) -> Option<String> {
        clean_xml_doc(doc)
    }
}

impl LanguageExtractor for CSharpExtractor {
    fn language_name(&self) -> &str {
        "csharp"
    }

    fn file_extensions(&self) -> &[&str] {
        &["cs"]
    }

    fn extract(&self, source: &str) -> Result<Vec<Symbol>, ExtractError> {
        scan(self, source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"using System;

namespace Shop.Billing
{
    /// <summary>
    /// Computes invoice totals.
    /// </summary>
    public class InvoiceService : IService
    {
        public InvoiceService(ILogger logger)
        {
        }

        /// <summary>Sums line items.</summary>
        /// <param name="items">The items.</param>
        public decimal Total(IList<Item> items, decimal discount = 0m)
        {
            return 0m;
        }

        [Obsolete("Use Total")]
        public static Task<int> LegacyTotal(ref int count) => Task.FromResult(count);
    }

    public interface IService
    {
        void Run();
    }

    public struct Money { }
}
"#;

    #[test]
    fn test_namespace_is_transparent() {
        let symbols = CSharpExtractor.extract(SOURCE).unwrap();
        let names: Vec<(&str, SymbolKind, Option<&str>)> = symbols
            .iter()
            .map(|s| (s.name.as_str(), s.kind, s.parent.as_deref()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("InvoiceService", SymbolKind::Class, None),
                ("InvoiceService", SymbolKind::Method, Some("InvoiceService")),
                ("Total", SymbolKind::Method, Some("InvoiceService")),
                ("LegacyTotal", SymbolKind::Method, Some("InvoiceService")),
                ("IService", SymbolKind::Interface, None),
                ("Run", SymbolKind::Method, Some("IService")),
                ("Money", SymbolKind::Struct, None),
            ]
        );
    }

    #[test]
    fn test_xml_doc_summary() {
        let symbols = CSharpExtractor.extract(SOURCE).unwrap();
        assert_eq!(symbols[0].docstring.as_deref(), Some("Computes invoice totals."));
        assert_eq!(symbols[2].docstring.as_deref(), Some("Sums line items."));
        assert_eq!(symbols[2].signature.return_type.as_deref(), Some("decimal"));
        assert!(symbols[2].signature.parameters[1].has_default);
    }

    #[test]
    fn test_obsolete_attribute_marks_deprecated() {
        let symbols = CSharpExtractor.extract(SOURCE).unwrap();
        let legacy = &symbols[3];
        assert!(legacy.is_deprecated_marker);
        assert_eq!(legacy.decorators, vec!["Obsolete(\"Use Total\")"]);
        assert_eq!(legacy.signature.parameters[0].name, "count");
    }

    #[test]
    fn test_allman_braces_set_end_line() {
        let symbols = CSharpExtractor.extract(SOURCE).unwrap();
        assert_eq!(symbols[0].line_span, (8, 23));
        assert_eq!(symbols[2].line_span, (16, 19));
    }
}
