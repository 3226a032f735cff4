//! C and C++: functions, classes, structs, unions, enums, in-class methods,
//! constructors, and out-of-line `Type::method` definitions.
//!
//! Namespaces and `extern "C"` blocks are transparent. Doxygen comments
//! (`///`, `//!`, `/** */`, `/*! */`) are docstrings; plain comments are not.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ExtractError;
use crate::indexer::extractor::LanguageExtractor;
use crate::indexer::params::{normalize_type_name, ParamStyle};
use crate::indexer::scanner::{
    scan, Attribute, BodyRole, CommentSyntax, Context, Declaration, PatternLanguage, ScanLine,
};
use crate::models::{Symbol, SymbolKind};

static CPP_SYNTAX: CommentSyntax = CommentSyntax {
    line: &["//"],
    block: Some(("/*", "*/")),
    quotes: &['"'],
    multiline_quotes: &[],
    non_doc: &[],
    doc_only: Some(&["///", "//!", "/**", "/*!"]),
};

static CPP_NAMESPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:(?:inline\s+)?namespace\b\s*([A-Za-z_][\w:]*)?|extern\s+""\s*)\s*\{?\s*$"#)
        .unwrap()
});

static CPP_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:typedef\s+)?(class|struct|union|enum(?:\s+class|\s+struct)?)\s+(?:[A-Z_][A-Z0-9_]*\s+)?([A-Za-z_]\w*)",
    )
    .unwrap()
});

static CPP_FUNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?:static|inline|extern|virtual|explicit|constexpr|consteval|friend)\s+)*((?:[\w:]+(?:<.*?>)?[\s*&]+)+?)?((?:[A-Za-z_]\w*::)*~?[A-Za-z_]\w*)\s*\(",
    )
    .unwrap()
});

static CPP_TEMPLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*template\s*<.*?>\s*").unwrap());

static CPP_ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[\[(.*?)\]\]\s*").unwrap());

const NOT_A_FUNCTION: &[&str] = &[
    "if", "for", "while", "switch", "return", "sizeof", "catch", "else", "do", "case", "new",
    "delete", "throw", "decltype", "static_assert", "alignof",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct CppExtractor;

impl CppExtractor {
    /// Strip `template<...>` and `[[attr]]` prefixes. Returns the attribute
    /// texts and the offset of the remaining declaration.
    fn strip_prefixes(code: &str) -> (Vec<String>, usize) {
        let mut found = Vec::new();
        let mut offset = 0;
        loop {
            let rest = &code[offset..];
            if let Some(m) = CPP_TEMPLATE_RE.find(rest) {
                offset += m.end();
            } else if let Some(caps) = CPP_ATTRIBUTE_RE.captures(rest) {
                found.push(caps[1].trim().to_string());
                offset += caps.get(0).map_or(0, |m| m.end());
            } else {
                return (found, offset);
            }
        }
    }

    fn type_declaration(rest: &str) -> Option<Declaration> {
        let caps = CPP_TYPE_RE.captures(rest)?;
        // `struct stat st;`, forward declarations, and `struct Foo *make(...)`.
        let after = &rest[caps.get(0)?.end()..];
        if let Some(paren) = after.find('(') {
            if after.find('{').map_or(true, |brace| paren < brace) {
                return None;
            }
        }
        if !rest.contains('{') && rest.trim_end().ends_with(';') {
            return None;
        }
        let name = caps[2].to_string();
        let keyword = caps[1].split_whitespace().next().unwrap_or_default();
        let (kind, body) = match keyword {
            "class" => (SymbolKind::Class, BodyRole::Members(name.clone())),
            "enum" => (SymbolKind::Enum, BodyRole::Opaque),
            _ => (SymbolKind::Struct, BodyRole::Members(name.clone())),
        };
        Some(Declaration::new(kind, name, body))
    }

    fn function_declaration(rest: &str, offset: usize, ctx: Context<'_>) -> Option<Declaration> {
        if rest.trim_start().starts_with("typedef") || rest.trim_start().starts_with("using") {
            return None;
        }
        let caps = CPP_FUNC_RE.captures(rest)?;
        let return_type = caps.get(1).map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "));
        let qualified = &caps[2];
        let (owner, name) = match qualified.rsplit_once("::") {
            Some((path, name)) => (path.rsplit("::").next().map(str::to_string), name),
            None => (None, qualified),
        };
        if NOT_A_FUNCTION.contains(&name) {
            return None;
        }
        let is_ctor = match (&owner, ctx) {
            (Some(owner), _) => name.trim_start_matches('~') == owner.as_str(),
            (None, Context::Member { owner }) => {
                name.trim_start_matches('~') == owner.rsplit('.').next().unwrap_or(owner)
            }
            _ => false,
        };
        // Macro invocations (`REGISTER(foo);`) have neither a return type nor a class.
        if return_type.is_none() && owner.is_none() && !is_ctor {
            return None;
        }
        let open = offset + caps.get(0)?.end() - 1;
        let kind = if owner.is_some() {
            SymbolKind::Method
        } else {
            SymbolKind::Function
        };
        let mut decl = Declaration::callable(kind, name, open);
        decl.parent = owner;
        decl.return_type = return_type
            .filter(|t| t != "void" && t != "auto")
            .and_then(|t| normalize_type_name(Some(&t)));
        Some(decl)
    }
}

/// Keep `@brief` text; drop other Doxygen command lines.
fn clean_doxygen(doc: &str) -> Option<String> {
    let kept: Vec<&str> = doc
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            for brief in ["@brief ", "\\brief "] {
                if let Some(text) = line.strip_prefix(brief) {
                    return Some(text);
                }
            }
            (!line.starts_with('@') && !line.starts_with('\\')).then_some(line)
        })
        .collect();
    let text = kept.join("\n");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl PatternLanguage for CppExtractor {
    fn syntax(&self) -> &CommentSyntax {
        &CPP_SYNTAX
    }

    fn param_style(&self) -> ParamStyle {
        ParamStyle::TypeThenName
    }

    fn attribute(&self, line: &ScanLine<'_>) -> Option<Attribute> {
        let text = line.source_text();
        if text.starts_with('#') {
            return Some(Attribute::Transparent);
        }
        let (found, offset) = Self::strip_prefixes(text);
        if offset > 0 && text[offset..].trim().is_empty() {
            return Some(Attribute::Decorators(found));
        }
        None
    }

    fn declaration(&self, code: &str, ctx: Context<'_>) -> Option<Declaration> {
        if CPP_NAMESPACE_RE.is_match(code) {
            return Some(Declaration::scope_only("", BodyRole::Namespace(None)));
        }
        let (attributes, offset) = Self::strip_prefixes(code);
        let rest = &code[offset..];
        let mut decl = Self::type_declaration(rest)
            .or_else(|| Self::function_declaration(rest, offset, ctx))?;
        decl.decorators = attributes;
        Some(decl)
    }

    /// Trailing return types: `auto f() -> int`.
    fn return_type(&self, after_params: &str) -> Option<String> {
        let rest = after_params.split("->").nth(1)?;
        let end = rest.find(['{', ';']).unwrap_or(rest.len());
        normalize_type_name(Some(&rest[..end]))
    }

    fn clean_doc(&self, doc: &str) -> Option<String> {
        clean_doxygen(doc)
    }
}

impl LanguageExtractor for CppExtractor {
    fn language_name(&self) -> &str {
        "cpp"
    }

    fn file_extensions(&self) -> &[&str] {
        &["c", "h", "cpp", "hpp", "cc", "cxx", "hh", "hxx"]
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

    const SOURCE: &str = r#"#include <vector>

namespace geo {

/**
 * @brief A 2D point.
 */
class Point {
public:
    Point(double x, double y);

    /// Distance to the origin.
    double norm() const;

    [[deprecated("use norm")]]
    double length() const { return norm(); }

private:
    double x_, y_;
};

// plain comment, not a doc
struct Size;

}  // namespace geo

Point::Point(double x, double y) : x_(x), y_(y) {}

double Point::norm() const {
    return 0.0;
}

template <typename T>
T clamp(T value, T lo, T hi) {
    return value;
}

static const char *name_of(int code) {
    switch (code) {
    default:
        return "";
    }
}

REGISTER_MODULE(geo);
"#;

    #[test]
    fn test_extracts_cpp_symbols() {
        let symbols = CppExtractor.extract(SOURCE).unwrap();
        let names: Vec<(&str, SymbolKind, Option<&str>)> = symbols
            .iter()
            .map(|s| (s.name.as_str(), s.kind, s.parent.as_deref()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Point", SymbolKind::Class, None),
                ("Point", SymbolKind::Method, Some("Point")),
                ("norm", SymbolKind::Method, Some("Point")),
                ("length", SymbolKind::Method, Some("Point")),
                ("Point", SymbolKind::Method, Some("Point")),
                ("norm", SymbolKind::Method, Some("Point")),
                ("clamp", SymbolKind::Function, None),
                ("name_of", SymbolKind::Function, None),
            ]
        );
    }

    #[test]
    fn test_doxygen_and_attributes() {
        let symbols = CppExtractor.extract(SOURCE).unwrap();
        assert_eq!(symbols[0].docstring.as_deref(), Some("A 2D point."));
        assert_eq!(symbols[0].line_span, (8, 20));
        assert_eq!(symbols[2].docstring.as_deref(), Some("Distance to the origin."));
        assert_eq!(symbols[2].signature.return_type.as_deref(), Some("double"));
        assert!(symbols[3].is_deprecated_marker);
    }

    #[test]
    fn test_free_function_signatures() {
        let symbols = CppExtractor.extract(SOURCE).unwrap();
        let clamp = &symbols[6];
        assert_eq!(clamp.signature.parameters.len(), 3);
        assert_eq!(clamp.signature.return_type.as_deref(), Some("T"));
        let name_of = &symbols[7];
        assert_eq!(name_of.signature.return_type.as_deref(), Some("const char *"));
        assert_eq!(name_of.docstring, None);
    }
}
