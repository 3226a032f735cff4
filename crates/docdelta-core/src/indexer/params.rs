//! Parameter-list parsing shared by the pattern-based extractors.
//!
//! Each language family writes parameters differently; `ParamStyle` selects
//! how a single comma-separated chunk is split into name, type, and default.

use crate::models::Parameter;

/// How a parameter chunk is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `name: Type = default` (TypeScript, Kotlin, Rust).
    NameColonType,
    /// `name Type` with Go's shared trailing type (`a, b int`).
    Go,
    /// `Type name = default` (Java, C#, C/C++).
    TypeThenName,
    /// `name = default`, `*rest`, `key:`, `&block` (Ruby).
    Ruby,
}

/// Normalize a type name: trim whitespace and trailing semicolons.
/// Returns `None` if the result is empty or the input is `None`.
pub fn normalize_type_name(type_name: Option<&str>) -> Option<String> {
    let raw = type_name?;
    let normalized = raw.trim().trim_end_matches(';').trim();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

/// Split on commas that are not nested inside `<>`, `()`, `[]`, or `{}`.
pub fn split_top_level(raw: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    for ch in raw.chars() {
        match ch {
            '<' | '(' | '[' | '{' => {
                depth += 1;
                current.push(ch);
            }
            // `->` and `=>` are not closing brackets.
            '>' if current.ends_with('-') || current.ends_with('=') => current.push(ch),
            '>' | ')' | ']' | '}' => {
                depth = (depth - 1).max(0);
                current.push(ch);
            }
            ',' if depth == 0 => {
                parts.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

/// Split `chunk` at the first top-level `=` that is not part of `==`, `=>`,
/// `<=`, `>=`, or `!=`.
fn split_default(chunk: &str) -> (&str, bool) {
    let bytes = chunk.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'<' | b'(' | b'[' | b'{' => depth += 1,
            b'>' | b')' | b']' | b'}' => depth -= 1,
            b'=' if depth <= 0 => {
                let prev = if i > 0 { bytes[i - 1] } else { b' ' };
                let next = bytes.get(i + 1).copied().unwrap_or(b' ');
                if matches!(prev, b'=' | b'<' | b'>' | b'!') || matches!(next, b'=' | b'>') {
                    continue;
                }
                return (&chunk[..i], true);
            }
            _ => {}
        }
    }
    (chunk, false)
}

fn tokens(chunk: &str) -> Vec<&str> {
    chunk.split_whitespace().collect()
}

/// Modifiers that may precede a `name: Type` parameter.
const NAME_MODIFIERS: &[&str] = &[
    "vararg ",
    "val ",
    "var ",
    "mut ",
    "readonly ",
    "public ",
    "private ",
    "protected ",
    "override ",
];

fn parse_name_colon_type(chunk: &str) -> Option<Parameter> {
    let (decl, has_default) = split_default(chunk);
    let decl = decl.trim();
    let (name, ty) = match find_top_level_colon(decl) {
        Some(pos) => (decl[..pos].trim(), normalize_type_name(Some(&decl[pos + 1..]))),
        None => (decl, None),
    };
    let mut name = name.trim_start_matches("...");
    while let Some(rest) = NAME_MODIFIERS
        .iter()
        .find_map(|m| name.strip_prefix(*m))
    {
        name = rest.trim_start();
    }
    let name = name.trim().trim_end_matches('?').to_string();
    if name.is_empty() {
        return None;
    }
    Some(Parameter {
        name,
        type_annotation: ty,
        has_default,
    })
}

fn find_top_level_colon(decl: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, ch) in decl.char_indices() {
        match ch {
            '<' | '(' | '[' | '{' => depth += 1,
            '>' | ')' | ']' | '}' => depth -= 1,
            ':' if depth == 0 => {
                // `::` belongs to a path, not a type annotation.
                if decl[i + 1..].starts_with(':') || (i > 0 && decl[..i].ends_with(':')) {
                    continue;
                }
                return Some(i);
            }
            _ => {}
        }
    }
    None
}

fn parse_type_then_name(chunk: &str) -> Option<Parameter> {
    let (decl, has_default) = split_default(chunk);
    let cleaned = strip_annotations(decl).replace("...", "[]");
    let parts = tokens(&cleaned);
    let last = parts.last()?;
    if parts.len() == 1 {
        // Unnamed prototype parameter (`int`, `void`).
        if *last == "void" {
            return None;
        }
        return Some(Parameter {
            name: last.to_string(),
            type_annotation: None,
            has_default,
        });
    }
    let (name, mut ty) = split_pointer_name(last, &parts[..parts.len() - 1].join(" "));
    if name.is_empty() {
        return None;
    }
    for modifier in ["ref ", "out ", "in ", "params ", "this ", "final "] {
        if let Some(rest) = ty.strip_prefix(modifier) {
            ty = rest.to_string();
        }
    }
    Some(Parameter {
        name,
        type_annotation: normalize_type_name(Some(&ty)),
        has_default,
    })
}

/// `char *name` and `int name[]` keep their pointer / array marks on the type.
fn split_pointer_name(last: &str, head: &str) -> (String, String) {
    let name_start = last
        .find(|c: char| c.is_alphanumeric() || c == '_' || c == '$')
        .unwrap_or(last.len());
    let (marks, rest) = last.split_at(name_start);
    let name_end = rest
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(rest.len());
    let (name, suffix) = rest.split_at(name_end);
    let ty = format!("{head}{marks}{suffix}");
    (name.to_string(), ty)
}

fn strip_annotations(decl: &str) -> String {
    decl.split_whitespace()
        .filter(|tok| !tok.starts_with('@') && !(tok.starts_with('[') && tok.ends_with(']')))
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_go(chunks: &[String]) -> Vec<Parameter> {
    let mut parameters: Vec<Parameter> = Vec::new();
    let mut untyped: Vec<usize> = Vec::new();
    for chunk in chunks {
        let chunk = chunk.trim();
        let parts = tokens(chunk);
        let Some(first) = parts.first() else {
            continue;
        };
        let name = first.replace("...", "");
        if parts.len() > 1 {
            let ty = parts[1..].join(" ");
            for idx in untyped.drain(..) {
                parameters[idx].type_annotation = Some(ty.clone());
            }
            parameters.push(Parameter::typed(name, ty));
        } else {
            untyped.push(parameters.len());
            parameters.push(Parameter::new(name));
        }
    }
    parameters
}

fn parse_ruby(chunk: &str) -> Option<Parameter> {
    let chunk = chunk.trim();
    let (decl, mut has_default) = split_default(chunk);
    let mut name = decl.trim();
    if let Some(stripped) = name.strip_suffix(':') {
        name = stripped;
    } else if let Some(pos) = name.find(": ") {
        // keyword argument with a default value
        name = &name[..pos];
        has_default = true;
    }
    let name = name.trim_start_matches("**").trim_start_matches(['*', '&']);
    if name.is_empty() {
        return None;
    }
    Some(Parameter {
        name: name.to_string(),
        type_annotation: None,
        has_default,
    })
}

/// Parse a raw comma-separated parameter string into `Parameter` entries.
pub fn parse_parameters(params_raw: &str, style: ParamStyle) -> Vec<Parameter> {
    let trimmed = params_raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let chunks = split_top_level(trimmed);
    if style == ParamStyle::Go {
        return parse_go(&chunks);
    }
    chunks
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .filter_map(|chunk| match style {
            ParamStyle::NameColonType => parse_name_colon_type(chunk),
            ParamStyle::TypeThenName => parse_type_then_name(chunk),
            ParamStyle::Ruby => parse_ruby(chunk),
            ParamStyle::Go => None,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
