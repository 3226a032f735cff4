//! Line scanner shared by the pattern-based extractors.
//!
//! These extractors are heuristic by choice: declarations are found with
//! anchored regexes, bodies with a brace-depth counter. Unusual formatting
//! (declarations split before the name, exotic brace styles, regex literals
//! containing braces) can over- or under-extract.
//!
//! Scoping rules:
//! - A declaration is only recognised directly inside its enclosing scope,
//!   i.e. at exactly one brace level below the scope's opening depth.
//! - Functions declared directly inside a type-like scope become methods of
//!   that type; anything inside a function body is never extracted.
//! - A comment block is attached as the docstring only if no blank line
//!   separates it from the declaration. Attribute / annotation lines may sit
//!   between the two.
//! - Parameter lists may span up to `MAX_SIGNATURE_LINES` lines.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::ExtractError;
use crate::indexer::params::{parse_parameters, ParamStyle};
use crate::models::{Parameter, Signature, Symbol, SymbolKind};

const MAX_SIGNATURE_LINES: usize = 8;

/// How far (in lines) a declaration may be from its opening brace.
const MAX_OPENER_DISTANCE: usize = 4;

static DEPRECATED_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bdeprecated\b").unwrap());

static CHAR_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^'(?:\\[^']{1,10}|[^\\'])'").unwrap());

// ---------------------------------------------------------------------------
// Comment / string syntax
// ---------------------------------------------------------------------------

/// Lexical conventions needed to blank out comments and literals.
pub(crate) struct CommentSyntax {
    pub line: &'static [&'static str],
    pub block: Option<(&'static str, &'static str)>,
    /// Quotes whose literals end at the line end.
    pub quotes: &'static [char],
    /// Quote tokens whose literals may span lines (checked before `quotes`).
    pub multiline_quotes: &'static [&'static str],
    /// Comment openers that never form part of a docstring (e.g. `//!`).
    pub non_doc: &'static [&'static str],
    /// When set, only comments starting with one of these count as docs.
    pub doc_only: Option<&'static [&'static str]>,
}

impl CommentSyntax {
    pub const C_FAMILY: CommentSyntax = CommentSyntax {
        line: &["//"],
        block: Some(("/*", "*/")),
        quotes: &['"'],
        multiline_quotes: &[],
        non_doc: &[],
        doc_only: None,
    };

    fn is_doc(&self, comment: &str) -> bool {
        if self.non_doc.iter().any(|p| comment.starts_with(p)) {
            return false;
        }
        match self.doc_only {
            Some(prefixes) => prefixes.iter().any(|p| comment.starts_with(p)),
            None => true,
        }
    }
}

/// One source line with comments and string contents removed from `code`.
#[derive(Debug, Clone)]
pub(crate) struct ScanLine<'a> {
    /// 1-based.
    pub number: usize,
    pub raw: &'a str,
    pub code: String,
    /// Cleaned comment text on this line and whether it counts as a doc comment.
    pub comment: Option<(String, bool)>,
}

impl ScanLine<'_> {
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    pub fn has_code(&self) -> bool {
        !self.code.trim().is_empty()
    }

    /// Original text when the line carries no comment, otherwise the
    /// stripped code (string contents blanked).
    pub fn source_text(&self) -> &str {
        if self.comment.is_some() {
            self.code.trim()
        } else {
            self.raw.trim()
        }
    }
}

enum Open {
    Block { doc: bool, since: usize },
    Str { close: &'static str, since: usize },
}

fn strip_comment_marker(text: &str) -> &str {
    let text = text.trim_start_matches(['/', '!', '#']);
    text.strip_prefix(' ').unwrap_or(text)
}

fn clean_block_line(text: &str) -> String {
    let trimmed = text.trim();
    let trimmed = trimmed.strip_prefix('*').unwrap_or(trimmed);
    trimmed.strip_prefix(' ').unwrap_or(trimmed).trim_end().to_string()
}

/// Byte length of a string literal starting at `rest` (which begins with the
/// quote), or `rest.len()` if it is not closed on this line.
fn string_len(rest: &str, quote: char) -> usize {
    let mut escaped = false;
    for (i, ch) in rest.char_indices().skip(1) {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == quote {
            return i + ch.len_utf8();
        }
    }
    rest.len()
}

fn find_unescaped(haystack: &str, needle: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, ch) in haystack.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if haystack[i..].starts_with(needle) {
            return Some(i);
        }
    }
    None
}

/// Split `source` into lines with comment text separated from code and
/// literal contents blanked out.
pub(crate) fn preprocess<'a>(
    source: &'a str,
    syntax: &CommentSyntax,
) -> Result<Vec<ScanLine<'a>>, ExtractError> {
    let mut lines = Vec::new();
    let mut open: Option<Open> = None;

    for (idx, raw) in source.lines().enumerate() {
        let number = idx + 1;
        let mut code = String::with_capacity(raw.len());
        let mut comment_parts: Vec<String> = Vec::new();
        let mut comment_doc: Option<bool> = None;
        let mut i = 0;

        while i < raw.len() {
            let rest = &raw[i..];
            match &open {
                Some(Open::Block { doc, .. }) => {
                    let doc = *doc;
                    let close = syntax.block.map(|(_, c)| c).unwrap_or("*/");
                    comment_doc.get_or_insert(doc);
                    match rest.find(close) {
                        Some(pos) => {
                            comment_parts.push(clean_block_line(&rest[..pos]));
                            i += pos + close.len();
                            open = None;
                        }
                        None => {
                            comment_parts.push(clean_block_line(rest));
                            i = raw.len();
                        }
                    }
                    continue;
                }
                Some(Open::Str { close, .. }) => {
                    match find_unescaped(rest, close) {
                        Some(pos) => {
                            code.push_str(close);
                            i += pos + close.len();
                            open = None;
                        }
                        None => i = raw.len(),
                    }
                    continue;
                }
                None => {}
            }

            if syntax.line.iter().any(|t| rest.starts_with(t)) {
                comment_doc.get_or_insert(syntax.is_doc(rest));
                comment_parts.push(strip_comment_marker(rest).trim_end().to_string());
                break;
            }
            if let Some((opener, _)) = syntax.block {
                if rest.starts_with(opener) {
                    open = Some(Open::Block {
                        doc: syntax.is_doc(rest),
                        since: number,
                    });
                    i += opener.len();
                    while raw[i..].starts_with('!')
                        || (raw[i..].starts_with('*') && !raw[i..].starts_with("*/"))
                    {
                        i += 1;
                    }
                    continue;
                }
            }
            if let Some(token) = syntax.multiline_quotes.iter().find(|q| rest.starts_with(**q)) {
                code.push_str(token);
                i += token.len();
                open = Some(Open::Str {
                    close: token,
                    since: number,
                });
                continue;
            }
            let Some(ch) = rest.chars().next() else {
                break;
            };
            if syntax.quotes.contains(&ch) {
                code.push(ch);
                code.push(ch);
                i += string_len(rest, ch);
                continue;
            }
            if ch == '\'' {
                if let Some(m) = CHAR_LITERAL_RE.find(rest) {
                    code.push_str("''");
                    i += m.end();
                    continue;
                }
            }
            code.push(ch);
            i += ch.len_utf8();
        }

        lines.push(ScanLine {
            number,
            raw,
            code,
            comment: comment_doc.map(|doc| (comment_parts.join(" "), doc)),
        });
    }

    match open {
        Some(Open::Block { since, .. }) => {
            Err(ExtractError::at_line("unterminated block comment", since))
        }
        Some(Open::Str { since, .. }) => {
            Err(ExtractError::at_line("unterminated string literal", since))
        }
        None => Ok(lines),
    }
}

// ---------------------------------------------------------------------------
// Docstrings and markers
// ---------------------------------------------------------------------------

/// Accumulates the contiguous comment block preceding a declaration.
#[derive(Debug, Default)]
pub(crate) struct DocBuffer {
    lines: Vec<String>,
}

impl DocBuffer {
    pub fn push(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Join the block, trimming empty leading / trailing lines.
    pub fn take(&mut self) -> Option<String> {
        let text = self.lines.join("\n");
        self.lines.clear();
        let text = text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text.to_string())
        }
    }
}

/// Drop Javadoc-style `@tag` lines from a doc block.
pub(crate) fn drop_tag_lines(doc: &str) -> Option<String> {
    let kept: Vec<&str> = doc
        .lines()
        .filter(|l| !l.trim_start().starts_with('@'))
        .collect();
    let text = kept.join("\n");
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

static LEADING_ANNOTATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*@([A-Za-z_][\w.]*(?:\s*\([^()]*(?:\([^()]*\)[^()]*)*\))?)\s+").unwrap()
});

/// Split `@Annotation(...)` prefixes off a declaration line. Returns the
/// annotation texts (without `@`) and the byte offset where the rest begins.
pub(crate) fn strip_leading_annotations(code: &str) -> (Vec<String>, usize) {
    let mut found = Vec::new();
    let mut offset = 0;
    while let Some(caps) = LEADING_ANNOTATION_RE.captures(&code[offset..]) {
        let text = &caps[1];
        if text == "interface" {
            break;
        }
        found.push(text.to_string());
        offset += caps.get(0).map_or(0, |m| m.end());
    }
    (found, offset)
}

/// `@Annotation` lines (Java, Kotlin, TypeScript decorators).
pub(crate) fn annotation_line(line: &ScanLine<'_>) -> Option<Attribute> {
    let text = line.source_text();
    if !text.starts_with('@') || text.starts_with("@interface") {
        return None;
    }
    let padded = format!("{text} ");
    let (found, offset) = strip_leading_annotations(&padded);
    if !found.is_empty() && padded[offset..].trim().is_empty() {
        return Some(Attribute::Decorators(found));
    }
    // `@Component({` opening a multi-line argument list.
    if found.is_empty() && text.matches('(').count() > text.matches(')').count() {
        return Some(Attribute::Decorators(vec![text[1..].to_string()]));
    }
    None
}

/// Explicit deprecation: a decorator / annotation / attribute naming
/// `deprecated` or `Obsolete`, or the word "deprecated" in the docstring
/// (`@deprecated`, `Deprecated:`).
pub(crate) fn detect_deprecation(decorators: &[String], docstring: Option<&str>) -> bool {
    decorators.iter().any(|d| {
        let lower = d.to_lowercase();
        lower.contains("deprecated") || lower.starts_with("obsolete")
    }) || docstring.is_some_and(|d| DEPRECATED_WORD_RE.is_match(d))
}

// ---------------------------------------------------------------------------
// Language hooks
// ---------------------------------------------------------------------------

/// What the body of a declaration contains, for scoping nested declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BodyRole {
    /// Functions declared directly inside become methods of this type.
    Members(String),
    /// Functions declared directly inside stay functions, parented to the
    /// namespace name if there is one.
    Namespace(Option<String>),
    /// Nothing inside is extracted.
    Opaque,
}

/// Where a candidate declaration line sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Context<'s> {
    TopLevel { namespace: Option<&'s str> },
    Member { owner: &'s str },
}

impl<'s> Context<'s> {
    pub fn owner(&self) -> Option<&'s str> {
        match self {
            Context::TopLevel { namespace } => *namespace,
            Context::Member { owner } => Some(owner),
        }
    }

    pub fn is_member(&self) -> bool {
        matches!(self, Context::Member { .. })
    }
}

/// A declaration recognised on one line.
#[derive(Debug, Clone)]
pub(crate) struct Declaration {
    /// `None` for scope-only constructs (Rust `impl`, C# `namespace`).
    pub kind: Option<SymbolKind>,
    pub name: String,
    /// Overrides the contextual parent (Go receivers, C++ `Type::method`).
    pub parent: Option<String>,
    /// Byte offset of the opening `(` of the parameter list in `code`.
    pub params_at: Option<usize>,
    pub return_type: Option<String>,
    pub body: BodyRole,
    pub decorators: Vec<String>,
    /// Only a declaration if `=>` follows the parameter list.
    pub requires_arrow: bool,
}

impl Declaration {
    pub fn new(kind: SymbolKind, name: impl Into<String>, body: BodyRole) -> Self {
        Self {
            kind: Some(kind),
            name: name.into(),
            parent: None,
            params_at: None,
            return_type: None,
            body,
            decorators: Vec::new(),
            requires_arrow: false,
        }
    }

    pub fn scope_only(name: impl Into<String>, body: BodyRole) -> Self {
        Self {
            kind: None,
            ..Self::new(SymbolKind::Module, name, body)
        }
    }

    /// A callable whose parameter list opens at byte `open_paren` of the line.
    pub fn callable(kind: SymbolKind, name: impl Into<String>, open_paren: usize) -> Self {
        Self {
            params_at: Some(open_paren),
            ..Self::new(kind, name, BodyRole::Opaque)
        }
    }
}

/// Annotation-like line preceding a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Attribute {
    Decorators(Vec<String>),
    /// Keeps the pending docstring but records nothing (`template<...>`).
    Transparent,
}

/// Per-language hooks for [`scan`].
pub(crate) trait PatternLanguage: Send + Sync {
    fn syntax(&self) -> &CommentSyntax;

    fn param_style(&self) -> ParamStyle;

    fn attribute(&self, _line: &ScanLine<'_>) -> Option<Attribute> {
        None
    }

    fn declaration(&self, code: &str, ctx: Context<'_>) -> Option<Declaration>;

    /// Return annotation written after the parameter list.
    fn return_type(&self, _after_params: &str) -> Option<String> {
        None
    }

    fn keep_parameter(&self, _parameter: &Parameter) -> bool {
        true
    }

    fn clean_doc(&self, doc: &str) -> Option<String> {
        Some(doc.to_string())
    }
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

struct Scope {
    symbol: Option<usize>,
    body: BodyRole,
    base_depth: usize,
}

struct Pending {
    symbol: Option<usize>,
    body: BodyRole,
    last_line: usize,
}

fn context(scopes: &[Scope], depth: usize) -> Option<Context<'_>> {
    match scopes.last() {
        None => (depth == 0).then_some(Context::TopLevel { namespace: None }),
        Some(top) if depth == top.base_depth + 1 => match &top.body {
            BodyRole::Members(owner) => Some(Context::Member { owner }),
            BodyRole::Namespace(ns) => Some(Context::TopLevel {
                namespace: ns.as_deref(),
            }),
            BodyRole::Opaque => None,
        },
        Some(_) => None,
    }
}

/// Collect a parameter list that opens at `lines[start].code[open..]`,
/// following it across lines. Returns `(params, end_index, text_after)`.
pub(crate) fn collect_parenthesized(
    lines: &[ScanLine<'_>],
    start: usize,
    open: usize,
) -> (String, usize, String) {
    let mut depth = 0i32;
    let mut params = String::new();
    let last = (start + MAX_SIGNATURE_LINES).min(lines.len().saturating_sub(1));
    for (idx, line) in lines.iter().enumerate().take(last + 1).skip(start) {
        let text = if idx == start {
            line.code.get(open..).unwrap_or("")
        } else {
            line.code.as_str()
        };
        for (pos, ch) in text.char_indices() {
            match ch {
                '(' => {
                    depth += 1;
                    if depth == 1 {
                        continue;
                    }
                }
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let after = text[pos + 1..].to_string();
                        return (params, idx, after);
                    }
                }
                _ => {}
            }
            params.push(ch);
        }
        params.push(' ');
    }
    (params, start, String::new())
}

/// Run `lang` over `source`.
pub(crate) fn scan<L: PatternLanguage + ?Sized>(
    lang: &L,
    source: &str,
) -> Result<Vec<Symbol>, ExtractError> {
    let lines = preprocess(source, lang.syntax())?;
    let mut symbols: Vec<Symbol> = Vec::new();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut depth = 0usize;
    let mut paren_depth = 0usize;
    let mut doc = DocBuffer::default();
    let mut decorators: Vec<String> = Vec::new();
    let mut pending: Option<Pending> = None;
    let mut signature_end = 0usize;

    for (idx, line) in lines.iter().enumerate() {
        if !line.has_code() {
            if line.is_blank() {
                doc.clear();
                pending = None;
            } else if let Some((text, true)) = &line.comment {
                doc.push(text);
            }
            continue;
        }

        if let Some(p) = &pending {
            if line.number > p.last_line + MAX_OPENER_DISTANCE {
                pending = None;
            }
        }

        // Continuation of a multi-line annotation or call expression.
        if paren_depth > 0 && pending.is_none() && line.number > signature_end {
            count_braces(line, &mut depth, &mut paren_depth, &mut scopes, &mut pending, &mut symbols)?;
            continue;
        }

        if line.number > signature_end {
            if let Some(attr) = lang.attribute(line) {
                pending = None;
                if let Attribute::Decorators(found) = attr {
                    decorators.extend(found);
                }
                count_braces(line, &mut depth, &mut paren_depth, &mut scopes, &mut pending, &mut symbols)?;
                continue;
            }

            let found = context(&scopes, depth)
                .and_then(|ctx| lang.declaration(&line.code, ctx).map(|d| (d, ctx)));
            if let Some((decl, ctx)) = found {
                pending = None;
                let owner = ctx.owner().map(str::to_string);
                if let Some(mut symbol_pending) =
                    build_symbol(lang, &lines, idx, decl, ctx, owner, &mut doc, &mut decorators)
                {
                    signature_end = symbol_pending.last_line;
                    if let Some(symbol) = symbol_pending.symbol.take_symbol() {
                        symbol_pending.pending.symbol = Some(symbols.len());
                        symbols.push(symbol);
                    }
                    pending = symbol_pending.open.then_some(symbol_pending.pending);
                }
            }
            doc.clear();
            decorators.clear();
        }

        count_braces(line, &mut depth, &mut paren_depth, &mut scopes, &mut pending, &mut symbols)?;
    }

    if depth != 0 {
        let line = lines.last().map(|l| l.number).unwrap_or(0);
        return Err(ExtractError::at_line(
            format!("unbalanced braces: {depth} unclosed"),
            line,
        ));
    }
    Ok(symbols)
}

enum MaybeSymbol {
    Symbol(Box<Symbol>),
    ScopeOnly,
}

impl MaybeSymbol {
    fn take_symbol(&mut self) -> Option<Symbol> {
        match std::mem::replace(self, MaybeSymbol::ScopeOnly) {
            MaybeSymbol::Symbol(s) => Some(*s),
            MaybeSymbol::ScopeOnly => None,
        }
    }
}

struct Built {
    symbol: MaybeSymbol,
    pending: Pending,
    /// Whether a body may still open.
    open: bool,
    last_line: usize,
}

/// `fun f(): Int = 1` style bodies: an assignment `=` before any `{`.
fn has_expression_body(after_params: &str) -> bool {
    let Some(eq) = after_params.find('=') else {
        return false;
    };
    if after_params[eq..].starts_with("==") || after_params[eq..].starts_with("=>") {
        return false;
    }
    if after_params[..eq].ends_with(['!', '<', '>']) {
        return false;
    }
    after_params.find('{').map_or(true, |brace| eq < brace)
}

#[allow(clippy::too_many_arguments)]
fn build_symbol<L: PatternLanguage + ?Sized>(
    lang: &L,
    lines: &[ScanLine<'_>],
    idx: usize,
    decl: Declaration,
    ctx: Context<'_>,
    owner: Option<String>,
    doc: &mut DocBuffer,
    decorators: &mut Vec<String>,
) -> Option<Built> {
    let line = &lines[idx];
    let (params_raw, end_idx, after) = match decl.params_at {
        Some(open) => collect_parenthesized(lines, idx, open),
        None => (String::new(), idx, String::new()),
    };
    if decl.requires_arrow && !after.contains("=>") {
        return None;
    }
    let last_line = lines[end_idx].number;
    let expression_body = has_expression_body(&after);

    // Members of a nested type are parented to its dotted path (`Outer.Inner`).
    let body = match (decl.body, ctx, decl.kind) {
        (BodyRole::Members(name), Context::Member { owner }, Some(_)) => {
            BodyRole::Members(format!("{owner}.{name}"))
        }
        (body, _, _) => body,
    };

    let symbol = match decl.kind {
        None => MaybeSymbol::ScopeOnly,
        Some(kind) => {
            let kind = if kind == SymbolKind::Function && ctx.is_member() {
                SymbolKind::Method
            } else {
                kind
            };
            let parameters = if decl.params_at.is_some() {
                parse_parameters(&params_raw, lang.param_style())
                    .into_iter()
                    .filter(|p| lang.keep_parameter(p))
                    .collect()
            } else {
                Vec::new()
            };
            let return_type = decl.return_type.or_else(|| {
                if decl.params_at.is_some() {
                    lang.return_type(&after)
                } else {
                    None
                }
            });
            let mut symbol = Symbol::new(kind, decl.name, line.number);
            symbol.parent = decl.parent.or(owner);
            symbol.signature = Signature::new(parameters, return_type);
            symbol.decorators = std::mem::take(decorators);
            symbol.decorators.extend(decl.decorators);
            // Markers are read before tag lines are cleaned out of the doc.
            let raw_doc = doc.take();
            symbol.is_deprecated_marker =
                detect_deprecation(&symbol.decorators, raw_doc.as_deref());
            symbol.docstring = raw_doc.and_then(|d| lang.clean_doc(&d));
            symbol.line_span = (line.number, last_line);
            MaybeSymbol::Symbol(Box::new(symbol))
        }
    };

    Some(Built {
        symbol,
        pending: Pending {
            symbol: None,
            body,
            last_line,
        },
        open: !expression_body,
        last_line,
    })
}

fn count_braces(
    line: &ScanLine<'_>,
    depth: &mut usize,
    paren_depth: &mut usize,
    scopes: &mut Vec<Scope>,
    pending: &mut Option<Pending>,
    symbols: &mut [Symbol],
) -> Result<(), ExtractError> {
    for ch in line.code.chars() {
        match ch {
            '(' => *paren_depth += 1,
            ')' => *paren_depth = paren_depth.saturating_sub(1),
            '{' => {
                if *paren_depth == 0 {
                    if let Some(p) = pending.take() {
                        scopes.push(Scope {
                            symbol: p.symbol,
                            body: p.body,
                            base_depth: *depth,
                        });
                    }
                }
                *depth += 1;
            }
            '}' => {
                if *depth == 0 {
                    return Err(ExtractError::at_line(
                        "unbalanced braces: unexpected '}'",
                        line.number,
                    ));
                }
                *depth -= 1;
                if scopes.last().is_some_and(|s| s.base_depth == *depth) {
                    if let Some(scope) = scopes.pop() {
                        if let Some(i) = scope.symbol {
                            symbols[i].line_span.1 = line.number;
                        }
                    }
                }
            }
            ';' if *paren_depth == 0 => {
                *pending = None;
            }
            _ => {}
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preprocess_strips_comments_and_strings() {
        let src = "let s = \"{ not a brace }\"; // trailing {\nfoo('{');";
        let lines = preprocess(src, &CommentSyntax::C_FAMILY).unwrap();
        assert_eq!(lines[0].code.trim(), "let s = \"\";");
        assert_eq!(lines[0].comment.as_ref().unwrap().0, "trailing {");
        assert_eq!(lines[1].code, "foo('');");
    }

    #[test]
    fn test_preprocess_block_comment_lines() {
        let src = "/**\n * Adds numbers.\n *\n * More.\n */\nint x;";
        let lines = preprocess(src, &CommentSyntax::C_FAMILY).unwrap();
        assert!(!lines[0].has_code());
        assert_eq!(lines[1].comment.as_ref().unwrap().0, "Adds numbers.");
        assert_eq!(lines[3].comment.as_ref().unwrap().0, "More.");
        assert!(lines[5].has_code());
    }

    #[test]
    fn test_empty_block_comment_closes() {
        let lines = preprocess("/**/ int x;", &CommentSyntax::C_FAMILY).unwrap();
        assert_eq!(lines[0].code.trim(), "int x;");
    }

    #[test]
    fn test_unterminated_block_comment_is_error() {
        let err = preprocess("int x;\n/* never closed\n", &CommentSyntax::C_FAMILY).unwrap_err();
        assert_eq!(err.line, Some(2));
    }

    #[test]
    fn test_doc_buffer_trims() {
        let mut doc = DocBuffer::default();
        doc.push("");
        doc.push("Line one.");
        doc.push("");
        doc.push("Line two.");
        doc.push("");
        assert_eq!(doc.take().as_deref(), Some("Line one.\n\nLine two."));
        assert_eq!(doc.take(), None);
    }

    #[test]
    fn test_detect_deprecation() {
        assert!(detect_deprecation(&["Deprecated".to_string()], None));
        assert!(detect_deprecation(&["Obsolete(\"use Bar\")".to_string()], None));
        assert!(detect_deprecation(&[], Some("@deprecated use bar")));
        assert!(detect_deprecation(&[], Some("Deprecated: use Bar.")));
        assert!(!detect_deprecation(&["Override".to_string()], Some("Adds.")));
    }

    #[test]
    fn test_strip_leading_annotations() {
        let code = "@Override @SuppressWarnings(\"\") public void run() {";
        let (found, offset) = strip_leading_annotations(code);
        assert_eq!(found, vec!["Override", "SuppressWarnings(\"\")"]);
        assert!(code[offset..].starts_with("public void run"));
        let (found, _) = strip_leading_annotations("@interface Marker {");
        assert!(found.is_empty());
    }

    #[test]
    fn test_expression_body_detection() {
        assert!(has_expression_body(" = 1"));
        assert!(has_expression_body(": Int = compute()"));
        assert!(!has_expression_body(" => {"));
        assert!(!has_expression_body(" {"));
        assert!(!has_expression_body(" { x = 1 }"));
    }

    #[test]
    fn test_drop_tag_lines() {
        let doc = "Adds two numbers.\n@param a first\n@return sum";
        assert_eq!(drop_tag_lines(doc).as_deref(), Some("Adds two numbers."));
        assert_eq!(drop_tag_lines("@deprecated"), None);
    }

    #[test]
    fn test_collect_parenthesized_across_lines() {
        let src = "int add(\n    int a,\n    int b) {";
        let lines = preprocess(src, &CommentSyntax::C_FAMILY).unwrap();
        let open = lines[0].code.find('(').unwrap();
        let (params, end, after) = collect_parenthesized(&lines, 0, open);
        assert_eq!(end, 2);
        assert_eq!(params.split_whitespace().collect::<Vec<_>>().join(" "), "int a, int b");
        assert_eq!(after.trim(), "{");
    }
}
