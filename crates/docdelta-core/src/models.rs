//! Shared typed models used across extraction, storage, and diffing.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 1. SymbolKind
// ---------------------------------------------------------------------------

/// The kind of a documentable declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Enum,
    Method,
    Struct,
    Trait,
    Module,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Interface => "interface",
            Self::Enum => "enum",
            Self::Method => "method",
            Self::Struct => "struct",
            Self::Trait => "trait",
            Self::Module => "module",
        }
    }

    /// Kinds that open a member scope (methods nest under them).
    pub fn is_container(&self) -> bool {
        !matches!(self, Self::Function | Self::Method)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function | Self::Method)
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// 2. Parameter / Signature
// ---------------------------------------------------------------------------

/// A single parameter of a function or method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_annotation: Option<String>,
    #[serde(default)]
    pub has_default: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: None,
            has_default: false,
        }
    }

    pub fn typed(name: impl Into<String>, type_annotation: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_annotation: Some(type_annotation.into()),
            has_default: false,
        }
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    fn render(&self) -> String {
        let mut out = self.name.clone();
        if let Some(ty) = &self.type_annotation {
            out.push_str(": ");
            out.push_str(ty);
        }
        if self.has_default {
            out.push_str(" = ...");
        }
        out
    }
}

/// Ordered parameter list plus optional return annotation.
///
/// Used for display and change detection only, never for type checking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
}

impl Signature {
    pub fn new(parameters: Vec<Parameter>, return_type: Option<String>) -> Self {
        Self {
            parameters,
            return_type,
        }
    }

    /// Identity component of a symbol key: the parameter arity.
    ///
    /// Overloads with different arities get distinct keys; parameter renames
    /// and type edits keep the key stable so they classify as modified.
    pub fn shape(&self) -> String {
        self.parameters.len().to_string()
    }

    /// Human-readable rendering, e.g. `foo(x: int, y = ...) -> str`.
    pub fn render(&self, name: &str) -> String {
        let params: Vec<String> = self.parameters.iter().map(Parameter::render).collect();
        match &self.return_type {
            Some(ret) => format!("{name}({}) -> {ret}", params.join(", ")),
            None => format!("{name}({})", params.join(", ")),
        }
    }
}

// ---------------------------------------------------------------------------
// 3. Symbol / SymbolKey
// ---------------------------------------------------------------------------

/// A documentable unit extracted from one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    /// Name of the enclosing symbol (class, impl target, module), if any.
    pub parent: Option<String>,
    #[serde(default)]
    pub signature: Signature,
    /// `None` marks an AI-fill candidate downstream.
    pub docstring: Option<String>,
    #[serde(default)]
    pub decorators: Vec<String>,
    #[serde(default)]
    pub is_deprecated_marker: bool,
    /// 1-based (start_line, end_line); informational only.
    pub line_span: (usize, usize),
}

impl Symbol {
    pub fn new(kind: SymbolKind, name: impl Into<String>, line: usize) -> Self {
        Self {
            kind,
            name: name.into(),
            parent: None,
            signature: Signature::default(),
            docstring: None,
            decorators: Vec::new(),
            is_deprecated_marker: false,
            line_span: (line, line),
        }
    }

    pub fn key(&self, file_path: &str) -> SymbolKey {
        SymbolKey {
            file_path: file_path.to_string(),
            kind: self.kind,
            parent: self.parent.clone(),
            name: self.name.clone(),
            signature_shape: self.signature.shape(),
        }
    }

    /// Name used to pair symbols whose key changed only by arity.
    pub(crate) fn loose_identity(&self) -> (SymbolKind, Option<&str>, &str) {
        (self.kind, self.parent.as_deref(), &self.name)
    }

    pub fn display_signature(&self) -> String {
        self.signature.render(&self.name)
    }

    pub fn start_line(&self) -> usize {
        self.line_span.0
    }
}

/// Stable diff join key: `(file, kind, parent, name, signature shape)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolKey {
    pub file_path: String,
    pub kind: SymbolKind,
    pub parent: Option<String>,
    pub name: String,
    pub signature_shape: String,
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.parent {
            Some(parent) => write!(
                f,
                "{}::{}.{}/{} ({})",
                self.file_path, parent, self.name, self.signature_shape, self.kind
            ),
            None => write!(
                f,
                "{}::{}/{} ({})",
                self.file_path, self.name, self.signature_shape, self.kind
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// 4. FileSnapshot / BuildSnapshot
// ---------------------------------------------------------------------------

/// One file's extraction result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    /// Path relative to the source root, `/`-separated.
    pub path: String,
    pub content_hash: String,
    pub language: String,
    /// Source appearance order.
    pub symbols: Vec<Symbol>,
    pub parse_ok: bool,
}

impl FileSnapshot {
    pub fn parsed(
        path: impl Into<String>,
        content_hash: impl Into<String>,
        language: impl Into<String>,
        symbols: Vec<Symbol>,
    ) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
            language: language.into(),
            symbols,
            parse_ok: true,
        }
    }

    /// A file whose extractor failed: no symbols, never silently dropped.
    pub fn failed(
        path: impl Into<String>,
        content_hash: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            content_hash: content_hash.into(),
            language: language.into(),
            symbols: Vec::new(),
            parse_ok: false,
        }
    }
}

/// Every file's extraction result for one build of one source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSnapshot {
    pub root: String,
    pub built_at: DateTime<Utc>,
    pub files: BTreeMap<String, FileSnapshot>,
}

impl BuildSnapshot {
    /// The first-run baseline: diffing against it classifies everything as added.
    pub fn empty(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            built_at: Utc::now(),
            files: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, file: FileSnapshot) {
        self.files.insert(file.path.clone(), file);
    }

    pub fn get(&self, path: &str) -> Option<&FileSnapshot> {
        self.files.get(path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.files.values().map(|f| f.symbols.len()).sum()
    }

    /// Symbols grouped by file, each group in source order.
    pub fn symbols_by_file(&self) -> impl Iterator<Item = (&str, &[Symbol])> {
        self.files
            .values()
            .map(|f| (f.path.as_str(), f.symbols.as_slice()))
    }

    /// Symbols without any attached docstring.
    pub fn ai_fill_candidates(&self) -> Vec<(&str, &Symbol)> {
        self.symbols_by_file()
            .flat_map(|(path, symbols)| {
                symbols
                    .iter()
                    .filter(|s| s.docstring.is_none())
                    .map(move |s| (path, s))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// 5. BuildWarning
// ---------------------------------------------------------------------------

/// Non-fatal conditions surfaced in the build report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildWarning {
    /// The extractor rejected the file; it was recorded with `parse_ok = false`.
    Extraction { path: String, message: String },
    /// Two symbols in one file shared a key; the later one was kept.
    DuplicateSymbol {
        key: String,
        first_line: usize,
        kept_line: usize,
    },
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extraction { path, message } => {
                write!(f, "extraction failed for {path}: {message}")
            }
            Self::DuplicateSymbol {
                key,
                first_line,
                kept_line,
            } => write!(
                f,
                "duplicate symbol {key}: definition at line {first_line} shadowed by line {kept_line}"
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
