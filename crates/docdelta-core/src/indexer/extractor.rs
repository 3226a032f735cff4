//! The per-language extraction contract.

use std::path::Path;

use crate::errors::ExtractError;
use crate::models::Symbol;

/// One supported language.
///
/// Implementations must be pure over their input: the same source text yields
/// the same symbols. Malformed input is reported with `Err`, never a panic.
pub trait LanguageExtractor: Send + Sync {
    /// Human-readable language name (e.g. "python", "java").
    fn language_name(&self) -> &str;

    /// Lowercase file extensions without the dot (e.g. `&["ts", "tsx"]`).
    fn file_extensions(&self) -> &[&str];

    /// Whether this extractor wants the given path. Defaults to `true`; the
    /// registry has already matched the extension.
    fn matches(&self, _path: &Path) -> bool {
        true
    }

    /// Extract documentable symbols in source order.
    fn extract(&self, source: &str) -> Result<Vec<Symbol>, ExtractError>;
}
