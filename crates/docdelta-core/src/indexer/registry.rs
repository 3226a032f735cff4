//! Extension → extractor dispatch table.
//!
//! Built once at process start (see [`crate::indexer::languages::default_registry`]);
//! new languages are added with [`ExtractorRegistry::register`] and the
//! dispatch code never changes.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::indexer::extractor::LanguageExtractor;

/// Maps lowercase file extensions to extractors.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    by_extension: BTreeMap<String, Arc<dyn LanguageExtractor>>,
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `extractor` for every extension in `extensions`.
    ///
    /// A later registration for the same extension replaces the earlier one.
    pub fn register(&mut self, extensions: &[&str], extractor: Arc<dyn LanguageExtractor>) {
        for ext in extensions {
            let key = normalize_extension(ext);
            if let Some(previous) = self.by_extension.insert(key.clone(), Arc::clone(&extractor)) {
                tracing::debug!(
                    "extension .{} moved from {} to {}",
                    key,
                    previous.language_name(),
                    extractor.language_name()
                );
            }
        }
    }

    /// Register an extractor under its own advertised extensions.
    pub fn register_extractor(&mut self, extractor: Arc<dyn LanguageExtractor>) {
        let extensions: Vec<String> = extractor
            .file_extensions()
            .iter()
            .map(|e| e.to_string())
            .collect();
        let refs: Vec<&str> = extensions.iter().map(String::as_str).collect();
        self.register(&refs, extractor);
    }

    /// Find the extractor for `path` by exact, case-insensitive extension.
    ///
    /// Returns `None` for unknown extensions; a source tree legitimately
    /// contains files no extractor handles.
    pub fn resolve(&self, path: &Path) -> Option<Arc<dyn LanguageExtractor>> {
        let ext = path.extension()?.to_str()?;
        let extractor = self.by_extension.get(&normalize_extension(ext))?;
        if extractor.matches(path) {
            Some(Arc::clone(extractor))
        } else {
            None
        }
    }

    pub fn supports_extension(&self, ext: &str) -> bool {
        self.by_extension.contains_key(&normalize_extension(ext))
    }

    pub fn supported_extensions(&self) -> Vec<&str> {
        self.by_extension.keys().map(String::as_str).collect()
    }

    /// Distinct language names, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .by_extension
            .values()
            .map(|e| e.language_name())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(
                self.by_extension
                    .iter()
                    .map(|(ext, e)| (ext.as_str(), e.language_name())),
            )
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExtractError;
    use crate::models::{Symbol, SymbolKind};

    struct Stub(&'static str, &'static [&'static str]);

    impl LanguageExtractor for Stub {
        fn language_name(&self) -> &str {
            self.0
        }
        fn file_extensions(&self) -> &[&str] {
            self.1
        }
        fn extract(&self, _source: &str) -> Result<Vec<Symbol>, ExtractError> {
            Ok(vec![Symbol::new(SymbolKind::Function, "stub", 1)])
        }
    }

    struct NoTests;

    impl LanguageExtractor for NoTests {
        fn language_name(&self) -> &str {
            "notests"
        }
        fn file_extensions(&self) -> &[&str] {
            &["nt"]
        }
        fn matches(&self, path: &Path) -> bool {
            !path.to_string_lossy().ends_with("_test.nt")
        }
        fn extract(&self, _source: &str) -> Result<Vec<Symbol>, ExtractError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_multiple_extensions_share_one_extractor() {
        let mut registry = ExtractorRegistry::new();
        registry.register_extractor(Arc::new(Stub("typescript", &["ts", "tsx"])));
        let ts = registry.resolve(Path::new("src/app.ts")).unwrap();
        let tsx = registry.resolve(Path::new("src/App.tsx")).unwrap();
        assert_eq!(ts.language_name(), "typescript");
        assert_eq!(tsx.language_name(), "typescript");
        assert_eq!(registry.languages(), vec!["typescript"]);
    }

    #[test]
    fn test_resolution_is_case_insensitive() {
        let mut registry = ExtractorRegistry::new();
        registry.register(&[".JAVA"], Arc::new(Stub("java", &["java"])));
        assert!(registry.resolve(Path::new("Main.Java")).is_some());
        assert!(registry.supports_extension("java"));
    }

    #[test]
    fn test_unknown_extension_is_none() {
        let mut registry = ExtractorRegistry::new();
        registry.register_extractor(Arc::new(Stub("java", &["java"])));
        assert!(registry.resolve(Path::new("README.md")).is_none());
        assert!(registry.resolve(Path::new("Makefile")).is_none());
    }

    #[test]
    fn test_later_registration_wins() {
        let mut registry = ExtractorRegistry::new();
        registry.register(&["x"], Arc::new(Stub("first", &["x"])));
        registry.register(&["x"], Arc::new(Stub("second", &["x"])));
        let resolved = registry.resolve(Path::new("a.x")).unwrap();
        assert_eq!(resolved.language_name(), "second");
    }

    #[test]
    fn test_extractor_can_decline_path() {
        let mut registry = ExtractorRegistry::new();
        registry.register_extractor(Arc::new(NoTests));
        assert!(registry.resolve(Path::new("pkg/a.nt")).is_some());
        assert!(registry.resolve(Path::new("pkg/a_test.nt")).is_none());
    }
}
