//! Built-in language extractors.
//!
//! Python is parsed with tree-sitter; every other language goes through the
//! line scanner in [`crate::indexer::scanner`] (Ruby has its own `end`-depth
//! variant).

pub mod cpp;
pub mod csharp;
pub mod go;
pub mod java;
pub mod kotlin;
pub mod python;
pub mod ruby;
pub mod rust;
pub mod typescript;

use std::sync::Arc;

use crate::config::BuildConfig;
use crate::indexer::registry::ExtractorRegistry;

pub use cpp::CppExtractor;
pub use csharp::CSharpExtractor;
pub use go::GoExtractor;
pub use java::JavaExtractor;
pub use kotlin::KotlinExtractor;
pub use python::PythonExtractor;
pub use ruby::RubyExtractor;
pub use rust::RustExtractor;
pub use typescript::TypeScriptExtractor;

/// Registry with every built-in extractor under its own extensions.
pub fn default_registry(config: &BuildConfig) -> ExtractorRegistry {
    let mut registry = ExtractorRegistry::new();
    registry.register_extractor(Arc::new(PythonExtractor));
    registry.register_extractor(Arc::new(JavaExtractor));
    registry.register_extractor(Arc::new(KotlinExtractor));
    registry.register_extractor(Arc::new(CSharpExtractor));
    registry.register_extractor(Arc::new(TypeScriptExtractor));
    registry.register_extractor(Arc::new(GoExtractor::new(config.skip_go_tests)));
    registry.register_extractor(Arc::new(RustExtractor));
    registry.register_extractor(Arc::new(CppExtractor));
    registry.register_extractor(Arc::new(RubyExtractor));
    registry
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_default_registry_covers_languages() {
        let registry = default_registry(&BuildConfig::default());
        for (path, language) in [
            ("a.py", "python"),
            ("A.java", "java"),
            ("b.kts", "kotlin"),
            ("C.cs", "csharp"),
            ("d.tsx", "typescript"),
            ("e.mjs", "typescript"),
            ("f.go", "go"),
            ("g.rs", "rust"),
            ("h.hpp", "cpp"),
            ("i.c", "cpp"),
            ("j.rb", "ruby"),
        ] {
            let extractor = registry.resolve(Path::new(path));
            assert_eq!(
                extractor.map(|e| e.language_name().to_string()).as_deref(),
                Some(language),
                "{path}"
            );
        }
        assert!(registry.resolve(Path::new("README.md")).is_none());
    }
}
