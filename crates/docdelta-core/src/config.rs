//! Build configuration.
//!
//! Loaded from TOML; every field has a default so partial files work.
//! A few knobs can be overridden from the environment.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{DocDeltaError, DocDeltaResult};

const DEFAULT_EXCLUDES: &[&str] = &[
    "__pycache__",
    ".venv",
    "venv",
    "node_modules",
    ".git",
    "target",
];

/// Knobs for one build of a source root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Worker threads for extraction.
    pub workers: usize,
    /// Directory / file-name glob patterns excluded from discovery.
    pub exclude: Vec<String>,
    pub respect_gitignore: bool,
    pub include_hidden: bool,
    /// Return `SnapshotCorruption` instead of falling back to an empty snapshot.
    pub strict_snapshots: bool,
    /// Skip Go `_test.go` files.
    pub skip_go_tests: bool,
    /// Extra words recognised as deprecation markers in doc comments.
    pub deprecation_tags: Vec<String>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            respect_gitignore: true,
            include_hidden: false,
            strict_snapshots: false,
            skip_go_tests: true,
            deprecation_tags: Vec::new(),
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn env_flag(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    !matches!(v.as_str(), "0" | "false" | "no" | "off")
}

impl BuildConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> DocDeltaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> DocDeltaResult<Self> {
        toml::from_str(content).map_err(|e| DocDeltaError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> DocDeltaResult<String> {
        toml::to_string_pretty(self).map_err(|e| DocDeltaError::Config(e.to_string()))
    }

    /// Apply `DOCDELTA_WORKERS` and `DOCDELTA_STRICT_SNAPSHOTS` overrides.
    pub fn apply_env_overrides(mut self) -> DocDeltaResult<Self> {
        if let Ok(raw) = std::env::var("DOCDELTA_WORKERS") {
            self.workers = raw.trim().parse().map_err(|_| {
                DocDeltaError::Config(format!("DOCDELTA_WORKERS is not a number: {raw:?}"))
            })?;
        }
        if let Ok(raw) = std::env::var("DOCDELTA_STRICT_SNAPSHOTS") {
            self.strict_snapshots = env_flag(&raw);
        }
        Ok(self)
    }

    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = BuildConfig::from_toml_str("strict_snapshots = true\n").unwrap();
        assert!(config.strict_snapshots);
        assert!(config.respect_gitignore);
        assert!(config.exclude.contains(&"node_modules".to_string()));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = BuildConfig::default();
        config.workers = 3;
        config.deprecation_tags = vec!["legacy".to_string()];
        let text = config.to_toml_string().unwrap();
        assert_eq!(BuildConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = BuildConfig::from_toml_str("workers = \"many\"").unwrap_err();
        assert!(matches!(err, DocDeltaError::Config(_)));
    }

    #[test]
    fn test_env_flag_values() {
        assert!(env_flag("1"));
        assert!(env_flag("yes"));
        assert!(!env_flag(" Off "));
        assert!(!env_flag("false"));
    }

    #[test]
    fn test_effective_workers_never_zero() {
        let config = BuildConfig {
            workers: 0,
            ..BuildConfig::default()
        };
        assert_eq!(config.effective_workers(), 1);
    }
}
