//! Build pipeline: discovery, hash gating, and parallel extraction.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::BuildConfig;
use crate::errors::{DocDeltaError, DocDeltaResult};
use crate::indexer::extractor::LanguageExtractor;
use crate::indexer::filesystem::iter_source_files;
use crate::indexer::fingerprint::content_hash;
use crate::indexer::languages::default_registry;
use crate::indexer::registry::ExtractorRegistry;
use crate::models::{BuildSnapshot, BuildWarning, FileSnapshot, Symbol};
use crate::store::store_key;

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation flag shared between a caller and a running build.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    /// Files handed to the pipeline, supported or not.
    pub files_scanned: usize,
    pub files_skipped_unsupported: usize,
    /// Files run through an extractor this build.
    pub files_extracted: usize,
    /// Files whose prior snapshot was reused because the hash matched.
    pub files_reused: usize,
    pub extraction_errors: usize,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub struct BuildOutput {
    pub snapshot: BuildSnapshot,
    pub warnings: Vec<BuildWarning>,
    pub stats: BuildStats,
}

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

enum Content {
    Disk(PathBuf),
    Memory(Vec<u8>),
}

struct Job {
    path: String,
    extractor: Arc<dyn LanguageExtractor>,
    content: Content,
}

enum Outcome {
    Reused(FileSnapshot),
    Extracted(FileSnapshot, Option<BuildWarning>),
    Cancelled,
}

fn failed(path: &str, hash: String, language: &str, message: String) -> Outcome {
    tracing::warn!("extraction failed for {}: {}", path, message);
    Outcome::Extracted(
        FileSnapshot::failed(path, hash, language),
        Some(BuildWarning::Extraction {
            path: path.to_string(),
            message,
        }),
    )
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Mark symbols whose docs or decorators carry a configured deprecation tag.
fn apply_deprecation_tags(symbols: &mut [Symbol], tags: &[String]) {
    if tags.is_empty() {
        return;
    }
    let tags: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    for symbol in symbols.iter_mut().filter(|s| !s.is_deprecated_marker) {
        let doc = symbol.docstring.as_deref().unwrap_or_default().to_lowercase();
        symbol.is_deprecated_marker = tags.iter().any(|tag| {
            doc.contains(tag.as_str())
                || symbol
                    .decorators
                    .iter()
                    .any(|d| d.to_lowercase().contains(tag.as_str()))
        });
    }
}

/// Hash, gate against `previous`, and extract one file.
fn process(
    job: &Job,
    previous: &BuildSnapshot,
    config: &BuildConfig,
    token: &CancellationToken,
) -> Outcome {
    if token.is_cancelled() {
        return Outcome::Cancelled;
    }
    let language = job.extractor.language_name();
    let bytes = match &job.content {
        Content::Memory(bytes) => std::borrow::Cow::Borrowed(bytes.as_slice()),
        Content::Disk(path) => match std::fs::read(path) {
            Ok(bytes) => std::borrow::Cow::Owned(bytes),
            Err(e) => return failed(&job.path, String::new(), language, e.to_string()),
        },
    };
    let hash = content_hash(&bytes);

    if let Some(prior) = previous.get(&job.path) {
        if prior.parse_ok && prior.content_hash == hash && prior.language == language {
            let mut file = prior.clone();
            // Tags added since the prior build still mark reused symbols.
            apply_deprecation_tags(&mut file.symbols, &config.deprecation_tags);
            return Outcome::Reused(file);
        }
    }

    let source = match std::str::from_utf8(&bytes) {
        Ok(s) => s,
        Err(e) => return failed(&job.path, hash, language, format!("invalid UTF-8: {e}")),
    };

    match catch_unwind(AssertUnwindSafe(|| job.extractor.extract(source))) {
        Ok(Ok(mut symbols)) => {
            apply_deprecation_tags(&mut symbols, &config.deprecation_tags);
            Outcome::Extracted(FileSnapshot::parsed(&job.path, hash, language, symbols), None)
        }
        Ok(Err(e)) => failed(&job.path, hash, language, e.to_string()),
        Err(payload) => failed(
            &job.path,
            hash,
            language,
            format!("extractor panicked: {}", panic_message(payload.as_ref())),
        ),
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Turns a source tree into a [`BuildSnapshot`].
///
/// Extraction runs on a rayon pool sized by [`BuildConfig::workers`]; results
/// are merged by a single writer so snapshot order never depends on
/// scheduling.
#[derive(Debug, Clone)]
pub struct BuildPipeline {
    registry: Arc<ExtractorRegistry>,
    config: BuildConfig,
}

impl BuildPipeline {
    pub fn new(registry: ExtractorRegistry, config: BuildConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            config,
        }
    }

    /// Pipeline over the built-in extractors.
    pub fn with_default_registry(config: BuildConfig) -> Self {
        let registry = default_registry(&config);
        Self::new(registry, config)
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Discover and process every file under `root`.
    pub fn run(
        &self,
        root: &Path,
        previous: &BuildSnapshot,
        token: &CancellationToken,
    ) -> DocDeltaResult<BuildOutput> {
        let files = iter_source_files(root, &self.config)?;
        let sources = files
            .into_iter()
            .map(|rel| {
                let absolute = root.join(&rel);
                (rel, Content::Disk(absolute))
            })
            .collect();
        self.execute(root, sources, previous, token)
    }

    /// Process an already-filtered set of `(relative path, bytes)` pairs.
    pub fn run_with_sources(
        &self,
        root: &Path,
        sources: Vec<(String, Vec<u8>)>,
        previous: &BuildSnapshot,
        token: &CancellationToken,
    ) -> DocDeltaResult<BuildOutput> {
        let sources = sources
            .into_iter()
            .map(|(path, bytes)| (path.replace('\\', "/"), Content::Memory(bytes)))
            .collect();
        self.execute(root, sources, previous, token)
    }

    fn execute(
        &self,
        root: &Path,
        sources: Vec<(String, Content)>,
        previous: &BuildSnapshot,
        token: &CancellationToken,
    ) -> DocDeltaResult<BuildOutput> {
        let started = Instant::now();
        let mut stats = BuildStats {
            files_scanned: sources.len(),
            ..BuildStats::default()
        };

        let mut jobs = Vec::with_capacity(sources.len());
        for (path, content) in sources {
            match self.registry.resolve(Path::new(&path)) {
                Some(extractor) => jobs.push(Job {
                    path,
                    extractor,
                    content,
                }),
                None => {
                    tracing::debug!("no extractor for {}", path);
                    stats.files_skipped_unsupported += 1;
                }
            }
        }
        tracing::info!(
            "building {}: {} files, {} supported",
            root.display(),
            stats.files_scanned,
            jobs.len()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.effective_workers())
            .build();
        let outcomes: Vec<Outcome> = match pool {
            Ok(pool) => pool.install(|| {
                jobs.par_iter()
                    .map(|job| process(job, previous, &self.config, token))
                    .collect()
            }),
            Err(e) => {
                tracing::warn!("thread pool unavailable ({}); extracting sequentially", e);
                jobs.iter()
                    .map(|job| process(job, previous, &self.config, token))
                    .collect()
            }
        };

        if token.is_cancelled() || outcomes.iter().any(|o| matches!(o, Outcome::Cancelled)) {
            tracing::info!("build of {} cancelled", root.display());
            return Err(DocDeltaError::Cancelled);
        }

        let mut snapshot = BuildSnapshot::empty(store_key(root));
        let mut warnings = Vec::new();
        for outcome in outcomes {
            match outcome {
                Outcome::Reused(file) => {
                    stats.files_reused += 1;
                    snapshot.insert(file);
                }
                Outcome::Extracted(file, warning) => {
                    stats.files_extracted += 1;
                    if !file.parse_ok {
                        stats.extraction_errors += 1;
                    }
                    warnings.extend(warning);
                    snapshot.insert(file);
                }
                Outcome::Cancelled => {}
            }
        }
        stats.elapsed_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            "built {}: {} extracted, {} reused, {} errors, {} symbols in {}ms",
            root.display(),
            stats.files_extracted,
            stats.files_reused,
            stats.extraction_errors,
            snapshot.symbol_count(),
            stats.elapsed_ms
        );
        Ok(BuildOutput {
            snapshot,
            warnings,
            stats,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExtractError;
    use crate::models::SymbolKind;

    struct Panicky;

    impl LanguageExtractor for Panicky {
        fn language_name(&self) -> &str {
            "panicky"
        }
        fn file_extensions(&self) -> &[&str] {
            &["boom"]
        }
        fn extract(&self, _source: &str) -> Result<Vec<Symbol>, ExtractError> {
            panic!("extractor bug")
        }
    }

    fn pipeline() -> BuildPipeline {
        let config = BuildConfig {
            workers: 2,
            ..BuildConfig::default()
        };
        let mut registry = default_registry(&config);
        registry.register_extractor(Arc::new(Panicky));
        BuildPipeline::new(registry, config)
    }

    fn sources(items: &[(&str, &str)]) -> Vec<(String, Vec<u8>)> {
        items
            .iter()
            .map(|(p, s)| (p.to_string(), s.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn test_unsupported_files_are_counted_not_recorded() {
        let out = pipeline()
            .run_with_sources(
                Path::new("/repo"),
                sources(&[("a.py", "def f():\n    pass\n"), ("README.md", "# hi")]),
                &BuildSnapshot::empty("/repo"),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(out.stats.files_scanned, 2);
        assert_eq!(out.stats.files_skipped_unsupported, 1);
        assert_eq!(out.snapshot.file_count(), 1);
        assert_eq!(out.snapshot.get("a.py").unwrap().symbols[0].kind, SymbolKind::Function);
    }

    #[test]
    fn test_panics_and_bad_utf8_become_failed_files() {
        let mut items = sources(&[("x.boom", "anything")]);
        items.push(("bad.py".to_string(), vec![0xff, 0xfe, 0x00]));
        let out = pipeline()
            .run_with_sources(
                Path::new("/repo"),
                items,
                &BuildSnapshot::empty("/repo"),
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(out.stats.extraction_errors, 2);
        assert!(!out.snapshot.get("x.boom").unwrap().parse_ok);
        assert!(!out.snapshot.get("bad.py").unwrap().parse_ok);
        assert_eq!(out.warnings.len(), 2);
    }

    #[test]
    fn test_hash_gate_reuses_prior_file() {
        let p = pipeline();
        let first = p
            .run_with_sources(
                Path::new("/repo"),
                sources(&[("a.py", "def f():\n    pass\n")]),
                &BuildSnapshot::empty("/repo"),
                &CancellationToken::new(),
            )
            .unwrap();
        let second = p
            .run_with_sources(
                Path::new("/repo"),
                sources(&[("a.py", "def f():\n    pass\n")]),
                &first.snapshot,
                &CancellationToken::new(),
            )
            .unwrap();
        assert_eq!(second.stats.files_reused, 1);
        assert_eq!(second.stats.files_extracted, 0);
        assert_eq!(second.snapshot.files, first.snapshot.files);
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let token = CancellationToken::new();
        token.cancel();
        let err = pipeline()
            .run_with_sources(
                Path::new("/repo"),
                sources(&[("a.py", "x = 1\n")]),
                &BuildSnapshot::empty("/repo"),
                &token,
            )
            .unwrap_err();
        assert!(matches!(err, DocDeltaError::Cancelled));
    }

    #[test]
    fn test_reused_file_picks_up_new_deprecation_tags() {
        let input = || sources(&[("a.py", "def f():\n    \"\"\"Legacy entry point.\"\"\"\n")]);
        let first = pipeline()
            .run_with_sources(
                Path::new("/repo"),
                input(),
                &BuildSnapshot::empty("/repo"),
                &CancellationToken::new(),
            )
            .unwrap();
        assert!(!first.snapshot.get("a.py").unwrap().symbols[0].is_deprecated_marker);

        let config = BuildConfig {
            workers: 2,
            deprecation_tags: vec!["legacy".to_string()],
            ..BuildConfig::default()
        };
        let second = BuildPipeline::with_default_registry(config)
            .run_with_sources(Path::new("/repo"), input(), &first.snapshot, &CancellationToken::new())
            .unwrap();
        assert_eq!(second.stats.files_reused, 1);
        assert!(second.snapshot.get("a.py").unwrap().symbols[0].is_deprecated_marker);
    }

    #[test]
    fn test_configured_deprecation_tags() {
        let mut symbols = vec![Symbol::new(SymbolKind::Function, "f", 1)];
        symbols[0].docstring = Some("LEGACY: kept for v1 clients".to_string());
        apply_deprecation_tags(&mut symbols, &["legacy".to_string()]);
        assert!(symbols[0].is_deprecated_marker);
    }
}
