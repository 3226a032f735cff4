//! Incremental build orchestration.
//!
//! One build loads the previous snapshot, runs the pipeline against it,
//! diffs the two, and persists the new snapshot exactly once. Errors and
//! cancellation leave the stored snapshot untouched.

use std::path::Path;

use crate::config::BuildConfig;
use crate::diff::{diff_snapshots, ChangeSet};
use crate::errors::DocDeltaResult;
use crate::indexer::pipeline::{BuildPipeline, BuildStats, CancellationToken};
use crate::models::{BuildSnapshot, BuildWarning};
use crate::store::{store_key, SnapshotStore};

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub snapshot: BuildSnapshot,
    pub change_set: ChangeSet,
    /// Extraction warnings followed by duplicate-key warnings.
    pub warnings: Vec<BuildWarning>,
    pub stats: BuildStats,
}

/// Drives builds of source roots against a [`SnapshotStore`].
///
/// Callers serialize builds per root; the builder itself holds no
/// per-build state.
pub struct IncrementalBuilder<S: SnapshotStore> {
    pipeline: BuildPipeline,
    store: S,
}

impl<S: SnapshotStore> IncrementalBuilder<S> {
    pub fn new(pipeline: BuildPipeline, store: S) -> Self {
        Self { pipeline, store }
    }

    /// Builder over the built-in extractors.
    pub fn with_config(config: BuildConfig, store: S) -> Self {
        Self::new(BuildPipeline::with_default_registry(config), store)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn pipeline(&self) -> &BuildPipeline {
        &self.pipeline
    }

    /// Build the tree under `root`.
    pub fn build(&self, root: &Path, token: &CancellationToken) -> DocDeltaResult<BuildOutcome> {
        let previous = self.store.load_previous(&store_key(root))?;
        let output = self.pipeline.run(root, &previous, token)?;
        self.finish(previous, output.snapshot, output.warnings, output.stats)
    }

    /// Build from an already-filtered list of `(relative path, bytes)`.
    pub fn build_sources(
        &self,
        root: &Path,
        sources: Vec<(String, Vec<u8>)>,
        token: &CancellationToken,
    ) -> DocDeltaResult<BuildOutcome> {
        let previous = self.store.load_previous(&store_key(root))?;
        let output = self
            .pipeline
            .run_with_sources(root, sources, &previous, token)?;
        self.finish(previous, output.snapshot, output.warnings, output.stats)
    }

    fn finish(
        &self,
        previous: BuildSnapshot,
        snapshot: BuildSnapshot,
        mut warnings: Vec<BuildWarning>,
        stats: BuildStats,
    ) -> DocDeltaResult<BuildOutcome> {
        let change_set = diff_snapshots(&previous, &snapshot);
        warnings.extend(change_set.warnings.iter().cloned());
        self.store.save(&snapshot)?;
        tracing::info!(
            "saved snapshot for {}: {} added, {} modified, {} deprecated",
            snapshot.root,
            change_set.added.len(),
            change_set.modified.len(),
            change_set.deprecated.len()
        );
        Ok(BuildOutcome {
            snapshot,
            change_set,
            warnings,
            stats,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
