//! docdelta core library: polyglot symbol extraction and incremental
//! documentation diffing.
//!
//! A build walks a source root, hash-gates every file against the previous
//! snapshot, extracts symbols from the files that changed, and classifies
//! each symbol as added, modified, deprecated, or unchanged. Snapshots are
//! persisted through a [`store::SnapshotStore`] between builds.

pub mod build;
pub mod config;
pub mod diff;
pub mod errors;
pub mod indexer;
pub mod models;
pub mod report;
pub mod store;

pub use build::{BuildOutcome, IncrementalBuilder};
pub use config::BuildConfig;
pub use diff::{diff_snapshots, ChangeAction, ChangeSet, SymbolChange, SymbolStatus};
pub use errors::{DocDeltaError, DocDeltaResult, ExtractError};
pub use indexer::extractor::LanguageExtractor;
pub use indexer::languages::default_registry;
pub use indexer::pipeline::{BuildPipeline, BuildStats, CancellationToken};
pub use indexer::registry::ExtractorRegistry;
pub use models::{
    BuildSnapshot, BuildWarning, FileSnapshot, Parameter, Signature, Symbol, SymbolKey, SymbolKind,
};
pub use report::{ai_fill_targets, BuildReport};
pub use store::{
    store_key, JsonSnapshotStore, MemorySnapshotStore, SnapshotStore, SqliteSnapshotStore,
};
