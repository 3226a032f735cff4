//! Snapshot persistence between builds.
//!
//! Missing state is a normal first run and yields an empty snapshot.
//! Unreadable state is corruption: strict stores return
//! [`DocDeltaError::SnapshotCorruption`], lenient ones log and start over
//! from an empty baseline.

pub mod database;
pub mod json;
pub mod schema;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::errors::{DocDeltaError, DocDeltaResult};
use crate::models::BuildSnapshot;

pub use database::SqliteSnapshotStore;
pub use json::JsonSnapshotStore;

/// Durable storage of the last successful build per source root.
pub trait SnapshotStore: Send + Sync {
    /// The previous snapshot for `root` (a [`store_key`]), or an empty one.
    fn load_previous(&self, root: &str) -> DocDeltaResult<BuildSnapshot>;

    /// Replace the stored snapshot for `snapshot.root`.
    fn save(&self, snapshot: &BuildSnapshot) -> DocDeltaResult<()>;
}

/// Normalized identity of a source root: canonical when the path exists,
/// `/`-separated, without a trailing separator.
pub fn store_key(root: &Path) -> String {
    let resolved = std::fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
    let text = resolved.to_string_lossy().replace('\\', "/");
    let trimmed = text.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Shared corruption policy for store implementations.
pub(crate) fn recover_from_corruption(
    strict: bool,
    root: &str,
    reason: impl std::fmt::Display,
) -> DocDeltaResult<BuildSnapshot> {
    if strict {
        return Err(DocDeltaError::SnapshotCorruption(format!("{root}: {reason}")));
    }
    tracing::warn!(
        "snapshot for {} is unreadable ({}); falling back to an empty baseline",
        root,
        reason
    );
    Ok(BuildSnapshot::empty(root))
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    snapshots: Mutex<BTreeMap<String, BuildSnapshot>>,
    saves: AtomicUsize,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn load_previous(&self, root: &str) -> DocDeltaResult<BuildSnapshot> {
        Ok(self
            .snapshots
            .lock()
            .get(root)
            .cloned()
            .unwrap_or_else(|| BuildSnapshot::empty(root)))
    }

    fn save(&self, snapshot: &BuildSnapshot) -> DocDeltaResult<()> {
        self.snapshots
            .lock()
            .insert(snapshot.root.clone(), snapshot.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
