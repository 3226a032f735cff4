//! File-per-root JSON snapshot store.

use std::path::{Path, PathBuf};

use crate::config::BuildConfig;
use crate::errors::DocDeltaResult;
use crate::indexer::fingerprint::content_hash;
use crate::models::BuildSnapshot;
use crate::store::{recover_from_corruption, SnapshotStore};

#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    dir: PathBuf,
    strict: bool,
}

impl JsonSnapshotStore {
    /// Store writing one `<hash>.json` document per root under `dir`.
    pub fn new(dir: impl Into<PathBuf>, strict: bool) -> Self {
        Self {
            dir: dir.into(),
            strict,
        }
    }

    pub fn from_config(dir: impl Into<PathBuf>, config: &BuildConfig) -> Self {
        Self::new(dir, config.strict_snapshots)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// State file for `root`: first 16 hex chars of its SHA-256.
    pub fn path_for(&self, root: &str) -> PathBuf {
        let digest = content_hash(root.as_bytes());
        self.dir.join(format!("{}.json", &digest[..16]))
    }
}

impl SnapshotStore for JsonSnapshotStore {
    fn load_previous(&self, root: &str) -> DocDeltaResult<BuildSnapshot> {
        let path = self.path_for(root);
        if !path.exists() {
            return Ok(BuildSnapshot::empty(root));
        }
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => return recover_from_corruption(self.strict, root, e),
        };
        match serde_json::from_str::<BuildSnapshot>(&text) {
            Ok(snapshot) if snapshot.root == root => Ok(snapshot),
            Ok(snapshot) => recover_from_corruption(
                self.strict,
                root,
                format!("state file belongs to {}", snapshot.root),
            ),
            Err(e) => recover_from_corruption(self.strict, root, e),
        }
    }

    fn save(&self, snapshot: &BuildSnapshot) -> DocDeltaResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&snapshot.root);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!("wrote snapshot for {} to {}", snapshot.root, path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
