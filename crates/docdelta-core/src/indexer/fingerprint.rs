//! Content fingerprints used to skip re-extraction of unchanged files.

use std::path::Path;

use sha2::{Digest, Sha256};

use crate::errors::DocDeltaResult;

/// SHA-256 of `bytes` as lowercase hex.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Read `path` and hash its raw bytes.
pub fn hash_file(path: &Path) -> DocDeltaResult<String> {
    let data = std::fs::read(path)?;
    Ok(content_hash(&data))
}
