//! Source discovery for a build.

use std::path::Path;

use ignore::overrides::OverrideBuilder;
use ignore::WalkBuilder;

use crate::config::BuildConfig;
use crate::errors::{DocDeltaError, DocDeltaResult};

/// Per-project ignore file, read in addition to `.gitignore`.
pub const IGNORE_FILE_NAME: &str = ".docdeltaignore";

/// Never descended into regardless of configuration.
const IMPLICIT_IGNORED_DIRS: &[&str] = &[".git", ".docdelta"];

/// Turn a configured exclude entry into an override glob (`!` = ignore).
fn exclude_glob(pattern: &str) -> Option<String> {
    let stripped = pattern.trim();
    let stripped = stripped.strip_prefix("./").unwrap_or(stripped);
    let stripped = stripped.trim_end_matches('/');
    if stripped.is_empty() {
        return None;
    }
    Some(format!("!{stripped}"))
}

/// Relative `/`-separated form of `path` under `root`.
pub fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// All regular files under `root` that survive the exclude globs and
/// ignore files, as sorted relative paths.
///
/// A missing or non-directory root is a configuration error; unreadable
/// entries below it are logged and skipped.
pub fn iter_source_files(root: &Path, config: &BuildConfig) -> DocDeltaResult<Vec<String>> {
    if !root.is_dir() {
        return Err(DocDeltaError::Config(format!(
            "source root {} does not exist or is not a directory",
            root.display()
        )));
    }

    let mut overrides = OverrideBuilder::new(root);
    for pattern in IMPLICIT_IGNORED_DIRS
        .iter()
        .map(|p| p.to_string())
        .chain(config.exclude.iter().cloned())
    {
        if let Some(glob) = exclude_glob(&pattern) {
            overrides
                .add(&glob)
                .map_err(|e| DocDeltaError::Config(format!("invalid exclude {pattern:?}: {e}")))?;
        }
    }
    let overrides = overrides
        .build()
        .map_err(|e| DocDeltaError::Config(e.to_string()))?;

    let walker = WalkBuilder::new(root)
        .hidden(!config.include_hidden)
        .git_ignore(config.respect_gitignore)
        .git_global(config.respect_gitignore)
        .git_exclude(config.respect_gitignore)
        .require_git(false)
        .add_custom_ignore_filename(IGNORE_FILE_NAME)
        .overrides(overrides)
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!("walk error under {}: {}", root.display(), err);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        files.push(relative_path(root, entry.path()));
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
