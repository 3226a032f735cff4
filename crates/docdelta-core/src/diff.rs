//! Snapshot diffing.
//!
//! Files are compared by content hash first. Symbols of equal-hash files are
//! carried over wholesale; only changed, new and removed files are joined
//! symbol by symbol on [`SymbolKey`]. Leftovers that agree on kind, parent
//! and name but not arity are paired as modifications. An explicit
//! deprecation marker on the current symbol overrides every other outcome.

use std::collections::{BTreeMap, BTreeSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::models::{BuildSnapshot, BuildWarning, FileSnapshot, Symbol, SymbolKey, SymbolKind};

/// Classification of one symbol key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolStatus {
    Added,
    Modified,
    Deprecated,
    Unchanged,
}

/// Action reported downstream for a changed symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Added,
    Modified,
    Deprecated,
}

impl ChangeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deprecated => "deprecated",
        }
    }
}

/// One per-symbol entry for the build report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolChange {
    pub name: String,
    pub parent: Option<String>,
    pub kind: SymbolKind,
    pub file: String,
    pub line: usize,
    pub action: ChangeAction,
}

/// Classified differences between two snapshots.
///
/// Every key present in either snapshot lands in exactly one of the four
/// symbol partitions, except the old key of an arity change, which is
/// recorded in `reshaped` and classifies as modified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// New files and files whose hash differs.
    pub changed_files: BTreeSet<String>,
    pub unchanged_files: BTreeSet<String>,
    /// Files recorded previously but absent from the current build.
    pub removed_files: BTreeSet<String>,
    pub added: BTreeMap<SymbolKey, Symbol>,
    pub modified: BTreeMap<SymbolKey, Symbol>,
    /// Removed symbols carry their last recorded version; marked ones the current.
    pub deprecated: BTreeMap<SymbolKey, Symbol>,
    pub unchanged: BTreeMap<SymbolKey, Symbol>,
    /// Old key -> new key for modifications that changed arity.
    pub reshaped: BTreeMap<SymbolKey, SymbolKey>,
    /// Current files with `parse_ok == false`.
    pub extraction_errors: BTreeSet<String>,
    pub warnings: Vec<BuildWarning>,
}

impl ChangeSet {
    pub fn status_of(&self, key: &SymbolKey) -> Option<SymbolStatus> {
        if self.added.contains_key(key) {
            Some(SymbolStatus::Added)
        } else if self.modified.contains_key(key) || self.reshaped.contains_key(key) {
            Some(SymbolStatus::Modified)
        } else if self.deprecated.contains_key(key) {
            Some(SymbolStatus::Deprecated)
        } else if self.unchanged.contains_key(key) {
            Some(SymbolStatus::Unchanged)
        } else {
            None
        }
    }

    /// Nothing added, modified, deprecated, or removed.
    pub fn is_noop(&self) -> bool {
        self.changed_files.is_empty()
            && self.removed_files.is_empty()
            && self.added.is_empty()
            && self.modified.is_empty()
            && self.deprecated.is_empty()
    }

    /// Report entries for every non-unchanged symbol, ordered by file and line.
    pub fn symbol_changes(&self) -> Vec<SymbolChange> {
        let mut changes: Vec<SymbolChange> = [
            (ChangeAction::Added, &self.added),
            (ChangeAction::Modified, &self.modified),
            (ChangeAction::Deprecated, &self.deprecated),
        ]
        .into_iter()
        .flat_map(|(action, partition)| {
            partition.iter().map(move |(key, symbol)| SymbolChange {
                name: symbol.name.clone(),
                parent: symbol.parent.clone(),
                kind: symbol.kind,
                file: key.file_path.clone(),
                line: symbol.start_line(),
                action,
            })
        })
        .collect();
        changes.sort_by(|a, b| {
            (a.file.as_str(), a.line, a.action, a.name.as_str())
                .cmp(&(b.file.as_str(), b.line, b.action, b.name.as_str()))
        });
        changes
    }

    fn place(&mut self, status: SymbolStatus, key: SymbolKey, symbol: Symbol) {
        let partition = match status {
            SymbolStatus::Added => &mut self.added,
            SymbolStatus::Modified => &mut self.modified,
            SymbolStatus::Deprecated => &mut self.deprecated,
            SymbolStatus::Unchanged => &mut self.unchanged,
        };
        partition.insert(key, symbol);
    }

    /// Place a current-build symbol, honouring its deprecation marker.
    fn place_current(&mut self, status: SymbolStatus, key: SymbolKey, symbol: Symbol) {
        let status = if symbol.is_deprecated_marker {
            SymbolStatus::Deprecated
        } else {
            status
        };
        self.place(status, key, symbol);
    }
}

/// Key a file's symbols; a repeated key keeps the later definition.
fn keyed<'a>(
    file: &'a FileSnapshot,
    warnings: Option<&mut Vec<BuildWarning>>,
) -> IndexMap<SymbolKey, &'a Symbol> {
    let mut out: IndexMap<SymbolKey, &Symbol> = IndexMap::with_capacity(file.symbols.len());
    let mut duplicates = Vec::new();
    for symbol in &file.symbols {
        let key = symbol.key(&file.path);
        if let Some(first) = out.insert(key.clone(), symbol) {
            duplicates.push(BuildWarning::DuplicateSymbol {
                key: key.to_string(),
                first_line: first.start_line(),
                kept_line: symbol.start_line(),
            });
        }
    }
    if let Some(warnings) = warnings {
        for warning in duplicates {
            tracing::warn!("{}", warning);
            warnings.push(warning);
        }
    }
    out
}

fn same_content(old: &Symbol, new: &Symbol) -> bool {
    old.signature == new.signature && old.docstring == new.docstring
}

/// Join the symbols of one changed, new, or removed file.
fn join_file(change_set: &mut ChangeSet, old: Option<&FileSnapshot>, new: Option<&FileSnapshot>) {
    let old_keyed = old.map(|f| keyed(f, None)).unwrap_or_default();
    let new_keyed = match new {
        Some(f) => keyed(f, Some(&mut change_set.warnings)),
        None => IndexMap::new(),
    };

    let mut old_leftover: Vec<(SymbolKey, &Symbol)> = Vec::new();
    for (key, old_symbol) in &old_keyed {
        match new_keyed.get(key) {
            Some(new_symbol) => {
                let status = if same_content(old_symbol, new_symbol) {
                    SymbolStatus::Unchanged
                } else {
                    SymbolStatus::Modified
                };
                change_set.place_current(status, key.clone(), (*new_symbol).clone());
            }
            None => old_leftover.push((key.clone(), *old_symbol)),
        }
    }

    for (key, new_symbol) in &new_keyed {
        if old_keyed.contains_key(key) {
            continue;
        }
        let paired = if new_symbol.is_deprecated_marker {
            None
        } else {
            old_leftover
                .iter()
                .position(|(_, old)| old.loose_identity() == new_symbol.loose_identity())
        };
        match paired {
            Some(idx) => {
                let (old_key, _) = old_leftover.remove(idx);
                change_set.reshaped.insert(old_key, key.clone());
                change_set.place(SymbolStatus::Modified, key.clone(), (*new_symbol).clone());
            }
            None => {
                change_set.place_current(SymbolStatus::Added, key.clone(), (*new_symbol).clone())
            }
        }
    }

    for (key, old_symbol) in old_leftover {
        change_set.place(SymbolStatus::Deprecated, key, old_symbol.clone());
    }
}

/// Classify every file and symbol of `current` against `previous`.
///
/// Neither snapshot is modified. An empty `previous` yields a first-run
/// change set where everything is added.
pub fn diff_snapshots(previous: &BuildSnapshot, current: &BuildSnapshot) -> ChangeSet {
    let mut change_set = ChangeSet::default();

    for (path, file) in &current.files {
        if !file.parse_ok {
            change_set.extraction_errors.insert(path.clone());
        }
        match previous.get(path) {
            Some(prior)
                if prior.content_hash == file.content_hash
                    && prior.parse_ok == file.parse_ok
                    && prior.language == file.language =>
            {
                change_set.unchanged_files.insert(path.clone());
                for (key, symbol) in keyed(file, Some(&mut change_set.warnings)) {
                    change_set.place_current(SymbolStatus::Unchanged, key, symbol.clone());
                }
            }
            Some(prior) => {
                if prior.content_hash == file.content_hash {
                    change_set.unchanged_files.insert(path.clone());
                } else {
                    change_set.changed_files.insert(path.clone());
                }
                join_file(&mut change_set, Some(prior), Some(file));
            }
            None => {
                change_set.changed_files.insert(path.clone());
                join_file(&mut change_set, None, Some(file));
            }
        }
    }

    for (path, prior) in &previous.files {
        if current.files.contains_key(path) {
            continue;
        }
        change_set.removed_files.insert(path.clone());
        join_file(&mut change_set, Some(prior), None);
    }

    tracing::debug!(
        "diff: {} changed, {} unchanged, {} removed files; {} added, {} modified, {} deprecated, {} unchanged symbols",
        change_set.changed_files.len(),
        change_set.unchanged_files.len(),
        change_set.removed_files.len(),
        change_set.added.len(),
        change_set.modified.len(),
        change_set.deprecated.len(),
        change_set.unchanged.len()
    );
    change_set
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
