//! Build summaries for downstream reporting and AI-fill targeting.

use serde::{Deserialize, Serialize};

use crate::build::BuildOutcome;
use crate::diff::SymbolChange;
use crate::errors::DocDeltaResult;
use crate::models::{Symbol, SymbolKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub files_deleted: usize,
    pub files_unchanged: usize,
    /// Files whose documentation must be regenerated.
    pub files_generated: usize,
    pub modules: usize,
    pub functions: usize,
    pub classes: usize,
    pub deprecated: usize,
    pub ai_fill_candidates: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub root: String,
    pub incremental: bool,
    pub summary: ReportSummary,
    pub changes: Vec<SymbolChange>,
    pub errors: Vec<String>,
}

/// A symbol lacking a docstring that generation should fill in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiFillTarget {
    pub file: String,
    pub symbol: Symbol,
}

impl BuildReport {
    /// Summarize `outcome`. A full (non-incremental) build regenerates every
    /// supported file.
    pub fn from_outcome(outcome: &BuildOutcome, incremental: bool) -> Self {
        let snapshot = &outcome.snapshot;
        let change_set = &outcome.change_set;
        let symbols = || snapshot.files.values().flat_map(|f| f.symbols.iter());
        let count = |kinds: &[SymbolKind]| symbols().filter(|s| kinds.contains(&s.kind)).count();

        let files_generated = if incremental {
            change_set.changed_files.len()
        } else {
            snapshot.file_count()
        };
        let summary = ReportSummary {
            files_scanned: outcome.stats.files_scanned,
            files_changed: change_set.changed_files.len(),
            files_deleted: change_set.removed_files.len(),
            files_unchanged: change_set.unchanged_files.len(),
            files_generated,
            modules: snapshot.file_count(),
            functions: count(&[SymbolKind::Function, SymbolKind::Method]),
            classes: count(&[
                SymbolKind::Class,
                SymbolKind::Interface,
                SymbolKind::Enum,
                SymbolKind::Struct,
                SymbolKind::Trait,
            ]),
            deprecated: change_set.deprecated.len(),
            ai_fill_candidates: ai_fill_targets(outcome, incremental).len(),
        };

        Self {
            root: snapshot.root.clone(),
            incremental,
            summary,
            changes: change_set.symbol_changes(),
            errors: outcome.warnings.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn to_json(&self) -> DocDeltaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Undocumented symbols to hand to docstring generation.
///
/// Incremental builds only target added and modified symbols; full builds
/// target every undocumented symbol in the snapshot.
pub fn ai_fill_targets(outcome: &BuildOutcome, incremental: bool) -> Vec<AiFillTarget> {
    if !incremental {
        return outcome
            .snapshot
            .ai_fill_candidates()
            .into_iter()
            .map(|(file, symbol)| AiFillTarget {
                file: file.to_string(),
                symbol: symbol.clone(),
            })
            .collect();
    }
    let change_set = &outcome.change_set;
    let mut targets: Vec<AiFillTarget> = change_set
        .added
        .iter()
        .chain(change_set.modified.iter())
        .filter(|(_, symbol)| symbol.docstring.is_none())
        .map(|(key, symbol)| AiFillTarget {
            file: key.file_path.clone(),
            symbol: symbol.clone(),
        })
        .collect();
    targets.sort_by(|a, b| {
        (a.file.as_str(), a.symbol.start_line()).cmp(&(b.file.as_str(), b.symbol.start_line()))
    });
    targets
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
