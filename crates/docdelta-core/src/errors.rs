//! Error types for the docdelta core library.
//!
//! Per-file problems (malformed source, duplicate symbol keys) are not errors:
//! they travel as [`crate::models::BuildWarning`] values so a single bad file
//! never aborts a build. Only the conditions below escape a build.

/// Top-level error enum for the docdelta core library.
#[derive(Debug, thiserror::Error)]
pub enum DocDeltaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Snapshot corruption: {0}")]
    SnapshotCorruption(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Build cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type DocDeltaResult<T> = Result<T, DocDeltaError>;

/// Failure raised by a language extractor on malformed input.
///
/// Never escapes a build: the pipeline records the file with
/// `parse_ok = false` and surfaces the message as a warning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}{}", line_suffix(.line))]
pub struct ExtractError {
    pub message: String,
    pub line: Option<usize>,
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" (line {l})")).unwrap_or_default()
}

impl ExtractError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
        }
    }

    pub fn at_line(message: impl Into<String>, line: usize) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
        }
    }
}
