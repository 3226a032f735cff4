//! SQLite snapshot store.
//!
//! One database can hold snapshots for many source roots. Every public
//! method opens its own connection so callers never manage connection
//! lifetime. Symbols are stored both as inspectable columns and as a JSON
//! payload, which is what `load_previous` reads back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::BuildConfig;
use crate::errors::{DocDeltaError, DocDeltaResult};
use crate::models::{BuildSnapshot, FileSnapshot, Symbol};
use crate::store::{recover_from_corruption, schema, SnapshotStore};

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    let text = path.to_string_lossy();
    if text == "~" || text.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            let mut expanded = PathBuf::from(home);
            if text.len() > 2 {
                expanded.push(&text[2..]);
            }
            return expanded;
        }
    }
    path.to_path_buf()
}

fn resolve(path: &Path) -> DocDeltaResult<PathBuf> {
    let expanded = expand_tilde(path);
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(std::env::current_dir()?.join(expanded))
    }
}

#[derive(Debug, Clone)]
pub struct SqliteSnapshotStore {
    db_path: PathBuf,
    strict: bool,
}

impl SqliteSnapshotStore {
    /// Store backed by the database at `db_path` (created on first use).
    /// Parent directories are created eagerly.
    pub fn new(db_path: impl AsRef<Path>, strict: bool) -> DocDeltaResult<Self> {
        let resolved = resolve(db_path.as_ref())?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            db_path: resolved,
            strict,
        })
    }

    /// Store whose corruption policy follows `config.strict_snapshots`.
    pub fn from_config(db_path: impl AsRef<Path>, config: &BuildConfig) -> DocDeltaResult<Self> {
        Self::new(db_path, config.strict_snapshots)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a connection with foreign keys enabled and the schema migrated.
    fn connect(&self) -> DocDeltaResult<Connection> {
        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        schema::initialize(&conn)?;
        Ok(conn)
    }

    fn read_snapshot(&self, root: &str) -> DocDeltaResult<Option<BuildSnapshot>> {
        let conn = self.connect()?;
        let built_at: Option<String> = conn
            .query_row(
                "SELECT built_at FROM builds WHERE root = ?1;",
                params![root],
                |row| row.get(0),
            )
            .optional()?;
        let Some(built_at) = built_at else {
            return Ok(None);
        };
        let built_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&built_at)
            .map_err(|e| DocDeltaError::SnapshotCorruption(format!("bad built_at: {e}")))?
            .with_timezone(&Utc);

        let mut files: BTreeMap<String, FileSnapshot> = BTreeMap::new();
        let mut stmt = conn.prepare(
            "SELECT path, content_hash, language, parse_ok FROM files WHERE root = ?1;",
        )?;
        let rows = stmt.query_map(params![root], |row| {
            Ok(FileSnapshot {
                path: row.get(0)?,
                content_hash: row.get(1)?,
                language: row.get(2)?,
                symbols: Vec::new(),
                parse_ok: row.get::<_, i64>(3)? != 0,
            })
        })?;
        for file in rows {
            let file = file?;
            files.insert(file.path.clone(), file);
        }

        let mut stmt = conn.prepare(
            "SELECT file_path, payload_json FROM symbols WHERE root = ?1 \
             ORDER BY file_path, position;",
        )?;
        let rows = stmt.query_map(params![root], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (file_path, payload) = row?;
            let symbol: Symbol = serde_json::from_str(&payload)?;
            let file = files.get_mut(&file_path).ok_or_else(|| {
                DocDeltaError::SnapshotCorruption(format!("symbol row for unknown file {file_path}"))
            })?;
            file.symbols.push(symbol);
        }

        Ok(Some(BuildSnapshot {
            root: root.to_string(),
            built_at,
            files,
        }))
    }

    fn write_snapshot(&self, snapshot: &BuildSnapshot) -> DocDeltaResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;
        let root = snapshot.root.as_str();
        tx.execute("DELETE FROM symbols WHERE root = ?1;", params![root])?;
        tx.execute("DELETE FROM files WHERE root = ?1;", params![root])?;
        tx.execute("DELETE FROM builds WHERE root = ?1;", params![root])?;
        tx.execute(
            "INSERT INTO builds(root, built_at, file_count, symbol_count) \
             VALUES (?1, ?2, ?3, ?4);",
            params![
                root,
                snapshot.built_at.to_rfc3339(),
                snapshot.file_count() as i64,
                snapshot.symbol_count() as i64,
            ],
        )?;
        {
            let mut insert_file = tx.prepare(
                "INSERT INTO files(root, path, content_hash, language, parse_ok) \
                 VALUES (?1, ?2, ?3, ?4, ?5);",
            )?;
            let mut insert_symbol = tx.prepare(
                "INSERT INTO symbols ( \
                     root, file_path, position, kind, name, parent, signature_shape, \
                     docstring, is_deprecated, start_line, end_line, payload_json \
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            )?;
            for file in snapshot.files.values() {
                insert_file.execute(params![
                    root,
                    file.path,
                    file.content_hash,
                    file.language,
                    file.parse_ok as i64,
                ])?;
                for (position, symbol) in file.symbols.iter().enumerate() {
                    insert_symbol.execute(params![
                        root,
                        file.path,
                        position as i64,
                        symbol.kind.as_str(),
                        symbol.name,
                        symbol.parent,
                        symbol.signature.shape(),
                        symbol.docstring,
                        symbol.is_deprecated_marker as i64,
                        symbol.line_span.0 as i64,
                        symbol.line_span.1 as i64,
                        serde_json::to_string(symbol)?,
                    ])?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Copy the database to `destination` with the SQLite backup API.
    pub fn backup_to(&self, destination: impl AsRef<Path>) -> DocDeltaResult<PathBuf> {
        let resolved = resolve(destination.as_ref())?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let src_conn = self.connect()?;
        let mut dst_conn = Connection::open(&resolved)?;
        let backup = rusqlite::backup::Backup::new(&src_conn, &mut dst_conn)?;
        backup.run_to_completion(100, std::time::Duration::from_millis(10), None)?;
        Ok(resolved)
    }

    /// Source roots with a stored snapshot.
    pub fn roots(&self) -> DocDeltaResult<Vec<String>> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT root FROM builds ORDER BY root;")?;
        let roots = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(roots)
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load_previous(&self, root: &str) -> DocDeltaResult<BuildSnapshot> {
        if !self.db_path.exists() {
            return Ok(BuildSnapshot::empty(root));
        }
        match self.read_snapshot(root) {
            Ok(Some(snapshot)) => Ok(snapshot),
            Ok(None) => Ok(BuildSnapshot::empty(root)),
            Err(DocDeltaError::Io(e)) => Err(DocDeltaError::Io(e)),
            Err(e) => recover_from_corruption(self.strict, root, e),
        }
    }

    fn save(&self, snapshot: &BuildSnapshot) -> DocDeltaResult<()> {
        match self.write_snapshot(snapshot) {
            Err(DocDeltaError::Sqlite(e)) if !self.strict && is_not_a_database(&e) => {
                tracing::warn!(
                    "replacing unreadable snapshot database {}",
                    self.db_path.display()
                );
                std::fs::remove_file(&self.db_path)?;
                self.write_snapshot(snapshot)
            }
            other => other,
        }
    }
}

fn is_not_a_database(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(rusqlite::ErrorCode::NotADatabase | rusqlite::ErrorCode::DatabaseCorrupt)
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Parameter, Signature, SymbolKind};

    fn snapshot(root: &str) -> BuildSnapshot {
        let mut snap = BuildSnapshot::empty(root);
        let mut method = Symbol::new(SymbolKind::Method, "add", 3);
        method.parent = Some("Calc".to_string());
        method.signature = Signature::new(vec![Parameter::typed("a", "int")], None);
        method.docstring = Some("Adds.".to_string());
        let class = Symbol::new(SymbolKind::Class, "Calc", 1);
        snap.insert(FileSnapshot::parsed("calc.py", "abc", "python", vec![class, method]));
        snap.insert(FileSnapshot::failed("broken.py", "def", "python"));
        snap
    }

    #[test]
    fn test_roundtrip_preserves_order_and_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSnapshotStore::new(dir.path().join("state/snapshots.db"), true).unwrap();
        assert!(store.load_previous("/repo").unwrap().is_empty());

        let snap = snapshot("/repo");
        store.save(&snap).unwrap();
        let loaded = store.load_previous("/repo").unwrap();
        assert_eq!(loaded.files, snap.files);
        assert_eq!(loaded.built_at, snap.built_at);
        assert_eq!(store.roots().unwrap(), vec!["/repo"]);
    }

    #[test]
    fn test_save_replaces_only_its_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSnapshotStore::new(dir.path().join("s.db"), true).unwrap();
        store.save(&snapshot("/a")).unwrap();
        store.save(&snapshot("/b")).unwrap();
        store.save(&BuildSnapshot::empty("/a")).unwrap();
        assert!(store.load_previous("/a").unwrap().is_empty());
        assert_eq!(store.load_previous("/b").unwrap().file_count(), 2);
    }

    #[test]
    fn test_corrupt_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.db");
        std::fs::write(&path, vec![b'x'; 4096]).unwrap();

        let strict = SqliteSnapshotStore::new(&path, true).unwrap();
        assert!(matches!(
            strict.load_previous("/repo"),
            Err(DocDeltaError::SnapshotCorruption(_))
        ));

        let lenient = SqliteSnapshotStore::new(&path, false).unwrap();
        assert!(lenient.load_previous("/repo").unwrap().is_empty());
        lenient.save(&snapshot("/repo")).unwrap();
        assert_eq!(lenient.load_previous("/repo").unwrap().file_count(), 2);
    }

    #[test]
    fn test_backup_to() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteSnapshotStore::new(dir.path().join("s.db"), true).unwrap();
        store.save(&snapshot("/repo")).unwrap();
        let copy = store.backup_to(dir.path().join("backup/s.db")).unwrap();
        let restored = SqliteSnapshotStore::new(copy, true).unwrap();
        assert_eq!(restored.load_previous("/repo").unwrap().file_count(), 2);
    }
}
