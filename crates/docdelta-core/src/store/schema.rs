//! SQLite schema for the snapshot store and its versioned upgrades.
//!
//! A database is stamped with the highest version in [`MIGRATIONS`] that has
//! been applied to it. Opening an older database applies the missing steps in
//! order, each inside its own SAVEPOINT, and logs them to `migration_history`.

use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::DocDeltaResult;

/// Bookkeeping tables that exist before any versioned step runs.
pub const BOOKKEEPING_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS store_meta (
        key TEXT PRIMARY KEY,
        value TEXT
    );",
    "CREATE TABLE IF NOT EXISTS migration_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        from_version INTEGER NOT NULL,
        to_version INTEGER NOT NULL,
        status TEXT NOT NULL,
        error_message TEXT,
        created_at TEXT DEFAULT CURRENT_TIMESTAMP
    );",
];

/// v1: snapshot tables and lookup indexes.
const SNAPSHOT_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS builds (
        root TEXT PRIMARY KEY,
        built_at TEXT NOT NULL,
        file_count INTEGER NOT NULL,
        symbol_count INTEGER NOT NULL
    );",
    "CREATE TABLE IF NOT EXISTS files (
        root TEXT NOT NULL REFERENCES builds(root) ON DELETE CASCADE,
        path TEXT NOT NULL,
        content_hash TEXT NOT NULL,
        language TEXT NOT NULL,
        parse_ok INTEGER NOT NULL,
        PRIMARY KEY(root, path)
    );",
    "CREATE TABLE IF NOT EXISTS symbols (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        root TEXT NOT NULL,
        file_path TEXT NOT NULL,
        position INTEGER NOT NULL,
        kind TEXT NOT NULL,
        name TEXT NOT NULL,
        parent TEXT,
        signature_shape TEXT NOT NULL,
        docstring TEXT,
        is_deprecated INTEGER NOT NULL DEFAULT 0,
        start_line INTEGER NOT NULL,
        end_line INTEGER NOT NULL,
        payload_json TEXT NOT NULL,
        UNIQUE(root, file_path, position),
        FOREIGN KEY(root, file_path) REFERENCES files(root, path) ON DELETE CASCADE
    );",
    "CREATE INDEX IF NOT EXISTS idx_symbols_name ON symbols(root, name);",
    "CREATE INDEX IF NOT EXISTS idx_files_hash ON files(content_hash);",
];

/// v2: partial index for listing undocumented symbols (AI-fill candidates).
const UNDOCUMENTED_INDEX: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_symbols_undocumented \
     ON symbols(root, file_path) WHERE docstring IS NULL;",
];

/// One versioned schema step.
pub struct Migration {
    pub version: i32,
    pub description: &'static str,
    pub statements: &'static [&'static str],
}

/// Ordered schema history. Append new steps; never edit applied ones.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "snapshot tables",
        statements: SNAPSHOT_TABLES,
    },
    Migration {
        version: 2,
        description: "undocumented symbol index",
        statements: UNDOCUMENTED_INDEX,
    },
];

/// Version a freshly opened database ends up at.
pub const SCHEMA_VERSION: i32 = 2;

/// Create bookkeeping tables and bring the schema up to [`SCHEMA_VERSION`].
pub fn initialize(conn: &Connection) -> DocDeltaResult<()> {
    for stmt in BOOKKEEPING_STATEMENTS {
        conn.execute_batch(stmt)?;
    }
    migrate_schema(conn)
}

/// Apply every step in [`MIGRATIONS`] newer than the stored version.
pub fn migrate_schema(conn: &Connection) -> DocDeltaResult<()> {
    let mut current = schema_version(conn)?;
    let start = current;
    for step in MIGRATIONS.iter().filter(|m| m.version > start) {
        conn.execute_batch("SAVEPOINT docdelta_migrate;")?;
        match apply(conn, step) {
            Ok(()) => {
                record(conn, current, step.version, "success", None)?;
                conn.execute_batch("RELEASE SAVEPOINT docdelta_migrate;")?;
                tracing::debug!("snapshot schema v{}: {}", step.version, step.description);
                current = step.version;
            }
            Err(e) => {
                conn.execute_batch(
                    "ROLLBACK TO SAVEPOINT docdelta_migrate; RELEASE SAVEPOINT docdelta_migrate;",
                )?;
                record(conn, current, step.version, "failed", Some(&e.to_string()))?;
                return Err(e);
            }
        }
    }
    Ok(())
}

fn apply(conn: &Connection, step: &Migration) -> DocDeltaResult<()> {
    for stmt in step.statements {
        conn.execute_batch(stmt)?;
    }
    conn.execute(
        "INSERT INTO store_meta(key, value) VALUES('schema_version', ?1) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
        params![step.version.to_string()],
    )?;
    Ok(())
}

/// Stored schema version; 0 for a database that was never stamped.
pub fn schema_version(conn: &Connection) -> DocDeltaResult<i32> {
    let value: Option<String> = conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = 'schema_version';",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.and_then(|v| v.parse().ok()).unwrap_or(0))
}

fn record(
    conn: &Connection,
    from: i32,
    to: i32,
    status: &str,
    error: Option<&str>,
) -> DocDeltaResult<()> {
    conn.execute(
        "INSERT INTO migration_history(from_version, to_version, status, error_message) \
         VALUES (?1, ?2, ?3, ?4);",
        params![from, to, status, error],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_index(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1;",
            params![name],
            |r| r.get::<_, i64>(0),
        )
        .unwrap()
            == 1
    }

    fn history(conn: &Connection) -> Vec<(i32, i32, String)> {
        let mut stmt = conn
            .prepare("SELECT from_version, to_version, status FROM migration_history ORDER BY id;")
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)))
            .unwrap()
            .map(Result::unwrap)
            .collect()
    }

    #[test]
    fn test_versions_are_ordered_and_end_at_current() {
        let versions: Vec<i32> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert_eq!(versions, (1..=SCHEMA_VERSION).collect::<Vec<_>>());
    }

    #[test]
    fn test_fresh_database_runs_every_step() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(has_index(&conn, "idx_symbols_undocumented"));
        assert_eq!(
            history(&conn),
            vec![(0, 1, "success".to_string()), (1, 2, "success".to_string())]
        );
    }

    #[test]
    fn test_v1_database_gains_undocumented_index() {
        let conn = Connection::open_in_memory().unwrap();
        for stmt in BOOKKEEPING_STATEMENTS.iter().chain(SNAPSHOT_TABLES) {
            conn.execute_batch(stmt).unwrap();
        }
        conn.execute(
            "INSERT INTO store_meta(key, value) VALUES('schema_version', '1');",
            [],
        )
        .unwrap();
        assert!(!has_index(&conn, "idx_symbols_undocumented"));

        initialize(&conn).unwrap();
        assert!(has_index(&conn, "idx_symbols_undocumented"));
        assert_eq!(schema_version(&conn).unwrap(), 2);
        assert_eq!(history(&conn), vec![(1, 2, "success".to_string())]);
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
        assert_eq!(history(&conn).len(), MIGRATIONS.len());
    }
}
