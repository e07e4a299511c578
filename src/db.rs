// ==========================================
// Transformer Dispatch - SQLite connection setup
// ==========================================
// - every connection gets the same PRAGMAs (foreign keys must be enabled
//   per connection, otherwise unit cascade-delete silently stops working)
// - schema bootstrap is idempotent and records schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// Default busy_timeout (milliseconds)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Schema version written by `init_schema`
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// Apply the shared PRAGMAs to a connection
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// Open a SQLite connection with the shared configuration
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// In-memory connection with PRAGMAs and schema, used by tests and tooling
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Create every table and index if missing
///
/// Foreign keys:
/// - unit.dispatch_id -> dispatch(id) ON DELETE CASCADE
/// - dispatch.linked_official_id / source_dispatch_id -> dispatch(id) ON DELETE SET NULL
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS team (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS dispatch (
            id TEXT PRIMARY KEY,
            document_number TEXT NOT NULL,
            date TEXT NOT NULL,
            transaction_date TEXT,
            direction TEXT NOT NULL CHECK (direction IN ('INTAKE', 'RETURN')),
            document_kind TEXT NOT NULL DEFAULT 'OFFICIAL'
                CHECK (document_kind IN ('OFFICIAL', 'PROVISIONAL')),
            is_lab_round_trip INTEGER NOT NULL DEFAULT 0,
            linked_official_id TEXT REFERENCES dispatch(id) ON DELETE SET NULL,
            source_dispatch_id TEXT REFERENCES dispatch(id) ON DELETE SET NULL,
            team_id TEXT REFERENCES team(id) ON DELETE SET NULL,
            file_url TEXT,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS unit (
            id TEXT PRIMARY KEY,
            dispatch_id TEXT NOT NULL REFERENCES dispatch(id) ON DELETE CASCADE,
            serial_number TEXT NOT NULL,
            capacity_rating TEXT,
            model_tag TEXT,
            note TEXT,
            photo_url TEXT,
            lab_test_result TEXT CHECK (lab_test_result IN ('PASS', 'FAIL')),
            is_processed INTEGER NOT NULL DEFAULT 0,
            seq_no INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_unit_dispatch ON unit(dispatch_id, seq_no);
        CREATE INDEX IF NOT EXISTS idx_unit_serial ON unit(serial_number);
        CREATE INDEX IF NOT EXISTS idx_dispatch_source ON dispatch(source_dispatch_id);
        CREATE INDEX IF NOT EXISTS idx_dispatch_linked_official ON dispatch(linked_official_id);
        CREATE INDEX IF NOT EXISTS idx_dispatch_direction_date ON dispatch(direction, date);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

/// Read schema_version (None if the table does not exist)
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
