//! Database schema definitions and creation
//!
//! This module defines the SQLite schema for the catalog: the `scans`
//! table (one row per committed traversal), the `entries` table (one row
//! per catalogued filesystem object), and a small key/value metadata
//! table. It also owns the mode-dependent index policy: digest indexes
//! exist only while the store is opened for reading.

use crate::error::DbResult;
use rusqlite::Connection;

/// Current schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// SQL to create the scans table.
/// Note: INTEGER PRIMARY KEY auto-assigns monotonically increasing ids
/// without the sqlite_sequence overhead of AUTOINCREMENT.
const CREATE_SCANS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS scans (
    id INTEGER PRIMARY KEY,
    root TEXT NOT NULL,
    created_at TEXT NOT NULL     -- RFC 3339 timestamp
)
"#;

/// SQL to create the entries table
const CREATE_ENTRIES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS entries (
    id INTEGER PRIMARY KEY,
    scan_id INTEGER NOT NULL,
    parent_id INTEGER NOT NULL DEFAULT 0,  -- 0 marks the scan root
    name TEXT NOT NULL,
    status INTEGER NOT NULL DEFAULT 0,     -- flag bitset: 1=read error, 2=hashing skipped
    size INTEGER NOT NULL DEFAULT 0,
    mode INTEGER NOT NULL DEFAULT 0,       -- full st_mode bits
    mtime INTEGER,                         -- Unix timestamp
    digest_md5 BLOB,
    digest_sha1 BLOB
)
"#;

/// SQL to create catalog metadata table
const CREATE_CATALOG_INFO_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS catalog_info (
    key TEXT PRIMARY KEY,
    value TEXT
)
"#;

/// Indexes for list/compare queries. Created for read mode, dropped
/// before bulk writes in scan mode - write throughput over query latency
/// while a scan is running, the reverse afterwards.
const READ_INDEXES: &[(&str, &str)] = &[
    (
        "idx_entries_scan_id",
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_entries_scan_id ON entries(scan_id, id)",
    ),
    (
        "idx_entries_parent",
        "CREATE INDEX IF NOT EXISTS idx_entries_parent ON entries(scan_id, parent_id)",
    ),
    (
        "idx_entries_md5",
        "CREATE INDEX IF NOT EXISTS idx_entries_md5 ON entries(scan_id, digest_md5)",
    ),
    (
        "idx_entries_sha1",
        "CREATE INDEX IF NOT EXISTS idx_entries_sha1 ON entries(scan_id, digest_sha1)",
    ),
];

/// SQLite pragmas for write-optimized scanning
const WRITE_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA cache_size = -32000;      -- 32MB cache
PRAGMA temp_store = MEMORY;
PRAGMA page_size = 4096;
"#;

/// SQLite pragmas for read-optimized queries
const READ_PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = FULL;
"#;

/// Create tables (idempotent)
pub fn create_tables(conn: &Connection) -> DbResult<()> {
    conn.execute(CREATE_SCANS_TABLE, [])?;
    conn.execute(CREATE_ENTRIES_TABLE, [])?;
    conn.execute(CREATE_CATALOG_INFO_TABLE, [])?;
    Ok(())
}

/// Configure the connection for bulk scan writes: write pragmas and no
/// secondary indexes on the entries table.
pub fn prepare_for_writes(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(WRITE_PRAGMAS)?;
    create_tables(conn)?;
    for (name, _) in READ_INDEXES {
        conn.execute(&format!("DROP INDEX IF EXISTS {name}"), [])?;
    }
    Ok(())
}

/// Configure the connection for queries: read pragmas and digest/id
/// indexes in place.
pub fn prepare_for_reads(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(READ_PRAGMAS)?;
    create_tables(conn)?;
    for (_, sql) in READ_INDEXES {
        conn.execute(sql, [])?;
    }
    // Refresh planner statistics after index (re)creation
    conn.execute("ANALYZE", [])?;
    Ok(())
}

/// Store catalog metadata
pub fn set_catalog_info(conn: &Connection, key: &str, value: &str) -> DbResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO catalog_info (key, value) VALUES (?1, ?2)",
        [key, value],
    )?;
    Ok(())
}

/// Get catalog metadata
pub fn get_catalog_info(conn: &Connection, key: &str) -> DbResult<Option<String>> {
    let result = conn.query_row(
        "SELECT value FROM catalog_info WHERE key = ?1",
        [key],
        |row| row.get(0),
    );

    match result {
        Ok(value) => Ok(Some(value)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Metadata keys used by the catalog
pub mod keys {
    /// Schema version
    pub const SCHEMA_VERSION: &str = "schema_version";

    /// Tool version that last wrote the store
    pub const TOOL_VERSION: &str = "tool_version";
}
