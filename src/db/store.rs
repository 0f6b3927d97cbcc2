//! Catalog store: scan-scoped transactional writes and query reads
//!
//! `CatalogStore` wraps one SQLite connection to the store file. Opening
//! it selects a mode: `Write` (scan mode - indexes dropped, bulk-insert
//! pragmas) or `Read` (list/compare mode - digest indexes in place).
//!
//! Writes go through a `ScanWriter`, which owns one transaction spanning
//! a whole scan: a reader never observes a scan with some but not all of
//! its successfully appended entries. Within the transaction, per-entry
//! insert failures are logged and skipped rather than aborting the scan -
//! atomicity is guaranteed at the scan level, not the entry level.

use crate::db::schema::{self, keys};
use crate::error::{DbError, DbResult};
use crate::scan::types::{is_dir_mode, EntryRecord, StatusFlags};
use rusqlite::{params, Connection, Transaction};
use std::path::Path;
use tracing::{debug, error};

/// How the store is being opened; selects the index/pragma policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Scan mode: drop secondary indexes, write-optimized pragmas
    Write,
    /// List/compare mode: create digest indexes, read-optimized pragmas
    Read,
}

/// Metadata for one committed (or in-progress) scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanInfo {
    /// Store-assigned, monotonically increasing identifier
    pub id: i64,

    /// Root path as given by the caller
    pub root: String,

    /// Creation timestamp (RFC 3339)
    pub created_at: String,
}

/// One entry row read back from the store
#[derive(Debug, Clone)]
pub struct EntryRow {
    pub id: i64,
    pub scan_id: i64,
    pub parent_id: i64,
    pub name: String,
    pub status: StatusFlags,
    pub size: u64,
    pub mode: u32,
    pub mtime: Option<i64>,
    pub md5: Option<Vec<u8>>,
    pub sha1: Option<Vec<u8>>,
}

impl EntryRow {
    /// Whether the stored mode bits mark this row as a directory
    pub fn is_dir(&self) -> bool {
        is_dir_mode(self.mode)
    }

    /// Whether both digests are present
    pub fn is_hashed(&self) -> bool {
        self.md5.is_some() && self.sha1.is_some()
    }

    /// The digest pair as a comparable key, if hashed
    pub fn digest_key(&self) -> Option<(&[u8], &[u8])> {
        match (&self.md5, &self.sha1) {
            (Some(m), Some(s)) => Some((m.as_slice(), s.as_slice())),
            _ => None,
        }
    }
}

/// Durable, indexed store for scans and their entries
pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Open (creating if needed) the store file in the given mode.
    pub fn open(path: &Path, mode: OpenMode) -> DbResult<Self> {
        let conn = Connection::open(path).map_err(|e| DbError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::init(conn, mode)
    }

    /// Open an existing store read-only queries against. Fails if the
    /// file does not exist.
    pub fn open_existing(path: &Path) -> DbResult<Self> {
        if !path.exists() {
            return Err(DbError::OpenFailed {
                path: path.to_path_buf(),
                reason: "store file does not exist".into(),
            });
        }
        Self::open(path, OpenMode::Read)
    }

    /// In-memory store for tests
    pub fn open_in_memory(mode: OpenMode) -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, mode)
    }

    fn init(conn: Connection, mode: OpenMode) -> DbResult<Self> {
        match mode {
            OpenMode::Write => schema::prepare_for_writes(&conn)?,
            OpenMode::Read => schema::prepare_for_reads(&conn)?,
        }
        schema::set_catalog_info(&conn, keys::SCHEMA_VERSION, &schema::SCHEMA_VERSION.to_string())?;
        schema::set_catalog_info(&conn, keys::TOOL_VERSION, env!("CARGO_PKG_VERSION"))?;
        Ok(Self { conn })
    }

    /// Begin a new scan: inserts the scan row and opens the transaction
    /// that will hold every entry of this scan.
    pub fn begin_scan(&mut self, root: &str) -> DbResult<ScanWriter<'_>> {
        let tx = self.conn.unchecked_transaction()?;
        let created_at = chrono::Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO scans (root, created_at) VALUES (?1, ?2)",
            params![root, created_at],
        )?;
        let scan_id = tx.last_insert_rowid();
        debug!(scan_id, root, "scan transaction opened");
        Ok(ScanWriter { tx, scan_id })
    }

    /// Look up one scan by id
    pub fn scan(&self, id: i64) -> DbResult<Option<ScanInfo>> {
        let result = self.conn.query_row(
            "SELECT id, root, created_at FROM scans WHERE id = ?1",
            [id],
            |row| {
                Ok(ScanInfo {
                    id: row.get(0)?,
                    root: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        );
        match result {
            Ok(info) => Ok(Some(info)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// The most recently created scan, if any
    pub fn latest_scan(&self) -> DbResult<Option<ScanInfo>> {
        let result = self.conn.query_row(
            "SELECT id, root, created_at FROM scans ORDER BY id DESC LIMIT 1",
            [],
            |row| {
                Ok(ScanInfo {
                    id: row.get(0)?,
                    root: row.get(1)?,
                    created_at: row.get(2)?,
                })
            },
        );
        match result {
            Ok(info) => Ok(Some(info)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All scans, oldest first
    pub fn scans(&self) -> DbResult<Vec<ScanInfo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, root, created_at FROM scans ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok(ScanInfo {
                id: row.get(0)?,
                root: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Return all entries of a scan in insertion order, or - with
    /// `duplicates_only` - only entries whose digest pair is shared by at
    /// least one other entry within the same scan.
    pub fn list_entries(&self, scan_id: i64, duplicates_only: bool) -> DbResult<Vec<EntryRow>> {
        let sql = if duplicates_only {
            "SELECT id, scan_id, parent_id, name, status, size, mode, mtime, digest_md5, digest_sha1
             FROM entries e
             WHERE e.scan_id = ?1
               AND e.digest_md5 IS NOT NULL
               AND EXISTS (
                   SELECT 1 FROM entries d
                   WHERE d.scan_id = e.scan_id
                     AND d.digest_md5 = e.digest_md5
                     AND d.digest_sha1 = e.digest_sha1
                     AND d.id <> e.id)
             ORDER BY e.digest_md5, e.digest_sha1, e.id"
        } else {
            "SELECT id, scan_id, parent_id, name, status, size, mode, mtime, digest_md5, digest_sha1
             FROM entries WHERE scan_id = ?1 ORDER BY id"
        };

        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([scan_id], row_to_entry)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Delete specific entry rows from a scan. Backs compare's --force;
    /// touches the catalog only, never the filesystem.
    pub fn remove_entries(&mut self, scan_id: i64, ids: &[i64]) -> DbResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0usize;
        {
            let mut stmt =
                tx.prepare_cached("DELETE FROM entries WHERE scan_id = ?1 AND id = ?2")?;
            for id in ids {
                removed += stmt.execute(params![scan_id, id])?;
            }
        }
        tx.commit()?;
        Ok(removed)
    }

    /// Number of entries recorded for a scan
    pub fn entry_count(&self, scan_id: i64) -> DbResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM entries WHERE scan_id = ?1",
            [scan_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        id: row.get(0)?,
        scan_id: row.get(1)?,
        parent_id: row.get(2)?,
        name: row.get(3)?,
        status: StatusFlags::from_bits(row.get::<_, i64>(4)? as u32),
        size: row.get::<_, i64>(5)? as u64,
        mode: row.get::<_, i64>(6)? as u32,
        mtime: row.get(7)?,
        md5: row.get(8)?,
        sha1: row.get(9)?,
    })
}

/// Writer for one scan's entries, owning the scan-spanning transaction.
///
/// Dropping the writer without calling `commit` rolls the whole scan
/// back (rusqlite's transaction drop behavior), so an aborted session
/// never leaves a readable partial scan.
pub struct ScanWriter<'conn> {
    tx: Transaction<'conn>,
    scan_id: i64,
}

impl<'conn> ScanWriter<'conn> {
    /// The store-assigned identifier of this scan
    pub fn scan_id(&self) -> i64 {
        self.scan_id
    }

    /// Insert a batch of entries, assigning each an identifier.
    ///
    /// Returns the identifier of the last successfully inserted row (the
    /// walker uses this to link a directory's children). Individual
    /// insert failures are logged and skipped; the scan continues.
    pub fn append_entries(&self, entries: &[EntryRecord]) -> DbResult<i64> {
        let mut last_id = 0i64;
        let mut stmt = self.tx.prepare_cached(
            "INSERT INTO entries (scan_id, parent_id, name, status, size, mode, mtime, digest_md5, digest_sha1)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;

        for entry in entries {
            let md5 = entry.digests.as_ref().map(|d| d.md5.to_vec());
            let sha1 = entry.digests.as_ref().map(|d| d.sha1.to_vec());
            let result = stmt.execute(params![
                self.scan_id,
                entry.parent_id,
                entry.name,
                entry.status.bits() as i64,
                entry.size as i64,
                entry.mode as i64,
                entry.mtime,
                md5,
                sha1,
            ]);
            match result {
                Ok(_) => last_id = self.tx.last_insert_rowid(),
                Err(e) => {
                    error!(name = %entry.name, error = %e, "entry insert failed, skipping");
                }
            }
        }
        Ok(last_id)
    }

    /// Set the read-error flag on an already-inserted entry. Used when a
    /// directory's listing fails after its own row was appended: the
    /// failure is recorded on that row, not as a separate entry.
    pub fn mark_error(&self, entry_id: i64) -> DbResult<()> {
        self.tx.execute(
            "UPDATE entries SET status = status | ?1 WHERE scan_id = ?2 AND id = ?3",
            params![StatusFlags::READ_ERROR as i64, self.scan_id, entry_id],
        )?;
        Ok(())
    }

    /// Commit every entry appended since `begin_scan` as one atomic unit.
    pub fn commit(self) -> DbResult<()> {
        self.tx
            .commit()
            .map_err(|e| DbError::Transaction(e.to_string()))
    }

    /// Discard the scan and everything appended under it.
    pub fn abort(self) -> DbResult<()> {
        self.tx
            .rollback()
            .map_err(|e| DbError::Transaction(e.to_string()))
    }
}
