//! dircat - filesystem catalog scanner
//!
//! Catalogs the contents of filesystem subtrees: recursively enumerates
//! files and directories, computes two independent content digests per
//! file in one streaming pass, and persists the hierarchy into a SQLite
//! store under a versioned scan namespace. Repeated scans can later be
//! listed, searched for duplicate content, or diffed without re-reading
//! file bytes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                   Scan Session                       │
//! │   begin_scan ─→ walk ─→ commit (one transaction)     │
//! └───────────────┬──────────────────────────────────────┘
//!                 │
//!                 ▼
//! ┌──────────────────────────────────────────────────────┐
//! │                 Traversal Engine                     │
//! │   iterative DFS, parent-before-child, symlinks       │
//! │   skipped, per-entry errors recorded not fatal       │
//! └──────┬──────────────────────────────┬────────────────┘
//!        │ per file                     │ entry batches
//!        ▼                              ▼
//! ┌──────────────────┐    ┌─────────────────────────────┐
//! │  Digest Pipeline │    │        Catalog Store        │
//! │  MD5 + SHA-1 in  │    │  SQLite, scan-scoped        │
//! │  one pass        │    │  transaction, digest        │
//! └──────────────────┘    │  indexes in read mode       │
//!                         └─────────────────────────────┘
//!                                        ▲
//!                                        │
//!                         ┌──────────────┴──────────────┐
//!                         │  Query Engine (list/compare)│
//!                         └─────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Catalog a tree
//! dircat scan /data
//!
//! # Find files with identical content in the latest scan
//! dircat list --duplicates
//!
//! # Diff two scans of the same root
//! dircat compare 1 2
//! ```
//!
//! The store file (`catalog.db` by default) and its schema are the only
//! on-disk contract; external tools may query it directly:
//!
//! ```bash
//! sqlite3 catalog.db "SELECT name, size FROM entries WHERE scan_id = 1"
//! ```

pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod progress;
pub mod query;
pub mod scan;

pub use config::{CliArgs, Command};
pub use content::DigestPair;
pub use db::{CatalogStore, EntryRow, OpenMode, ScanInfo};
pub use error::{CatalogError, Result};
pub use query::ScanDiff;
pub use scan::{ScanResult, ScanSession, StatusFlags, WalkStats};
