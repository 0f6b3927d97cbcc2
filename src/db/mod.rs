//! Catalog storage: SQLite schema and the scan-scoped store
//!
//! One store file per working directory holds every scan. Scan mode
//! opens the store write-optimized (no secondary indexes, bulk pragmas);
//! list/compare mode opens it read-optimized (digest indexes built).
//! This mode-dependent schema policy trades write throughput against
//! query latency and is part of the on-disk contract.

pub mod schema;
pub mod store;

pub use schema::{get_catalog_info, keys, set_catalog_info, SCHEMA_VERSION};
pub use store::{CatalogStore, EntryRow, OpenMode, ScanInfo, ScanWriter};
