//! Error types for dircat
//!
//! Design philosophy (shared across the crate):
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include context about what to do
//! - Per-entry traversal and hashing failures are *not* errors at this
//!   level: they are recorded as status flags on the affected entry and
//!   the scan continues. Only store and configuration failures surface
//!   through these types.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the dircat application
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Referenced scan does not exist in the store
    #[error("Scan {0} not found in catalog")]
    ScanNotFound(i64),

    /// The store contains no scans at all
    #[error("Catalog is empty - run a scan first")]
    EmptyCatalog,
}

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to open or create the store file
    #[error("Failed to open catalog at '{path}': {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// Transaction failed
    #[error("Transaction failed: {0}")]
    Transaction(String),
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Scan root does not exist or is not accessible
    #[error("Root path '{path}' does not exist or is not accessible: {reason}")]
    InvalidRoot { path: PathBuf, reason: String },

    /// No roots given to scan
    #[error("No root directories specified")]
    NoRoots,

    /// Output path error
    #[error("Invalid catalog path '{path}': {reason}")]
    InvalidCatalogPath { path: PathBuf, reason: String },

    /// Compare needs two distinct scans
    #[error("Cannot compare scan {0} with itself")]
    SameScan(i64),
}

/// Result type alias for CatalogError
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Result type alias for DbError
pub type DbResult<T> = std::result::Result<T, DbError>;
