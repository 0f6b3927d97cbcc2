//! CLI argument parsing and validation
//!
//! The CLI layer is deliberately thin: it selects one of the three
//! operating modes (scan, list, compare) and hands validated inputs to
//! the corresponding entry point. All catalog semantics live below it.

use crate::error::ConfigError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Filesystem catalog scanner with duplicate detection
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dircat",
    version,
    about = "Catalog directory trees into SQLite with dual content digests",
    long_about = "Recursively scans directory trees, computes an MD5+SHA-1 digest pair per \
                  file in one streaming pass, and stores the hierarchy in a versioned SQLite \
                  catalog. Committed scans can be listed, searched for duplicate content, or \
                  compared without re-reading file bytes.",
    after_help = "EXAMPLES:\n    \
        dircat scan /data\n    \
        dircat scan -n /mnt/backup /mnt/archive   # catalog without hashing\n    \
        dircat list --duplicates\n    \
        dircat compare 1 2\n    \
        dircat compare 1 2 --force                # prune removed rows from scan 1"
)]
pub struct CliArgs {
    /// Catalog store file
    #[arg(
        short = 'o',
        long,
        global = true,
        default_value = "catalog.db",
        value_name = "FILE"
    )]
    pub catalog: PathBuf,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Verbose output (per-entry warnings, debug logging)
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Operating modes
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Scan directory tree(s) into the catalog
    Scan {
        /// Root path(s) to scan; each gets its own scan id
        #[arg(value_name = "ROOT", default_value = ".")]
        roots: Vec<PathBuf>,

        /// Don't hash file contents
        #[arg(short = 'n', long)]
        no_hash: bool,
    },

    /// List entries of a committed scan
    List {
        /// Only list files with identical content (duplicate groups)
        #[arg(short = 'u', long)]
        duplicates: bool,

        /// Scan to list (defaults to the most recent)
        #[arg(long, value_name = "ID")]
        scan: Option<i64>,
    },

    /// Compare two committed scans
    Compare {
        /// Baseline scan id
        #[arg(value_name = "SCAN_A")]
        scan_a: i64,

        /// Scan id to compare against the baseline
        #[arg(value_name = "SCAN_B")]
        scan_b: i64,

        /// Prune rows classified as removed from the baseline scan's
        /// catalog (the filesystem is never touched)
        #[arg(short = 'f', long)]
        force: bool,
    },
}

/// Validate scan roots before any scan is attempted. A bad root is a
/// configuration error: fatal to the invocation, no partial scan.
pub fn validate_roots(roots: &[PathBuf]) -> Result<(), ConfigError> {
    if roots.is_empty() {
        return Err(ConfigError::NoRoots);
    }
    for root in roots {
        std::fs::symlink_metadata(root).map_err(|e| ConfigError::InvalidRoot {
            path: root.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

/// Validate compare inputs.
pub fn validate_compare(scan_a: i64, scan_b: i64) -> Result<(), ConfigError> {
    if scan_a == scan_b {
        return Err(ConfigError::SameScan(scan_a));
    }
    Ok(())
}
