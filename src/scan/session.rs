//! Scan session: one root traversed under one atomic transaction
//!
//! The session owns the scan lifecycle end-to-end: `begin_scan` on the
//! store, drive the traversal engine, commit, report throughput. There is
//! no ambient global state - the store handle and shutdown flag are
//! passed in explicitly.
//!
//! Interrupt semantics are availability-over-completeness: when the
//! shutdown flag stops the walk early, the session still *commits* what
//! was inserted so the partial scan remains query-able rather than being
//! silently lost. Callers should treat a scan produced by an interrupted
//! run as possibly truncated.

use crate::db::CatalogStore;
use crate::error::Result;
use crate::progress::ProgressReporter;
use crate::scan::walker::{TreeWalker, WalkStats};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Outcome of one committed scan
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// Store-assigned scan identifier
    pub scan_id: i64,

    /// Traversal counters
    pub stats: WalkStats,

    /// Wall-clock duration of the traversal and commit
    pub duration: Duration,
}

impl ScanResult {
    /// Throughput in KB/s over the scanned bytes
    pub fn kb_per_sec(&self) -> u64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            (self.stats.bytes as f64 / secs) as u64 / 1024
        } else {
            0
        }
    }
}

/// Orchestrates scan-mode runs against a write-mode store
pub struct ScanSession {
    hashing: bool,
    shutdown: Arc<AtomicBool>,
    show_progress: bool,
}

impl ScanSession {
    /// Create a session. `shutdown` is shared with the signal handler;
    /// setting it stops traversal and forces a commit of the partial scan.
    pub fn new(hashing: bool, shutdown: Arc<AtomicBool>) -> Self {
        Self {
            hashing,
            shutdown,
            show_progress: false,
        }
    }

    /// Enable the spinner/progress display
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Scan one root under its own begin/commit pair.
    ///
    /// A store failure mid-walk drops the writer, rolling the whole scan
    /// back - readers never observe a half-written scan. An interrupt is
    /// not a failure: the truncated scan commits.
    pub fn run(&self, store: &mut CatalogStore, root: &Path) -> Result<ScanResult> {
        let start = Instant::now();

        let writer = store.begin_scan(&root.display().to_string())?;
        let scan_id = writer.scan_id();
        info!(scan_id, root = %root.display(), "scan started");

        let progress = if self.show_progress {
            Some(ProgressReporter::new())
        } else {
            None
        };

        let mut walker = TreeWalker::new(&writer, self.hashing, &self.shutdown);
        if let Some(ref p) = progress {
            walker = walker.with_progress(p);
        }

        let stats = walker.walk(root)?;
        writer.commit()?;

        if let Some(ref p) = progress {
            if stats.completed {
                p.finish("Scan complete");
            } else {
                p.finish("Scan interrupted");
            }
        }

        if !stats.completed {
            warn!(scan_id, "scan interrupted - committed partial results may be truncated");
        }
        info!(
            scan_id,
            dirs = stats.dirs,
            files = stats.files,
            bytes = stats.bytes,
            errors = stats.errors,
            "scan committed"
        );

        Ok(ScanResult {
            scan_id,
            stats,
            duration: start.elapsed(),
        })
    }
}
