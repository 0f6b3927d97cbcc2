//! Traversal engine: depth-first directory walk feeding the catalog
//!
//! The walk is single-threaded and iterative (explicit stack rather than
//! call recursion, so filesystem depth cannot exhaust the call stack).
//! Entries are emitted parent-before-child: each discovered directory is
//! appended individually so its store-assigned id can parent its own
//! children, while a directory's regular-file children are batched into
//! one `append_entries` call.
//!
//! Policy, in order of appearance:
//! - Symlinks are skipped entirely: never traversed, never recorded.
//!   This is the containment policy against cycles and escaping the root.
//! - A stat failure becomes an error-flagged entry with zero size and no
//!   digests; the walk continues with siblings.
//! - A listing failure after the directory's own entry was appended sets
//!   the error flag on that existing row; that subtree stops there.
//! - Sibling order is whatever read_dir yields - unsorted, unspecified.

use crate::content::digest_file;
use crate::db::ScanWriter;
use crate::error::DbResult;
use crate::progress::ProgressReporter;
use crate::scan::types::EntryRecord;
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Running counters for one walk
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkStats {
    /// Directories visited
    pub dirs: u64,

    /// Files visited
    pub files: u64,

    /// Total bytes of visited files
    pub bytes: u64,

    /// Entries recorded with the error flag
    pub errors: u64,

    /// False when the walk stopped early on the shutdown flag
    pub completed: bool,
}

/// A directory whose entry row exists but whose children are pending
struct PendingDir {
    path: PathBuf,
    id: i64,
}

/// Depth-first traversal engine bound to one open scan transaction
pub struct TreeWalker<'a> {
    writer: &'a ScanWriter<'a>,
    hashing: bool,
    shutdown: &'a AtomicBool,
    progress: Option<&'a ProgressReporter>,
}

impl<'a> TreeWalker<'a> {
    /// Create a walker writing into the given scan
    pub fn new(writer: &'a ScanWriter<'a>, hashing: bool, shutdown: &'a AtomicBool) -> Self {
        Self {
            writer,
            hashing,
            shutdown,
            progress: None,
        }
    }

    /// Attach a progress reporter, updated once per directory
    pub fn with_progress(mut self, progress: &'a ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Walk the root and all descendants, appending entries to the scan.
    ///
    /// Only store-level failures (statement preparation, row updates)
    /// surface as errors; per-entry filesystem failures are recorded on
    /// the affected entries and the walk continues.
    pub fn walk(&self, root: &Path) -> DbResult<WalkStats> {
        let mut stats = WalkStats {
            completed: true,
            ..WalkStats::default()
        };
        let mut stack: Vec<PendingDir> = Vec::new();

        let root_name = root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| root.display().to_string());

        match fs::symlink_metadata(root) {
            Err(e) => {
                warn!(path = %root.display(), error = %e, "cannot stat scan root");
                self.writer
                    .append_entries(&[EntryRecord::unreadable(0, &root_name)])?;
                stats.errors += 1;
                return Ok(stats);
            }
            Ok(meta) if meta.file_type().is_symlink() => {
                warn!(path = %root.display(), "scan root is a symlink, skipping");
                return Ok(stats);
            }
            Ok(meta) if meta.is_dir() => {
                stats.dirs += 1;
                let record = EntryRecord::from_metadata(0, &root_name, &meta);
                let root_id = self.writer.append_entries(&[record])?;
                if root_id > 0 {
                    stack.push(PendingDir {
                        path: root.to_path_buf(),
                        id: root_id,
                    });
                }
            }
            Ok(meta) => {
                // Root names a regular file: a single-entry scan, no
                // listing attempted.
                let record = self.file_record(0, &root_name, &meta, root, &mut stats);
                self.writer.append_entries(&[record])?;
            }
        }

        while let Some(dir) = stack.pop() {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("shutdown flag set, stopping traversal");
                stats.completed = false;
                break;
            }

            let listing = match fs::read_dir(&dir.path) {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(path = %dir.path.display(), error = %e, "cannot list directory");
                    self.writer.mark_error(dir.id)?;
                    stats.errors += 1;
                    continue;
                }
            };

            let mut files: Vec<EntryRecord> = Vec::new();
            for dirent in listing {
                let dirent = match dirent {
                    Ok(d) => d,
                    Err(e) => {
                        // Mid-listing failure: recorded on the directory's
                        // own row, subtree stops here.
                        warn!(path = %dir.path.display(), error = %e, "directory listing failed");
                        self.writer.mark_error(dir.id)?;
                        stats.errors += 1;
                        break;
                    }
                };

                let name = dirent.file_name().to_string_lossy().into_owned();
                let file_type = match dirent.file_type() {
                    Ok(t) => t,
                    Err(e) => {
                        warn!(path = %dirent.path().display(), error = %e, "cannot stat entry");
                        files.push(EntryRecord::unreadable(dir.id, &name));
                        stats.errors += 1;
                        continue;
                    }
                };

                if file_type.is_symlink() {
                    debug!(path = %dirent.path().display(), "skipping symlink");
                    continue;
                }

                let meta = match dirent.metadata() {
                    Ok(m) => m,
                    Err(e) => {
                        warn!(path = %dirent.path().display(), error = %e, "cannot stat entry");
                        files.push(EntryRecord::unreadable(dir.id, &name));
                        stats.errors += 1;
                        continue;
                    }
                };

                if meta.is_dir() {
                    stats.dirs += 1;
                    let record = EntryRecord::from_metadata(dir.id, &name, &meta);
                    let sub_id = self.writer.append_entries(&[record])?;
                    // A skipped insert leaves no id to parent children with;
                    // the subtree is abandoned rather than misparented.
                    if sub_id > 0 {
                        stack.push(PendingDir {
                            path: dirent.path(),
                            id: sub_id,
                        });
                    }
                } else {
                    files.push(self.file_record(dir.id, &name, &meta, &dirent.path(), &mut stats));
                }
            }

            self.writer.append_entries(&files)?;

            if let Some(progress) = self.progress {
                progress.update(&stats);
            }
        }

        Ok(stats)
    }

    /// Build a record for a non-directory entry, hashing regular files
    /// when hashing is enabled.
    fn file_record(
        &self,
        parent_id: i64,
        name: &str,
        meta: &Metadata,
        path: &Path,
        stats: &mut WalkStats,
    ) -> EntryRecord {
        let mut record = EntryRecord::from_metadata(parent_id, name, meta);

        if !self.hashing {
            record.status.set_no_hash();
        } else if meta.is_file() {
            match digest_file(path) {
                Ok(pair) => record.digests = Some(pair),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "hashing failed");
                    record.status.set_error();
                    stats.errors += 1;
                }
            }
        } else {
            // Fifos, sockets, devices: reading could block indefinitely,
            // so they are catalogued unhashed.
            record.status.set_no_hash();
        }

        stats.files += 1;
        stats.bytes += meta.len();
        record
    }
}
