//! Entry record types shared between the traversal engine and the store.

use crate::content::DigestPair;
use std::fs::Metadata;
use std::time::UNIX_EPOCH;

/// Status flags recorded per entry.
///
/// A small closed bitset rather than an error hierarchy: per-entry
/// conditions are data, not control flow. Both flags can be set in
/// principle, though a hashing-skipped entry is never read and so never
/// fails hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags(u32);

impl StatusFlags {
    /// The entry (or its directory listing) could not be read
    pub const READ_ERROR: u32 = 1 << 0;

    /// Hashing was disabled for this scan; digests intentionally absent
    pub const NO_HASH: u32 = 1 << 1;

    /// No flags set
    pub fn empty() -> Self {
        Self(0)
    }

    /// Reconstruct from a stored integer
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Raw bits for storage
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Mark the read-error condition
    pub fn set_error(&mut self) {
        self.0 |= Self::READ_ERROR;
    }

    /// Mark hashing as skipped
    pub fn set_no_hash(&mut self) {
        self.0 |= Self::NO_HASH;
    }

    /// Whether the read-error flag is set
    pub fn is_error(self) -> bool {
        self.0 & Self::READ_ERROR != 0
    }

    /// Whether the hashing-skipped flag is set
    pub fn is_no_hash(self) -> bool {
        self.0 & Self::NO_HASH != 0
    }
}

/// One filesystem object observed during a scan, ready for insertion.
///
/// Holds the base name only - ancestry is recoverable through `parent_id`
/// links once the store assigns identifiers. `parent_id` 0 marks the scan
/// root.
#[derive(Debug, Clone)]
pub struct EntryRecord {
    /// Store-assigned identifier of the parent entry (0 for the scan root)
    pub parent_id: i64,

    /// Base name (not full path)
    pub name: String,

    /// Status flag bitset
    pub status: StatusFlags,

    /// Size in bytes as reported by stat (0 when stat failed)
    pub size: u64,

    /// Full st_mode bits (type + permissions), 0 when stat failed
    pub mode: u32,

    /// Modification time as Unix seconds
    pub mtime: Option<i64>,

    /// Content digest pair; absent for directories, error entries, and
    /// hashing-disabled scans
    pub digests: Option<DigestPair>,
}

impl EntryRecord {
    /// Build an error entry for a path whose metadata could not be read.
    pub fn unreadable(parent_id: i64, name: &str) -> Self {
        let mut status = StatusFlags::empty();
        status.set_error();
        Self {
            parent_id,
            name: name.to_string(),
            status,
            size: 0,
            mode: 0,
            mtime: None,
            digests: None,
        }
    }

    /// Build an entry from a metadata snapshot. Digests and flags beyond
    /// the snapshot are the caller's concern.
    pub fn from_metadata(parent_id: i64, name: &str, meta: &Metadata) -> Self {
        Self {
            parent_id,
            name: name.to_string(),
            status: StatusFlags::empty(),
            size: meta.len(),
            mode: mode_bits(meta),
            mtime: unix_mtime(meta),
            digests: None,
        }
    }

    /// Whether the mode bits mark this entry as a directory
    pub fn is_dir(&self) -> bool {
        is_dir_mode(self.mode)
    }
}

/// File type mask and directory/file type bits from st_mode
const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
#[cfg(not(unix))]
const S_IFREG: u32 = 0o100000;

/// Check directory type from stored mode bits
pub fn is_dir_mode(mode: u32) -> bool {
    mode & S_IFMT == S_IFDIR
}

/// Extract full st_mode bits from a metadata snapshot
#[cfg(unix)]
pub fn mode_bits(meta: &Metadata) -> u32 {
    use std::os::unix::fs::MetadataExt;
    meta.mode()
}

/// Synthesized mode bits for platforms without st_mode
#[cfg(not(unix))]
pub fn mode_bits(meta: &Metadata) -> u32 {
    if meta.is_dir() {
        S_IFDIR | 0o755
    } else {
        S_IFREG | 0o644
    }
}

/// Modification time as Unix seconds (None if unavailable or pre-epoch)
pub fn unix_mtime(meta: &Metadata) -> Option<i64> {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
}
