//! Scan mode: traversal engine, entry records, and the scan session.

pub mod session;
pub mod types;
pub mod walker;

pub use session::{ScanResult, ScanSession};
pub use types::{EntryRecord, StatusFlags};
pub use walker::{TreeWalker, WalkStats};
