//! Query engine: list and compare operations over committed scans
//!
//! This layer owns no state; it reads one or two committed scans from the
//! catalog store, reconstructs relative paths from parent links, and
//! either enumerates entries (optionally duplicate groups only) or diffs
//! two scans.
//!
//! Diff matching policy: entries match by *relative path*. Identifiers
//! are scan-local and digests alone cannot distinguish a moved file from
//! an unchanged one, so path identity is the only stable cross-scan key.
//! An entry counts as changed when both sides were hashed and the digest
//! pairs differ, or - when either side is unhashed - the sizes differ.
//! Directories participate in added/removed only.

use crate::db::{CatalogStore, EntryRow, ScanInfo};
use crate::error::{CatalogError, Result};
use crate::progress::format_number;
use console::style;
use humansize::{format_size, BINARY};
use std::collections::HashMap;
use tracing::info;

/// Result of diffing two scans, keyed by relative path
#[derive(Debug, Default)]
pub struct ScanDiff {
    /// Paths present in B but not in A
    pub added: Vec<String>,

    /// Paths present in A but not in B
    pub removed: Vec<String>,

    /// Paths present in both whose content differs
    pub changed: Vec<String>,

    /// Entry ids in scan A backing the removed paths (for --force pruning)
    pub removed_ids: Vec<i64>,
}

impl ScanDiff {
    /// True when the two scans describe identical trees
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.changed.is_empty()
    }
}

/// Resolve a scan reference: an explicit id, or the most recent scan.
pub fn resolve_scan(store: &CatalogStore, id: Option<i64>) -> Result<ScanInfo> {
    match id {
        Some(id) => store
            .scan(id)?
            .ok_or(CatalogError::ScanNotFound(id)),
        None => store.latest_scan()?.ok_or(CatalogError::EmptyCatalog),
    }
}

/// Reconstruct each entry's path relative to the scan root.
///
/// The root entry maps to the empty string; its children to their names;
/// deeper entries to slash-joined ancestor chains. Entries arrive in
/// insertion order, so every parent is resolved before its children.
/// Orphans (entries whose parent row is missing, e.g. a skipped insert)
/// are left out: a bare name could alias a genuine top-level path.
pub fn relative_paths(entries: &[EntryRow]) -> HashMap<i64, String> {
    let mut paths: HashMap<i64, String> = HashMap::with_capacity(entries.len());
    for entry in entries {
        let path = if entry.parent_id == 0 {
            String::new()
        } else {
            match paths.get(&entry.parent_id) {
                Some(parent) if parent.is_empty() => entry.name.clone(),
                Some(parent) => format!("{}/{}", parent, entry.name),
                None => continue,
            }
        };
        paths.insert(entry.id, path);
    }
    paths
}

/// Diff two scans by relative path.
pub fn compare_scans(store: &CatalogStore, scan_a: i64, scan_b: i64) -> Result<ScanDiff> {
    // Validate both references up front
    store.scan(scan_a)?.ok_or(CatalogError::ScanNotFound(scan_a))?;
    store.scan(scan_b)?.ok_or(CatalogError::ScanNotFound(scan_b))?;

    let entries_a = store.list_entries(scan_a, false)?;
    let entries_b = store.list_entries(scan_b, false)?;

    let by_path_a = index_by_path(&entries_a);
    let by_path_b = index_by_path(&entries_b);

    let mut diff = ScanDiff::default();

    for (path, entry_b) in &by_path_b {
        match by_path_a.get(path) {
            None => diff.added.push(path.clone()),
            Some(entry_a) => {
                if content_differs(entry_a, entry_b) {
                    diff.changed.push(path.clone());
                }
            }
        }
    }

    for (path, entry_a) in &by_path_a {
        if !by_path_b.contains_key(path) {
            diff.removed.push(path.clone());
            diff.removed_ids.push(entry_a.id);
        }
    }

    diff.added.sort();
    diff.removed.sort();
    diff.changed.sort();
    Ok(diff)
}

/// Prune the removed entries' rows from scan A in the catalog.
///
/// Scan B is treated as authoritative; only catalog rows are deleted,
/// the filesystem is never touched.
pub fn prune_removed(store: &mut CatalogStore, scan_a: i64, diff: &ScanDiff) -> Result<usize> {
    let pruned = store.remove_entries(scan_a, &diff.removed_ids)?;
    info!(scan_a, pruned, "pruned extraneous catalog rows");
    Ok(pruned)
}

fn index_by_path(entries: &[EntryRow]) -> HashMap<String, &EntryRow> {
    let paths = relative_paths(entries);
    let mut by_path = HashMap::with_capacity(entries.len());
    for entry in entries {
        if let Some(path) = paths.get(&entry.id) {
            // The root maps to "" on both sides and is the diff anchor,
            // not a diffable entry.
            if !path.is_empty() {
                by_path.insert(path.clone(), entry);
            }
        }
    }
    by_path
}

fn content_differs(a: &EntryRow, b: &EntryRow) -> bool {
    if a.is_dir() != b.is_dir() {
        return true;
    }
    if a.is_dir() {
        return false;
    }
    match (a.digest_key(), b.digest_key()) {
        (Some(key_a), Some(key_b)) => key_a != key_b,
        // One or both sides unhashed: size is the only comparable signal
        _ => a.size != b.size,
    }
}

/// List a scan's entries (or its duplicate groups) to stdout.
pub fn run_list(store: &CatalogStore, scan_ref: Option<i64>, duplicates_only: bool) -> Result<()> {
    let scan = resolve_scan(store, scan_ref)?;
    let all_entries = store.list_entries(scan.id, false)?;
    let paths = relative_paths(&all_entries);

    println!();
    println!(
        "{} scan {} of {} ({})",
        style("Listing").cyan().bold(),
        scan.id,
        scan.root,
        scan.created_at
    );
    println!("{}", style("─".repeat(50)).dim());

    if duplicates_only {
        let dups = store.list_entries(scan.id, true)?;
        print_duplicate_groups(&dups, &paths);
    } else {
        for entry in &all_entries {
            print_entry(entry, &paths);
        }
        println!();
        println!(
            "{} entries",
            style(format_number(all_entries.len() as u64)).bold()
        );
    }
    Ok(())
}

fn print_entry(entry: &EntryRow, paths: &HashMap<i64, String>) {
    let path = paths.get(&entry.id).map(String::as_str).unwrap_or(&entry.name);
    let display_path = if path.is_empty() { "." } else { path };

    let mut notes = Vec::new();
    if entry.status.is_error() {
        notes.push("read-error");
    }
    if entry.status.is_no_hash() {
        notes.push("unhashed");
    }
    let note = if notes.is_empty() {
        String::new()
    } else {
        format!(" [{}]", notes.join(","))
    };

    if entry.is_dir() {
        println!("  {}/{}", display_path, style(note).yellow());
    } else {
        println!(
            "  {} {}{}",
            display_path,
            style(format_size(entry.size, BINARY)).dim(),
            style(note).yellow()
        );
    }
}

fn print_duplicate_groups(dups: &[EntryRow], paths: &HashMap<i64, String>) {
    if dups.is_empty() {
        println!("  No duplicate content found");
        return;
    }

    // Entries arrive ordered by digest pair; group consecutive runs
    let mut groups = 0u64;
    let mut last_key: Option<(Vec<u8>, Vec<u8>)> = None;
    for entry in dups {
        let key = match (&entry.md5, &entry.sha1) {
            (Some(m), Some(s)) => (m.clone(), s.clone()),
            _ => continue,
        };
        if last_key.as_ref() != Some(&key) {
            groups += 1;
            println!();
            println!(
                "{} md5={} sha1={}",
                style("Duplicate group:").bold(),
                hex::encode(&key.0),
                hex::encode(&key.1)
            );
            last_key = Some(key);
        }
        let path = paths.get(&entry.id).map(String::as_str).unwrap_or(&entry.name);
        println!(
            "  {} {}",
            path,
            style(format_size(entry.size, BINARY)).dim()
        );
    }

    println!();
    println!(
        "{} duplicate groups, {} entries",
        style(format_number(groups)).bold(),
        style(format_number(dups.len() as u64)).bold()
    );
}

/// Diff two scans, print the result, optionally prune removed rows.
pub fn run_compare(
    store: &mut CatalogStore,
    scan_a: i64,
    scan_b: i64,
    force: bool,
) -> Result<ScanDiff> {
    let diff = compare_scans(store, scan_a, scan_b)?;

    println!();
    println!(
        "{} scan {} → scan {}",
        style("Comparing").cyan().bold(),
        scan_a,
        scan_b
    );
    println!("{}", style("─".repeat(50)).dim());

    if diff.is_empty() {
        println!("  Scans are identical");
    } else {
        for path in &diff.added {
            println!("  {} {}", style("+").green().bold(), path);
        }
        for path in &diff.removed {
            println!("  {} {}", style("-").red().bold(), path);
        }
        for path in &diff.changed {
            println!("  {} {}", style("~").yellow().bold(), path);
        }
        println!();
        println!(
            "{} added, {} removed, {} changed",
            format_number(diff.added.len() as u64),
            format_number(diff.removed.len() as u64),
            format_number(diff.changed.len() as u64)
        );
    }

    if force && !diff.removed_ids.is_empty() {
        let pruned = prune_removed(store, scan_a, &diff)?;
        println!(
            "{} {} extraneous rows from scan {}",
            style("Pruned").red().bold(),
            format_number(pruned as u64),
            scan_a
        );
    }

    Ok(diff)
}
