//! Integration tests for dircat
//!
//! End-to-end scenarios over real temporary directory trees and a real
//! store file: scan commit, duplicate lookup, cross-scan diff, and the
//! mode-dependent index policy.

use dircat::db::{CatalogStore, OpenMode};
use dircat::query;
use dircat::scan::ScanSession;
use rusqlite::Connection;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

fn write_file(path: &Path, content: &[u8]) {
    File::create(path).unwrap().write_all(content).unwrap();
}

fn no_shutdown() -> Arc<AtomicBool> {
    Arc::new(AtomicBool::new(false))
}

#[test]
fn test_scan_persists_to_store_file() {
    let tree = TempDir::new().unwrap();
    write_file(&tree.path().join("one.txt"), b"one");
    std::fs::create_dir(tree.path().join("sub")).unwrap();
    write_file(&tree.path().join("sub/two.txt"), b"two");

    let workdir = TempDir::new().unwrap();
    let db_path = workdir.path().join("catalog.db");

    let scan_id = {
        let mut store = CatalogStore::open(&db_path, OpenMode::Write).unwrap();
        let session = ScanSession::new(true, no_shutdown());
        session.run(&mut store, tree.path()).unwrap().scan_id
    };

    // The store file and its schema are the on-disk contract; verify it
    // with a plain SQLite connection the way an external tool would.
    let conn = Connection::open(&db_path).unwrap();
    let roots: String = conn
        .query_row("SELECT root FROM scans WHERE id = ?1", [scan_id], |row| {
            row.get(0)
        })
        .unwrap();
    assert_eq!(roots, tree.path().display().to_string());

    let entries: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM entries WHERE scan_id = ?1",
            [scan_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(entries, 4); // root, one.txt, sub, sub/two.txt

    let hashed: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM entries WHERE scan_id = ?1 AND digest_md5 IS NOT NULL AND digest_sha1 IS NOT NULL",
            [scan_id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(hashed, 2); // files only, never directories
}

#[test]
fn test_duplicate_detection_scenario() {
    // a.txt and b.txt share content "x", c.txt holds "y"
    let tree = TempDir::new().unwrap();
    write_file(&tree.path().join("a.txt"), b"x");
    write_file(&tree.path().join("b.txt"), b"x");
    write_file(&tree.path().join("c.txt"), b"y");

    let mut store = CatalogStore::open_in_memory(OpenMode::Write).unwrap();
    let session = ScanSession::new(true, no_shutdown());
    let scan_id = session.run(&mut store, tree.path()).unwrap().scan_id;

    let dups = store.list_entries(scan_id, true).unwrap();
    let mut names: Vec<_> = dups.iter().map(|e| e.name.clone()).collect();
    names.sort();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
}

#[test]
fn test_no_duplicates_yields_empty_set() {
    let tree = TempDir::new().unwrap();
    write_file(&tree.path().join("a.txt"), b"alpha");
    write_file(&tree.path().join("b.txt"), b"beta");

    let mut store = CatalogStore::open_in_memory(OpenMode::Write).unwrap();
    let session = ScanSession::new(true, no_shutdown());
    let scan_id = session.run(&mut store, tree.path()).unwrap().scan_id;

    assert!(store.list_entries(scan_id, true).unwrap().is_empty());
}

#[test]
fn test_digest_determinism_across_runs() {
    let tree = TempDir::new().unwrap();
    write_file(&tree.path().join("f.bin"), &[0xAB; 100_000]);

    let mut store = CatalogStore::open_in_memory(OpenMode::Write).unwrap();
    let session = ScanSession::new(true, no_shutdown());
    let first = session.run(&mut store, tree.path()).unwrap().scan_id;
    let second = session.run(&mut store, tree.path()).unwrap().scan_id;

    let entry_a = store
        .list_entries(first, false)
        .unwrap()
        .into_iter()
        .find(|e| e.name == "f.bin")
        .unwrap();
    let entry_b = store
        .list_entries(second, false)
        .unwrap()
        .into_iter()
        .find(|e| e.name == "f.bin")
        .unwrap();

    assert_eq!(entry_a.md5, entry_b.md5);
    assert_eq!(entry_a.sha1, entry_b.sha1);
    assert_ne!(entry_a.id, entry_b.id); // independently numbered
}

#[test]
fn test_rescan_diff_is_empty_without_changes() {
    let tree = TempDir::new().unwrap();
    write_file(&tree.path().join("stable.txt"), b"stable");
    std::fs::create_dir(tree.path().join("dir")).unwrap();
    write_file(&tree.path().join("dir/inner.txt"), b"inner");

    let mut store = CatalogStore::open_in_memory(OpenMode::Write).unwrap();
    let session = ScanSession::new(true, no_shutdown());
    let first = session.run(&mut store, tree.path()).unwrap().scan_id;
    let second = session.run(&mut store, tree.path()).unwrap().scan_id;
    assert_ne!(first, second);

    let diff = query::compare_scans(&store, first, second).unwrap();
    assert!(diff.is_empty());
}

#[test]
fn test_compare_detects_all_change_kinds() {
    let tree = TempDir::new().unwrap();
    write_file(&tree.path().join("kept.txt"), b"kept");
    write_file(&tree.path().join("edited.txt"), b"v1");
    write_file(&tree.path().join("deleted.txt"), b"gone soon");

    let mut store = CatalogStore::open_in_memory(OpenMode::Write).unwrap();
    let session = ScanSession::new(true, no_shutdown());
    let before = session.run(&mut store, tree.path()).unwrap().scan_id;

    write_file(&tree.path().join("edited.txt"), b"v2");
    std::fs::remove_file(tree.path().join("deleted.txt")).unwrap();
    write_file(&tree.path().join("created.txt"), b"new");

    let after = session.run(&mut store, tree.path()).unwrap().scan_id;

    let diff = query::compare_scans(&store, before, after).unwrap();
    assert_eq!(diff.added, vec!["created.txt"]);
    assert_eq!(diff.removed, vec!["deleted.txt"]);
    assert_eq!(diff.changed, vec!["edited.txt"]);
}

#[test]
fn test_read_mode_reopen_builds_digest_indexes() {
    let tree = TempDir::new().unwrap();
    write_file(&tree.path().join("x.txt"), b"x");

    let workdir = TempDir::new().unwrap();
    let db_path = workdir.path().join("catalog.db");

    {
        let mut store = CatalogStore::open(&db_path, OpenMode::Write).unwrap();
        let session = ScanSession::new(true, no_shutdown());
        session.run(&mut store, tree.path()).unwrap();
    }

    // During the scan (write mode) the secondary indexes are dropped
    {
        let conn = Connection::open(&db_path).unwrap();
        let indexes: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name LIKE 'idx_entries_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexes, 0);
    }

    // Reopening for reads builds them
    let store = CatalogStore::open_existing(&db_path).unwrap();
    let latest = store.latest_scan().unwrap().unwrap();
    assert!(!store.list_entries(latest.id, false).unwrap().is_empty());

    let conn = Connection::open(&db_path).unwrap();
    let indexes: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name LIKE 'idx_entries_%'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert!(indexes >= 3);
}

#[test]
fn test_open_existing_fails_on_missing_store() {
    let workdir = TempDir::new().unwrap();
    let missing = workdir.path().join("nope.db");
    assert!(CatalogStore::open_existing(&missing).is_err());
}

#[test]
fn test_nohash_scan_sets_flag_and_skips_digests() {
    let tree = TempDir::new().unwrap();
    write_file(&tree.path().join("a.txt"), b"content");

    let mut store = CatalogStore::open_in_memory(OpenMode::Write).unwrap();
    let session = ScanSession::new(false, no_shutdown());
    let scan_id = session.run(&mut store, tree.path()).unwrap().scan_id;

    let entries = store.list_entries(scan_id, false).unwrap();
    let file = entries.iter().find(|e| e.name == "a.txt").unwrap();
    assert!(file.status.is_no_hash());
    assert!(file.md5.is_none());
    assert!(file.sha1.is_none());

    // Duplicates query has nothing to match on
    assert!(store.list_entries(scan_id, true).unwrap().is_empty());
}

#[test]
fn test_interrupted_scan_is_truncated_but_consistent() {
    let tree = TempDir::new().unwrap();
    for i in 0..10 {
        let dir = tree.path().join(format!("d{i}"));
        std::fs::create_dir(&dir).unwrap();
        write_file(&dir.join("f.txt"), b"data");
    }

    let mut store = CatalogStore::open_in_memory(OpenMode::Write).unwrap();

    let full = ScanSession::new(true, no_shutdown())
        .run(&mut store, tree.path())
        .unwrap();
    assert!(full.stats.completed);
    let full_count = store.entry_count(full.scan_id).unwrap();

    let interrupted = ScanSession::new(true, Arc::new(AtomicBool::new(true)))
        .run(&mut store, tree.path())
        .unwrap();
    assert!(!interrupted.stats.completed);
    let partial_count = store.entry_count(interrupted.scan_id).unwrap();

    assert!(partial_count <= full_count);

    // Every committed entry still satisfies the parent-before-child and
    // digest pairing invariants.
    let entries = store.list_entries(interrupted.scan_id, false).unwrap();
    let mut seen = std::collections::HashSet::new();
    for entry in &entries {
        if entry.parent_id != 0 {
            assert!(seen.contains(&entry.parent_id));
        }
        seen.insert(entry.id);
        assert_eq!(entry.md5.is_some(), entry.sha1.is_some());
    }
}

#[cfg(unix)]
#[test]
fn test_symlinked_directory_contents_appear_once() {
    let tree = TempDir::new().unwrap();
    std::fs::create_dir(tree.path().join("real")).unwrap();
    write_file(&tree.path().join("real/target.txt"), b"t");
    std::os::unix::fs::symlink(tree.path().join("real"), tree.path().join("alias")).unwrap();

    let mut store = CatalogStore::open_in_memory(OpenMode::Write).unwrap();
    let session = ScanSession::new(true, no_shutdown());
    let scan_id = session.run(&mut store, tree.path()).unwrap().scan_id;

    let entries = store.list_entries(scan_id, false).unwrap();
    assert_eq!(
        entries.iter().filter(|e| e.name == "target.txt").count(),
        1
    );
    assert!(entries.iter().all(|e| e.name != "alias"));
}

#[cfg(unix)]
#[test]
fn test_locked_subdirectory_does_not_abort_scan() {
    use std::os::unix::fs::PermissionsExt;

    let tree = TempDir::new().unwrap();
    write_file(&tree.path().join("visible.txt"), b"v");
    let locked = tree.path().join("locked");
    std::fs::create_dir(&locked).unwrap();
    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users bypass permission bits; nothing to test then
    if std::fs::read_dir(&locked).is_ok() {
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let mut store = CatalogStore::open_in_memory(OpenMode::Write).unwrap();
    let session = ScanSession::new(true, no_shutdown());
    let result = session.run(&mut store, tree.path());

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
    let result = result.unwrap();

    let entries = store.list_entries(result.scan_id, false).unwrap();
    let locked_entry = entries.iter().find(|e| e.name == "locked").unwrap();
    assert!(locked_entry.status.is_error());
    assert!(entries.iter().all(|e| e.parent_id != locked_entry.id));
    assert!(entries.iter().any(|e| e.name == "visible.txt"));
}

#[cfg(unix)]
#[test]
fn test_unhashable_file_is_catalogued_and_scan_commits() {
    use std::os::unix::fs::PermissionsExt;

    let tree = TempDir::new().unwrap();
    write_file(&tree.path().join("open.txt"), b"readable");
    let sealed = tree.path().join("sealed.txt");
    write_file(&sealed, b"secret");
    std::fs::set_permissions(&sealed, std::fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users bypass permission bits; nothing to test then
    if File::open(&sealed).is_ok() {
        return;
    }

    let mut store = CatalogStore::open_in_memory(OpenMode::Write).unwrap();
    let session = ScanSession::new(true, no_shutdown());
    let result = session.run(&mut store, tree.path()).unwrap();
    assert!(result.stats.completed);
    assert!(result.stats.errors >= 1);

    // The file stats fine but cannot be opened for hashing: flagged,
    // digest-free, metadata snapshot intact.
    let entries = store.list_entries(result.scan_id, false).unwrap();
    let sealed_entry = entries.iter().find(|e| e.name == "sealed.txt").unwrap();
    assert!(sealed_entry.status.is_error());
    assert!(sealed_entry.md5.is_none());
    assert!(sealed_entry.sha1.is_none());
    assert_eq!(sealed_entry.size, 6);

    let readable = entries.iter().find(|e| e.name == "open.txt").unwrap();
    assert!(readable.md5.is_some() && readable.sha1.is_some());
}

#[test]
fn test_force_prunes_catalog_only() {
    let tree = TempDir::new().unwrap();
    write_file(&tree.path().join("stays.txt"), b"s");
    write_file(&tree.path().join("leaves.txt"), b"l");

    let mut store = CatalogStore::open_in_memory(OpenMode::Write).unwrap();
    let session = ScanSession::new(true, no_shutdown());
    let before = session.run(&mut store, tree.path()).unwrap().scan_id;

    std::fs::remove_file(tree.path().join("leaves.txt")).unwrap();
    let after = session.run(&mut store, tree.path()).unwrap().scan_id;

    let diff = query::compare_scans(&store, before, after).unwrap();
    let pruned = query::prune_removed(&mut store, before, &diff).unwrap();
    assert_eq!(pruned, 1);

    // The newer scan is untouched and the filesystem still has the
    // surviving file.
    assert_eq!(store.entry_count(after).unwrap(), 2);
    assert!(tree.path().join("stays.txt").exists());
}
