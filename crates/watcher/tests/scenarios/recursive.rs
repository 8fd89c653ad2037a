//! New subdirectories: tracked from the first cycle that sees them

use crate::common::{Harness, DELAY};
use dirwatch_watcher::ChangeKind;
use std::fs;
use std::path::PathBuf;

/// Build `sub/inner/leaf.txt` outside the root, then move it in atomically
fn move_tree_in(h: &Harness) {
    let staging = h.temp_dir.path().join("staging");
    fs::create_dir_all(staging.join("sub/inner")).unwrap();
    fs::write(staging.join("sub/inner/leaf.txt"), "leaf").unwrap();
    fs::rename(staging.join("sub"), h.path("sub")).unwrap();
}

#[test]
fn test_recursive_reports_new_subtree_in_one_cycle() {
    let h = Harness::new(true);
    h.monitor.start().unwrap();
    h.wait_for_cycles(1);

    move_tree_in(&h);
    // Events arrive in path order within a cycle
    let dir = h.expect_change(ChangeKind::Created, &h.path("sub"));
    let inner = h.expect_change(ChangeKind::Created, &h.path("sub/inner"));
    let leaf = h.expect_change(ChangeKind::Created, &h.path("sub/inner/leaf.txt"));

    // All three come from the same capture
    let captured_at = dir.after().unwrap().captured_at();
    assert_eq!(inner.after().unwrap().captured_at(), captured_at);
    assert_eq!(leaf.after().unwrap().captured_at(), captured_at);
    assert!(inner.after().unwrap().is_directory());

    // Children of the new directory are tracked from then on
    let nested = h.path("sub/inner/second.txt");
    fs::write(&nested, "2").unwrap();
    h.expect_change(ChangeKind::Created, &nested);
}

#[test]
fn test_recursive_created_events_cover_subtree() {
    let h = Harness::new(true);
    h.monitor.start().unwrap();
    h.wait_for_cycles(1);

    move_tree_in(&h);
    let created: Vec<PathBuf> = h
        .changes_during(DELAY * 4)
        .into_iter()
        .filter(|e| e.kind() == ChangeKind::Created)
        .map(|e| e.path().to_path_buf())
        .collect();

    assert_eq!(
        created,
        vec![h.path("sub"), h.path("sub/inner"), h.path("sub/inner/leaf.txt")]
    );
}

#[test]
fn test_nested_deletion_detected() {
    let h = Harness::new(true);
    fs::create_dir_all(h.path("a/b")).unwrap();
    fs::write(h.path("a/b/c.txt"), "c").unwrap();
    h.monitor.start().unwrap();
    h.wait_for_cycles(1);

    fs::remove_file(h.path("a/b/c.txt")).unwrap();
    let deleted = h.expect_change(ChangeKind::Deleted, &h.path("a/b/c.txt"));
    assert!(!deleted.before().unwrap().is_directory());
}

#[test]
fn test_flat_mode_ignores_subtree_contents() {
    let h = Harness::new(false);
    h.monitor.start().unwrap();
    h.wait_for_cycles(1);

    move_tree_in(&h);
    let changes = h.changes_during(DELAY * 4);

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].kind(), ChangeKind::Created);
    assert_eq!(changes[0].path(), h.path("sub"));
    assert!(changes[0].after().unwrap().is_directory());
}

#[cfg(unix)]
#[test]
fn test_unreadable_subdirectory_reported_not_deleted() {
    use dirwatch_watcher::{MonitorMessage, MonitorStatus};
    use std::os::unix::fs::PermissionsExt;

    let h = Harness::new(true);
    let locked = h.path("sub");
    fs::create_dir(&locked).unwrap();
    fs::write(locked.join("keep.txt"), "k").unwrap();
    h.monitor.start().unwrap();
    h.wait_for_cycles(1);

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
    // Permission bits do not apply to root
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let status = h.expect_status(|s| matches!(s, MonitorStatus::ScanFailed { .. }));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    match status {
        MonitorStatus::ScanFailed { path, .. } => assert_eq!(path, locked),
        other => panic!("unexpected status: {other}"),
    }

    // Access restored: the kept snapshot still has sub/keep.txt, so nothing churns
    let cycles = h.monitor.cycles_completed();
    h.wait_for_cycles(cycles + 2);
    let churn: Vec<_> = h
        .rx
        .try_iter()
        .filter(|m| matches!(m, MonitorMessage::Change(_)))
        .collect();
    assert!(churn.is_empty(), "unexpected changes: {churn:?}");
}
