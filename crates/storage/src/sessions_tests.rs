// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

fn store() -> (tempfile::TempDir, SessionStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = SessionStore::new(dir.path());
    (dir, store)
}

fn snapshot(id: &str, secs: i64) -> SessionSnapshot {
    SessionSnapshot {
        id: SessionId::from_string(id),
        name: format!("debug {id}"),
        project_root: PathBuf::from("/proj"),
        created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap(),
        watches: vec!["x".into(), "x + y".into()],
    }
}

#[test]
fn empty_store_lists_nothing() {
    let (_dir, store) = store();
    assert!(store.list_recoverable().unwrap().is_empty());
}

#[test]
fn snapshot_roundtrips() {
    let (_dir, store) = store();
    let snap = snapshot("sess_00000001", 0);
    store.snapshot(&snap).unwrap();

    let listed = store.list_recoverable().unwrap();
    assert_eq!(listed, vec![snap]);
}

#[test]
fn listing_is_ordered_by_creation_time() {
    let (_dir, store) = store();
    store.snapshot(&snapshot("sess_00000002", 60)).unwrap();
    store.snapshot(&snapshot("sess_00000001", 0)).unwrap();
    store.snapshot(&snapshot("sess_00000003", 120)).unwrap();

    let ids: Vec<String> = store
        .list_recoverable()
        .unwrap()
        .into_iter()
        .map(|s| s.id.as_str().to_string())
        .collect();
    assert_eq!(ids, vec!["sess_00000001", "sess_00000002", "sess_00000003"]);
}

#[test]
fn rewrite_replaces_snapshot() {
    let (_dir, store) = store();
    let mut snap = snapshot("sess_00000001", 0);
    store.snapshot(&snap).unwrap();

    snap.watches.push("len(data)".into());
    store.snapshot(&snap).unwrap();

    let listed = store.list_recoverable().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].watches.len(), 3);
}

#[test]
fn remove_reports_existence() {
    let (_dir, store) = store();
    let snap = snapshot("sess_00000001", 0);

    assert!(!store.remove(&snap.id).unwrap());
    store.snapshot(&snap).unwrap();
    assert!(store.remove(&snap.id).unwrap());
    assert!(store.list_recoverable().unwrap().is_empty());
}

#[test]
fn corrupt_snapshot_is_skipped_not_fatal() {
    let (dir, store) = store();
    store.snapshot(&snapshot("sess_00000001", 0)).unwrap();
    std::fs::write(dir.path().join("sessions/sess_bad.json"), b"not json").unwrap();
    std::fs::write(dir.path().join("sessions/notes.txt"), b"ignored").unwrap();

    let listed = store.list_recoverable().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "sess_00000001");
}
