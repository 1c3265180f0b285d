// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn store() -> (tempfile::TempDir, BreakpointStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = BreakpointStore::new(dir.path());
    (dir, store)
}

fn spec(path: &str, line: u32) -> BreakpointSpec {
    BreakpointSpec::new(path, line)
}

#[test]
fn load_of_unknown_project_is_empty() {
    let (_dir, store) = store();
    let map = store.load(Path::new("/proj")).unwrap();
    assert!(map.is_empty());
}

#[test]
fn save_then_load_roundtrips() {
    let (_dir, store) = store();
    let root = Path::new("/proj");

    let mut map = BTreeMap::new();
    map.insert(PathBuf::from("/proj/a.py"), vec![spec("/proj/a.py", 10)]);
    map.insert(PathBuf::from("/proj/b.py"), vec![spec("/proj/b.py", 20)]);
    store.save(root, &map).unwrap();

    assert_eq!(store.load(root).unwrap(), map);
}

#[test]
fn update_file_replaces_one_entry() {
    let (_dir, store) = store();
    let root = Path::new("/proj");

    store.update_file(root, Path::new("/proj/a.py"), &[spec("/proj/a.py", 10)]).unwrap();
    store.update_file(root, Path::new("/proj/b.py"), &[spec("/proj/b.py", 20)]).unwrap();
    store
        .update_file(root, Path::new("/proj/a.py"), &[spec("/proj/a.py", 11), spec("/proj/a.py", 12)])
        .unwrap();

    let map = store.load(root).unwrap();
    let lines: Vec<u32> = map[Path::new("/proj/a.py")].iter().map(|s| s.line).collect();
    assert_eq!(lines, vec![11, 12]);
    assert_eq!(map[Path::new("/proj/b.py")].len(), 1);
}

#[test]
fn empty_specs_remove_the_file_entry() {
    let (_dir, store) = store();
    let root = Path::new("/proj");

    store.update_file(root, Path::new("/proj/a.py"), &[spec("/proj/a.py", 10)]).unwrap();
    store.update_file(root, Path::new("/proj/a.py"), &[]).unwrap();

    assert!(store.load(root).unwrap().is_empty());
}

#[test]
fn clear_reports_existence() {
    let (_dir, store) = store();
    let root = Path::new("/proj");

    assert!(!store.clear(root).unwrap());
    store.update_file(root, Path::new("/proj/a.py"), &[spec("/proj/a.py", 10)]).unwrap();
    assert!(store.clear(root).unwrap());
    assert!(store.load(root).unwrap().is_empty());
}

#[test]
fn projects_do_not_interfere() {
    let (_dir, store) = store();

    store
        .update_file(Path::new("/proj1"), Path::new("/proj1/a.py"), &[spec("/proj1/a.py", 1)])
        .unwrap();
    store
        .update_file(Path::new("/proj2"), Path::new("/proj2/a.py"), &[spec("/proj2/a.py", 2)])
        .unwrap();

    assert_eq!(store.load(Path::new("/proj1")).unwrap().len(), 1);
    store.clear(Path::new("/proj1")).unwrap();
    assert_eq!(store.load(Path::new("/proj2")).unwrap().len(), 1);
}

#[test]
fn conditions_and_log_messages_survive_persistence() {
    let (_dir, store) = store();
    let root = Path::new("/proj");

    let mut conditional = spec("/proj/a.py", 5);
    conditional.condition = Some("i == 50".into());
    let mut logpoint = spec("/proj/a.py", 9);
    logpoint.log_message = Some("i={i}".into());

    store
        .update_file(root, Path::new("/proj/a.py"), &[conditional.clone(), logpoint.clone()])
        .unwrap();

    let map = store.load(root).unwrap();
    assert_eq!(map[Path::new("/proj/a.py")], vec![conditional, logpoint]);
}
