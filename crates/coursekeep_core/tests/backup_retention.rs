use coursekeep_core::{BackupError, BackupKind, BackupStore, CollectionSet, Entity};
use regex::Regex;
use serde_json::json;
use std::fs;
use std::path::Path;

fn seeded_collections(root: &Path) -> CollectionSet {
    let collections = CollectionSet::open(&root.join("data"), ["courses", "materials", "notes"]);
    collections
        .get("courses")
        .expect("courses collection")
        .put(
            "c1",
            Entity::from_value(json!({"title": "Intro"})).expect("JSON object"),
        )
        .expect("seed course");
    collections
}

#[test]
fn create_writes_timestamped_gzip_file() {
    let root = tempfile::tempdir().expect("temp dir");
    let collections = seeded_collections(root.path());
    let store = BackupStore::open(root.path().join("backups"), 10);

    let receipt = store.create(&collections).expect("backup should be written");

    let pattern =
        Regex::new(r"^backup_\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}-\d{3}Z(_\d{2})?\.json\.gz$")
            .expect("valid pattern");
    assert!(pattern.is_match(&receipt.filename), "{}", receipt.filename);
    let path = receipt.path.expect("on-disk backup has a path");
    let bytes = fs::read(&path).expect("read backup file");
    assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    assert_eq!(receipt.entity_count, 1);
    assert_eq!(receipt.kind, BackupKind::Snapshot);
}

#[test]
fn retention_keeps_most_recent_snapshots() {
    let root = tempfile::tempdir().expect("temp dir");
    let collections = seeded_collections(root.path());
    let store = BackupStore::open(root.path().join("backups"), 3);

    let mut created = Vec::new();
    for _ in 0..5 {
        created.push(
            store
                .create(&collections)
                .expect("backup should be written")
                .filename,
        );
    }

    let listed: Vec<String> = store
        .list()
        .expect("catalog should list")
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(listed.len(), 3);
    let expected: Vec<String> = created.iter().rev().take(3).cloned().collect();
    assert_eq!(listed, expected);
}

#[test]
fn list_is_sorted_by_modification_time_descending() {
    let root = tempfile::tempdir().expect("temp dir");
    let collections = seeded_collections(root.path());
    let store = BackupStore::open(root.path().join("backups"), 10);

    for _ in 0..4 {
        store.create(&collections).expect("backup should be written");
    }
    let entries = store.list().expect("catalog should list");
    assert_eq!(entries.len(), 4);
    for pair in entries.windows(2) {
        assert!(pair[0].modified >= pair[1].modified);
        assert!(pair[0].size_bytes > 0);
    }
}

#[test]
fn exports_are_listed_but_never_rotated() {
    let root = tempfile::tempdir().expect("temp dir");
    let collections = seeded_collections(root.path());
    let store = BackupStore::open(root.path().join("backups"), 1);

    let export = store.export(&collections).expect("export should be written");
    assert!(export.filename.starts_with("export_"));
    assert!(export.filename.ends_with(".json"));
    let body = fs::read_to_string(export.path.as_ref().expect("export has a path"))
        .expect("read export file");
    assert!(body.contains("\"title\": \"Intro\""));

    store.create(&collections).expect("first backup");
    store.create(&collections).expect("second backup");

    let entries = store.list().expect("catalog should list");
    let snapshots = entries
        .iter()
        .filter(|e| e.kind == BackupKind::Snapshot)
        .count();
    let exports = entries
        .iter()
        .filter(|e| e.kind == BackupKind::Export)
        .count();
    assert_eq!(snapshots, 1);
    assert_eq!(exports, 1);
}

#[test]
fn foreign_files_are_ignored_by_list_and_prune() {
    let root = tempfile::tempdir().expect("temp dir");
    let collections = seeded_collections(root.path());
    let backup_dir = root.path().join("backups");
    let store = BackupStore::open(&backup_dir, 1);
    fs::write(backup_dir.join("README.txt"), "keep me").expect("write foreign file");

    store.create(&collections).expect("first backup");
    store.create(&collections).expect("second backup");

    assert_eq!(store.list().expect("catalog should list").len(), 1);
    assert!(backup_dir.join("README.txt").exists());
}

#[test]
fn rotation_survives_entries_it_cannot_delete() {
    let root = tempfile::tempdir().expect("temp dir");
    let collections = seeded_collections(root.path());
    let backup_dir = root.path().join("backups");
    let store = BackupStore::open(&backup_dir, 1);
    let squatter = backup_dir.join("backup_2000-01-01T00-00-00-000Z.json.gz");
    fs::create_dir(&squatter).expect("directory with a backup name");

    store.create(&collections).expect("first backup");
    let latest = store.create(&collections).expect("second backup");

    let listed: Vec<String> = store
        .list()
        .expect("catalog should list")
        .into_iter()
        .map(|entry| entry.name)
        .collect();
    assert_eq!(listed, vec![latest.filename]);
    assert!(squatter.is_dir());
}

#[test]
fn delete_removes_file_and_reports_missing() {
    let root = tempfile::tempdir().expect("temp dir");
    let collections = seeded_collections(root.path());
    let store = BackupStore::open(root.path().join("backups"), 10);
    let receipt = store.create(&collections).expect("backup should be written");

    store.delete(&receipt.filename).expect("delete backup");
    assert!(store.list().expect("catalog should list").is_empty());
    assert!(matches!(
        store.delete(&receipt.filename),
        Err(BackupError::NotFound(_))
    ));
    assert!(matches!(
        store.delete("../data/courses/c1.json"),
        Err(BackupError::InvalidName(_))
    ));
    assert!(root
        .path()
        .join("data")
        .join("courses")
        .join("c1.json")
        .exists());
}
