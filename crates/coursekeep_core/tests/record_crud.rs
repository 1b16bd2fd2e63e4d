use coursekeep_core::{Collection, CoreConfig, DataService, Entity, RepoError, StoreMode};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

fn entity(value: Value) -> Entity {
    Entity::from_value(value).expect("test entity must be a JSON object")
}

fn open_service(root: &Path) -> DataService {
    DataService::open(&CoreConfig::with_dirs(
        root.join("data"),
        root.join("backups"),
    ))
}

#[test]
fn put_then_get_returns_same_entity_for_every_type() {
    let dir = tempfile::tempdir().expect("temp dir");
    let service = open_service(dir.path());

    for type_name in ["courses", "materials", "notes"] {
        let record = entity(json!({
            "id": format!("{type_name}_1"),
            "title": "Modeling basics",
            "tags": ["maya", "intro"],
            "meta": {"order": 3, "draft": false, "cover": null}
        }));
        let id = record.id().expect("record carries an id").to_string();
        service
            .put(type_name, &id, record.clone())
            .expect("put record");
        assert_eq!(service.get(type_name, &id).expect("get record"), record);
    }
}

#[test]
fn put_creates_course_file_and_list_returns_it() {
    let dir = tempfile::tempdir().expect("temp dir");
    let courses = Collection::open(dir.path(), "courses");
    assert_eq!(courses.mode(), StoreMode::OnDisk);

    let course = entity(json!({"id": "c1", "title": "Intro"}));
    courses.put("c1", course.clone()).expect("put course");

    assert!(dir.path().join("courses").join("c1.json").is_file());
    assert_eq!(courses.list().expect("list courses"), vec![course]);
}

#[test]
fn remove_then_get_is_not_found() {
    let dir = tempfile::tempdir().expect("temp dir");
    let notes = Collection::open(dir.path(), "notes");
    notes
        .put("n1", entity(json!({"content": "hello"})))
        .expect("put note");

    notes.remove("n1").expect("remove note");

    assert!(matches!(notes.get("n1"), Err(RepoError::NotFound(id)) if id == "n1"));
    assert!(matches!(notes.remove("n1"), Err(RepoError::NotFound(_))));
}

#[test]
fn put_fills_missing_id_and_rejects_conflicting_id() {
    let dir = tempfile::tempdir().expect("temp dir");
    let materials = Collection::open(dir.path(), "materials");

    let stored = materials
        .put("m1", entity(json!({"name": "scene.ma"})))
        .expect("put material");
    assert_eq!(stored.id(), Some("m1"));
    assert_eq!(materials.get("m1").expect("get material"), stored);

    let err = materials
        .put("m2", entity(json!({"id": "m3"})))
        .expect_err("conflicting id must be rejected");
    assert!(matches!(err, RepoError::IdMismatch { .. }));
}

#[test]
fn unsafe_ids_never_reach_the_filesystem() {
    let dir = tempfile::tempdir().expect("temp dir");
    let courses = Collection::open(dir.path(), "courses");

    let err = courses
        .put("../escape", entity(json!({"title": "x"})))
        .expect_err("traversal id must be rejected");
    assert!(matches!(err, RepoError::InvalidId(_)));
    assert!(!dir.path().join("escape.json").exists());
    assert_eq!(courses.mode(), StoreMode::OnDisk);
}

#[test]
fn replace_all_excludes_entities_without_id() {
    let dir = tempfile::tempdir().expect("temp dir");
    let courses = Collection::open(dir.path(), "courses");
    courses
        .put("old", entity(json!({"title": "old"})))
        .expect("put old course");

    let written = courses
        .replace_all(vec![
            entity(json!({"id": "a", "title": "A"})),
            entity(json!({"title": "anonymous"})),
        ])
        .expect("replace courses");

    assert_eq!(written, 1);
    let listed = courses.list().expect("list courses");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), Some("a"));
}

#[test]
fn replace_all_keeps_going_past_a_failed_write() {
    let dir = tempfile::tempdir().expect("temp dir");
    let courses = Collection::open(dir.path(), "courses");
    fs::create_dir(dir.path().join("courses").join("b.json")).expect("blocking directory");

    let written = courses
        .replace_all(vec![
            entity(json!({"id": "a"})),
            entity(json!({"id": "b"})),
            entity(json!({"id": "c"})),
        ])
        .expect("replace courses");

    assert_eq!(written, 2);
    assert_eq!(courses.mode(), StoreMode::OnDisk);
    assert!(dir.path().join("courses").join("a.json").is_file());
    assert!(dir.path().join("courses").join("c.json").is_file());
    assert!(!dir.path().join("courses").join("b.json.tmp").exists());
}

#[test]
fn merge_updates_fields_and_keeps_id() {
    let dir = tempfile::tempdir().expect("temp dir");
    let service = open_service(dir.path());
    service
        .put(
            "courses",
            "c1",
            entity(json!({"id": "c1", "title": "Intro", "tags": []})),
        )
        .expect("put course");

    let updated = service
        .update(
            "courses",
            "c1",
            &entity(json!({"id": "hijack", "title": "Intro II"})),
        )
        .expect("merge course");

    assert_eq!(
        updated,
        entity(json!({"id": "c1", "title": "Intro II", "tags": []}))
    );
    assert_eq!(service.get("courses", "c1").expect("get course"), updated);

    let missing = service
        .update("courses", "nope", &entity(json!({"title": "x"})))
        .expect_err("merge into a missing record");
    assert!(missing.is_not_found());
}

#[test]
fn unknown_collection_is_reported() {
    let dir = tempfile::tempdir().expect("temp dir");
    let service = open_service(dir.path());
    assert!(service.list("quizzes").is_err());
}

#[test]
fn list_skips_malformed_record_files() {
    let dir = tempfile::tempdir().expect("temp dir");
    let notes = Collection::open(dir.path(), "notes");
    notes
        .put("n1", entity(json!({"content": "ok"})))
        .expect("put note");
    fs::write(dir.path().join("notes").join("n2.json"), "{\"id\": ").expect("write malformed note");

    let listed = notes.list().expect("list notes");
    assert_eq!(listed.len(), 1);
    assert!(matches!(notes.get("n2"), Err(RepoError::InvalidData(_))));
    assert_eq!(notes.mode(), StoreMode::OnDisk);
}
