use coursekeep_core::{CoreConfig, DataService, DeploymentMode, Entity, StoreMode};
use serde_json::json;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

fn config(root: &TempDir) -> CoreConfig {
    CoreConfig::with_dirs(root.path().join("data"), root.path().join("backups"))
}

#[test]
fn scheduler_creates_backups_until_stopped() {
    let root = tempfile::tempdir().expect("temp dir");
    let mut config = config(&root);
    config.backup_interval = Duration::from_millis(20);
    let service = DataService::open(&config);
    service
        .put("courses", "c1", Entity::from_value(json!({"title": "Intro"})).expect("JSON object"))
        .expect("put course");

    let status = service.start_auto_backup();
    assert!(status.running);
    assert_eq!(status.interval_ms, 20);

    thread::sleep(Duration::from_millis(200));
    let status = service.stop_auto_backup();
    assert!(!status.running);

    assert!(!service.list_backups().expect("catalog should list").is_empty());
}

#[test]
fn initial_backup_runs_before_timer() {
    let root = tempfile::tempdir().expect("temp dir");
    let service = DataService::open(&config(&root));

    let status = service.start_auto_backup_with_initial();
    assert!(status.running);
    assert_eq!(service.list_backups().expect("catalog should list").len(), 1);

    let status = service.set_auto_backup_interval(Duration::from_secs(5));
    assert!(status.running);
    assert_eq!(status.interval_ms, 5_000);
    service.stop_auto_backup();
}

#[test]
fn serverless_deployment_disables_scheduler() {
    let root = tempfile::tempdir().expect("temp dir");
    let mut config = config(&root);
    config.deployment = DeploymentMode::Serverless;
    config.backup_interval = Duration::from_millis(5);
    let service = DataService::open(&config);

    let status = service.start_auto_backup_with_initial();
    assert!(!status.running);
    assert!(!status.enabled);
    thread::sleep(Duration::from_millis(40));
    assert!(service.list_backups().expect("catalog should list").is_empty());

    // Manual backups still work.
    service.create_backup().expect("backup should be written");
    assert_eq!(service.list_backups().expect("catalog should list").len(), 1);
}

#[test]
fn storage_status_reports_every_collection() {
    let root = tempfile::tempdir().expect("temp dir");
    let service = DataService::open(&config(&root).with_collection("quizzes"));

    let status = service.storage_status();
    let names: Vec<&str> = status
        .collections
        .iter()
        .map(|collection| collection.type_name.as_str())
        .collect();
    assert_eq!(names, ["courses", "materials", "notes", "quizzes"]);
    assert!(status
        .collections
        .iter()
        .all(|collection| collection.mode == StoreMode::OnDisk));
}

#[test]
fn delete_backup_and_open_backup() {
    let root = tempfile::tempdir().expect("temp dir");
    let service = DataService::open(&config(&root));
    let receipt = service.create_backup().expect("backup should be written");

    let path = service
        .open_backup(&receipt.filename)
        .expect("backup should be in the catalog");
    assert!(path.is_file());

    service
        .delete_backup(&receipt.filename)
        .expect("delete backup");
    assert!(service.open_backup(&receipt.filename).is_err());
    assert!(service.delete_backup(&receipt.filename).is_err());
}
