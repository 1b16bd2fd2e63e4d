//! Core storage for CourseKeep: courses, materials and notes persisted as
//! one JSON file per record, with gzip snapshot backup and restore.

pub mod backup;
pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod schedule;
pub mod service;
pub mod snapshot;

pub use backup::{
    BackupEntry, BackupError, BackupKind, BackupMedium, BackupReceipt, BackupResult, BackupStore,
    RestoreEngine, RestoreError, RestoreReport,
};
pub use config::{ConfigError, CoreConfig, DeploymentMode};
pub use logging::{default_log_level, flush_logs, init_logging, logging_status, LogLevel};
pub use model::entity::{new_entity_id, Entity};
pub use model::snapshot::Snapshot;
pub use repo::collection::{Collection, CollectionSet, StoreMode};
pub use repo::record_repo::{RecordRepository, RepoError, RepoResult};
pub use schedule::{AutoBackup, AutoBackupStatus};
pub use service::data_service::{DataResult, DataService, DataServiceError, StorageStatus};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
