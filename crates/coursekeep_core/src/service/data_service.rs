//! Application data service.
//!
//! # Responsibility
//! - Own every collection, the backup store and the auto-backup scheduler
//!   for the lifetime of the process.
//! - Expose record CRUD by type name plus the data-management operations
//!   (backup, restore, export, import, catalog, scheduler).
//!
//! # Invariants
//! - Constructed once from `CoreConfig` and passed to callers explicitly;
//!   there is no global instance.
//! - Every operation returns a `Result`; storage faults never panic.
//! - Dropping the service stops the scheduler.

use crate::backup::{
    BackupEntry, BackupMedium, BackupReceipt, BackupResult, BackupStore, RestoreEngine,
    RestoreError, RestoreReport,
};
use crate::config::{CoreConfig, DeploymentMode};
use crate::model::entity::Entity;
use crate::repo::collection::{Collection, CollectionSet, StoreMode};
use crate::repo::record_repo::RepoError;
use crate::schedule::{AutoBackup, AutoBackupStatus, ScheduledJob};
use log::{error, info};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub type DataResult<T> = Result<T, DataServiceError>;

/// Error for record operations addressed by type name.
#[derive(Debug)]
pub enum DataServiceError {
    UnknownCollection(String),
    Repo(RepoError),
}

impl DataServiceError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Repo(RepoError::NotFound(_)))
    }
}

impl Display for DataServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownCollection(name) => write!(f, "unknown collection: {name}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DataServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::UnknownCollection(_) => None,
        }
    }
}

impl From<RepoError> for DataServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Storage mode of one collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStatus {
    pub type_name: String,
    pub mode: StoreMode,
}

/// Storage overview for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageStatus {
    pub collections: Vec<CollectionStatus>,
    pub backup_medium: BackupMedium,
    pub deployment: DeploymentMode,
}

/// Explicit application context over the record store.
pub struct DataService {
    collections: Arc<CollectionSet>,
    backups: Arc<BackupStore>,
    scheduler: AutoBackup,
    deployment: DeploymentMode,
}

impl DataService {
    /// Opens collections and the backup directory described by `config`.
    ///
    /// Never fails: unusable directories degrade to in-memory storage.
    pub fn open(config: &CoreConfig) -> Self {
        let collections = Arc::new(CollectionSet::open(
            &config.data_dir,
            config.collections.iter().cloned(),
        ));
        let backups = Arc::new(BackupStore::open(&config.backup_dir, config.backup_retain));
        let job = backup_job(Arc::clone(&collections), Arc::clone(&backups));
        let scheduler = AutoBackup::new(
            job,
            config.backup_interval,
            config.deployment.allows_scheduler(),
        );

        info!(
            "event=data_service_open module=service status=ok collections={} backup_medium={:?} deployment={:?}",
            collections.len(),
            backups.medium(),
            config.deployment
        );

        Self {
            collections,
            backups,
            scheduler,
            deployment: config.deployment,
        }
    }

    pub fn collection(&self, type_name: &str) -> DataResult<&Collection> {
        self.collections
            .get(type_name)
            .ok_or_else(|| DataServiceError::UnknownCollection(type_name.to_string()))
    }

    pub fn list(&self, type_name: &str) -> DataResult<Vec<Entity>> {
        Ok(self.collection(type_name)?.list()?)
    }

    pub fn get(&self, type_name: &str, id: &str) -> DataResult<Entity> {
        Ok(self.collection(type_name)?.get(id)?)
    }

    pub fn put(&self, type_name: &str, id: &str, entity: Entity) -> DataResult<Entity> {
        Ok(self.collection(type_name)?.put(id, entity)?)
    }

    /// Shallow-merges `patch` into an existing record.
    pub fn update(&self, type_name: &str, id: &str, patch: &Entity) -> DataResult<Entity> {
        Ok(self.collection(type_name)?.merge(id, patch)?)
    }

    pub fn remove(&self, type_name: &str, id: &str) -> DataResult<()> {
        Ok(self.collection(type_name)?.remove(id)?)
    }

    pub fn create_backup(&self) -> BackupResult<BackupReceipt> {
        self.backups.create(&self.collections)
    }

    pub fn restore_backup(&self, filename: &str) -> Result<RestoreReport, RestoreError> {
        RestoreEngine::new(&self.backups, &self.collections).restore(filename)
    }

    /// Applies an uncompressed JSON snapshot from an arbitrary path.
    pub fn import_snapshot(&self, path: &Path) -> Result<RestoreReport, RestoreError> {
        RestoreEngine::new(&self.backups, &self.collections).import_file(path)
    }

    pub fn list_backups(&self) -> BackupResult<Vec<BackupEntry>> {
        self.backups.list()
    }

    pub fn delete_backup(&self, filename: &str) -> BackupResult<()> {
        self.backups.delete(filename)
    }

    /// Returns the on-disk path of a catalog file, for download.
    pub fn open_backup(&self, filename: &str) -> BackupResult<PathBuf> {
        self.backups.open_file(filename).map(|(_, path)| path)
    }

    /// Writes a human-readable export; exports are never rotated.
    pub fn export_snapshot(&self) -> BackupResult<BackupReceipt> {
        self.backups.export(&self.collections)
    }

    pub fn start_auto_backup(&self) -> AutoBackupStatus {
        self.scheduler.start();
        self.scheduler.status()
    }

    /// Takes one backup immediately, then arms the timer.
    pub fn start_auto_backup_with_initial(&self) -> AutoBackupStatus {
        if self.scheduler.is_enabled() {
            run_backup(&self.collections, &self.backups, "initial");
        }
        self.start_auto_backup()
    }

    pub fn stop_auto_backup(&self) -> AutoBackupStatus {
        self.scheduler.stop();
        self.scheduler.status()
    }

    pub fn set_auto_backup_interval(&self, interval: Duration) -> AutoBackupStatus {
        self.scheduler.set_interval(interval);
        self.scheduler.status()
    }

    pub fn auto_backup_status(&self) -> AutoBackupStatus {
        self.scheduler.status()
    }

    pub fn storage_status(&self) -> StorageStatus {
        StorageStatus {
            collections: self
                .collections
                .iter()
                .map(|collection| CollectionStatus {
                    type_name: collection.type_name().to_string(),
                    mode: collection.mode(),
                })
                .collect(),
            backup_medium: self.backups.medium(),
            deployment: self.deployment,
        }
    }
}

fn backup_job(collections: Arc<CollectionSet>, backups: Arc<BackupStore>) -> ScheduledJob {
    Arc::new(move || run_backup(&collections, &backups, "scheduled"))
}

fn run_backup(collections: &CollectionSet, backups: &BackupStore, trigger: &str) {
    match backups.create(collections) {
        Ok(receipt) => info!(
            "event=auto_backup module=service status=ok trigger={} file={}",
            trigger, receipt.filename
        ),
        Err(err) => error!(
            "event=auto_backup module=service status=error trigger={} error={}",
            trigger, err
        ),
    }
}
