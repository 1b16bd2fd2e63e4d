//! Restore of live collections from a snapshot.
//!
//! # Responsibility
//! - Load a catalog file (or an external import file) and decode it.
//! - Replace each collection named in the snapshot wholesale.
//!
//! # Invariants
//! - Nothing is written until the snapshot decoded successfully.
//! - Catalog restore needs durable storage on both sides: it is refused while
//!   the backup store or any collection runs in memory.
//! - Collections absent from the snapshot are left untouched.
//! - A failure in one collection is recorded and does not stop the others.

use crate::backup::store::{BackupKind, BackupMedium, BackupStore};
use crate::backup::BackupError;
use crate::model::snapshot::Snapshot;
use crate::repo::collection::CollectionSet;
use crate::snapshot::codec;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use std::time::Instant;

/// Error for restore/import operations.
#[derive(Debug)]
pub enum RestoreError {
    NotFound(String),
    InvalidName(String),
    CorruptSnapshot(String),
    /// Restore is not possible in the current storage mode.
    Unavailable(&'static str),
    Io(io::Error),
}

impl Display for RestoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "snapshot not found: {name}"),
            Self::InvalidName(name) => write!(f, "invalid snapshot name: `{name}`"),
            Self::CorruptSnapshot(details) => write!(f, "corrupt snapshot: {details}"),
            Self::Unavailable(reason) => write!(f, "restore unavailable: {reason}"),
            Self::Io(err) => write!(f, "restore storage error: {err}"),
        }
    }
}

impl Error for RestoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BackupError> for RestoreError {
    fn from(value: BackupError) -> Self {
        match value {
            BackupError::NotFound(name) => Self::NotFound(name),
            BackupError::InvalidName(name) => Self::InvalidName(name),
            BackupError::Unavailable => Self::Unavailable("backup storage is unavailable"),
            BackupError::Io(err) => Self::Io(err),
            BackupError::Codec(err) => Self::CorruptSnapshot(err.to_string()),
            BackupError::Repo(err) => Self::Io(io::Error::other(err.to_string())),
        }
    }
}

/// Per-collection outcome of a restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoredCollection {
    pub type_name: String,
    pub written: usize,
}

/// Summary of an applied snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub restored: Vec<RestoredCollection>,
    /// Types in the snapshot with no matching collection.
    pub unknown_types: Vec<String>,
    /// Collections whose replacement failed, with the error text.
    pub failed: Vec<(String, String)>,
}

impl RestoreReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Applies snapshots to a collection set.
pub struct RestoreEngine<'a> {
    backups: &'a BackupStore,
    collections: &'a CollectionSet,
}

impl<'a> RestoreEngine<'a> {
    pub fn new(backups: &'a BackupStore, collections: &'a CollectionSet) -> Self {
        Self {
            backups,
            collections,
        }
    }

    /// Restores from a catalog file (compressed backup or plain export).
    pub fn restore(&self, name: &str) -> Result<RestoreReport, RestoreError> {
        if self.backups.medium() == BackupMedium::Unavailable {
            return Err(RestoreError::Unavailable(
                "backup storage is in memory fallback; no durable snapshot to restore",
            ));
        }
        if self.collections.any_in_memory() {
            return Err(RestoreError::Unavailable(
                "record storage is in memory fallback; restored data would not be durable",
            ));
        }

        let started_at = Instant::now();
        let (kind, bytes) = self.backups.read(name)?;
        let decoded = match kind {
            BackupKind::Snapshot => codec::decode(&bytes),
            BackupKind::Export => codec::decode_plain(&bytes),
        };
        let snapshot = decoded.map_err(|err| {
            error!("event=restore module=backup status=error file={name} error={err}");
            RestoreError::CorruptSnapshot(err.to_string())
        })?;

        let report = self.apply(name, snapshot);
        info!(
            "event=restore module=backup status={} file={} collections={} duration_ms={}",
            if report.is_complete() { "ok" } else { "partial" },
            name,
            report.restored.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }

    /// Imports an uncompressed JSON snapshot from an arbitrary path.
    pub fn import_file(&self, path: &Path) -> Result<RestoreReport, RestoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(RestoreError::NotFound(path.display().to_string()))
            }
            Err(err) => return Err(RestoreError::Io(err)),
        };
        let snapshot = codec::decode_plain(&bytes)
            .map_err(|err| RestoreError::CorruptSnapshot(err.to_string()))?;

        let source = path.display().to_string();
        let report = self.apply(&source, snapshot);
        info!(
            "event=import module=backup status={} path={} collections={}",
            if report.is_complete() { "ok" } else { "partial" },
            source,
            report.restored.len()
        );
        Ok(report)
    }

    /// Replaces every collection present in `snapshot`.
    pub fn apply(&self, source: &str, snapshot: Snapshot) -> RestoreReport {
        let mut report = RestoreReport {
            source: source.to_string(),
            timestamp: Utc::now(),
            restored: Vec::new(),
            unknown_types: Vec::new(),
            failed: Vec::new(),
        };

        for (type_name, entities) in snapshot.into_collections() {
            let Some(collection) = self.collections.get(&type_name) else {
                warn!("event=restore module=backup status=skipped reason=unknown_type type={type_name}");
                report.unknown_types.push(type_name);
                continue;
            };
            match collection.replace_all(entities) {
                Ok(written) => report.restored.push(RestoredCollection { type_name, written }),
                Err(err) => {
                    error!("event=restore module=backup status=error type={type_name} error={err}");
                    report.failed.push((type_name, err.to_string()));
                }
            }
        }
        report
    }
}
