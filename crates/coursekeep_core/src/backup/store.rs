//! Backup catalog and snapshot file lifecycle.
//!
//! # Responsibility
//! - Write compressed snapshots (`backup_<ts>.json.gz`) and plain exports
//!   (`export_<ts>.json`) into the backup directory.
//! - List, open, delete and rotate catalog files.
//!
//! # Invariants
//! - Catalog order is modification time descending, ties broken by file name
//!   descending (names embed a sortable UTC timestamp).
//! - Only `backup_*` files are rotated; exports are kept until deleted.
//! - Catalog names are validated before they touch the filesystem.
//! - When the backup directory is unusable the store is `Unavailable`:
//!   writes report a synthetic name and nothing touches disk.

use crate::backup::{BackupError, BackupResult};
use crate::model::snapshot::Snapshot;
use crate::repo::collection::CollectionSet;
use crate::snapshot::codec;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::PathBuf;
use std::time::Instant;

/// Snapshots kept after each successful backup unless configured otherwise.
pub const DEFAULT_RETAIN: usize = 10;

const BACKUP_PREFIX: &str = "backup";
const EXPORT_PREFIX: &str = "export";
const MEMORY_PREFIX: &str = "memory_backup";
const BACKUP_EXTENSION: &str = "json.gz";
const EXPORT_EXTENSION: &str = "json";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";
const MAX_NAME_ATTEMPTS: u32 = 100;

static BACKUP_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^backup_\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}-\d{3}Z(_\d{2})?\.json\.gz$")
        .expect("valid backup name regex")
});
static EXPORT_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^export_\d{4}-\d{2}-\d{2}T\d{2}-\d{2}-\d{2}-\d{3}Z(_\d{2})?\.json$")
        .expect("valid export name regex")
});

/// Encoding of a catalog file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    /// Gzip-compressed snapshot, subject to rotation.
    Snapshot,
    /// Pretty-printed JSON snapshot, never rotated.
    Export,
}

impl BackupKind {
    /// Classifies a file name; `None` for names outside the catalog.
    pub fn from_file_name(name: &str) -> Option<Self> {
        if BACKUP_NAME_RE.is_match(name) {
            Some(Self::Snapshot)
        } else if EXPORT_NAME_RE.is_match(name) {
            Some(Self::Export)
        } else {
            None
        }
    }

    fn prefix(self) -> &'static str {
        match self {
            Self::Snapshot => BACKUP_PREFIX,
            Self::Export => EXPORT_PREFIX,
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Snapshot => BACKUP_EXTENSION,
            Self::Export => EXPORT_EXTENSION,
        }
    }
}

/// Whether the backup directory is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupMedium {
    OnDisk,
    Unavailable,
}

/// Derived catalog row for one file in the backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    pub name: String,
    pub kind: BackupKind,
    pub modified: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Outcome of a successful backup or export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupReceipt {
    pub filename: String,
    /// `None` when the medium is unavailable and nothing was written.
    pub path: Option<PathBuf>,
    pub timestamp: DateTime<Utc>,
    pub kind: BackupKind,
    pub entity_count: usize,
    /// Rotated snapshot files removed after this backup.
    pub pruned: usize,
}

/// Owner of the backup directory.
#[derive(Debug)]
pub struct BackupStore {
    dir: PathBuf,
    retain: usize,
    medium: BackupMedium,
}

impl BackupStore {
    /// Opens (creating if needed) the backup directory.
    ///
    /// Never fails: an unusable directory yields an `Unavailable` store.
    pub fn open(dir: impl Into<PathBuf>, retain: usize) -> Self {
        let dir = dir.into();
        let medium = match fs::create_dir_all(&dir) {
            Ok(()) => BackupMedium::OnDisk,
            Err(err) => {
                warn!(
                    "event=backup_fallback module=backup status=degraded dir={} error={}",
                    dir.display(),
                    err
                );
                BackupMedium::Unavailable
            }
        };

        Self {
            dir,
            retain: retain.max(1),
            medium,
        }
    }

    pub fn medium(&self) -> BackupMedium {
        self.medium
    }

    /// Snapshots every collection, writes a compressed backup, then rotates.
    pub fn create(&self, collections: &CollectionSet) -> BackupResult<BackupReceipt> {
        let started_at = Instant::now();
        let snapshot = collections.snapshot().map_err(|err| {
            error!("event=backup_create module=backup status=error stage=snapshot error={err}");
            BackupError::Repo(err)
        })?;

        match self.write_snapshot(&snapshot) {
            Ok(receipt) => {
                info!(
                    "event=backup_create module=backup status=ok file={} entities={} pruned={} duration_ms={}",
                    receipt.filename,
                    receipt.entity_count,
                    receipt.pruned,
                    started_at.elapsed().as_millis()
                );
                Ok(receipt)
            }
            Err(err) => {
                error!(
                    "event=backup_create module=backup status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Writes one compressed snapshot and applies retention.
    pub fn write_snapshot(&self, snapshot: &Snapshot) -> BackupResult<BackupReceipt> {
        let bytes = codec::encode(snapshot)?;
        let mut receipt = self.write_catalog_file(BackupKind::Snapshot, &bytes, snapshot)?;
        if receipt.path.is_some() {
            receipt.pruned = self.prune(self.retain);
        }
        Ok(receipt)
    }

    /// Writes an uncompressed, human-readable export. Exports are never rotated.
    pub fn export(&self, collections: &CollectionSet) -> BackupResult<BackupReceipt> {
        let snapshot = collections.snapshot()?;
        let bytes = codec::encode_plain(&snapshot)?;
        let receipt = self.write_catalog_file(BackupKind::Export, &bytes, &snapshot)?;
        info!(
            "event=backup_export module=backup status=ok file={} entities={}",
            receipt.filename, receipt.entity_count
        );
        Ok(receipt)
    }

    /// Lists catalog files, most recent first.
    pub fn list(&self) -> BackupResult<Vec<BackupEntry>> {
        if self.medium == BackupMedium::Unavailable {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            let Some(name) = dir_entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some(kind) = BackupKind::from_file_name(&name) else {
                continue;
            };
            let metadata = match dir_entry.metadata() {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            let modified = metadata.modified()?;
            entries.push(BackupEntry {
                name,
                kind,
                modified: DateTime::<Utc>::from(modified),
                size_bytes: metadata.len(),
            });
        }

        entries.sort_by(|a, b| {
            b.modified
                .cmp(&a.modified)
                .then_with(|| b.name.cmp(&a.name))
        });
        Ok(entries)
    }

    /// Returns the path of an existing catalog file.
    pub fn open_file(&self, name: &str) -> BackupResult<(BackupKind, PathBuf)> {
        let kind = validate_name(name)?;
        if self.medium == BackupMedium::Unavailable {
            return Err(BackupError::Unavailable);
        }
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(BackupError::NotFound(name.to_string()));
        }
        Ok((kind, path))
    }

    /// Reads the raw bytes of a catalog file.
    pub fn read(&self, name: &str) -> BackupResult<(BackupKind, Vec<u8>)> {
        let (kind, path) = self.open_file(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok((kind, bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(BackupError::NotFound(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn delete(&self, name: &str) -> BackupResult<()> {
        validate_name(name)?;
        if self.medium == BackupMedium::Unavailable {
            return Err(BackupError::NotFound(name.to_string()));
        }
        match fs::remove_file(self.dir.join(name)) {
            Ok(()) => {
                info!("event=backup_delete module=backup status=ok file={name}");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(BackupError::NotFound(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes every snapshot beyond the `retain` most recent.
    ///
    /// Best-effort: failures are logged and skipped. Returns the number removed.
    pub fn prune(&self, retain: usize) -> usize {
        match self.list() {
            Ok(entries) => self.prune_listed(&entries, retain),
            Err(err) => {
                warn!("event=backup_prune module=backup status=error stage=list error={err}");
                0
            }
        }
    }

    fn prune_listed(&self, entries: &[BackupEntry], retain: usize) -> usize {
        let mut removed = 0;
        for stale in entries
            .iter()
            .filter(|entry| entry.kind == BackupKind::Snapshot)
            .skip(retain)
        {
            match fs::remove_file(self.dir.join(&stale.name)) {
                Ok(()) => removed += 1,
                Err(err) => warn!(
                    "event=backup_prune module=backup status=error file={} error={}",
                    stale.name, err
                ),
            }
        }
        removed
    }

    fn write_catalog_file(
        &self,
        kind: BackupKind,
        bytes: &[u8],
        snapshot: &Snapshot,
    ) -> BackupResult<BackupReceipt> {
        let timestamp = Utc::now();
        let token = timestamp.format(TIMESTAMP_FORMAT).to_string();

        if self.medium == BackupMedium::Unavailable {
            let filename = format!("{MEMORY_PREFIX}_{token}.{}", kind.extension());
            info!(
                "event=backup_write module=backup status=skipped reason=medium_unavailable file={filename}"
            );
            return Ok(BackupReceipt {
                filename,
                path: None,
                timestamp,
                kind,
                entity_count: snapshot.entity_count(),
                pruned: 0,
            });
        }

        let (filename, path) = self.write_unique(kind, &token, bytes)?;
        Ok(BackupReceipt {
            filename,
            path: Some(path),
            timestamp,
            kind,
            entity_count: snapshot.entity_count(),
            pruned: 0,
        })
    }

    fn write_unique(&self, kind: BackupKind, token: &str, bytes: &[u8]) -> BackupResult<(String, PathBuf)> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let filename = if attempt == 0 {
                format!("{}_{token}.{}", kind.prefix(), kind.extension())
            } else {
                format!("{}_{token}_{attempt:02}.{}", kind.prefix(), kind.extension())
            };
            let path = self.dir.join(&filename);
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(err.into()),
            };
            if let Err(err) = file.write_all(bytes).and_then(|()| file.sync_all()) {
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(err.into());
            }
            return Ok((filename, path));
        }

        Err(BackupError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free catalog name for timestamp {token}"),
        )))
    }
}

/// Checks that `name` is a plain catalog file name.
pub fn validate_name(name: &str) -> BackupResult<BackupKind> {
    BackupKind::from_file_name(name).ok_or_else(|| BackupError::InvalidName(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{validate_name, BackupKind, BackupStore};
    use crate::backup::BackupError;
    use crate::repo::collection::CollectionSet;
    use std::fs;

    #[test]
    fn file_names_are_classified_by_pattern() {
        assert_eq!(
            BackupKind::from_file_name("backup_2024-05-01T10-20-30-123Z.json.gz"),
            Some(BackupKind::Snapshot)
        );
        assert_eq!(
            BackupKind::from_file_name("backup_2024-05-01T10-20-30-123Z_01.json.gz"),
            Some(BackupKind::Snapshot)
        );
        assert_eq!(
            BackupKind::from_file_name("export_2024-05-01T10-20-30-123Z.json"),
            Some(BackupKind::Export)
        );
        assert_eq!(BackupKind::from_file_name("export_2024-05-01T10-20-30-123Z.json.gz"), None);
        assert_eq!(BackupKind::from_file_name("notes.txt"), None);
    }

    #[test]
    fn validate_name_rejects_traversal() {
        let err = validate_name("../backup_2024-05-01T10-20-30-123Z.json.gz").expect_err("traversal name");
        assert!(matches!(err, BackupError::InvalidName(_)));
    }

    #[test]
    fn collision_suffix_sorts_after_plain_name() {
        let plain = "backup_2024-05-01T10-20-30-123Z.json.gz";
        let suffixed = "backup_2024-05-01T10-20-30-123Z_01.json.gz";
        assert!(suffixed > plain);
    }

    #[test]
    fn prune_skips_files_it_cannot_delete() {
        let root = tempfile::tempdir().expect("temp dir");
        let collections = CollectionSet::open(&root.path().join("data"), ["courses"]);
        let backup_dir = root.path().join("backups");
        let store = BackupStore::open(&backup_dir, 10);
        for _ in 0..3 {
            store.create(&collections).expect("backup should be written");
        }
        let entries = store.list().expect("catalog should list");
        assert_eq!(entries.len(), 3);

        // A directory under the oldest name cannot be removed with remove_file.
        let blocked = backup_dir.join(&entries[2].name);
        fs::remove_file(&blocked).expect("oldest backup should exist");
        fs::create_dir(&blocked).expect("blocking directory");

        assert_eq!(store.prune_listed(&entries, 1), 1);
        assert!(blocked.is_dir());
        let remaining: Vec<String> = store
            .list()
            .expect("catalog should list after prune")
            .into_iter()
            .map(|entry| entry.name)
            .collect();
        assert_eq!(remaining, vec![entries[0].name.clone()]);
    }
}
