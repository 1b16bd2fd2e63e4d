//! Backup, export and restore of the full record set.
//!
//! # Responsibility
//! - Own the backup directory and its catalog of snapshot files.
//! - Replace live collections from a chosen snapshot.
//!
//! # Invariants
//! - A snapshot file is never modified after it is written.
//! - Restore decodes and validates the whole snapshot before touching any
//!   collection.

use crate::repo::record_repo::RepoError;
use crate::snapshot::CodecError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

pub mod restore;
pub mod store;

pub use restore::{RestoreEngine, RestoreError, RestoreReport};
pub use store::{
    BackupEntry, BackupKind, BackupMedium, BackupReceipt, BackupStore, DEFAULT_RETAIN,
};

pub type BackupResult<T> = Result<T, BackupError>;

/// Error for backup catalog operations.
#[derive(Debug)]
pub enum BackupError {
    /// No catalog file with this name.
    NotFound(String),
    /// Name is not a valid catalog file name.
    InvalidName(String),
    /// Backup directory could not be created; nothing is stored on disk.
    Unavailable,
    Io(io::Error),
    Codec(CodecError),
    /// Reading a collection for the snapshot failed.
    Repo(RepoError),
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "backup file not found: {name}"),
            Self::InvalidName(name) => write!(f, "invalid backup file name: `{name}`"),
            Self::Unavailable => write!(f, "backup storage is unavailable"),
            Self::Io(err) => write!(f, "backup storage error: {err}"),
            Self::Codec(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::NotFound(_) | Self::InvalidName(_) | Self::Unavailable => None,
        }
    }
}

impl From<io::Error> for BackupError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<CodecError> for BackupError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

impl From<RepoError> for BackupError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}
