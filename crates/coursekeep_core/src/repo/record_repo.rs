//! Record repository contract shared by on-disk and in-memory adapters.
//!
//! # Responsibility
//! - Define whole-entity CRUD over one collection.
//! - Provide the semantic error type used by every adapter.
//!
//! # Invariants
//! - `get` and `remove` report absence as `RepoError::NotFound`, never as I/O.
//! - `put` stores the entity under `id` and the entity's own `id` field agrees.
//! - `replace_all` drops entities without an `id` instead of failing.

use crate::model::entity::{validate_id, Entity, InvalidIdError};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence.
#[derive(Debug)]
pub enum RepoError {
    NotFound(String),
    InvalidId(InvalidIdError),
    IdMismatch { key: String, field: String },
    Io(io::Error),
    Serialization(serde_json::Error),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::InvalidId(err) => write!(f, "{err}"),
            Self::IdMismatch { key, field } => {
                write!(f, "record key `{key}` does not match its id field `{field}`")
            }
            Self::Io(err) => write!(f, "record storage error: {err}"),
            Self::Serialization(err) => write!(f, "record serialization error: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted record: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidId(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::NotFound(_) | Self::IdMismatch { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<InvalidIdError> for RepoError {
    fn from(value: InvalidIdError) -> Self {
        Self::InvalidId(value)
    }
}

impl From<io::Error> for RepoError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// Repository interface for one entity-type collection.
pub trait RecordRepository {
    /// Returns every readable entity. Order is unspecified.
    fn list(&self) -> RepoResult<Vec<Entity>>;
    fn get(&self, id: &str) -> RepoResult<Entity>;
    /// Writes or overwrites the entity stored under `id`.
    fn put(&mut self, id: &str, entity: Entity) -> RepoResult<Entity>;
    fn remove(&mut self, id: &str) -> RepoResult<()>;
    /// Replaces the whole collection. Returns the number of entities written.
    fn replace_all(&mut self, entities: Vec<Entity>) -> RepoResult<usize>;
}

/// Validates `id` and reconciles it with the entity's own `id` field.
///
/// Inserts the key as `id` when the entity has none.
pub fn prepare_for_put(id: &str, mut entity: Entity) -> RepoResult<Entity> {
    validate_id(id)?;
    match entity.id() {
        Some(field) if field != id => Err(RepoError::IdMismatch {
            key: id.to_string(),
            field: field.to_string(),
        }),
        Some(_) => Ok(entity),
        None => {
            entity.set_id(id);
            Ok(entity)
        }
    }
}
