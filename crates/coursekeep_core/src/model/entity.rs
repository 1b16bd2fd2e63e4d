//! Entity domain model.
//!
//! # Responsibility
//! - Define the generic record persisted by every collection.
//! - Validate entity ids before they are turned into file names.
//!
//! # Invariants
//! - Field order of an entity is preserved from input to output.
//! - A persisted entity carries a non-empty string `id`.
//! - Ids never contain path separators, `..`, or NUL.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Field name that carries the entity identity.
pub const ID_FIELD: &str = "id";

/// One persisted record: an ordered JSON object.
///
/// Only `id` is structurally known to core. Every other field belongs to the
/// calling layer (course title, material path, note body, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(Map<String, Value>);

/// Rejection reason for an entity id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidIdError {
    pub id: String,
    pub reason: &'static str,
}

impl Display for InvalidIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid entity id `{}`: {}", self.id, self.reason)
    }
}

impl Error for InvalidIdError {}

impl Entity {
    /// Creates an empty entity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts any JSON value into an entity.
    ///
    /// Returns `None` when `value` is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Returns the `id` field when it is a non-empty string.
    pub fn id(&self) -> Option<&str> {
        match self.0.get(ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => Some(id.as_str()),
            _ => None,
        }
    }

    /// Sets the `id` field, keeping its position when already present.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.0.insert(ID_FIELD.to_string(), Value::String(id.into()));
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Shallow-merges `patch` over this entity.
    ///
    /// Later keys win; the existing `id` is never overwritten.
    pub fn merge(&mut self, patch: &Entity) {
        for (key, value) in &patch.0 {
            if key == ID_FIELD && self.id().is_some() {
                continue;
            }
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for Entity {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

/// Checks that `id` can safely name a file inside a collection directory.
pub fn validate_id(id: &str) -> Result<(), InvalidIdError> {
    let reject = |reason| {
        Err(InvalidIdError {
            id: id.to_string(),
            reason,
        })
    };

    if id.trim().is_empty() {
        return reject("id cannot be empty");
    }
    if id == "." || id == ".." || id.contains("..") {
        return reject("id cannot contain `..`");
    }
    if id.contains(['/', '\\', '\0']) {
        return reject("id cannot contain path separators or NUL");
    }
    Ok(())
}

/// Mints a fresh entity id of the form `<prefix>_<32 hex chars>`.
pub fn new_entity_id(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::new_v4().simple())
}
