//! Snapshot aggregate model.
//!
//! A snapshot maps collection type names to the full entity sequence of that
//! collection at one instant. It is never mutated after creation.

use crate::model::entity::Entity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregate of all collections, keyed by type name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    collections: BTreeMap<String, Vec<Entity>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) one collection in the aggregate.
    pub fn insert(&mut self, type_name: impl Into<String>, entities: Vec<Entity>) {
        self.collections.insert(type_name.into(), entities);
    }

    /// Returns the entities recorded for `type_name`, if the snapshot has it.
    pub fn collection(&self, type_name: &str) -> Option<&[Entity]> {
        self.collections.get(type_name).map(Vec::as_slice)
    }

    /// Total entity count over every collection.
    pub fn entity_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    pub fn into_collections(self) -> BTreeMap<String, Vec<Entity>> {
        self.collections
    }
}
