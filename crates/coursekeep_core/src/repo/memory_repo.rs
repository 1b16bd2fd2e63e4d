//! In-memory record repository.
//!
//! Backs a collection with an ordered entity sequence mutated in place. Used
//! when the filesystem cannot hold the collection; contents are lost on exit.

use crate::model::entity::{validate_id, Entity};
use crate::repo::record_repo::{prepare_for_put, RecordRepository, RepoError, RepoResult};

/// Ordered in-process entity sequence.
#[derive(Debug, Default)]
pub struct MemoryRecordRepository {
    entities: Vec<Entity>,
}

impl MemoryRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from `entities`, with the same id rules as `replace_all`.
    pub fn seeded(entities: Vec<Entity>) -> Self {
        let mut repo = Self::new();
        repo.load(entities);
        repo
    }

    fn load(&mut self, entities: Vec<Entity>) {
        self.entities.clear();
        for entity in entities {
            let Some(id) = entity.id().map(str::to_string) else {
                continue;
            };
            if validate_id(&id).is_err() {
                continue;
            }
            // Same id twice: last write wins, like the on-disk layout.
            match self.position(&id) {
                Some(index) => self.entities[index] = entity,
                None => self.entities.push(entity),
            }
        }
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.entities.iter().position(|entity| entity.id() == Some(id))
    }
}

impl RecordRepository for MemoryRecordRepository {
    fn list(&self) -> RepoResult<Vec<Entity>> {
        Ok(self.entities.clone())
    }

    fn get(&self, id: &str) -> RepoResult<Entity> {
        validate_id(id)?;
        self.position(id)
            .map(|index| self.entities[index].clone())
            .ok_or_else(|| RepoError::NotFound(id.to_string()))
    }

    fn put(&mut self, id: &str, entity: Entity) -> RepoResult<Entity> {
        let entity = prepare_for_put(id, entity)?;
        match self.position(id) {
            Some(index) => self.entities[index] = entity.clone(),
            None => self.entities.push(entity.clone()),
        }
        Ok(entity)
    }

    fn remove(&mut self, id: &str) -> RepoResult<()> {
        validate_id(id)?;
        let index = self
            .position(id)
            .ok_or_else(|| RepoError::NotFound(id.to_string()))?;
        self.entities.remove(index);
        Ok(())
    }

    fn replace_all(&mut self, entities: Vec<Entity>) -> RepoResult<usize> {
        self.load(entities);
        Ok(self.entities.len())
    }
}
