//! Fallback-aware collection store.
//!
//! # Responsibility
//! - Front one entity-type collection with a stable CRUD API.
//! - Own the transition from on-disk storage to the in-memory fallback.
//!
//! # Invariants
//! - Mode starts `OnDisk` only when the type directory could be created.
//! - The `OnDisk -> InMemory` transition is one-way and logged exactly once.
//! - A storage fault during an operation flips the mode and retries that
//!   operation against memory; semantic errors (`NotFound`, invalid id,
//!   malformed record) never flip the mode.
//! - The memory store that replaces a faulted disk store starts with every
//!   record that could still be read from disk.

use crate::model::entity::Entity;
use crate::model::snapshot::Snapshot;
use crate::repo::file_repo::FileRecordRepository;
use crate::repo::memory_repo::MemoryRecordRepository;
use crate::repo::record_repo::{RecordRepository, RepoError, RepoResult};
use log::{info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Current backing medium of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreMode {
    /// One JSON file per entity inside the type directory.
    OnDisk,
    /// Process-local sequence; not durable.
    InMemory,
}

enum Backend {
    OnDisk(FileRecordRepository),
    InMemory(MemoryRecordRepository),
}

/// One named collection (`courses`, `materials`, `notes`, ...).
pub struct Collection {
    type_name: String,
    dir: PathBuf,
    backend: Mutex<Backend>,
}

impl Collection {
    /// Opens the collection under `data_dir/<type_name>`.
    ///
    /// Never fails: an unusable directory selects the in-memory fallback.
    pub fn open(data_dir: &Path, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let dir = data_dir.join(&type_name);
        let backend = match FileRecordRepository::open(&dir) {
            Ok(repo) => {
                info!(
                    "event=store_open module=repo status=ok type={} mode=on_disk dir={}",
                    type_name,
                    dir.display()
                );
                Backend::OnDisk(repo)
            }
            Err(err) => {
                warn!(
                    "event=store_fallback module=repo status=degraded type={} dir={} trigger=open error={}",
                    type_name,
                    dir.display(),
                    err
                );
                Backend::InMemory(MemoryRecordRepository::new())
            }
        };

        Self {
            type_name,
            dir,
            backend: Mutex::new(backend),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn mode(&self) -> StoreMode {
        match &*self.backend.lock() {
            Backend::OnDisk(_) => StoreMode::OnDisk,
            Backend::InMemory(_) => StoreMode::InMemory,
        }
    }

    pub fn list(&self) -> RepoResult<Vec<Entity>> {
        self.with_repo("list", |repo| repo.list())
    }

    pub fn get(&self, id: &str) -> RepoResult<Entity> {
        self.with_repo("get", |repo| repo.get(id))
    }

    /// Writes or overwrites the entity stored under `id`.
    ///
    /// Returns the entity as persisted (with `id` filled in).
    pub fn put(&self, id: &str, entity: Entity) -> RepoResult<Entity> {
        self.with_repo("put", |repo| repo.put(id, entity.clone()))
    }

    pub fn remove(&self, id: &str) -> RepoResult<()> {
        self.with_repo("remove", |repo| repo.remove(id))
    }

    /// Shallow-merges `patch` into the stored entity and writes it back.
    ///
    /// # Errors
    /// - `RepoError::NotFound` when no entity is stored under `id`.
    pub fn merge(&self, id: &str, patch: &Entity) -> RepoResult<Entity> {
        self.with_repo("merge", |repo| {
            let mut current = repo.get(id)?;
            current.merge(patch);
            repo.put(id, current)
        })
    }

    /// Replaces every entity of this collection; entities without `id` are dropped.
    pub fn replace_all(&self, entities: Vec<Entity>) -> RepoResult<usize> {
        self.with_repo("replace_all", |repo| repo.replace_all(entities.clone()))
    }

    fn with_repo<T>(
        &self,
        operation: &'static str,
        mut run: impl FnMut(&mut dyn RecordRepository) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let mut backend = self.backend.lock();
        let salvaged = match &mut *backend {
            Backend::InMemory(repo) => return run(repo),
            Backend::OnDisk(repo) => match run(&mut *repo) {
                Err(RepoError::Io(fault)) => {
                    warn!(
                        "event=store_fallback module=repo status=degraded type={} dir={} trigger={} error={}",
                        self.type_name,
                        self.dir.display(),
                        operation,
                        fault
                    );
                    repo.salvage()
                }
                other => return other,
            },
        };

        info!(
            "event=store_fallback module=repo status=seeded type={} records={}",
            self.type_name,
            salvaged.len()
        );
        let mut memory = MemoryRecordRepository::seeded(salvaged);
        let retried = run(&mut memory);
        *backend = Backend::InMemory(memory);
        retried
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("type_name", &self.type_name)
            .field("dir", &self.dir)
            .field("mode", &self.mode())
            .finish()
    }
}

/// Registry of every collection the application serves, keyed by type name.
#[derive(Debug, Default)]
pub struct CollectionSet {
    collections: BTreeMap<String, Collection>,
}

impl CollectionSet {
    /// Opens one collection per type name under `data_dir`.
    pub fn open<I, S>(data_dir: &Path, type_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set = Self::default();
        for type_name in type_names {
            set.insert(Collection::open(data_dir, type_name));
        }
        set
    }

    pub fn insert(&mut self, collection: Collection) {
        self.collections
            .insert(collection.type_name().to_string(), collection);
    }

    pub fn get(&self, type_name: &str) -> Option<&Collection> {
        self.collections.get(type_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    pub fn len(&self) -> usize {
        self.collections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }

    /// Whether any collection has degraded to memory.
    pub fn any_in_memory(&self) -> bool {
        self.iter()
            .any(|collection| collection.mode() == StoreMode::InMemory)
    }

    /// Reads every collection into one aggregate.
    ///
    /// Collections are read one after another without a shared lock, so a
    /// concurrent write may land between two reads.
    pub fn snapshot(&self) -> RepoResult<Snapshot> {
        let mut snapshot = Snapshot::new();
        for collection in self.iter() {
            snapshot.insert(collection.type_name(), collection.list()?);
        }
        Ok(snapshot)
    }
}
