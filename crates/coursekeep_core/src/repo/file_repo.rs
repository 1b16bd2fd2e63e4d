//! Directory-backed record repository.
//!
//! # Responsibility
//! - Persist one collection as one pretty-printed JSON file per entity.
//! - Keep path construction and file I/O inside this adapter.
//!
//! # Invariants
//! - Entity `id` maps to `<dir>/<id>.json`; ids are validated first.
//! - Each file write lands through a temp file + rename, so a reader never
//!   observes a half-written entity.
//! - Malformed entity files are skipped by `list` and reported by `get`.

use crate::model::entity::{validate_id, Entity};
use crate::repo::record_repo::{prepare_for_put, RecordRepository, RepoError, RepoResult};
use log::{debug, warn};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const RECORD_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = ".tmp";

/// One JSON file per entity inside a collection directory.
#[derive(Debug, Clone)]
pub struct FileRecordRepository {
    dir: PathBuf,
}

impl FileRecordRepository {
    /// Opens (creating if needed) the collection directory.
    ///
    /// # Errors
    /// - Returns `RepoError::Io` when the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> RepoResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{RECORD_EXTENSION}"))
    }

    fn record_files(&self) -> RepoResult<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                // Directory vanished underneath us; recreate it as empty.
                fs::create_dir_all(&self.dir)?;
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && is_record_file(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn write_record(&self, id: &str, entity: &Entity) -> RepoResult<()> {
        let body = serde_json::to_string_pretty(entity)?;
        let path = self.record_path(id);
        let temp = self.dir.join(format!("{id}.{RECORD_EXTENSION}{TEMP_SUFFIX}"));
        let written = fs::write(&temp, body).and_then(|()| fs::rename(&temp, &path));
        if let Err(err) = written {
            let _ = fs::remove_file(&temp);
            return Err(err.into());
        }
        Ok(())
    }

    /// Reads every record that is still readable, skipping the rest.
    ///
    /// Used to carry on-disk contents into the memory fallback after a fault;
    /// a record whose file lacks an `id` takes it from the file name.
    pub fn salvage(&self) -> Vec<Entity> {
        let files = match self.record_files() {
            Ok(files) => files,
            Err(err) => {
                warn!(
                    "event=record_salvage module=repo status=error dir={} error={}",
                    self.dir.display(),
                    err
                );
                return Vec::new();
            }
        };

        let mut entities = Vec::new();
        for path in files {
            let parsed = fs::read_to_string(&path)
                .map_err(RepoError::from)
                .and_then(|body| parse_entity(&body));
            let mut entity = match parsed {
                Ok(entity) => entity,
                Err(err) => {
                    warn!(
                        "event=record_salvage module=repo status=skipped path={} error={}",
                        path.display(),
                        err
                    );
                    continue;
                }
            };
            if entity.id().is_none() {
                if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                    entity.set_id(stem);
                }
            }
            entities.push(entity);
        }
        entities
    }
}

impl RecordRepository for FileRecordRepository {
    fn list(&self) -> RepoResult<Vec<Entity>> {
        let mut entities = Vec::new();
        for path in self.record_files()? {
            let body = match fs::read_to_string(&path) {
                Ok(body) => body,
                // Removed between enumeration and read.
                Err(err) if err.kind() == ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            match parse_entity(&body) {
                Ok(entity) => entities.push(entity),
                Err(err) => warn!(
                    "event=record_skip module=repo status=skipped path={} error={}",
                    path.display(),
                    err
                ),
            }
        }
        Ok(entities)
    }

    fn get(&self, id: &str) -> RepoResult<Entity> {
        validate_id(id)?;
        let body = match fs::read_to_string(self.record_path(id)) {
            Ok(body) => body,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(RepoError::NotFound(id.to_string()))
            }
            Err(err) => return Err(err.into()),
        };
        parse_entity(&body)
    }

    fn put(&mut self, id: &str, entity: Entity) -> RepoResult<Entity> {
        let entity = prepare_for_put(id, entity)?;
        fs::create_dir_all(&self.dir)?;
        self.write_record(id, &entity)?;
        Ok(entity)
    }

    fn remove(&mut self, id: &str) -> RepoResult<()> {
        validate_id(id)?;
        match fs::remove_file(self.record_path(id)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(RepoError::NotFound(id.to_string())),
            Err(err) => Err(err.into()),
        }
    }

    fn replace_all(&mut self, entities: Vec<Entity>) -> RepoResult<usize> {
        for path in self.record_files()? {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => return Err(err.into()),
            }
        }

        let mut written = 0;
        for entity in entities {
            let Some(id) = entity.id().map(str::to_string) else {
                debug!("event=record_drop module=repo status=skipped reason=missing_id");
                continue;
            };
            if let Err(err) = validate_id(&id) {
                warn!("event=record_drop module=repo status=skipped reason=invalid_id error={err}");
                continue;
            }
            match self.write_record(&id, &entity) {
                Ok(()) => written += 1,
                Err(err) => warn!(
                    "event=record_write module=repo status=error dir={} id={} error={}",
                    self.dir.display(),
                    id,
                    err
                ),
            }
        }
        Ok(written)
    }
}

fn is_record_file(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(RECORD_EXTENSION)
}

fn parse_entity(body: &str) -> RepoResult<Entity> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|err| RepoError::InvalidData(err.to_string()))?;
    Entity::from_value(value)
        .ok_or_else(|| RepoError::InvalidData("record file is not a JSON object".to_string()))
}
