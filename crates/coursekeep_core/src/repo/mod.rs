//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record CRUD contract shared by every storage adapter.
//! - Isolate file layout details from service/backup orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `InvalidId`) in
//!   addition to storage transport errors.
//! - Callers go through `Collection`, which owns the fallback policy.

pub mod collection;
pub mod file_repo;
pub mod memory_repo;
pub mod record_repo;
