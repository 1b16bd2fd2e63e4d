//! Domain model for teaching-content records and snapshots.
//!
//! # Responsibility
//! - Define the generic entity shape shared by courses, materials and notes.
//! - Define the aggregate snapshot used by backup and restore.
//!
//! # Invariants
//! - Every persisted entity is identified by a unique string `id` within its
//!   collection.
//! - Core never interprets fields other than `id`.

pub mod entity;
pub mod snapshot;
