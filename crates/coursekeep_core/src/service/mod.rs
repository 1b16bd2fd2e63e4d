//! Core use-case services.
//!
//! # Responsibility
//! - Wire collections, backup storage and scheduling into one context.
//! - Keep transport layers (HTTP, CLI) decoupled from storage details.

pub mod data_service;
