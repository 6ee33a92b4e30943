//! Repository layer for snapshot persistence.
//!
//! # Responsibility
//! - Define the key-value contract the mutation engine persists through.
//! - Isolate SQLite query details from service orchestration.

pub mod snapshot_repo;
