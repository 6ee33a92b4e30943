//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate model edits and snapshot persistence.
//! - Keep UI/FFI layers decoupled from storage details.

pub mod tree_service;
