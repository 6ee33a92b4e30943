//! Navigation and search over the tree and its rendered views.
//!
//! # Responsibility
//! - Highlight name tokens matching a live query (view-only).
//! - Resolve names and cross-branch links to nodes.
//! - Provide the flat person directory with filtering and go-to.
//!
//! # Invariants
//! - Nothing in this module mutates the model.
//! - Names are soft links: they are matched at lookup time and renames are
//!   never migrated.

pub mod directory;
pub mod highlight;
pub mod names;
