//! Family tree domain model.
//!
//! # Responsibility
//! - Define the recursive node graph shared by service, render and search.
//! - Keep JSON shape compatible with the source document format.
//!
//! # Invariants
//! - Every node is identified by a stable `NodeId`, unique across the tree.
//! - `children` is the only ownership edge; `link`/`anchor` are advisory.
//!
//! # See also
//! - `crate::index` for flat id resolution.

pub mod document;
pub mod ids;
pub mod node;
