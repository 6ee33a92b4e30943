//! Core domain logic for the family tree viewer/editor.
//! This crate is the single source of truth for tree invariants.

pub mod config;
pub mod db;
pub mod index;
pub mod logging;
pub mod model;
pub mod render;
pub mod repo;
pub mod search;
pub mod service;
pub mod session;

pub use config::{AppConfig, ConfigError};
pub use index::{NodeIndex, NodeLocation};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::{parse_document, DocumentError};
pub use model::ids::IdGenerator;
pub use model::node::{Branch, Node, NodeId, Spouse, Tree};
pub use render::{render_branch, render_branch_with, BranchView, Disclosure, NodeView, PersonToken};
pub use repo::snapshot_repo::{
    MemorySnapshotRepository, SnapshotRepoError, SnapshotRepository, SqliteSnapshotRepository,
};
pub use search::directory::{PersonCard, PersonDirectory};
pub use search::names::{resolve_link, LinkTarget, NameIndex};
pub use service::tree_service::{
    DeleteOutcome, ImportSummary, LoadOrigin, Mutation, NodeEdit, TreeService, TreeServiceError,
};
pub use session::{EditForm, Mode, NodeCard, Notice, NoticeLevel, Panel, Session, Tab};

/// Bundled sample document used when no source path is configured.
pub const SAMPLE_DOCUMENT: &str = include_str!("../data/sample_tree.json");

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
