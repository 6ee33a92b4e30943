//! Family tree mutation engine.
//!
//! # Responsibility
//! - Own the authoritative tree together with its id index and id counter.
//! - Apply structural and field edits, then persist the full snapshot.
//! - Load from the source document or from a persisted snapshot.
//!
//! # Invariants
//! - Every operation is atomic: the model is fully updated before it is
//!   persisted, and a failed write restores the previous model in memory
//!   and in the store.
//! - Snapshot and id counter are written together through `put_all`.
//! - Unresolvable ids are silent no-ops; no-ops never persist.
//! - Branch roots are never removed.

use crate::index::NodeIndex;
use crate::model::document::{parse_document, to_compact_json, to_pretty_json, DocumentError};
use crate::model::ids::IdGenerator;
use crate::model::node::{Node, NodeId, Spouse, Tree};
use crate::repo::snapshot_repo::{
    SnapshotRepoError, SnapshotRepository, ID_COUNTER_KEY, SNAPSHOT_KEY,
};
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Label and person name given to freshly added children.
pub const NEW_PERSON_PLACEHOLDER: &str = "New Person";

/// Errors from tree service operations.
#[derive(Debug)]
pub enum TreeServiceError {
    /// Snapshot read/write failure.
    Repo(SnapshotRepoError),
    /// Source, snapshot or import document could not be parsed or written.
    Document(DocumentError),
    /// Source document could not be fetched.
    Source(std::io::Error),
}

impl Display for TreeServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Repo(err) => write!(f, "{err}"),
            Self::Document(err) => write!(f, "{err}"),
            Self::Source(err) => write!(f, "failed to fetch source document: {err}"),
        }
    }
}

impl Error for TreeServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Document(err) => Some(err),
            Self::Source(err) => Some(err),
        }
    }
}

impl From<SnapshotRepoError> for TreeServiceError {
    fn from(value: SnapshotRepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<DocumentError> for TreeServiceError {
    fn from(value: DocumentError) -> Self {
        Self::Document(value)
    }
}

/// Result type for tree service operations.
pub type TreeServiceResult<T> = Result<T, TreeServiceError>;

/// Outcome of a mutation that may resolve to nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<T = ()> {
    /// Model changed and was persisted.
    Applied(T),
    /// Target did not resolve or input was blank; nothing changed.
    NoOp,
}

impl<T> Mutation<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Self::Applied(value) => Some(value),
            Self::NoOp => None,
        }
    }
}

/// Editable form fields for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeEdit {
    /// Stored as given; an empty label falls back to the people list.
    pub label: String,
    /// Blank notes are stored as absent.
    pub notes: String,
    /// Comma-separated free text.
    pub people: String,
}

/// Result of [`TreeService::delete_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Number of subtrees spliced out.
    pub removed: usize,
    /// The id named a branch root, which was kept.
    pub rejected_root: bool,
}

/// Where [`TreeService::load`] took the tree from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    Snapshot,
    Source,
}

/// Summary of an import or reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub branches: usize,
    pub nodes: usize,
    /// Ids minted for nodes that arrived without one.
    pub assigned_ids: usize,
}

#[derive(Debug, Clone, Default)]
struct TreeState {
    tree: Tree,
    index: NodeIndex,
    ids: IdGenerator,
}

/// Mutation engine facade over a snapshot repository.
pub struct TreeService<R: SnapshotRepository> {
    repo: R,
    state: TreeState,
}

impl<R: SnapshotRepository> TreeService<R> {
    /// Creates service with an empty tree. Call [`Self::load`] next.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            state: TreeState::default(),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.state.tree
    }

    pub fn index(&self) -> &NodeIndex {
        &self.state.index
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Resolves a node through the flat index.
    pub fn find_by_id(&self, id: &str) -> Option<&Node> {
        self.state.index.resolve(&self.state.tree, id)
    }

    /// Loads the tree, preferring a persisted snapshot over `fetch`.
    ///
    /// `fetch` is only invoked when no usable snapshot exists. If loading from
    /// the source mints any ids, the result is persisted so those ids stay
    /// stable across reloads.
    pub fn load<F>(&mut self, fetch: F) -> TreeServiceResult<LoadOrigin>
    where
        F: FnOnce() -> std::io::Result<String>,
    {
        let counter = self.read_counter()?;
        self.state.ids = IdGenerator::seeded_from(&Tree::default(), counter);

        if let Some(snapshot) = self.repo.get(SNAPSHOT_KEY)? {
            match parse_document(&snapshot) {
                Ok(tree) => {
                    let summary = self.install(tree);
                    info!(
                        "event=tree_load module=service status=ok origin=snapshot branches={} nodes={}",
                        summary.branches, summary.nodes
                    );
                    if summary.assigned_ids > 0 {
                        self.persist()?;
                    }
                    return Ok(LoadOrigin::Snapshot);
                }
                Err(err) => warn!(
                    "event=tree_load module=service status=fallback origin=snapshot error={err}"
                ),
            }
        }

        let tree = self.fetch_source(fetch)?;
        let summary = self.install(tree);
        info!(
            "event=tree_load module=service status=ok origin=source branches={} nodes={} assigned_ids={}",
            summary.branches, summary.nodes, summary.assigned_ids
        );
        if summary.assigned_ids > 0 {
            self.persist()?;
        }
        Ok(LoadOrigin::Source)
    }

    /// Replaces the three editable fields of one node.
    pub fn edit_node(&mut self, id: &str, edit: NodeEdit) -> TreeServiceResult<Mutation> {
        if !self.state.index.contains(id) {
            debug!("event=node_edit module=service status=noop node_id={id}");
            return Ok(Mutation::NoOp);
        }

        let previous = self.state.clone();
        if let Some(node) = self.state.index.resolve_mut(&mut self.state.tree, id) {
            node.label = Some(edit.label);
            node.notes = normalize_notes(&edit.notes);
            node.people = parse_people(&edit.people);
        }
        self.commit(previous, "node_edit")?;
        info!("event=node_edit module=service status=ok node_id={id}");
        Ok(Mutation::Applied(()))
    }

    /// Appends a placeholder child under `parent_id` and returns its id.
    pub fn add_child(&mut self, parent_id: &str) -> TreeServiceResult<Mutation<NodeId>> {
        if !self.state.index.contains(parent_id) {
            debug!("event=node_add module=service status=noop parent_id={parent_id}");
            return Ok(Mutation::NoOp);
        }

        let previous = self.state.clone();
        let child_id = self.state.ids.next_id();
        if let Some(parent) = self.state.index.resolve_mut(&mut self.state.tree, parent_id) {
            parent.children.push(Node {
                id: child_id.clone(),
                label: Some(NEW_PERSON_PLACEHOLDER.to_string()),
                people: vec![NEW_PERSON_PLACEHOLDER.to_string()],
                ..Node::default()
            });
        }
        self.reindex();
        self.commit(previous, "node_add")?;
        info!(
            "event=node_add module=service status=ok node_id={child_id} parent_id={parent_id}"
        );
        Ok(Mutation::Applied(child_id))
    }

    /// Appends a spouse entry. Blank names are ignored.
    pub fn add_spouse(&mut self, node_id: &str, name: &str) -> TreeServiceResult<Mutation> {
        let name = name.trim();
        if name.is_empty() || !self.state.index.contains(node_id) {
            debug!("event=spouse_add module=service status=noop node_id={node_id}");
            return Ok(Mutation::NoOp);
        }

        let previous = self.state.clone();
        if let Some(node) = self.state.index.resolve_mut(&mut self.state.tree, node_id) {
            node.spouses.push(Spouse::new(name));
        }
        self.commit(previous, "spouse_add")?;
        info!("event=spouse_add module=service status=ok node_id={node_id}");
        Ok(Mutation::Applied(()))
    }

    /// Splices every child matching `id` out of every branch, at every depth.
    ///
    /// Branch roots are kept and reported through `rejected_root`; non-root
    /// matches are still removed in the same call.
    pub fn delete_node(&mut self, id: &str) -> TreeServiceResult<DeleteOutcome> {
        let rejected_root = self.state.tree.is_branch_root(id);
        if rejected_root {
            warn!("event=node_delete module=service status=rejected reason=branch_root node_id={id}");
        }

        let previous = self.state.clone();
        let removed = self
            .state
            .tree
            .branches
            .iter_mut()
            .map(|branch| branch.root.remove_descendants(id))
            .sum::<usize>();

        if removed == 0 {
            debug!("event=node_delete module=service status=noop node_id={id}");
            return Ok(DeleteOutcome {
                removed,
                rejected_root,
            });
        }

        self.reindex();
        self.commit(previous, "node_delete")?;
        info!("event=node_delete module=service status=ok node_id={id} removed={removed}");
        Ok(DeleteOutcome {
            removed,
            rejected_root,
        })
    }

    /// Serializes the current tree as indented JSON.
    pub fn export_json(&self) -> TreeServiceResult<String> {
        let json = to_pretty_json(&self.state.tree)?;
        info!(
            "event=tree_export module=service status=ok bytes={}",
            json.len()
        );
        Ok(json)
    }

    /// Replaces the tree wholesale with the parsed document.
    ///
    /// Malformed input leaves the current tree untouched.
    pub fn import_json(&mut self, text: &str) -> TreeServiceResult<ImportSummary> {
        let tree = match parse_document(text) {
            Ok(tree) => tree,
            Err(err) => {
                warn!("event=tree_import module=service status=rejected error={err}");
                return Err(err.into());
            }
        };

        let previous = self.state.clone();
        let summary = self.install(tree);
        self.commit(previous, "tree_import")?;
        info!(
            "event=tree_import module=service status=ok branches={} nodes={} assigned_ids={}",
            summary.branches, summary.nodes, summary.assigned_ids
        );
        Ok(summary)
    }

    /// Drops the persisted snapshot and reloads from the source document.
    ///
    /// The id counter is kept so ids minted before the reset are not
    /// reissued. A failed fetch leaves both model and snapshot untouched.
    pub fn reset<F>(&mut self, fetch: F) -> TreeServiceResult<ImportSummary>
    where
        F: FnOnce() -> std::io::Result<String>,
    {
        let tree = self.fetch_source(fetch)?;
        self.repo.remove(SNAPSHOT_KEY)?;

        let summary = self.install(tree);
        if summary.assigned_ids > 0 {
            self.persist()?;
        }
        info!(
            "event=tree_reset module=service status=ok branches={} nodes={}",
            summary.branches, summary.nodes
        );
        Ok(summary)
    }

    fn fetch_source<F>(&self, fetch: F) -> TreeServiceResult<Tree>
    where
        F: FnOnce() -> std::io::Result<String>,
    {
        let text = fetch().map_err(|err| {
            error!("event=source_fetch module=service status=error error={err}");
            TreeServiceError::Source(err)
        })?;
        parse_document(&text).map_err(Into::into)
    }

    fn install(&mut self, mut tree: Tree) -> ImportSummary {
        self.state.ids.observe(&tree);
        let assigned_ids = tree.assign_ids(&mut self.state.ids);
        self.state.tree = tree;
        self.reindex();
        ImportSummary {
            branches: self.state.tree.branches.len(),
            nodes: self.state.tree.node_count(),
            assigned_ids,
        }
    }

    fn reindex(&mut self) {
        self.state.index = NodeIndex::build(&self.state.tree);
        let duplicates = self.state.index.duplicates();
        if !duplicates.is_empty() {
            warn!(
                "event=tree_index module=service status=duplicate_ids ids={}",
                duplicates.join(",")
            );
        }
    }

    fn commit(&mut self, previous: TreeState, event: &str) -> TreeServiceResult<()> {
        if let Err(err) = self.persist() {
            error!("event={event} module=service status=error error_code=persist_failed error={err}");
            // A non-transactional backend may hold part of the write.
            if let Err(restore_err) = write_state(&self.repo, &previous) {
                error!(
                    "event={event} module=service status=error error_code=restore_failed error={restore_err}"
                );
            }
            self.state = previous;
            return Err(err);
        }
        Ok(())
    }

    fn persist(&self) -> TreeServiceResult<()> {
        let bytes = write_state(&self.repo, &self.state)?;
        debug!("event=snapshot_write module=service status=ok bytes={bytes}");
        Ok(())
    }

    fn read_counter(&self) -> TreeServiceResult<u64> {
        let Some(raw) = self.repo.get(ID_COUNTER_KEY)? else {
            return Ok(0);
        };
        Ok(raw.trim().parse::<u64>().unwrap_or_else(|_| {
            warn!("event=counter_read module=service status=invalid value={raw}");
            0
        }))
    }
}

/// Writes snapshot and id counter as one unit; returns the snapshot size.
fn write_state<R: SnapshotRepository>(repo: &R, state: &TreeState) -> TreeServiceResult<usize> {
    let snapshot = to_compact_json(&state.tree)?;
    let counter = state.ids.counter().to_string();
    repo.put_all(&[(SNAPSHOT_KEY, snapshot.as_str()), (ID_COUNTER_KEY, counter.as_str())])?;
    Ok(snapshot.len())
}

/// Splits comma-separated names, trimming and dropping empty entries.
pub fn parse_people(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Maps blank notes to `None`.
pub fn normalize_notes(input: &str) -> Option<String> {
    if input.trim().is_empty() {
        None
    } else {
        Some(input.to_string())
    }
}
