//! Interactive session state: tabs, view/edit mode, detail panel, query.
//!
//! # Responsibility
//! - Hold view-only state next to the mutation engine.
//! - Sequence every mutation as update → persist → re-render so no caller
//!   ever observes a half-applied model.
//! - Queue user-facing notices (warnings, import errors) for the host.
//!
//! # Invariants
//! - Switching modes never touches model data; only the panel changes.
//! - The active view is always rebuilt from the model after a change, with
//!   the current query reapplied.
//! - Handlers take node ids, never references into the tree.

use crate::model::node::{Branch, NodeId, Spouse, Tree};
use crate::render::{render_branch_with, BranchView, Disclosure};
use crate::repo::snapshot_repo::SnapshotRepository;
use crate::search::highlight;
use crate::search::names::{resolve_link, LinkTarget, NameIndex};
use crate::service::tree_service::{
    DeleteOutcome, ImportSummary, LoadOrigin, Mutation, NodeEdit, TreeService,
    TreeServiceError, TreeServiceResult,
};
use log::info;

/// Message shown when a branch root deletion is rejected.
pub const ROOT_DELETE_WARNING: &str = "The root of a branch cannot be deleted.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    View,
    Edit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-facing message queued for the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Branch tab button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub branch_id: String,
    pub label: String,
    pub active: bool,
}

/// Read-only node details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeCard {
    pub node_id: NodeId,
    pub title: String,
    pub people: Vec<String>,
    pub spouses: Vec<Spouse>,
    pub notes: Option<String>,
    /// Display titles of child nodes.
    pub children: Vec<String>,
    pub link: Option<String>,
}

/// Editable form bound to one node id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditForm {
    pub node_id: NodeId,
    pub label: String,
    pub notes: String,
    /// People joined with `", "`.
    pub people: String,
}

impl EditForm {
    pub fn to_edit(&self) -> NodeEdit {
        NodeEdit {
            label: self.label.clone(),
            notes: self.notes.clone(),
            people: self.people.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Panel {
    Empty,
    Card(NodeCard),
    Edit(EditForm),
}

/// One interactive editing session over a snapshot repository.
pub struct Session<R: SnapshotRepository> {
    service: TreeService<R>,
    active: usize,
    mode: Mode,
    query: String,
    disclosure: Disclosure,
    selected: Option<NodeId>,
    panel: Panel,
    view: Option<BranchView>,
    notices: Vec<Notice>,
}

impl<R: SnapshotRepository> Session<R> {
    pub fn new(repo: R) -> Self {
        Self {
            service: TreeService::new(repo),
            active: 0,
            mode: Mode::View,
            query: String::new(),
            disclosure: Disclosure::default(),
            selected: None,
            panel: Panel::Empty,
            view: None,
            notices: Vec::new(),
        }
    }

    /// Loads the tree (snapshot first) and renders the first branch.
    pub fn load<F>(&mut self, fetch: F) -> TreeServiceResult<LoadOrigin>
    where
        F: FnOnce() -> std::io::Result<String>,
    {
        let origin = self.service.load(fetch)?;
        self.active = 0;
        self.disclosure.clear();
        self.close_panel();
        self.rerender();
        Ok(origin)
    }

    pub fn service(&self) -> &TreeService<R> {
        &self.service
    }

    pub fn tree(&self) -> &Tree {
        self.service.tree()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    pub fn view(&self) -> Option<&BranchView> {
        self.view.as_ref()
    }

    pub fn active_branch(&self) -> Option<&Branch> {
        self.tree().branches.get(self.active)
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.tree()
            .branches
            .iter()
            .enumerate()
            .map(|(idx, branch)| Tab {
                branch_id: branch.id.clone(),
                label: branch.tab_label(),
                active: idx == self.active,
            })
            .collect()
    }

    /// Switches the active tab. Unknown ids are ignored.
    pub fn select_branch(&mut self, branch_id: &str) -> bool {
        let Some(idx) = self
            .tree()
            .branches
            .iter()
            .position(|branch| branch.id == branch_id)
        else {
            return false;
        };
        self.active = idx;
        self.rerender();
        true
    }

    /// Flips between view and edit mode, reopening the selected node's panel.
    pub fn toggle_mode(&mut self) -> Mode {
        self.mode = match self.mode {
            Mode::View => Mode::Edit,
            Mode::Edit => Mode::View,
        };
        self.refresh_panel();
        self.mode
    }

    /// Handles a click on a name token.
    pub fn click_person(&mut self, node_id: &str) -> bool {
        self.show_card_by_node_id(node_id)
    }

    /// Opens the panel for the first node listing `name`.
    pub fn show_card(&mut self, name: &str) -> bool {
        let names = NameIndex::build(self.tree());
        match names.primary(name).map(|hit| hit.node_id.clone()) {
            Some(node_id) => self.show_card_by_node_id(&node_id),
            None => false,
        }
    }

    /// Opens the panel for `node_id`; read-only in view mode, a form in
    /// edit mode. Stale ids leave the panel unchanged.
    pub fn show_card_by_node_id(&mut self, node_id: &str) -> bool {
        if self.service.find_by_id(node_id).is_none() {
            return false;
        }
        self.selected = Some(node_id.to_string());
        self.refresh_panel();
        true
    }

    pub fn close_panel(&mut self) {
        self.selected = None;
        self.panel = Panel::Empty;
    }

    /// Updates the live query and returns the number of highlighted tokens.
    pub fn set_query(&mut self, query: &str) -> usize {
        self.query = query.to_string();
        self.view
            .as_mut()
            .map_or(0, |view| highlight::apply(view, query))
    }

    pub fn clear_query(&mut self) {
        self.set_query("");
    }

    /// Expands or collapses one node. Returns the new state.
    pub fn toggle_node(&mut self, node_id: &str) -> Option<bool> {
        let depth = self.service.index().location(node_id)?.depth();
        let open = self.disclosure.toggle(node_id, depth);
        self.rerender();
        Some(open)
    }

    /// Expands or collapses every node of the active branch.
    pub fn set_all_open(&mut self, open: bool) {
        let Some(branch) = self.active_branch() else {
            return;
        };
        let mut ids = Vec::new();
        branch.root.walk(&mut |node, _| ids.push(node.id.clone()));
        for id in ids {
            self.disclosure.set_open(id, open);
        }
        self.rerender();
    }

    /// Navigates to the anchor named by `href`, expanding the path to it.
    pub fn follow_link(&mut self, href: &str) -> Option<LinkTarget> {
        let target = resolve_link(self.tree(), href)?;
        for id in self.service.index().ancestry(&target.node_id) {
            self.disclosure.set_open(id, true);
        }
        if let Some(idx) = self
            .tree()
            .branches
            .iter()
            .position(|branch| branch.id == target.branch_id)
        {
            self.active = idx;
        }
        self.rerender();
        info!(
            "event=link_follow module=session status=ok branch_id={} node_id={}",
            target.branch_id, target.node_id
        );
        Some(target)
    }

    /// Applies an edit form to its bound node.
    pub fn submit_edit(&mut self, form: &EditForm) -> TreeServiceResult<Mutation> {
        let result = self.service.edit_node(&form.node_id, form.to_edit());
        self.settle(result)
    }

    /// Adds a placeholder child and opens it in edit mode.
    pub fn add_child(&mut self, parent_id: &str) -> TreeServiceResult<Mutation<NodeId>> {
        let result = self.service.add_child(parent_id);
        let outcome = self.settle(result)?;
        if let Mutation::Applied(child_id) = &outcome {
            self.disclosure.set_open(parent_id, true);
            if self.mode == Mode::Edit {
                self.selected = Some(child_id.clone());
            }
            self.refresh_panel();
            self.rerender();
        }
        Ok(outcome)
    }

    /// Adds a spouse from a prompt result. `None` means the prompt was
    /// cancelled.
    pub fn add_spouse(
        &mut self,
        node_id: &str,
        name: Option<&str>,
    ) -> TreeServiceResult<Mutation> {
        let Some(name) = name else {
            return Ok(Mutation::NoOp);
        };
        let result = self.service.add_spouse(node_id, name);
        self.settle(result)
    }

    /// Deletes every non-root node with this id. Naming a branch root queues
    /// a warning even when removing the other matches fails to persist.
    pub fn delete_node(&mut self, node_id: &str) -> TreeServiceResult<DeleteOutcome> {
        if self.service.tree().is_branch_root(node_id) {
            self.notify(NoticeLevel::Warning, ROOT_DELETE_WARNING);
        }
        let result = self.service.delete_node(node_id);
        self.settle(result)
    }

    /// Replaces the tree from imported JSON. Malformed input is reported as
    /// an error notice and leaves everything untouched.
    pub fn import_json(&mut self, text: &str) -> TreeServiceResult<ImportSummary> {
        let summary = match self.service.import_json(text) {
            Ok(summary) => summary,
            Err(err) => {
                self.notify(NoticeLevel::Error, format!("Import failed: {err}"));
                return Err(err);
            }
        };
        self.active = 0;
        self.disclosure.clear();
        self.close_panel();
        self.rerender();
        self.notify(
            NoticeLevel::Info,
            format!(
                "Imported {} branch(es) with {} node(s).",
                summary.branches, summary.nodes
            ),
        );
        Ok(summary)
    }

    pub fn export_json(&self) -> TreeServiceResult<String> {
        self.service.export_json()
    }

    /// Drops local changes and reloads from the source document.
    pub fn reset<F>(&mut self, fetch: F) -> TreeServiceResult<ImportSummary>
    where
        F: FnOnce() -> std::io::Result<String>,
    {
        let result = self.service.reset(fetch);
        let summary = self.settle(result)?;
        self.active = 0;
        self.disclosure.clear();
        self.close_panel();
        self.rerender();
        Ok(summary)
    }

    /// Drains queued notices.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    /// Finishes a service call: reports failures, else refreshes panel and
    /// view from the updated model.
    fn settle<T>(&mut self, result: TreeServiceResult<T>) -> TreeServiceResult<T> {
        match result {
            Ok(value) => {
                self.refresh_panel();
                self.rerender();
                Ok(value)
            }
            Err(err) => {
                self.report(&err);
                Err(err)
            }
        }
    }

    fn report(&mut self, err: &TreeServiceError) {
        self.notify(NoticeLevel::Error, err.to_string());
    }

    fn refresh_panel(&mut self) {
        let Some(node_id) = self.selected.clone() else {
            self.panel = Panel::Empty;
            return;
        };
        let Some(node) = self.service.find_by_id(&node_id) else {
            self.close_panel();
            return;
        };
        self.panel = match self.mode {
            Mode::View => Panel::Card(NodeCard {
                node_id: node.id.clone(),
                title: node.display_title(),
                people: node.people.clone(),
                spouses: node.spouses.clone(),
                notes: node.notes.clone(),
                children: node.children.iter().map(|c| c.display_title()).collect(),
                link: node.link.clone(),
            }),
            Mode::Edit => Panel::Edit(EditForm {
                node_id: node.id.clone(),
                label: node.label.clone().unwrap_or_default(),
                notes: node.notes.clone().unwrap_or_default(),
                people: node.people.join(", "),
            }),
        };
    }

    fn rerender(&mut self) {
        if self.active >= self.tree().branches.len() {
            self.active = 0;
        }
        let mut view = self
            .tree()
            .branches
            .get(self.active)
            .map(|branch| render_branch_with(branch, &self.disclosure));
        if let Some(view) = view.as_mut() {
            highlight::apply(view, &self.query);
        }
        self.view = view;
    }
}
