//! Node, branch and tree records.
//!
//! # Responsibility
//! - Define the owned recursive structure for one family tree.
//! - Provide ownership-only traversals (links are never followed).
//!
//! # Invariants
//! - Traversal order is depth-first, children in array order. The same order
//!   drives rendering and id assignment.
//! - An empty `id` means "not assigned yet"; [`Tree::assign_ids`] fills it.

use crate::model::ids::IdGenerator;
use serde::{Deserialize, Serialize};

/// Stable node identifier.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NodeId = String;

/// Spouse entry attached to a node. Spouses are not separate tree nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spouse {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Spouse {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            notes: None,
        }
    }
}

/// One tree vertex: a couple/individual plus their descendants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Stable id. Empty until assigned.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: NodeId,
    /// Explicit display label. Falls back to `people` when absent or empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Person names represented at this node, e.g. a sibling set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub people: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub spouses: Vec<Spouse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    /// Cross-branch navigation shortcut. Never an ownership edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    /// Landing marker other branches may link to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchor: Option<String>,
}

impl Node {
    /// Creates a node with the given id and person list.
    pub fn with_people<I, S>(id: impl Into<NodeId>, people: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            people: people.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Returns the label when set and non-empty, else people joined by `" & "`.
    pub fn display_title(&self) -> String {
        match self.label.as_deref() {
            Some(label) if !label.is_empty() => label.to_string(),
            _ => self.people.join(" & "),
        }
    }

    /// Visits this node and every owned descendant, depth-first.
    ///
    /// The callback receives the node and its depth relative to `self`.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node, usize)) {
        self.walk_at(0, f);
    }

    fn walk_at<'a>(&'a self, depth: usize, f: &mut impl FnMut(&'a Node, usize)) {
        f(self, depth);
        for child in &self.children {
            child.walk_at(depth + 1, f);
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_, _| count += 1);
        count
    }

    /// Height of this subtree. A leaf has depth 0.
    pub fn depth(&self) -> usize {
        let mut max = 0;
        self.walk(&mut |_, depth| max = max.max(depth));
        max
    }

    /// Ids of every owned descendant, excluding `self`, in traversal order.
    pub fn descendant_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.walk(&mut |node, depth| {
            if depth > 0 {
                ids.push(node.id.clone());
            }
        });
        ids
    }

    /// Finds a node by id within this subtree.
    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Removes every child matching `id` at every depth below `self`.
    ///
    /// Returns the number of removed subtrees. `self` is never removed.
    pub(crate) fn remove_descendants(&mut self, id: &str) -> usize {
        let before = self.children.len();
        self.children.retain(|child| child.id != id);
        let mut removed = before - self.children.len();
        for child in &mut self.children {
            removed += child.remove_descendants(id);
        }
        removed
    }

    fn assign_ids(&mut self, ids: &mut IdGenerator) -> usize {
        let mut assigned = 0;
        if self.id.is_empty() {
            self.id = ids.next_id();
            assigned += 1;
        }
        for child in &mut self.children {
            assigned += child.assign_ids(ids);
        }
        assigned
    }
}

/// Named top-level subtree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub title: String,
    pub root: Node,
}

impl Branch {
    pub fn new(id: impl Into<String>, title: impl Into<String>, root: Node) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            root,
        }
    }

    /// Tab caption: branch id with its first character upper-cased.
    pub fn tab_label(&self) -> String {
        let mut chars = self.id.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Ordered sequence of branches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub branches: Vec<Branch>,
}

impl Tree {
    pub fn new(branches: Vec<Branch>) -> Self {
        Self { branches }
    }

    /// Finds a node by id through full traversal of every branch.
    pub fn find_by_id(&self, id: &str) -> Option<&Node> {
        if id.is_empty() {
            return None;
        }
        self.branches.iter().find_map(|branch| branch.root.find(id))
    }

    /// Fills every missing id with a freshly minted one.
    ///
    /// Existing ids are never touched, so running this on already-assigned
    /// data is a no-op. Returns the number of ids assigned.
    pub fn assign_ids(&mut self, ids: &mut IdGenerator) -> usize {
        self.branches
            .iter_mut()
            .map(|branch| branch.root.assign_ids(ids))
            .sum()
    }

    /// Visits every node of every branch, depth-first.
    ///
    /// The callback receives the owning branch, the node and its depth.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Branch, &'a Node, usize)) {
        for branch in &self.branches {
            branch.root.walk(&mut |node, depth| f(branch, node, depth));
        }
    }

    /// Whether `id` is the root of any branch.
    pub fn is_branch_root(&self, id: &str) -> bool {
        self.branches.iter().any(|branch| branch.root.id == id)
    }

    pub fn branch(&self, id: &str) -> Option<&Branch> {
        self.branches.iter().find(|branch| branch.id == id)
    }

    /// Total number of nodes across all branches.
    pub fn node_count(&self) -> usize {
        self.branches
            .iter()
            .map(|branch| branch.root.subtree_size())
            .sum()
    }
}
