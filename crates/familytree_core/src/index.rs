//! Flat id index over the owned node graph.
//!
//! # Responsibility
//! - Map every node id to its location so lookups avoid full traversal.
//! - Resolve locations back to shared or mutable node references.
//!
//! # Invariants
//! - The index is rebuilt after every structural change (load, import,
//!   add child, delete). Field edits do not invalidate it.
//! - For duplicated ids the first occurrence in depth-first order wins.

use crate::model::node::{Node, NodeId, Tree};
use std::collections::HashMap;

/// Location of one node inside the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLocation {
    /// Index into `Tree::branches`.
    pub branch: usize,
    /// Child indices from the branch root. Empty for the root itself.
    pub path: Vec<usize>,
    /// Parent node id. `None` for branch roots.
    pub parent: Option<NodeId>,
}

impl NodeLocation {
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

/// id → location map for one tree snapshot.
#[derive(Debug, Clone, Default)]
pub struct NodeIndex {
    locations: HashMap<NodeId, NodeLocation>,
    duplicates: Vec<NodeId>,
}

impl NodeIndex {
    /// Builds the index with one depth-first pass.
    pub fn build(tree: &Tree) -> Self {
        let mut index = Self::default();
        for (branch_idx, branch) in tree.branches.iter().enumerate() {
            let mut path = Vec::new();
            index.insert_subtree(branch_idx, &branch.root, None, &mut path);
        }
        index
    }

    fn insert_subtree(
        &mut self,
        branch: usize,
        node: &Node,
        parent: Option<&NodeId>,
        path: &mut Vec<usize>,
    ) {
        if !node.id.is_empty() {
            if self.locations.contains_key(&node.id) {
                self.duplicates.push(node.id.clone());
            } else {
                self.locations.insert(
                    node.id.clone(),
                    NodeLocation {
                        branch,
                        path: path.clone(),
                        parent: parent.cloned(),
                    },
                );
            }
        }
        for (child_idx, child) in node.children.iter().enumerate() {
            path.push(child_idx);
            self.insert_subtree(branch, child, Some(&node.id), path);
            path.pop();
        }
    }

    pub fn location(&self, id: &str) -> Option<&NodeLocation> {
        self.locations.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.locations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Ids seen more than once while building.
    pub fn duplicates(&self) -> &[NodeId] {
        &self.duplicates
    }

    /// Resolves `id` to a shared node reference.
    pub fn resolve<'t>(&self, tree: &'t Tree, id: &str) -> Option<&'t Node> {
        let location = self.location(id)?;
        let mut node = &tree.branches.get(location.branch)?.root;
        for &step in &location.path {
            node = node.children.get(step)?;
        }
        Some(node)
    }

    /// Resolves `id` to a mutable node reference.
    pub fn resolve_mut<'t>(&self, tree: &'t mut Tree, id: &str) -> Option<&'t mut Node> {
        let location = self.location(id)?;
        let mut node = &mut tree.branches.get_mut(location.branch)?.root;
        for &step in &location.path {
            node = node.children.get_mut(step)?;
        }
        Some(node)
    }

    /// Ids of `id` and all of its ancestors, root first.
    pub fn ancestry(&self, id: &str) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = self.location(id).map(|_| id.to_string());
        while let Some(current) = cursor {
            cursor = self
                .location(&current)
                .and_then(|location| location.parent.clone());
            chain.push(current);
            if chain.len() > self.locations.len() {
                break;
            }
        }
        chain.reverse();
        chain
    }
}
