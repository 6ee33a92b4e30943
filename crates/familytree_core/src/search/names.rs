//! Name lookups and cross-branch link resolution.

use crate::model::node::{NodeId, Tree};
use crate::render::TokenRole;
use std::collections::HashMap;

/// One place a name occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameHit {
    pub node_id: NodeId,
    pub branch_id: String,
    pub role: TokenRole,
}

/// Lowercase name → occurrences, in traversal order.
#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    hits: HashMap<String, Vec<NameHit>>,
}

impl NameIndex {
    pub fn build(tree: &Tree) -> Self {
        let mut index = Self::default();
        tree.walk(&mut |branch, node, _| {
            for name in &node.people {
                index.push(name, &node.id, &branch.id, TokenRole::Person);
            }
            for spouse in &node.spouses {
                index.push(&spouse.name, &node.id, &branch.id, TokenRole::Spouse);
            }
        });
        index
    }

    fn push(&mut self, name: &str, node_id: &str, branch_id: &str, role: TokenRole) {
        let key = name.trim().to_lowercase();
        if key.is_empty() {
            return;
        }
        self.hits.entry(key).or_default().push(NameHit {
            node_id: node_id.to_string(),
            branch_id: branch_id.to_string(),
            role,
        });
    }

    /// All occurrences of `name`, case-insensitively.
    pub fn lookup(&self, name: &str) -> &[NameHit] {
        self.hits
            .get(&name.trim().to_lowercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Preferred node for `name`: the first node listing it as a person,
    /// else the first node listing it as a spouse.
    pub fn primary(&self, name: &str) -> Option<&NameHit> {
        let hits = self.lookup(name);
        hits.iter()
            .find(|hit| hit.role == TokenRole::Person)
            .or_else(|| hits.first())
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// Node a cross-branch link lands on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTarget {
    pub branch_id: String,
    pub node_id: NodeId,
    pub anchor: String,
}

/// Resolves `href` against node anchors.
///
/// The fragment after the last `#` is used when present, otherwise the whole
/// value. Resolution only reads `anchor` fields; it never walks links.
pub fn resolve_link(tree: &Tree, href: &str) -> Option<LinkTarget> {
    let anchor = href.rsplit_once('#').map_or(href, |(_, fragment)| fragment);
    let anchor = anchor.trim();
    if anchor.is_empty() {
        return None;
    }

    let mut found = None;
    tree.walk(&mut |branch, node, _| {
        if found.is_none() && node.anchor.as_deref() == Some(anchor) {
            found = Some(LinkTarget {
                branch_id: branch.id.clone(),
                node_id: node.id.clone(),
                anchor: anchor.to_string(),
            });
        }
    });
    found
}
