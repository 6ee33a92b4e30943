//! Pure projection from model state to a view tree.
//!
//! # Responsibility
//! - Turn one branch into nested disclosure views with clickable name tokens.
//! - Keep the projection free of side effects so re-rendering is idempotent.
//!
//! # Invariants
//! - Rendering the same branch with the same disclosure state yields equal
//!   views.
//! - Nodes are open by default only at depth 0.
//! - Links are copied into the view as-is and never followed.

pub mod html;
pub mod text;

use crate::model::node::{Branch, Node, NodeId};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

static NON_ALNUM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[^a-z0-9]+").expect("valid slug regex"));

/// Caption shown for cross-branch links.
pub const LINK_CAPTION: &str = "\u{2197} cross-branch link";

/// Element id for the card/landing target of a person name.
pub fn element_id(name: &str) -> String {
    format!("card-{}", NON_ALNUM_RE.replace_all(name, "-"))
}

/// Whether a token names a person listed at the node or one of their spouses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenRole {
    Person,
    Spouse,
}

/// Clickable name token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonToken {
    pub name: String,
    /// Lowercased name used for search matching.
    pub search_key: String,
    /// Node whose card opens on click.
    pub node_id: NodeId,
    pub role: TokenRole,
    /// Element id of the person's card.
    pub target: String,
    pub highlighted: bool,
}

impl PersonToken {
    fn new(name: &str, node_id: &str, role: TokenRole) -> Self {
        Self {
            name: name.to_string(),
            search_key: name.to_lowercase(),
            node_id: node_id.to_string(),
            role,
            target: element_id(name),
            highlighted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpouseView {
    pub token: PersonToken,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkView {
    pub href: String,
    pub caption: String,
}

/// One disclosure widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeView {
    pub node_id: NodeId,
    pub title: String,
    pub notes: Option<String>,
    pub spouses: Vec<SpouseView>,
    pub people: Vec<PersonToken>,
    pub link: Option<LinkView>,
    pub anchor: Option<String>,
    pub children: Vec<NodeView>,
    pub depth: usize,
    pub open: bool,
}

impl NodeView {
    fn visit_tokens_mut(&mut self, f: &mut impl FnMut(&mut PersonToken)) {
        for spouse in &mut self.spouses {
            f(&mut spouse.token);
        }
        for person in &mut self.people {
            f(person);
        }
        for child in &mut self.children {
            child.visit_tokens_mut(f);
        }
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a PersonToken>) {
        out.extend(self.spouses.iter().map(|spouse| &spouse.token));
        out.extend(self.people.iter());
        for child in &self.children {
            child.collect_tokens(out);
        }
    }

    fn find(&self, id: &str) -> Option<&NodeView> {
        if self.node_id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

/// Rendered view of one branch tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchView {
    pub branch_id: String,
    pub heading: String,
    pub root: NodeView,
}

impl BranchView {
    /// Every name token in render order.
    pub fn tokens(&self) -> Vec<&PersonToken> {
        let mut out = Vec::new();
        self.root.collect_tokens(&mut out);
        out
    }

    pub fn visit_tokens_mut(&mut self, mut f: impl FnMut(&mut PersonToken)) {
        self.root.visit_tokens_mut(&mut f);
    }

    pub fn highlighted_count(&self) -> usize {
        self.tokens().iter().filter(|token| token.highlighted).count()
    }

    pub fn find_node(&self, id: &str) -> Option<&NodeView> {
        self.root.find(id)
    }
}

/// View-only expanded/collapsed overrides keyed by node id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Disclosure {
    overrides: HashMap<NodeId, bool>,
}

impl Disclosure {
    pub fn is_open(&self, id: &str, depth: usize) -> bool {
        self.overrides.get(id).copied().unwrap_or(depth < 1)
    }

    pub fn set_open(&mut self, id: impl Into<NodeId>, open: bool) {
        self.overrides.insert(id.into(), open);
    }

    /// Flips the node's state and returns the new one.
    pub fn toggle(&mut self, id: &str, depth: usize) -> bool {
        let open = !self.is_open(id, depth);
        self.set_open(id, open);
        open
    }

    pub fn clear(&mut self) {
        self.overrides.clear();
    }
}

/// Renders a branch with default disclosure state.
pub fn render_branch(branch: &Branch) -> BranchView {
    render_branch_with(branch, &Disclosure::default())
}

/// Renders a branch honoring per-node disclosure overrides.
pub fn render_branch_with(branch: &Branch, disclosure: &Disclosure) -> BranchView {
    BranchView {
        branch_id: branch.id.clone(),
        heading: branch.title.clone(),
        root: build_node(&branch.root, 0, disclosure),
    }
}

fn build_node(node: &Node, depth: usize, disclosure: &Disclosure) -> NodeView {
    NodeView {
        node_id: node.id.clone(),
        title: node.display_title(),
        notes: node.notes.clone().filter(|notes| !notes.is_empty()),
        spouses: node
            .spouses
            .iter()
            .map(|spouse| SpouseView {
                token: PersonToken::new(&spouse.name, &node.id, TokenRole::Spouse),
                notes: spouse.notes.clone().filter(|notes| !notes.is_empty()),
            })
            .collect(),
        people: node
            .people
            .iter()
            .map(|name| PersonToken::new(name, &node.id, TokenRole::Person))
            .collect(),
        link: node.link.as_ref().map(|href| LinkView {
            href: href.clone(),
            caption: LINK_CAPTION.to_string(),
        }),
        anchor: node.anchor.clone(),
        children: node
            .children
            .iter()
            .map(|child| build_node(child, depth + 1, disclosure))
            .collect(),
        depth,
        open: disclosure.is_open(&node.id, depth),
    }
}
