//! Flat person directory: one card per distinct person name.
//!
//! # Invariants
//! - Every name listed as a person or a spouse has a card; a person entry
//!   wins over a spouse entry for the same name.
//! - Cards are keyed by element id, so names that slug to the same id
//!   collapse into the first card in traversal order.
//! - Cards are sorted case-insensitively by name.

use crate::model::node::{Node, NodeId, Tree};
use crate::render::element_id;
use crate::search::highlight::normalize_query;
use serde::Serialize;
use std::collections::HashSet;

/// Collapsible person card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonCard {
    pub name: String,
    /// Element id (`card-<slug>`).
    pub card_id: String,
    pub branch_title: String,
    pub node_id: NodeId,
    pub spouses: Vec<String>,
    /// People listed at the node's children.
    pub children: Vec<String>,
    pub notes: Option<String>,
}

/// Result of [`PersonDirectory::locate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located<'a> {
    pub card: &'a PersonCard,
    /// Query the host must switch to so the card becomes visible.
    pub requery: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PersonDirectory {
    cards: Vec<PersonCard>,
}

impl PersonDirectory {
    pub fn build(tree: &Tree) -> Self {
        let mut seen = HashSet::new();
        let mut cards = Vec::new();
        tree.walk(&mut |branch, node, _| {
            for name in &node.people {
                let card_id = element_id(name);
                if !seen.insert(card_id.clone()) {
                    continue;
                }
                cards.push(PersonCard {
                    name: name.clone(),
                    card_id,
                    branch_title: branch.title.clone(),
                    node_id: node.id.clone(),
                    spouses: node.spouses.iter().map(|s| s.name.clone()).collect(),
                    children: child_people(node),
                    notes: non_empty(node.notes.as_deref()),
                });
            }
        });
        // Spouse-only names still need a card so their links resolve.
        tree.walk(&mut |branch, node, _| {
            for spouse in &node.spouses {
                let card_id = element_id(&spouse.name);
                if !seen.insert(card_id.clone()) {
                    continue;
                }
                cards.push(PersonCard {
                    name: spouse.name.clone(),
                    card_id,
                    branch_title: branch.title.clone(),
                    node_id: node.id.clone(),
                    spouses: node.people.clone(),
                    children: child_people(node),
                    notes: non_empty(spouse.notes.as_deref())
                        .or_else(|| non_empty(node.notes.as_deref())),
                });
            }
        });
        cards.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        Self { cards }
    }

    pub fn cards(&self) -> &[PersonCard] {
        &self.cards
    }

    /// Cards whose name or notes contain the query, case-insensitively.
    pub fn filter(&self, query: &str) -> Vec<&PersonCard> {
        let Some(term) = normalize_query(query) else {
            return self.cards.iter().collect();
        };
        self.cards
            .iter()
            .filter(|card| card_matches(card, &term))
            .collect()
    }

    /// Finds the card for `name` and reports whether `current_query` hides it.
    pub fn locate(&self, name: &str, current_query: &str) -> Option<Located<'_>> {
        let card_id = element_id(name);
        let card = self.cards.iter().find(|card| card.card_id == card_id)?;
        let visible = normalize_query(current_query).map_or(true, |term| card_matches(card, &term));
        Some(Located {
            card,
            requery: (!visible).then(|| name.to_string()),
        })
    }
}

fn child_people(node: &Node) -> Vec<String> {
    node.children
        .iter()
        .flat_map(|child| child.people.iter().cloned())
        .collect()
}

fn non_empty(notes: Option<&str>) -> Option<String> {
    notes.filter(|notes| !notes.is_empty()).map(str::to_string)
}

fn card_matches(card: &PersonCard, term: &str) -> bool {
    card.name.to_lowercase().contains(term)
        || card
            .notes
            .as_deref()
            .is_some_and(|notes| notes.to_lowercase().contains(term))
}

#[cfg(test)]
mod tests {
    use super::PersonDirectory;
    use crate::model::document::parse_document;
    use crate::model::node::{Branch, Node, Spouse, Tree};
    use crate::SAMPLE_DOCUMENT;

    fn tree() -> Tree {
        let mut root = Node::with_people("n1", ["zed", "Alice"]);
        root.spouses.push(Spouse::new("Carl"));
        root.notes = Some("emigrated 1920".to_string());
        root.children.push(Node::with_people("n2", ["Bob", "Bea"]));
        root.children.push(Node::with_people("n3", ["Alice"]));
        Tree::new(vec![Branch::new("p", "Paternal line", root)])
    }

    #[test]
    fn build_dedupes_and_sorts_cards() {
        let directory = PersonDirectory::build(&tree());
        let names: Vec<_> = directory.cards().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bea", "Bob", "Carl", "zed"]);

        let alice = &directory.cards()[0];
        assert_eq!(alice.node_id, "n1");
        assert_eq!(alice.card_id, "card-Alice");
        assert_eq!(alice.spouses, vec!["Carl"]);
        assert_eq!(alice.children, vec!["Bob", "Bea", "Alice"]);
        assert_eq!(alice.branch_title, "Paternal line");
    }

    #[test]
    fn filter_matches_name_or_notes() {
        let directory = PersonDirectory::build(&tree());
        assert_eq!(directory.filter("").len(), 5);
        let by_notes: Vec<_> = directory
            .filter("EMIGRATED")
            .iter()
            .map(|c| c.name.clone())
            .collect();
        assert_eq!(by_notes, vec!["Alice", "Carl", "zed"]);
        assert_eq!(directory.filter("be").len(), 1);
    }

    #[test]
    fn locate_requests_requery_when_hidden() {
        let directory = PersonDirectory::build(&tree());
        let visible = directory.locate("Bob", "").expect("bob has a card");
        assert!(visible.requery.is_none());

        let hidden = directory.locate("Bob", "alice").expect("bob has a card");
        assert_eq!(hidden.requery.as_deref(), Some("Bob"));
        assert!(directory.locate("Nobody", "").is_none());
    }

    #[test]
    fn spouse_only_names_get_their_own_card() {
        let directory = PersonDirectory::build(&tree());
        let carl = directory.locate("Carl", "").expect("spouse has a card");
        assert_eq!(carl.card.node_id, "n1");
        assert_eq!(carl.card.spouses, vec!["zed", "Alice"]);
        assert_eq!(carl.card.children, vec!["Bob", "Bea", "Alice"]);
        assert_eq!(carl.card.notes.as_deref(), Some("emigrated 1920"));
    }

    #[test]
    fn person_entry_wins_over_spouse_entry() {
        let tree = parse_document(SAMPLE_DOCUMENT).expect("sample parses");
        let directory = PersonDirectory::build(&tree);

        let henry = directory.locate("Henry Marsh", "").expect("spouse card");
        assert_eq!(henry.card.spouses, vec!["Florence Hale"]);

        let george = directory.locate("George Hale", "").expect("person card");
        assert_eq!(george.card.node_id, "n2");
        assert_eq!(george.card.spouses, vec!["Margaret Doyle"]);
    }
}
