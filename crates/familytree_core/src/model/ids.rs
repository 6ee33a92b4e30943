//! Monotonic node id minting.
//!
//! # Invariants
//! - Minted ids have the form `n<counter>` and the counter only grows.
//! - A minted id never collides with an id already present in the tree.
//! - Deleting a node never makes its id available again within one counter
//!   lineage; the counter is persisted alongside the snapshot.

use crate::model::node::Tree;
use std::collections::HashSet;

const ID_PREFIX: &str = "n";

/// Largest suffix or persisted value that may seed the counter.
///
/// Ids above it stay reserved through the taken-set but never move the
/// counter, so minting always has room to grow.
pub const MAX_SEED_COUNTER: u64 = (1 << 53) - 1;

/// Mints fresh node ids.
#[derive(Debug, Clone, Default)]
pub struct IdGenerator {
    counter: u64,
    taken: HashSet<String>,
}

impl IdGenerator {
    /// Creates a generator positioned after every `n<digits>` id in `tree`
    /// and after `persisted_counter`, whichever is larger.
    pub fn seeded_from(tree: &Tree, persisted_counter: u64) -> Self {
        let mut generator = Self {
            counter: persisted_counter.min(MAX_SEED_COUNTER),
            taken: HashSet::new(),
        };
        generator.observe(tree);
        generator
    }

    /// Records every id in `tree` as taken and advances the counter past them.
    ///
    /// Used after wholesale replacement (import/reset) so the counter never
    /// moves backwards.
    pub fn observe(&mut self, tree: &Tree) {
        tree.walk(&mut |_, node, _| {
            if node.id.is_empty() {
                return;
            }
            if let Some(value) = numeric_suffix(&node.id).filter(|v| *v <= MAX_SEED_COUNTER) {
                self.counter = self.counter.max(value);
            }
            self.taken.insert(node.id.clone());
        });
    }

    /// Returns the next unused id.
    pub fn next_id(&mut self) -> String {
        loop {
            // Seeding is capped far below `u64::MAX`.
            self.counter = self.counter.saturating_add(1);
            let candidate = format!("{ID_PREFIX}{}", self.counter);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }

    /// Current counter value, persisted so minted ids survive reloads.
    pub fn counter(&self) -> u64 {
        self.counter
    }
}

fn numeric_suffix(id: &str) -> Option<u64> {
    let digits = id.strip_prefix(ID_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::{numeric_suffix, IdGenerator, MAX_SEED_COUNTER};
    use crate::model::node::{Branch, Node, Tree};

    #[test]
    fn numeric_suffix_accepts_only_prefixed_digits() {
        assert_eq!(numeric_suffix("n12"), Some(12));
        assert_eq!(numeric_suffix("n"), None);
        assert_eq!(numeric_suffix("n1a"), None);
        assert_eq!(numeric_suffix("root"), None);
        assert_eq!(numeric_suffix("n+5"), None);
    }

    #[test]
    fn seeding_starts_after_largest_existing_id() {
        let mut root = Node::with_people("n7", ["A"]);
        root.children.push(Node::with_people("custom", ["B"]));
        let tree = Tree::new(vec![Branch::new("b", "B", root)]);

        let mut ids = IdGenerator::seeded_from(&tree, 0);
        assert_eq!(ids.next_id(), "n8");
        assert_eq!(ids.next_id(), "n9");
        assert_eq!(ids.counter(), 9);
    }

    #[test]
    fn persisted_counter_wins_over_tree_contents() {
        let tree = Tree::new(vec![Branch::new("b", "B", Node::with_people("n2", ["A"]))]);
        let mut ids = IdGenerator::seeded_from(&tree, 40);
        assert_eq!(ids.next_id(), "n41");
    }

    #[test]
    fn observe_never_moves_counter_backwards() {
        let tree = Tree::new(vec![Branch::new("b", "B", Node::with_people("n3", ["A"]))]);
        let mut ids = IdGenerator::seeded_from(&tree, 10);
        ids.observe(&Tree::default());
        assert_eq!(ids.next_id(), "n11");
    }

    #[test]
    fn oversized_suffixes_do_not_seed_the_counter() {
        let mut root = Node::with_people("n18446744073709551615", ["A"]);
        root.children.push(Node::with_people("n4", ["B"]));
        let tree = Tree::new(vec![Branch::new("b", "B", root)]);

        let mut ids = IdGenerator::seeded_from(&tree, u64::MAX);
        assert_eq!(ids.counter(), MAX_SEED_COUNTER);
        let minted = ids.next_id();
        assert_eq!(minted, format!("n{}", MAX_SEED_COUNTER + 1));

        let mut fresh = IdGenerator::seeded_from(&tree, 0);
        assert_eq!(fresh.next_id(), "n5");
    }
}
