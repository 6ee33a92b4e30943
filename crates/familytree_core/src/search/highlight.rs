//! Live query highlighting on rendered views.

use crate::render::BranchView;

/// Normalizes a raw query into the lowercase term used for matching.
///
/// Returns `None` for blank queries.
pub fn normalize_query(query: &str) -> Option<String> {
    let term = query.trim().to_lowercase();
    (!term.is_empty()).then_some(term)
}

/// Marks every token whose lowercase name contains the query.
///
/// An empty query clears all highlights. Returns the number of highlighted
/// tokens.
pub fn apply(view: &mut BranchView, query: &str) -> usize {
    let term = normalize_query(query);
    let mut count = 0;
    view.visit_tokens_mut(|token| {
        token.highlighted = term
            .as_deref()
            .is_some_and(|term| token.search_key.contains(term));
        if token.highlighted {
            count += 1;
        }
    });
    count
}

#[cfg(test)]
mod tests {
    use super::{apply, normalize_query};
    use crate::model::node::{Branch, Node, Spouse};
    use crate::render::render_branch;

    fn view() -> crate::render::BranchView {
        let mut root = Node::with_people("n1", ["Alice", "Alan"]);
        root.spouses.push(Spouse::new("Malcolm"));
        root.children.push(Node::with_people("n2", ["Bob"]));
        render_branch(&Branch::new("p", "P", root))
    }

    #[test]
    fn normalize_query_trims_and_lowercases() {
        assert_eq!(normalize_query("  ALi ").as_deref(), Some("ali"));
        assert_eq!(normalize_query("   "), None);
    }

    #[test]
    fn matching_is_case_insensitive_substring() {
        let mut view = view();
        assert_eq!(apply(&mut view, "AL"), 3);
        let highlighted: Vec<_> = view
            .tokens()
            .into_iter()
            .filter(|token| token.highlighted)
            .map(|token| token.name.clone())
            .collect();
        assert_eq!(highlighted, vec!["Malcolm", "Alice", "Alan"]);
    }

    #[test]
    fn empty_query_clears_highlights() {
        let mut view = view();
        apply(&mut view, "bob");
        assert_eq!(view.highlighted_count(), 1);
        assert_eq!(apply(&mut view, ""), 0);
        assert_eq!(view.highlighted_count(), 0);
    }
}
