//! JSON document codec for the `{branches: [...]}` tree format.
//!
//! # Responsibility
//! - Parse source, snapshot and import documents with shape checks only.
//! - Serialize the tree for snapshots (compact) and export (pretty).

use crate::model::node::Tree;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from document parsing and serialization.
#[derive(Debug)]
pub enum DocumentError {
    /// Input is not valid JSON or does not match the tree shape.
    Json(serde_json::Error),
    /// Input parsed but carries no branches.
    NoBranches,
}

impl Display for DocumentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid family tree document: {err}"),
            Self::NoBranches => write!(f, "family tree document has no branches"),
        }
    }
}

impl Error for DocumentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::NoBranches => None,
        }
    }
}

impl From<serde_json::Error> for DocumentError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Parses a tree document.
///
/// Every branch must carry `id`, `title` and `root`. Node ids may be absent.
pub fn parse_document(text: &str) -> Result<Tree, DocumentError> {
    let tree: Tree = serde_json::from_str(text)?;
    if tree.branches.is_empty() {
        return Err(DocumentError::NoBranches);
    }
    Ok(tree)
}

/// Serializes the tree as single-line JSON for snapshot storage.
pub fn to_compact_json(tree: &Tree) -> Result<String, DocumentError> {
    serde_json::to_string(tree).map_err(Into::into)
}

/// Serializes the tree as indented JSON for export files.
pub fn to_pretty_json(tree: &Tree) -> Result<String, DocumentError> {
    serde_json::to_string_pretty(tree).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::{parse_document, to_compact_json, to_pretty_json, DocumentError};

    #[test]
    fn parse_accepts_missing_ids_and_optional_fields() {
        let tree = parse_document(
            r#"{"branches":[{"id":"paternal","title":"Paternal","root":
                {"people":["Alice"],"spouses":[{"name":"Carl","notes":"m. 1950"}],
                 "children":[{"label":"Kids","people":["Bob"]}]}}]}"#,
        )
        .expect("document should parse");

        let root = &tree.branches[0].root;
        assert!(root.id.is_empty());
        assert_eq!(root.spouses[0].notes.as_deref(), Some("m. 1950"));
        assert_eq!(root.children[0].label.as_deref(), Some("Kids"));
        assert!(root.children[0].children.is_empty());
    }

    #[test]
    fn parse_rejects_malformed_json_and_bad_shapes() {
        assert!(matches!(
            parse_document("{not json"),
            Err(DocumentError::Json(_))
        ));
        assert!(matches!(
            parse_document(r#"{"branches":[{"id":"a","title":"A"}]}"#),
            Err(DocumentError::Json(_))
        ));
        assert!(matches!(
            parse_document(r#"{"branches":[]}"#),
            Err(DocumentError::NoBranches)
        ));
    }

    #[test]
    fn serialization_omits_absent_fields() {
        let tree = parse_document(
            r#"{"branches":[{"id":"a","title":"A","root":{"id":"n1","people":["Ann"]}}]}"#,
        )
        .expect("document should parse");

        let compact = to_compact_json(&tree).expect("serialize");
        assert_eq!(
            compact,
            r#"{"branches":[{"id":"a","title":"A","root":{"id":"n1","people":["Ann"]}}]}"#
        );
        let pretty = to_pretty_json(&tree).expect("serialize");
        assert!(pretty.contains('\n'));
        assert_eq!(parse_document(&pretty).expect("reparse"), tree);
    }
}
