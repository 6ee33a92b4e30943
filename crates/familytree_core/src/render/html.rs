//! HTML serializer for branch views.
//!
//! Emits `details`/`summary` disclosure markup with `span.person` name
//! tokens. All text and attribute values are escaped.

use crate::render::{BranchView, NodeView, PersonToken};
use std::fmt::Write;

/// Serializes a branch view as an HTML fragment.
pub fn to_html(view: &BranchView) -> String {
    let mut out = String::new();
    let _ = write!(out, "<h2>{}</h2>", escape_html(&view.heading));
    write_node(&mut out, &view.root);
    out
}

/// Escapes `&`, `<`, `>` and `"`.
pub fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

fn write_node(out: &mut String, node: &NodeView) {
    let _ = write!(
        out,
        "<details data-node-id=\"{}\"{}><summary><span>{}</span>",
        escape_html(&node.node_id),
        if node.open { " open" } else { "" },
        escape_html(&node.title)
    );
    if let Some(notes) = &node.notes {
        let _ = write!(
            out,
            "<span class=\"node-meta\"> \u{2014} {}</span>",
            escape_html(notes)
        );
    }
    out.push_str("</summary>");

    if !node.spouses.is_empty() {
        out.push_str("<div class=\"node-meta\">Spouses: ");
        for spouse in &node.spouses {
            write_token(out, &spouse.token);
            if let Some(notes) = &spouse.notes {
                let _ = write!(
                    out,
                    "<span class=\"node-meta\"> ({})</span>",
                    escape_html(notes)
                );
            }
            out.push_str("  ");
        }
        out.push_str("</div>");
    }

    if !node.people.is_empty() {
        out.push_str("<div class=\"node-meta\">People: ");
        for person in &node.people {
            write_token(out, person);
            out.push_str("  ");
        }
        out.push_str("</div>");
    }

    if let Some(link) = &node.link {
        let _ = write!(
            out,
            "<a class=\"node-meta\" href=\"{}\">{}</a>",
            escape_html(&link.href),
            escape_html(&link.caption)
        );
    }

    for child in &node.children {
        write_node(out, child);
    }

    if let Some(anchor) = &node.anchor {
        let _ = write!(out, "<div id=\"{}\"></div>", escape_html(anchor));
    }
    out.push_str("</details>");
}

fn write_token(out: &mut String, token: &PersonToken) {
    let _ = write!(
        out,
        "<span class=\"person{}\" data-name=\"{}\" data-node-id=\"{}\" data-target=\"{}\">{}</span>",
        if token.highlighted { " highlight" } else { "" },
        escape_html(&token.search_key),
        escape_html(&token.node_id),
        escape_html(&token.target),
        escape_html(&token.name)
    );
}

#[cfg(test)]
mod tests {
    use super::{escape_html, to_html};
    use crate::model::node::{Branch, Node, Spouse};
    use crate::render::render_branch;

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & Jerry</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; Jerry&lt;/b&gt;"
        );
    }

    #[test]
    fn html_contains_tokens_links_and_anchors() {
        let mut root = Node::with_people("n1", ["Ann <Sr>"]);
        root.spouses.push(Spouse::new("Carl"));
        root.anchor = Some("root-anchor".to_string());
        let mut child = Node::with_people("n2", ["Bea"]);
        child.link = Some("#other".to_string());
        root.children.push(child);
        let html = to_html(&render_branch(&Branch::new("p", "Paternal", root)));

        assert!(html.starts_with("<h2>Paternal</h2>"));
        assert!(html.contains("<details data-node-id=\"n1\" open>"));
        assert!(html.contains("<details data-node-id=\"n2\">"));
        assert!(html.contains(">Ann &lt;Sr&gt;</span>"));
        assert!(html.contains("Spouses: <span class=\"person\" data-name=\"carl\""));
        assert!(html.contains("href=\"#other\""));
        assert!(html.contains("<div id=\"root-anchor\"></div></details>"));
    }
}
