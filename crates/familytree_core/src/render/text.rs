//! Plain-text outline for terminal hosts.

use crate::render::{BranchView, NodeView, PersonToken};
use std::fmt::Write;

const INDENT: &str = "    ";

/// Renders an indented outline. Collapsed nodes hide their children;
/// highlighted names are wrapped in `*`.
pub fn to_outline(view: &BranchView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.heading);
    write_node(&mut out, &view.root);
    out
}

fn write_node(out: &mut String, node: &NodeView) {
    let pad = INDENT.repeat(node.depth);
    let marker = match (node.children.is_empty(), node.open) {
        (true, _) => "[ ]",
        (false, true) => "[-]",
        (false, false) => "[+]",
    };
    let _ = write!(out, "{pad}{marker} {} ({})", node.title, node.node_id);
    if let Some(notes) = &node.notes {
        let _ = write!(out, " \u{2014} {notes}");
    }
    out.push('\n');

    if !node.spouses.is_empty() {
        let spouses = node
            .spouses
            .iter()
            .map(|spouse| match &spouse.notes {
                Some(notes) => format!("{} ({notes})", token_text(&spouse.token)),
                None => token_text(&spouse.token),
            })
            .collect::<Vec<_>>();
        let _ = writeln!(out, "{pad}{INDENT}spouses: {}", spouses.join(", "));
    }
    if !node.people.is_empty() {
        let people = node.people.iter().map(token_text).collect::<Vec<_>>();
        let _ = writeln!(out, "{pad}{INDENT}people: {}", people.join(", "));
    }
    if let Some(link) = &node.link {
        let _ = writeln!(out, "{pad}{INDENT}\u{2197} {}", link.href);
    }
    if let Some(anchor) = &node.anchor {
        let _ = writeln!(out, "{pad}{INDENT}#{anchor}");
    }

    if node.open {
        for child in &node.children {
            write_node(out, child);
        }
    }
}

fn token_text(token: &PersonToken) -> String {
    if token.highlighted {
        format!("*{}*", token.name)
    } else {
        token.name.clone()
    }
}
