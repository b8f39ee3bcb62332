//! Diagnostic renderings of a tree.

use std::fmt::Write;

use super::Node;
use crate::grammar::Grammar;

/// Renders `node` as an s-expression, e.g. `(Expr.Add (Number.Int "1") ...)`.
#[must_use]
pub fn sexpr(grammar: &Grammar, node: &Node) -> String {
    let mut out = String::new();
    write_sexpr(grammar, node, &mut out);
    out
}

fn write_sexpr(grammar: &Grammar, node: &Node, out: &mut String) {
    out.push('(');
    out.push_str(grammar.variant(node.variant()).qualified_name());
    match node.value() {
        Some(value) => {
            let _ = write!(out, " {value:?}");
        }
        None => {
            for child in node.children() {
                out.push(' ');
                write_sexpr(grammar, child, out);
            }
        }
    }
    out.push(')');
}

/// Renders `node` as an indented ASCII-art tree, one node per line,
/// optionally followed by its source range.
#[must_use]
pub fn ascii_tree(grammar: &Grammar, node: &Node, positions: bool) -> String {
    let mut out = String::new();
    write_line(grammar, node, positions, &mut out);
    write_children(grammar, node, positions, "", &mut out);
    out
}

fn write_line(grammar: &Grammar, node: &Node, positions: bool, out: &mut String) {
    out.push_str(grammar.variant(node.variant()).qualified_name());
    if positions {
        if let Some(range) = node.source_position() {
            let _ = write!(out, "@{}..{}", u32::from(range.start()), u32::from(range.end()));
        }
    }
    if let Some(value) = node.value() {
        let _ = write!(out, " {value:?}");
    }
    out.push('\n');
}

fn write_children(grammar: &Grammar, node: &Node, positions: bool, prefix: &str, out: &mut String) {
    let children = node.children();
    for (i, child) in children.iter().enumerate() {
        let last = i + 1 == children.len();
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        write_line(grammar, child, positions, out);
        let nested = format!("{prefix}{}", if last { "    " } else { "│   " });
        write_children(grammar, child, positions, &nested, out);
    }
}
