//! Tree to event trace, the inverse of [`build_tree`](super::build_tree).

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use super::Node;
use crate::event::Event;

/// Supplies a comment to emit right after a node's `Push`.
pub type Decorator<'a> = &'a dyn Fn(&Node) -> Option<SmolStr>;

/// Flattens a tree into a pre-order trace.
///
/// Each node emits `Push`, the decorator's comment as an `Ignorable`, a
/// `PositionMark` when its position differs from the last one emitted, then
/// its `Content` or children, then `Pop`.
#[must_use]
pub fn flatten_tree(node: &Node, decorator: Option<Decorator<'_>>) -> Vec<Event> {
    let mut out = Vec::new();
    let mut last_mark = None;
    walk(node, decorator, &mut last_mark, &mut out);
    out
}

fn walk(
    node: &Node,
    decorator: Option<Decorator<'_>>,
    last_mark: &mut Option<TextRange>,
    out: &mut Vec<Event>,
) {
    let offset = node
        .source_position()
        .map_or(TextSize::from(0), TextRange::start);

    out.push(Event::push(node.variant()));
    if let Some(comment) = decorator.and_then(|decorate| decorate(node)) {
        out.push(Event::ignorable(comment, offset));
    }
    if let Some(position) = node.source_position() {
        if *last_mark != Some(position) {
            out.push(Event::position_mark(position));
            *last_mark = Some(position);
        }
    }
    match node.value() {
        Some(value) => out.push(Event::content(value, offset)),
        None => {
            for child in node.children() {
                walk(child, decorator, last_mark, out);
            }
        }
    }
    out.push(Event::pop());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::grammar::{Grammar, GrammarBuilder, ParSer, VariantId};
    use crate::tree::build_tree;

    fn grammar() -> (Grammar, VariantId, VariantId) {
        let mut b = GrammarBuilder::new();
        let p = b.production("P");
        let num = b.leaf(p, "Num", ParSer::pattern("[0-9]+").expect("pattern")).id();
        let pair = b.inner(p, "Pair", ParSer::seq([ParSer::r(p), ParSer::r(p)])).id();
        (b.build().expect("valid grammar"), num, pair)
    }

    #[test]
    fn flatten_then_build_is_identity() {
        let (g, num, pair) = grammar();
        let leaf = |v: &str, at: u32| {
            Node::leaf(&g, num, v)
                .expect("leaf")
                .with_position(Some(TextRange::at(at.into(), TextSize::of(v))))
        };
        let tree = Node::inner(&g, pair, vec![leaf("1", 0), leaf("22", 2)])
            .expect("inner")
            .with_position(Some(TextRange::new(0.into(), 4.into())));
        let events = flatten_tree(&tree, None);
        let kinds: Vec<_> = events.iter().map(Event::kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::Push,
                EventKind::PositionMark,
                EventKind::Push,
                EventKind::PositionMark,
                EventKind::Content,
                EventKind::Pop,
                EventKind::Push,
                EventKind::PositionMark,
                EventKind::Content,
                EventKind::Pop,
                EventKind::Pop,
            ]
        );
        let rebuilt = build_tree(&g, &events).expect("builds");
        assert_eq!(rebuilt, tree);
        assert_eq!(rebuilt.children()[1].source_position(), tree.children()[1].source_position());
    }

    #[test]
    fn repeated_positions_are_marked_once() {
        let (g, num, pair) = grammar();
        let range = Some(TextRange::new(0.into(), 1.into()));
        let tree = Node::inner(&g, pair, vec![Node::leaf(&g, num, "1").expect("leaf").with_position(range)])
            .expect("inner")
            .with_position(range);
        let marks = flatten_tree(&tree, None)
            .iter()
            .filter(|e| e.kind() == EventKind::PositionMark)
            .count();
        assert_eq!(marks, 1);
    }

    #[test]
    fn decorator_adds_ignorables() {
        let (g, num, pair) = grammar();
        let tree = Node::inner(&g, pair, vec![Node::leaf(&g, num, "1").expect("leaf")]).expect("inner");
        let decorate = |node: &Node| node.is_leaf().then(|| SmolStr::new("/* n */"));
        let events = flatten_tree(&tree, Some(&decorate));
        assert_eq!(events[1], Event::push(num));
        assert_eq!(events[2].text(), Some("/* n */"));
        assert_eq!(build_tree(&g, &events).expect("builds"), tree);
    }
}
