//! Event trace to tree.

use smol_str::SmolStr;
use text_size::TextRange;
use thiserror::Error;

use super::{Node, NodeBody, NodeTag};
use crate::event::Event;
use crate::grammar::{Grammar, NodeShape, VariantId};

/// A trace that violates the push/pop protocol.
///
/// These never come from user input. They mean a grammar variant, an editing
/// pass, or the engine itself emitted a malformed trace.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// A `Pop` with no open node.
    #[error("event {at}: pop without a matching push")]
    UnmatchedPop {
        /// Event index.
        at: usize,
    },
    /// The trace ended with nodes still open.
    #[error("{open} node(s) left open at end of trace")]
    UnclosedPush {
        /// Number of open nodes.
        open: usize,
    },
    /// `Content` outside of any node.
    #[error("event {at}: content outside of any node")]
    ContentOutsideNode {
        /// Event index.
        at: usize,
    },
    /// A node received both content and children.
    #[error("event {at}: content mixed with children")]
    ContentWithChildren {
        /// Event index.
        at: usize,
    },
    /// A leaf received more than one `Content`.
    #[error("event {at}: second content for one leaf")]
    MultipleContent {
        /// Event index.
        at: usize,
    },
    /// A leaf closed without content.
    #[error("event {at}: leaf closed without content")]
    MissingContent {
        /// Event index.
        at: usize,
    },
    /// A leaf variant received children.
    #[error("event {at}: leaf variant with children")]
    LeafWithChildren {
        /// Event index.
        at: usize,
    },
    /// An anonymous variant did not yield exactly one child.
    #[error("event {at}: anonymous variant yielded {children} children")]
    AnonymousArity {
        /// Event index.
        at: usize,
        /// Children found.
        children: usize,
    },
    /// The trace built no node at all.
    #[error("trace contains no root node")]
    NoRoot,
    /// Several roots and no pseudo-root to hold them.
    #[error("expected exactly one root, found {0}")]
    MultipleRoots(usize),
    /// Left-recursion markers that do not pair up.
    #[error("event {at}: unpaired left-recursion marker")]
    UnpairedLeftRecursion {
        /// Event index.
        at: usize,
    },
    /// A reused seed with no node to wrap it.
    #[error("event {at}: left-recursive suffix without a wrapping node")]
    UnanchoredLeftRecursion {
        /// Event index.
        at: usize,
    },
}

struct Frame {
    variant: VariantId,
    children: Vec<Node>,
    content: Option<SmolStr>,
    ignorable: String,
    span: Option<TextRange>,
    mark: Option<TextRange>,
}

impl Frame {
    fn extend(&mut self, range: TextRange) {
        self.span = Some(match self.span {
            Some(span) => span.cover(range),
            None => range,
        });
    }
}

/// Builds the tree described by a finished trace.
///
/// Anonymous variants hand their single child to the parent. Ignorable
/// events become the value of an ignorable leaf and only widen the span of
/// any other node. When several roots remain and the grammar designates a
/// pseudo-root, they become its children.
///
/// # Errors
///
/// Returns a [`TreeError`] if the trace breaks the push/pop protocol or a
/// node's shape does not match its variant.
pub fn build_tree(grammar: &Grammar, events: &[Event]) -> Result<Node, TreeError> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut roots: Vec<Node> = Vec::new();

    for (at, event) in events.iter().enumerate() {
        match event {
            Event::Push(variant) => stack.push(Frame {
                variant: *variant,
                children: Vec::new(),
                content: None,
                ignorable: String::new(),
                span: None,
                mark: None,
            }),
            Event::Pop => {
                let frame = stack.pop().ok_or(TreeError::UnmatchedPop { at })?;
                let span = frame.span;
                let node = finish(grammar, frame, at)?;
                match stack.last_mut() {
                    Some(parent) => {
                        if parent.content.is_some() {
                            return Err(TreeError::ContentWithChildren { at });
                        }
                        if let Some(span) = span {
                            parent.extend(span);
                        }
                        parent.children.push(node);
                    }
                    None => roots.push(node),
                }
            }
            Event::Content { text, .. } => {
                let frame = stack
                    .last_mut()
                    .ok_or(TreeError::ContentOutsideNode { at })?;
                if !frame.children.is_empty() {
                    return Err(TreeError::ContentWithChildren { at });
                }
                if frame.content.is_some() {
                    return Err(TreeError::MultipleContent { at });
                }
                frame.content = Some(text.clone());
                if let Some(range) = event.range() {
                    frame.extend(range);
                }
            }
            Event::Token { .. } => {
                if let (Some(frame), Some(range)) = (stack.last_mut(), event.range()) {
                    frame.extend(range);
                }
            }
            Event::Ignorable { text, .. } => {
                if let Some(frame) = stack.last_mut() {
                    if grammar.variant(frame.variant).is_ignorable() {
                        frame.ignorable.push_str(text);
                    }
                    if let Some(range) = event.range() {
                        frame.extend(range);
                    }
                }
            }
            Event::PositionMark(range) => {
                if let Some(frame) = stack.last_mut() {
                    frame.mark = Some(*range);
                }
            }
        }
    }

    if !stack.is_empty() {
        return Err(TreeError::UnclosedPush { open: stack.len() });
    }
    match roots.len() {
        0 => Err(TreeError::NoRoot),
        1 => Ok(roots.remove(0)),
        count => {
            let Some(pseudo) = grammar.pseudo_root() else {
                return Err(TreeError::MultipleRoots(count));
            };
            let span = roots
                .iter()
                .filter_map(Node::source_position)
                .reduce(TextRange::cover);
            Ok(Node::from_parts(tag(grammar, pseudo), NodeBody::Inner(roots), span))
        }
    }
}

fn tag(grammar: &Grammar, variant: VariantId) -> NodeTag {
    let decl = grammar.variant(variant);
    NodeTag {
        variant,
        production: decl.production(),
        ignorable: decl.is_ignorable(),
    }
}

fn finish(grammar: &Grammar, frame: Frame, at: usize) -> Result<Node, TreeError> {
    let decl = grammar.variant(frame.variant);
    if decl.is_anon() {
        if frame.content.is_some() || frame.children.len() != 1 {
            return Err(TreeError::AnonymousArity {
                at,
                children: frame.children.len(),
            });
        }
        return frame
            .children
            .into_iter()
            .next()
            .ok_or(TreeError::AnonymousArity { at, children: 0 });
    }

    let position = frame.mark.or(frame.span);
    let body = match decl.shape() {
        NodeShape::Leaf => {
            if !frame.children.is_empty() {
                return Err(TreeError::LeafWithChildren { at });
            }
            let value = match frame.content {
                Some(value) => value,
                None if decl.is_ignorable() && !frame.ignorable.is_empty() => {
                    SmolStr::from(frame.ignorable)
                }
                None => return Err(TreeError::MissingContent { at }),
            };
            NodeBody::Leaf(value)
        }
        NodeShape::Inner => {
            if frame.content.is_some() {
                return Err(TreeError::ContentWithChildren { at });
            }
            NodeBody::Inner(frame.children)
        }
    };
    Ok(Node::from_parts(tag(grammar, frame.variant), body, position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{GrammarBuilder, ParSer};
    use text_size::TextSize;

    struct Fixture {
        grammar: Grammar,
        num: VariantId,
        add: VariantId,
        group: VariantId,
        note: VariantId,
    }

    fn fixture(pseudo: bool) -> Fixture {
        let mut b = GrammarBuilder::new();
        let e = b.production("E");
        let note_p = b.production("Note");
        let num = b.leaf(e, "Num", ParSer::pattern("[0-9]+").expect("pattern")).id();
        let add = b
            .inner(e, "Add", ParSer::seq([ParSer::r(e), ParSer::lit("+"), ParSer::r(e)]))
            .id();
        let group = b
            .inner(e, "Group", ParSer::seq([ParSer::lit("("), ParSer::r(e), ParSer::lit(")")]))
            .anon()
            .id();
        let note = b
            .leaf(note_p, "Block", ParSer::comment(r"/\*.*?\*/").expect("pattern"))
            .ignorable()
            .id();
        let list_p = b.production("List");
        let list = b.inner(list_p, "Items", ParSer::r(e).star()).id();
        if pseudo {
            b.pseudo_root(list);
        }
        Fixture {
            grammar: b.build().expect("valid grammar"),
            num,
            add,
            group,
            note,
        }
    }

    fn at(offset: u32) -> TextSize {
        TextSize::from(offset)
    }

    #[test]
    fn builds_nested_nodes_with_spans() {
        let f = fixture(false);
        let events = vec![
            Event::push(f.add),
            Event::push(f.num),
            Event::content("1", at(0)),
            Event::pop(),
            Event::ignorable(" ", at(1)),
            Event::token("+", at(2)),
            Event::ignorable(" ", at(3)),
            Event::push(f.num),
            Event::content("2", at(4)),
            Event::pop(),
            Event::pop(),
        ];
        let tree = build_tree(&f.grammar, &events).expect("builds");
        assert_eq!(tree.variant(), f.add);
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.children()[1].value(), Some("2"));
        assert_eq!(tree.source_position(), Some(TextRange::new(at(0), at(5))));
        assert_eq!(
            tree.children()[1].source_position(),
            Some(TextRange::new(at(4), at(5)))
        );
    }

    #[test]
    fn anonymous_variant_is_elided() {
        let f = fixture(false);
        let events = vec![
            Event::push(f.group),
            Event::token("(", at(0)),
            Event::push(f.num),
            Event::content("7", at(1)),
            Event::pop(),
            Event::token(")", at(2)),
            Event::pop(),
        ];
        let tree = build_tree(&f.grammar, &events).expect("builds");
        assert_eq!(tree.variant(), f.num);
        assert_eq!(tree.value(), Some("7"));
    }

    #[test]
    fn ignorable_leaf_collects_comment_text() {
        let f = fixture(false);
        let events = vec![
            Event::push(f.note),
            Event::ignorable("/* hi */", at(0)),
            Event::pop(),
        ];
        let tree = build_tree(&f.grammar, &events).expect("builds");
        assert_eq!(tree.value(), Some("/* hi */"));
    }

    #[test]
    fn position_marks_override_spans() {
        let f = fixture(false);
        let mark = TextRange::new(at(10), at(12));
        let events = vec![
            Event::push(f.num),
            Event::position_mark(mark),
            Event::content("42", at(0)),
            Event::pop(),
        ];
        let tree = build_tree(&f.grammar, &events).expect("builds");
        assert_eq!(tree.source_position(), Some(mark));
    }

    #[test]
    fn protocol_violations_are_reported() {
        let f = fixture(false);
        let cases = vec![
            (vec![Event::pop()], TreeError::UnmatchedPop { at: 0 }),
            (vec![Event::push(f.num)], TreeError::UnclosedPush { open: 1 }),
            (
                vec![Event::content("1", at(0))],
                TreeError::ContentOutsideNode { at: 0 },
            ),
            (
                vec![Event::push(f.num), Event::pop()],
                TreeError::MissingContent { at: 1 },
            ),
            (
                vec![
                    Event::push(f.num),
                    Event::content("1", at(0)),
                    Event::content("2", at(1)),
                    Event::pop(),
                ],
                TreeError::MultipleContent { at: 2 },
            ),
            (
                vec![
                    Event::push(f.add),
                    Event::content("1", at(0)),
                    Event::pop(),
                ],
                TreeError::ContentWithChildren { at: 2 },
            ),
            (
                vec![
                    Event::push(f.num),
                    Event::push(f.num),
                    Event::content("1", at(0)),
                    Event::pop(),
                    Event::pop(),
                ],
                TreeError::LeafWithChildren { at: 4 },
            ),
            (
                vec![Event::push(f.group), Event::pop()],
                TreeError::AnonymousArity { at: 1, children: 0 },
            ),
            (Vec::new(), TreeError::NoRoot),
        ];
        for (events, expected) in cases {
            assert_eq!(build_tree(&f.grammar, &events), Err(expected));
        }
    }

    #[test]
    fn multiple_roots_need_a_pseudo_root() {
        let events = |f: &Fixture| {
            vec![
                Event::push(f.num),
                Event::content("1", at(0)),
                Event::pop(),
                Event::push(f.num),
                Event::content("2", at(2)),
                Event::pop(),
            ]
        };
        let plain = fixture(false);
        assert_eq!(
            build_tree(&plain.grammar, &events(&plain)),
            Err(TreeError::MultipleRoots(2))
        );

        let with_root = fixture(true);
        let tree = build_tree(&with_root.grammar, &events(&with_root)).expect("builds");
        assert_eq!(tree.children().len(), 2);
        assert_eq!(tree.source_position(), Some(TextRange::new(at(0), at(3))));
    }
}
