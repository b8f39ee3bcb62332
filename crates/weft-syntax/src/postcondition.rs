//! Shape checks over the tail of an event trace.
//!
//! A postcondition restricts a variant to traces whose last emitted subtree
//! has a given shape, without building a tree or re-parsing. The scan walks
//! backward from the terminating `Pop`, following the chain of last children.

use crate::event::{Chain, Event, ParseEvent};
use crate::grammar::VariantId;

/// Requires the node at `depth` on the last-child chain to be `variant`.
///
/// Depth 0 is the node closed by the terminating `Pop`, depth 1 its last
/// child, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Postcondition {
    depth: usize,
    variant: VariantId,
}

impl Postcondition {
    /// Creates a postcondition.
    #[must_use]
    pub const fn new(depth: usize, variant: VariantId) -> Self {
        Self { depth, variant }
    }

    /// Depth on the last-child chain.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Expected variant.
    #[must_use]
    pub fn variant(&self) -> VariantId {
        self.variant
    }

    /// Checks a finished trace that ends with a `Pop`.
    #[must_use]
    pub fn check(&self, events: &[Event]) -> bool {
        variant_at_depth(events.iter().rev(), self.depth) == Some(self.variant)
    }

    pub(crate) fn check_chain(&self, events: &Chain<ParseEvent>) -> bool {
        let tail = events.iter().filter_map(ParseEvent::as_event);
        variant_at_depth(tail, self.depth) == Some(self.variant)
    }
}

/// Scans events newest first and returns the variant pushed at `depth` on
/// the last-child chain of the node closed by the first event.
///
/// Returns `None` if the first structural event is not a `Pop`, or if the
/// chain is shallower than `depth`.
pub fn variant_at_depth<'a>(
    events: impl IntoIterator<Item = &'a Event>,
    depth: usize,
) -> Option<VariantId> {
    let mut level = 0usize;
    for event in events {
        match event {
            Event::Pop => level += 1,
            Event::Push(variant) => {
                // A push before any pop: the trace does not end on a node.
                level = level.checked_sub(1)?;
                if level == depth {
                    return Some(*variant);
                }
                // The chain ended above `depth`; what follows is an earlier sibling.
                if level < depth {
                    return None;
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use text_size::TextSize;

    fn v(raw: u32) -> VariantId {
        VariantId::from_raw(raw)
    }

    /// `(1 (2 (3 "x")) (4 (5 "y")))`
    fn nested() -> Vec<Event> {
        let at = TextSize::from(0);
        vec![
            Event::push(v(1)),
            Event::push(v(2)),
            Event::push(v(3)),
            Event::content("x", at),
            Event::pop(),
            Event::pop(),
            Event::push(v(4)),
            Event::push(v(5)),
            Event::content("y", at),
            Event::pop(),
            Event::pop(),
            Event::pop(),
        ]
    }

    #[test]
    fn depths_follow_the_last_child() {
        let events = nested();
        assert_eq!(variant_at_depth(events.iter().rev(), 0), Some(v(1)));
        assert_eq!(variant_at_depth(events.iter().rev(), 1), Some(v(4)));
        assert_eq!(variant_at_depth(events.iter().rev(), 2), Some(v(5)));
        assert_eq!(variant_at_depth(events.iter().rev(), 3), None);
    }

    #[test]
    fn deeper_earlier_siblings_are_not_on_the_chain() {
        let at = TextSize::from(0);
        // `(1 (2 (3 "x")) (4 "y"))`
        let events = vec![
            Event::push(v(1)),
            Event::push(v(2)),
            Event::push(v(3)),
            Event::content("x", at),
            Event::pop(),
            Event::pop(),
            Event::push(v(4)),
            Event::content("y", at),
            Event::pop(),
            Event::pop(),
        ];
        assert_eq!(variant_at_depth(events.iter().rev(), 1), Some(v(4)));
        assert_eq!(variant_at_depth(events.iter().rev(), 2), None);
        assert_eq!(variant_at_depth(events.iter().rev(), 3), None);
    }

    #[test]
    fn trace_must_end_on_a_pop() {
        let events = vec![Event::push(v(1)), Event::content("x", TextSize::from(0))];
        assert_eq!(variant_at_depth(events.iter().rev(), 0), None);
    }

    #[test]
    fn earlier_roots_are_not_visited() {
        let at = TextSize::from(0);
        let events = vec![
            Event::push(v(7)),
            Event::push(v(8)),
            Event::content("a", at),
            Event::pop(),
            Event::pop(),
            Event::push(v(9)),
            Event::content("b", at),
            Event::pop(),
        ];
        assert_eq!(variant_at_depth(events.iter().rev(), 0), Some(v(9)));
        assert_eq!(variant_at_depth(events.iter().rev(), 1), None);
    }

    #[test]
    fn check_compares_the_variant() {
        assert!(Postcondition::new(1, v(4)).check(&nested()));
        assert!(!Postcondition::new(1, v(2)).check(&nested()));
    }
}
