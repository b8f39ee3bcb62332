//! Turns a parse-time event list into a finished trace.
//!
//! While growing a left-recursive seed, the engine emits the seed *before*
//! the `Push` of the variant that ends up wrapping it:
//!
//! ```text
//! LrStart(E)  Push(E.Term) .. Pop  Push(E.Add) LrSuffix(E) Token(+) .. Pop  LrEnd(E)
//!             '-----seed--------'  '--wraps the seed--'
//! ```
//!
//! Each `LrSuffix` links the current root of its bracket to the pushes opened
//! right before it (innermost first), like a forward-parent chain. When the
//! first `Push` of such a chain is reached, every linked variant is opened in
//! outer-to-inner order and the later copies are skipped.
//!
//! Brackets nest when one member of an indirect cycle grows inside another.
//! A suffix then belongs to the innermost open bracket of its production, and
//! the pushes it hoists may straddle the `LrStart` of a bracket opened later.
//! A hoisted push is spliced into the existing chain rather than replacing
//! the root's parent.

use crate::event::{Event, ParseEvent};
use crate::tree::TreeError;

struct Bracket {
    production: crate::grammar::ProductionId,
    start: usize,
    root: Option<usize>,
}

/// Resolves left-recursion brackets, dropping every ephemeral event.
pub(crate) fn resolve_left_recursion(events: &[ParseEvent]) -> Result<Vec<Event>, TreeError> {
    let mut forward_parent: Vec<Option<usize>> = vec![None; events.len()];
    let mut brackets: Vec<Bracket> = Vec::new();

    for (i, event) in events.iter().enumerate() {
        match event {
            ParseEvent::LrStart(production) => brackets.push(Bracket {
                production: *production,
                start: i,
                root: None,
            }),
            ParseEvent::LrSuffix(production) => {
                let bracket = brackets
                    .iter_mut()
                    .rev()
                    .find(|bracket| bracket.production == *production)
                    .ok_or(TreeError::UnpairedLeftRecursion { at: i })?;
                let mut root = match bracket.root {
                    Some(root) => root,
                    None => first_push_after(events, bracket.start)
                        .ok_or(TreeError::UnpairedLeftRecursion { at: i })?,
                };

                let mut hoisted = 0usize;
                for j in (bracket.start + 1..i).rev() {
                    match &events[j] {
                        ParseEvent::Event(Event::Push(_)) if j != root => {
                            forward_parent[j] = forward_parent[root];
                            forward_parent[root] = Some(j);
                            root = j;
                            hoisted += 1;
                        }
                        ParseEvent::LrStart(_) => {}
                        _ => break,
                    }
                }
                if hoisted == 0 {
                    return Err(TreeError::UnanchoredLeftRecursion { at: i });
                }
                bracket.root = Some(root);
            }
            ParseEvent::LrEnd(production) => match brackets.pop() {
                Some(bracket) if bracket.production == *production => {}
                _ => return Err(TreeError::UnpairedLeftRecursion { at: i }),
            },
            ParseEvent::Event(_) => {}
        }
    }
    if let Some(bracket) = brackets.last() {
        return Err(TreeError::UnpairedLeftRecursion { at: bracket.start });
    }

    let mut hoisted = vec![false; events.len()];
    let mut out = Vec::with_capacity(events.len());
    for (i, event) in events.iter().enumerate() {
        match event {
            ParseEvent::Event(Event::Push(variant)) => {
                if hoisted[i] {
                    continue;
                }
                let mut variants = vec![*variant];
                let mut current = i;
                while let Some(parent) = forward_parent[current] {
                    hoisted[parent] = true;
                    if let ParseEvent::Event(Event::Push(outer)) = &events[parent] {
                        variants.push(*outer);
                    }
                    current = parent;
                }
                out.extend(variants.into_iter().rev().map(Event::Push));
            }
            ParseEvent::Event(event) => out.push(event.clone()),
            ParseEvent::LrStart(_) | ParseEvent::LrSuffix(_) | ParseEvent::LrEnd(_) => {}
        }
    }
    Ok(out)
}

fn first_push_after(events: &[ParseEvent], start: usize) -> Option<usize> {
    events
        .iter()
        .enumerate()
        .skip(start + 1)
        .find(|(_, event)| matches!(event, ParseEvent::Event(Event::Push(_))))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{ProductionId, VariantId};
    use text_size::TextSize;

    fn push(v: u32) -> ParseEvent {
        ParseEvent::Event(Event::Push(VariantId::from_raw(v)))
    }

    fn pop() -> ParseEvent {
        ParseEvent::Event(Event::Pop)
    }

    fn content(text: &str) -> ParseEvent {
        ParseEvent::Event(Event::content(text, TextSize::from(0)))
    }

    #[test]
    fn plain_events_pass_through() {
        let events = vec![push(0), content("x"), pop()];
        let resolved = resolve_left_recursion(&events).expect("resolves");
        assert_eq!(resolved.len(), 3);
        assert_eq!(resolved[0], Event::Push(VariantId::from_raw(0)));
    }

    #[test]
    fn single_growth_hoists_the_wrapper() {
        let e = ProductionId::from_raw(0);
        let events = vec![
            ParseEvent::lr_start(e),
            push(1),
            content("1"),
            pop(),
            push(2),
            ParseEvent::lr_suffix(e),
            content("2"),
            pop(),
            ParseEvent::lr_end(e),
        ];
        let resolved = resolve_left_recursion(&events).expect("resolves");
        let kinds: Vec<_> = resolved
            .iter()
            .map(|event| match event {
                Event::Push(v) => format!("+{}", v.raw()),
                Event::Pop => "-".to_string(),
                other => other.text().unwrap_or_default().to_string(),
            })
            .collect();
        assert_eq!(kinds, vec!["+2", "+1", "1", "-", "2", "-"]);
    }

    #[test]
    fn repeated_growth_nests_left() {
        let e = ProductionId::from_raw(0);
        let events = vec![
            ParseEvent::lr_start(e),
            push(1),
            content("a"),
            pop(),
            push(2),
            ParseEvent::lr_suffix(e),
            content("b"),
            pop(),
            push(3),
            ParseEvent::lr_suffix(e),
            content("c"),
            pop(),
            ParseEvent::lr_end(e),
        ];
        let resolved = resolve_left_recursion(&events).expect("resolves");
        let pushes: Vec<_> = resolved
            .iter()
            .filter_map(|event| match event {
                Event::Push(v) => Some(v.raw()),
                _ => None,
            })
            .collect();
        assert_eq!(pushes, vec![3, 2, 1]);
        assert_eq!(resolved.len(), 9);
    }

    #[test]
    fn nested_bracket_splices_into_the_outer_chain() {
        let a = ProductionId::from_raw(0);
        let b = ProductionId::from_raw(1);
        // A grows around B, and B grows on its own inside that round.
        let events = vec![
            ParseEvent::lr_start(a),
            push(1),
            content("a"),
            pop(),
            push(2),
            ParseEvent::lr_start(b),
            push(3),
            ParseEvent::lr_suffix(a),
            content("y"),
            pop(),
            push(4),
            ParseEvent::lr_suffix(b),
            content("z"),
            pop(),
            ParseEvent::lr_end(b),
            content("x"),
            pop(),
            ParseEvent::lr_end(a),
        ];
        let resolved = resolve_left_recursion(&events).expect("resolves");
        let pushes: Vec<_> = resolved
            .iter()
            .filter_map(|event| match event {
                Event::Push(v) => Some(v.raw()),
                _ => None,
            })
            .collect();
        assert_eq!(pushes, vec![2, 4, 3, 1]);
        let texts: Vec<_> = resolved.iter().filter_map(Event::text).collect();
        assert_eq!(texts, vec!["a", "y", "z", "x"]);
    }

    #[test]
    fn suffix_without_bracket_is_an_error() {
        let e = ProductionId::from_raw(0);
        let events = vec![push(1), ParseEvent::lr_suffix(e), pop()];
        assert!(matches!(
            resolve_left_recursion(&events),
            Err(TreeError::UnpairedLeftRecursion { .. })
        ));
    }

    #[test]
    fn unclosed_bracket_is_an_error() {
        let e = ProductionId::from_raw(0);
        let events = vec![ParseEvent::lr_start(e), push(1), pop()];
        assert!(matches!(
            resolve_left_recursion(&events),
            Err(TreeError::UnpairedLeftRecursion { at: 0 })
        ));
    }
}
