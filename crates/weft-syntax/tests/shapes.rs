mod common;
use common::*;

use text_size::TextRange;
use weft_syntax::postcondition::{variant_at_depth, Postcondition};

#[test]
fn wrapping_follows_the_delegate_chain() {
    let mut b = GrammarBuilder::new();
    let a = b.production("A");
    let bp = b.production("B");
    let c = b.production("C");
    let a_wraps = b.inner(a, "WrapB", ParSer::r(bp)).id();
    let b_wraps = b.inner(bp, "WrapC", ParSer::seq([ParSer::lit("["), ParSer::r(c), ParSer::lit("]")])).id();
    let leaf = b.leaf(c, "Id", ParSer::pattern("[a-z]+").unwrap()).id();
    let orphan = b.production("Orphan");
    b.inner(orphan, "Lone", ParSer::lit("?"));
    let g = b.build().unwrap();

    let range = TextRange::new(4.into(), 7.into());
    let node = Node::leaf(&g, leaf, "abc").unwrap().with_position(Some(range));
    let engine = Engine::new(&g);

    let wrapped = engine.try_to_coerce(&node, a).unwrap();
    assert_eq!(wrapped.variant(), a_wraps);
    assert_eq!(wrapped.source_position(), Some(range));
    let middle = &wrapped.children()[0];
    assert_eq!(middle.variant(), b_wraps);
    assert_eq!(middle.source_position(), Some(range));
    assert_eq!(&middle.children()[0], &node);
    assert!(engine.matches(&wrapped, a));

    assert!(engine.try_to_coerce(&node, orphan).is_none());
    assert_eq!(engine.try_to_coerce(&node, c).as_ref(), Some(&node));
}

#[test]
fn postconditions_read_depths_from_a_real_trace() {
    let s = sample();
    let parse = Engine::new(&s.grammar).parse(s.invocation, "f(1)").unwrap();
    let events = parse.trace().events();

    let at = |depth| variant_at_depth(events.iter().rev(), depth).map(|v| s.grammar.variant(v).qualified_name().to_string());
    assert_eq!(at(0).as_deref(), Some("Invocation.Call"));
    assert_eq!(at(1).as_deref(), Some("Factor.Call"));
    assert_eq!(at(2).as_deref(), Some("Expr.Term"));
    assert_eq!(at(9), None);

    assert!(Postcondition::new(1, s.call).check(events));
    assert!(!Postcondition::new(2, s.call).check(events));
}

#[test]
fn postcondition_depth_stops_at_the_end_of_the_last_child_chain() {
    let s = sample();
    let parse = Engine::new(&s.grammar).parse(s.expr, "1 * 2 + 3").unwrap();
    let events = parse.trace().events();

    let at = |depth| variant_at_depth(events.iter().rev(), depth).map(|v| s.grammar.variant(v).qualified_name().to_string());
    assert_eq!(at(0).as_deref(), Some("Expr.Add"));
    assert_eq!(at(1).as_deref(), Some("Term.Factor"));
    assert_eq!(at(3).as_deref(), Some("Number.Int"));
    // The product on the left nests deeper, but it is not on the chain.
    assert_eq!(at(4), None);
    assert_eq!(at(5), None);
}
