//! The unparse and match directions.
//!
//! Both walk an existing event list (a flattened tree or a parse trace)
//! against the combinators. Unparsing records what it would print; matching
//! records nothing. One walker serves both through [`Emit`].
//!
//! Flattened trees carry no tokens and no anonymous nodes, so a literal that
//! is not present is printed anyway, and a production whose node is missing
//! is tried through its anonymous variants.

use std::sync::Arc;

use text_size::TextSize;

use super::render::UnparseError;
use super::ParseOptions;
use crate::event::{Chain, Event, UnparseEvent};
use crate::grammar::{ContentPattern, ExtensionMode, Grammar, ParSer, ProductionId, VariantId};

/// Output of a walk.
pub(crate) trait Emit: Clone {
    fn emit(&self, event: impl FnOnce() -> UnparseEvent) -> Self;
}

impl Emit for () {
    fn emit(&self, _event: impl FnOnce() -> UnparseEvent) -> Self {}
}

impl Emit for Chain<UnparseEvent> {
    fn emit(&self, event: impl FnOnce() -> UnparseEvent) -> Self {
        self.push(event())
    }
}

#[derive(Debug, Clone)]
struct SerialState<O> {
    pos: usize,
    out: O,
}

impl<O: Emit> SerialState<O> {
    fn start(out: O) -> Self {
        Self { pos: 0, out }
    }

    fn consume(self, count: usize, event: impl FnOnce() -> UnparseEvent) -> Self {
        Self {
            pos: self.pos + count,
            out: self.out.emit(event),
        }
    }
}

struct Walker<'a> {
    grammar: &'a Grammar,
    events: &'a [Event],
    allow_non_standard: bool,
    active_anon: Vec<(ProductionId, usize)>,
}

/// Returns `true` if `events` form exactly one `production`, allowing
/// ignorables around it.
pub(crate) fn matches(grammar: &Grammar, options: &ParseOptions, events: &[Event], production: ProductionId) -> bool {
    let mut walker = Walker::new(grammar, events, options.allow_non_standard);
    walker
        .walk_production(production, SerialState::start(()), true)
        .map(|state| walker.passthrough(state, true))
        .is_some_and(|state| state.pos == events.len())
}

/// Walks `events` as `production`, returning the events to print.
pub(crate) fn unparse(
    grammar: &Grammar,
    options: &ParseOptions,
    events: &[Event],
    production: ProductionId,
) -> Result<Vec<UnparseEvent>, UnparseError> {
    let mut walker = Walker::new(grammar, events, options.allow_non_standard);
    walker
        .walk_production(production, SerialState::start(Chain::new()), true)
        .map(|state| walker.passthrough(state, true))
        .filter(|state| state.pos == events.len())
        .map(|state| state.out.to_vec())
        .ok_or_else(|| UnparseError::DoesNotConform {
            production: grammar.production(production).name().into(),
        })
}

impl<'a> Walker<'a> {
    fn new(grammar: &'a Grammar, events: &'a [Event], allow_non_standard: bool) -> Self {
        Self {
            grammar,
            events,
            allow_non_standard,
            active_anon: Vec::new(),
        }
    }

    /// Copies position marks, and ignorables when asked, to the output.
    fn passthrough<O: Emit>(&self, state: SerialState<O>, ignorables: bool) -> SerialState<O> {
        let mut state = state;
        while let Some(event) = self.events.get(state.pos) {
            let skip = match event {
                Event::PositionMark(_) => true,
                Event::Ignorable { .. } => ignorables,
                _ => false,
            };
            if !skip {
                break;
            }
            state = state.consume(1, || event.clone().into());
        }
        state
    }

    fn walk<O: Emit>(&mut self, parser: &ParSer, state: SerialState<O>) -> Option<SerialState<O>> {
        match parser {
            ParSer::Empty | ParSer::End => Some(state),
            ParSer::Literal(text) => {
                let state = self.passthrough(state, true);
                let count = match self.events.get(state.pos) {
                    Some(Event::Token { text: found, .. }) if found == text => 1,
                    Some(Event::Token { .. }) => return None,
                    _ => 0,
                };
                Some(state.consume(count, || Event::token(text.clone(), TextSize::default()).into()))
            }
            ParSer::Pattern(pattern) => {
                let state = self.passthrough(state, true);
                match self.events.get(state.pos) {
                    Some(Event::Content { text, .. }) if pattern.matches_whole(text) => {
                        Some(state.consume(1, || Event::content(text.clone(), TextSize::default()).into()))
                    }
                    _ => None,
                }
            }
            ParSer::Comment(pattern) => self.comment(pattern, state),
            ParSer::Ref(production) => self.walk_production(*production, state, false),
            ParSer::Seq(parts) => {
                let mut state = state;
                for part in parts {
                    state = self.walk(part, state)?;
                }
                Some(state)
            }
            ParSer::Alt(alternatives) => alternatives
                .iter()
                .find_map(|alternative| self.walk(alternative, state.clone())),
            ParSer::Repeat { body, min } => {
                let mut state = state;
                let mut count = 0usize;
                while let Some(next) = self.walk(body, state.clone()) {
                    if next.pos == state.pos {
                        if count < *min {
                            count = *min;
                            state = next;
                        }
                        break;
                    }
                    state = next;
                    count += 1;
                }
                (count >= *min).then_some(state)
            }
            ParSer::Optional(body) => match self.walk(body, state.clone()) {
                Some(next) => Some(next),
                None => Some(state),
            },
            ParSer::Lookahead { body, negative } => {
                let negative = *negative;
                Some(state.consume(0, || UnparseEvent::delayed_check(Arc::clone(body), negative)))
            }
            ParSer::Glue(parts) => self.glue(parts, state),
        }
    }

    fn comment<O: Emit>(&mut self, pattern: &ContentPattern, state: SerialState<O>) -> Option<SerialState<O>> {
        let state = self.passthrough(state, false);
        match self.events.get(state.pos) {
            Some(Event::Ignorable { text, .. } | Event::Content { text, .. }) if pattern.matches_whole(text) => {
                Some(state.consume(1, || Event::ignorable(text.clone(), TextSize::default()).into()))
            }
            _ => None,
        }
    }

    fn glue<O: Emit>(&mut self, parts: &[ParSer], state: SerialState<O>) -> Option<SerialState<O>> {
        let state = self.passthrough(state, true);
        match self.events.get(state.pos) {
            Some(Event::Token { text, .. }) => {
                glue_matches(parts, text).then(|| state.consume(1, || Event::token(text.clone(), TextSize::default()).into()))
            }
            Some(Event::Content { text, .. }) if glue_matches(parts, text) => {
                Some(state.consume(1, || Event::content(text.clone(), TextSize::default()).into()))
            }
            _ => {
                let mut joined = String::new();
                for part in parts {
                    match part {
                        ParSer::Literal(text) => joined.push_str(text),
                        _ => return None,
                    }
                }
                Some(state.consume(0, || Event::token(joined, TextSize::default()).into()))
            }
        }
    }

    fn walk_production<O: Emit>(
        &mut self,
        production: ProductionId,
        state: SerialState<O>,
        entry: bool,
    ) -> Option<SerialState<O>> {
        let grammar = self.grammar;
        let decl = grammar.production(production);
        if decl.is_non_standard() && !entry && !self.allow_non_standard {
            return None;
        }
        if self.allow_non_standard {
            if let Some(extension) = grammar.extension(production) {
                let result = self.walk(&extension.parser, state.clone());
                if extension.mode == ExtensionMode::Instead || result.is_some() {
                    return result;
                }
            }
        }

        let state = self.passthrough(state, true);
        if let Some(Event::Push(variant)) = self.events.get(state.pos) {
            if grammar.variant(*variant).production() == production {
                if let Some(done) = self.walk_variant(*variant, state.clone()) {
                    return Some(done);
                }
            }
        }

        let key = (production, state.pos);
        if self.active_anon.contains(&key) {
            return None;
        }
        for variant in decl.variants() {
            let vdecl = grammar.variant(*variant);
            if !vdecl.is_anon() {
                continue;
            }
            self.active_anon.push(key);
            let result = self.walk(vdecl.body(), state.clone());
            self.active_anon.pop();
            if result.is_some() {
                return result;
            }
        }
        None
    }

    fn walk_variant<O: Emit>(&mut self, variant: VariantId, state: SerialState<O>) -> Option<SerialState<O>> {
        let decl = self.grammar.variant(variant);
        let opened = SerialState {
            pos: state.pos + 1,
            out: state.out,
        };
        let state = self.walk(decl.body(), opened)?;
        let state = self.passthrough(state, true);
        if !matches!(self.events.get(state.pos), Some(Event::Pop)) {
            return None;
        }
        let pos = state.pos + 1;
        if let Some(postcondition) = decl.postcondition() {
            if !postcondition.check(&self.events[..pos]) {
                return None;
            }
        }
        Some(SerialState { pos, out: state.out })
    }
}

/// Returns `true` if `text` splits into the glued parts, in order.
fn glue_matches(parts: &[ParSer], text: &str) -> bool {
    let mut rest = text;
    for part in parts {
        let len = match part {
            ParSer::Literal(literal) if rest.starts_with(literal.as_str()) => literal.len(),
            ParSer::Pattern(pattern) => match pattern.match_prefix(rest) {
                Some(len) if len > 0 => len,
                _ => return false,
            },
            _ => return false,
        };
        rest = &rest[len..];
    }
    rest.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;
    use crate::tree::{flatten_tree, Node};

    fn grouped() -> (Grammar, ProductionId, ProductionId, VariantId, VariantId) {
        let mut b = GrammarBuilder::new();
        let list = b.production("List");
        let item = b.production("Item");
        let items = b
            .inner(
                list,
                "Items",
                ParSer::seq([
                    ParSer::lit("["),
                    ParSer::seq([ParSer::r(item), ParSer::seq([ParSer::lit(","), ParSer::r(item)]).star()]).opt(),
                    ParSer::lit("]"),
                ]),
            )
            .id();
        let num = b.leaf(item, "Num", ParSer::pattern("[0-9]+").expect("pattern")).id();
        b.inner(item, "Nested", ParSer::r(list)).anon();
        (b.build().expect("valid grammar"), list, item, items, num)
    }

    fn tokens(events: &[UnparseEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|event| match event {
                UnparseEvent::Event(event) => event.text().map(str::to_string),
                UnparseEvent::DelayedCheck(_) => None,
            })
            .collect()
    }

    #[test]
    fn unparse_restores_tokens_and_anonymous_groups() {
        let (g, list, _, items, num) = grouped();
        let one = Node::leaf(&g, num, "1").expect("leaf");
        let inner = Node::inner(&g, items, vec![one.clone()]).expect("inner");
        let outer = Node::inner(&g, items, vec![inner, one]).expect("inner");
        let events = flatten_tree(&outer, None);
        let out = unparse(&g, &ParseOptions::default(), &events, list).expect("conforms");
        assert_eq!(tokens(&out), vec!["[", "[", "1", "]", ",", "1", "]"]);
    }

    #[test]
    fn match_rejects_wrong_content() {
        let (g, list, item, items, num) = grouped();
        let options = ParseOptions::default();
        let bad = Node::leaf(&g, num, "x").expect("leaf");
        let events = flatten_tree(&Node::inner(&g, items, vec![bad]).expect("inner"), None);
        assert!(!matches(&g, &options, &events, list));

        let good = Node::leaf(&g, num, "7").expect("leaf");
        let events = flatten_tree(&good, None);
        assert!(matches(&g, &options, &events, item));
        assert!(!matches(&g, &options, &events, list));
    }

    #[test]
    fn glued_text_must_split_into_parts() {
        let parts = [ParSer::lit("<"), ParSer::lit("<")];
        assert!(glue_matches(&parts, "<<"));
        assert!(!glue_matches(&parts, "<"));
        assert!(!glue_matches(&parts, "<<<"));
    }
}
