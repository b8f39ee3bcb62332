//! The parse direction of the combinators.
//!
//! A parse threads a [`ParseState`] through the combinators. The state is
//! cheap to clone: its event list is a persistent [`Chain`], so backtracking
//! is just dropping a clone.

use smol_str::SmolStr;
use text_size::TextSize;

use super::errors::{ErrorSink, Expectation};
use super::ignorables::{LexicalConfig, SkipMode};
use super::left_recursion::LrFrame;
use super::{Input, ParseStats};
use crate::event::{Chain, Event, ParseEvent};
use crate::grammar::{ContentPattern, ExtensionMode, Grammar, ParSer, ProductionId, VariantId};

/// Position in the input plus everything emitted so far.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParseState {
    pub(crate) index: usize,
    pub(crate) events: Chain<ParseEvent>,
    /// How many trailing events a later combinator may still rewrite.
    pub(crate) write_back: usize,
}

impl ParseState {
    pub(crate) fn at(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub(crate) fn emit(&self, event: impl Into<ParseEvent>, index: usize, write_back: usize) -> Self {
        Self {
            index,
            events: self.events.push(event.into()),
            write_back,
        }
    }
}

/// Left-recursive productions a result depended on being blocked.
///
/// A seed whose exclusions name its own production was cut short by the
/// recursion guard and may grow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LrExclusions(Vec<ProductionId>);

impl LrExclusions {
    pub(crate) fn single(production: ProductionId) -> Self {
        Self(vec![production])
    }

    pub(crate) fn contains(&self, production: ProductionId) -> bool {
        self.0.binary_search(&production).is_ok()
    }

    pub(crate) fn extend(&mut self, other: &Self) {
        for production in &other.0 {
            if let Err(at) = self.0.binary_search(production) {
                self.0.insert(at, *production);
            }
        }
    }

    pub(crate) fn without(mut self, production: ProductionId) -> Self {
        self.0.retain(|p| *p != production);
        self
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug)]
pub(crate) enum ParseResult {
    Success {
        state: ParseState,
        exclusions: LrExclusions,
    },
    Failure {
        exclusions: LrExclusions,
    },
}

impl ParseResult {
    fn failure() -> Self {
        Self::Failure {
            exclusions: LrExclusions::default(),
        }
    }

    fn success(state: ParseState) -> Self {
        Self::Success {
            state,
            exclusions: LrExclusions::default(),
        }
    }

    pub(crate) fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// One parse in progress.
pub(crate) struct ParseCx<'a, S> {
    pub(crate) grammar: &'a Grammar,
    pub(crate) input: Input<'a>,
    pub(crate) lexical: &'a LexicalConfig,
    pub(crate) sink: S,
    pub(crate) frames: Vec<LrFrame>,
    pub(crate) stats: ParseStats,
    quiet: usize,
}

fn offset(index: usize) -> TextSize {
    super::to_text_size(index)
}

impl<'a, S: ErrorSink> ParseCx<'a, S> {
    pub(crate) fn new(grammar: &'a Grammar, input: Input<'a>, lexical: &'a LexicalConfig, sink: S) -> Self {
        Self {
            grammar,
            input,
            lexical,
            sink,
            frames: Vec::new(),
            stats: ParseStats::default(),
            quiet: 0,
        }
    }

    pub(crate) fn finish(self) -> (S, ParseStats) {
        (self.sink, self.stats)
    }

    fn rest(&self, index: usize) -> &'a str {
        self.input.text().get(index..).unwrap_or_default()
    }

    pub(crate) fn expect(&mut self, index: usize, expected: impl FnOnce() -> Expectation) {
        if self.quiet == 0 && self.sink.wants(index) {
            self.sink.note(index, expected());
        }
    }

    /// Emits one `Ignorable` per whitespace run or comment at the cursor.
    pub(crate) fn skip(&self, state: ParseState, mode: SkipMode) -> ParseState {
        let mut state = state;
        while let Some(len) = self.lexical.next_ignorable(self.rest(state.index), mode) {
            let end = state.index + len;
            let text = &self.input.text()[state.index..end];
            state = state.emit(Event::ignorable(text, offset(state.index)), end, 0);
        }
        state
    }

    pub(crate) fn parse(&mut self, parser: &ParSer, state: ParseState) -> ParseResult {
        match parser {
            ParSer::Empty => ParseResult::success(state),
            ParSer::End => {
                let state = self.skip(state, SkipMode::All);
                if state.index == self.input.len() {
                    ParseResult::success(state)
                } else {
                    self.expect(state.index, || Expectation::EndOfInput);
                    ParseResult::failure()
                }
            }
            ParSer::Literal(_) | ParSer::Pattern(_) => {
                let state = self.skip(state, SkipMode::All);
                self.token(parser, state)
            }
            ParSer::Comment(pattern) => self.comment(pattern, state),
            ParSer::Ref(production) => self.parse_production(*production, state),
            ParSer::Seq(parts) => {
                let mut state = state;
                let mut exclusions = LrExclusions::default();
                for part in parts {
                    match self.parse(part, state) {
                        ParseResult::Success {
                            state: next,
                            exclusions: more,
                        } => {
                            exclusions.extend(&more);
                            state = next;
                        }
                        ParseResult::Failure { exclusions: more } => {
                            exclusions.extend(&more);
                            return ParseResult::Failure { exclusions };
                        }
                    }
                }
                ParseResult::Success { state, exclusions }
            }
            ParSer::Alt(alternatives) => {
                let mut exclusions = LrExclusions::default();
                for alternative in alternatives {
                    match self.parse(alternative, state.clone()) {
                        ParseResult::Success {
                            state,
                            exclusions: more,
                        } => {
                            exclusions.extend(&more);
                            return ParseResult::Success { state, exclusions };
                        }
                        ParseResult::Failure { exclusions: more } => exclusions.extend(&more),
                    }
                }
                ParseResult::Failure { exclusions }
            }
            ParSer::Repeat { body, min } => {
                let mut state = state;
                let mut exclusions = LrExclusions::default();
                let mut count = 0usize;
                loop {
                    match self.parse(body, state.clone()) {
                        ParseResult::Success {
                            state: next,
                            exclusions: more,
                        } => {
                            exclusions.extend(&more);
                            if next.index == state.index {
                                // An empty match satisfies any minimum once.
                                if count < *min {
                                    count = *min;
                                    state = next;
                                }
                                break;
                            }
                            state = next;
                            count += 1;
                        }
                        ParseResult::Failure { exclusions: more } => {
                            exclusions.extend(&more);
                            break;
                        }
                    }
                }
                if count >= *min {
                    ParseResult::Success { state, exclusions }
                } else {
                    ParseResult::Failure { exclusions }
                }
            }
            ParSer::Optional(body) => match self.parse(body, state.clone()) {
                success @ ParseResult::Success { .. } => success,
                ParseResult::Failure { exclusions } => ParseResult::Success { state, exclusions },
            },
            ParSer::Lookahead { body, negative } => {
                if *negative {
                    self.quiet += 1;
                }
                let result = self.parse(body, state.clone());
                if *negative {
                    self.quiet -= 1;
                }
                match (result, *negative) {
                    (ParseResult::Success { exclusions, .. }, false)
                    | (ParseResult::Failure { exclusions }, true) => {
                        ParseResult::Success { state, exclusions }
                    }
                    (ParseResult::Success { exclusions, .. }, true)
                    | (ParseResult::Failure { exclusions }, false) => {
                        ParseResult::Failure { exclusions }
                    }
                }
            }
            ParSer::Glue(parts) => self.glue(parts, state),
        }
    }

    fn token(&mut self, parser: &ParSer, state: ParseState) -> ParseResult {
        let rest = self.rest(state.index);
        match parser {
            ParSer::Literal(text) => {
                if rest.starts_with(text.as_str()) {
                    let event = Event::token(text.clone(), offset(state.index));
                    ParseResult::success(state.emit(event, state.index + text.len(), 1))
                } else {
                    self.expect(state.index, || Expectation::Literal(text.clone()));
                    ParseResult::failure()
                }
            }
            ParSer::Pattern(pattern) => match pattern.match_prefix(rest) {
                Some(len) if len > 0 => {
                    let event = Event::content(&rest[..len], offset(state.index));
                    ParseResult::success(state.emit(event, state.index + len, 1))
                }
                _ => {
                    self.expect(state.index, || Expectation::Pattern(pattern.source().into()));
                    ParseResult::failure()
                }
            },
            _ => ParseResult::failure(),
        }
    }

    fn comment(&mut self, pattern: &ContentPattern, state: ParseState) -> ParseResult {
        let state = self.skip(state, SkipMode::Whitespace);
        let rest = self.rest(state.index);
        match pattern.match_prefix(rest) {
            Some(len) if len > 0 => {
                let event = Event::ignorable(&rest[..len], offset(state.index));
                ParseResult::success(state.emit(event, state.index + len, 0))
            }
            _ => ParseResult::failure(),
        }
    }

    /// Parses adjacent token-level parts, folding each new token into the
    /// previous one through the write-back window.
    fn glue(&mut self, parts: &[ParSer], state: ParseState) -> ParseResult {
        let mut state = self.skip(state, SkipMode::All);
        for (i, part) in parts.iter().enumerate() {
            if i > 0 && state.write_back == 0 {
                return ParseResult::failure();
            }
            let next = match self.token(part, self.skip(state, SkipMode::None)) {
                ParseResult::Success { state, .. } => state,
                failure @ ParseResult::Failure { .. } => return failure,
            };
            state = if i == 0 { next } else { merge_last_two(next) };
        }
        ParseResult::success(state)
    }

    pub(crate) fn parse_production(&mut self, production: ProductionId, state: ParseState) -> ParseResult {
        let grammar = self.grammar;
        let decl = grammar.production(production);
        let extended = self.input.allow_non_standard();
        if decl.is_non_standard() && !extended {
            return ParseResult::failure();
        }
        if extended {
            if let Some(extension) = grammar.extension(production) {
                let result = self.parse(&extension.parser, state.clone());
                if extension.mode == ExtensionMode::Instead || result.is_success() {
                    return result;
                }
            }
        }

        let mode = if decl.opens_with_comment {
            SkipMode::Whitespace
        } else {
            SkipMode::All
        };
        let state = self.skip(state, mode);
        if decl.is_left_recursive() {
            self.parse_left_recursive(production, state)
        } else {
            self.parse_variants(production, state, false)
        }
    }

    /// Ordered choice over the variants of `production`, pruned by
    /// lookahead. With `lr_only`, only left-recursive variants are tried.
    pub(crate) fn parse_variants(
        &mut self,
        production: ProductionId,
        state: ParseState,
        lr_only: bool,
    ) -> ParseResult {
        let grammar = self.grammar;
        let decl = grammar.production(production);
        let peek_at = self.lexical.skip_all(self.input.text(), state.index);
        let next = self.input.peek(peek_at);

        let mut exclusions = LrExclusions::default();
        let mut tried = false;
        for variant in decl.variants() {
            let vdecl = grammar.variant(*variant);
            if lr_only && !vdecl.is_left_recursive() {
                continue;
            }
            let lookahead = if self.input.allow_non_standard() {
                vdecl.extended_lookahead()
            } else {
                vdecl.lookahead()
            };
            if !lookahead.admits(next) {
                self.stats.pruned += 1;
                continue;
            }
            tried = true;
            match self.parse_variant(*variant, state.clone()) {
                ParseResult::Success {
                    state,
                    exclusions: more,
                } => {
                    exclusions.extend(&more);
                    return ParseResult::Success { state, exclusions };
                }
                ParseResult::Failure { exclusions: more } => exclusions.extend(&more),
            }
        }
        if !tried {
            let name = &decl.name;
            self.expect(peek_at, || Expectation::Production(SmolStr::clone(name)));
        }
        ParseResult::Failure { exclusions }
    }

    fn parse_variant(&mut self, variant: VariantId, state: ParseState) -> ParseResult {
        let grammar = self.grammar;
        let decl = grammar.variant(variant);
        let opened = state.emit(Event::push(variant), state.index, 0);
        match self.parse(&decl.body, opened) {
            ParseResult::Success { state, exclusions } => {
                let closed = state.emit(Event::pop(), state.index, 0);
                if let Some(postcondition) = decl.postcondition() {
                    if !postcondition.check_chain(&closed.events) {
                        return ParseResult::Failure { exclusions };
                    }
                }
                ParseResult::Success {
                    state: closed,
                    exclusions,
                }
            }
            failure @ ParseResult::Failure { .. } => failure,
        }
    }
}

/// Rewrites the last two token-level events into one.
fn merge_last_two(state: ParseState) -> ParseState {
    let merged = state.events.split_last().and_then(|(last, rest)| {
        let (prev, rest) = rest.split_last()?;
        let (ParseEvent::Event(prev), ParseEvent::Event(last)) = (prev, last) else {
            return None;
        };
        let text = format!("{}{}", prev.text()?, last.text()?);
        let event = match prev {
            Event::Content { index, .. } => Event::content(text, *index),
            Event::Token { index, .. } => Event::token(text, *index),
            _ => return None,
        };
        Some(rest.push(event.into()))
    });
    match merged {
        Some(events) => ParseState {
            index: state.index,
            events,
            write_back: 1,
        },
        None => state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::errors::NoErrors;
    use crate::grammar::GrammarBuilder;

    fn run(grammar: &Grammar, parser: &ParSer, text: &str) -> Option<(usize, Vec<Event>)> {
        let lexical = LexicalConfig::default();
        let mut cx = ParseCx::new(grammar, Input::new(text), &lexical, NoErrors);
        match cx.parse(parser, ParseState::default()) {
            ParseResult::Success { state, .. } => Some((
                state.index,
                state
                    .events
                    .to_vec()
                    .into_iter()
                    .filter_map(|e| e.as_event().cloned())
                    .collect(),
            )),
            ParseResult::Failure { .. } => None,
        }
    }

    fn dummy() -> Grammar {
        let mut b = GrammarBuilder::new();
        let p = b.production("P");
        b.inner(p, "X", ParSer::lit("x"));
        b.build().expect("valid grammar")
    }

    #[test]
    fn ordered_choice_keeps_the_first_success() {
        let g = dummy();
        let parser = ParSer::alt([ParSer::lit("a"), ParSer::lit("ab")]);
        let (end, _) = run(&g, &parser, "ab").expect("matches");
        assert_eq!(end, 1);
    }

    #[test]
    fn ignorables_are_recorded() {
        let g = dummy();
        let parser = ParSer::seq([ParSer::lit("a"), ParSer::lit("b")]);
        let (end, events) = run(&g, &parser, "a /* c */ b").expect("matches");
        assert_eq!(end, 11);
        let texts: Vec<_> = events.iter().filter_map(Event::text).collect();
        assert_eq!(texts, vec!["a", " ", "/* c */", " ", "b"]);
    }

    #[test]
    fn glue_rejects_gaps_and_merges_tokens() {
        let g = dummy();
        let shift = ParSer::glue([ParSer::lit(">"), ParSer::lit(">")]);
        let (end, events) = run(&g, &shift, " >>").expect("matches");
        assert_eq!(end, 3);
        assert_eq!(events.last(), Some(&Event::token(">>", TextSize::from(1))));
        assert!(run(&g, &shift, "> >").is_none());
    }

    #[test]
    fn repetition_respects_its_minimum() {
        let g = dummy();
        let digits = ParSer::pattern("[0-9]").expect("pattern").plus();
        assert_eq!(run(&g, &digits, "123x").map(|(end, _)| end), Some(3));
        assert!(run(&g, &digits, "x").is_none());
    }

    #[test]
    fn lookahead_consumes_nothing() {
        let g = dummy();
        let parser = ParSer::seq([ParSer::lit("a"), ParSer::lit(";").followed_by()]);
        assert_eq!(run(&g, &parser, "a;").map(|(end, _)| end), Some(1));
        let negative = ParSer::seq([ParSer::lit("a"), ParSer::lit(";").not_followed_by()]);
        assert!(run(&g, &negative, "a;").is_none());
        assert_eq!(run(&g, &negative, "a,").map(|(end, _)| end), Some(1));
    }

    #[test]
    fn end_matches_only_trailing_ignorables() {
        let g = dummy();
        let parser = ParSer::seq([ParSer::lit("a"), ParSer::End]);
        assert_eq!(run(&g, &parser, "a  ").map(|(end, _)| end), Some(3));
        assert!(run(&g, &parser, "a b").is_none());
    }

    #[test]
    fn exclusions_merge_sorted() {
        let a = ProductionId::from_raw(3);
        let b = ProductionId::from_raw(1);
        let mut set = LrExclusions::single(a);
        set.extend(&LrExclusions::single(b));
        set.extend(&LrExclusions::single(a));
        assert!(set.contains(a) && set.contains(b));
        let set = set.without(a).without(b);
        assert!(set.is_empty());
    }
}
