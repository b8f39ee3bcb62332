//! The ParSer engine.
//!
//! Every grammar variant is driven through four operations:
//!
//! - **parse**: text to a trace and a tree ([`Engine::parse`])
//! - **unparse**: a tree back to tokens and text ([`Engine::unparse`])
//! - **match**: does an existing tree or trace conform ([`Engine::matches`])
//! - **force fit**: coerce a raw string or a node into a production
//!   ([`Engine::force_fit`], [`Engine::try_to_coerce`])
//!
//! # Architecture
//!
//! Parsing is scannerless recursive descent with ordered choice. It runs in
//! three phases:
//!
//! 1. **Parsing**: combinators append to a persistent event chain, with
//!    left-recursion brackets around grown seeds
//! 2. **Resolution**: the brackets are rewritten into plain nesting
//! 3. **Tree Building**: the finished trace becomes a [`Node`]

mod coerce;
mod errors;
mod ignorables;
mod left_recursion;
mod parse;
mod render;
mod serial;

pub use errors::{ErrorSink, Expectation, FarthestFailure, NoErrors, ParseError};
pub use ignorables::LexicalConfig;
pub use render::{UnparseError, Unparsed};

use text_size::{TextRange, TextSize};
use tracing::debug;

use crate::event::{resolve_left_recursion, Event, Trace};
use crate::grammar::{Grammar, ParSer, ProductionId};
use crate::tree::{build_tree, Node, TreeError};
use ignorables::SkipMode;
use parse::{ParseCx, ParseResult, ParseState};

/// Options for one engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Enables non-standard productions and extension hooks.
    pub allow_non_standard: bool,
    /// Whitespace and comment conventions.
    pub lexical: LexicalConfig,
}

/// Counters collected during one parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Left-recursion frames opened.
    pub lr_frames: usize,
    /// Seed growth iterations that consumed more input.
    pub lr_growths: usize,
    /// Variants skipped because the next character cannot start them.
    pub pruned: usize,
}

/// Source text addressed by byte offset.
#[derive(Debug, Clone, Copy)]
pub struct Input<'a> {
    text: &'a str,
    allow_non_standard: bool,
}

impl<'a> Input<'a> {
    /// Standard input: non-standard productions never match.
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            allow_non_standard: false,
        }
    }

    /// Input that may use non-standard productions when `allow` is set.
    #[must_use]
    pub fn with_non_standard(text: &'a str, allow: bool) -> Self {
        Self {
            text,
            allow_non_standard: allow,
        }
    }

    /// The whole text.
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// Whether non-standard productions are enabled.
    #[must_use]
    pub fn allow_non_standard(&self) -> bool {
        self.allow_non_standard
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns `true` if the text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The character starting at `index`, if any.
    #[must_use]
    pub fn peek(&self, index: usize) -> Option<char> {
        self.text.get(index..).and_then(|rest| rest.chars().next())
    }

    /// The source range between two offsets.
    #[must_use]
    pub fn range(&self, start: usize, end: usize) -> TextRange {
        TextRange::new(to_text_size(start), to_text_size(end))
    }
}

/// Largest input a parse accepts: offsets must fit a [`TextSize`].
pub const MAX_INPUT_LEN: usize = u32::MAX as usize;

/// Converts a byte offset, saturating at [`MAX_INPUT_LEN`].
pub(crate) fn to_text_size(index: usize) -> TextSize {
    TextSize::try_from(index).unwrap_or_else(|_| TextSize::from(u32::MAX))
}

fn oversized(len: usize) -> Option<ParseError> {
    (len > MAX_INPUT_LEN).then(|| ParseError {
        message: format!("input of {len} bytes exceeds the {MAX_INPUT_LEN} byte limit"),
        range: TextRange::empty(TextSize::from(0)),
    })
}

/// Result of parsing source text.
#[derive(Debug)]
pub struct Parse {
    tree: Option<Node>,
    trace: Trace,
    error: Option<ParseError>,
    stats: ParseStats,
}

impl Parse {
    /// Returns `true` if the whole input was recognized.
    #[must_use]
    pub fn ok(&self) -> bool {
        self.tree.is_some()
    }

    /// The root node, if parsing succeeded.
    #[must_use]
    pub fn tree(&self) -> Option<&Node> {
        self.tree.as_ref()
    }

    /// Consumes the parse and returns its root node.
    #[must_use]
    pub fn into_tree(self) -> Option<Node> {
        self.tree
    }

    /// The farthest failure, if parsing failed.
    #[must_use]
    pub fn error(&self) -> Option<&ParseError> {
        self.error.as_ref()
    }

    /// The finished event trace. Empty when parsing failed.
    #[must_use]
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Counters for this parse.
    #[must_use]
    pub fn stats(&self) -> ParseStats {
        self.stats
    }
}

/// Drives a grammar in every direction.
///
/// An engine borrows an immutable [`Grammar`] and holds no other state, so
/// many engines may share one grammar across threads.
#[derive(Debug, Clone)]
pub struct Engine<'g> {
    grammar: &'g Grammar,
    options: ParseOptions,
}

impl<'g> Engine<'g> {
    /// An engine with default options.
    #[must_use]
    pub fn new(grammar: &'g Grammar) -> Self {
        Self::with_options(grammar, ParseOptions::default())
    }

    /// An engine with the given options.
    #[must_use]
    pub fn with_options(grammar: &'g Grammar, options: ParseOptions) -> Self {
        Self { grammar, options }
    }

    /// The grammar this engine drives.
    #[must_use]
    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// The options in effect.
    #[must_use]
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    fn input<'t>(&self, text: &'t str) -> Input<'t> {
        Input::with_non_standard(text, self.options.allow_non_standard)
    }

    /// Parses all of `text` as `production`.
    ///
    /// A text that does not match is an ordinary outcome: the returned
    /// [`Parse`] has no tree and carries the farthest failure. An `Err`
    /// means the grammar produced a malformed trace. Texts longer than
    /// [`MAX_INPUT_LEN`] are rejected without parsing.
    pub fn parse(&self, production: ProductionId, text: &str) -> Result<Parse, TreeError> {
        if let Some(error) = oversized(text.len()) {
            debug!(len = text.len(), "input too large");
            return Ok(Parse {
                tree: None,
                trace: Trace::default(),
                error: Some(error),
                stats: ParseStats::default(),
            });
        }
        let input = self.input(text);
        let mut cx = ParseCx::new(self.grammar, input, &self.options.lexical, FarthestFailure::new());
        let result = cx.parse(&ParSer::Ref(production), ParseState::default());
        let state = match result {
            ParseResult::Success { state, .. } => {
                let state = cx.skip(state, SkipMode::All);
                if state.index == input.len() {
                    Some(state)
                } else {
                    cx.expect(state.index, || Expectation::EndOfInput);
                    None
                }
            }
            ParseResult::Failure { .. } => None,
        };
        let (sink, stats) = cx.finish();

        let Some(state) = state else {
            let error = sink.to_error(text);
            debug!(production = self.grammar.production(production).name(), %error, "parse failed");
            return Ok(Parse {
                tree: None,
                trace: Trace::default(),
                error: Some(error),
                stats,
            });
        };
        let events = resolve_left_recursion(&state.events.to_vec())?;
        let tree = build_tree(self.grammar, &events)?;
        Ok(Parse {
            tree: Some(tree),
            trace: Trace::new(events),
            error: None,
            stats,
        })
    }

    /// Returns `true` if `node` is a well-formed `production`.
    #[must_use]
    pub fn matches(&self, node: &Node, production: ProductionId) -> bool {
        serial::matches(self.grammar, &self.options, &crate::tree::flatten_tree(node, None), production)
    }

    /// Returns `true` if `events` conform to `production`. Accepts both
    /// parse traces and flattened trees.
    #[must_use]
    pub fn matches_events(&self, events: &[Event], production: ProductionId) -> bool {
        serial::matches(self.grammar, &self.options, events, production)
    }

    /// Serializes `node` back to tokens and renders them as text.
    pub fn unparse(&self, node: &Node) -> Result<Unparsed, UnparseError> {
        self.unparse_events(&crate::tree::flatten_tree(node, None), node.production())
    }

    /// Serializes a flattened tree, or a parse trace, as `production`.
    pub fn unparse_events(&self, events: &[Event], production: ProductionId) -> Result<Unparsed, UnparseError> {
        let emitted = serial::unparse(self.grammar, &self.options, events, production)?;
        render::render(self.grammar, &self.options, &emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;

    fn additive() -> (Grammar, ProductionId) {
        let mut b = GrammarBuilder::new();
        let e = b.production("E");
        let t = b.production("T");
        b.inner(e, "Add", ParSer::seq([ParSer::r(e), ParSer::lit("+"), ParSer::r(t)]));
        b.inner(e, "T", ParSer::r(t));
        b.leaf(t, "Num", ParSer::pattern("[0-9]+").expect("pattern"));
        (b.build().expect("valid grammar"), e)
    }

    #[test]
    fn parse_keeps_every_character() {
        let (g, e) = additive();
        let parse = Engine::new(&g).parse(e, " 1 +2 ").expect("well-formed trace");
        assert!(parse.ok());
        assert_eq!(parse.trace().text(), " 1 +2 ");
        assert_eq!(parse.stats().lr_growths, 1);
    }

    #[test]
    fn trailing_garbage_is_reported() {
        let (g, e) = additive();
        let parse = Engine::new(&g).parse(e, "1 + 2 )").expect("well-formed trace");
        assert!(!parse.ok());
        assert!(parse.trace().events().is_empty());
        let error = parse.error().expect("error");
        assert_eq!(u32::from(error.range.start()), 6);
        assert!(error.message.contains("end of input"), "{}", error.message);
    }

    #[test]
    fn input_peeks_by_character() {
        let input = Input::new("é1");
        assert_eq!(input.peek(0), Some('é'));
        assert_eq!(input.peek(2), Some('1'));
        assert_eq!(input.peek(3), None);
        assert_eq!(input.peek(1), None);
        assert_eq!(input.range(0, 2), TextRange::new(0.into(), 2.into()));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn offsets_past_four_gib_are_refused() {
        assert!(oversized(MAX_INPUT_LEN).is_none());
        let error = oversized(MAX_INPUT_LEN + 1).expect("too large");
        assert_eq!(error.range, TextRange::empty(0.into()));
        assert!(error.message.contains("limit"), "{}", error.message);
        assert_eq!(to_text_size(MAX_INPUT_LEN + 1), TextSize::from(u32::MAX));
        assert_eq!(to_text_size(7), TextSize::from(7));
    }
}
