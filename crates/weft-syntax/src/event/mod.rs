//! Parse events.
//!
//! A parse produces a flat trace describing a pre-order walk of the tree it
//! recognized: `Push` a variant, its content or children, then `Pop`. The
//! trace is later converted into nodes (see [`crate::tree::build_tree`]), and
//! trees are flattened back into the same shape for unparsing.
//!
//! Three event types share one vocabulary, [`EventKind`]:
//!
//! - [`Event`]: the events of a finished trace. Left-recursion bookkeeping
//!   and deferred checks cannot be represented here.
//! - [`ParseEvent`]: what the engine appends while parsing, including the
//!   ephemeral `LrStart`/`LrSuffix`/`LrEnd` brackets.
//! - [`UnparseEvent`]: what the unparser emits, including deferred
//!   lookahead checks.

mod chain;
mod resolve;

pub use chain::{Chain, Iter};
pub(crate) use resolve::resolve_left_recursion;

use std::fmt;
use std::sync::Arc;

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

use crate::grammar::{ParSer, ProductionId, VariantId};

/// Exhaustive list of event kinds across every trace type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Opens a node of a variant.
    Push,
    /// Closes the most recently opened node.
    Pop,
    /// Literal value of a leaf node.
    Content,
    /// A literal grammar string; not part of the tree.
    Token,
    /// Whitespace or a comment.
    Ignorable,
    /// Opens a left-recursion bracket.
    LrStart,
    /// Marks where a grown seed is reused by a left-recursive call.
    LrSuffix,
    /// Closes a left-recursion bracket.
    LrEnd,
    /// Source-position boundary emitted while flattening.
    PositionMark,
    /// Lookahead that can only be checked once trailing output is known.
    DelayedCheck,
}

/// An event of a finished trace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Event {
    /// Opens a node of the given variant.
    Push(VariantId),
    /// Closes the most recently opened node.
    Pop,
    /// Literal value of a leaf node.
    Content {
        /// The matched text.
        text: SmolStr,
        /// Byte offset of the text in the source.
        index: TextSize,
    },
    /// A literal grammar string such as a keyword or punctuation.
    Token {
        /// The matched text.
        text: SmolStr,
        /// Byte offset of the text in the source.
        index: TextSize,
    },
    /// Whitespace or a comment.
    Ignorable {
        /// The skipped text.
        text: SmolStr,
        /// Byte offset of the text in the source.
        index: TextSize,
    },
    /// The source position of the node opened by the preceding `Push`.
    PositionMark(TextRange),
}

impl Event {
    /// Creates a `Push` event.
    #[must_use]
    pub fn push(variant: VariantId) -> Self {
        Self::Push(variant)
    }

    /// Creates a `Pop` event.
    #[must_use]
    pub fn pop() -> Self {
        Self::Pop
    }

    /// Creates a `Content` event.
    #[must_use]
    pub fn content(text: impl Into<SmolStr>, index: TextSize) -> Self {
        Self::Content {
            text: text.into(),
            index,
        }
    }

    /// Creates a `Token` event.
    #[must_use]
    pub fn token(text: impl Into<SmolStr>, index: TextSize) -> Self {
        Self::Token {
            text: text.into(),
            index,
        }
    }

    /// Creates an `Ignorable` event.
    #[must_use]
    pub fn ignorable(text: impl Into<SmolStr>, index: TextSize) -> Self {
        Self::Ignorable {
            text: text.into(),
            index,
        }
    }

    /// Creates a `PositionMark` event.
    #[must_use]
    pub fn position_mark(range: TextRange) -> Self {
        Self::PositionMark(range)
    }

    /// The kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Push(_) => EventKind::Push,
            Self::Pop => EventKind::Pop,
            Self::Content { .. } => EventKind::Content,
            Self::Token { .. } => EventKind::Token,
            Self::Ignorable { .. } => EventKind::Ignorable,
            Self::PositionMark(_) => EventKind::PositionMark,
        }
    }

    /// Text carried by `Content`, `Token` and `Ignorable` events.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Content { text, .. } | Self::Token { text, .. } | Self::Ignorable { text, .. } => {
                Some(text.as_str())
            }
            _ => None,
        }
    }

    /// Source range covered by a text-carrying event.
    #[must_use]
    pub fn range(&self) -> Option<TextRange> {
        match self {
            Self::Content { text, index }
            | Self::Token { text, index }
            | Self::Ignorable { text, index } => {
                Some(TextRange::at(*index, TextSize::of(text.as_str())))
            }
            _ => None,
        }
    }
}

/// An event appended by the engine while a parse is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseEvent {
    /// An event that survives into the finished trace.
    Event(Event),
    /// A left-recursive production started seeding at this point.
    LrStart(ProductionId),
    /// A left-recursive call reused the current seed here. The nodes opened
    /// just before this marker wrap the seed.
    LrSuffix(ProductionId),
    /// The bracket opened by the matching `LrStart` is complete.
    LrEnd(ProductionId),
}

impl ParseEvent {
    /// Creates an `LrStart` marker.
    #[must_use]
    pub fn lr_start(production: ProductionId) -> Self {
        Self::LrStart(production)
    }

    /// Creates an `LrSuffix` marker.
    #[must_use]
    pub fn lr_suffix(production: ProductionId) -> Self {
        Self::LrSuffix(production)
    }

    /// Creates an `LrEnd` marker.
    #[must_use]
    pub fn lr_end(production: ProductionId) -> Self {
        Self::LrEnd(production)
    }

    /// The kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Event(event) => event.kind(),
            Self::LrStart(_) => EventKind::LrStart,
            Self::LrSuffix(_) => EventKind::LrSuffix,
            Self::LrEnd(_) => EventKind::LrEnd,
        }
    }

    /// The finished-trace event, if this is not left-recursion bookkeeping.
    #[must_use]
    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }
}

impl From<Event> for ParseEvent {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

/// A lookahead deferred until the unparser knows what follows it.
#[derive(Clone)]
pub struct DelayedCheck {
    /// The lookahead body.
    pub parser: Arc<ParSer>,
    /// `true` when the body must *not* match.
    pub negative: bool,
}

impl fmt::Debug for DelayedCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelayedCheck")
            .field("negative", &self.negative)
            .finish_non_exhaustive()
    }
}

impl PartialEq for DelayedCheck {
    fn eq(&self, other: &Self) -> bool {
        self.negative == other.negative && Arc::ptr_eq(&self.parser, &other.parser)
    }
}

/// An event emitted by the unparser.
#[derive(Debug, Clone, PartialEq)]
pub enum UnparseEvent {
    /// A token, content, ignorable, or position mark destined for output.
    Event(Event),
    /// A check to run once the trailing output is known.
    DelayedCheck(DelayedCheck),
}

impl UnparseEvent {
    /// Creates a `DelayedCheck` event.
    #[must_use]
    pub fn delayed_check(parser: Arc<ParSer>, negative: bool) -> Self {
        Self::DelayedCheck(DelayedCheck { parser, negative })
    }

    /// The kind of this event.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Event(event) => event.kind(),
            Self::DelayedCheck(_) => EventKind::DelayedCheck,
        }
    }
}

impl From<Event> for UnparseEvent {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

/// A finished, externally visible event trace.
///
/// Built either from a successful parse (with left-recursion brackets
/// resolved) or by flattening a tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    events: Vec<Event>,
}

impl Trace {
    /// Wraps a list of finished events.
    #[must_use]
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// The events in order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Consumes the trace and returns its events.
    #[must_use]
    pub fn into_events(self) -> Vec<Event> {
        self.events
    }

    /// Number of `Push` events.
    #[must_use]
    pub fn push_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| matches!(event, Event::Push(_)))
            .count()
    }

    /// Concatenated text of every `Content`, `Token` and `Ignorable` event.
    /// For a parse trace this reproduces the input exactly.
    #[must_use]
    pub fn text(&self) -> String {
        self.events.iter().filter_map(Event::text).collect()
    }
}

impl From<Vec<Event>> for Trace {
    fn from(events: Vec<Event>) -> Self {
        Self::new(events)
    }
}
