//! Unparse output to text.

use smol_str::SmolStr;
use text_size::TextSize;
use thiserror::Error;
use tracing::trace;

use super::errors::NoErrors;
use super::ignorables::LexicalConfig;
use super::parse::{ParseCx, ParseState};
use super::{Input, ParseOptions};
use crate::event::{DelayedCheck, Event, UnparseEvent};
use crate::grammar::Grammar;

/// Failure to turn a tree back into text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnparseError {
    /// The tree is not a well-formed instance of the production.
    #[error("tree does not conform to `{production}`")]
    DoesNotConform {
        /// Name of the production.
        production: SmolStr,
    },
    /// A lookahead deferred during unparsing rejected the rendered text.
    #[error("lookahead failed at offset {offset} of the rendered text")]
    DelayedCheckFailed {
        /// Byte offset in the rendered text.
        offset: usize,
    },
}

/// A tree rendered back to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unparsed {
    events: Vec<Event>,
    text: String,
}

impl Unparsed {
    /// Printed events, indexed into [`Unparsed::text`], plus position marks.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// The rendered text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consumes the result and returns the rendered text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }

    /// Token and content texts in order, without ignorables.
    #[must_use]
    pub fn tokens(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter(|event| matches!(event, Event::Token { .. } | Event::Content { .. }))
            .filter_map(Event::text)
            .collect()
    }
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_operator(c: char) -> bool {
    "+-*/<>=!&|%^~:.?".contains(c)
}

/// Two pieces that would lex as one if printed back to back.
fn fuses(prev: char, next: char) -> bool {
    (is_word(prev) && is_word(next)) || (is_operator(prev) && is_operator(next))
}

#[derive(Default)]
struct Renderer {
    text: String,
    events: Vec<Event>,
    pending_break: bool,
    pending_space: bool,
}

impl Renderer {
    /// Appends `piece`, separating it from what came before if needed, and
    /// returns where it starts.
    fn place(&mut self, piece: &str) -> TextSize {
        let next = piece.chars().next();
        let starts_blank = next.is_some_and(char::is_whitespace);
        if self.pending_break && !starts_blank {
            self.text.push('\n');
        } else if let (Some(prev), Some(next)) = (self.text.chars().next_back(), next) {
            if (self.pending_space && !starts_blank) || fuses(prev, next) {
                self.text.push(' ');
            }
        }
        self.pending_break = false;
        self.pending_space = false;
        let start = super::to_text_size(self.text.len());
        self.text.push_str(piece);
        start
    }

    fn push(&mut self, lexical: &LexicalConfig, event: &Event) {
        let rendered = match event {
            Event::Token { text, .. } => Event::token(text.clone(), self.place(text)),
            Event::Content { text, .. } => Event::content(text.clone(), self.place(text)),
            Event::Ignorable { text, .. } => {
                let event = Event::ignorable(text.clone(), self.place(text));
                if lexical.is_line_comment(text) {
                    self.pending_break = true;
                } else if !text.chars().all(char::is_whitespace) {
                    self.pending_space = true;
                }
                event
            }
            Event::Push(_) | Event::Pop | Event::PositionMark(_) => event.clone(),
        };
        self.events.push(rendered);
    }
}

/// Renders unparse output with minimal spacing, then runs the deferred
/// lookaheads against the result.
pub(crate) fn render(grammar: &Grammar, options: &ParseOptions, emitted: &[UnparseEvent]) -> Result<Unparsed, UnparseError> {
    let mut renderer = Renderer::default();
    let mut checks: Vec<(usize, &DelayedCheck)> = Vec::new();
    for event in emitted {
        match event {
            UnparseEvent::Event(event) => renderer.push(&options.lexical, event),
            UnparseEvent::DelayedCheck(check) => checks.push((renderer.text.len(), check)),
        }
    }

    let input = Input::with_non_standard(&renderer.text, options.allow_non_standard);
    for (offset, check) in checks {
        let mut cx = ParseCx::new(grammar, input, &options.lexical, NoErrors);
        let matched = cx.parse(&check.parser, ParseState::at(offset)).is_success();
        trace!(offset, matched, negative = check.negative, "deferred lookahead");
        if matched == check.negative {
            return Err(UnparseError::DelayedCheckFailed { offset });
        }
    }
    Ok(Unparsed {
        events: renderer.events,
        text: renderer.text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(pieces: &[Event]) -> String {
        let mut renderer = Renderer::default();
        let lexical = LexicalConfig::default();
        for piece in pieces {
            renderer.push(&lexical, piece);
        }
        renderer.text
    }

    fn tok(text: &str) -> Event {
        Event::token(text, TextSize::default())
    }

    #[test]
    fn spaces_only_where_tokens_would_fuse() {
        assert_eq!(rendered(&[tok("a"), tok("("), tok("b"), tok(")")]), "a(b)");
        assert_eq!(rendered(&[tok("let"), tok("x"), tok("="), tok("-"), tok("1")]), "let x= -1");
        assert_eq!(rendered(&[tok("1"), tok("+"), tok("2")]), "1+2");
    }

    #[test]
    fn comments_are_kept_apart() {
        let line = Event::ignorable("// note", TextSize::default());
        assert_eq!(rendered(&[tok("a"), line, tok("b")]), "a// note\nb");
        let block = Event::ignorable("/* c */", TextSize::default());
        assert_eq!(rendered(&[tok("+"), block, tok("b")]), "+ /* c */ b");
    }

    #[test]
    fn events_are_reindexed() {
        let mut renderer = Renderer::default();
        let lexical = LexicalConfig::default();
        renderer.push(&lexical, &tok("x"));
        renderer.push(&lexical, &tok("y"));
        assert_eq!(renderer.events[1], Event::token("y", TextSize::from(2)));
    }
}
