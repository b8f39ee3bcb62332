//! Failure reporting.
//!
//! Failing is ordinary control flow for a backtracking parser, so failures
//! are not errors until the whole parse gives up. Until then the engine only
//! tells an [`ErrorSink`] what it expected where.

use std::fmt;

use smol_str::SmolStr;
use text_size::{TextRange, TextSize};

/// Something the parser was prepared to accept.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expectation {
    /// A literal token.
    Literal(SmolStr),
    /// A content pattern, by source.
    Pattern(SmolStr),
    /// Any variant of a production.
    Production(SmolStr),
    /// The end of the input.
    EndOfInput,
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => write!(f, "{text:?}"),
            Self::Pattern(source) => write!(f, "/{source}/"),
            Self::Production(name) => f.write_str(name),
            Self::EndOfInput => f.write_str("end of input"),
        }
    }
}

/// Receives failed expectations during a parse.
pub trait ErrorSink {
    /// Returns `false` if a note at `index` would be discarded, so callers
    /// can skip building it.
    fn wants(&self, index: usize) -> bool;

    /// Records that `expected` was not found at `index`.
    fn note(&mut self, index: usize, expected: Expectation);
}

/// Discards every note.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoErrors;

impl ErrorSink for NoErrors {
    fn wants(&self, _index: usize) -> bool {
        false
    }

    fn note(&mut self, _index: usize, _expected: Expectation) {}
}

/// Keeps the expectations at the farthest offset reached.
#[derive(Debug, Default, Clone)]
pub struct FarthestFailure {
    index: usize,
    expected: Vec<Expectation>,
}

impl FarthestFailure {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The farthest offset with a recorded failure.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Expectations at that offset, in the order first noted.
    #[must_use]
    pub fn expected(&self) -> &[Expectation] {
        &self.expected
    }

    /// Summarizes the failure against `text` as a single [`ParseError`].
    #[must_use]
    pub fn to_error(&self, text: &str) -> ParseError {
        let index = self.index.min(text.len());
        let found = text[index..].chars().next();
        let mut message = String::from("expected ");
        match self.expected.as_slice() {
            [] => message.push_str("valid input"),
            [only] => message.push_str(&only.to_string()),
            [init @ .., last] => {
                let init: Vec<String> = init.iter().map(ToString::to_string).collect();
                message.push_str(&init.join(", "));
                message.push_str(" or ");
                message.push_str(&last.to_string());
            }
        }
        match found {
            Some(c) => message.push_str(&format!(", found {c:?}")),
            None => message.push_str(", found end of input"),
        }
        let start = super::to_text_size(index);
        let len = found.map_or(TextSize::from(0), TextSize::of);
        ParseError {
            message,
            range: TextRange::at(start, len),
        }
    }
}

impl ErrorSink for FarthestFailure {
    fn wants(&self, index: usize) -> bool {
        index >= self.index
    }

    fn note(&mut self, index: usize, expected: Expectation) {
        if index > self.index {
            self.index = index;
            self.expected.clear();
        }
        if index == self.index && !self.expected.contains(&expected) {
            self.expected.push(expected);
        }
    }
}

/// A parse that did not match its input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// The byte range where the error occurred.
    pub range: TextRange,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}..{}",
            self.message,
            u32::from(self.range.start()),
            u32::from(self.range.end())
        )
    }
}

impl std::error::Error for ParseError {}
