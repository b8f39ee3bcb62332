//! Grammar combinators.
//!
//! A [`ParSer`] is the right-hand side of a variant. The same value drives
//! all four directions of the engine: parse, unparse, match and force-fit.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use smol_str::SmolStr;

use super::lookahead::CharSet;
use super::{GrammarError, ProductionId};

/// A compiled content pattern.
///
/// Content patterns produce the literal value of leaf nodes. They are
/// anchored at the current input position when parsing, and matched against
/// the whole value when unparsing.
pub struct ContentPattern {
    source: SmolStr,
    prefix: Regex,
    whole: Regex,
    first: Option<CharSet>,
}

impl ContentPattern {
    /// Compiles `source` as a regular expression.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidPattern`] if `source` does not compile.
    pub fn new(source: &str) -> Result<Self, GrammarError> {
        let compile = |anchored: String| {
            Regex::new(&anchored).map_err(|err| GrammarError::InvalidPattern {
                pattern: source.into(),
                message: err.to_string(),
            })
        };
        Ok(Self {
            source: source.into(),
            prefix: compile(format!("^(?:{source})"))?,
            whole: compile(format!("^(?:{source})$"))?,
            first: None,
        })
    }

    /// Declares the characters a match may start with, enabling lookahead
    /// pruning for variants that begin with this pattern.
    #[must_use]
    pub fn with_first(mut self, first: CharSet) -> Self {
        self.first = Some(first);
        self
    }

    /// The pattern as written.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Declared first characters, if any.
    #[must_use]
    pub fn first(&self) -> Option<CharSet> {
        self.first
    }

    /// Length in bytes of the leftmost-first match at the start of `text`.
    #[must_use]
    pub fn match_prefix(&self, text: &str) -> Option<usize> {
        self.prefix.find(text).map(|m| m.end())
    }

    /// Returns `true` if all of `text` matches.
    #[must_use]
    pub fn matches_whole(&self, text: &str) -> bool {
        self.whole.is_match(text)
    }
}

impl fmt::Debug for ContentPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/", self.source)
    }
}

/// Grammar combinator.
#[derive(Debug, Clone)]
pub enum ParSer {
    /// Matches nothing and always succeeds.
    Empty,
    /// A literal grammar string, emitted as a `Token`.
    Literal(SmolStr),
    /// A content pattern, emitted as `Content`.
    Pattern(Arc<ContentPattern>),
    /// A reference to a production.
    Ref(ProductionId),
    /// All parts in order.
    Seq(Vec<ParSer>),
    /// The first alternative that succeeds.
    Alt(Vec<ParSer>),
    /// The body repeated greedily, at least `min` times.
    Repeat {
        /// Repeated parser.
        body: Box<ParSer>,
        /// Minimum number of repetitions.
        min: usize,
    },
    /// The body, or nothing.
    Optional(Box<ParSer>),
    /// Zero-width check that the body does (or does not) match here.
    Lookahead {
        /// Checked parser.
        body: Arc<ParSer>,
        /// `true` for a negative lookahead.
        negative: bool,
    },
    /// Token-level parts that must be adjacent, with no ignorable between
    /// them. Their events are rewritten into one token after the fact.
    Glue(Vec<ParSer>),
    /// Captures one comment matching the pattern as an `Ignorable` event.
    Comment(Arc<ContentPattern>),
    /// Succeeds only at the end of input.
    End,
}

impl ParSer {
    /// A literal token.
    #[must_use]
    pub fn lit(text: &str) -> Self {
        Self::Literal(text.into())
    }

    /// A content pattern.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidPattern`] if `source` does not compile.
    pub fn pattern(source: &str) -> Result<Self, GrammarError> {
        Ok(Self::Pattern(Arc::new(ContentPattern::new(source)?)))
    }

    /// A content pattern whose matches start with a character in `first`.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidPattern`] if `source` does not compile.
    pub fn pattern_starting(source: &str, first: CharSet) -> Result<Self, GrammarError> {
        Ok(Self::Pattern(Arc::new(
            ContentPattern::new(source)?.with_first(first),
        )))
    }

    /// A comment capture.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::InvalidPattern`] if `source` does not compile.
    pub fn comment(source: &str) -> Result<Self, GrammarError> {
        Ok(Self::Comment(Arc::new(ContentPattern::new(source)?)))
    }

    /// A production reference.
    #[must_use]
    pub fn r(production: ProductionId) -> Self {
        Self::Ref(production)
    }

    /// A sequence.
    #[must_use]
    pub fn seq(parts: impl IntoIterator<Item = ParSer>) -> Self {
        Self::Seq(parts.into_iter().collect())
    }

    /// An ordered choice.
    #[must_use]
    pub fn alt(alternatives: impl IntoIterator<Item = ParSer>) -> Self {
        Self::Alt(alternatives.into_iter().collect())
    }

    /// Zero or more repetitions.
    #[must_use]
    pub fn star(self) -> Self {
        Self::Repeat {
            body: Box::new(self),
            min: 0,
        }
    }

    /// One or more repetitions.
    #[must_use]
    pub fn plus(self) -> Self {
        Self::Repeat {
            body: Box::new(self),
            min: 1,
        }
    }

    /// Zero or one occurrence.
    #[must_use]
    pub fn opt(self) -> Self {
        Self::Optional(Box::new(self))
    }

    /// Positive lookahead.
    #[must_use]
    pub fn followed_by(self) -> Self {
        Self::Lookahead {
            body: Arc::new(self),
            negative: false,
        }
    }

    /// Negative lookahead.
    #[must_use]
    pub fn not_followed_by(self) -> Self {
        Self::Lookahead {
            body: Arc::new(self),
            negative: true,
        }
    }

    /// Adjacent token-level parts merged into one token.
    #[must_use]
    pub fn glue(parts: impl IntoIterator<Item = ParSer>) -> Self {
        Self::Glue(parts.into_iter().collect())
    }

    /// Returns `true` for combinators that emit exactly one token-level
    /// event, the only parts [`ParSer::Glue`] accepts.
    #[must_use]
    pub fn is_token_level(&self) -> bool {
        matches!(self, Self::Literal(_) | Self::Pattern(_))
    }

    /// Calls `f` on every production this parser references, at any depth.
    pub fn for_each_ref(&self, f: &mut impl FnMut(ProductionId)) {
        match self {
            Self::Ref(production) => f(*production),
            Self::Seq(parts) | Self::Alt(parts) | Self::Glue(parts) => {
                for part in parts {
                    part.for_each_ref(f);
                }
            }
            Self::Repeat { body, .. } | Self::Optional(body) => body.for_each_ref(f),
            Self::Lookahead { body, .. } => body.for_each_ref(f),
            Self::Empty
            | Self::Literal(_)
            | Self::Pattern(_)
            | Self::Comment(_)
            | Self::End => {}
        }
    }
}

impl fmt::Display for ParSer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, parts: &[ParSer], sep: &str) -> fmt::Result {
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{part}")?;
            }
            Ok(())
        }

        match self {
            Self::Empty => f.write_str("()"),
            Self::Literal(text) => write!(f, "{text:?}"),
            Self::Pattern(pattern) | Self::Comment(pattern) => write!(f, "{pattern:?}"),
            Self::Ref(production) => write!(f, "<{}>", production.raw()),
            Self::Seq(parts) => {
                f.write_str("(")?;
                list(f, parts, " ")?;
                f.write_str(")")
            }
            Self::Alt(parts) => {
                f.write_str("(")?;
                list(f, parts, " | ")?;
                f.write_str(")")
            }
            Self::Repeat { body, min: 0 } => write!(f, "{body}*"),
            Self::Repeat { body, min: 1 } => write!(f, "{body}+"),
            Self::Repeat { body, min } => write!(f, "{body}{{{min},}}"),
            Self::Optional(body) => write!(f, "{body}?"),
            Self::Lookahead { body, negative } => {
                write!(f, "{}{body}", if *negative { "!" } else { "&" })
            }
            Self::Glue(parts) => {
                f.write_str("glue(")?;
                list(f, parts, " ")?;
                f.write_str(")")
            }
            Self::End => f.write_str("$"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_prefix_is_anchored() {
        let pattern = ContentPattern::new("[0-9]+").expect("compiles");
        assert_eq!(pattern.match_prefix("123abc"), Some(3));
        assert_eq!(pattern.match_prefix("abc123"), None);
        assert!(pattern.matches_whole("42"));
        assert!(!pattern.matches_whole("42x"));
    }

    #[test]
    fn alternation_is_grouped_before_anchoring() {
        let pattern = ContentPattern::new("a|b").expect("compiles");
        assert!(pattern.matches_whole("b"));
        assert!(!pattern.matches_whole("ab"));
        assert_eq!(pattern.match_prefix("xb"), None);
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = ParSer::pattern("(").expect_err("does not compile");
        assert!(matches!(err, GrammarError::InvalidPattern { .. }));
    }

    #[test]
    fn refs_are_visited_at_any_depth() {
        let a = ProductionId::from_raw(0);
        let b = ProductionId::from_raw(1);
        let body = ParSer::seq([ParSer::r(a), ParSer::alt([ParSer::lit("x"), ParSer::r(b)]).star()]);
        let mut seen = Vec::new();
        body.for_each_ref(&mut |p| seen.push(p));
        assert_eq!(seen, vec![a, b]);
    }
}
