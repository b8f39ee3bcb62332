//! Whitespace and comments.
//!
//! The engine is scannerless, so ignorables are skipped by the parser itself
//! right before every token, content pattern, and production reference.
//! Each skipped run becomes an `Ignorable` event, which keeps parses
//! lossless.

/// Lexical conventions for ignorable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalConfig {
    /// Characters treated as whitespace.
    pub whitespace: String,
    /// Prefixes that start a comment running to the end of the line.
    pub line_comments: Vec<String>,
    /// Opening and closing delimiters of block comments.
    pub block_comments: Vec<(String, String)>,
}

impl Default for LexicalConfig {
    fn default() -> Self {
        Self {
            whitespace: " \t\r\n".to_string(),
            line_comments: vec!["//".to_string()],
            block_comments: vec![("/*".to_string(), "*/".to_string())],
        }
    }
}

/// What [`LexicalConfig::next_ignorable`] may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SkipMode {
    /// Whitespace and comments.
    All,
    /// Whitespace only, leaving comments for a production that captures them.
    Whitespace,
    /// Nothing, between glued tokens.
    None,
}

impl LexicalConfig {
    /// Byte length of the single ignorable item at the start of `text`: a
    /// whitespace run, one line comment, or one block comment. An unclosed
    /// block comment is not ignorable.
    pub(crate) fn next_ignorable(&self, text: &str, mode: SkipMode) -> Option<usize> {
        if mode == SkipMode::None {
            return None;
        }
        let whitespace: usize = text
            .chars()
            .take_while(|c| self.whitespace.contains(*c))
            .map(char::len_utf8)
            .sum();
        if whitespace > 0 {
            return Some(whitespace);
        }
        if mode == SkipMode::Whitespace {
            return None;
        }
        for prefix in &self.line_comments {
            if !prefix.is_empty() && text.starts_with(prefix.as_str()) {
                return Some(text.find('\n').unwrap_or(text.len()));
            }
        }
        for (open, close) in &self.block_comments {
            if !open.is_empty() && text.starts_with(open.as_str()) {
                let body = &text[open.len()..];
                return body.find(close.as_str()).map(|end| open.len() + end + close.len());
            }
        }
        None
    }

    /// Returns `true` if `text` is a line comment, which must be followed by
    /// a line break when rendered.
    pub(crate) fn is_line_comment(&self, text: &str) -> bool {
        self.line_comments
            .iter()
            .any(|prefix| !prefix.is_empty() && text.starts_with(prefix.as_str()))
            && !text.ends_with('\n')
    }

    /// Byte offset of the first non-ignorable character at or after `index`.
    pub(crate) fn skip_all(&self, text: &str, mut index: usize) -> usize {
        while let Some(len) = self.next_ignorable(&text[index..], SkipMode::All) {
            index += len;
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_are_taken_one_at_a_time() {
        let config = LexicalConfig::default();
        let text = "  // note\n/* block */x";
        assert_eq!(config.next_ignorable(text, SkipMode::All), Some(2));
        assert_eq!(config.next_ignorable(&text[2..], SkipMode::All), Some(7));
        assert_eq!(config.next_ignorable(&text[9..], SkipMode::All), Some(1));
        assert_eq!(config.next_ignorable(&text[10..], SkipMode::All), Some(11));
        assert_eq!(config.skip_all(text, 0), text.len() - 1);
    }

    #[test]
    fn modes_limit_what_is_skipped() {
        let config = LexicalConfig::default();
        assert_eq!(config.next_ignorable("/* c */", SkipMode::Whitespace), None);
        assert_eq!(config.next_ignorable(" x", SkipMode::None), None);
        assert_eq!(config.next_ignorable("/* open", SkipMode::All), None);
    }

    #[test]
    fn line_comments_need_a_break() {
        let config = LexicalConfig::default();
        assert!(config.is_line_comment("// x"));
        assert!(!config.is_line_comment("/* x */"));
    }
}
