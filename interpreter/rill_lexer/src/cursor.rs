//! Token cursor with save/restore marks and raw source slicing.
//!
//! The interpreter parses and executes in a single pass, so control flow
//! needs to revisit token ranges: loops rewind to their condition, and
//! function definitions capture the exact body text for deferred
//! compilation. [`Mark`] is a [`Copy`] snapshot of the cursor position;
//! [`TokenCursor::slice`] extracts the raw source between two marks.

use crate::token::{Token, TokenKind, TokenList};

/// A saved cursor position.
///
/// Cheap to copy; only meaningful for the cursor (and source) it was
/// taken from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mark {
    index: usize,
}

/// Read cursor over a [`TokenList`].
pub struct TokenCursor<'a> {
    tokens: &'a TokenList,
    source: &'a str,
    index: usize,
}

impl<'a> TokenCursor<'a> {
    /// Create a cursor at the first token of `tokens`.
    ///
    /// `source` must be the text `tokens` was scanned from; it backs
    /// [`slice`](Self::slice).
    pub fn new(tokens: &'a TokenList, source: &'a str) -> Self {
        TokenCursor {
            tokens,
            source,
            index: 0,
        }
    }

    /// The current token (the trailing `Eof` once input is exhausted).
    #[inline]
    pub fn current(&self) -> &'a Token {
        self.tokens.get(self.index)
    }

    /// The current token's kind.
    #[inline]
    pub fn current_kind(&self) -> &'a TokenKind {
        &self.current().kind
    }

    /// Advance one token. Saturates at the trailing `Eof`.
    #[inline]
    pub fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
    }

    /// `true` once the cursor sits on the trailing `Eof`.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    /// Snapshot the current position.
    #[inline]
    pub fn mark(&self) -> Mark {
        Mark { index: self.index }
    }

    /// Restore a position previously saved with [`mark`](Self::mark).
    #[inline]
    pub fn rewind(&mut self, mark: Mark) {
        self.index = mark.index;
    }

    /// Raw source text from the start of the token at `from` to the end
    /// of the token just before `to`.
    ///
    /// Used to capture a function body verbatim: mark the opening `{`,
    /// parse past the matching `}`, then slice between the two marks.
    /// Returns the empty string when the range holds no tokens.
    pub fn slice(&self, from: Mark, to: Mark) -> &'a str {
        if to.index <= from.index {
            return "";
        }
        let start = self.tokens.get(from.index).span.start as usize;
        let end = self.tokens.get(to.index - 1).span.end as usize;
        &self.source[start..end]
    }
}
