//! Lexer error types.

use std::fmt;

use crate::Span;

/// A scan failure with the byte range where it occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LexError {
    /// Where the error occurred.
    pub span: Span,
    /// What went wrong.
    pub kind: LexErrorKind,
}

/// What kind of scan failure occurred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Missing closing quote for a string literal.
    UnterminatedString,
    /// Missing closing `*/` for a block comment.
    UnterminatedBlockComment,
    /// Invalid escape in a string literal (e.g. `\q`).
    InvalidEscape {
        /// The character that followed the backslash.
        escape: char,
    },
    /// Escape sequence cut short by the end of the literal.
    TruncatedEscape,
    /// A byte that starts no token.
    InvalidCharacter {
        /// The offending character.
        found: char,
    },
    /// A numeric literal that could not be parsed.
    MalformedNumber,
}

impl LexError {
    /// Create a new error covering `span`.
    pub(crate) fn new(kind: LexErrorKind, span: Span) -> Self {
        LexError { span, kind }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LexErrorKind::UnterminatedString => {
                write!(f, "unterminated string literal at byte {}", self.span.start)
            }
            LexErrorKind::UnterminatedBlockComment => {
                write!(f, "unterminated block comment at byte {}", self.span.start)
            }
            LexErrorKind::InvalidEscape { escape } => {
                write!(f, "invalid escape `\\{escape}` at byte {}", self.span.start)
            }
            LexErrorKind::TruncatedEscape => {
                write!(f, "truncated escape sequence at byte {}", self.span.start)
            }
            LexErrorKind::InvalidCharacter { found } => {
                write!(f, "invalid character `{found}` at byte {}", self.span.start)
            }
            LexErrorKind::MalformedNumber => {
                write!(f, "malformed number literal at byte {}", self.span.start)
            }
        }
    }
}

impl std::error::Error for LexError {}
