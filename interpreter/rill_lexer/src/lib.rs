//! Rill Lexer - tokenizer for the Rill scripting language.
//!
//! This crate turns source text into a [`TokenList`] of typed,
//! span-carrying tokens, and provides [`TokenCursor`] for walking that
//! list during parse/execute.
//!
//! # Architecture
//!
//! - `scanner`: single-pass byte-level scan of the whole source
//! - `token`: token kinds, spans, and the token list
//! - `cursor`: navigation with [`Copy`] marks for save/restore and raw
//!   source slicing between two marks (function-body capture)
//! - `lex_error`: typed scan failures with byte positions
//!
//! The cursor's mark/rewind/slice contract is what the interpreter's
//! parse-as-you-execute model builds on: loops rewind to a saved mark to
//! re-run their condition and body, and function definitions slice the
//! exact body text out of the source for deferred compilation.

mod cursor;
mod lex_error;
mod scanner;
mod token;

pub use cursor::{Mark, TokenCursor};
pub use lex_error::{LexError, LexErrorKind};
pub use scanner::tokenize;
pub use token::{Span, Token, TokenKind, TokenList};
