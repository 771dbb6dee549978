//! Byte-level scanner.
//!
//! Scans the whole source in one pass and returns an Eof-terminated
//! [`TokenList`]. Whitespace and comments are trivia: skipped between
//! tokens and never materialized. Comment bodies are skipped with
//! memchr-accelerated search.

use crate::lex_error::{LexError, LexErrorKind};
use crate::token::{Span, Token, TokenKind, TokenList};

/// Tokenize `source` into an Eof-terminated token list.
pub fn tokenize(source: &str) -> Result<TokenList, LexError> {
    Scanner::new(source).run()
}

/// Returns the number of bytes in the UTF-8 character starting with `byte`.
#[inline]
fn utf8_char_width(byte: u8) -> usize {
    match byte {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

#[inline]
fn is_ident_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$'
}

#[inline]
fn is_ident_continue(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

struct Scanner<'src> {
    src: &'src str,
    bytes: &'src [u8],
    pos: usize,
}

impl<'src> Scanner<'src> {
    fn new(src: &'src str) -> Self {
        Scanner {
            src,
            bytes: src.as_bytes(),
            pos: 0,
        }
    }

    /// Byte at the current position, `0` at EOF.
    #[inline]
    fn current(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(0)
    }

    /// Byte one past the current position, `0` at or past EOF.
    #[inline]
    fn peek(&self) -> u8 {
        self.bytes.get(self.pos + 1).copied().unwrap_or(0)
    }

    /// Byte two past the current position, `0` at or past EOF.
    #[inline]
    fn peek2(&self) -> u8 {
        self.bytes.get(self.pos + 2).copied().unwrap_or(0)
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "token offsets fit in u32; sources are bounded well below 4 GiB"
    )]
    fn span_from(&self, start: usize) -> Span {
        Span::new(start as u32, self.pos as u32)
    }

    /// The character at the current position, for error reporting.
    fn current_char(&self) -> char {
        self.src[self.pos..].chars().next().unwrap_or('\u{FFFD}')
    }

    fn run(mut self) -> Result<TokenList, LexError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let start = self.pos;
            if self.pos >= self.bytes.len() {
                tokens.push(Token::new(TokenKind::Eof, self.span_from(start)));
                return Ok(TokenList::new(tokens));
            }
            let kind = self.next_token()?;
            tokens.push(Token::new(kind, self.span_from(start)));
        }
    }

    /// Skip whitespace, line comments, and block comments.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            match self.current() {
                b' ' | b'\t' | b'\r' | b'\n' => self.pos += 1,
                b'/' if self.peek() == b'/' => {
                    match memchr::memchr(b'\n', &self.bytes[self.pos..]) {
                        Some(off) => self.pos += off + 1,
                        None => self.pos = self.bytes.len(),
                    }
                }
                b'/' if self.peek() == b'*' => {
                    let start = self.pos;
                    self.pos += 2;
                    loop {
                        match memchr::memchr(b'*', &self.bytes[self.pos..]) {
                            Some(off) if self.bytes.get(self.pos + off + 1) == Some(&b'/') => {
                                self.pos += off + 2;
                                break;
                            }
                            Some(off) => self.pos += off + 1,
                            None => {
                                self.pos = self.bytes.len();
                                return Err(LexError::new(
                                    LexErrorKind::UnterminatedBlockComment,
                                    self.span_from(start),
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<TokenKind, LexError> {
        let b = self.current();
        if is_ident_start(b) {
            return Ok(self.ident_or_keyword());
        }
        if b.is_ascii_digit() {
            return self.number();
        }
        if b == b'"' || b == b'\'' {
            return self.string(b);
        }
        self.operator()
    }

    fn ident_or_keyword(&mut self) -> TokenKind {
        let start = self.pos;
        while is_ident_continue(self.current()) {
            self.pos += 1;
        }
        match &self.src[start..self.pos] {
            "var" => TokenKind::Var,
            "function" => TokenKind::Function,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "undefined" => TokenKind::Undefined,
            name => TokenKind::Ident(name.into()),
        }
    }

    fn number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        if self.current() == b'0' && (self.peek() == b'x' || self.peek() == b'X') {
            return self.hex_number();
        }
        while self.current().is_ascii_digit() {
            self.pos += 1;
        }
        if self.current() == b'.' && self.peek().is_ascii_digit() {
            self.pos += 1;
            while self.current().is_ascii_digit() {
                self.pos += 1;
            }
        }
        if (self.current() == b'e' || self.current() == b'E')
            && (self.peek().is_ascii_digit()
                || ((self.peek() == b'+' || self.peek() == b'-') && self.peek2().is_ascii_digit()))
        {
            self.pos += 2;
            while self.current().is_ascii_digit() {
                self.pos += 1;
            }
        }
        let text = &self.src[start..self.pos];
        text.parse::<f64>().map(TokenKind::Number).map_err(|_| {
            LexError::new(LexErrorKind::MalformedNumber, self.span_from(start))
        })
    }

    #[expect(
        clippy::cast_precision_loss,
        reason = "hex literals share the language's single f64 number kind"
    )]
    fn hex_number(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.pos += 2; // 0x
        let digits_start = self.pos;
        while self.current().is_ascii_hexdigit() {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(LexError::new(
                LexErrorKind::MalformedNumber,
                self.span_from(start),
            ));
        }
        u64::from_str_radix(&self.src[digits_start..self.pos], 16)
            .map(|v| TokenKind::Number(v as f64))
            .map_err(|_| LexError::new(LexErrorKind::MalformedNumber, self.span_from(start)))
    }

    fn string(&mut self, quote: u8) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut text = String::new();
        loop {
            match self.current() {
                0 | b'\n' => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedString,
                        self.span_from(start),
                    ));
                }
                b'\\' => {
                    self.pos += 1;
                    text.push(self.escape(start)?);
                }
                b if b == quote => {
                    self.pos += 1;
                    return Ok(TokenKind::Str(text.into()));
                }
                b => {
                    let width = utf8_char_width(b);
                    text.push_str(&self.src[self.pos..self.pos + width]);
                    self.pos += width;
                }
            }
        }
    }

    /// Decode one escape sequence; the cursor sits on the byte after `\`.
    fn escape(&mut self, literal_start: usize) -> Result<char, LexError> {
        let esc = self.current();
        self.pos += 1;
        match esc {
            b'n' => Ok('\n'),
            b'r' => Ok('\r'),
            b't' => Ok('\t'),
            b'0' => Ok('\0'),
            b'\\' => Ok('\\'),
            b'\'' => Ok('\''),
            b'"' => Ok('"'),
            b'x' => {
                let hi = self.current();
                let lo = self.peek();
                if !hi.is_ascii_hexdigit() || !lo.is_ascii_hexdigit() {
                    return Err(LexError::new(
                        LexErrorKind::TruncatedEscape,
                        self.span_from(literal_start),
                    ));
                }
                self.pos += 2;
                let hex = [hi, lo];
                let value = u8::from_str_radix(std::str::from_utf8(&hex).unwrap_or("0"), 16)
                    .unwrap_or(0);
                Ok(char::from(value))
            }
            0 => Err(LexError::new(
                LexErrorKind::TruncatedEscape,
                self.span_from(literal_start),
            )),
            other => Err(LexError::new(
                LexErrorKind::InvalidEscape {
                    escape: char::from(other),
                },
                self.span_from(literal_start),
            )),
        }
    }

    fn operator(&mut self) -> Result<TokenKind, LexError> {
        let (kind, width) = match (self.current(), self.peek(), self.peek2()) {
            (b'=', b'=', b'=') => (TokenKind::EqEqEq, 3),
            (b'!', b'=', b'=') => (TokenKind::NotEqEq, 3),
            (b'=', b'=', _) => (TokenKind::EqEq, 2),
            (b'!', b'=', _) => (TokenKind::NotEq, 2),
            (b'<', b'=', _) => (TokenKind::LtEq, 2),
            (b'>', b'=', _) => (TokenKind::GtEq, 2),
            (b'<', b'<', _) => (TokenKind::Shl, 2),
            (b'>', b'>', _) => (TokenKind::Shr, 2),
            (b'+', b'+', _) => (TokenKind::PlusPlus, 2),
            (b'-', b'-', _) => (TokenKind::MinusMinus, 2),
            (b'+', b'=', _) => (TokenKind::PlusAssign, 2),
            (b'-', b'=', _) => (TokenKind::MinusAssign, 2),
            (b'&', b'&', _) => (TokenKind::AndAnd, 2),
            (b'|', b'|', _) => (TokenKind::OrOr, 2),
            (b'=', _, _) => (TokenKind::Assign, 1),
            (b'!', _, _) => (TokenKind::Bang, 1),
            (b'<', _, _) => (TokenKind::Lt, 1),
            (b'>', _, _) => (TokenKind::Gt, 1),
            (b'+', _, _) => (TokenKind::Plus, 1),
            (b'-', _, _) => (TokenKind::Minus, 1),
            (b'*', _, _) => (TokenKind::Star, 1),
            (b'/', _, _) => (TokenKind::Slash, 1),
            (b'%', _, _) => (TokenKind::Percent, 1),
            (b'&', _, _) => (TokenKind::Amp, 1),
            (b'|', _, _) => (TokenKind::Pipe, 1),
            (b'^', _, _) => (TokenKind::Caret, 1),
            (b'(', _, _) => (TokenKind::LParen, 1),
            (b')', _, _) => (TokenKind::RParen, 1),
            (b'{', _, _) => (TokenKind::LBrace, 1),
            (b'}', _, _) => (TokenKind::RBrace, 1),
            (b'[', _, _) => (TokenKind::LBracket, 1),
            (b']', _, _) => (TokenKind::RBracket, 1),
            (b';', _, _) => (TokenKind::Semi, 1),
            (b',', _, _) => (TokenKind::Comma, 1),
            (b'.', _, _) => (TokenKind::Dot, 1),
            (b':', _, _) => (TokenKind::Colon, 1),
            (b'?', _, _) => (TokenKind::Question, 1),
            _ => {
                return Err(LexError::new(
                    LexErrorKind::InvalidCharacter {
                        found: self.current_char(),
                    },
                    self.span_from(self.pos),
                ));
            }
        };
        self.pos += width;
        Ok(kind)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "tests use unwrap for brevity")]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().kinds().cloned().collect()
    }

    // === Identifiers and keywords ===

    #[test]
    fn keywords_and_idents() {
        assert_eq!(
            kinds("var x = function"),
            vec![
                TokenKind::Var,
                TokenKind::Ident("x".into()),
                TokenKind::Assign,
                TokenKind::Function,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn ident_with_dollar_and_underscore() {
        assert_eq!(
            kinds("_a $b a1"),
            vec![
                TokenKind::Ident("_a".into()),
                TokenKind::Ident("$b".into()),
                TokenKind::Ident("a1".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keyword_prefix_is_still_ident() {
        assert_eq!(
            kinds("variable iffy"),
            vec![
                TokenKind::Ident("variable".into()),
                TokenKind::Ident("iffy".into()),
                TokenKind::Eof,
            ]
        );
    }

    // === Numbers ===

    #[test]
    fn integer_and_fraction() {
        assert_eq!(
            kinds("42 3.5"),
            vec![TokenKind::Number(42.0), TokenKind::Number(3.5), TokenKind::Eof]
        );
    }

    #[test]
    fn exponent_forms() {
        assert_eq!(
            kinds("1e3 2.5e-2"),
            vec![
                TokenKind::Number(1000.0),
                TokenKind::Number(0.025),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn hex_literal() {
        assert_eq!(kinds("0xff"), vec![TokenKind::Number(255.0), TokenKind::Eof]);
    }

    #[test]
    fn hex_without_digits_is_an_error() {
        let err = tokenize("0x").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::MalformedNumber);
    }

    #[test]
    fn dot_after_number_is_member_access() {
        assert_eq!(
            kinds("1.toString"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Dot,
                TokenKind::Ident("toString".into()),
                TokenKind::Eof,
            ]
        );
    }

    // === Strings ===

    #[test]
    fn double_and_single_quotes() {
        assert_eq!(
            kinds("\"hi\" 'yo'"),
            vec![
                TokenKind::Str("hi".into()),
                TokenKind::Str("yo".into()),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn escapes_decoded() {
        assert_eq!(
            kinds(r#""a\n\t\\\"b\x41""#),
            vec![TokenKind::Str("a\n\t\\\"b\u{41}".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn unicode_content_preserved() {
        assert_eq!(
            kinds("\"héllo\""),
            vec![TokenKind::Str("héllo".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn unterminated_string() {
        let err = tokenize("\"oops").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
        assert_eq!(err.span.start, 0);
    }

    #[test]
    fn newline_terminates_string_with_error() {
        let err = tokenize("\"a\nb\"").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedString);
    }

    #[test]
    fn invalid_escape() {
        let err = tokenize(r#""\q""#).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::InvalidEscape { escape: 'q' });
    }

    #[test]
    fn truncated_hex_escape() {
        let err = tokenize(r#""\x4""#).unwrap_err();
        assert_eq!(err.kind, LexErrorKind::TruncatedEscape);
    }

    // === Operators ===

    #[test]
    fn longest_match_wins() {
        assert_eq!(
            kinds("= == === ! != !=="),
            vec![
                TokenKind::Assign,
                TokenKind::EqEq,
                TokenKind::EqEqEq,
                TokenKind::Bang,
                TokenKind::NotEq,
                TokenKind::NotEqEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn compound_and_shift_operators() {
        assert_eq!(
            kinds("+= -= ++ -- << >> <= >="),
            vec![
                TokenKind::PlusAssign,
                TokenKind::MinusAssign,
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::Shl,
                TokenKind::Shr,
                TokenKind::LtEq,
                TokenKind::GtEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn invalid_character() {
        let err = tokenize("a @ b").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::InvalidCharacter { found: '@' });
        assert_eq!(err.span.start, 2);
    }

    // === Trivia ===

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("a // line\nb /* block\nstill */ c"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::Ident("b".into()),
                TokenKind::Ident("c".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_comment_at_eof() {
        assert_eq!(kinds("a // trailing"), vec![TokenKind::Ident("a".into()), TokenKind::Eof]);
    }

    #[test]
    fn unterminated_block_comment() {
        let err = tokenize("a /* no end").unwrap_err();
        assert_eq!(err.kind, LexErrorKind::UnterminatedBlockComment);
    }

    #[test]
    fn empty_source_is_just_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    // === Spans ===

    #[test]
    fn spans_cover_exact_bytes() {
        let list = tokenize("var abc").unwrap();
        assert_eq!(list.get(0).span, Span::new(0, 3));
        assert_eq!(list.get(1).span, Span::new(4, 7));
        assert_eq!(list.get(2).span, Span::new(7, 7));
    }

    #[test]
    fn string_span_includes_quotes() {
        let list = tokenize(r#"  "ab"  "#).unwrap();
        assert_eq!(list.get(0).span, Span::new(2, 6));
    }

    // === Property tests ===

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Scanning never panics, whatever the input.
            #[test]
            fn tokenize_total(source in ".{0,200}") {
                let _ = tokenize(&source);
            }

            /// Scanning is deterministic: the same source yields the
            /// same stream both times.
            #[test]
            fn tokenize_deterministic(source in "[ -~]{0,120}") {
                let first = tokenize(&source);
                let second = tokenize(&source);
                prop_assert_eq!(first, second);
            }

            /// Decimal integer literals round-trip through the scanner.
            #[test]
            fn integer_literals_roundtrip(n in 0u32..1_000_000) {
                let list = tokenize(&n.to_string()).unwrap();
                prop_assert_eq!(
                    list.get(0).kind.clone(),
                    TokenKind::Number(f64::from(n))
                );
            }
        }
    }
}
