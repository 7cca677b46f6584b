//! # Lexer Module
//!
//! Lexical analysis for the Sable language. The lexer reads the source
//! buffer character by character and hands out one token per call,
//! tracking precise line/column/span information for every lexeme.
//!
//! ## Token recognition
//!
//! - Identifiers and keywords match `[A-Za-z][A-Za-z0-9]*`; the scanned
//!   word is looked up in a keyword table and falls back to an identifier.
//! - Integer literals are runs of decimal digits. The lexer keeps the raw
//!   text; the parser is responsible for turning it into a 32-bit value
//!   (and for the overflow warning that may involve).
//! - Punctuation uses a single character of lookahead to resolve the
//!   compound operators `->`, `==`, `!=`, `<=`, `>=`, `&&` and `||`.
//! - `//` line comments and `/* */` block comments are consumed silently.
//! - Anything else reports `UnknownChar` and is skipped, so lexing always
//!   makes progress.
//!
//! ## Pull API
//!
//! [`Lexer::next_token`] produces exactly one token. Once the input is
//! exhausted it keeps producing `End` tokens forever, which lets the
//! parser treat "end of file" like any other token kind. The diagnostics
//! sink is threaded through each call instead of being stored, keeping
//! the lexer free of borrow entanglement with the other passes.

mod token;

pub use token::*;

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::diag::{Diag, Diagnostic};

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("func", TokenKind::KwFunc);
    m.insert("let", TokenKind::KwLet);
    m.insert("var", TokenKind::KwVar);
    m.insert("return", TokenKind::KwReturn);
    m.insert("if", TokenKind::KwIf);
    m.insert("else", TokenKind::KwElse);
    m.insert("true", TokenKind::KwTrue);
    m.insert("false", TokenKind::KwFalse);
    m.insert("external", TokenKind::KwExternal);
    m.insert("init", TokenKind::KwInit);
    m.insert("self", TokenKind::KwSelf);
    m.insert("class", TokenKind::KwClass);
    m.insert("public", TokenKind::KwPublic);
    m.insert("private", TokenKind::KwPrivate);
    m.insert("Bool", TokenKind::KwBool);
    m.insert("Int", TokenKind::KwInt);
    m.insert("Void", TokenKind::KwVoid);
    m
});

pub struct Lexer<'a> {
    src: &'a [u8],
    file: u32,
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, file: u32) -> Self {
        Self {
            src: input.as_bytes(),
            file,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Whether all input has been consumed.
    pub fn empty(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn current(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        if self.current() == Some(b'\n') {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        self.pos += 1;
    }

    fn location(&self, start: usize, start_line: u32, start_col: u32) -> Location {
        Location {
            file: self.file,
            line: start_line,
            col: start_col,
            offset: start as u32,
            len: (self.pos - start) as u32,
        }
    }

    /// Produce the next token. Errors are reported through `diag` and
    /// lexing continues; the `End` token repeats at exhaustion.
    pub fn next_token(&mut self, diag: &mut Diag) -> Token {
        loop {
            let Some(c) = self.current() else {
                return Token {
                    kind: TokenKind::End,
                    text: String::new(),
                    loc: Location {
                        file: self.file,
                        line: self.line,
                        col: self.col,
                        offset: self.pos as u32,
                        len: 0,
                    },
                };
            };

            if c.is_ascii_whitespace() {
                self.advance();
                continue;
            }

            let (start, line, col) = (self.pos, self.line, self.col);

            match c {
                b'+' => return self.single(TokenKind::Plus, start, line, col),
                b'-' => {
                    if self.peek() == Some(b'>') {
                        self.advance();
                        return self.single(TokenKind::Arrow, start, line, col);
                    }
                    return self.single(TokenKind::Minus, start, line, col);
                }
                b'*' => return self.single(TokenKind::Star, start, line, col),
                b'/' => match self.peek() {
                    Some(b'/') => self.lex_line_comment(),
                    Some(b'*') => self.lex_block_comment(),
                    _ => return self.single(TokenKind::Slash, start, line, col),
                },
                b'%' => return self.single(TokenKind::Percent, start, line, col),
                b'=' => {
                    if self.peek() == Some(b'=') {
                        self.advance();
                        return self.single(TokenKind::Equals, start, line, col);
                    }
                    return self.single(TokenKind::Assign, start, line, col);
                }
                b'!' => {
                    if self.peek() == Some(b'=') {
                        self.advance();
                        return self.single(TokenKind::NotEquals, start, line, col);
                    }
                    return self.single(TokenKind::Not, start, line, col);
                }
                b'<' => {
                    if self.peek() == Some(b'=') {
                        self.advance();
                        return self.single(TokenKind::LessEqual, start, line, col);
                    }
                    return self.single(TokenKind::Less, start, line, col);
                }
                b'>' => {
                    if self.peek() == Some(b'=') {
                        self.advance();
                        return self.single(TokenKind::GreaterEqual, start, line, col);
                    }
                    return self.single(TokenKind::Greater, start, line, col);
                }
                b'&' => {
                    if self.peek() == Some(b'&') {
                        self.advance();
                        return self.single(TokenKind::AndAnd, start, line, col);
                    }
                    diag.report(Diagnostic::unknown_char(
                        self.char_location(start, line, col),
                        '&',
                    ));
                    self.advance();
                }
                b'|' => {
                    if self.peek() == Some(b'|') {
                        self.advance();
                        return self.single(TokenKind::OrOr, start, line, col);
                    }
                    diag.report(Diagnostic::unknown_char(
                        self.char_location(start, line, col),
                        '|',
                    ));
                    self.advance();
                }
                b'?' => return self.single(TokenKind::Question, start, line, col),
                b':' => return self.single(TokenKind::Colon, start, line, col),
                b'.' => return self.single(TokenKind::Dot, start, line, col),
                b',' => return self.single(TokenKind::Comma, start, line, col),
                b';' => return self.single(TokenKind::Semicolon, start, line, col),
                b'(' => return self.single(TokenKind::LParen, start, line, col),
                b')' => return self.single(TokenKind::RParen, start, line, col),
                b'{' => return self.single(TokenKind::LBrace, start, line, col),
                b'}' => return self.single(TokenKind::RBrace, start, line, col),
                _ if c.is_ascii_alphabetic() => return self.lex_word(start, line, col),
                _ if c.is_ascii_digit() => return self.lex_number(start, line, col),
                _ => {
                    diag.report(Diagnostic::unknown_char(
                        self.char_location(start, line, col),
                        c as char,
                    ));
                    self.advance();
                }
            }
        }
    }

    fn char_location(&self, start: usize, line: u32, col: u32) -> Location {
        Location {
            file: self.file,
            line,
            col,
            offset: start as u32,
            len: 1,
        }
    }

    fn single(&mut self, kind: TokenKind, start: usize, line: u32, col: u32) -> Token {
        self.advance();
        self.token(kind, start, line, col)
    }

    fn token(&self, kind: TokenKind, start: usize, line: u32, col: u32) -> Token {
        let text = std::str::from_utf8(&self.src[start..self.pos])
            .unwrap_or_default()
            .to_string();
        Token {
            kind,
            text,
            loc: self.location(start, line, col),
        }
    }

    fn lex_word(&mut self, start: usize, line: u32, col: u32) -> Token {
        while self
            .current()
            .map(|c| c.is_ascii_alphanumeric())
            .unwrap_or(false)
        {
            self.advance();
        }
        let word = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or_default();
        let kind = KEYWORDS
            .get(word)
            .copied()
            .unwrap_or(TokenKind::Identifier);
        self.token(kind, start, line, col)
    }

    fn lex_number(&mut self, start: usize, line: u32, col: u32) -> Token {
        while self
            .current()
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false)
        {
            self.advance();
        }
        self.token(TokenKind::Number, start, line, col)
    }

    fn lex_line_comment(&mut self) {
        while let Some(c) = self.current() {
            if c == b'\n' {
                self.advance();
                return;
            }
            self.advance();
        }
    }

    fn lex_block_comment(&mut self) {
        // skip the opening '/*'
        self.advance();
        self.advance();
        while let Some(c) = self.current() {
            if c == b'*' && self.peek() == Some(b'/') {
                self.advance();
                self.advance();
                return;
            }
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_kinds(input: &str) -> (Vec<TokenKind>, Diag) {
        let mut diag = Diag::new();
        let mut lexer = Lexer::new(input, 0);
        let mut kinds = vec![];
        loop {
            let token = lexer.next_token(&mut diag);
            if token.is(TokenKind::End) {
                break;
            }
            kinds.push(token.kind);
        }
        (kinds, diag)
    }

    #[test]
    fn test_lex_alphabetic_id() {
        let mut diag = Diag::new();
        let mut lexer = Lexer::new("letter", 0);
        let token = lexer.next_token(&mut diag);

        assert_eq!(TokenKind::Identifier, token.kind);
        assert_eq!("letter", token.text);
        assert_eq!(0, diag.error_count());
    }

    #[test]
    fn test_lex_numeric() {
        let mut diag = Diag::new();
        let mut lexer = Lexer::new("1337", 0);
        let token = lexer.next_token(&mut diag);

        assert_eq!(TokenKind::Number, token.kind);
        assert_eq!("1337", token.text);
    }

    #[test]
    fn test_lex_function_header() {
        let (kinds, diag) = lex_kinds("func f(x: Int) -> Void {}");

        assert_eq!(
            vec![
                TokenKind::KwFunc,
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::Identifier,
                TokenKind::Colon,
                TokenKind::KwInt,
                TokenKind::RParen,
                TokenKind::Arrow,
                TokenKind::KwVoid,
                TokenKind::LBrace,
                TokenKind::RBrace,
            ],
            kinds
        );
        assert_eq!(0, diag.error_count());
    }

    #[test]
    fn test_lex_compound_operators() {
        let (kinds, _) = lex_kinds("- -> = == < <= > >= ! != && ||");

        assert_eq!(
            vec![
                TokenKind::Minus,
                TokenKind::Arrow,
                TokenKind::Assign,
                TokenKind::Equals,
                TokenKind::Less,
                TokenKind::LessEqual,
                TokenKind::Greater,
                TokenKind::GreaterEqual,
                TokenKind::Not,
                TokenKind::NotEquals,
                TokenKind::AndAnd,
                TokenKind::OrOr,
            ],
            kinds
        );
    }

    #[test]
    fn test_lex_comments_are_skipped() {
        let (kinds, diag) = lex_kinds("let // trailing\n/* block\ncomment */ x");

        assert_eq!(vec![TokenKind::KwLet, TokenKind::Identifier], kinds);
        assert_eq!(0, diag.error_count());
    }

    #[test]
    fn test_unknown_char_is_reported_and_skipped() {
        let (kinds, diag) = lex_kinds("let @ x");

        assert_eq!(vec![TokenKind::KwLet, TokenKind::Identifier], kinds);
        assert_eq!(1, diag.error_count());
        assert_eq!(
            crate::diag::DiagKind::UnknownChar,
            diag.diagnostics()[0].kind
        );
    }

    #[test]
    fn test_lone_ampersand_is_an_error() {
        let (kinds, diag) = lex_kinds("a & b");

        assert_eq!(vec![TokenKind::Identifier, TokenKind::Identifier], kinds);
        assert_eq!(1, diag.error_count());
    }

    #[test]
    fn test_end_token_repeats() {
        let mut diag = Diag::new();
        let mut lexer = Lexer::new("x", 0);

        assert_eq!(TokenKind::Identifier, lexer.next_token(&mut diag).kind);
        assert_eq!(TokenKind::End, lexer.next_token(&mut diag).kind);
        assert_eq!(TokenKind::End, lexer.next_token(&mut diag).kind);
        assert!(lexer.empty());
    }

    #[test]
    fn test_positions_track_lines_and_columns() {
        let mut diag = Diag::new();
        let mut lexer = Lexer::new("let\n  x", 0);

        let first = lexer.next_token(&mut diag);
        assert_eq!((1, 1), (first.loc.line, first.loc.col));

        let second = lexer.next_token(&mut diag);
        assert_eq!((2, 3), (second.loc.line, second.loc.col));
        assert_eq!(6, second.loc.offset);
        assert_eq!(1, second.loc.len);
    }
}
