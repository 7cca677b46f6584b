use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Where a token or AST node came from: file id, 1-based line and column,
/// plus the lexeme span as a byte offset and length into the source
/// buffer. Created by the lexer and never mutated afterwards.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: u32,
    pub line: u32,
    pub col: u32,
    pub offset: u32,
    pub len: u32,
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Every kind of token the lexer can produce. `End` is produced
/// indefinitely once the input is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Identifier,
    Number,
    KwFunc,
    KwLet,
    KwVar,
    KwReturn,
    KwIf,
    KwElse,
    KwTrue,
    KwFalse,
    KwExternal,
    KwInit,
    KwSelf,
    KwClass,
    KwPublic,
    KwPrivate,
    KwBool,
    KwInt,
    KwVoid,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Equals,
    NotEquals,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AndAnd,
    OrOr,
    Not,
    Question,
    Colon,
    Dot,
    Comma,
    Semicolon,
    Arrow,
    LParen,
    RParen,
    LBrace,
    RBrace,
    End,
}

impl TokenKind {
    /// The surface spelling of the token kind, used by diagnostics and
    /// the pretty-printer.
    pub fn symbol(self) -> &'static str {
        match self {
            TokenKind::Identifier => "identifier",
            TokenKind::Number => "number",
            TokenKind::KwFunc => "func",
            TokenKind::KwLet => "let",
            TokenKind::KwVar => "var",
            TokenKind::KwReturn => "return",
            TokenKind::KwIf => "if",
            TokenKind::KwElse => "else",
            TokenKind::KwTrue => "true",
            TokenKind::KwFalse => "false",
            TokenKind::KwExternal => "external",
            TokenKind::KwInit => "init",
            TokenKind::KwSelf => "self",
            TokenKind::KwClass => "class",
            TokenKind::KwPublic => "public",
            TokenKind::KwPrivate => "private",
            TokenKind::KwBool => "Bool",
            TokenKind::KwInt => "Int",
            TokenKind::KwVoid => "Void",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Assign => "=",
            TokenKind::Equals => "==",
            TokenKind::NotEquals => "!=",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::AndAnd => "&&",
            TokenKind::OrOr => "||",
            TokenKind::Not => "!",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::Arrow => "->",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::End => "end of file",
        }
    }
}

/// A single token: kind, lexeme text and source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub loc: Location,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    pub fn is_not(&self, kind: TokenKind) -> bool {
        self.kind != kind
    }

    /// Description used in diagnostics ("identifier 'foo'", "'('", ...).
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Identifier => format!("identifier '{}'", self.text),
            TokenKind::Number => format!("number '{}'", self.text),
            TokenKind::End => "end of file".into(),
            kind => format!("'{}'", kind.symbol()),
        }
    }
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.loc, self.describe())
    }
}
