use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

/// Lexical categories produced by the scanner for code/echo tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Str,
    Number,

    // Keywords
    True,
    False,
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    If,
    Elif,
    Else,
    EndIf,
    For,
    In,
    EndFor,
    Range,
    Print,
    Insert,

    // Symbols
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Assign,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
}

pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("and", TokenKind::And),
    ("or", TokenKind::Or),
    ("not", TokenKind::Not),
    ("eq", TokenKind::Eq),
    ("ne", TokenKind::Ne),
    ("lt", TokenKind::Lt),
    ("le", TokenKind::Le),
    ("gt", TokenKind::Gt),
    ("ge", TokenKind::Ge),
    ("if", TokenKind::If),
    ("elif", TokenKind::Elif),
    ("else", TokenKind::Else),
    ("endif", TokenKind::EndIf),
    ("for", TokenKind::For),
    ("in", TokenKind::In),
    ("endfor", TokenKind::EndFor),
    ("range", TokenKind::Range),
    ("print", TokenKind::Print),
    ("insert", TokenKind::Insert),
];

pub fn keyword(ident: &str) -> Option<TokenKind> {
    KEYWORDS
        .iter()
        .find(|(name, _)| *name == ident)
        .map(|(_, kind)| *kind)
}

/// Single-character operators and delimiters.
pub fn single_token(c: u8) -> Option<TokenKind> {
    match c {
        b'(' => Some(TokenKind::LParen),
        b')' => Some(TokenKind::RParen),
        b'[' => Some(TokenKind::LBracket),
        b']' => Some(TokenKind::RBracket),
        b',' => Some(TokenKind::Comma),
        b'+' => Some(TokenKind::Plus),
        b'-' => Some(TokenKind::Minus),
        b'*' => Some(TokenKind::Star),
        b'/' => Some(TokenKind::Slash),
        b'%' => Some(TokenKind::Percent),
        b'=' => Some(TokenKind::Assign),
        _ => None,
    }
}

/// One scanned token: a kind plus, for literals and identifiers, its text.
/// Immutable once built; only the scanner creates these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    kind: TokenKind,
    text: Option<String>,
}

impl Token {
    pub fn bare(kind: TokenKind) -> Self {
        Self { kind, text: None }
    }

    pub fn with_text(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: Some(text.into()),
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Stable 64-bit hash; the wrapping sum of these over a block's tokens
    /// feeds the program content hash used by the inclusion cache.
    pub fn hash64(&self) -> u64 {
        let mut hasher = FxHasher::default();
        self.kind.hash(&mut hasher);
        if let Some(text) = &self.text {
            text.hash(&mut hasher);
        }
        hasher.finish()
    }
}
