//! Token slices carried by unevaluated expressions.

use std::fmt;

use super::Position;

/// Token categories produced by the external lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Int,
    Float,
    Str,
    Char,
    /// Operators and punctuation other than the ones below (`+`, `==`, `!`, ...).
    Op,
    Comma,
    Dot,
    Colon,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    /// Placeholder for an anonymous function; the text is its index in
    /// the owning expression's closure list.
    Closure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub pos: Position,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, pos: Position) -> Self {
        Self {
            kind,
            text: text.into(),
            pos,
        }
    }

    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    pub fn is_op(&self, text: &str) -> bool {
        self.is(TokenKind::Op, text)
    }

    pub fn opens(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket
        )
    }

    pub fn closes(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Split `tokens` on commas at bracket depth zero.
///
/// Each part is the token range between separators; the comma tokens are
/// returned alongside so callers can point diagnostics at them.
pub fn split_top_level_commas(tokens: &[Token]) -> Vec<(&[Token], Option<&Token>)> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut last = 0;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.opens() {
            depth += 1;
        } else if tok.closes() {
            depth = depth.saturating_sub(1);
        }
        if depth > 0 || tok.kind != TokenKind::Comma {
            continue;
        }
        parts.push((&tokens[last..i], Some(tok)));
        last = i + 1;
    }
    if last < tokens.len() || !parts.is_empty() {
        parts.push((&tokens[last..], None));
    }
    parts
}
