//! Forward cursor over an expression's token slice.

use crate::ast::{Position, Token, TokenKind};

#[derive(Debug, Clone, Copy)]
pub struct Cursor<'t> {
    tokens: &'t [Token],
    at: usize,
}

impl<'t> Cursor<'t> {
    pub fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, at: 0 }
    }

    pub fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.at)
    }

    pub fn peek_is(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    pub fn bump(&mut self) -> Option<&'t Token> {
        let tok = self.tokens.get(self.at)?;
        self.at += 1;
        Some(tok)
    }

    /// Consume the next token if it has `kind`.
    pub fn eat(&mut self, kind: TokenKind) -> Option<&'t Token> {
        if self.peek_is(kind) {
            self.bump()
        } else {
            None
        }
    }

    pub fn is_done(&self) -> bool {
        self.at >= self.tokens.len()
    }

    /// Unconsumed tokens.
    pub fn rest(&self) -> &'t [Token] {
        &self.tokens[self.at.min(self.tokens.len())..]
    }

    /// Position of the last token, for errors past the end.
    pub fn end_pos(&self) -> Option<&'t Position> {
        self.tokens.last().map(|t| &t.pos)
    }

    /// Consume the bracketed group opening at the current token and return
    /// its contents. Nothing is consumed on a missing or mismatched closer.
    pub fn group(&mut self) -> Option<&'t [Token]> {
        let close = match self.peek()?.kind {
            TokenKind::LParen => TokenKind::RParen,
            TokenKind::LBrace => TokenKind::RBrace,
            TokenKind::LBracket => TokenKind::RBracket,
            _ => return None,
        };
        let mut depth = 0usize;
        for (offset, tok) in self.tokens[self.at..].iter().enumerate() {
            if tok.opens() {
                depth += 1;
            } else if tok.closes() {
                depth -= 1;
                if depth == 0 {
                    if tok.kind != close {
                        return None;
                    }
                    let start = self.at + 1;
                    let end = self.at + offset;
                    self.at = end + 1;
                    return Some(&self.tokens[start..end]);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::PackageId;

    fn tok(kind: TokenKind, text: &str) -> Token {
        Token::new(kind, text, Position::new("t.x", PackageId::new("t"), 1, 1))
    }

    #[test]
    fn groups_respect_nesting() {
        let tokens = vec![
            tok(TokenKind::LParen, "("),
            tok(TokenKind::LBracket, "["),
            tok(TokenKind::RBracket, "]"),
            tok(TokenKind::RParen, ")"),
            tok(TokenKind::Ident, "x"),
        ];
        let mut cur = Cursor::new(&tokens);
        let inner = cur.group().unwrap();
        assert_eq!(inner.len(), 2);
        assert_eq!(cur.peek().unwrap().text, "x");
    }

    #[test]
    fn mismatched_closer_is_an_error() {
        let tokens = vec![tok(TokenKind::LParen, "("), tok(TokenKind::RBracket, "]")];
        let mut cur = Cursor::new(&tokens);
        assert!(cur.group().is_none());
        assert!(cur.peek_is(TokenKind::LParen));

        let unclosed = vec![tok(TokenKind::LBrace, "{"), tok(TokenKind::Int, "1")];
        assert!(Cursor::new(&unclosed).group().is_none());
    }
}
