//! Token cursor for navigating the token stream.

use gossa_diagnostic::{Diagnostic, ErrorCode};
use gossa_ir::{Span, Token, TokenKind};
use tracing::trace;

/// Position within a token list that always ends with `Eof`.
pub(crate) struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(tokens: &'a [Token]) -> Self {
        debug_assert!(
            matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)),
            "token stream must end with Eof"
        );
        Cursor { tokens, pos: 0 }
    }

    #[inline]
    pub(crate) fn current(&self) -> &'a Token {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.pos.min(last)]
    }

    #[inline]
    pub(crate) fn kind(&self) -> &'a TokenKind {
        &self.current().kind
    }

    #[inline]
    pub(crate) fn span(&self) -> Span {
        self.current().span
    }

    /// Span of the most recently consumed token.
    pub(crate) fn previous_span(&self) -> Span {
        match self.pos.checked_sub(1).and_then(|p| self.tokens.get(p)) {
            Some(tok) => tok.span,
            None => Span::DUMMY,
        }
    }

    /// Kind of the most recently consumed token.
    pub(crate) fn previous_kind(&self) -> Option<&'a TokenKind> {
        let prev = self.pos.checked_sub(1)?;
        self.tokens.get(prev).map(|t| &t.kind)
    }

    /// Kind `n` tokens ahead; `peek(0)` is the current token.
    pub(crate) fn peek(&self, n: usize) -> &'a TokenKind {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[(self.pos + n).min(last)].kind
    }

    #[inline]
    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        self.kind() == kind
    }

    pub(crate) fn check_ident(&self) -> bool {
        matches!(self.kind(), TokenKind::Ident(_))
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.check(&TokenKind::Eof)
    }

    /// Consume the current token. The final `Eof` is never passed.
    pub(crate) fn advance(&mut self) -> &'a Token {
        let token = self.current();
        trace!(pos = self.pos, kind = %token.kind, "advance");
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Consume the current token if it matches.
    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume a token of the given kind or report what was found instead.
    pub(crate) fn expect(&mut self, kind: &TokenKind) -> Result<Span, Diagnostic> {
        if self.check(kind) {
            Ok(self.advance().span)
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    /// Go-style "expected X, found Y" error at the current token.
    pub(crate) fn unexpected(&self, expected: &str) -> Diagnostic {
        let found = match self.kind() {
            TokenKind::Semi if self.current().span.is_empty() => "newline".to_string(),
            other => other.describe(),
        };
        Diagnostic::error(ErrorCode::E1001)
            .with_message(format!("syntax error: unexpected {found}, expected {expected}"))
            .with_label(self.span(), "")
    }
}
