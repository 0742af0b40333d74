//! Recursive-descent parser for the Go subset accepted by gossa.
//!
//! One call to [`parse_file`] lexes and parses a single source file. The
//! parser keeps going after a syntax error: the failing declaration or
//! statement is skipped up to the next `;` or closing brace, so one run can
//! report several independent problems, like `go build` does.
//!
//! Node ids come from a caller-owned [`NodeIdGen`] so that ids stay unique
//! across every file of a program.

mod cursor;
mod grammar;

use gossa_diagnostic::{Diagnostic, ErrorCode};
use gossa_ir::ast::{Expr, ExprKind, File, Ident};
use gossa_ir::{NodeIdGen, Span, TokenKind};

use cursor::Cursor;

/// Result of parsing one file.
#[derive(Clone, Debug)]
pub struct ParseOutput {
    /// `None` only when the package clause itself is missing.
    pub file: Option<File>,
    /// Lexer and parser diagnostics, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Parse `source`, whose first byte sits at `base` in the program source map.
#[tracing::instrument(level = "debug", skip(source, ids))]
pub fn parse_file(source: &str, base: u32, ids: &mut NodeIdGen) -> ParseOutput {
    let lexed = gossa_lexer::lex(source, base);
    let mut parser = Parser::new(&lexed.tokens, ids);
    let file = parser.parse_file();
    let mut diagnostics = lexed.diagnostics;
    diagnostics.extend(parser.errors);
    diagnostics.sort_by_key(|d| d.primary_span().map_or(u32::MAX, |s| s.start));
    tracing::debug!(errors = diagnostics.len(), "parsed file");
    ParseOutput { file, diagnostics }
}

type PResult<T> = Result<T, Diagnostic>;

pub(crate) struct Parser<'a> {
    cursor: Cursor<'a>,
    ids: &'a mut NodeIdGen,
    errors: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [gossa_ir::Token], ids: &'a mut NodeIdGen) -> Self {
        Parser {
            cursor: Cursor::new(tokens),
            ids,
            errors: Vec::new(),
        }
    }

    /// Record an error. Errors positioned on a lexer `Error` token are
    /// dropped because the lexer already reported that spot.
    fn report(&mut self, diag: Diagnostic) {
        let on_bad_token = diag
            .primary_span()
            .is_some_and(|span| self.cursor.check(&TokenKind::Error) && span == self.cursor.span());
        if !on_bad_token {
            self.errors.push(diag);
        }
    }

    fn mk_expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        Expr {
            id: self.ids.fresh(),
            kind,
            span,
        }
    }

    fn ident(&mut self) -> PResult<Ident> {
        match self.cursor.kind() {
            TokenKind::Ident(name) => {
                let span = self.cursor.advance().span;
                Ok(Ident {
                    id: self.ids.fresh(),
                    name: name.clone(),
                    span,
                })
            }
            _ => Err(self.cursor.unexpected("name")),
        }
    }

    /// Error for a construct the accepted subset leaves out.
    fn unsupported(&self, what: &str, span: Span) -> Diagnostic {
        Diagnostic::error(ErrorCode::E1005)
            .with_message(format!("{what} not supported"))
            .with_label(span, "")
    }

    /// Consume the statement terminator. A `)` or `}` may stand in for it.
    fn expect_semi(&mut self) -> PResult<()> {
        match self.cursor.kind() {
            TokenKind::Semi => {
                self.cursor.advance();
                Ok(())
            }
            TokenKind::RParen | TokenKind::RBrace => Ok(()),
            _ => Err(self.cursor.unexpected("semicolon or newline")),
        }
    }

    /// Skip to just past the next `;` at the current nesting depth, or up
    /// to an enclosing `}`. Stray closing parens and brackets are skipped.
    fn sync_stmt(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.cursor.kind() {
                TokenKind::Eof => return,
                TokenKind::RBrace if depth == 0 => return,
                TokenKind::LBrace | TokenKind::LParen | TokenKind::LBracket => depth += 1,
                TokenKind::RBrace | TokenKind::RParen | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                }
                TokenKind::Semi if depth == 0 => {
                    self.cursor.advance();
                    return;
                }
                _ => {}
            }
            self.cursor.advance();
        }
    }

    /// Skip to the next top-level declaration keyword that starts a line.
    /// Always moves past the token the error was reported at.
    fn sync_decl(&mut self) {
        self.cursor.advance();
        loop {
            match self.cursor.kind() {
                TokenKind::Eof => return,
                TokenKind::Func
                | TokenKind::Var
                | TokenKind::Const
                | TokenKind::Type
                | TokenKind::Import
                    if matches!(self.cursor.previous_kind(), Some(TokenKind::Semi)) =>
                {
                    return;
                }
                _ => {}
            }
            self.cursor.advance();
        }
    }
}
