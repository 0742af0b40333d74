//! Statements and blocks.

use gossa_diagnostic::{Diagnostic, ErrorCode};
use gossa_ir::ast::{AssignOp, Block, CaseClause, Expr, ExprKind, Stmt, StmtKind};
use gossa_ir::{BinaryOp, Span, TokenKind};
use gossa_stack::ensure_sufficient_stack;

use crate::{PResult, Parser};

/// A simple statement, or the header of a `for range` loop.
enum Simple {
    Stmt(Stmt),
    Range {
        key: Option<Expr>,
        value: Option<Expr>,
        define: bool,
        expr: Expr,
        start: Span,
    },
}

fn assign_op(kind: &TokenKind) -> Option<AssignOp> {
    Some(match kind {
        TokenKind::Assign => AssignOp::Assign,
        TokenKind::Define => AssignOp::Define,
        TokenKind::PlusEq => AssignOp::Op(BinaryOp::Add),
        TokenKind::MinusEq => AssignOp::Op(BinaryOp::Sub),
        TokenKind::StarEq => AssignOp::Op(BinaryOp::Mul),
        TokenKind::SlashEq => AssignOp::Op(BinaryOp::Div),
        TokenKind::PercentEq => AssignOp::Op(BinaryOp::Rem),
        TokenKind::AmpEq => AssignOp::Op(BinaryOp::And),
        TokenKind::PipeEq => AssignOp::Op(BinaryOp::Or),
        TokenKind::CaretEq => AssignOp::Op(BinaryOp::Xor),
        TokenKind::ShlEq => AssignOp::Op(BinaryOp::Shl),
        TokenKind::ShrEq => AssignOp::Op(BinaryOp::Shr),
        TokenKind::AmpCaretEq => AssignOp::Op(BinaryOp::AndNot),
        _ => return None,
    })
}

/// The condition of an `if`, `for` or `switch` header, which must be an
/// expression statement.
fn header_expr(stmt: Stmt) -> PResult<Expr> {
    match stmt.kind {
        StmtKind::Expr(expr) => Ok(expr),
        _ => Err(Diagnostic::error(ErrorCode::E1001)
            .with_message("syntax error: cannot use statement as value")
            .with_label(stmt.span, "")),
    }
}

impl Parser<'_> {
    pub(crate) fn parse_block(&mut self) -> PResult<Block> {
        let start = self.cursor.expect(&TokenKind::LBrace)?;
        let stmts = self.parse_stmt_list();
        let end = self.cursor.expect(&TokenKind::RBrace)?;
        Ok(Block {
            stmts,
            span: start.merge(end),
        })
    }

    /// Statements up to a closing `}` or the next `case`/`default`.
    /// Errors are recorded and the bad statement skipped.
    fn parse_stmt_list(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        loop {
            match self.cursor.kind() {
                TokenKind::RBrace | TokenKind::Case | TokenKind::Default | TokenKind::Eof => {
                    return stmts;
                }
                TokenKind::Semi => {
                    self.cursor.advance();
                    continue;
                }
                _ => {}
            }
            let parsed = self.parse_stmt().and_then(|stmt| {
                self.expect_semi()?;
                Ok(stmt)
            });
            match parsed {
                Ok(stmt) => stmts.push(stmt),
                Err(diag) => {
                    self.report(diag);
                    self.sync_stmt();
                }
            }
        }
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        ensure_sufficient_stack(|| self.parse_stmt_inner())
    }

    fn parse_stmt_inner(&mut self) -> PResult<Stmt> {
        let start = self.cursor.span();
        let kind = match self.cursor.kind() {
            TokenKind::Var => {
                self.cursor.advance();
                StmtKind::Var(self.parse_value_specs(false)?)
            }
            TokenKind::Const => {
                self.cursor.advance();
                StmtKind::Const(self.parse_value_specs(true)?)
            }
            TokenKind::Go | TokenKind::Defer => {
                let is_go = self.cursor.check(&TokenKind::Go);
                self.cursor.advance();
                let call = self.parse_expr()?;
                let keyword = if is_go { "go" } else { "defer" };
                if let ExprKind::Paren(_) = call.kind {
                    return Err(Diagnostic::error(ErrorCode::E1001)
                        .with_message(format!(
                            "syntax error: expression in {keyword} must not be parenthesized"
                        ))
                        .with_label(call.span, ""));
                }
                if !matches!(call.kind, ExprKind::Call { .. }) {
                    return Err(Diagnostic::error(ErrorCode::E1001)
                        .with_message(format!(
                            "syntax error: expression in {keyword} must be function call"
                        ))
                        .with_label(call.span, ""));
                }
                if is_go {
                    StmtKind::Go(call)
                } else {
                    StmtKind::Defer(call)
                }
            }
            TokenKind::Return => {
                self.cursor.advance();
                if matches!(self.cursor.kind(), TokenKind::Semi | TokenKind::RBrace) {
                    StmtKind::Return(Vec::new())
                } else {
                    StmtKind::Return(self.parse_expr_list()?)
                }
            }
            TokenKind::Break | TokenKind::Continue => {
                let is_break = self.cursor.check(&TokenKind::Break);
                self.cursor.advance();
                if self.cursor.check_ident() {
                    return Err(self.unsupported("labels are", self.cursor.span()));
                }
                if is_break {
                    StmtKind::Break
                } else {
                    StmtKind::Continue
                }
            }
            TokenKind::LBrace => StmtKind::Block(self.parse_block()?),
            TokenKind::If => return self.parse_if(),
            TokenKind::For => return self.parse_for(),
            TokenKind::Switch => return self.parse_switch(),
            TokenKind::Goto => return Err(self.unsupported("goto is", start)),
            TokenKind::Fallthrough => return Err(self.unsupported("fallthrough is", start)),
            TokenKind::Select => return Err(self.unsupported("select is", start)),
            TokenKind::Type => return Err(self.unsupported("type declarations are", start)),
            TokenKind::Ident(_) if matches!(self.cursor.peek(1), TokenKind::Colon) => {
                return Err(self.unsupported("labels are", start));
            }
            _ => return self.parse_simple_stmt(),
        };
        Ok(Stmt {
            kind,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    fn parse_simple_stmt(&mut self) -> PResult<Stmt> {
        match self.parse_simple(false)? {
            Simple::Stmt(stmt) => Ok(stmt),
            Simple::Range { start, .. } => Err(Diagnostic::error(ErrorCode::E1001)
                .with_message("syntax error: unexpected range")
                .with_label(start, "")),
        }
    }

    fn parse_simple(&mut self, range_ok: bool) -> PResult<Simple> {
        let start = self.cursor.span();
        if range_ok && self.cursor.eat(&TokenKind::Range) {
            let expr = self.parse_expr()?;
            return Ok(Simple::Range {
                key: None,
                value: None,
                define: false,
                expr,
                start,
            });
        }

        let mut lhs = self.parse_expr_list()?;
        let kind = if let Some(op) = assign_op(self.cursor.kind()) {
            let op_span = self.cursor.advance().span;
            let plain = matches!(op, AssignOp::Assign | AssignOp::Define);
            if range_ok && plain && self.cursor.eat(&TokenKind::Range) {
                if lhs.len() > 2 {
                    return Err(Diagnostic::error(ErrorCode::E1001)
                        .with_message("syntax error: range clause permits at most two iteration variables")
                        .with_label(lhs[2].span, ""));
                }
                let expr = self.parse_expr()?;
                let mut vars = lhs.into_iter();
                return Ok(Simple::Range {
                    key: vars.next(),
                    value: vars.next(),
                    define: op == AssignOp::Define,
                    expr,
                    start,
                });
            }
            if !plain && lhs.len() != 1 {
                let symbol = self
                    .cursor
                    .previous_kind()
                    .map_or_else(String::new, TokenKind::describe);
                return Err(Diagnostic::error(ErrorCode::E1001)
                    .with_message(format!(
                        "syntax error: assignment operation {symbol} requires single-valued expressions"
                    ))
                    .with_label(op_span, ""));
            }
            let rhs = self.parse_expr_list()?;
            StmtKind::Assign { lhs, op, rhs }
        } else {
            match self.cursor.kind() {
                TokenKind::Inc | TokenKind::Dec if lhs.len() == 1 => {
                    let inc = self.cursor.check(&TokenKind::Inc);
                    self.cursor.advance();
                    let target = lhs.remove(0);
                    StmtKind::IncDec { target, inc }
                }
                TokenKind::Arrow if lhs.len() == 1 => {
                    self.cursor.advance();
                    let value = self.parse_expr()?;
                    let chan = lhs.remove(0);
                    StmtKind::Send { chan, value }
                }
                _ if lhs.len() == 1 => StmtKind::Expr(lhs.remove(0)),
                _ => return Err(self.cursor.unexpected(":= or = or comma")),
            }
        };
        Ok(Simple::Stmt(Stmt {
            kind,
            span: start.merge(self.cursor.previous_span()),
        }))
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        let start = self.cursor.expect(&TokenKind::If)?;
        if self.cursor.check(&TokenKind::LBrace) {
            return Err(Diagnostic::error(ErrorCode::E1002)
                .with_message("syntax error: missing condition in if statement")
                .with_label(self.cursor.span(), ""));
        }
        let (init, cond) = if self.cursor.eat(&TokenKind::Semi) {
            (None, self.parse_expr()?)
        } else {
            let first = self.parse_simple_stmt()?;
            if self.cursor.eat(&TokenKind::Semi) {
                (Some(Box::new(first)), self.parse_expr()?)
            } else {
                (None, header_expr(first)?)
            }
        };
        let then = self.parse_block()?;
        let els = if self.cursor.eat(&TokenKind::Else) {
            match self.cursor.kind() {
                TokenKind::If => Some(Box::new(self.parse_if()?)),
                TokenKind::LBrace => {
                    let block = self.parse_block()?;
                    let span = block.span;
                    Some(Box::new(Stmt {
                        kind: StmtKind::Block(block),
                        span,
                    }))
                }
                _ => return Err(self.cursor.unexpected("if statement or block")),
            }
        } else {
            None
        };
        Ok(Stmt {
            kind: StmtKind::If {
                init,
                cond,
                then,
                els,
            },
            span: start.merge(self.cursor.previous_span()),
        })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        let start = self.cursor.expect(&TokenKind::For)?;
        let mut init = None;
        let mut cond = None;
        let mut post = None;

        if !self.cursor.check(&TokenKind::LBrace) {
            let first = if self.cursor.check(&TokenKind::Semi) {
                None
            } else {
                match self.parse_simple(true)? {
                    Simple::Range {
                        key,
                        value,
                        define,
                        expr,
                        ..
                    } => {
                        let body = self.parse_block()?;
                        return Ok(Stmt {
                            kind: StmtKind::Range {
                                key,
                                value,
                                define,
                                expr,
                                body,
                            },
                            span: start.merge(self.cursor.previous_span()),
                        });
                    }
                    Simple::Stmt(stmt) => Some(stmt),
                }
            };

            if self.cursor.eat(&TokenKind::Semi) {
                init = first.map(Box::new);
                if !self.cursor.check(&TokenKind::Semi) {
                    cond = Some(self.parse_expr()?);
                }
                self.cursor.expect(&TokenKind::Semi)?;
                if !self.cursor.check(&TokenKind::LBrace) {
                    let stmt = self.parse_simple_stmt()?;
                    if let StmtKind::Assign {
                        op: AssignOp::Define,
                        ..
                    } = stmt.kind
                    {
                        return Err(Diagnostic::error(ErrorCode::E1001)
                            .with_message("syntax error: cannot declare in post statement of for loop")
                            .with_label(stmt.span, ""));
                    }
                    post = Some(Box::new(stmt));
                }
            } else if let Some(stmt) = first {
                cond = Some(header_expr(stmt)?);
            }
        }

        let body = self.parse_block()?;
        Ok(Stmt {
            kind: StmtKind::For {
                init,
                cond,
                post,
                body,
            },
            span: start.merge(self.cursor.previous_span()),
        })
    }

    fn parse_switch(&mut self) -> PResult<Stmt> {
        let start = self.cursor.expect(&TokenKind::Switch)?;
        let mut init = None;
        let mut tag = None;
        if !self.cursor.check(&TokenKind::LBrace) {
            let first = if self.cursor.check(&TokenKind::Semi) {
                None
            } else {
                Some(self.parse_simple_stmt()?)
            };
            if self.cursor.eat(&TokenKind::Semi) {
                init = first.map(Box::new);
                if !self.cursor.check(&TokenKind::LBrace) {
                    let stmt = self.parse_simple_stmt()?;
                    tag = Some(header_expr(stmt)?);
                }
            } else if let Some(stmt) = first {
                tag = Some(header_expr(stmt)?);
            }
        }

        self.cursor.expect(&TokenKind::LBrace)?;
        let mut clauses = Vec::new();
        let mut seen_default: Option<Span> = None;
        while !self.cursor.check(&TokenKind::RBrace) && !self.cursor.at_eof() {
            let clause_start = self.cursor.span();
            let (exprs, is_default) = match self.cursor.kind() {
                TokenKind::Case => {
                    self.cursor.advance();
                    (self.parse_expr_list()?, false)
                }
                TokenKind::Default => {
                    self.cursor.advance();
                    if let Some(first) = seen_default {
                        return Err(Diagnostic::error(ErrorCode::E1001)
                            .with_message("multiple defaults in switch")
                            .with_label(clause_start, "")
                            .with_secondary_label(first, "first default"));
                    }
                    seen_default = Some(clause_start);
                    (Vec::new(), true)
                }
                _ => return Err(self.cursor.unexpected("case or default or }")),
            };
            self.cursor.expect(&TokenKind::Colon)?;
            let body = self.parse_stmt_list();
            clauses.push(CaseClause {
                exprs,
                is_default,
                body,
                span: clause_start.merge(self.cursor.previous_span()),
            });
        }
        self.cursor.expect(&TokenKind::RBrace)?;
        Ok(Stmt {
            kind: StmtKind::Switch {
                init,
                tag,
                clauses,
            },
            span: start.merge(self.cursor.previous_span()),
        })
    }
}
