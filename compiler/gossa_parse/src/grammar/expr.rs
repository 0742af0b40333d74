//! Expressions: precedence climbing over Go's five binary levels, unary
//! operators, operands and postfix forms.

use gossa_diagnostic::{Diagnostic, ErrorCode};
use gossa_ir::ast::{Expr, ExprKind, TypeExpr, TypeExprKind};
use gossa_ir::{BinaryOp, TokenKind, UnaryOp};
use gossa_stack::ensure_sufficient_stack;

use crate::{PResult, Parser};

fn binary_op(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::OrOr => BinaryOp::LogOr,
        TokenKind::AndAnd => BinaryOp::LogAnd,
        TokenKind::EqEq => BinaryOp::Eq,
        TokenKind::NotEq => BinaryOp::NotEq,
        TokenKind::Lt => BinaryOp::Lt,
        TokenKind::LtEq => BinaryOp::LtEq,
        TokenKind::Gt => BinaryOp::Gt,
        TokenKind::GtEq => BinaryOp::GtEq,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Pipe => BinaryOp::Or,
        TokenKind::Caret => BinaryOp::Xor,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Percent => BinaryOp::Rem,
        TokenKind::Shl => BinaryOp::Shl,
        TokenKind::Shr => BinaryOp::Shr,
        TokenKind::Amp => BinaryOp::And,
        TokenKind::AmpCaret => BinaryOp::AndNot,
        _ => return None,
    })
}

impl Parser<'_> {
    /// Parse an expression.
    ///
    /// Uses `ensure_sufficient_stack` so deeply nested input cannot overflow
    /// the native stack.
    pub(crate) fn parse_expr(&mut self) -> PResult<Expr> {
        ensure_sufficient_stack(|| self.parse_binary(1))
    }

    pub(crate) fn parse_expr_list(&mut self) -> PResult<Vec<Expr>> {
        let mut list = vec![self.parse_expr()?];
        while self.cursor.eat(&TokenKind::Comma) {
            list.push(self.parse_expr()?);
        }
        Ok(list)
    }

    fn parse_binary(&mut self, min_prec: u8) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        while let Some(op) = binary_op(self.cursor.kind()) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            self.cursor.advance();
            let right = self.parse_binary(prec + 1)?;
            let span = left.span.merge(right.span);
            left = self.mk_expr(
                ExprKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.cursor.span();
        let op = match self.cursor.kind() {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Caret => UnaryOp::BitNot,
            TokenKind::Arrow if !matches!(self.cursor.peek(1), TokenKind::Chan) => UnaryOp::Recv,
            TokenKind::Amp => return Err(self.unsupported("address-of is", start)),
            TokenKind::Star => return Err(self.unsupported("pointer indirection is", start)),
            _ => return self.parse_postfix(),
        };
        self.cursor.advance();
        let operand = ensure_sufficient_stack(|| self.parse_unary())?;
        let span = start.merge(operand.span);
        Ok(self.mk_expr(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_operand()?;
        loop {
            match self.cursor.kind() {
                TokenKind::Dot => {
                    self.cursor.advance();
                    if self.cursor.eat(&TokenKind::LParen) {
                        if self.cursor.check(&TokenKind::Type) {
                            return Err(self.unsupported("type switches are", self.cursor.span()));
                        }
                        let ty = self.parse_type()?;
                        self.cursor.expect(&TokenKind::RParen)?;
                        let span = expr.span.merge(self.cursor.previous_span());
                        expr = self.mk_expr(
                            ExprKind::TypeAssert {
                                base: Box::new(expr),
                                ty,
                            },
                            span,
                        );
                    } else {
                        let name = self.ident()?;
                        let span = expr.span.merge(name.span);
                        expr = self.mk_expr(
                            ExprKind::Selector {
                                base: Box::new(expr),
                                name,
                            },
                            span,
                        );
                    }
                }
                TokenKind::LBracket => expr = self.parse_index_or_slice(expr)?,
                TokenKind::LParen => expr = self.parse_call(expr)?,
                _ => return Ok(expr),
            }
        }
    }

    fn parse_index_or_slice(&mut self, base: Expr) -> PResult<Expr> {
        let start = base.span;
        self.cursor.expect(&TokenKind::LBracket)?;
        let low = if self.cursor.check(&TokenKind::Colon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let kind = if self.cursor.eat(&TokenKind::Colon) {
            let high = if self.cursor.check(&TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            if self.cursor.check(&TokenKind::Colon) {
                return Err(self.unsupported("full slice expressions are", self.cursor.span()));
            }
            ExprKind::Slice {
                base: Box::new(base),
                low: low.map(Box::new),
                high,
            }
        } else {
            match low {
                Some(index) => ExprKind::Index {
                    base: Box::new(base),
                    index: Box::new(index),
                },
                None => return Err(self.cursor.unexpected("operand")),
            }
        };
        self.cursor.expect(&TokenKind::RBracket)?;
        let span = start.merge(self.cursor.previous_span());
        Ok(self.mk_expr(kind, span))
    }

    fn parse_call(&mut self, func: Expr) -> PResult<Expr> {
        self.cursor.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        let mut spread = false;
        while !self.cursor.check(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if self.cursor.eat(&TokenKind::Ellipsis) {
                spread = true;
                self.cursor.eat(&TokenKind::Comma);
                break;
            }
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.cursor.expect(&TokenKind::RParen)?;
        let span = func.span.merge(self.cursor.previous_span());
        Ok(self.mk_expr(
            ExprKind::Call {
                func: Box::new(func),
                args,
                spread,
            },
            span,
        ))
    }

    fn parse_operand(&mut self) -> PResult<Expr> {
        let start = self.cursor.span();
        let kind = match self.cursor.kind() {
            TokenKind::Int(v) => {
                let v = *v;
                self.cursor.advance();
                ExprKind::Int(v)
            }
            TokenKind::Str(s) => {
                let s = s.clone();
                self.cursor.advance();
                ExprKind::Str(s)
            }
            TokenKind::Char(c) => {
                let c = *c;
                self.cursor.advance();
                ExprKind::Char(c)
            }
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.cursor.advance();
                ExprKind::Ident(name)
            }
            TokenKind::LParen => {
                self.cursor.advance();
                let inner = self.parse_expr()?;
                self.cursor.expect(&TokenKind::RParen)?;
                ExprKind::Paren(Box::new(inner))
            }
            TokenKind::Func => {
                self.cursor.advance();
                let sig = self.parse_signature()?;
                if self.cursor.check(&TokenKind::LBrace) {
                    let body = self.parse_block()?;
                    ExprKind::FuncLit { sig, body }
                } else {
                    ExprKind::Type(TypeExpr {
                        span: start.merge(self.cursor.previous_span()),
                        kind: TypeExprKind::Func(Box::new(sig)),
                    })
                }
            }
            TokenKind::LBracket => {
                let ty = self.parse_type()?;
                if self.cursor.check(&TokenKind::LBrace) {
                    return self.parse_slice_lit(ty);
                }
                ExprKind::Type(ty)
            }
            TokenKind::Chan | TokenKind::Arrow | TokenKind::Interface => {
                ExprKind::Type(self.parse_type()?)
            }
            TokenKind::Map => return Err(self.unsupported("map types are", start)),
            TokenKind::Struct => return Err(self.unsupported("struct types are", start)),
            _ => {
                let mut diag = self.cursor.unexpected("expression");
                diag.code = ErrorCode::E1002;
                return Err(diag);
            }
        };
        let span = start.merge(self.cursor.previous_span());
        Ok(self.mk_expr(kind, span))
    }

    /// `[]T{a, b, c}`; inner literals of a nested slice type may omit
    /// their type (`[][]int{{1}, {2, 3}}`).
    fn parse_slice_lit(&mut self, ty: TypeExpr) -> PResult<Expr> {
        let start = ty.span;
        let TypeExprKind::Slice(elem) = ty.kind else {
            return Err(Diagnostic::error(ErrorCode::E1005)
                .with_message("composite literal of this type not supported")
                .with_label(start, ""));
        };
        self.parse_slice_lit_body(*elem, start)
    }

    fn parse_slice_lit_body(&mut self, elem: TypeExpr, start: gossa_ir::Span) -> PResult<Expr> {
        self.cursor.expect(&TokenKind::LBrace)?;
        let mut elems = Vec::new();
        while !self.cursor.check(&TokenKind::RBrace) {
            let value = if self.cursor.check(&TokenKind::LBrace) {
                match &elem.kind {
                    TypeExprKind::Slice(inner) => {
                        let inner = (**inner).clone();
                        let at = self.cursor.span();
                        ensure_sufficient_stack(|| self.parse_slice_lit_body(inner, at))?
                    }
                    _ => {
                        return Err(self.unsupported(
                            "elided composite literal of this type is",
                            self.cursor.span(),
                        ))
                    }
                }
            } else {
                self.parse_expr()?
            };
            if self.cursor.check(&TokenKind::Colon) {
                return Err(self.unsupported("keyed elements are", self.cursor.span()));
            }
            elems.push(value);
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        if !self.cursor.check(&TokenKind::RBrace) {
            let mut diag = self.cursor.unexpected("comma or }");
            if self.cursor.check(&TokenKind::Semi) {
                diag.message = "syntax error: unexpected newline in composite literal; \
                                possibly missing comma or }"
                    .to_string();
            }
            return Err(diag);
        }
        self.cursor.advance();
        let span = start.merge(self.cursor.previous_span());
        Ok(self.mk_expr(ExprKind::SliceLit { elem, elems }, span))
    }
}
