//! Types and function signatures.

use gossa_diagnostic::{Diagnostic, ErrorCode};
use gossa_ir::ast::{FuncSig, Ident, Param, TypeExpr, TypeExprKind};
use gossa_ir::TokenKind;

use crate::{PResult, Parser};

/// One comma-separated entry of a parameter list before names are sorted
/// out: `a`, `int`, `a int`.
struct ParamEntry {
    name: Option<Ident>,
    ty: Option<TypeExpr>,
    /// The entry as a type, when it was written alone.
    bare: Option<TypeExpr>,
}

impl Parser<'_> {
    /// Whether the current token can start a type.
    pub(crate) fn at_type_start(&self) -> bool {
        matches!(
            self.cursor.kind(),
            TokenKind::Ident(_)
                | TokenKind::LBracket
                | TokenKind::Chan
                | TokenKind::Arrow
                | TokenKind::Func
                | TokenKind::Interface
                | TokenKind::LParen
                | TokenKind::Map
                | TokenKind::Struct
                | TokenKind::Star
        )
    }

    pub(crate) fn parse_type(&mut self) -> PResult<TypeExpr> {
        let start = self.cursor.span();
        let kind = match self.cursor.kind() {
            TokenKind::Ident(_) => {
                let name = self.ident()?;
                if self.cursor.eat(&TokenKind::Dot) {
                    let member = self.ident()?;
                    TypeExprKind::Qualified {
                        package: name,
                        name: member,
                    }
                } else {
                    TypeExprKind::Name(name)
                }
            }
            TokenKind::LBracket => {
                self.cursor.advance();
                if !self.cursor.check(&TokenKind::RBracket) {
                    return Err(self.unsupported("array types are", start));
                }
                self.cursor.advance();
                TypeExprKind::Slice(Box::new(self.parse_type()?))
            }
            // Channel direction is accepted and not enforced.
            TokenKind::Chan => {
                self.cursor.advance();
                self.cursor.eat(&TokenKind::Arrow);
                TypeExprKind::Chan(Box::new(self.parse_type()?))
            }
            TokenKind::Arrow => {
                self.cursor.advance();
                self.cursor.expect(&TokenKind::Chan)?;
                TypeExprKind::Chan(Box::new(self.parse_type()?))
            }
            TokenKind::Func => {
                self.cursor.advance();
                TypeExprKind::Func(Box::new(self.parse_signature()?))
            }
            TokenKind::Interface => {
                self.cursor.advance();
                self.cursor.expect(&TokenKind::LBrace)?;
                if !self.cursor.check(&TokenKind::RBrace) {
                    return Err(self.unsupported("non-empty interfaces are", start));
                }
                self.cursor.advance();
                TypeExprKind::EmptyInterface
            }
            TokenKind::LParen => {
                self.cursor.advance();
                let inner = self.parse_type()?;
                self.cursor.expect(&TokenKind::RParen)?;
                return Ok(TypeExpr {
                    kind: inner.kind,
                    span: start.merge(self.cursor.previous_span()),
                });
            }
            TokenKind::Map => return Err(self.unsupported("map types are", start)),
            TokenKind::Struct => return Err(self.unsupported("struct types are", start)),
            TokenKind::Star => return Err(self.unsupported("pointer types are", start)),
            _ => return Err(self.cursor.unexpected("type")),
        };
        Ok(TypeExpr {
            kind,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// `(params) results`
    pub(crate) fn parse_signature(&mut self) -> PResult<FuncSig> {
        let start = self.cursor.span();
        let params = self.parse_params()?;
        let results = if self.cursor.check(&TokenKind::LParen) {
            self.parse_params()?
        } else if self.at_result_type_start() {
            vec![Param {
                name: None,
                ty: self.parse_type()?,
            }]
        } else {
            Vec::new()
        };
        Ok(FuncSig {
            params,
            results,
            span: start.merge(self.cursor.previous_span()),
        })
    }

    /// A single unparenthesized result type. `(` is handled by the caller
    /// and `{` starts the body.
    fn at_result_type_start(&self) -> bool {
        !self.cursor.check(&TokenKind::LParen) && self.at_type_start()
    }

    /// A parenthesized parameter list.
    ///
    /// Go allows either all entries named (`a, b int, s string`) or none
    /// (`int, string`); entries are collected first and sorted out once the
    /// whole list is seen.
    fn parse_params(&mut self) -> PResult<Vec<Param>> {
        let open = self.cursor.expect(&TokenKind::LParen)?;
        let mut entries = Vec::new();
        while !self.cursor.check(&TokenKind::RParen) {
            if self.cursor.check(&TokenKind::Ellipsis) {
                return Err(self.unsupported("variadic parameters are", self.cursor.span()));
            }
            entries.push(self.parse_param_entry()?);
            if !self.cursor.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.cursor.expect(&TokenKind::RParen)?;

        let named = entries.iter().any(|e| e.ty.is_some());
        if !named {
            return Ok(entries
                .into_iter()
                .filter_map(|e| e.bare)
                .map(|ty| Param { name: None, ty })
                .collect());
        }

        // Names without a type take the type of the next typed entry.
        let mut params = Vec::with_capacity(entries.len());
        let mut pending: Vec<Ident> = Vec::new();
        for entry in entries {
            match (entry.name, entry.ty) {
                (Some(name), Some(ty)) => {
                    for earlier in pending.drain(..) {
                        params.push(Param {
                            name: Some(earlier),
                            ty: ty.clone(),
                        });
                    }
                    params.push(Param {
                        name: Some(name),
                        ty,
                    });
                }
                (Some(name), None) => pending.push(name),
                _ => return Err(mixed_params(open)),
            }
        }
        if pending.is_empty() {
            Ok(params)
        } else {
            Err(mixed_params(open))
        }
    }

    fn parse_param_entry(&mut self) -> PResult<ParamEntry> {
        // `name Type` starts with an identifier followed by a type.
        if let TokenKind::Ident(_) = self.cursor.kind() {
            let next = self.cursor.peek(1);
            let followed_by_type = !matches!(
                next,
                TokenKind::Comma | TokenKind::RParen | TokenKind::Dot
            );
            if followed_by_type {
                let name = self.ident()?;
                if self.cursor.check(&TokenKind::Ellipsis) {
                    return Err(self.unsupported("variadic parameters are", self.cursor.span()));
                }
                let ty = self.parse_type()?;
                return Ok(ParamEntry {
                    name: Some(name),
                    ty: Some(ty),
                    bare: None,
                });
            }
        }
        let ty = self.parse_type()?;
        let name = match &ty.kind {
            TypeExprKind::Name(ident) => Some(ident.clone()),
            _ => None,
        };
        Ok(ParamEntry {
            name,
            ty: None,
            bare: Some(ty),
        })
    }
}

fn mixed_params(span: gossa_ir::Span) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1001)
        .with_message("syntax error: mixed named and unnamed parameters")
        .with_label(span, "")
}
