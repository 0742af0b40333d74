//! Grammar productions, split by syntactic category.

mod expr;
mod stmt;
mod ty;

use gossa_diagnostic::{Diagnostic, ErrorCode};
use gossa_ir::ast::{Decl, Expr, ExprKind, File, FuncDecl, ImportSpec, ValueSpec};
use gossa_ir::TokenKind;

use crate::{PResult, Parser};

impl Parser<'_> {
    /// `package name; imports; decls`
    pub(crate) fn parse_file(&mut self) -> Option<File> {
        let start = self.cursor.span();
        if let Err(diag) = self.cursor.expect(&TokenKind::Package) {
            self.report(diag);
            return None;
        }
        let package = match self.ident() {
            Ok(name) => name,
            Err(diag) => {
                self.report(diag);
                return None;
            }
        };
        if let Err(diag) = self.expect_semi() {
            self.report(diag);
            self.sync_decl();
        }

        let mut imports = Vec::new();
        while self.cursor.check(&TokenKind::Import) {
            if let Err(diag) = self.parse_import_decl(&mut imports) {
                self.report(diag);
                self.sync_decl();
            }
        }

        let mut decls = Vec::new();
        while !self.cursor.at_eof() {
            match self.parse_top_decl() {
                Ok(Some(decl)) => decls.push(decl),
                Ok(None) => {}
                Err(diag) => {
                    self.report(diag);
                    self.sync_decl();
                }
            }
        }

        Some(File {
            package,
            imports,
            decls,
            span: start.merge(self.cursor.span()),
        })
    }

    fn parse_import_decl(&mut self, out: &mut Vec<ImportSpec>) -> PResult<()> {
        self.cursor.expect(&TokenKind::Import)?;
        if self.cursor.eat(&TokenKind::LParen) {
            while !self.cursor.check(&TokenKind::RParen) && !self.cursor.at_eof() {
                out.push(self.parse_import_spec()?);
                self.expect_semi()?;
            }
            self.cursor.expect(&TokenKind::RParen)?;
        } else {
            out.push(self.parse_import_spec()?);
        }
        self.expect_semi()
    }

    fn parse_import_spec(&mut self) -> PResult<ImportSpec> {
        let start = self.cursor.span();
        let name = match self.cursor.kind() {
            TokenKind::Ident(_) => Some(self.ident()?),
            TokenKind::Dot => return Err(self.unsupported("dot imports are", start)),
            _ => None,
        };
        let TokenKind::Str(path) = self.cursor.kind() else {
            return Err(self.cursor.unexpected("import path"));
        };
        let path = path.clone();
        let end = self.cursor.advance().span;
        if path.is_empty() {
            return Err(Diagnostic::error(ErrorCode::E1001)
                .with_message("invalid import path: \"\"")
                .with_label(end, ""));
        }
        Ok(ImportSpec {
            name,
            path,
            span: start.merge(end),
        })
    }

    /// A top-level declaration, or `None` for a stray `;`.
    fn parse_top_decl(&mut self) -> PResult<Option<Decl>> {
        let decl = match self.cursor.kind() {
            TokenKind::Semi => {
                self.cursor.advance();
                return Ok(None);
            }
            TokenKind::Func => Decl::Func(self.parse_func_decl()?),
            TokenKind::Var => {
                self.cursor.advance();
                Decl::Var(self.parse_value_specs(false)?)
            }
            TokenKind::Const => {
                self.cursor.advance();
                Decl::Const(self.parse_value_specs(true)?)
            }
            TokenKind::Type => return Err(self.unsupported("type declarations are", self.cursor.span())),
            TokenKind::Import => {
                return Err(Diagnostic::error(ErrorCode::E1006)
                    .with_message("syntax error: imports must appear before other declarations")
                    .with_label(self.cursor.span(), ""));
            }
            _ => return Err(self.cursor.unexpected("declaration")),
        };
        self.expect_semi()?;
        Ok(Some(decl))
    }

    fn parse_func_decl(&mut self) -> PResult<FuncDecl> {
        let start = self.cursor.expect(&TokenKind::Func)?;
        if self.cursor.check(&TokenKind::LParen) {
            return Err(self.unsupported("methods are", self.cursor.span()));
        }
        let name = self.ident()?;
        if self.cursor.check(&TokenKind::LBracket) {
            return Err(self.unsupported("type parameters are", self.cursor.span()));
        }
        let sig = self.parse_signature()?;
        let body = if self.cursor.check(&TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else {
            None
        };
        let end = self.cursor.previous_span();
        Ok(FuncDecl {
            name,
            sig,
            body,
            span: start.merge(end),
        })
    }

    /// `var`/`const` specs after the keyword, single or parenthesized.
    ///
    /// In a parenthesized `const` group a spec without values repeats the
    /// previous spec's type and values (Go's implicit repetition). The copies
    /// get fresh node ids; `iota` is resolved later from the spec's position.
    pub(crate) fn parse_value_specs(&mut self, is_const: bool) -> PResult<Vec<ValueSpec>> {
        if !self.cursor.eat(&TokenKind::LParen) {
            let spec = self.parse_value_spec(is_const)?;
            if is_const && spec.values.is_empty() {
                return Err(missing_const_init(&spec));
            }
            return Ok(vec![spec]);
        }
        let mut specs: Vec<ValueSpec> = Vec::new();
        while !self.cursor.check(&TokenKind::RParen) && !self.cursor.at_eof() {
            let mut spec = self.parse_value_spec(is_const)?;
            if is_const && spec.values.is_empty() && spec.ty.is_none() {
                match specs.last() {
                    Some(prev) => {
                        spec.ty.clone_from(&prev.ty);
                        spec.values = prev.values.iter().map(|v| self.renumber(v)).collect();
                    }
                    None => return Err(missing_const_init(&spec)),
                }
            }
            specs.push(spec);
            self.expect_semi()?;
        }
        self.cursor.expect(&TokenKind::RParen)?;
        Ok(specs)
    }

    /// Deep copy of a constant expression with fresh node ids.
    fn renumber(&mut self, expr: &Expr) -> Expr {
        let mut copy = expr.clone();
        self.refresh_ids(&mut copy);
        copy
    }

    fn refresh_ids(&mut self, expr: &mut Expr) {
        expr.id = self.ids.fresh();
        match &mut expr.kind {
            ExprKind::Selector { base, name } => {
                self.refresh_ids(base);
                name.id = self.ids.fresh();
            }
            ExprKind::Unary { operand, .. } => self.refresh_ids(operand),
            ExprKind::Binary { left, right, .. } => {
                self.refresh_ids(left);
                self.refresh_ids(right);
            }
            ExprKind::Call { func, args, .. } => {
                self.refresh_ids(func);
                for arg in args {
                    self.refresh_ids(arg);
                }
            }
            ExprKind::Index { base, index } => {
                self.refresh_ids(base);
                self.refresh_ids(index);
            }
            ExprKind::Paren(inner) => self.refresh_ids(inner),
            // Leaves, or forms the checker rejects in constants.
            ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Char(_)
            | ExprKind::Ident(_)
            | ExprKind::Slice { .. }
            | ExprKind::SliceLit { .. }
            | ExprKind::FuncLit { .. }
            | ExprKind::TypeAssert { .. }
            | ExprKind::Type(_) => {}
        }
    }

    fn parse_value_spec(&mut self, is_const: bool) -> PResult<ValueSpec> {
        let start = self.cursor.span();
        let mut names = vec![self.ident()?];
        while self.cursor.eat(&TokenKind::Comma) {
            names.push(self.ident()?);
        }
        let ty = if self.cursor.check(&TokenKind::Assign)
            || self.cursor.check(&TokenKind::Semi)
            || self.cursor.check(&TokenKind::RParen)
        {
            None
        } else {
            Some(self.parse_type()?)
        };
        let values = if self.cursor.eat(&TokenKind::Assign) {
            self.parse_expr_list()?
        } else {
            Vec::new()
        };
        if !is_const && ty.is_none() && values.is_empty() {
            return Err(self.cursor.unexpected("type"));
        }
        Ok(ValueSpec {
            names,
            ty,
            values,
            span: start.merge(self.cursor.previous_span()),
        })
    }
}

fn missing_const_init(spec: &ValueSpec) -> Diagnostic {
    Diagnostic::error(ErrorCode::E1002)
        .with_message("missing init expr for const declaration")
        .with_label(spec.span, "")
}
