//! Expressions: operands, operators, implicit conversion of untyped values.

use std::sync::Arc;

use gossa_diagnostic::ErrorCode;
use gossa_ir::ast::{BinaryOp, Expr, ExprKind, TypeExpr, UnaryOp};
use gossa_ir::Span;
use gossa_stack::ensure_sufficient_stack;

use super::{expr_string, is_exported, Checker, Entity, Found, Mode, Object, Operand};
use crate::constant::{self, ConstError};
use crate::universe::Predeclared;
use crate::{ConstValue, Member, Resolution, Type, Untyped};

/// Why an untyped operand could not take a type.
pub(crate) enum ConvertError {
    Mismatch,
    Overflow,
}

/// Whether a value of type `from` may be assigned to `to` once untyped
/// constants have been converted.
pub(crate) fn assignable(from: &Type, to: &Type) -> bool {
    if from.is_invalid() || to.is_invalid() || from == to {
        return true;
    }
    match (from, to) {
        (Type::Tuple(_), _) => false,
        (_, Type::Any) => true,
        (Type::Untyped(Untyped::Nil), t) => t.has_nil(),
        _ => false,
    }
}

impl Checker<'_> {
    /// Check an expression in any mode and record it.
    pub(crate) fn raw_expr(&mut self, e: &Expr, lvalue: bool) -> Operand {
        let op = ensure_sufficient_stack(|| self.expr_kind(e, lvalue));
        self.record(e, &op);
        op
    }

    fn expr_kind(&mut self, e: &Expr, lvalue: bool) -> Operand {
        match &e.kind {
            ExprKind::Int(v) => {
                Operand::constant(ConstValue::Int(i128::from(*v)), Type::Untyped(Untyped::Int))
            }
            ExprKind::Char(c) => {
                Operand::constant(ConstValue::Int(i128::from(*c)), Type::Untyped(Untyped::Rune))
            }
            ExprKind::Str(s) => Operand::constant(ConstValue::str(s), Type::Untyped(Untyped::String)),
            ExprKind::Ident(name) => self.ident(e, name, lvalue),
            ExprKind::Selector { base, name } => self.selector(e, base, &name.name),
            ExprKind::Unary { op, operand } => self.unary(e, *op, operand),
            ExprKind::Binary { op, left, right } => {
                let l = self.single(left);
                let r = self.single(right);
                self.binary_op(e.span, *op, left, l, right, r)
            }
            ExprKind::Call { func, args, spread } => self.call(e, func, args, *spread),
            ExprKind::Index { base, index } => self.index(base, index),
            ExprKind::Slice { base, low, high } => {
                self.slice_expr(base, low.as_deref(), high.as_deref())
            }
            ExprKind::SliceLit { elem, elems } => self.slice_lit(elem, elems),
            ExprKind::FuncLit { sig, body } => {
                let signature = Arc::new(self.resolve_signature(sig));
                self.info.signatures.insert(e.id, Arc::clone(&signature));
                self.func_body(e.id, sig, Arc::clone(&signature), body);
                Operand::value(Type::Func(signature))
            }
            ExprKind::TypeAssert { base, ty } => self.type_assert(base, ty),
            ExprKind::Type(t) => Operand {
                mode: Mode::TypeExpr,
                ty: self.resolve_type(t),
            },
            ExprKind::Paren(inner) => self.raw_expr(inner, lvalue),
        }
    }

    /// Check an expression that must denote a value (or a call without one).
    pub(crate) fn expr(&mut self, e: &Expr) -> Operand {
        let op = self.raw_expr(e, false);
        let message = match &op.mode {
            Mode::TypeExpr => format!("{} (type) is not an expression", op.ty),
            Mode::Builtin(b) => {
                format!("{} (built-in function {}) must be called", expr_string(e), b.name())
            }
            Mode::Intrinsic(i) => format!("{} must be called", i.qualified_name()),
            Mode::Package(path) => format!("use of package {path} without selector"),
            _ => return op,
        };
        let code = if op.mode == Mode::TypeExpr {
            ErrorCode::E2012
        } else {
            ErrorCode::E2007
        };
        self.error(code, e.span, message);
        Operand::invalid()
    }

    /// Check an expression that must yield exactly one value.
    pub(crate) fn single(&mut self, e: &Expr) -> Operand {
        let op = self.expr(e);
        if op.is_invalid() {
            return op;
        }
        if op.mode == Mode::NoValue {
            let text = expr_string(e);
            self.error(ErrorCode::E2019, e.span, format!("{text} (no value) used as value"));
            return Operand::invalid();
        }
        if let Type::Tuple(_) = op.ty {
            let text = expr_string(e);
            self.error(
                ErrorCode::E2019,
                e.span,
                format!("multiple-value {text} (value of type {}) in single-value context", op.ty),
            );
            return Operand::invalid();
        }
        op
    }

    /// Check a single value and convert it to `target`.
    pub(crate) fn value_of(&mut self, e: &Expr, target: &Type, context: &str) -> Operand {
        let mut op = self.single(e);
        if !self.assign_to(e, &mut op, target, context) {
            return Operand::invalid();
        }
        op
    }

    /// Check a single value, giving untyped constants their default type.
    pub(crate) fn defaulted(&mut self, e: &Expr, context: &str) -> Operand {
        let mut op = self.single(e);
        self.default_operand(e, &mut op, context);
        op
    }

    pub(crate) fn default_operand(&mut self, e: &Expr, op: &mut Operand, context: &str) -> bool {
        match op.ty {
            Type::Untyped(Untyped::Nil) => {
                self.error(ErrorCode::E2007, e.span, format!("use of untyped nil in {context}"));
                *op = Operand::invalid();
                false
            }
            Type::Untyped(u) => {
                let ty = u.default_type();
                if !self.fits(op, &ty) {
                    let text = self.describe(e, op);
                    self.error(
                        ErrorCode::E2013,
                        e.span,
                        format!("cannot use {text} as {ty} value in {context} (overflows)"),
                    );
                    *op = Operand::invalid();
                    return false;
                }
                self.update_type(e, &ty);
                op.ty = ty;
                true
            }
            _ => true,
        }
    }

    /// Whether a constant operand is representable in the integer type `ty`.
    fn fits(&self, op: &Operand, ty: &Type) -> bool {
        match (ty, op.const_value()) {
            (Type::Int(kind), Some(ConstValue::Int(v))) => {
                constant::representable(*v, *kind, &self.sizes)
            }
            _ => true,
        }
    }

    /// Give an untyped operand the type `target` requires.
    pub(crate) fn implicit(
        &mut self,
        e: &Expr,
        op: &mut Operand,
        target: &Type,
    ) -> Result<(), ConvertError> {
        let Type::Untyped(u) = op.ty else {
            return Ok(());
        };
        let ty = match (u, target) {
            (_, Type::Invalid) => Type::Invalid,
            (Untyped::Nil, Type::Any) => Type::Any,
            (_, Type::Any) => {
                let ty = u.default_type();
                if !self.fits(op, &ty) {
                    return Err(ConvertError::Overflow);
                }
                ty
            }
            (Untyped::Nil, t) if t.has_nil() => t.clone(),
            (Untyped::Int | Untyped::Rune, Type::Int(_)) => {
                if !self.fits(op, target) {
                    return Err(ConvertError::Overflow);
                }
                target.clone()
            }
            (Untyped::Bool, Type::Bool) | (Untyped::String, Type::String) => target.clone(),
            _ => return Err(ConvertError::Mismatch),
        };
        self.update_type(e, &ty);
        op.ty = ty;
        Ok(())
    }

    /// Convert `op` for assignment to `target`, reporting a mismatch.
    pub(crate) fn assign_to(
        &mut self,
        e: &Expr,
        op: &mut Operand,
        target: &Type,
        context: &str,
    ) -> bool {
        if op.is_invalid() || target.is_invalid() {
            return true;
        }
        match self.implicit(e, op, target) {
            Ok(()) => {}
            Err(ConvertError::Overflow) => {
                let text = self.describe(e, op);
                self.error(
                    ErrorCode::E2013,
                    e.span,
                    format!("cannot use {text} as {target} value in {context} (overflows)"),
                );
                return false;
            }
            Err(ConvertError::Mismatch) => {}
        }
        if assignable(&op.ty, target) {
            return true;
        }
        let text = self.describe(e, op);
        self.error(
            ErrorCode::E2001,
            e.span,
            format!("cannot use {text} as {target} value in {context}"),
        );
        false
    }

    fn ident(&mut self, e: &Expr, name: &str, lvalue: bool) -> Operand {
        if name == "_" {
            self.error(ErrorCode::E2002, e.span, "cannot use _ as value");
            return Operand::invalid();
        }
        match self.lookup(name) {
            Some(Found::Entity(Entity::Local(lid))) => {
                if !lvalue {
                    self.mark_used(lid);
                }
                self.info.uses.insert(e.id, Resolution::Local(lid));
                Operand::variable(self.info.local(lid).ty.clone())
            }
            Some(Found::Entity(Entity::Const(value, ty))) => {
                self.info.uses.insert(e.id, Resolution::Const(value.clone()));
                Operand::constant(value, ty)
            }
            Some(Found::Object) => self.object(e, name),
            Some(Found::Import(exports)) => {
                let path: Arc<str> = Arc::from(exports.path.as_str());
                self.info.uses.insert(e.id, Resolution::Package(Arc::clone(&path)));
                Operand {
                    mode: Mode::Package(path),
                    ty: Type::Invalid,
                }
            }
            Some(Found::Universe(p)) => self.predeclared(e, name, p),
            None => {
                self.error(ErrorCode::E2002, e.span, format!("undefined: {name}"));
                Operand::invalid()
            }
        }
    }

    fn object(&mut self, e: &Expr, name: &str) -> Operand {
        let Some(object) = self.objects.get(name).cloned() else {
            return Operand::invalid();
        };
        let pkg = Arc::clone(&self.path);
        match object {
            Object::Func { name_id, .. } => {
                let Some(sig) = self.info.signatures.get(&name_id).cloned() else {
                    return Operand::invalid();
                };
                self.info.uses.insert(
                    e.id,
                    Resolution::Func {
                        pkg,
                        name: Arc::from(name),
                    },
                );
                Operand::value(Type::Func(sig))
            }
            Object::Var { spec, ty, .. } => {
                let ty = match ty {
                    Some(ty) => Some(ty),
                    None => {
                        self.resolve_spec(spec);
                        match self.objects.get(name) {
                            Some(Object::Var { ty, .. }) => ty.clone(),
                            _ => None,
                        }
                    }
                };
                let Some(ty) = ty else {
                    return self.cycle(e, name);
                };
                self.info.uses.insert(
                    e.id,
                    Resolution::Global {
                        pkg,
                        name: Arc::from(name),
                    },
                );
                Operand::variable(ty)
            }
            Object::Const { spec, value, .. } => {
                let value = match value {
                    Some(value) => Some(value),
                    None => {
                        self.resolve_spec(spec);
                        match self.objects.get(name) {
                            Some(Object::Const { value, .. }) => value.clone(),
                            _ => None,
                        }
                    }
                };
                let Some((value, ty)) = value else {
                    return self.cycle(e, name);
                };
                if ty.is_invalid() {
                    return Operand::invalid();
                }
                self.info.uses.insert(e.id, Resolution::Const(value.clone()));
                Operand::constant(value, ty)
            }
        }
    }

    fn cycle(&mut self, e: &Expr, name: &str) -> Operand {
        self.error(
            ErrorCode::E2007,
            e.span,
            format!("initialization cycle: {name} refers to itself"),
        );
        Operand::invalid()
    }

    fn predeclared(&mut self, e: &Expr, name: &str, p: Predeclared) -> Operand {
        match p {
            Predeclared::Type(ty) => {
                self.info.uses.insert(e.id, Resolution::Type(ty.clone()));
                Operand {
                    mode: Mode::TypeExpr,
                    ty,
                }
            }
            Predeclared::Const(value, ty) => {
                self.info.uses.insert(e.id, Resolution::Const(value.clone()));
                Operand::constant(value, ty)
            }
            Predeclared::Builtin(b) => {
                self.info.uses.insert(e.id, Resolution::Builtin(b));
                Operand {
                    mode: Mode::Builtin(b),
                    ty: Type::Invalid,
                }
            }
            Predeclared::Nil => {
                self.info.uses.insert(e.id, Resolution::Nil);
                Operand::value(Type::Untyped(Untyped::Nil))
            }
            Predeclared::Iota => match self.iota {
                Some(iota) => {
                    let value = ConstValue::Int(iota);
                    self.info.uses.insert(e.id, Resolution::Const(value.clone()));
                    Operand::constant(value, Type::Untyped(Untyped::Int))
                }
                None => {
                    self.error(
                        ErrorCode::E2002,
                        e.span,
                        format!("cannot use {name} outside constant declaration"),
                    );
                    Operand::invalid()
                }
            },
        }
    }

    fn selector(&mut self, e: &Expr, base: &Expr, name: &str) -> Operand {
        let target = self.raw_expr(base, false);
        let Mode::Package(path) = &target.mode else {
            if !target.is_invalid() {
                self.error(
                    ErrorCode::E2002,
                    e.span,
                    format!(
                        "{}.{name} undefined (type {} has no field or method {name})",
                        expr_string(base),
                        target.ty
                    ),
                );
            }
            return Operand::invalid();
        };
        let Some(exports) = self.importer.import(path) else {
            return Operand::invalid();
        };
        let package = exports.name.as_str();
        if !is_exported(name) {
            self.error(
                ErrorCode::E2010,
                e.span,
                format!("name {name} not exported by package {package}"),
            );
            return Operand::invalid();
        }
        let Some(member) = exports.members.get(name) else {
            self.error(ErrorCode::E2002, e.span, format!("undefined: {package}.{name}"));
            return Operand::invalid();
        };
        let pkg = Arc::clone(path);
        match member {
            Member::Func(sig) => {
                self.info.uses.insert(
                    e.id,
                    Resolution::Func {
                        pkg,
                        name: Arc::from(name),
                    },
                );
                Operand::value(Type::Func(Arc::clone(sig)))
            }
            Member::Var(ty) => {
                self.info.uses.insert(
                    e.id,
                    Resolution::Global {
                        pkg,
                        name: Arc::from(name),
                    },
                );
                Operand::variable(ty.clone())
            }
            Member::Const(value, ty) => {
                self.info.uses.insert(e.id, Resolution::Const(value.clone()));
                Operand::constant(value.clone(), ty.clone())
            }
            Member::Intrinsic(i) => {
                self.info.uses.insert(e.id, Resolution::Intrinsic(*i));
                Operand {
                    mode: Mode::Intrinsic(*i),
                    ty: Type::Invalid,
                }
            }
        }
    }

    fn unary(&mut self, e: &Expr, op: UnaryOp, operand: &Expr) -> Operand {
        let x = self.single(operand);
        if x.is_invalid() {
            return Operand::invalid();
        }
        if op == UnaryOp::Recv {
            let Type::Chan(elem) = &x.ty else {
                let text = self.describe(operand, &x);
                self.error(
                    ErrorCode::E2007,
                    e.span,
                    format!("invalid operation: cannot receive from non-channel {text}"),
                );
                return Operand::invalid();
            };
            return Operand::value((**elem).clone());
        }
        let ok = match op {
            UnaryOp::Not => x.ty.is_boolean(),
            _ => x.ty.is_integer(),
        };
        if !ok {
            let text = self.describe(operand, &x);
            self.error(
                ErrorCode::E2007,
                e.span,
                format!("invalid operation: operator {} not defined on {text}", op.as_symbol()),
            );
            return Operand::invalid();
        }
        let Some(value) = x.const_value() else {
            return Operand::value(x.ty);
        };
        let unsigned_bits = match &x.ty {
            Type::Int(kind) if !kind.is_signed() => Some(self.sizes.int_bits(*kind)),
            _ => None,
        };
        match constant::unary(op, value, unsigned_bits) {
            Ok(result) => self.typed_constant(e.span, result, x.ty),
            Err(_) => {
                self.error(ErrorCode::E2013, e.span, "constant overflow");
                Operand::invalid()
            }
        }
    }

    /// A folded constant, checked against its type when typed.
    fn typed_constant(&mut self, span: Span, value: ConstValue, ty: Type) -> Operand {
        if let (Type::Int(kind), ConstValue::Int(v)) = (&ty, &value) {
            if !constant::representable(*v, *kind, &self.sizes) {
                self.error(ErrorCode::E2013, span, format!("constant {v} overflows {ty}"));
                return Operand::invalid();
            }
        }
        Operand::constant(value, ty)
    }

    /// Check `left op right` on already-checked operands.
    pub(crate) fn binary_op(
        &mut self,
        span: Span,
        op: BinaryOp,
        left: &Expr,
        mut l: Operand,
        right: &Expr,
        mut r: Operand,
    ) -> Operand {
        if l.is_invalid() || r.is_invalid() {
            return Operand::invalid();
        }
        if op.is_shift() {
            return self.shift(span, op, left, l, right, r);
        }
        let l_nil = l.ty == Type::Untyped(Untyped::Nil);
        let r_nil = r.ty == Type::Untyped(Untyped::Nil);
        if !self.match_operands(left, &mut l, right, &mut r) {
            self.mismatch(span, op, left, &l, right, &r);
            return Operand::invalid();
        }
        if op.is_comparison() {
            return self.comparison(span, op, left, &l, right, &r, l_nil || r_nil);
        }
        if l.ty != r.ty {
            self.mismatch(span, op, left, &l, right, &r);
            return Operand::invalid();
        }
        let defined = match op {
            BinaryOp::LogAnd | BinaryOp::LogOr => l.ty.is_boolean(),
            BinaryOp::Add => l.ty.is_integer() || l.ty.is_string(),
            _ => l.ty.is_integer(),
        };
        if !defined {
            let text = self.describe(left, &l);
            self.error(
                ErrorCode::E2007,
                span,
                format!("invalid operation: operator {} not defined on {text}", op.as_symbol()),
            );
            return Operand::invalid();
        }
        if matches!(op, BinaryOp::Div | BinaryOp::Rem)
            && r.const_value() == Some(&ConstValue::Int(0))
        {
            self.error(ErrorCode::E2013, right.span, "invalid operation: division by zero");
            return Operand::invalid();
        }
        match (l.const_value(), r.const_value()) {
            (Some(a), Some(b)) => match constant::binary(op, a, b) {
                Ok(value) => self.typed_constant(span, value, l.ty),
                Err(err) => {
                    self.const_error(span, err);
                    Operand::invalid()
                }
            },
            _ => Operand::value(l.ty),
        }
    }

    fn const_error(&mut self, span: Span, err: ConstError) {
        let message = match err {
            ConstError::DivisionByZero => "invalid operation: division by zero",
            ConstError::Overflow => "constant overflow",
            ConstError::NegativeShift => "invalid negative shift count",
            ConstError::ShiftTooLarge => "constant shift overflow",
            ConstError::Mismatch => "invalid constant operation",
        };
        self.error(ErrorCode::E2013, span, message);
    }

    fn mismatch(&mut self, span: Span, op: BinaryOp, left: &Expr, l: &Operand, right: &Expr, r: &Operand) {
        self.error(
            ErrorCode::E2007,
            span,
            format!(
                "invalid operation: {} {} {} (mismatched types {} and {})",
                expr_string(left),
                op.as_symbol(),
                expr_string(right),
                l.ty,
                r.ty
            ),
        );
    }

    /// Bring an untyped operand to the type of the other one. Both untyped
    /// integer kinds meet at rune.
    fn match_operands(&mut self, left: &Expr, l: &mut Operand, right: &Expr, r: &mut Operand) -> bool {
        match (l.ty.clone(), r.ty.clone()) {
            (Type::Untyped(a), Type::Untyped(b)) => {
                let numeric = |u: Untyped| matches!(u, Untyped::Int | Untyped::Rune);
                if a == b {
                    a != Untyped::Nil
                } else if numeric(a) && numeric(b) {
                    l.ty = Type::Untyped(Untyped::Rune);
                    r.ty = Type::Untyped(Untyped::Rune);
                    true
                } else {
                    false
                }
            }
            (Type::Untyped(_), target) => self.implicit(left, l, &target).is_ok(),
            (target, Type::Untyped(_)) => self.implicit(right, r, &target).is_ok(),
            _ => true,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn comparison(
        &mut self,
        span: Span,
        op: BinaryOp,
        left: &Expr,
        l: &Operand,
        right: &Expr,
        r: &Operand,
        against_nil: bool,
    ) -> Operand {
        let ok = if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
            if l.ty == r.ty {
                l.ty.is_comparable() || against_nil
            } else {
                (l.ty == Type::Any && r.ty.is_comparable()) || (r.ty == Type::Any && l.ty.is_comparable())
            }
        } else {
            l.ty == r.ty && l.ty.is_ordered()
        };
        if !ok {
            if l.ty == r.ty || l.ty == Type::Any || r.ty == Type::Any {
                let (culprit, operand) = if l.ty.is_comparable() && l.ty != Type::Any {
                    (right, r)
                } else {
                    (left, l)
                };
                let text = self.describe(culprit, operand);
                let why = match &operand.ty {
                    Type::Slice(_) => "slice can only be compared to nil".to_string(),
                    Type::Func(_) => "func can only be compared to nil".to_string(),
                    _ => format!("operator {} not defined on {text}", op.as_symbol()),
                };
                self.error(
                    ErrorCode::E2007,
                    span,
                    format!(
                        "invalid operation: {} {} {} ({why})",
                        expr_string(left),
                        op.as_symbol(),
                        expr_string(right)
                    ),
                );
            } else {
                self.mismatch(span, op, left, l, right, r);
            }
            return Operand::invalid();
        }
        let result = Type::Untyped(Untyped::Bool);
        match (l.const_value(), r.const_value()) {
            (Some(a), Some(b)) => match constant::binary(op, a, b) {
                Ok(value) => Operand::constant(value, result),
                Err(err) => {
                    self.const_error(span, err);
                    Operand::invalid()
                }
            },
            _ => Operand::value(result),
        }
    }

    fn shift(&mut self, span: Span, op: BinaryOp, left: &Expr, mut l: Operand, right: &Expr, mut r: Operand) -> Operand {
        if let Some(ConstValue::Int(count)) = r.const_value() {
            if *count < 0 {
                self.error(
                    ErrorCode::E2007,
                    right.span,
                    format!("invalid shift count {}", expr_string(right)),
                );
                return Operand::invalid();
            }
        }
        if !r.ty.is_integer() {
            let text = self.describe(right, &r);
            self.error(ErrorCode::E2007, right.span, format!("shift count {text} must be integer"));
            return Operand::invalid();
        }
        if !l.ty.is_integer() {
            let text = self.describe(left, &l);
            self.error(
                ErrorCode::E2007,
                span,
                format!("invalid operation: shifted operand {text} must be integer"),
            );
            return Operand::invalid();
        }
        if let (Some(a), Some(b)) = (l.const_value(), r.const_value()) {
            return match constant::binary(op, a, b) {
                Ok(value) => self.typed_constant(span, value, l.ty),
                Err(err) => {
                    self.const_error(span, err);
                    Operand::invalid()
                }
            };
        }
        // A non-constant shift of an untyped constant takes type int.
        if l.ty.is_untyped() && self.implicit(left, &mut l, &Type::INT).is_err() {
            self.error(
                ErrorCode::E2013,
                left.span,
                format!("constant {} overflows int", expr_string(left)),
            );
            return Operand::invalid();
        }
        if r.ty.is_untyped() && self.implicit(right, &mut r, &Type::Int(crate::IntKind::Uint)).is_err() {
            self.error(
                ErrorCode::E2013,
                right.span,
                format!("shift count {} overflows uint", expr_string(right)),
            );
            return Operand::invalid();
        }
        Operand::value(l.ty)
    }

    /// An index or slice bound: an integer, converted to `int` when untyped.
    pub(crate) fn index_value(&mut self, e: &Expr) -> Operand {
        let mut op = self.single(e);
        if op.is_invalid() {
            return op;
        }
        if !op.ty.is_integer() {
            let text = self.describe(e, &op);
            self.error(ErrorCode::E2007, e.span, format!("invalid argument: index {text} must be integer"));
            return Operand::invalid();
        }
        if let Some(ConstValue::Int(v)) = op.const_value() {
            if *v < 0 {
                let text = self.describe(e, &op);
                self.error(
                    ErrorCode::E2007,
                    e.span,
                    format!("invalid argument: index {text} must not be negative"),
                );
                return Operand::invalid();
            }
        }
        if op.ty.is_untyped() && self.implicit(e, &mut op, &Type::INT).is_err() {
            self.error(
                ErrorCode::E2013,
                e.span,
                format!("index {} overflows int", expr_string(e)),
            );
            return Operand::invalid();
        }
        op
    }

    /// Strings index and slice like `[]byte` but yield values.
    fn string_base(&mut self, e: &Expr, op: &mut Operand) {
        if op.ty == Type::Untyped(Untyped::String) {
            let _ = self.implicit(e, op, &Type::String);
        }
    }

    fn index(&mut self, base: &Expr, index: &Expr) -> Operand {
        let mut b = self.single(base);
        let i = self.index_value(index);
        if b.is_invalid() {
            return Operand::invalid();
        }
        self.string_base(base, &mut b);
        let result = match &b.ty {
            Type::Slice(elem) => Operand::variable((**elem).clone()),
            Type::String => Operand::value(Type::BYTE),
            _ => {
                let text = self.describe(base, &b);
                self.error(ErrorCode::E2007, base.span, format!("invalid operation: cannot index {text}"));
                return Operand::invalid();
            }
        };
        if i.is_invalid() {
            return Operand::invalid();
        }
        result
    }

    fn slice_expr(&mut self, base: &Expr, low: Option<&Expr>, high: Option<&Expr>) -> Operand {
        let mut b = self.single(base);
        let lo = low.map(|e| self.index_value(e));
        let hi = high.map(|e| self.index_value(e));
        if b.is_invalid() {
            return Operand::invalid();
        }
        self.string_base(base, &mut b);
        if !matches!(b.ty, Type::Slice(_) | Type::String) {
            let text = self.describe(base, &b);
            self.error(ErrorCode::E2007, base.span, format!("cannot slice {text}"));
            return Operand::invalid();
        }
        let bound = |op: &Option<Operand>| match op.as_ref().and_then(Operand::const_value) {
            Some(ConstValue::Int(v)) => Some(*v),
            _ => None,
        };
        if let (Some(l), Some(h), Some(high)) = (bound(&lo), bound(&hi), high) {
            if h < l {
                self.error(ErrorCode::E2007, high.span, format!("invalid slice indices: {h} < {l}"));
                return Operand::invalid();
            }
        }
        Operand::value(b.ty)
    }

    fn slice_lit(&mut self, elem: &TypeExpr, elems: &[Expr]) -> Operand {
        let elem = self.resolve_type(elem);
        for value in elems {
            self.value_of(value, &elem, "slice literal");
        }
        Operand::value(Type::slice(elem))
    }

    fn type_assert(&mut self, base: &Expr, ty: &TypeExpr) -> Operand {
        let x = self.single(base);
        let target = self.resolve_type(ty);
        if x.is_invalid() {
            return Operand::invalid();
        }
        if x.ty != Type::Any {
            let text = self.describe(base, &x);
            self.error(
                ErrorCode::E2018,
                base.span,
                format!("invalid operation: {text} is not an interface"),
            );
            return Operand::invalid();
        }
        Operand::value(target)
    }

    /// Resolve the target of an assignment without counting it as a use.
    pub(crate) fn lvalue(&mut self, e: &Expr) -> Operand {
        let op = match &e.unparen().kind {
            ExprKind::Ident(name) if name == "_" => return Operand::invalid(),
            ExprKind::Ident(_) => self.raw_expr(e, true),
            _ => self.expr(e),
        };
        if op.is_invalid() {
            return Operand::invalid();
        }
        if op.mode != Mode::Variable {
            let text = self.describe(e, &op);
            self.error(ErrorCode::E2016, e.span, format!("cannot assign to {text}"));
            return Operand::invalid();
        }
        op
    }
}
