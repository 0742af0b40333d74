//! Expressions.

use std::sync::Arc;

use gossa_ir::ast::{Expr, ExprKind};
use gossa_ir::{BinaryOp, UnaryOp};
use gossa_stack::ensure_sufficient_stack;
use gossa_types::{ConstValue, Resolution, Type, Untyped};

use super::BodyBuilder;
use crate::ir::{Const, InstrKind, ValueId};

impl BodyBuilder<'_> {
    /// The checked type of an expression, with untyped constants defaulted.
    pub(super) fn ty(&self, e: &Expr) -> Type {
        self.info.types.get(&e.id).map_or(Type::Invalid, Type::defaulted)
    }

    pub(super) fn zero(&mut self, ty: Type) -> ValueId {
        self.cur.emit(InstrKind::Const(Const::Zero), ty)
    }

    pub(super) fn constant(&mut self, value: &ConstValue, ty: Type) -> ValueId {
        let c = match value {
            ConstValue::Int(v) => Const::Int(*v),
            ConstValue::Bool(b) => Const::Bool(*b),
            ConstValue::Str(s) => Const::Str(Arc::clone(s)),
        };
        self.cur.emit(InstrKind::Const(c), ty)
    }

    pub(super) fn int(&mut self, v: i128, ty: Type) -> ValueId {
        self.cur.emit(InstrKind::Const(Const::Int(v)), ty)
    }

    /// Something the checker should have rejected.
    pub(super) fn invalid(&mut self, e: &Expr) -> ValueId {
        tracing::error!(function = %self.cur.name, node = ?e.id, "expression without a value");
        let ty = self.ty(e);
        self.zero(ty)
    }

    pub(super) fn is_nil(&self, e: &Expr) -> bool {
        let e = e.unparen();
        matches!(e.kind, ExprKind::Ident(_)) && self.info.uses.get(&e.id) == Some(&Resolution::Nil)
    }

    /// Box `v` as `any` when the target requires it.
    pub(super) fn coerce(&mut self, v: ValueId, target: &Type) -> ValueId {
        if *target == Type::Any && *self.cur.value_type(v) != Type::Any {
            return self.cur.emit(InstrKind::MakeInterface { value: v }, Type::Any);
        }
        v
    }

    /// Evaluate `e` for a destination of type `target`.
    pub(super) fn value_to(&mut self, e: &Expr, target: &Type) -> ValueId {
        if self.is_nil(e) {
            return self.zero(target.clone());
        }
        let v = self.expr(e);
        self.coerce(v, target)
    }

    pub(super) fn expr(&mut self, e: &Expr) -> ValueId {
        ensure_sufficient_stack(|| self.expr_kind(e))
    }

    fn expr_kind(&mut self, e: &Expr) -> ValueId {
        let info = self.info;
        if let Some(value) = info.consts.get(&e.id) {
            let ty = self.ty(e);
            return self.constant(value, ty);
        }
        match &e.kind {
            ExprKind::Paren(inner) => self.expr(inner),
            ExprKind::Ident(_) | ExprKind::Selector { .. } => self.name(e),
            ExprKind::Unary { op, operand } => self.unary(e, *op, operand),
            ExprKind::Binary { op, left, right } => self.binary(e, *op, left, right),
            ExprKind::Call { func, args, spread } => self.call(e, func, args, *spread),
            ExprKind::Index { base, index } => {
                let base = self.expr(base);
                let index = self.expr(index);
                let ty = self.ty(e);
                self.cur.emit(InstrKind::Index { base, index }, ty)
            }
            ExprKind::Slice { base, low, high } => {
                let base = self.expr(base);
                let low = low.as_deref().map(|l| self.expr(l));
                let high = high.as_deref().map(|h| self.expr(h));
                let ty = self.ty(e);
                self.cur.emit(InstrKind::Slice { base, low, high }, ty)
            }
            ExprKind::SliceLit { elems, .. } => {
                let ty = self.ty(e);
                let elem = ty.elem().cloned().unwrap_or(Type::Invalid);
                let elems = elems.iter().map(|el| self.value_to(el, &elem)).collect();
                self.cur.emit(InstrKind::SliceLit { elems }, ty)
            }
            ExprKind::FuncLit { sig, body } => self.func_lit(e.id, sig, body),
            ExprKind::TypeAssert { base, .. } => {
                let value = self.expr(base);
                let target = self.ty(e);
                let comma_ok = self.info.comma_ok.contains(&e.id);
                let ty = if comma_ok {
                    Type::Tuple(Arc::from(vec![target.clone(), Type::Bool]))
                } else {
                    target.clone()
                };
                self.cur.emit(
                    InstrKind::TypeAssert {
                        value,
                        ty: target,
                        comma_ok,
                    },
                    ty,
                )
            }
            ExprKind::Int(_) | ExprKind::Str(_) | ExprKind::Char(_) | ExprKind::Type(_) => {
                self.invalid(e)
            }
        }
    }

    /// Identifiers and package-qualified names.
    fn name(&mut self, e: &Expr) -> ValueId {
        let info = self.info;
        match info.uses.get(&e.id) {
            Some(Resolution::Local(local)) => {
                let local = *local;
                let cell = self.cell(local);
                let ty = self.info.local(local).ty.clone();
                self.cur.emit(InstrKind::Load { cell }, ty)
            }
            Some(Resolution::Global { pkg, name }) => {
                let Some(global) = self.state.global_id(pkg, name) else {
                    return self.invalid(e);
                };
                let ty = self.state.program.global(global).ty.clone();
                let cell = self.cur.emit(InstrKind::Global(global), ty.clone());
                self.cur.emit(InstrKind::Load { cell }, ty)
            }
            Some(Resolution::Func { pkg, name }) => {
                let Some(func) = self.state.func_id(pkg, name) else {
                    return self.invalid(e);
                };
                let ty = Type::Func(Arc::clone(&self.state.program.function(func).signature));
                self.cur.emit(InstrKind::FuncRef(func), ty)
            }
            Some(Resolution::Nil) => {
                let ty = match self.ty(e) {
                    Type::Untyped(Untyped::Nil) => Type::Any,
                    ty => ty,
                };
                self.zero(ty)
            }
            _ => self.invalid(e),
        }
    }

    fn unary(&mut self, e: &Expr, op: UnaryOp, operand: &Expr) -> ValueId {
        match op {
            UnaryOp::Plus => self.expr(operand),
            UnaryOp::Recv => {
                let chan = self.expr(operand);
                let elem = self.ty(e);
                let comma_ok = self.info.comma_ok.contains(&e.id);
                let ty = if comma_ok {
                    Type::Tuple(Arc::from(vec![elem, Type::Bool]))
                } else {
                    elem
                };
                self.cur.emit(InstrKind::Recv { chan, comma_ok }, ty)
            }
            UnaryOp::Neg | UnaryOp::Not | UnaryOp::BitNot => {
                let operand = self.expr(operand);
                let ty = self.ty(e);
                self.cur.emit(InstrKind::UnOp { op, operand }, ty)
            }
        }
    }

    fn binary(&mut self, e: &Expr, op: BinaryOp, left: &Expr, right: &Expr) -> ValueId {
        match op {
            BinaryOp::LogAnd | BinaryOp::LogOr => self.logical(op, left, right),
            _ if op.is_comparison() => {
                let (l, r) = self.comparison_operands(left, right);
                self.cur.emit(InstrKind::BinOp { op, left: l, right: r }, Type::Bool)
            }
            _ => {
                let l = self.expr(left);
                let r = self.expr(right);
                let ty = self.ty(e);
                self.cur.emit(InstrKind::BinOp { op, left: l, right: r }, ty)
            }
        }
    }

    /// Operands of `==` and friends; a concrete value compared with an
    /// `any` is boxed first.
    pub(super) fn comparison_operands(&mut self, left: &Expr, right: &Expr) -> (ValueId, ValueId) {
        let (lt, rt) = (self.ty(left), self.ty(right));
        let l = self.value_to(left, &rt);
        let r = self.value_to(right, &lt);
        (l, r)
    }

    /// `a && b` and `a || b`: evaluate `b` only when needed and merge the
    /// two outcomes with a phi.
    fn logical(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> ValueId {
        let l = self.expr(left);
        let rhs = self.cur.new_block();
        let done = self.cur.new_block();
        let from = if op == BinaryOp::LogAnd {
            self.cur.branch(l, rhs, done)
        } else {
            self.cur.branch(l, done, rhs)
        };
        self.cur.position_at(rhs);
        let r = self.expr(right);
        self.cur.jump(done);
        self.cur.position_at(done);
        self.cur.phi(done, Type::Bool, |pred| if pred == from { l } else { r })
    }
}
