//! Calls: function values, builtins, intrinsics and conversions.

use std::sync::Arc;

use gossa_ir::ast::Expr;
use gossa_types::{Builtin, CallKind, Signature, Type};
use smallvec::SmallVec;

use super::BodyBuilder;
use crate::ir::{CallCommon, Callee, InstrKind, ValueId};

impl BodyBuilder<'_> {
    pub(super) fn call(&mut self, e: &Expr, func: &Expr, args: &[Expr], spread: bool) -> ValueId {
        let info = self.info;
        match info.calls.get(&e.id) {
            Some(CallKind::Conversion(target)) => self.conversion(args, target),
            Some(CallKind::Builtin(Builtin::Make)) => self.make(e, args),
            Some(CallKind::Builtin(Builtin::Panic)) => {
                let value = match args.first() {
                    Some(arg) => self.value_to(arg, &Type::Any),
                    None => self.zero(Type::Any),
                };
                self.cur.terminate(InstrKind::Panic { value });
                value
            }
            _ => match self.call_common(e, func, args, spread) {
                Some((call, ty)) => self.cur.emit(InstrKind::Call(call), ty),
                None => self.invalid(e),
            },
        }
    }

    /// Callee and arguments of a call, plus the type of its result.
    ///
    /// Shared by ordinary calls and `go`/`defer`, which evaluate the
    /// callee and arguments immediately but invoke them later. Returns
    /// `None` for conversions.
    pub(super) fn call_common(
        &mut self,
        e: &Expr,
        func: &Expr,
        args: &[Expr],
        spread: bool,
    ) -> Option<(CallCommon, Type)> {
        let info = self.info;
        match info.calls.get(&e.id)? {
            CallKind::Conversion(_) => None,
            CallKind::Builtin(b) => {
                let args = self.builtin_args(e, *b, args, spread);
                let call = CallCommon {
                    callee: Callee::Builtin(*b),
                    args,
                    spread: spread && *b == Builtin::Append,
                };
                Some((call, self.result_type(e)))
            }
            CallKind::Intrinsic(i) => {
                let args = args.iter().map(|arg| self.expr(arg)).collect();
                let call = CallCommon {
                    callee: Callee::Intrinsic(*i),
                    args,
                    spread: false,
                };
                Some((call, self.result_type(e)))
            }
            CallKind::Func => {
                let callee = self.expr(func);
                let sig: Arc<Signature> = self
                    .cur
                    .value_type(callee)
                    .signature()
                    .cloned()
                    .unwrap_or_default();
                let args = self.arguments(args, &sig.params);
                let call = CallCommon {
                    callee: Callee::Value(callee),
                    args,
                    spread: false,
                };
                Some((call, sig.result_type()))
            }
        }
    }

    fn result_type(&self, e: &Expr) -> Type {
        match self.ty(e) {
            Type::Invalid => Type::unit(),
            ty => ty,
        }
    }

    /// Arguments converted to the parameter types; `f(g())` with a
    /// multi-valued `g` spreads the tuple.
    fn arguments(&mut self, args: &[Expr], params: &[Type]) -> SmallVec<[ValueId; 4]> {
        if let [arg] = args {
            if params.len() != 1 {
                let tuple = self.expr(arg);
                let Type::Tuple(items) = self.cur.value_type(tuple).clone() else {
                    return SmallVec::new();
                };
                return items
                    .iter()
                    .zip(params)
                    .enumerate()
                    .map(|(index, (item, param))| {
                        let v = self.cur.emit(InstrKind::Extract { tuple, index }, item.clone());
                        self.coerce(v, param)
                    })
                    .collect();
            }
        }
        args.iter()
            .zip(params)
            .map(|(arg, param)| self.value_to(arg, param))
            .collect()
    }

    fn builtin_args(
        &mut self,
        e: &Expr,
        b: Builtin,
        args: &[Expr],
        spread: bool,
    ) -> SmallVec<[ValueId; 4]> {
        match b {
            Builtin::Append => {
                let slice = self.ty(e);
                let elem = slice.elem().cloned().unwrap_or(Type::Invalid);
                let Some((first, rest)) = args.split_first() else {
                    return SmallVec::new();
                };
                let mut out = SmallVec::new();
                out.push(self.value_to(first, &slice));
                for arg in rest {
                    // `append(s, t...)` takes `t` as is: a slice or a string.
                    let v = if spread {
                        self.expr(arg)
                    } else {
                        self.value_to(arg, &elem)
                    };
                    out.push(v);
                }
                out
            }
            Builtin::Panic => args
                .iter()
                .map(|arg| self.value_to(arg, &Type::Any))
                .collect(),
            // The type operand is not a value.
            Builtin::Make => args.iter().skip(1).map(|arg| self.expr(arg)).collect(),
            Builtin::Print | Builtin::Println => {
                let values: SmallVec<[ValueId; 4]> = args.iter().map(|arg| self.expr(arg)).collect();
                let &[tuple] = values.as_slice() else {
                    return values;
                };
                let Type::Tuple(items) = self.cur.value_type(tuple).clone() else {
                    return values;
                };
                items
                    .iter()
                    .enumerate()
                    .map(|(index, item)| self.cur.emit(InstrKind::Extract { tuple, index }, item.clone()))
                    .collect()
            }
            Builtin::Cap
            | Builtin::Close
            | Builtin::Copy
            | Builtin::Len
            | Builtin::Recover => args.iter().map(|arg| self.expr(arg)).collect(),
        }
    }

    /// `make([]T, len[, cap])` and `make(chan T[, size])`.
    fn make(&mut self, e: &Expr, args: &[Expr]) -> ValueId {
        let ty = self.ty(e);
        let sizes: Vec<ValueId> = args.iter().skip(1).map(|arg| self.expr(arg)).collect();
        match ty {
            Type::Slice(_) => {
                let len = match sizes.first() {
                    Some(&len) => len,
                    None => self.int(0, Type::INT),
                };
                let cap = sizes.get(1).copied().unwrap_or(len);
                self.cur.emit(InstrKind::MakeSlice { len, cap }, ty)
            }
            Type::Chan(_) => {
                let size = sizes.first().copied();
                self.cur.emit(InstrKind::MakeChan { size }, ty)
            }
            _ => self.invalid(e),
        }
    }

    /// A non-constant conversion; constant ones were folded by the checker.
    fn conversion(&mut self, args: &[Expr], target: &Type) -> ValueId {
        let Some(arg) = args.first() else {
            return self.zero(target.clone());
        };
        if self.is_nil(arg) {
            return self.zero(target.clone());
        }
        let v = self.expr(arg);
        if self.cur.value_type(v) == target {
            return v;
        }
        if *target == Type::Any {
            return self.coerce(v, target);
        }
        self.cur.emit(InstrKind::Convert { value: v }, target.clone())
    }
}
