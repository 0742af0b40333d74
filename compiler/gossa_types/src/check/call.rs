//! Calls: functions, conversions, builtins and intrinsics.

use gossa_diagnostic::ErrorCode;
use gossa_ir::ast::Expr;

use super::expr::assignable;
use super::{expr_string, Checker, Mode, Operand};
use crate::intrinsics::intrinsic_signature;
use crate::{Builtin, CallKind, ConstValue, Intrinsic, Signature, Type, Untyped};

impl Checker<'_> {
    pub(super) fn call(&mut self, e: &Expr, func: &Expr, args: &[Expr], spread: bool) -> Operand {
        let f = self.raw_expr(func, false);
        match f.mode.clone() {
            Mode::Invalid => {
                self.discard_args(args);
                Operand::invalid()
            }
            Mode::TypeExpr => self.conversion(e, f.ty, args, spread),
            Mode::Builtin(b) => self.builtin(e, b, args, spread),
            Mode::Intrinsic(i) => self.intrinsic(e, func, i, args, spread),
            Mode::Package(path) => {
                self.error(
                    ErrorCode::E2007,
                    func.span,
                    format!("use of package {path} without selector"),
                );
                self.discard_args(args);
                Operand::invalid()
            }
            Mode::NoValue | Mode::Value | Mode::Variable | Mode::Const(_) => {
                let Type::Func(sig) = &f.ty else {
                    let text = self.describe(func, &f);
                    self.error(
                        ErrorCode::E2007,
                        e.span,
                        format!("invalid operation: cannot call non-function {text}"),
                    );
                    self.discard_args(args);
                    return Operand::invalid();
                };
                self.info.calls.insert(e.id, CallKind::Func);
                let sig = sig.clone();
                self.arguments(e, func, args, spread, &sig);
                match sig.results.len() {
                    0 => Operand::no_value(),
                    _ => Operand::value(sig.result_type()),
                }
            }
        }
    }

    /// Check arguments only for their side tables and unused-variable
    /// bookkeeping.
    fn discard_args(&mut self, args: &[Expr]) {
        for arg in args {
            self.expr(arg);
        }
    }

    fn arguments(&mut self, e: &Expr, func: &Expr, args: &[Expr], spread: bool, sig: &Signature) {
        let name = expr_string(func);
        if spread {
            self.error(
                ErrorCode::E2007,
                e.span,
                format!("have (...) arguments but {name} is not variadic"),
            );
            self.discard_args(args);
            return;
        }
        let params = &sig.params;
        let context = format!("argument to {name}");

        // f(g()) with a multi-valued g.
        if let [arg] = args {
            if params.len() != 1 {
                let op = self.expr(arg);
                if op.is_invalid() {
                    return;
                }
                if op.mode == Mode::NoValue {
                    self.error(
                        ErrorCode::E2019,
                        arg.span,
                        format!("{} (no value) used as value", expr_string(arg)),
                    );
                    return;
                }
                let Type::Tuple(items) = &op.ty else {
                    self.argument_count(e, &name, 1, params);
                    return;
                };
                if items.len() != params.len() {
                    self.argument_count(e, &name, items.len(), params);
                    return;
                }
                for (t, p) in items.iter().zip(params) {
                    if !assignable(t, p) {
                        self.error(
                            ErrorCode::E2001,
                            arg.span,
                            format!("cannot use {t} value as {p} value in {context}"),
                        );
                    }
                }
                return;
            }
        }

        if args.len() != params.len() {
            self.discard_args(args);
            self.argument_count(e, &name, args.len(), params);
            return;
        }
        for (arg, param) in args.iter().zip(params) {
            self.value_of(arg, param, &context);
        }
    }

    fn argument_count(&mut self, e: &Expr, name: &str, have: usize, params: &[Type]) {
        let which = if have < params.len() {
            "not enough"
        } else {
            "too many"
        };
        let want: Vec<String> = params.iter().map(ToString::to_string).collect();
        self.error(
            ErrorCode::E2008,
            e.span,
            format!("{which} arguments in call to {name}\n\twant ({})", want.join(", ")),
        );
    }

    fn conversion(&mut self, e: &Expr, target: Type, args: &[Expr], spread: bool) -> Operand {
        let [arg] = args else {
            let which = if args.is_empty() { "missing" } else { "too many" };
            self.error(
                ErrorCode::E2008,
                e.span,
                format!("{which} argument in conversion to {target}"),
            );
            self.discard_args(args);
            return Operand::invalid();
        };
        if spread {
            self.error(
                ErrorCode::E2007,
                e.span,
                format!("invalid use of ... in conversion to {target}"),
            );
        }
        self.info.calls.insert(e.id, CallKind::Conversion(target.clone()));
        let mut x = self.single(arg);
        if x.is_invalid() || target.is_invalid() {
            return Operand::value(target);
        }

        if let Some(value) = x.const_value().cloned() {
            match (&target, &value) {
                (Type::Int(kind), ConstValue::Int(v)) if x.ty.is_integer() => {
                    if !crate::constant::representable(*v, *kind, &self.sizes) {
                        let text = self.describe(arg, &x);
                        self.error(
                            ErrorCode::E2013,
                            arg.span,
                            format!("cannot convert {text} to type {target} (overflows)"),
                        );
                        return Operand::invalid();
                    }
                    let _ = self.implicit(arg, &mut x, &target);
                    return Operand::constant(value, target);
                }
                (Type::String, ConstValue::Int(v)) if x.ty.is_integer() => {
                    self.default_operand(arg, &mut x, "conversion");
                    let ch = u32::try_from(*v)
                        .ok()
                        .and_then(char::from_u32)
                        .unwrap_or(char::REPLACEMENT_CHARACTER);
                    return Operand::constant(ConstValue::str(ch.encode_utf8(&mut [0; 4])), target);
                }
                (Type::String, ConstValue::Str(_)) | (Type::Bool, ConstValue::Bool(_)) => {
                    let _ = self.implicit(arg, &mut x, &target);
                    return Operand::constant(value, target);
                }
                _ => {}
            }
        }

        match x.ty.clone() {
            Type::Untyped(Untyped::Nil) => {
                if self.implicit(arg, &mut x, &target).is_err() {
                    let text = self.describe(arg, &x);
                    self.error(
                        ErrorCode::E2017,
                        arg.span,
                        format!("cannot convert {text} to type {target}"),
                    );
                }
                return Operand::value(target);
            }
            Type::Untyped(Untyped::String) if matches!(target, Type::Slice(_)) => {
                let _ = self.implicit(arg, &mut x, &Type::String);
            }
            Type::Untyped(_) => {
                if self.implicit(arg, &mut x, &target).is_err() {
                    self.default_operand(arg, &mut x, "conversion");
                }
            }
            _ => {}
        }

        if !convertible(&x.ty, &target) {
            let text = self.describe(arg, &x);
            self.error(
                ErrorCode::E2017,
                arg.span,
                format!("cannot convert {text} to type {target}"),
            );
        }
        Operand::value(target)
    }

    fn arg_count(&mut self, e: &Expr, b: Builtin, args: &[Expr], min: usize, max: usize) -> bool {
        if (min..=max).contains(&args.len()) {
            return true;
        }
        let which = if args.len() < min {
            "not enough"
        } else {
            "too many"
        };
        let expected = if min == max {
            min.to_string()
        } else {
            format!("{min} or {max}")
        };
        self.error(
            ErrorCode::E2008,
            e.span,
            format!(
                "{which} arguments for {}() (expected {expected}, found {})",
                b.name(),
                args.len()
            ),
        );
        self.discard_args(args);
        false
    }

    fn builtin(&mut self, e: &Expr, b: Builtin, args: &[Expr], spread: bool) -> Operand {
        self.info.calls.insert(e.id, CallKind::Builtin(b));
        if spread && b != Builtin::Append {
            self.error(
                ErrorCode::E2007,
                e.span,
                format!("invalid use of ... with built-in {}", b.name()),
            );
            self.discard_args(args);
            return Operand::invalid();
        }
        match b {
            Builtin::Len | Builtin::Cap => {
                if !self.arg_count(e, b, args, 1, 1) {
                    return Operand::invalid();
                }
                let mut x = self.single(&args[0]);
                if x.is_invalid() {
                    return Operand::value(Type::INT);
                }
                if let (Builtin::Len, Some(ConstValue::Str(s))) = (b, x.const_value()) {
                    let n = s.len() as i128;
                    let _ = self.implicit(&args[0], &mut x, &Type::String);
                    return Operand::constant(ConstValue::Int(n), Type::INT);
                }
                let ok = match x.ty {
                    Type::Slice(_) | Type::Chan(_) => true,
                    Type::String => b == Builtin::Len,
                    _ => false,
                };
                if !ok {
                    let text = self.describe(&args[0], &x);
                    self.error(
                        ErrorCode::E2007,
                        args[0].span,
                        format!("invalid argument: {text} for built-in {}", b.name()),
                    );
                }
                Operand::value(Type::INT)
            }
            Builtin::Append => self.append(e, args, spread),
            Builtin::Make => self.make(e, args),
            Builtin::Close => {
                if !self.arg_count(e, b, args, 1, 1) {
                    return Operand::no_value();
                }
                let x = self.single(&args[0]);
                if !x.is_invalid() && !matches!(x.ty, Type::Chan(_)) {
                    let text = self.describe(&args[0], &x);
                    self.error(
                        ErrorCode::E2007,
                        args[0].span,
                        format!("invalid operation: non-chan argument {text} to close"),
                    );
                }
                Operand::no_value()
            }
            Builtin::Panic => {
                if self.arg_count(e, b, args, 1, 1) {
                    self.value_of(&args[0], &Type::Any, "argument to panic");
                }
                Operand::no_value()
            }
            Builtin::Recover => {
                self.arg_count(e, b, args, 0, 0);
                Operand::value(Type::Any)
            }
            Builtin::Print | Builtin::Println => {
                let context = format!("argument to built-in {}", b.name());
                // println(f()) prints every result of a multi-valued f.
                if let [arg] = args {
                    let mut op = self.expr(arg);
                    match op.ty {
                        Type::Tuple(_) => {}
                        _ if op.mode == Mode::NoValue => self.error(
                            ErrorCode::E2019,
                            arg.span,
                            format!("{} (no value) used as value", expr_string(arg)),
                        ),
                        _ => {
                            self.default_operand(arg, &mut op, &context);
                        }
                    }
                } else {
                    for arg in args {
                        self.defaulted(arg, &context);
                    }
                }
                Operand::no_value()
            }
            Builtin::Copy => {
                if !self.arg_count(e, b, args, 2, 2) {
                    return Operand::value(Type::INT);
                }
                let dst = self.single(&args[0]);
                let mut src = self.single(&args[1]);
                if dst.is_invalid() || src.is_invalid() {
                    return Operand::value(Type::INT);
                }
                if src.ty == Type::Untyped(Untyped::String) {
                    let _ = self.implicit(&args[1], &mut src, &Type::String);
                }
                let ok = match (&dst.ty, &src.ty) {
                    (Type::Slice(d), Type::Slice(s)) => d == s,
                    (Type::Slice(d), Type::String) => **d == Type::BYTE,
                    _ => false,
                };
                if !ok {
                    self.error(
                        ErrorCode::E2007,
                        e.span,
                        format!(
                            "invalid argument: copy expects slice arguments; found {} and {}",
                            self.describe(&args[0], &dst),
                            self.describe(&args[1], &src)
                        ),
                    );
                }
                Operand::value(Type::INT)
            }
        }
    }

    fn append(&mut self, e: &Expr, args: &[Expr], spread: bool) -> Operand {
        let Some((first, rest)) = args.split_first() else {
            self.error(ErrorCode::E2008, e.span, "not enough arguments for append() (expected 1, found 0)");
            return Operand::invalid();
        };
        let s = self.single(first);
        if s.is_invalid() {
            self.discard_args(rest);
            return Operand::invalid();
        }
        let Type::Slice(elem) = &s.ty else {
            let message = if s.ty == Type::Untyped(Untyped::Nil) {
                "first argument to append must be a typed slice; have untyped nil".to_string()
            } else {
                format!("invalid argument: {} is not a slice", self.describe(first, &s))
            };
            self.error(ErrorCode::E2007, first.span, message);
            self.discard_args(rest);
            return Operand::invalid();
        };
        let elem = (**elem).clone();
        if spread {
            let [tail] = rest else {
                self.error(
                    ErrorCode::E2008,
                    e.span,
                    "can only use ... with final argument in list",
                );
                self.discard_args(rest);
                return Operand::value(s.ty);
            };
            let mut t = self.single(tail);
            if t.ty == Type::Untyped(Untyped::String) && elem == Type::BYTE {
                let _ = self.implicit(tail, &mut t, &Type::String);
            }
            if !(t.ty == Type::String && elem == Type::BYTE) {
                self.assign_to(tail, &mut t, &s.ty, "argument to append");
            }
            return Operand::value(s.ty);
        }
        for value in rest {
            self.value_of(value, &elem, "argument to append");
        }
        Operand::value(s.ty)
    }

    fn make(&mut self, e: &Expr, args: &[Expr]) -> Operand {
        let Some((first, sizes)) = args.split_first() else {
            self.error(ErrorCode::E2008, e.span, "not enough arguments for make() (expected 1, found 0)");
            return Operand::invalid();
        };
        let t = self.raw_expr(first, false);
        if t.is_invalid() {
            self.discard_args(sizes);
            return Operand::invalid();
        }
        if t.mode != Mode::TypeExpr {
            self.error(
                ErrorCode::E2012,
                first.span,
                format!("{} is not a type", expr_string(first)),
            );
            self.discard_args(sizes);
            return Operand::invalid();
        }
        let (min, max) = match t.ty {
            Type::Slice(_) => (1, 2),
            Type::Chan(_) => (0, 1),
            _ => {
                self.error(
                    ErrorCode::E2007,
                    first.span,
                    format!("invalid argument: cannot make {}; type must be slice, map, or channel", t.ty),
                );
                self.discard_args(sizes);
                return Operand::invalid();
            }
        };
        if !(min..=max).contains(&sizes.len()) {
            self.error(
                ErrorCode::E2008,
                e.span,
                format!(
                    "invalid operation: {} expects {} or {} arguments; found {}",
                    expr_string(e),
                    min + 1,
                    max + 1,
                    args.len()
                ),
            );
            self.discard_args(sizes);
            return Operand::value(t.ty);
        }
        let values: Vec<Option<i128>> = sizes
            .iter()
            .map(|size| {
                let op = self.index_value(size);
                match op.const_value() {
                    Some(ConstValue::Int(v)) => Some(*v),
                    _ => None,
                }
            })
            .collect();
        if let [Some(len), Some(cap)] = values.as_slice() {
            if len > cap {
                self.error(
                    ErrorCode::E2007,
                    e.span,
                    "invalid argument: length and capacity swapped",
                );
            }
        }
        Operand::value(t.ty)
    }

    fn intrinsic(
        &mut self,
        e: &Expr,
        func: &Expr,
        i: Intrinsic,
        args: &[Expr],
        spread: bool,
    ) -> Operand {
        self.info.calls.insert(e.id, CallKind::Intrinsic(i));
        let Some(sig) = intrinsic_signature(i) else {
            // unsafe.Sizeof and unsafe.Alignof take any single value.
            if args.len() != 1 || spread {
                self.error(
                    ErrorCode::E2008,
                    e.span,
                    format!("{} expects exactly one argument", i.qualified_name()),
                );
                self.discard_args(args);
            } else {
                self.defaulted(&args[0], &format!("argument to {}", i.qualified_name()));
            }
            return Operand::value(Type::UINTPTR);
        };
        self.arguments(e, func, args, spread, &sig);
        match sig.results.len() {
            0 => Operand::no_value(),
            _ => Operand::value(sig.result_type()),
        }
    }
}

/// Non-constant conversions of the subset.
fn convertible(from: &Type, to: &Type) -> bool {
    if from == to || *to == Type::Any {
        return true;
    }
    let bytes_or_runes = |t: &Type| matches!(t, Type::Slice(e) if **e == Type::BYTE || **e == Type::RUNE);
    match (from, to) {
        (Type::Int(_), Type::Int(_) | Type::String) => true,
        (Type::String, t) => bytes_or_runes(t),
        (f, Type::String) => bytes_or_runes(f),
        _ => false,
    }
}
