//! Function bodies and statements.

use std::sync::Arc;

use gossa_diagnostic::{Diagnostic, ErrorCode};
use gossa_ir::ast::{AssignOp, Block, CaseClause, Expr, ExprKind, FuncSig, Ident, Stmt, StmtKind, UnaryOp};
use gossa_ir::{NodeId, Span};
use gossa_stack::ensure_sufficient_stack;
use rustc_hash::FxHashMap;

use super::expr::assignable;
use super::terminate::is_terminating_list;
use super::{expr_string, Checker, Entity, FuncCtx, Mode, Operand};
use crate::{Builtin, CallKind, ConstValue, Resolution, Signature, Type, Untyped};

impl Checker<'_> {
    /// Check a function or function literal body. Parameters and results
    /// share the body's outermost block.
    pub(super) fn func_body(&mut self, owner: NodeId, syntax: &FuncSig, sig: Arc<Signature>, body: &Block) {
        self.funcs.push(FuncCtx {
            owner,
            sig: Arc::clone(&sig),
            named_results: syntax.has_named_results(),
            loops: 0,
            breakable: 0,
        });
        self.push_scope();
        for (param, ty) in syntax.params.iter().zip(&sig.params) {
            if let Some(name) = &param.name {
                self.declare_local(name, ty.clone(), false);
            }
        }
        for (result, ty) in syntax.results.iter().zip(&sig.results) {
            if let Some(name) = &result.name {
                self.declare_local(name, ty.clone(), false);
            }
        }
        self.stmt_list(&body.stmts);
        self.pop_scope();
        self.funcs.pop();

        if !sig.results.is_empty() && !is_terminating_list(&body.stmts, &self.info) {
            let end = Span::point(body.span.end.saturating_sub(1));
            self.error(ErrorCode::E2006, end, "missing return");
        }
    }

    fn stmt_list(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn block(&mut self, block: &Block) {
        self.push_scope();
        self.stmt_list(&block.stmts);
        self.pop_scope();
    }

    fn stmt(&mut self, stmt: &Stmt) {
        ensure_sufficient_stack(|| self.stmt_kind(stmt));
    }

    fn stmt_kind(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Empty => {}
            StmtKind::Expr(e) => self.expr_stmt(e),
            StmtKind::Send { chan, value } => {
                let ch = self.single(chan);
                if ch.is_invalid() {
                    self.expr(value);
                    return;
                }
                let Type::Chan(elem) = &ch.ty else {
                    let text = self.describe(chan, &ch);
                    self.error(
                        ErrorCode::E2007,
                        stmt.span,
                        format!("invalid operation: cannot send to non-channel {text}"),
                    );
                    self.expr(value);
                    return;
                };
                let elem = (**elem).clone();
                self.value_of(value, &elem, "send");
            }
            StmtKind::IncDec { target, inc } => {
                let op = self.lvalue(target);
                if !op.is_invalid() && !op.ty.is_integer() {
                    let text = expr_string(target);
                    let symbol = if *inc { "++" } else { "--" };
                    self.error(
                        ErrorCode::E2007,
                        stmt.span,
                        format!("invalid operation: {text}{symbol} (non-numeric type {})", op.ty),
                    );
                }
            }
            StmtKind::Assign { lhs, op, rhs } => match op {
                AssignOp::Define => self.define(lhs, rhs, stmt.span),
                AssignOp::Assign => self.assign(lhs, rhs, stmt.span),
                AssignOp::Op(binary) => {
                    let (Some(target), Some(value), 1, 1) = (lhs.first(), rhs.first(), lhs.len(), rhs.len()) else {
                        self.error(
                            ErrorCode::E2014,
                            stmt.span,
                            format!("assignment operation {}= requires single-valued expressions", binary.as_symbol()),
                        );
                        return;
                    };
                    let l = self.lvalue(target);
                    let r = self.single(value);
                    let ty = l.ty.clone();
                    let mut result = self.binary_op(stmt.span, *binary, target, l, value, r);
                    if !result.is_invalid() {
                        self.assign_to(value, &mut result, &ty, "assignment");
                    }
                }
            },
            StmtKind::Var(specs) => {
                for spec in specs {
                    let types = self.var_spec(spec);
                    for (name, ty) in spec.names.iter().zip(types) {
                        if !name.is_blank() {
                            self.declare_local(name, ty, true);
                        }
                    }
                }
            }
            StmtKind::Const(specs) => {
                for (iota, spec) in specs.iter().enumerate() {
                    let values = self.const_spec(spec, iota as i128);
                    for (name, (value, ty)) in spec.names.iter().zip(values) {
                        self.info.types.insert(name.id, ty.clone());
                        if !name.is_blank() {
                            self.bind(&name.name, Entity::Const(value, ty), name.span);
                        }
                    }
                }
            }
            StmtKind::Go(call) => self.go_defer(call, "go"),
            StmtKind::Defer(call) => self.go_defer(call, "defer"),
            StmtKind::Return(values) => self.return_stmt(values, stmt.span),
            StmtKind::Break => {
                if self.funcs.last().map_or(0, |f| f.breakable) == 0 {
                    self.error(ErrorCode::E2015, stmt.span, "break is not in a loop, switch, or select");
                }
            }
            StmtKind::Continue => {
                if self.funcs.last().map_or(0, |f| f.loops) == 0 {
                    self.error(ErrorCode::E2015, stmt.span, "continue is not in a loop");
                }
            }
            StmtKind::Block(block) => self.block(block),
            StmtKind::If { init, cond, then, els } => {
                self.push_scope();
                if let Some(init) = init {
                    self.stmt(init);
                }
                self.condition(cond, "if statement");
                self.block(then);
                if let Some(els) = els {
                    self.stmt(els);
                }
                self.pop_scope();
            }
            StmtKind::For { init, cond, post, body } => {
                self.push_scope();
                if let Some(init) = init {
                    self.stmt(init);
                }
                if let Some(cond) = cond {
                    self.condition(cond, "for statement");
                }
                if let Some(post) = post {
                    self.stmt(post);
                }
                self.loop_body(body);
                self.pop_scope();
            }
            StmtKind::Range { key, value, define, expr, body } => {
                self.range(key.as_ref(), value.as_ref(), *define, expr, body);
            }
            StmtKind::Switch { init, tag, clauses } => {
                self.push_scope();
                if let Some(init) = init {
                    self.stmt(init);
                }
                self.switch(tag.as_ref(), clauses);
                self.pop_scope();
            }
        }
    }

    fn loop_body(&mut self, body: &Block) {
        if let Some(func) = self.funcs.last_mut() {
            func.breakable += 1;
            func.loops += 1;
        }
        self.block(body);
        if let Some(func) = self.funcs.last_mut() {
            func.breakable -= 1;
            func.loops -= 1;
        }
    }

    fn condition(&mut self, cond: &Expr, context: &str) {
        let mut op = self.single(cond);
        if op.is_invalid() {
            return;
        }
        if op.ty == Type::Untyped(Untyped::Bool) {
            let _ = self.implicit(cond, &mut op, &Type::Bool);
        }
        if op.ty != Type::Bool {
            let text = self.describe(cond, &op);
            self.error(
                ErrorCode::E2007,
                cond.span,
                format!("non-boolean condition in {context}: {text}"),
            );
        }
    }

    fn expr_stmt(&mut self, e: &Expr) {
        let inner = e.unparen();
        let op = self.expr(e);
        if op.is_invalid() {
            return;
        }
        let used = match &inner.kind {
            ExprKind::Call { .. } => !matches!(
                self.info.calls.get(&inner.id),
                Some(
                    CallKind::Conversion(_)
                        | CallKind::Builtin(Builtin::Append | Builtin::Cap | Builtin::Len | Builtin::Make)
                )
            ),
            ExprKind::Unary { op: UnaryOp::Recv, .. } => true,
            _ => false,
        };
        if !used {
            let text = self.describe(e, &op);
            self.error(ErrorCode::E2007, e.span, format!("{text} is not used"));
        }
    }

    fn go_defer(&mut self, call: &Expr, keyword: &str) {
        let op = self.expr(call);
        if op.is_invalid() {
            return;
        }
        match self.info.calls.get(&call.unparen().id).cloned() {
            Some(CallKind::Conversion(_)) => {
                self.error(
                    ErrorCode::E2007,
                    call.span,
                    format!("{keyword} requires function call, not conversion"),
                );
            }
            Some(CallKind::Builtin(Builtin::Append | Builtin::Cap | Builtin::Len | Builtin::Make)) => {
                self.error(
                    ErrorCode::E2007,
                    call.span,
                    format!("{keyword} discards result of {}", expr_string(call)),
                );
            }
            _ => {}
        }
    }

    fn return_stmt(&mut self, values: &[Expr], span: Span) {
        let Some(func) = self.funcs.last() else { return };
        let (sig, named) = (Arc::clone(&func.sig), func.named_results);
        let want = &sig.results;
        if values.is_empty() {
            if !want.is_empty() && !named {
                self.error(
                    ErrorCode::E2008,
                    span,
                    format!("not enough return values\n\thave ()\n\twant {}", tuple_string(want)),
                );
            }
            return;
        }
        if values.len() == 1 && want.len() != 1 {
            let op = self.expr(&values[0]);
            if op.is_invalid() {
                return;
            }
            if let Type::Tuple(items) = &op.ty {
                if items.len() == want.len() {
                    for (have, target) in items.iter().zip(want) {
                        if !assignable(have, target) {
                            self.error(
                                ErrorCode::E2001,
                                values[0].span,
                                format!(
                                    "cannot use {} (value of type {}) as {target} value in return statement",
                                    expr_string(&values[0]),
                                    op.ty
                                ),
                            );
                            break;
                        }
                    }
                    return;
                }
            }
            self.return_count(&[op.ty], want, span);
            return;
        }
        if values.len() != want.len() {
            let have: Vec<Type> = values.iter().map(|v| self.expr(v).ty).collect();
            self.return_count(&have, want, span);
            return;
        }
        for (value, target) in values.iter().zip(want) {
            self.value_of(value, target, "return statement");
        }
    }

    fn return_count(&mut self, have: &[Type], want: &[Type], span: Span) {
        let shown: Vec<Type> = have
            .iter()
            .flat_map(|t| match t {
                Type::Tuple(items) => items.to_vec(),
                other => vec![other.clone()],
            })
            .collect();
        let which = if shown.len() < want.len() {
            "not enough"
        } else {
            "too many"
        };
        self.error(
            ErrorCode::E2008,
            span,
            format!(
                "{which} return values\n\thave {}\n\twant {}",
                tuple_string(&shown),
                tuple_string(want)
            ),
        );
    }

    /// Check the values of an assignment or declaration against one target
    /// per name; `None` targets take the value's default type. Returns the
    /// type each target ends up with.
    pub(super) fn assign_values(
        &mut self,
        values: &[Expr],
        targets: &[Option<Type>],
        context: &str,
        span: Span,
    ) -> Vec<Type> {
        let n = targets.len();
        if values.len() == n {
            return values
                .iter()
                .zip(targets)
                .map(|(value, target)| match target {
                    Some(ty) => {
                        self.value_of(value, ty, context);
                        ty.clone()
                    }
                    None => self.defaulted(value, context).ty,
                })
                .collect();
        }

        if let ([value], 2) = (values, n) {
            let inner = value.unparen();
            let comma_ok = matches!(
                inner.kind,
                ExprKind::TypeAssert { .. } | ExprKind::Unary { op: UnaryOp::Recv, .. }
            );
            if comma_ok {
                self.info.comma_ok.insert(inner.id);
                let first = match &targets[0] {
                    Some(ty) => {
                        self.value_of(value, ty, context);
                        ty.clone()
                    }
                    None => self.defaulted(value, context).ty,
                };
                let second = targets[1].clone().unwrap_or(Type::Bool);
                if !assignable(&Type::Bool, &second) {
                    self.error(
                        ErrorCode::E2001,
                        value.span,
                        format!("cannot use {} (untyped bool value) as {second} value in {context}", expr_string(value)),
                    );
                }
                return vec![first, second];
            }
        }

        if let [value] = values {
            let op = self.expr(value);
            if op.is_invalid() {
                return vec![Type::Invalid; n];
            }
            if let Type::Tuple(items) = &op.ty {
                if items.len() == n && n > 0 {
                    let mut result = Vec::with_capacity(n);
                    for (have, target) in items.iter().zip(targets) {
                        match target {
                            Some(ty) => {
                                if !assignable(have, ty) {
                                    self.error(
                                        ErrorCode::E2001,
                                        value.span,
                                        format!("cannot use {} value as {ty} value in {context}", have),
                                    );
                                }
                                result.push(ty.clone());
                            }
                            None => result.push(have.clone()),
                        }
                    }
                    return result;
                }
                let returns = if items.is_empty() {
                    format!("{} (no value) used as value", expr_string(value))
                } else {
                    format!(
                        "assignment mismatch: {n} variable{} but {} returns {} value{}",
                        plural(n),
                        expr_string(value),
                        items.len(),
                        plural(items.len())
                    )
                };
                self.error(ErrorCode::E2014, span, returns);
                return vec![Type::Invalid; n];
            }
            if op.mode == Mode::NoValue {
                self.error(
                    ErrorCode::E2019,
                    value.span,
                    format!("{} (no value) used as value", expr_string(value)),
                );
                return vec![Type::Invalid; n];
            }
        } else {
            for value in values {
                self.expr(value);
            }
        }
        self.error(
            ErrorCode::E2014,
            span,
            format!(
                "assignment mismatch: {n} variable{} but {} value{}",
                plural(n),
                values.len(),
                plural(values.len())
            ),
        );
        vec![Type::Invalid; n]
    }

    fn define(&mut self, lhs: &[Expr], rhs: &[Expr], span: Span) {
        let mut names: Vec<Option<Ident>> = Vec::with_capacity(lhs.len());
        let mut seen: FxHashMap<&str, Span> = FxHashMap::default();
        let mut any_new = false;
        let mut targets = Vec::with_capacity(lhs.len());
        for target in lhs {
            let ExprKind::Ident(name) = &target.kind else {
                self.error(
                    ErrorCode::E2016,
                    target.span,
                    format!("non-name {} on left side of :=", expr_string(target)),
                );
                names.push(None);
                targets.push(None);
                continue;
            };
            if name != "_" && seen.insert(name, target.span).is_some() {
                self.error(ErrorCode::E2009, target.span, format!("{name} repeated on left side of :="));
            }
            let existing = match self.in_current_scope(name) {
                Some(Entity::Local(lid)) if name != "_" => Some(*lid),
                _ => None,
            };
            match existing {
                Some(lid) => {
                    let ty = self.info.local(lid).ty.clone();
                    self.info.uses.insert(target.id, Resolution::Local(lid));
                    self.info.types.insert(target.id, ty.clone());
                    targets.push(Some(ty));
                    names.push(None);
                }
                None => {
                    any_new |= name != "_" && self.in_current_scope(name).is_none();
                    targets.push(None);
                    names.push(Some(Ident {
                        id: target.id,
                        name: name.clone(),
                        span: target.span,
                    }));
                }
            }
        }
        if !any_new {
            self.error(ErrorCode::E2005, span, "no new variables on left side of :=");
        }
        let types = self.assign_values(rhs, &targets, "assignment", span);
        for (name, ty) in names.into_iter().zip(types) {
            let Some(name) = name else { continue };
            if name.is_blank() {
                self.info.types.insert(name.id, ty);
                continue;
            }
            if self.in_current_scope(&name.name).is_some() {
                // Declared as a constant in this block; reported by `bind`.
                self.bind(&name.name, Entity::Const(ConstValue::Int(0), Type::Invalid), name.span);
                continue;
            }
            self.declare_local(&name, ty, true);
        }
    }

    fn assign(&mut self, lhs: &[Expr], rhs: &[Expr], span: Span) {
        let mut targets = Vec::with_capacity(lhs.len());
        for target in lhs {
            if target.as_ident() == Some("_") {
                targets.push(None);
                continue;
            }
            let op = self.lvalue(target);
            targets.push(Some(op.ty));
        }
        self.assign_values(rhs, &targets, "assignment", span);
    }

    fn range(&mut self, key: Option<&Expr>, value: Option<&Expr>, define: bool, expr: &Expr, body: &Block) {
        let mut x = self.single(expr);
        if x.ty == Type::Untyped(Untyped::Int) || x.ty == Type::Untyped(Untyped::Rune) {
            if self.implicit(expr, &mut x, &Type::INT).is_err() {
                x = Operand::invalid();
            }
        } else if x.ty == Type::Untyped(Untyped::String) {
            let _ = self.implicit(expr, &mut x, &Type::String);
        }
        let (key_ty, value_ty) = match &x.ty {
            Type::Slice(elem) => (Type::INT, Some((**elem).clone())),
            Type::String => (Type::INT, Some(Type::RUNE)),
            Type::Int(_) => (x.ty.clone(), None),
            Type::Chan(elem) => ((**elem).clone(), None),
            Type::Invalid => (Type::Invalid, Some(Type::Invalid)),
            _ => {
                let text = self.describe(expr, &x);
                self.error(ErrorCode::E2007, expr.span, format!("cannot range over {text}"));
                (Type::Invalid, Some(Type::Invalid))
            }
        };
        if let (Some(value), None) = (value, &value_ty) {
            let text = self.describe(expr, &x);
            self.error(
                ErrorCode::E2007,
                value.span,
                format!("range over {text} permits only one iteration variable"),
            );
        }
        let value_ty = value_ty.unwrap_or(Type::Invalid);

        self.push_scope();
        let vars = [(key, key_ty), (value, value_ty)];
        if define {
            let mut any_new = false;
            for (var, ty) in &vars {
                let Some(var) = var else { continue };
                let ExprKind::Ident(name) = &var.kind else {
                    self.error(
                        ErrorCode::E2016,
                        var.span,
                        format!("non-name {} on left side of :=", expr_string(var)),
                    );
                    continue;
                };
                let ident = Ident {
                    id: var.id,
                    name: name.clone(),
                    span: var.span,
                };
                any_new |= !ident.is_blank();
                if ident.is_blank() {
                    self.info.types.insert(var.id, ty.clone());
                } else {
                    self.declare_local(&ident, ty.clone(), true);
                }
            }
            if !any_new && (key.is_some() || value.is_some()) {
                self.error(ErrorCode::E2005, expr.span, "no new variables on left side of :=");
            }
        } else {
            for (var, ty) in &vars {
                let Some(var) = var else { continue };
                if var.as_ident() == Some("_") {
                    continue;
                }
                let target = self.lvalue(var);
                if !target.is_invalid() && !assignable(ty, &target.ty) {
                    self.error(
                        ErrorCode::E2001,
                        var.span,
                        format!("cannot use {ty} value as {} value in range", target.ty),
                    );
                }
            }
        }
        self.loop_body(body);
        self.pop_scope();
    }

    fn switch(&mut self, tag: Option<&Expr>, clauses: &[CaseClause]) {
        let tag_op = tag.map(|t| (t, self.defaulted(t, "switch expression")));
        let mut seen: FxHashMap<ConstValue, Span> = FxHashMap::default();
        for clause in clauses {
            for case in &clause.exprs {
                match &tag_op {
                    Some((tag_expr, t)) => {
                        let v = self.single(case);
                        if t.is_invalid() || v.is_invalid() {
                            continue;
                        }
                        let compared = self.binary_op(
                            case.span,
                            gossa_ir::BinaryOp::Eq,
                            tag_expr,
                            t.clone(),
                            case,
                            v.clone(),
                        );
                        if compared.is_invalid() {
                            continue;
                        }
                        if let Some(value) = self.info.consts.get(&case.id).cloned() {
                            if let Some(previous) = seen.insert(value, case.span) {
                                self.diagnostics.push(
                                    Diagnostic::error(ErrorCode::E2007)
                                        .with_message(format!(
                                            "duplicate case {} in expression switch",
                                            expr_string(case)
                                        ))
                                        .with_label(case.span, "")
                                        .with_secondary_label(previous, "previous case"),
                                );
                            }
                        }
                    }
                    None => {
                        self.condition(case, "switch case");
                    }
                }
            }
            if let Some(func) = self.funcs.last_mut() {
                func.breakable += 1;
            }
            self.push_scope();
            self.stmt_list(&clause.body);
            self.pop_scope();
            if let Some(func) = self.funcs.last_mut() {
                func.breakable -= 1;
            }
        }
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

fn tuple_string(types: &[Type]) -> String {
    let parts: Vec<String> = types.iter().map(ToString::to_string).collect();
    format!("({})", parts.join(", "))
}
