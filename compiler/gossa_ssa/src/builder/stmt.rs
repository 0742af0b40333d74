//! Statements and control flow.

use std::sync::Arc;

use gossa_ir::ast::{AssignOp, Block, CaseClause, Expr, ExprKind, Stmt, StmtKind, ValueSpec};
use gossa_ir::BinaryOp;
use gossa_stack::ensure_sufficient_stack;
use gossa_types::{Builtin, LocalId, Resolution, Type};
use smallvec::SmallVec;

use super::BodyBuilder;
use crate::ir::{BlockId, CallCommon, Callee, InstrKind, ValueId};

/// The target of an assignment, evaluated before the assigned values.
enum Place {
    Cell(ValueId),
    Elem { base: ValueId, index: ValueId },
    /// `_`
    Discard,
}

impl BodyBuilder<'_> {
    pub(super) fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        ensure_sufficient_stack(|| self.stmt_kind(stmt));
    }

    fn stmt_kind(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Empty | StmtKind::Const(_) => {}
            StmtKind::Expr(e) => {
                self.expr(e);
            }
            StmtKind::Send { chan, value } => {
                let ch = self.expr(chan);
                let elem = self.ty(chan).elem().cloned().unwrap_or(Type::Invalid);
                let value = self.value_to(value, &elem);
                self.cur.emit_effect(InstrKind::Send { chan: ch, value });
            }
            StmtKind::IncDec { target, inc } => {
                let op = if *inc { BinaryOp::Add } else { BinaryOp::Sub };
                let place = self.place(target);
                let ty = self.place_type(&place).unwrap_or(Type::INT);
                let old = self.load(&place, &ty);
                let one = self.int(1, ty.clone());
                let new = self.cur.emit(
                    InstrKind::BinOp {
                        op,
                        left: old,
                        right: one,
                    },
                    ty,
                );
                self.store(&place, new);
            }
            StmtKind::Assign { lhs, op, rhs } => match op {
                AssignOp::Define => self.define(lhs, rhs),
                AssignOp::Assign => self.assign(lhs, rhs),
                AssignOp::Op(binary) => self.op_assign(*binary, lhs, rhs),
            },
            StmtKind::Var(specs) => {
                for spec in specs {
                    self.local_spec(spec);
                }
            }
            StmtKind::Go(call) => self.go_defer(call, false),
            StmtKind::Defer(call) => self.go_defer(call, true),
            StmtKind::Return(values) => self.return_stmt(values),
            StmtKind::Break => {
                if let Some(&target) = self.cur.breaks.last() {
                    self.cur.jump(target);
                }
            }
            StmtKind::Continue => {
                if let Some(&target) = self.cur.continues.last() {
                    self.cur.jump(target);
                }
            }
            StmtKind::Block(block) => self.stmts(&block.stmts),
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => self.if_stmt(init.as_deref(), cond, then, els.as_deref()),
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => self.for_stmt(init.as_deref(), cond.as_ref(), post.as_deref(), body),
            StmtKind::Range {
                key,
                value,
                define,
                expr,
                body,
            } => self.range(key.as_ref(), value.as_ref(), *define, expr, body),
            StmtKind::Switch { init, tag, clauses } => {
                self.switch(init.as_deref(), tag.as_ref(), clauses);
            }
        }
    }

    // Places

    fn place(&mut self, e: &Expr) -> Place {
        let e = e.unparen();
        if e.as_ident() == Some("_") {
            return Place::Discard;
        }
        if let ExprKind::Index { base, index } = &e.kind {
            let base = self.expr(base);
            let index = self.expr(index);
            return Place::Elem { base, index };
        }
        let info = self.info;
        match info.uses.get(&e.id) {
            Some(Resolution::Local(local)) => Place::Cell(self.cell(*local)),
            Some(Resolution::Global { pkg, name }) => {
                let Some(global) = self.state.global_id(pkg, name) else {
                    return Place::Discard;
                };
                let ty = self.state.program.global(global).ty.clone();
                Place::Cell(self.cur.emit(InstrKind::Global(global), ty))
            }
            _ => {
                tracing::error!(function = %self.cur.name, node = ?e.id, "not assignable");
                Place::Discard
            }
        }
    }

    fn place_type(&self, place: &Place) -> Option<Type> {
        match place {
            Place::Cell(cell) => Some(self.cur.value_type(*cell).clone()),
            Place::Elem { base, .. } => self.cur.value_type(*base).elem().cloned(),
            Place::Discard => None,
        }
    }

    fn load(&mut self, place: &Place, ty: &Type) -> ValueId {
        match *place {
            Place::Cell(cell) => self.cur.emit(InstrKind::Load { cell }, ty.clone()),
            Place::Elem { base, index } => self.cur.emit(InstrKind::Index { base, index }, ty.clone()),
            Place::Discard => self.zero(ty.clone()),
        }
    }

    fn store(&mut self, place: &Place, value: ValueId) {
        match *place {
            Place::Cell(cell) => self.cur.emit_effect(InstrKind::Store { cell, value }),
            Place::Elem { base, index } => {
                self.cur
                    .emit_effect(InstrKind::StoreIndex { base, index, value });
            }
            Place::Discard => {}
        }
    }

    /// Evaluate the right-hand side for one target per entry; a single
    /// multi-valued expression is split into its components.
    fn rhs_values(&mut self, rhs: &[Expr], targets: &[Option<Type>]) -> Vec<ValueId> {
        if rhs.len() == targets.len() {
            return rhs
                .iter()
                .zip(targets)
                .map(|(e, target)| match target {
                    Some(ty) => self.value_to(e, ty),
                    None => self.expr(e),
                })
                .collect();
        }
        let [single] = rhs else {
            tracing::error!(function = %self.cur.name, "assignment count mismatch");
            return targets
                .iter()
                .map(|t| self.zero(t.clone().unwrap_or(Type::Invalid)))
                .collect();
        };
        let tuple = self.expr(single);
        let items: Arc<[Type]> = match self.cur.value_type(tuple) {
            Type::Tuple(items) => Arc::clone(items),
            _ => Arc::from(Vec::new()),
        };
        targets
            .iter()
            .enumerate()
            .map(|(index, target)| {
                let ty = items.get(index).cloned().unwrap_or(Type::Invalid);
                let v = self.cur.emit(InstrKind::Extract { tuple, index }, ty);
                match target {
                    Some(ty) => self.coerce(v, ty),
                    None => v,
                }
            })
            .collect()
    }

    // Assignments and declarations

    fn assign(&mut self, lhs: &[Expr], rhs: &[Expr]) {
        let places: Vec<Place> = lhs.iter().map(|target| self.place(target)).collect();
        let targets: Vec<Option<Type>> = places.iter().map(|p| self.place_type(p)).collect();
        let values = self.rhs_values(rhs, &targets);
        for (place, value) in places.iter().zip(values) {
            self.store(place, value);
        }
    }

    /// `:=`: new names get fresh cells after the values are evaluated;
    /// redeclared names are assigned.
    fn define(&mut self, lhs: &[Expr], rhs: &[Expr]) {
        let info = self.info;
        let local_of = |target: &Expr| -> Option<LocalId> {
            match info.uses.get(&target.id) {
                Some(Resolution::Local(local)) => Some(*local),
                _ => info.defs.get(&target.id).copied(),
            }
        };
        let targets: Vec<Option<Type>> = lhs
            .iter()
            .map(|target| local_of(target).map(|local| info.local(local).ty.clone()))
            .collect();
        let values = self.rhs_values(rhs, &targets);
        for (target, value) in lhs.iter().zip(values) {
            let place = match info.defs.get(&target.id) {
                Some(&local) => Place::Cell(self.declare(local)),
                None => self.place(target),
            };
            self.store(&place, value);
        }
    }

    fn op_assign(&mut self, op: BinaryOp, lhs: &[Expr], rhs: &[Expr]) {
        let (Some(target), Some(value)) = (lhs.first(), rhs.first()) else {
            return;
        };
        let place = self.place(target);
        let ty = self.place_type(&place).unwrap_or(Type::Invalid);
        let old = self.load(&place, &ty);
        let right = self.expr(value);
        let new = self.cur.emit(
            InstrKind::BinOp {
                op,
                left: old,
                right,
            },
            ty,
        );
        self.store(&place, new);
    }

    /// `var` inside a function body.
    fn local_spec(&mut self, spec: &ValueSpec) {
        let info = self.info;
        let locals: Vec<Option<LocalId>> = spec
            .names
            .iter()
            .map(|name| info.defs.get(&name.id).copied())
            .collect();
        if spec.values.is_empty() {
            for local in locals.into_iter().flatten() {
                self.declare(local);
            }
            return;
        }
        let targets: Vec<Option<Type>> = locals
            .iter()
            .map(|local| local.map(|l| info.local(l).ty.clone()))
            .collect();
        let values = self.rhs_values(&spec.values, &targets);
        for (local, value) in locals.into_iter().zip(values) {
            if let Some(local) = local {
                let cell = self.declare(local);
                self.cur.emit_effect(InstrKind::Store { cell, value });
            }
        }
    }

    /// `var` at package level, lowered into the package initializer.
    pub(super) fn global_spec(&mut self, spec: &ValueSpec) {
        if spec.values.is_empty() {
            return;
        }
        let package = self.package;
        let path = &package.path;
        let places: Vec<Place> = spec
            .names
            .iter()
            .map(|name| {
                if name.is_blank() {
                    return Place::Discard;
                }
                match self.state.global_id(path, &name.name) {
                    Some(global) => {
                        let ty = self.state.program.global(global).ty.clone();
                        Place::Cell(self.cur.emit(InstrKind::Global(global), ty))
                    }
                    None => Place::Discard,
                }
            })
            .collect();
        let targets: Vec<Option<Type>> = places.iter().map(|p| self.place_type(p)).collect();
        let values = self.rhs_values(&spec.values, &targets);
        for (place, value) in places.iter().zip(values) {
            self.store(place, value);
        }
    }

    // Calls that outlive the statement

    fn go_defer(&mut self, call: &Expr, defer: bool) {
        let e = call.unparen();
        let ExprKind::Call { func, args, spread } = &e.kind else {
            self.expr(call);
            return;
        };
        let Some((common, _)) = self.call_common(e, func, args, *spread) else {
            self.expr(call);
            return;
        };
        if defer {
            self.cur.emit_effect(InstrKind::Defer(common));
        } else {
            self.cur.emit_effect(InstrKind::Go(common));
        }
    }

    // Returns

    fn return_stmt(&mut self, values: &[Expr]) {
        let sig = Arc::clone(&self.cur.sig);
        let values = if values.is_empty() {
            Vec::new()
        } else {
            let targets: Vec<Option<Type>> = sig.results.iter().cloned().map(Some).collect();
            self.rhs_values(values, &targets)
        };
        self.return_values(values);
    }

    /// Return `values`, or the named results for a bare `return`.
    ///
    /// With named results the values pass through the result cells so that
    /// deferred calls observe and may change them.
    pub(super) fn return_values(&mut self, values: Vec<ValueId>) {
        let returned: SmallVec<[ValueId; 2]> = if self.cur.results.is_empty() {
            if self.cur.has_defer {
                self.cur.emit_effect(InstrKind::RunDefers);
            }
            values.into()
        } else {
            let cells = self.cur.results.clone();
            for (cell, value) in cells.into_iter().zip(values) {
                self.cur.emit_effect(InstrKind::Store { cell, value });
            }
            if self.cur.has_defer {
                self.cur.emit_effect(InstrKind::RunDefers);
            }
            self.load_results()
        };
        self.cur.terminate(InstrKind::Return(returned));
    }

    pub(super) fn load_results(&mut self) -> SmallVec<[ValueId; 2]> {
        let cells = self.cur.results.clone();
        cells
            .into_iter()
            .map(|cell| {
                let ty = self.cur.value_type(cell).clone();
                self.cur.emit(InstrKind::Load { cell }, ty)
            })
            .collect()
    }

    // Control flow

    fn if_stmt(&mut self, init: Option<&Stmt>, cond: &Expr, then: &Block, els: Option<&Stmt>) {
        if let Some(init) = init {
            self.stmt(init);
        }
        let c = self.expr(cond);
        let then_block = self.cur.new_block();
        let done = self.cur.new_block();
        let else_block = if els.is_some() {
            self.cur.new_block()
        } else {
            done
        };
        self.cur.branch(c, then_block, else_block);

        self.cur.position_at(then_block);
        self.stmts(&then.stmts);
        self.cur.jump_if_open(done);

        if let Some(els) = els {
            self.cur.position_at(else_block);
            self.stmt(els);
            self.cur.jump_if_open(done);
        }
        self.cur.position_at(done);
    }

    /// Three-clause `for`. Variables declared by the init statement get a
    /// fresh cell per iteration: the header merges the initial cell with
    /// the copy made before each post statement.
    fn for_stmt(&mut self, init: Option<&Stmt>, cond: Option<&Expr>, post: Option<&Stmt>, body: &Block) {
        if let Some(init) = init {
            self.stmt(init);
        }
        let info = self.info;
        let loop_vars: Vec<(LocalId, ValueId)> = match init.map(|s| &s.kind) {
            Some(StmtKind::Assign {
                lhs,
                op: AssignOp::Define,
                ..
            }) => lhs
                .iter()
                .filter_map(|target| info.defs.get(&target.id))
                .filter_map(|local| Some((*local, *self.cur.cells.get(local)?)))
                .collect(),
            _ => Vec::new(),
        };

        let header = self.cur.new_block();
        let body_block = self.cur.new_block();
        let post_block = self.cur.new_block();
        let done = self.cur.new_block();
        let preheader = self.cur.jump(header);

        self.cur.position_at(header);
        let phis: Vec<ValueId> = loop_vars
            .iter()
            .map(|&(local, initial)| {
                let ty = self.cur.value_type(initial).clone();
                let phi = self.cur.phi(header, ty, |_| initial);
                self.cur.cells.insert(local, phi);
                phi
            })
            .collect();
        match cond {
            Some(cond) => {
                let c = self.expr(cond);
                self.cur.branch(c, body_block, done);
            }
            None => {
                self.cur.jump(body_block);
            }
        }

        self.cur.position_at(body_block);
        self.loop_body(body, done, post_block);

        self.cur.position_at(post_block);
        let mut fresh = Vec::with_capacity(phis.len());
        for (&(local, _), &phi) in loop_vars.iter().zip(&phis) {
            let ty = self.cur.value_type(phi).clone();
            let value = self.cur.emit(InstrKind::Load { cell: phi }, ty.clone());
            let cell = self.cur.emit(InstrKind::Alloc, ty);
            self.cur.emit_effect(InstrKind::Store { cell, value });
            self.cur.cells.insert(local, cell);
            fresh.push(cell);
        }
        if let Some(post) = post {
            self.stmt(post);
        }
        self.cur.jump(header);

        for ((&(local, initial), &phi), &next) in loop_vars.iter().zip(&phis).zip(&fresh) {
            self.cur
                .set_phi_edges(header, phi, |pred| if pred == preheader { initial } else { next });
            self.cur.cells.insert(local, phi);
        }
        self.cur.position_at(done);
    }

    fn loop_body(&mut self, body: &Block, done: BlockId, next: BlockId) {
        self.cur.breaks.push(done);
        self.cur.continues.push(next);
        self.stmts(&body.stmts);
        self.cur.breaks.pop();
        self.cur.continues.pop();
        self.cur.jump_if_open(next);
    }

    /// Bind one iteration variable of a `range` loop.
    fn range_var(&mut self, var: Option<&Expr>, define: bool, value: ValueId) {
        let Some(var) = var else { return };
        if define {
            if let Some(&local) = self.info.defs.get(&var.id) {
                let cell = self.declare(local);
                self.cur.emit_effect(InstrKind::Store { cell, value });
            }
            return;
        }
        let place = self.place(var);
        let value = match self.place_type(&place) {
            Some(ty) => self.coerce(value, &ty),
            None => value,
        };
        self.store(&place, value);
    }

    fn range(&mut self, key: Option<&Expr>, value: Option<&Expr>, define: bool, expr: &Expr, body: &Block) {
        match self.ty(expr) {
            ty @ Type::Int(_) => {
                let n = self.expr(expr);
                self.range_counted(n, ty, |this, i| {
                    this.range_var(key, define, i);
                }, body);
            }
            Type::Slice(elem) => {
                let s = self.expr(expr);
                let len = self.cur.emit(
                    InstrKind::Call(CallCommon {
                        callee: Callee::Builtin(Builtin::Len),
                        args: smallvec::smallvec![s],
                        spread: false,
                    }),
                    Type::INT,
                );
                let elem = (*elem).clone();
                self.range_counted(len, Type::INT, |this, i| {
                    this.range_var(key, define, i);
                    if value.is_some() {
                        let v = this.cur.emit(InstrKind::Index { base: s, index: i }, elem.clone());
                        this.range_var(value, define, v);
                    }
                }, body);
            }
            Type::String => {
                let s = self.expr(expr);
                let pair = Type::Tuple(Arc::from(vec![Type::INT, Type::RUNE]));
                let iter = self.cur.emit(InstrKind::RangeIter { value: s }, pair);
                let header = self.cur.new_block();
                let body_block = self.cur.new_block();
                let done = self.cur.new_block();
                self.cur.jump(header);

                self.cur.position_at(header);
                let step = Type::Tuple(Arc::from(vec![Type::Bool, Type::INT, Type::RUNE]));
                let next = self.cur.emit(InstrKind::Next { iter }, step);
                let ok = self.cur.emit(InstrKind::Extract { tuple: next, index: 0 }, Type::Bool);
                self.cur.branch(ok, body_block, done);

                self.cur.position_at(body_block);
                if key.is_some() {
                    let k = self.cur.emit(InstrKind::Extract { tuple: next, index: 1 }, Type::INT);
                    self.range_var(key, define, k);
                }
                if value.is_some() {
                    let v = self.cur.emit(InstrKind::Extract { tuple: next, index: 2 }, Type::RUNE);
                    self.range_var(value, define, v);
                }
                self.loop_body(body, done, header);
                self.cur.position_at(done);
            }
            Type::Chan(elem) => {
                let ch = self.expr(expr);
                let elem = (*elem).clone();
                let header = self.cur.new_block();
                let body_block = self.cur.new_block();
                let done = self.cur.new_block();
                self.cur.jump(header);

                self.cur.position_at(header);
                let received = self.cur.emit(
                    InstrKind::Recv {
                        chan: ch,
                        comma_ok: true,
                    },
                    Type::Tuple(Arc::from(vec![elem.clone(), Type::Bool])),
                );
                let ok = self.cur.emit(InstrKind::Extract { tuple: received, index: 1 }, Type::Bool);
                self.cur.branch(ok, body_block, done);

                self.cur.position_at(body_block);
                if key.is_some() {
                    let v = self.cur.emit(InstrKind::Extract { tuple: received, index: 0 }, elem);
                    self.range_var(key, define, v);
                }
                self.loop_body(body, done, header);
                self.cur.position_at(done);
            }
            _ => {
                self.expr(expr);
            }
        }
    }

    /// A loop over `0..n` with a hidden counter; `bind` sets up the
    /// iteration variables from the current index.
    fn range_counted(
        &mut self,
        n: ValueId,
        ty: Type,
        bind: impl FnOnce(&mut Self, ValueId),
        body: &Block,
    ) {
        let counter = self.cur.emit(InstrKind::Alloc, ty.clone());
        let header = self.cur.new_block();
        let body_block = self.cur.new_block();
        let post_block = self.cur.new_block();
        let done = self.cur.new_block();
        self.cur.jump(header);

        self.cur.position_at(header);
        let i = self.cur.emit(InstrKind::Load { cell: counter }, ty.clone());
        let more = self.cur.emit(
            InstrKind::BinOp {
                op: BinaryOp::Lt,
                left: i,
                right: n,
            },
            Type::Bool,
        );
        self.cur.branch(more, body_block, done);

        self.cur.position_at(body_block);
        bind(self, i);
        self.loop_body(body, done, post_block);

        self.cur.position_at(post_block);
        let current = self.cur.emit(InstrKind::Load { cell: counter }, ty.clone());
        let one = self.int(1, ty.clone());
        let next = self.cur.emit(
            InstrKind::BinOp {
                op: BinaryOp::Add,
                left: current,
                right: one,
            },
            ty,
        );
        self.cur.emit_effect(InstrKind::Store {
            cell: counter,
            value: next,
        });
        self.cur.jump(header);
        self.cur.position_at(done);
    }

    /// An expression switch becomes a chain of comparisons; a tagless
    /// switch tests each case as a condition. Without a matching case
    /// control goes to `default`, wherever it appears.
    fn switch(&mut self, init: Option<&Stmt>, tag: Option<&Expr>, clauses: &[CaseClause]) {
        if let Some(init) = init {
            self.stmt(init);
        }
        let tag = tag.map(|t| {
            let v = self.expr(t);
            (v, self.cur.value_type(v).clone())
        });
        let done = self.cur.new_block();
        let bodies: Vec<BlockId> = clauses.iter().map(|_| self.cur.new_block()).collect();

        for (clause, &body) in clauses.iter().zip(&bodies) {
            for case in &clause.exprs {
                let matched = match &tag {
                    Some((v, ty)) => self.case_matches(*v, ty, case),
                    None => self.expr(case),
                };
                let next = self.cur.new_block();
                self.cur.branch(matched, body, next);
                self.cur.position_at(next);
            }
        }
        let default = clauses
            .iter()
            .zip(&bodies)
            .find(|(clause, _)| clause.is_default)
            .map_or(done, |(_, &body)| body);
        self.cur.jump(default);

        for (clause, &body) in clauses.iter().zip(&bodies) {
            self.cur.position_at(body);
            self.cur.breaks.push(done);
            self.stmts(&clause.body);
            self.cur.breaks.pop();
            self.cur.jump_if_open(done);
        }
        self.cur.position_at(done);
    }

    fn case_matches(&mut self, tag: ValueId, tag_ty: &Type, case: &Expr) -> ValueId {
        let (left, right) = if self.is_nil(case) {
            (tag, self.zero(tag_ty.clone()))
        } else {
            let c = self.expr(case);
            let case_ty = self.cur.value_type(c).clone();
            let c = self.coerce(c, tag_ty);
            (self.coerce(tag, &case_ty), c)
        };
        self.cur.emit(
            InstrKind::BinOp {
                op: BinaryOp::Eq,
                left,
                right,
            },
            Type::Bool,
        )
    }
}
