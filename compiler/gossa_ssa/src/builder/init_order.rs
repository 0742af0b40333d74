//! Order of package-level variable initialization.
//!
//! A variable is initialized after every variable its initializer refers
//! to, directly or through the bodies of package functions it mentions.
//! Among the variables that are ready, the one declared first goes next;
//! when a cycle leaves none ready, declaration order decides.

use std::sync::Arc;

use gossa_ir::ast::{Block, Decl, Expr, ExprKind, Stmt, StmtKind, ValueSpec};
use gossa_loader::LoadedPackage;
use gossa_stack::ensure_sufficient_stack;
use gossa_types::{Resolution, TypeInfo};
use rustc_hash::{FxHashMap, FxHashSet};

/// The package's `var` specs in initialization order.
pub(super) fn init_order(package: &LoadedPackage) -> Vec<&ValueSpec> {
    let info = &package.info.info;
    let decls = || package.files.iter().flat_map(|f| &f.decls);
    let specs: Vec<&ValueSpec> = decls()
        .filter_map(|d| match d {
            Decl::Var(specs) => Some(specs),
            _ => None,
        })
        .flatten()
        .collect();
    let bodies: FxHashMap<&str, &Block> = decls()
        .filter_map(|d| match d {
            Decl::Func(func) if func.name.name != "init" => {
                func.body.as_ref().map(|body| (func.name.name.as_str(), body))
            }
            _ => None,
        })
        .collect();
    let spec_of: FxHashMap<&str, usize> = specs
        .iter()
        .enumerate()
        .flat_map(|(i, spec)| {
            spec.names
                .iter()
                .filter(|n| !n.is_blank())
                .map(move |n| (n.name.as_str(), i))
        })
        .collect();

    let deps: Vec<FxHashSet<usize>> = specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let mut refs = References::new(info, &package.path);
            for value in &spec.values {
                refs.expr(value);
            }
            let mut visited = FxHashSet::default();
            while let Some(func) = refs.funcs.pop() {
                if !visited.insert(Arc::clone(&func)) {
                    continue;
                }
                if let Some(body) = bodies.get(&*func) {
                    refs.stmts(&body.stmts);
                }
            }
            refs.vars
                .iter()
                .filter_map(|name| spec_of.get(&**name).copied())
                .filter(|&d| d != i)
                .collect()
        })
        .collect();

    let mut done = vec![false; specs.len()];
    let mut order = Vec::with_capacity(specs.len());
    while order.len() < specs.len() {
        let ready = (0..specs.len()).find(|&i| !done[i] && deps[i].iter().all(|&d| done[d]));
        let Some(next) = ready.or_else(|| done.iter().position(|d| !d)) else {
            break;
        };
        done[next] = true;
        order.push(specs[next]);
    }
    tracing::trace!(package = %package.path, vars = order.len(), "initialization order");
    order
}

/// Package-level variables and functions of one package mentioned by the
/// visited syntax, including inside function literals.
struct References<'a> {
    info: &'a TypeInfo,
    path: &'a str,
    vars: FxHashSet<Arc<str>>,
    /// Functions still to visit.
    funcs: Vec<Arc<str>>,
}

impl<'a> References<'a> {
    fn new(info: &'a TypeInfo, path: &'a str) -> Self {
        References {
            info,
            path,
            vars: FxHashSet::default(),
            funcs: Vec::new(),
        }
    }

    fn stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.stmt(stmt);
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        ensure_sufficient_stack(|| match &stmt.kind {
            StmtKind::Empty | StmtKind::Break | StmtKind::Continue => {}
            StmtKind::Expr(e) | StmtKind::Go(e) | StmtKind::Defer(e) => self.expr(e),
            StmtKind::Send { chan, value } => {
                self.expr(chan);
                self.expr(value);
            }
            StmtKind::IncDec { target, .. } => self.expr(target),
            StmtKind::Assign { lhs, rhs, .. } => {
                lhs.iter().chain(rhs).for_each(|e| self.expr(e));
            }
            StmtKind::Var(specs) | StmtKind::Const(specs) => {
                specs
                    .iter()
                    .flat_map(|s| &s.values)
                    .for_each(|e| self.expr(e));
            }
            StmtKind::Return(values) => values.iter().for_each(|e| self.expr(e)),
            StmtKind::Block(block) => self.stmts(&block.stmts),
            StmtKind::If {
                init,
                cond,
                then,
                els,
            } => {
                if let Some(init) = init {
                    self.stmt(init);
                }
                self.expr(cond);
                self.stmts(&then.stmts);
                if let Some(els) = els {
                    self.stmt(els);
                }
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
            } => {
                init.iter().chain(post).for_each(|s| self.stmt(s));
                if let Some(cond) = cond {
                    self.expr(cond);
                }
                self.stmts(&body.stmts);
            }
            StmtKind::Range {
                key,
                value,
                expr,
                body,
                ..
            } => {
                key.iter().chain(value).for_each(|e| self.expr(e));
                self.expr(expr);
                self.stmts(&body.stmts);
            }
            StmtKind::Switch { init, tag, clauses } => {
                if let Some(init) = init {
                    self.stmt(init);
                }
                if let Some(tag) = tag {
                    self.expr(tag);
                }
                for clause in clauses {
                    clause.exprs.iter().for_each(|e| self.expr(e));
                    self.stmts(&clause.body);
                }
            }
        });
    }

    fn expr(&mut self, e: &Expr) {
        match self.info.uses.get(&e.id) {
            Some(Resolution::Global { pkg, name }) if **pkg == *self.path => {
                self.vars.insert(Arc::clone(name));
            }
            Some(Resolution::Func { pkg, name }) if **pkg == *self.path => {
                self.funcs.push(Arc::clone(name));
            }
            _ => {}
        }
        ensure_sufficient_stack(|| match &e.kind {
            ExprKind::Int(_)
            | ExprKind::Str(_)
            | ExprKind::Char(_)
            | ExprKind::Ident(_)
            | ExprKind::Type(_) => {}
            ExprKind::Selector { base, .. } | ExprKind::TypeAssert { base, .. } => self.expr(base),
            ExprKind::Unary { operand, .. } => self.expr(operand),
            ExprKind::Paren(inner) => self.expr(inner),
            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }
            ExprKind::Call { func, args, .. } => {
                self.expr(func);
                args.iter().for_each(|a| self.expr(a));
            }
            ExprKind::Index { base, index } => {
                self.expr(base);
                self.expr(index);
            }
            ExprKind::Slice { base, low, high } => {
                self.expr(base);
                low.iter().chain(high).for_each(|e| self.expr(e));
            }
            ExprKind::SliceLit { elems, .. } => elems.iter().for_each(|e| self.expr(e)),
            ExprKind::FuncLit { body, .. } => self.stmts(&body.stmts),
        });
    }
}
