//! Lowering of checked syntax into the IR.
//!
//! Building runs in two passes over the packages, dependencies first:
//! 1. **declare**: every package gets its members, so calls across
//!    packages and forward references resolve to ids;
//! 2. **build**: function bodies and the synthetic package initializers are
//!    lowered, appending one function per function literal.
//!
//! The checker's [`TypeInfo`] drives everything: expression types,
//! constant values, identifier resolutions and call kinds.

mod call;
mod expr;
mod function;
mod init_order;
mod stmt;

use std::sync::Arc;

use gossa_ir::ast::{Block, Decl, FuncDecl, FuncSig, Stmt, StmtKind};
use gossa_ir::NodeId;
use gossa_loader::{LoadedPackage, LoadedProgram};
use gossa_types::{LocalId, Member as CheckedMember, Signature, Type, TypeInfo};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ir::{FuncId, Function, Global, GlobalId, InstrKind, Member, Package, Program, ValueId};
use crate::{sanity_check, BuilderMode, SanityError};

use function::FnState;

impl Program {
    /// Build the IR for every package of a loaded program.
    ///
    /// With [`BuilderMode::SANITY_CHECK_FUNCTIONS`] every function is
    /// checked afterwards and all problems are returned together.
    #[tracing::instrument(level = "debug", skip_all, fields(packages = loaded.packages.len(), ?mode))]
    pub fn build(loaded: &LoadedProgram, mode: BuilderMode) -> Result<Program, SanityError> {
        let mut state = ProgramState::default();
        for package in &loaded.packages {
            state.declare_package(package);
        }
        for package in &loaded.packages {
            if !package.is_intrinsic() {
                state.build_package(package);
            }
        }
        let program = state.program;
        tracing::debug!(
            functions = program.functions.len(),
            globals = program.globals.len(),
            "built program"
        );

        if mode.contains(BuilderMode::PRINT_PACKAGES) {
            for package in &program.packages {
                print!("{}", program.display_package(package));
            }
        }
        if mode.contains(BuilderMode::PRINT_FUNCTIONS) {
            for index in 0..program.functions.len() {
                println!("{}", program.display_function(FuncId::new(index as u32)));
            }
        }
        if mode.contains(BuilderMode::SANITY_CHECK_FUNCTIONS) {
            let problems: Vec<_> = program.functions.iter().flat_map(sanity_check).collect();
            if !problems.is_empty() {
                return Err(SanityError { problems });
            }
        }
        Ok(program)
    }
}

/// The program under construction plus lookup tables.
#[derive(Default)]
struct ProgramState {
    program: Program,
    /// Package index by import path.
    packages: FxHashMap<String, usize>,
    /// Function of each `func` declaration, by the node of its name.
    decls: FxHashMap<NodeId, FuncId>,
    /// `init` functions of each package, in source order.
    inits: FxHashMap<String, Vec<FuncId>>,
}

impl ProgramState {
    fn add_function(&mut self, function: Function) -> FuncId {
        let id = FuncId::new(self.program.functions.len() as u32);
        self.program.functions.push(function);
        id
    }

    fn add_global(&mut self, name: String, ty: Type) -> GlobalId {
        let id = GlobalId::new(self.program.globals.len() as u32);
        self.program.globals.push(Global { name, ty });
        id
    }

    fn member(&self, path: &str, name: &str) -> Option<Member> {
        let index = *self.packages.get(path)?;
        self.program.packages[index].members.get(name).copied()
    }

    fn func_id(&self, path: &str, name: &str) -> Option<FuncId> {
        match self.member(path, name)? {
            Member::Func(id) => Some(id),
            Member::Global(_) => None,
        }
    }

    fn global_id(&self, path: &str, name: &str) -> Option<GlobalId> {
        match self.member(path, name)? {
            Member::Global(id) => Some(id),
            Member::Func(_) => None,
        }
    }

    /// Create the package's members with empty function bodies.
    fn declare_package(&mut self, loaded: &LoadedPackage) {
        let mut members = FxHashMap::default();
        let qualified = |name: &str| format!("{}.{name}", loaded.name);

        if loaded.is_intrinsic() {
            let mut vars: Vec<(&String, &Type)> = loaded
                .exports()
                .members
                .iter()
                .filter_map(|(name, member)| match member {
                    CheckedMember::Var(ty) => Some((name, ty)),
                    _ => None,
                })
                .collect();
            vars.sort_by(|a, b| a.0.cmp(b.0));
            for (name, ty) in vars {
                let id = self.add_global(qualified(name), ty.clone());
                members.insert(name.clone(), Member::Global(id));
            }
        }

        for global in &loaded.info.globals {
            let id = self.add_global(qualified(&global.name), global.ty.clone());
            members.insert(global.name.clone(), Member::Global(id));
        }

        let mut inits = Vec::new();
        for func in funcs(loaded) {
            let sig = loaded
                .info
                .info
                .signatures
                .get(&func.name.id)
                .cloned()
                .unwrap_or_default();
            let name = if func.name.name == "init" {
                format!("{}#{}", qualified("init"), inits.len() + 1)
            } else {
                qualified(&func.name.name)
            };
            let id = self.add_function(Function::declared(name, loaded.path.clone(), sig));
            self.decls.insert(func.name.id, id);
            if func.name.name == "init" {
                inits.push(id);
            } else {
                members.insert(func.name.name.clone(), Member::Func(id));
            }
        }

        let mut init = FnState::new(qualified("init"), loaded.path.clone(), Arc::default());
        init.terminate(InstrKind::Return(SmallVec::new()));
        let init = self.add_function(init.finish());

        self.packages
            .insert(loaded.path.clone(), self.program.packages.len());
        self.inits.insert(loaded.path.clone(), inits);
        self.program.packages.push(Package {
            path: loaded.path.clone(),
            name: loaded.name.clone(),
            members,
            init,
            intrinsic: loaded.is_intrinsic(),
        });
    }

    fn build_package(&mut self, loaded: &LoadedPackage) {
        let _span = tracing::debug_span!("build_package", package = %loaded.path).entered();
        for func in funcs(loaded) {
            let (Some(body), Some(&id)) = (&func.body, self.decls.get(&func.name.id)) else {
                continue;
            };
            let template = &self.program.functions[id.index()];
            let state = FnState::new(
                template.name.clone(),
                template.package.clone(),
                Arc::clone(&template.signature),
            );
            let mut builder = BodyBuilder::new(self, loaded, state);
            builder.function_body(&func.sig, body);
            let function = builder.into_function();
            self.program.functions[id.index()] = function;
        }

        let Some(index) = self.packages.get(&loaded.path).copied() else {
            return;
        };
        let init_id = self.program.packages[index].init;
        let inits = self.inits.get(&loaded.path).cloned().unwrap_or_default();
        let state = FnState::new(
            format!("{}.init", loaded.name),
            loaded.path.clone(),
            Arc::default(),
        );
        let mut builder = BodyBuilder::new(self, loaded, state);
        builder.package_init(&inits);
        let function = builder.into_function();
        self.program.functions[init_id.index()] = function;
    }
}

/// Every `func` declaration of a package, in source order.
fn funcs(loaded: &LoadedPackage) -> impl Iterator<Item = &FuncDecl> {
    loaded.files.iter().flat_map(|f| &f.decls).filter_map(|d| match d {
        Decl::Func(func) => Some(func),
        _ => None,
    })
}

/// Lowers the bodies of one package.
///
/// `cur` is the function being built; `outer` holds the functions whose
/// literals enclose it, innermost last.
pub(super) struct BodyBuilder<'a> {
    state: &'a mut ProgramState,
    package: &'a LoadedPackage,
    info: &'a TypeInfo,
    cur: FnState,
    outer: Vec<FnState>,
}

impl<'a> BodyBuilder<'a> {
    fn new(state: &'a mut ProgramState, package: &'a LoadedPackage, cur: FnState) -> Self {
        BodyBuilder {
            state,
            package,
            info: &package.info.info,
            cur,
            outer: Vec::new(),
        }
    }

    fn into_function(self) -> Function {
        self.cur.finish()
    }

    /// The cell of a local, capturing it from an enclosing function if it
    /// is not declared in the current one.
    pub(super) fn cell(&mut self, local: LocalId) -> ValueId {
        if let Some(&cell) = self.cur.cells.get(&local) {
            return cell;
        }
        let ty = self.info.local(local).ty.clone();
        self.cur.capture(local, ty)
    }

    /// Declare a fresh cell for a local.
    pub(super) fn declare(&mut self, local: LocalId) -> ValueId {
        let ty = self.info.local(local).ty.clone();
        let cell = self.cur.emit(InstrKind::Alloc, ty);
        self.cur.cells.insert(local, cell);
        cell
    }

    /// Parameters, named results, the body and the recover block.
    fn function_body(&mut self, syntax: &FuncSig, body: &Block) {
        let sig = Arc::clone(&self.cur.sig);
        // Parameters are numbered before any cell they are spilled to.
        let values: Vec<ValueId> = sig.params.iter().map(|ty| self.cur.param(ty.clone())).collect();
        for (param, value) in syntax.params.iter().zip(values) {
            let Some(local) = param.name.as_ref().and_then(|n| self.info.defs.get(&n.id)) else {
                continue;
            };
            let cell = self.declare(*local);
            self.cur.emit_effect(InstrKind::Store { cell, value });
        }
        for result in &syntax.results {
            if let Some(local) = result.name.as_ref().and_then(|n| self.info.defs.get(&n.id)) {
                let cell = self.declare(*local);
                self.cur.results.push(cell);
            }
        }
        self.cur.has_defer = contains_defer(&body.stmts);

        self.stmts(&body.stmts);
        if !self.cur.is_terminated() {
            self.return_values(Vec::new());
        }

        if self.cur.has_defer {
            let recover = self.cur.new_block();
            self.cur.position_at(recover);
            let values = if self.cur.results.is_empty() {
                sig.results.iter().map(|ty| self.zero(ty.clone())).collect()
            } else {
                self.load_results()
            };
            self.cur.terminate(InstrKind::Return(values));
            self.cur.recover = Some(recover);
        }
    }

    /// Variable initialization in dependency order, then each `init`.
    fn package_init(&mut self, inits: &[FuncId]) {
        let package = self.package;
        for spec in init_order::init_order(package) {
            self.global_spec(spec);
        }
        for &init in inits {
            let sig = Arc::clone(&self.state.program.function(init).signature);
            let callee = self.cur.emit(InstrKind::FuncRef(init), Type::Func(sig));
            self.cur.emit(
                InstrKind::Call(crate::CallCommon {
                    callee: crate::Callee::Value(callee),
                    args: SmallVec::new(),
                    spread: false,
                }),
                Type::unit(),
            );
        }
        self.cur.terminate(InstrKind::Return(SmallVec::new()));
    }

    /// Build a function literal and return the closure (or plain function)
    /// value.
    pub(super) fn func_lit(&mut self, id: NodeId, syntax: &FuncSig, body: &Block) -> ValueId {
        let sig: Arc<Signature> = self.info.signatures.get(&id).cloned().unwrap_or_default();
        self.cur.literals += 1;
        let child = FnState::new(
            format!("{}${}", self.cur.name, self.cur.literals),
            self.cur.package.clone(),
            Arc::clone(&sig),
        );
        let parent = std::mem::replace(&mut self.cur, child);
        self.outer.push(parent);
        gossa_stack::ensure_sufficient_stack(|| self.function_body(syntax, body));
        let Some(parent) = self.outer.pop() else {
            return self.zero(Type::Func(sig));
        };
        let child = std::mem::replace(&mut self.cur, parent);
        let free_locals = child.free_locals.clone();
        let func = self.state.add_function(child.finish());

        let ty = Type::Func(sig);
        if free_locals.is_empty() {
            return self.cur.emit(InstrKind::FuncRef(func), ty);
        }
        let bindings = free_locals.iter().map(|local| self.cell(*local)).collect();
        self.cur.emit(InstrKind::MakeClosure { func, bindings }, ty)
    }
}

/// Whether a body contains a `defer` outside nested function literals.
fn contains_defer(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Defer(_) => true,
        StmtKind::Block(block) => contains_defer(&block.stmts),
        StmtKind::If { then, els, .. } => {
            contains_defer(&then.stmts) || els.as_deref().is_some_and(|s| contains_defer(std::slice::from_ref(s)))
        }
        StmtKind::For { body, .. } | StmtKind::Range { body, .. } => contains_defer(&body.stmts),
        StmtKind::Switch { clauses, .. } => clauses.iter().any(|c| contains_defer(&c.body)),
        _ => false,
    })
}

#[cfg(test)]
mod tests;
