//! The checker proper.
//!
//! One [`Checker`] handles one package. Declarations are collected first,
//! then package-level variables and constants are resolved (lazily, so an
//! initializer may refer to a later declaration), then function bodies are
//! checked in source order.

mod call;
mod decl;
mod expr;
mod stmt;
mod terminate;

use std::fmt::Write as _;
use std::sync::Arc;

use gossa_diagnostic::{Diagnostic, ErrorCode};
use gossa_ir::ast::{Expr, ExprKind, File, Ident, TypeExpr, TypeExprKind};
use gossa_ir::{NodeId, Span};
use rustc_hash::FxHashMap;

use crate::universe::Predeclared;
use crate::{
    Builtin, ConstValue, Importer, Intrinsic, LocalId, LocalInfo, PackageExports, PackageInfo,
    Signature, Sizes, Type, TypeInfo, Untyped,
};

/// Result of checking one package.
#[derive(Debug)]
pub struct CheckOutput {
    pub package: PackageInfo,
    pub diagnostics: Vec<Diagnostic>,
}

impl CheckOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Type-check the files of one package.
///
/// `path` is the import path the package is known by; imports are resolved
/// through `importer`, which must already hold every dependency.
#[tracing::instrument(level = "debug", skip(files, importer, sizes), fields(files = files.len()))]
pub fn check_package(
    path: &str,
    files: &[File],
    importer: &dyn Importer,
    sizes: Sizes,
) -> CheckOutput {
    let mut checker = Checker::new(path, files, importer, sizes);
    checker.check_files();
    let output = checker.finish();
    tracing::debug!(
        errors = output.diagnostics.len(),
        locals = output.package.info.locals.len(),
        "checked package"
    );
    output
}

/// How an operand may be used.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Invalid,
    /// Call of a function without results.
    NoValue,
    Value,
    /// Assignable storage: locals, package variables and slice elements.
    Variable,
    Const(ConstValue),
    TypeExpr,
    Builtin(Builtin),
    Intrinsic(Intrinsic),
    Package(Arc<str>),
}

/// A checked expression.
#[derive(Clone, Debug)]
pub(crate) struct Operand {
    pub mode: Mode,
    pub ty: Type,
}

impl Operand {
    pub fn invalid() -> Self {
        Operand {
            mode: Mode::Invalid,
            ty: Type::Invalid,
        }
    }

    pub fn value(ty: Type) -> Self {
        Operand {
            mode: Mode::Value,
            ty,
        }
    }

    pub fn variable(ty: Type) -> Self {
        Operand {
            mode: Mode::Variable,
            ty,
        }
    }

    pub fn constant(value: ConstValue, ty: Type) -> Self {
        Operand {
            mode: Mode::Const(value),
            ty,
        }
    }

    pub fn no_value() -> Self {
        Operand {
            mode: Mode::NoValue,
            ty: Type::unit(),
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.mode == Mode::Invalid || self.ty.is_invalid()
    }

    pub fn const_value(&self) -> Option<&ConstValue> {
        match &self.mode {
            Mode::Const(v) => Some(v),
            _ => None,
        }
    }
}

/// Location of a `var` or `const` spec: file, declaration and spec index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub(crate) struct SpecRef {
    pub file: usize,
    pub decl: usize,
    pub spec: usize,
}

/// A package-level name.
#[derive(Clone, Debug)]
pub(crate) enum Object {
    Func {
        /// Node of the declared name; keys the signature.
        name_id: NodeId,
        span: Span,
    },
    Var {
        spec: SpecRef,
        global: usize,
        ty: Option<Type>,
        span: Span,
    },
    Const {
        spec: SpecRef,
        value: Option<(ConstValue, Type)>,
        span: Span,
    },
}

impl Object {
    fn span(&self) -> Span {
        match self {
            Object::Func { span, .. } | Object::Var { span, .. } | Object::Const { span, .. } => {
                *span
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum SpecState {
    InProgress,
    Done,
}

/// An import binding of one file.
pub(crate) struct FileImport {
    pub exports: Arc<PackageExports>,
    pub span: Span,
    pub used: bool,
}

/// What a name in a block scope stands for.
#[derive(Clone, Debug)]
pub(crate) enum Entity {
    Local(LocalId),
    Const(ConstValue, Type),
}

#[derive(Default)]
pub(crate) struct Scope {
    names: FxHashMap<String, (Entity, Span)>,
    locals: Vec<LocalId>,
}

#[derive(Copy, Clone, Default)]
struct LocalUse {
    used: bool,
    report: bool,
}

/// The function whose body is being checked.
pub(crate) struct FuncCtx {
    pub owner: NodeId,
    pub sig: Arc<Signature>,
    pub named_results: bool,
    /// Enclosing `for` statements.
    pub loops: u32,
    /// Enclosing `for` and `switch` statements.
    pub breakable: u32,
}

/// Result of name lookup.
pub(crate) enum Found {
    Entity(Entity),
    Object,
    Import(Arc<PackageExports>),
    Universe(Predeclared),
}

/// Checker state saved while a package-level spec is resolved out of line.
pub(crate) struct Saved {
    scopes: Vec<Scope>,
    funcs: Vec<FuncCtx>,
    file: usize,
    iota: Option<i128>,
}

pub(crate) struct Checker<'a> {
    pub path: Arc<str>,
    pub name: String,
    pub files: &'a [File],
    pub importer: &'a dyn Importer,
    pub sizes: Sizes,
    pub info: TypeInfo,
    pub diagnostics: Vec<Diagnostic>,

    pub objects: FxHashMap<String, Object>,
    pub spec_state: FxHashMap<SpecRef, SpecState>,
    pub globals: Vec<crate::GlobalInfo>,
    /// Per-file import bindings.
    pub imports: Vec<FxHashMap<String, FileImport>>,
    pub file: usize,

    scopes: Vec<Scope>,
    local_use: Vec<LocalUse>,
    pub funcs: Vec<FuncCtx>,
    pub iota: Option<i128>,
}

impl<'a> Checker<'a> {
    fn new(path: &str, files: &'a [File], importer: &'a dyn Importer, sizes: Sizes) -> Self {
        Checker {
            path: Arc::from(path),
            name: files
                .first()
                .map(|f| f.package.name.clone())
                .unwrap_or_default(),
            files,
            importer,
            sizes,
            info: TypeInfo::default(),
            diagnostics: Vec::new(),
            objects: FxHashMap::default(),
            spec_state: FxHashMap::default(),
            globals: Vec::new(),
            imports: Vec::new(),
            file: 0,
            scopes: Vec::new(),
            local_use: Vec::new(),
            funcs: Vec::new(),
            iota: None,
        }
    }

    /// The package's files, independent of any borrow of the checker.
    pub fn files(&self) -> &'a [File] {
        self.files
    }

    pub fn error(&mut self, code: ErrorCode, span: Span, message: impl Into<String>) {
        self.diagnostics.push(
            Diagnostic::error(code)
                .with_message(message)
                .with_label(span, ""),
        );
    }

    // Scopes

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Close the innermost block, reporting locals that were never read.
    pub fn pop_scope(&mut self) {
        let Some(scope) = self.scopes.pop() else {
            return;
        };
        for lid in scope.locals {
            let state = self.local_use[lid.index()];
            if state.report && !state.used {
                let local = &self.info.locals[lid.index()];
                let (span, message) = (local.span, format!("declared and not used: {}", local.name));
                self.error(ErrorCode::E2003, span, message);
            }
        }
    }

    /// Bind a name in the innermost block.
    pub fn bind(&mut self, name: &str, entity: Entity, span: Span) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if let Some((_, previous)) = scope.names.get(name) {
            let previous = *previous;
            self.diagnostics.push(
                Diagnostic::error(ErrorCode::E2009)
                    .with_message(format!("{name} redeclared in this block"))
                    .with_label(span, "")
                    .with_secondary_label(previous, format!("other declaration of {name}")),
            );
            return;
        }
        scope.names.insert(name.to_string(), (entity, span));
    }

    /// Whether `name` is bound in the innermost block.
    pub fn in_current_scope(&self, name: &str) -> Option<&Entity> {
        self.scopes
            .last()
            .and_then(|s| s.names.get(name))
            .map(|(e, _)| e)
    }

    /// Declare a local of the current function. Blank names get an id but
    /// no binding.
    pub fn declare_local(&mut self, ident: &Ident, ty: Type, report_unused: bool) -> LocalId {
        let lid = LocalId::new(self.info.locals.len() as u32);
        let owner = self.funcs.last().map_or(ident.id, |f| f.owner);
        self.info.locals.push(LocalInfo {
            name: ident.name.clone(),
            ty: ty.clone(),
            owner,
            span: ident.span,
        });
        self.local_use.push(LocalUse {
            used: false,
            report: report_unused && !ident.is_blank(),
        });
        self.info.defs.insert(ident.id, lid);
        self.info.types.insert(ident.id, ty);
        if !ident.is_blank() {
            self.bind(&ident.name, Entity::Local(lid), ident.span);
            if let Some(scope) = self.scopes.last_mut() {
                scope.locals.push(lid);
            }
        }
        lid
    }

    pub fn mark_used(&mut self, lid: LocalId) {
        if let Some(state) = self.local_use.get_mut(lid.index()) {
            state.used = true;
        }
    }

    /// Look a name up through the block scopes, the file's imports, the
    /// package scope and the universe.
    pub fn lookup(&mut self, name: &str) -> Option<Found> {
        for scope in self.scopes.iter().rev() {
            if let Some((entity, _)) = scope.names.get(name) {
                return Some(Found::Entity(entity.clone()));
            }
        }
        if let Some(import) = self
            .imports
            .get_mut(self.file)
            .and_then(|imports| imports.get_mut(name))
        {
            import.used = true;
            return Some(Found::Import(Arc::clone(&import.exports)));
        }
        if self.objects.contains_key(name) {
            return Some(Found::Object);
        }
        crate::universe::lookup(name).map(Found::Universe)
    }

    /// Switch to package level (no blocks, no function) in `file`.
    pub fn enter_package_level(&mut self, file: usize) -> Saved {
        Saved {
            scopes: std::mem::take(&mut self.scopes),
            funcs: std::mem::take(&mut self.funcs),
            file: std::mem::replace(&mut self.file, file),
            iota: self.iota.take(),
        }
    }

    pub fn leave_package_level(&mut self, saved: Saved) {
        self.scopes = saved.scopes;
        self.funcs = saved.funcs;
        self.file = saved.file;
        self.iota = saved.iota;
    }

    // Side tables

    /// Record the type (and value) of a checked expression.
    pub fn record(&mut self, e: &Expr, op: &Operand) {
        match &op.mode {
            Mode::Value | Mode::Variable | Mode::NoValue => {
                self.info.types.insert(e.id, op.ty.clone());
            }
            Mode::Const(value) => {
                self.info.types.insert(e.id, op.ty.clone());
                self.info.consts.insert(e.id, value.clone());
            }
            Mode::Invalid => {
                self.info.types.insert(e.id, Type::Invalid);
            }
            Mode::TypeExpr | Mode::Builtin(_) | Mode::Intrinsic(_) | Mode::Package(_) => {}
        }
    }

    /// Re-record an expression whose untyped type was fixed by its context.
    pub fn update_type(&mut self, e: &Expr, ty: &Type) {
        self.info.types.insert(e.id, ty.clone());
        if let ExprKind::Paren(inner) = &e.kind {
            self.update_type(inner, ty);
        }
    }

    // Types

    pub fn resolve_type(&mut self, t: &TypeExpr) -> Type {
        match &t.kind {
            TypeExprKind::Name(ident) => self.type_name(ident),
            TypeExprKind::Qualified { package, name } => {
                match self.lookup(&package.name) {
                    Some(Found::Import(exports)) => {
                        self.info
                            .uses
                            .insert(package.id, crate::Resolution::Package(Arc::from(exports.path.as_str())));
                        if exports.members.contains_key(&name.name) {
                            self.error(
                                ErrorCode::E2012,
                                t.span,
                                format!("{}.{} is not a type", package.name, name.name),
                            );
                        } else {
                            self.error(
                                ErrorCode::E2002,
                                t.span,
                                format!("undefined: {}.{}", package.name, name.name),
                            );
                        }
                    }
                    Some(_) => self.error(
                        ErrorCode::E2012,
                        t.span,
                        format!("{}.{} is not a type", package.name, name.name),
                    ),
                    None => self.error(
                        ErrorCode::E2002,
                        package.span,
                        format!("undefined: {}", package.name),
                    ),
                }
                Type::Invalid
            }
            TypeExprKind::Slice(elem) => Type::slice(self.resolve_type(elem)),
            TypeExprKind::Chan(elem) => Type::chan(self.resolve_type(elem)),
            TypeExprKind::Func(sig) => Type::Func(Arc::new(self.resolve_signature(sig))),
            TypeExprKind::EmptyInterface => Type::Any,
        }
    }

    fn type_name(&mut self, ident: &Ident) -> Type {
        match self.lookup(&ident.name) {
            Some(Found::Universe(Predeclared::Type(ty))) => {
                self.info
                    .uses
                    .insert(ident.id, crate::Resolution::Type(ty.clone()));
                ty
            }
            Some(Found::Import(_)) => {
                self.error(
                    ErrorCode::E2012,
                    ident.span,
                    format!("use of package {} without selector", ident.name),
                );
                Type::Invalid
            }
            Some(_) => {
                self.error(
                    ErrorCode::E2012,
                    ident.span,
                    format!("{} is not a type", ident.name),
                );
                Type::Invalid
            }
            None => {
                self.error(
                    ErrorCode::E2002,
                    ident.span,
                    format!("undefined: {}", ident.name),
                );
                Type::Invalid
            }
        }
    }

    pub fn resolve_signature(&mut self, sig: &gossa_ir::ast::FuncSig) -> Signature {
        let params = sig.params.iter().map(|p| self.resolve_type(&p.ty)).collect();
        let results = sig.results.iter().map(|p| self.resolve_type(&p.ty)).collect();
        Signature::new(params, results)
    }

    /// Go-style description of an operand for diagnostics:
    /// `x (variable of type int)`.
    pub fn describe(&self, e: &Expr, op: &Operand) -> String {
        let text = expr_string(e);
        match &op.mode {
            Mode::Const(value) => {
                let shown = value.to_string();
                let suffix = if shown == text {
                    String::new()
                } else {
                    format!(" {shown}")
                };
                if op.ty.is_untyped() {
                    format!("{text} ({}{suffix})", untyped_constant(&op.ty))
                } else {
                    format!("{text} (constant{suffix} of type {})", op.ty)
                }
            }
            Mode::Variable => format!("{text} (variable of type {})", op.ty),
            Mode::NoValue => format!("{text} (no value)"),
            _ if op.ty == Type::Untyped(Untyped::Nil) => "untyped nil".to_string(),
            _ => format!("{text} (value of type {})", op.ty),
        }
    }

    fn finish(self) -> CheckOutput {
        let exports = Arc::new(self.exports());
        let mut funcs = FxHashMap::default();
        for (name, object) in &self.objects {
            if let Object::Func { name_id, .. } = object {
                if let Some(sig) = self.info.signatures.get(name_id) {
                    funcs.insert(name.clone(), Arc::clone(sig));
                }
            }
        }
        CheckOutput {
            package: PackageInfo {
                path: self.path.to_string(),
                name: self.name,
                info: self.info,
                globals: self.globals,
                funcs,
                exports,
            },
            diagnostics: self.diagnostics,
        }
    }
}

fn untyped_constant(ty: &Type) -> String {
    format!("{ty} constant")
}

/// Whether a package-level name is visible to importers.
pub(crate) fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Source-like rendering of an expression for diagnostics.
pub(crate) fn expr_string(e: &Expr) -> String {
    let mut out = String::new();
    write_expr(&mut out, e);
    out
}

fn write_expr(out: &mut String, e: &Expr) {
    match &e.kind {
        ExprKind::Int(v) => {
            let _ = write!(out, "{v}");
        }
        ExprKind::Str(s) => {
            let _ = write!(out, "{s:?}");
        }
        ExprKind::Char(c) => match u32::try_from(*c).ok().and_then(char::from_u32) {
            Some(ch) => {
                let _ = write!(out, "{ch:?}");
            }
            None => {
                let _ = write!(out, "{c}");
            }
        },
        ExprKind::Ident(name) => out.push_str(name),
        ExprKind::Selector { base, name } => {
            write_expr(out, base);
            out.push('.');
            out.push_str(&name.name);
        }
        ExprKind::Unary { op, operand } => {
            out.push_str(op.as_symbol());
            write_expr(out, operand);
        }
        ExprKind::Binary { op, left, right } => {
            write_expr(out, left);
            let _ = write!(out, " {} ", op.as_symbol());
            write_expr(out, right);
        }
        ExprKind::Call { func, args, spread } => {
            write_expr(out, func);
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_expr(out, arg);
            }
            if *spread {
                out.push_str("...");
            }
            out.push(')');
        }
        ExprKind::Index { base, index } => {
            write_expr(out, base);
            out.push('[');
            write_expr(out, index);
            out.push(']');
        }
        ExprKind::Slice { base, low, high } => {
            write_expr(out, base);
            out.push('[');
            if let Some(low) = low {
                write_expr(out, low);
            }
            out.push(':');
            if let Some(high) = high {
                write_expr(out, high);
            }
            out.push(']');
        }
        ExprKind::SliceLit { elem, .. } => {
            out.push_str("[]");
            write_type(out, elem);
            out.push_str("{…}");
        }
        ExprKind::FuncLit { .. } => out.push_str("func literal"),
        ExprKind::TypeAssert { base, ty } => {
            write_expr(out, base);
            out.push_str(".(");
            write_type(out, ty);
            out.push(')');
        }
        ExprKind::Type(ty) => write_type(out, ty),
        ExprKind::Paren(inner) => {
            out.push('(');
            write_expr(out, inner);
            out.push(')');
        }
    }
}

fn write_type(out: &mut String, t: &TypeExpr) {
    match &t.kind {
        TypeExprKind::Name(ident) => out.push_str(&ident.name),
        TypeExprKind::Qualified { package, name } => {
            let _ = write!(out, "{}.{}", package.name, name.name);
        }
        TypeExprKind::Slice(elem) => {
            out.push_str("[]");
            write_type(out, elem);
        }
        TypeExprKind::Chan(elem) => {
            out.push_str("chan ");
            write_type(out, elem);
        }
        TypeExprKind::Func(_) => out.push_str("func(…)"),
        TypeExprKind::EmptyInterface => out.push_str("interface{}"),
    }
}

#[cfg(test)]
mod tests;
