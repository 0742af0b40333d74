//! What the checker learns about a package, keyed by syntax node.

use std::fmt;
use std::sync::Arc;

use gossa_ir::{NodeId, Span};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{ConstValue, Signature, Type};

/// Index of a local variable (parameter, result or block variable) in
/// [`TypeInfo::locals`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalId(u32);

impl LocalId {
    #[inline]
    pub const fn new(raw: u32) -> Self {
        LocalId(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "l{}", self.0)
    }
}

/// A local variable and the function that declares it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalInfo {
    pub name: String,
    pub ty: Type,
    /// Node of the declaring function: the name of a `func` declaration or
    /// the function literal expression.
    pub owner: NodeId,
    pub span: Span,
}

/// Functions of the predeclared universe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Append,
    Cap,
    Close,
    Copy,
    Len,
    Make,
    Panic,
    Print,
    Println,
    Recover,
}

impl Builtin {
    pub const fn name(self) -> &'static str {
        match self {
            Builtin::Append => "append",
            Builtin::Cap => "cap",
            Builtin::Close => "close",
            Builtin::Copy => "copy",
            Builtin::Len => "len",
            Builtin::Make => "make",
            Builtin::Panic => "panic",
            Builtin::Print => "print",
            Builtin::Println => "println",
            Builtin::Recover => "recover",
        }
    }
}

/// Functions of the intrinsic packages, implemented by the interpreter.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    /// `runtime.Gosched`
    Gosched,
    /// `runtime.NumGoroutine`
    NumGoroutine,
    /// `runtime.GC`
    Gc,
    /// `os.Exit`
    Exit,
    /// `unsafe.Sizeof`
    Sizeof,
    /// `unsafe.Alignof`
    Alignof,
}

impl Intrinsic {
    pub const fn qualified_name(self) -> &'static str {
        match self {
            Intrinsic::Gosched => "runtime.Gosched",
            Intrinsic::NumGoroutine => "runtime.NumGoroutine",
            Intrinsic::Gc => "runtime.GC",
            Intrinsic::Exit => "os.Exit",
            Intrinsic::Sizeof => "unsafe.Sizeof",
            Intrinsic::Alignof => "unsafe.Alignof",
        }
    }
}

/// What an identifier or qualified identifier refers to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Local(LocalId),
    /// Package-level variable.
    Global { pkg: Arc<str>, name: Arc<str> },
    /// Package-level function.
    Func { pkg: Arc<str>, name: Arc<str> },
    Const(ConstValue),
    Builtin(Builtin),
    Intrinsic(Intrinsic),
    Type(Type),
    /// An imported package name; only valid as a selector base.
    Package(Arc<str>),
    Nil,
}

/// How a call expression is carried out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// Call of a function value or package-level function.
    Func,
    Conversion(Type),
    Builtin(Builtin),
    Intrinsic(Intrinsic),
}

/// Per-node facts for one package.
#[derive(Clone, Debug, Default)]
pub struct TypeInfo {
    /// Type of every checked expression. Untyped constants are recorded with
    /// the type their context gave them.
    pub types: FxHashMap<NodeId, Type>,
    /// Value of every constant expression.
    pub consts: FxHashMap<NodeId, ConstValue>,
    /// Identifier and qualified-identifier expressions.
    pub uses: FxHashMap<NodeId, Resolution>,
    /// Declaring identifiers of locals.
    pub defs: FxHashMap<NodeId, LocalId>,
    pub locals: Vec<LocalInfo>,
    pub calls: FxHashMap<NodeId, CallKind>,
    /// Receive and type-assertion expressions used in `v, ok` form.
    pub comma_ok: FxHashSet<NodeId>,
    /// Signature of every function declaration and literal, keyed like
    /// [`LocalInfo::owner`].
    pub signatures: FxHashMap<NodeId, Arc<Signature>>,
}

impl TypeInfo {
    pub fn type_of(&self, id: NodeId) -> Option<&Type> {
        self.types.get(&id)
    }

    pub fn local(&self, id: LocalId) -> &LocalInfo {
        &self.locals[id.index()]
    }
}

/// A package-level variable in source order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalInfo {
    pub name: String,
    pub ty: Type,
    pub span: Span,
}

/// Exported member of a package, as seen by importers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Member {
    Func(Arc<Signature>),
    Var(Type),
    Const(ConstValue, Type),
    Intrinsic(Intrinsic),
}

/// The exported surface of a checked or intrinsic package.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PackageExports {
    pub path: String,
    pub name: String,
    pub members: FxHashMap<String, Member>,
    /// Implemented by the interpreter rather than by source.
    pub intrinsic: bool,
}

/// Everything known about one checked package.
#[derive(Clone, Debug)]
pub struct PackageInfo {
    pub path: String,
    pub name: String,
    pub info: TypeInfo,
    pub globals: Vec<GlobalInfo>,
    pub funcs: FxHashMap<String, Arc<Signature>>,
    pub exports: Arc<PackageExports>,
}

/// Source of imported packages for the checker.
pub trait Importer {
    fn import(&self, path: &str) -> Option<Arc<PackageExports>>;
}

impl Importer for FxHashMap<String, Arc<PackageExports>> {
    fn import(&self, path: &str) -> Option<Arc<PackageExports>> {
        self.get(path).cloned()
    }
}
