//! The IR data model.
//!
//! Values are named by [`ValueId`], unique within one [`Function`]. A value
//! is defined by a function parameter, a free variable, or the `dst` of
//! exactly one instruction. Control flow refers to blocks by [`BlockId`];
//! block 0 is the entry.

use std::fmt;
use std::sync::Arc;

use gossa_ir::{BinaryOp, UnaryOp};
use gossa_types::{Builtin, Intrinsic, Signature, Type};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

// ── ID newtypes ─────────────────────────────────────────────────────

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// The index as `usize`, for indexing into `Vec`s.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id_type!(
    /// A value within one function.
    ValueId,
    "t"
);
id_type!(
    /// A basic block within one function.
    BlockId,
    "b"
);
id_type!(
    /// A function of the program, indexing [`Program::functions`].
    FuncId,
    "f"
);
id_type!(
    /// A package-level variable, indexing [`Program::globals`].
    GlobalId,
    "g"
);

gossa_ir::static_assert_size!(ValueId, 4);

// ── Instructions ────────────────────────────────────────────────────

/// A constant operand. `Zero` is the zero value of the defined value's type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Const {
    Int(i128),
    Bool(bool),
    Str(Arc<str>),
    Zero,
}

/// What a call, `go` or `defer` invokes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Callee {
    /// A function value: a [`InstrKind::FuncRef`], a closure or a loaded
    /// variable.
    Value(ValueId),
    Builtin(Builtin),
    Intrinsic(Intrinsic),
}

/// The callee and evaluated arguments shared by `Call`, `Go` and `Defer`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CallCommon {
    pub callee: Callee,
    pub args: SmallVec<[ValueId; 4]>,
    /// The last argument is spread (`append(s, t...)`).
    pub spread: bool,
}

impl CallCommon {
    pub fn operands(&self) -> impl Iterator<Item = ValueId> + '_ {
        let callee = match self.callee {
            Callee::Value(v) => Some(v),
            Callee::Builtin(_) | Callee::Intrinsic(_) => None,
        };
        callee.into_iter().chain(self.args.iter().copied())
    }
}

/// One instruction. Cells (`Alloc`, `Global`) have the type of their
/// contents.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum InstrKind {
    Const(Const),
    /// A fresh zero-valued cell.
    Alloc,
    Load {
        cell: ValueId,
    },
    Store {
        cell: ValueId,
        value: ValueId,
    },
    /// The cell of a package-level variable.
    Global(GlobalId),
    /// Arithmetic, bitwise and comparison operators; never `&&` or `||`.
    BinOp {
        op: BinaryOp,
        left: ValueId,
        right: ValueId,
    },
    /// `-`, `!` and `^`; receives are [`InstrKind::Recv`].
    UnOp {
        op: UnaryOp,
        operand: ValueId,
    },
    /// One edge per predecessor, in predecessor order.
    Phi {
        edges: SmallVec<[ValueId; 2]>,
    },
    Call(CallCommon),
    MakeClosure {
        func: FuncId,
        /// Cells captured from the enclosing function, in the order of the
        /// closure's free variables.
        bindings: Vec<ValueId>,
    },
    FuncRef(FuncId),
    MakeSlice {
        len: ValueId,
        cap: ValueId,
    },
    SliceLit {
        elems: Vec<ValueId>,
    },
    /// Element of a slice or byte of a string.
    Index {
        base: ValueId,
        index: ValueId,
    },
    StoreIndex {
        base: ValueId,
        index: ValueId,
        value: ValueId,
    },
    Slice {
        base: ValueId,
        low: Option<ValueId>,
        high: Option<ValueId>,
    },
    MakeChan {
        size: Option<ValueId>,
    },
    Send {
        chan: ValueId,
        value: ValueId,
    },
    /// `<-ch`; in `v, ok` form the result is a `(T, bool)` tuple.
    Recv {
        chan: ValueId,
        comma_ok: bool,
    },
    /// Box a concrete value as `any`.
    MakeInterface {
        value: ValueId,
    },
    /// `x.(T)`; in `v, ok` form the result is a `(T, bool)` tuple.
    TypeAssert {
        value: ValueId,
        ty: Type,
        comma_ok: bool,
    },
    /// Conversion to the defined value's type.
    Convert {
        value: ValueId,
    },
    Extract {
        tuple: ValueId,
        index: usize,
    },
    /// Start iterating over the runes of a string.
    RangeIter {
        value: ValueId,
    },
    /// Advance a string iterator: `(ok bool, index int, rune)`.
    Next {
        iter: ValueId,
    },
    Go(CallCommon),
    Defer(CallCommon),
    /// Run the function's deferred calls before a normal return.
    RunDefers,

    // Terminators
    Jump(BlockId),
    If {
        cond: ValueId,
        then: BlockId,
        els: BlockId,
    },
    Return(SmallVec<[ValueId; 2]>),
    /// Raise a panic with an `any` value.
    Panic {
        value: ValueId,
    },
}

impl InstrKind {
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            InstrKind::Jump(_) | InstrKind::If { .. } | InstrKind::Return(_) | InstrKind::Panic { .. }
        )
    }

    /// Blocks a terminator transfers control to, in successor order.
    pub fn targets(&self) -> SmallVec<[BlockId; 2]> {
        match self {
            InstrKind::Jump(target) => smallvec::smallvec![*target],
            InstrKind::If { then, els, .. } => smallvec::smallvec![*then, *els],
            _ => SmallVec::new(),
        }
    }

    /// Every value this instruction reads.
    pub fn operands(&self) -> SmallVec<[ValueId; 4]> {
        let mut out = SmallVec::new();
        match self {
            InstrKind::Const(_)
            | InstrKind::Alloc
            | InstrKind::Global(_)
            | InstrKind::FuncRef(_)
            | InstrKind::RunDefers
            | InstrKind::Jump(_) => {}
            InstrKind::Load { cell } => out.push(*cell),
            InstrKind::Store { cell, value } => out.extend([*cell, *value]),
            InstrKind::BinOp { left, right, .. } => out.extend([*left, *right]),
            InstrKind::UnOp { operand, .. } => out.push(*operand),
            InstrKind::Phi { edges } => out.extend(edges.iter().copied()),
            InstrKind::Call(call) | InstrKind::Go(call) | InstrKind::Defer(call) => {
                out.extend(call.operands());
            }
            InstrKind::MakeClosure { bindings, .. } => out.extend(bindings.iter().copied()),
            InstrKind::MakeSlice { len, cap } => out.extend([*len, *cap]),
            InstrKind::SliceLit { elems } => out.extend(elems.iter().copied()),
            InstrKind::Index { base, index } => out.extend([*base, *index]),
            InstrKind::StoreIndex { base, index, value } => out.extend([*base, *index, *value]),
            InstrKind::Slice { base, low, high } => {
                out.push(*base);
                out.extend(low.iter().chain(high).copied());
            }
            InstrKind::MakeChan { size } => out.extend(size.iter().copied()),
            InstrKind::Send { chan, value } => out.extend([*chan, *value]),
            InstrKind::Recv { chan, .. } => out.push(*chan),
            InstrKind::MakeInterface { value }
            | InstrKind::TypeAssert { value, .. }
            | InstrKind::Convert { value }
            | InstrKind::RangeIter { value }
            | InstrKind::Panic { value } => out.push(*value),
            InstrKind::Extract { tuple, .. } => out.push(*tuple),
            InstrKind::Next { iter } => out.push(*iter),
            InstrKind::If { cond, .. } => out.push(*cond),
            InstrKind::Return(values) => out.extend(values.iter().copied()),
        }
        out
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Instr {
    pub dst: Option<ValueId>,
    pub kind: InstrKind,
}

// ── Blocks and functions ────────────────────────────────────────────

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub instrs: Vec<Instr>,
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
}

impl Block {
    pub fn terminator(&self) -> Option<&Instr> {
        self.instrs.last().filter(|i| i.kind.is_terminator())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    /// Qualified name: `main.main`, `main.main$1`, `main.init`.
    pub name: String,
    /// Import path of the package the function belongs to.
    pub package: String,
    pub signature: Arc<Signature>,
    pub params: Vec<ValueId>,
    /// Cells captured from the enclosing function.
    pub free_vars: Vec<ValueId>,
    pub blocks: Vec<Block>,
    /// Type of every value, indexed by [`ValueId`].
    pub value_types: Vec<Type>,
    /// Where execution resumes after a deferred call recovers a panic.
    pub recover: Option<BlockId>,
    pub has_defer: bool,
}

impl Function {
    /// A function with no body yet.
    pub fn declared(name: String, package: String, signature: Arc<Signature>) -> Self {
        Function {
            name,
            package,
            signature,
            params: Vec::new(),
            free_vars: Vec::new(),
            blocks: Vec::new(),
            value_types: Vec::new(),
            recover: None,
            has_defer: false,
        }
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn value_type(&self, v: ValueId) -> &Type {
        self.value_types.get(v.index()).unwrap_or(&Type::Invalid)
    }

    pub fn num_values(&self) -> usize {
        self.value_types.len()
    }
}

// ── Packages and the program ────────────────────────────────────────

/// A package-level variable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Global {
    /// Qualified name: `main.counter`, `os.Args`.
    pub name: String,
    pub ty: Type,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Member {
    Func(FuncId),
    Global(GlobalId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Package {
    pub path: String,
    pub name: String,
    /// Named functions and variables; `init` functions are reached only
    /// through [`Package::init`].
    pub members: FxHashMap<String, Member>,
    /// Synthetic initializer: variable initialization, then `init` bodies.
    pub init: FuncId,
    pub intrinsic: bool,
}

impl Package {
    pub fn func(&self, name: &str) -> Option<FuncId> {
        match self.members.get(name) {
            Some(Member::Func(id)) => Some(*id),
            _ => None,
        }
    }

    pub fn global(&self, name: &str) -> Option<GlobalId> {
        match self.members.get(name) {
            Some(Member::Global(id)) => Some(*id),
            _ => None,
        }
    }
}

/// A built program. Shared read-only by every goroutine of the interpreter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Program {
    /// Dependencies before their importers.
    pub packages: Vec<Package>,
    pub functions: Vec<Function>,
    pub globals: Vec<Global>,
}

impl Program {
    pub fn package(&self, path: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.path == path)
    }

    /// The built form of the `index`th package created from named files.
    pub fn created_package(
        &self,
        loaded: &gossa_loader::LoadedProgram,
        index: usize,
    ) -> Option<&Package> {
        loaded.created.get(index).and_then(|p| self.package(&p.path))
    }

    #[inline]
    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    #[inline]
    pub fn global(&self, id: GlobalId) -> &Global {
        &self.globals[id.index()]
    }
}

#[cfg(test)]
mod tests;
