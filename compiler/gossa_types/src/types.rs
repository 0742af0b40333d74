//! Types of the accepted Go subset.
//!
//! Types are small values: composite types share their components through
//! `Arc`, so cloning a `Type` never copies a tree. Identity is structural,
//! which matches Go for the unnamed types this subset has.

use std::fmt;
use std::sync::Arc;

/// Integer kinds. `byte` is `Uint8` and `rune` is `Int32`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IntKind {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
}

impl IntKind {
    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            IntKind::Int | IntKind::Int8 | IntKind::Int16 | IntKind::Int32 | IntKind::Int64
        )
    }

    /// Width in bits; `int`, `uint` and `uintptr` take the machine word.
    pub const fn bits(self, word_size: u64) -> u32 {
        match self {
            IntKind::Int8 | IntKind::Uint8 => 8,
            IntKind::Int16 | IntKind::Uint16 => 16,
            IntKind::Int32 | IntKind::Uint32 => 32,
            IntKind::Int64 | IntKind::Uint64 => 64,
            IntKind::Int | IntKind::Uint | IntKind::Uintptr => (word_size * 8) as u32,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            IntKind::Int => "int",
            IntKind::Int8 => "int8",
            IntKind::Int16 => "int16",
            IntKind::Int32 => "int32",
            IntKind::Int64 => "int64",
            IntKind::Uint => "uint",
            IntKind::Uint8 => "uint8",
            IntKind::Uint16 => "uint16",
            IntKind::Uint32 => "uint32",
            IntKind::Uint64 => "uint64",
            IntKind::Uintptr => "uintptr",
        }
    }
}

/// Kinds of untyped constants (and `nil`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Untyped {
    Int,
    Rune,
    Bool,
    String,
    Nil,
}

impl Untyped {
    /// Type an untyped constant takes when nothing else decides it.
    pub fn default_type(self) -> Type {
        match self {
            Untyped::Int => Type::INT,
            Untyped::Rune => Type::RUNE,
            Untyped::Bool => Type::Bool,
            Untyped::String => Type::String,
            Untyped::Nil => Type::Untyped(Untyped::Nil),
        }
    }
}

/// Parameter and result types of a function.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Signature {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
}

impl Signature {
    pub fn new(params: Vec<Type>, results: Vec<Type>) -> Self {
        Signature { params, results }
    }

    /// Type of a call expression: nothing, the single result, or a tuple.
    pub fn result_type(&self) -> Type {
        match self.results.as_slice() {
            [single] => single.clone(),
            many => Type::Tuple(many.iter().cloned().collect()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Int(IntKind),
    Bool,
    String,
    Slice(Arc<Type>),
    Chan(Arc<Type>),
    Func(Arc<Signature>),
    /// Results of a multi-value call; the empty tuple is "no value".
    Tuple(Arc<[Type]>),
    /// The empty interface.
    Any,
    Untyped(Untyped),
    /// Result of an expression that failed to check; suppresses follow-on
    /// errors.
    Invalid,
}

impl Type {
    pub const INT: Type = Type::Int(IntKind::Int);
    pub const BYTE: Type = Type::Int(IntKind::Uint8);
    pub const RUNE: Type = Type::Int(IntKind::Int32);
    pub const UINTPTR: Type = Type::Int(IntKind::Uintptr);

    pub fn slice(elem: Type) -> Type {
        Type::Slice(Arc::new(elem))
    }

    pub fn chan(elem: Type) -> Type {
        Type::Chan(Arc::new(elem))
    }

    pub fn func(params: Vec<Type>, results: Vec<Type>) -> Type {
        Type::Func(Arc::new(Signature::new(params, results)))
    }

    pub fn unit() -> Type {
        Type::Tuple(Arc::from(Vec::new()))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Type::Invalid)
    }

    pub fn is_untyped(&self) -> bool {
        matches!(self, Type::Untyped(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Type::Int(_) | Type::Untyped(Untyped::Int | Untyped::Rune)
        )
    }

    pub fn is_unsigned(&self) -> bool {
        matches!(self, Type::Int(k) if !k.is_signed())
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Type::String | Type::Untyped(Untyped::String))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Type::Bool | Type::Untyped(Untyped::Bool))
    }

    /// Operands of `<`, `<=`, `>`, `>=`.
    pub fn is_ordered(&self) -> bool {
        self.is_integer() || self.is_string()
    }

    /// Types whose values may be compared with `==`.
    pub fn is_comparable(&self) -> bool {
        match self {
            Type::Int(_) | Type::Bool | Type::String | Type::Chan(_) | Type::Any => true,
            Type::Untyped(u) => *u != Untyped::Nil,
            _ => false,
        }
    }

    /// Types with a `nil` value.
    pub fn has_nil(&self) -> bool {
        matches!(self, Type::Slice(_) | Type::Chan(_) | Type::Func(_) | Type::Any)
    }

    /// Element type of a slice or channel.
    pub fn elem(&self) -> Option<&Type> {
        match self {
            Type::Slice(e) | Type::Chan(e) => Some(e),
            _ => None,
        }
    }

    pub fn signature(&self) -> Option<&Arc<Signature>> {
        match self {
            Type::Func(sig) => Some(sig),
            _ => None,
        }
    }

    /// Untyped types replaced by their default.
    pub fn defaulted(&self) -> Type {
        match self {
            Type::Untyped(u) => u.default_type(),
            other => other.clone(),
        }
    }

    /// Number of values a tuple-typed expression yields; 1 otherwise.
    pub fn arity(&self) -> usize {
        match self {
            Type::Tuple(items) => items.len(),
            _ => 1,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{p}")?;
        }
        f.write_str(")")?;
        match self.results.as_slice() {
            [] => Ok(()),
            [single] => write!(f, " {single}"),
            many => {
                f.write_str(" (")?;
                for (i, r) in many.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{r}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int(k) => f.write_str(k.name()),
            Type::Bool => f.write_str("bool"),
            Type::String => f.write_str("string"),
            Type::Slice(e) => write!(f, "[]{e}"),
            Type::Chan(e) => write!(f, "chan {e}"),
            Type::Func(sig) => write!(f, "func{sig}"),
            Type::Tuple(items) => {
                f.write_str("(")?;
                for (i, t) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{t}")?;
                }
                f.write_str(")")
            }
            Type::Any => f.write_str("interface {}"),
            Type::Untyped(u) => f.write_str(match u {
                Untyped::Int => "untyped int",
                Untyped::Rune => "untyped rune",
                Untyped::Bool => "untyped bool",
                Untyped::String => "untyped string",
                Untyped::Nil => "untyped nil",
            }),
            Type::Invalid => f.write_str("invalid type"),
        }
    }
}

#[cfg(test)]
mod tests;
