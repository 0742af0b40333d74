//! The predeclared names.

use crate::{Builtin, ConstValue, IntKind, Type, Untyped};

pub(crate) enum Predeclared {
    Type(Type),
    Const(ConstValue, Type),
    Builtin(Builtin),
    Nil,
    Iota,
}

pub(crate) fn lookup(name: &str) -> Option<Predeclared> {
    let ty = |t: Type| Some(Predeclared::Type(t));
    match name {
        "int" => ty(Type::INT),
        "int8" => ty(Type::Int(IntKind::Int8)),
        "int16" => ty(Type::Int(IntKind::Int16)),
        "int32" | "rune" => ty(Type::RUNE),
        "int64" => ty(Type::Int(IntKind::Int64)),
        "uint" => ty(Type::Int(IntKind::Uint)),
        "uint8" | "byte" => ty(Type::BYTE),
        "uint16" => ty(Type::Int(IntKind::Uint16)),
        "uint32" => ty(Type::Int(IntKind::Uint32)),
        "uint64" => ty(Type::Int(IntKind::Uint64)),
        "uintptr" => ty(Type::UINTPTR),
        "bool" => ty(Type::Bool),
        "string" => ty(Type::String),
        "any" => ty(Type::Any),
        "true" | "false" => Some(Predeclared::Const(
            ConstValue::Bool(name == "true"),
            Type::Untyped(Untyped::Bool),
        )),
        "nil" => Some(Predeclared::Nil),
        "iota" => Some(Predeclared::Iota),
        "append" => Some(Predeclared::Builtin(Builtin::Append)),
        "cap" => Some(Predeclared::Builtin(Builtin::Cap)),
        "close" => Some(Predeclared::Builtin(Builtin::Close)),
        "copy" => Some(Predeclared::Builtin(Builtin::Copy)),
        "len" => Some(Predeclared::Builtin(Builtin::Len)),
        "make" => Some(Predeclared::Builtin(Builtin::Make)),
        "panic" => Some(Predeclared::Builtin(Builtin::Panic)),
        "print" => Some(Predeclared::Builtin(Builtin::Print)),
        "println" => Some(Predeclared::Builtin(Builtin::Println)),
        "recover" => Some(Predeclared::Builtin(Builtin::Recover)),
        _ => None,
    }
}
