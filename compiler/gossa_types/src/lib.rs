//! Type checker for the Go subset accepted by gossa.
//!
//! The checker walks the syntax of one package at a time and records what it
//! learns in [`TypeInfo`] side tables keyed by [`NodeId`](gossa_ir::NodeId):
//! expression types, constant values, what every identifier refers to, the
//! locals of every function and how each call is carried out. Imported
//! packages are seen only through their [`PackageExports`].
//!
//! Checking never stops at the first error. Every problem becomes a
//! [`Diagnostic`](gossa_diagnostic::Diagnostic) and expressions that fail to
//! check get [`Type::Invalid`], which silences follow-on errors.

mod check;
pub mod constant;
mod info;
mod intrinsics;
mod sizes;
mod types;
mod universe;

pub use check::{check_package, CheckOutput};
pub use constant::ConstValue;
pub use info::{
    Builtin, CallKind, GlobalInfo, Importer, Intrinsic, LocalId, LocalInfo, Member,
    PackageExports, PackageInfo, Resolution, TypeInfo,
};
pub use intrinsics::{intrinsic_package, is_intrinsic, INTRINSIC_PACKAGES};
pub use sizes::Sizes;
pub use types::{IntKind, Signature, Type, Untyped};
