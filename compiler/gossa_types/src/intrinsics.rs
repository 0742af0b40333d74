//! Packages built into the interpreter: `runtime`, `os` and `unsafe`.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{ConstValue, Intrinsic, Member, PackageExports, Signature, Type};

/// Import paths served without source.
pub const INTRINSIC_PACKAGES: &[&str] = &["runtime", "os", "unsafe"];

pub fn is_intrinsic(path: &str) -> bool {
    INTRINSIC_PACKAGES.contains(&path)
}

/// Exports of an intrinsic package for the given build triple.
pub fn intrinsic_package(path: &str, goos: &str, goarch: &str) -> Option<Arc<PackageExports>> {
    let mut members = FxHashMap::default();
    match path {
        "runtime" => {
            members.insert(
                "GOOS".to_string(),
                Member::Const(ConstValue::str(goos), Type::String),
            );
            members.insert(
                "GOARCH".to_string(),
                Member::Const(ConstValue::str(goarch), Type::String),
            );
            members.insert("Gosched".to_string(), Member::Intrinsic(Intrinsic::Gosched));
            members.insert(
                "NumGoroutine".to_string(),
                Member::Intrinsic(Intrinsic::NumGoroutine),
            );
            members.insert("GC".to_string(), Member::Intrinsic(Intrinsic::Gc));
        }
        "os" => {
            members.insert("Exit".to_string(), Member::Intrinsic(Intrinsic::Exit));
            members.insert("Args".to_string(), Member::Var(Type::slice(Type::String)));
        }
        "unsafe" => {
            members.insert("Sizeof".to_string(), Member::Intrinsic(Intrinsic::Sizeof));
            members.insert("Alignof".to_string(), Member::Intrinsic(Intrinsic::Alignof));
        }
        _ => return None,
    }
    Some(Arc::new(PackageExports {
        path: path.to_string(),
        name: path.to_string(),
        members,
        intrinsic: true,
    }))
}

/// Signature of an intrinsic with fixed argument types. `unsafe.Sizeof` and
/// `unsafe.Alignof` accept any operand and are checked separately.
pub(crate) fn intrinsic_signature(intrinsic: Intrinsic) -> Option<Signature> {
    match intrinsic {
        Intrinsic::Gosched | Intrinsic::Gc => Some(Signature::default()),
        Intrinsic::NumGoroutine => Some(Signature::new(Vec::new(), vec![Type::INT])),
        Intrinsic::Exit => Some(Signature::new(vec![Type::INT], Vec::new())),
        Intrinsic::Sizeof | Intrinsic::Alignof => None,
    }
}
