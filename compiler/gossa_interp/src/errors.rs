//! Non-local exits from interpreted code.
//!
//! Interpreted panics travel up the Rust call stack as `Err(Unwind::Panic)`
//! until a deferred call recovers them or the goroutine ends. Runtime errors
//! (bad index, nil call, closed channel) are panics with a string value,
//! constructed by the helpers below.

use gossa_types::Type;

use crate::value::Value;

pub type ExecResult<T> = Result<T, Unwind>;

#[derive(Clone, Debug)]
pub enum Unwind {
    /// A Go panic carrying an `any` value.
    Panic(Value),
    /// The program is over: `os.Exit`, a fatal panic elsewhere, a
    /// deadlock, or `main` returned. Nothing more runs, deferred calls
    /// included.
    Exit,
}

/// Panic with `value` boxed as an interface, the way `panic(x)` sees it.
pub fn panic_with(ty: Type, value: Value) -> Unwind {
    Unwind::Panic(Value::boxed(ty, value))
}

/// A `runtime error: ...` panic.
pub fn runtime_error(message: impl AsRef<str>) -> Unwind {
    let text = format!("runtime error: {}", message.as_ref());
    panic_with(Type::String, Value::str(&text))
}

pub fn nil_dereference() -> Unwind {
    runtime_error("invalid memory address or nil pointer dereference")
}

pub fn divide_by_zero() -> Unwind {
    runtime_error("integer divide by zero")
}

pub fn negative_shift() -> Unwind {
    runtime_error("negative shift amount")
}

/// A failed `x.(T)` without the comma-ok form.
pub fn interface_conversion(dynamic: Option<&Type>, target: &Type) -> Unwind {
    let text = match dynamic {
        Some(ty) => format!("interface conversion: interface {{}} is {ty}, not {target}"),
        None => format!("interface conversion: interface is nil, not {target}"),
    };
    panic_with(Type::String, Value::str(&text))
}

/// A channel misuse that Go reports without the `runtime error:` prefix.
pub fn channel_panic(message: &str) -> Unwind {
    panic_with(Type::String, Value::str(message))
}
