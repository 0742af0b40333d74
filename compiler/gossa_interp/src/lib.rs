//! Interpreter for gossa's SSA IR.
//!
//! [`interpret`] runs a built [`Program`] from its package initializers
//! through `main.main` and returns the process exit code.
//!
//! # Architecture
//!
//! - **[`Machine`](machine::Machine)**: globals, channels, goroutine counts
//!   and the outcome, shared by every goroutine
//! - **[`Goroutine`](exec::Goroutine)**: one OS thread executing calls
//! - **[`Value`](value::Value)**: runtime values
//!
//! Goroutines are scoped threads: `interpret` returns only after every one
//! of them has finished, so a captured output buffer has no writers left
//! when the caller reads it.

mod errors;
mod exec;
mod machine;
mod ops;
mod value;

use std::sync::Arc;

use bitflags::bitflags;
use gossa_ssa::{Package, Program};
use gossa_types::Sizes;
use parking_lot::Mutex;

use exec::Goroutine;
use machine::{Machine, Output};

bitflags! {
    /// Interpreter options.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Mode: u8 {
        /// `recover()` always returns nil.
        const DISABLE_RECOVER = 1 << 0;
        /// Emit a `tracing` event per call and per instruction.
        const ENABLE_TRACING = 1 << 1;
    }
}

/// Buffer receiving the output of `print` and `println`.
///
/// Clones share the same buffer.
#[derive(Clone, Debug, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&self, bytes: &[u8]) {
        self.buffer.lock().extend_from_slice(bytes);
    }

    /// A copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().clone()
    }

    /// Everything written so far as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Remove and return everything written so far.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buffer.lock())
    }
}

/// Run `package`'s `main` function and return the exit code.
///
/// `filename` and `args` become `os.Args`. Output of `print` and `println`
/// goes to `output` when given and to stdout otherwise.
///
/// Exit codes: 0 when `main` returns, the argument of `os.Exit`, 2 for an
/// unrecovered panic or a deadlock, 1 when the package has no `main`.
#[tracing::instrument(level = "debug", skip_all, fields(package = %package.path, ?mode))]
pub fn interpret(
    program: &Program,
    package: &Package,
    mode: Mode,
    sizes: Sizes,
    filename: &str,
    args: &[String],
    output: Option<&CapturedOutput>,
) -> i32 {
    let output = output.map_or(Output::Stdout, Output::Captured);
    let machine = Machine::new(program, mode, sizes, output);
    std::thread::scope(|scope| {
        Goroutine::new(&machine, scope, 0).run_main(package, filename, args);
    });
    let code = machine.exit_code().unwrap_or(0);
    tracing::debug!(code, "interpretation finished");
    code
}

#[cfg(test)]
mod tests;
