//! SSA-form intermediate representation for gossa.
//!
//! A checked [`LoadedProgram`](gossa_loader::LoadedProgram) is lowered into
//! a [`Program`]: every source function, function literal and package
//! initializer becomes a [`Function`] made of basic blocks.
//!
//! # Architecture
//!
//! - **[`Function`]**: parameters, free variables, blocks, value types
//! - **[`Block`]**: instructions ending in exactly one terminator
//! - **[`Instr`]**: one instruction, optionally defining a [`ValueId`]
//!
//! Local variables live in memory cells (`Alloc`, `Load`, `Store`) rather
//! than being lifted into registers; `Phi` appears only where the builder
//! merges short-circuit operators and per-iteration loop variables.
//!
//! ```text
//! LoadedProgram ──build──▶ Program ──sanity──▶ interpreter
//! ```

mod builder;
mod ir;
mod print;
mod sanity;

use bitflags::bitflags;

pub use ir::{
    BlockId, Block, CallCommon, Callee, Const, FuncId, Function, Global, GlobalId, Instr,
    InstrKind, Member, Package, Program, ValueId,
};
pub use print::{FunctionDisplay, PackageDisplay};
pub use sanity::{sanity_check, SanityError, SanityProblem};

bitflags! {
    /// What the builder does besides building.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BuilderMode: u8 {
        /// Check every function's structure after building.
        const SANITY_CHECK_FUNCTIONS = 1 << 0;
        /// Print every function to stdout.
        const PRINT_FUNCTIONS = 1 << 1;
        /// Print every package's members to stdout.
        const PRINT_PACKAGES = 1 << 2;
    }
}

impl BuilderMode {
    /// Parse the letters of a `-build=` flag: `C`, `F` and `P`.
    ///
    /// Returns the offending character for anything else.
    pub fn parse(letters: &str) -> Result<BuilderMode, char> {
        let mut mode = BuilderMode::empty();
        for c in letters.chars() {
            mode |= match c {
                'C' => BuilderMode::SANITY_CHECK_FUNCTIONS,
                'F' => BuilderMode::PRINT_FUNCTIONS,
                'P' => BuilderMode::PRINT_PACKAGES,
                other => return Err(other),
            };
        }
        Ok(mode)
    }
}
