//! Source loader for gossa.
//!
//! The loader turns command-line arguments into a type-checked program:
//!
//! ```text
//! Config::from_args(args)      named .go files or import paths
//!   └── Config::load()
//!         ├── parse created files           (one package, "command-line-arguments")
//!         ├── resolve imports depth-first   (intrinsic, <root>/src, search paths)
//!         │     └── BuildContext::match_file filters each directory
//!         └── check packages dependencies-first
//!                ↓
//!          LoadedProgram
//! ```
//!
//! Every file of the program is registered in one
//! [`SourceMap`](gossa_diagnostic::SourceMap) and all node ids come from one
//! generator, so spans and ids are unique program-wide.

mod config;
mod context;
mod program;

use std::path::PathBuf;

use gossa_diagnostic::ErrorCode;

pub use config::{Config, CREATED_PACKAGE_PATH};
pub use context::{BuildContext, Constraint};
pub use program::{LoadedPackage, LoadedProgram};

/// Why a program could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no packages or files to load")]
    NoArgs,
    #[error("named files must all be .go files: {arg}")]
    MixedArgs { arg: String },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no buildable Go source files in {}", dir.display())]
    NoGoFiles { dir: PathBuf },
    #[error("found packages {first} ({first_file}) and {second} ({second_file}) in {dir}")]
    MultiplePackages {
        dir: String,
        first: String,
        first_file: String,
        second: String,
        second_file: String,
    },
    #[error("cannot find package {path:?} in any of:\n{searched}")]
    ImportNotFound { path: String, searched: String },
    #[error("import cycle not allowed: {}", chain.join(" -> "))]
    ImportCycle { chain: Vec<String> },
    /// Rendered syntax errors.
    #[error("{0}")]
    Parse(String),
    /// Rendered type errors.
    #[error("{0}")]
    Type(String),
}

impl LoadError {
    /// Diagnostic code for errors that concern the program's packages.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            LoadError::ImportNotFound { .. } => Some(ErrorCode::E3001),
            LoadError::ImportCycle { .. } => Some(ErrorCode::E3002),
            LoadError::MultiplePackages { .. } => Some(ErrorCode::E3003),
            LoadError::NoArgs
            | LoadError::MixedArgs { .. }
            | LoadError::Io { .. }
            | LoadError::NoGoFiles { .. }
            | LoadError::Parse(_)
            | LoadError::Type(_) => None,
        }
    }
}

#[cfg(test)]
mod tests;
