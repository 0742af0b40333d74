//! Command handlers for the `gossa` CLI.
//!
//! Each submodule implements one command. Flag parsing and the shared
//! load-and-build step live here in the module root.

use std::path::PathBuf;

use gossa_loader::{BuildContext, Config, LoadedProgram};
use gossa_ssa::{BuilderMode, Program};

use crate::HarnessConfig;

mod dump;
mod run;
mod test;

pub use dump::dump_files;
pub use run::run_files;
pub use test::{run_default, run_tests};

/// Flags shared by `run`, `dump` and `test`, plus the positional
/// arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    /// `-build=` letters; `None` leaves each command's default.
    pub build: Option<BuilderMode>,
    pub trace: bool,
    pub root: Option<PathBuf>,
    pub goos: Option<String>,
    pub goarch: Option<String>,
    /// Leading `.go` arguments.
    pub files: Vec<String>,
    /// Everything after the files: the program's `os.Args[1:]`.
    pub args: Vec<String>,
}

/// Parse command arguments (everything after the command name).
///
/// Flags come first; the first non-flag argument starts the file list and
/// the first argument after it that is not a `.go` file starts the
/// program's own arguments.
pub fn parse_options(args: &[String]) -> Result<Options, String> {
    let mut options = Options {
        build: None,
        trace: false,
        root: None,
        goos: None,
        goarch: None,
        files: Vec::new(),
        args: Vec::new(),
    };
    let mut rest = args.iter();
    for arg in rest.by_ref() {
        if let Some(letters) = arg.strip_prefix("-build=") {
            let mode = BuilderMode::parse(letters)
                .map_err(|c| format!("unknown -build letter '{c}' (expected C, F or P)"))?;
            options.build = Some(mode);
        } else if arg == "-trace" {
            options.trace = true;
        } else if let Some(root) = arg.strip_prefix("-root=") {
            options.root = Some(PathBuf::from(root));
        } else if let Some(goos) = arg.strip_prefix("-goos=") {
            options.goos = Some(goos.to_string());
        } else if let Some(goarch) = arg.strip_prefix("-goarch=") {
            options.goarch = Some(goarch.to_string());
        } else if arg.starts_with('-') {
            return Err(format!("unknown flag: {arg}"));
        } else {
            options.files.push(arg.clone());
            break;
        }
    }
    for arg in rest {
        if arg.ends_with(".go") && options.args.is_empty() {
            options.files.push(arg.clone());
        } else {
            options.args.push(arg.clone());
        }
    }
    Ok(options)
}

impl Options {
    /// Harness settings: `$GOSSA_HOME/testdata` and `linux`/`amd64` unless
    /// overridden by flags.
    pub fn harness_config(&self) -> HarnessConfig {
        let mut config = HarnessConfig::from_env();
        if let Some(root) = &self.root {
            config.root.clone_from(root);
        }
        if let Some(goos) = &self.goos {
            config.goos.clone_from(goos);
        }
        if let Some(goarch) = &self.goarch {
            config.goarch.clone_from(goarch);
            config.sizes = gossa_types::Sizes::for_arch(goarch);
        }
        config.args.clone_from(&self.args);
        config
    }

    pub fn build_context(&self) -> BuildContext {
        self.harness_config().build_context()
    }
}

/// Load the named files and build them with `mode`.
fn load_and_build(
    build: BuildContext,
    files: &[String],
    mode: BuilderMode,
) -> Result<(LoadedProgram, Program), String> {
    let mut config = Config::from_args(build, files, false).map_err(|e| e.to_string())?;
    config.import("runtime");
    let loaded = config.load().map_err(|e| e.to_string())?;
    let program = Program::build(&loaded, mode).map_err(|e| e.to_string())?;
    Ok((loaded, program))
}

#[cfg(test)]
mod tests;
