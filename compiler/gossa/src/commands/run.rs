//! The `run` command: load, build and interpret a program.

use gossa_interp::{interpret, Mode};
use gossa_ssa::BuilderMode;

use super::{load_and_build, Options};
use crate::init_tracing;

/// Run the program named by `options` with output on stdout and return its
/// exit code; 1 if it cannot be loaded or built.
pub fn run_files(options: &Options) -> i32 {
    init_tracing(options.trace);
    let Some(entry) = options.files.first() else {
        eprintln!("error: missing file path");
        eprintln!("Usage: gossa run [flags] <file.go>... [args...]");
        return 1;
    };
    let config = options.harness_config();
    let mode = options.build.unwrap_or(BuilderMode::SANITY_CHECK_FUNCTIONS);
    let (loaded, program) = match load_and_build(config.build_context(), &options.files, mode) {
        Ok(built) => built,
        Err(message) => {
            eprintln!("{message}");
            return 1;
        }
    };
    let Some(package) = program
        .created_package(&loaded, 0)
        .filter(|package| package.name == "main")
    else {
        eprintln!("not a main package: {entry}");
        return 1;
    };

    let mut interp_mode = config.mode;
    if options.trace {
        interp_mode |= Mode::ENABLE_TRACING;
    }
    interpret(
        &program,
        package,
        interp_mode,
        config.sizes,
        entry,
        &config.args,
        None,
    )
}
