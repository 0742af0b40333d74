//! The `dump` command: print the IR of a program.

use gossa_ssa::BuilderMode;

use super::{load_and_build, Options};

/// Build the named files, printing packages and functions as the `-build`
/// letters ask (packages and functions by default).
pub fn dump_files(options: &Options) -> i32 {
    if options.files.is_empty() {
        eprintln!("Usage: gossa dump [-build=LETTERS] <file.go>...");
        return 1;
    }
    let mode = options
        .build
        .unwrap_or(BuilderMode::PRINT_PACKAGES | BuilderMode::PRINT_FUNCTIONS);
    match load_and_build(options.build_context(), &options.files, mode) {
        Ok(_) => 0,
        Err(message) => {
            eprintln!("{message}");
            1
        }
    }
}
