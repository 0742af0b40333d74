//! gossa CLI
//!
//! Loads Go programs, builds their SSA form and interprets it.

use gossa::commands::{dump_files, parse_options, run_default, run_files, run_tests, Options};

fn main() {
    let args: Vec<String> = std::env::args().collect();

    let Some(command) = args.get(1) else {
        std::process::exit(run_default());
    };

    let code = match command.as_str() {
        "run" => with_options(&args[2..], run_files),
        "dump" => with_options(&args[2..], dump_files),
        "test" => with_options(&args[2..], run_tests),
        "help" | "--help" | "-h" => {
            print_usage();
            0
        }
        "version" | "--version" | "-v" => {
            println!("gossa {}", env!("CARGO_PKG_VERSION"));
            0
        }
        // A file or leading flag means `run`.
        other if other.ends_with(".go") || other.starts_with('-') => {
            with_options(&args[1..], run_files)
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            1
        }
    };
    std::process::exit(code);
}

fn with_options(args: &[String], command: fn(&Options) -> i32) -> i32 {
    match parse_options(args) {
        Ok(options) => command(&options),
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!();
            print_usage();
            1
        }
    }
}

fn print_usage() {
    println!("gossa: Go programs through an SSA interpreter");
    println!();
    println!("Usage: gossa [command] [flags] <file.go>... [args...]");
    println!();
    println!("With no command, runs $GOSSA_HOME/testdata/cmd/simple/simple.go");
    println!("through the test harness.");
    println!();
    println!("Commands:");
    println!("  run <file.go>...     Interpret a program; exits with its exit code");
    println!("  dump <file.go>...    Print the SSA form of a program");
    println!("  test [file.go...]    Run programs through the harness in parallel");
    println!("  help                 Show this help message");
    println!("  version              Show version information");
    println!();
    println!("Flags:");
    println!("  -build=LETTERS      C: sanity check, F: print functions, P: print packages");
    println!("  -trace              Trace interpreter calls and instructions on stderr");
    println!("  -root=DIR           Import root (default: $GOSSA_HOME/testdata)");
    println!("  -goos=OS            Target operating system (default: linux)");
    println!("  -goarch=ARCH        Target architecture (default: amd64)");
    println!();
    println!("Environment:");
    println!("  GOSSA_HOME          Directory holding testdata/");
    println!("  RUST_LOG            Enable tracing output (e.g. RUST_LOG=gossa_ssa=debug)");
    println!();
    println!("Examples:");
    println!("  gossa run hello.go");
    println!("  gossa run -build=C -trace cmd/simple/simple.go");
    println!("  gossa dump -build=CFP cmd/simple/simple.go");
    println!("  gossa test cmd/simple/simple.go cmd/chans/chans.go");
}
