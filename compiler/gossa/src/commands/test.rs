//! Harness entry points: the bare `gossa` invocation and `gossa test`.

use std::io::Write;

use super::Options;
use crate::{init_tracing, run, run_batch, HarnessConfig, DEFAULT_ENTRY};

/// Run the default entry through the harness, logging to stdout.
///
/// Returns 1 for a fatal failure; a program that could not be loaded is
/// reported and the process still succeeds.
pub fn run_default() -> i32 {
    init_tracing(false);
    let config = HarnessConfig::from_env();
    let mut stdout = std::io::stdout().lock();
    match run(&config, &mut stdout) {
        Ok(_) => 0,
        Err(error) if error.is_fatal() => 1,
        Err(_) => 0,
    }
}

/// Run every named entry through the harness in parallel and print a
/// summary. Returns 1 if any failed.
pub fn run_tests(options: &Options) -> i32 {
    init_tracing(options.trace);
    let config = options.harness_config();
    let entries = if options.files.is_empty() {
        vec![DEFAULT_ENTRY.to_string()]
    } else {
        options.files.clone()
    };
    let summary = run_batch(&config, &entries);

    let mut stdout = std::io::stdout().lock();
    for result in &summary.results {
        let _ = stdout.write_all(&result.log);
    }
    let _ = writeln!(
        stdout,
        "{} passed, {} failed ({} fatal) in {:.2?}",
        summary.passed, summary.failed, summary.fatal, summary.elapsed
    );
    for failure in summary.failures() {
        let _ = writeln!(stdout, "  FAIL {}", failure.entry);
    }
    i32::from(!summary.all_passed())
}
