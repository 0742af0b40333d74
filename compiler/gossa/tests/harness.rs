//! Harness runs over the fixtures in the repository's `testdata/`.

use std::path::PathBuf;

use gossa::{run, run_batch, HarnessConfig, HarnessError, DEFAULT_ENTRY};
use pretty_assertions::assert_eq;

fn testdata() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../testdata")
}

fn config(entry: &str) -> HarnessConfig {
    HarnessConfig::new(entry, testdata())
}

fn run_entry(entry: &str) -> (Result<gossa::RunReport, HarnessError>, String) {
    let mut log = Vec::new();
    let result = run(&config(entry), &mut log);
    (result, String::from_utf8_lossy(&log).into_owned())
}

#[test]
fn default_entry_passes() {
    let (result, log) = run_entry(DEFAULT_ENTRY);
    let report = result.unwrap_or_else(|e| panic!("{e}\n{log}"));
    assert_eq!(report.entry, DEFAULT_ENTRY);
    assert_eq!(report.output_text(), "PASS\n");
    assert_eq!(log, format!("ssa-Input: {DEFAULT_ENTRY}\nPASS\n"));
}

#[test]
fn channel_workers_pass() {
    let (result, log) = run_entry("cmd/chans/chans.go");
    let report = result.unwrap_or_else(|e| panic!("{e}\n{log}"));
    assert_eq!(report.output_text(), "PASS\n");
}

#[test]
fn exit_code_is_reported() {
    let (result, log) = run_entry("cmd/exit/exit.go");
    match result {
        Err(HarnessError::NonZeroExit { code, output, .. }) => {
            assert_eq!(code, 7);
            assert_eq!(output, b"exiting\n".to_vec());
        }
        other => panic!("expected a non-zero exit, got {other:?}"),
    }
    assert_eq!(
        log,
        "ssa-Input: cmd/exit/exit.go\n\
         ssa-interpreting cmd/exit/exit.go: exit code was 7\n\
         FAIL\n\
         To trace execution, run:\n\
         % gossa run -build=C -trace cmd/exit/exit.go\n\n"
    );
}

#[test]
fn bug_marker_is_distinct_from_exit_codes() {
    let (result, _) = run_entry("cmd/bug/bug.go");
    assert!(matches!(result, Err(HarnessError::BugMarkerFound { .. })));
}

#[test]
fn broken_source_stops_before_building() {
    let (result, log) = run_entry("cmd/broken/broken.go");
    let error = result.err().unwrap_or_else(|| panic!("expected a failure"));
    assert!(matches!(error, HarnessError::Load { .. }));
    assert!(!error.is_fatal());
    assert!(log.starts_with("ssa-Input: cmd/broken/broken.go\nssa-Load(cmd/broken/broken.go) failed: "));
    assert!(log.ends_with(
        "FAIL\nTo dump SSA representation, run:\n% gossa dump -build=CFP cmd/broken/broken.go\n\n"
    ));
}

#[test]
fn library_entry_is_not_a_main_package() {
    let (result, _) = run_entry("cmd/lib/lib.go");
    let error = result.err().unwrap_or_else(|| panic!("expected a failure"));
    assert!(matches!(error, HarnessError::NotMainPackage { .. }));
    assert!(error.is_fatal());
}

#[test]
fn sequential_runs_do_not_share_output() {
    let (first, _) = run_entry("cmd/exit/exit.go");
    let (second, _) = run_entry(DEFAULT_ENTRY);
    assert!(first.is_err());
    let report = second.unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(report.output_text(), "PASS\n");
}

#[test]
fn batch_over_all_fixtures() {
    let entries: Vec<String> = [
        DEFAULT_ENTRY,
        "cmd/chans/chans.go",
        "cmd/bug/bug.go",
        "cmd/exit/exit.go",
        "cmd/broken/broken.go",
        "cmd/lib/lib.go",
    ]
    .iter()
    .map(|e| (*e).to_string())
    .collect();
    let summary = run_batch(&config(""), &entries);
    assert_eq!((summary.passed, summary.failed, summary.fatal), (2, 4, 3));
    let failed: Vec<&str> = summary.failures().map(|r| r.entry.as_str()).collect();
    assert_eq!(
        failed,
        vec![
            "cmd/bug/bug.go",
            "cmd/exit/exit.go",
            "cmd/broken/broken.go",
            "cmd/lib/lib.go"
        ]
    );
}
