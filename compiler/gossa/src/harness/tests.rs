use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use gossa_loader::LoadError;
use pretty_assertions::assert_eq;

use super::{load_hint, run, trace_hint, HarnessConfig, Session, DEFAULT_ENTRY};
use crate::HarnessError;

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap_or_else(|e| panic!("mkdir: {e}"));
    }
    fs::write(&path, text).unwrap_or_else(|e| panic!("write: {e}"));
}

fn run_source(source: &str) -> (Result<super::RunReport, HarnessError>, String) {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    write(dir.path(), "cmd/t/t.go", source);
    let config = HarnessConfig::new(
        dir.path().join("cmd/t/t.go").to_string_lossy(),
        dir.path(),
    );
    let mut log = Vec::new();
    let result = run(&config, &mut log);
    (result, String::from_utf8_lossy(&log).into_owned())
}

#[test]
fn home_variable_locates_testdata() {
    let config = HarnessConfig::with_home(Some(OsString::from("/opt/gossa")));
    assert_eq!(config.root, PathBuf::from("/opt/gossa/testdata"));
    assert_eq!(config.entry, DEFAULT_ENTRY);
    assert_eq!((config.goos.as_str(), config.goarch.as_str()), ("linux", "amd64"));
    assert_eq!((config.sizes.word_size, config.sizes.max_align), (8, 8));
    assert!(config.args.is_empty());

    let unset = HarnessConfig::with_home(None);
    assert_eq!(unset.root, PathBuf::from("/testdata"));
}

#[test]
fn build_context_carries_the_target() {
    let mut config = HarnessConfig::new("a.go", "/r").with_entry("b.go");
    config.goarch = "386".to_string();
    config.search_paths.push(PathBuf::from("/extra"));
    let build = config.build_context();
    assert_eq!(config.entry, "b.go");
    assert_eq!(build.root, PathBuf::from("/r"));
    assert_eq!(build.goarch, "386");
    assert_eq!(build.search_paths, vec![PathBuf::from("/extra")]);
}

#[test]
fn hints_name_the_entry() {
    assert_eq!(
        load_hint("x.go"),
        "To dump SSA representation, run:\n% gossa dump -build=CFP x.go\n"
    );
    assert_eq!(
        trace_hint("x.go"),
        "To trace execution, run:\n% gossa run -build=C -trace x.go\n"
    );
}

#[test]
fn session_verdicts() {
    let mut out = Vec::new();
    {
        let mut session = Session::new(&mut out);
        session.log("unarmed");
    }
    assert_eq!(String::from_utf8_lossy(&out), "ssa-unarmed\n");

    let mut out = Vec::new();
    {
        let mut session = Session::new(&mut out);
        session.set_hint("try again".to_string());
    }
    assert_eq!(String::from_utf8_lossy(&out), "FAIL\ntry again\n");

    let mut out = Vec::new();
    {
        let mut session = Session::new(&mut out);
        session.set_hint("try again".to_string());
        session.clear_hint();
    }
    assert_eq!(String::from_utf8_lossy(&out), "PASS\n");
}

/// A log sink that rejects every write.
struct BrokenSink;

impl std::io::Write for BrokenSink {
    fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::other("sink closed"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Err(std::io::Error::other("sink closed"))
    }
}

#[test]
fn broken_log_sink_does_not_change_the_result() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    write(dir.path(), "cmd/t/t.go", "package main\n\nfunc main() { println(\"ok\") }\n");
    let config = HarnessConfig::new(dir.path().join("cmd/t/t.go").to_string_lossy(), dir.path());
    let report = run(&config, &mut BrokenSink).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(report.output_text(), "ok\n");
}

#[test]
fn passing_program() {
    let (result, log) = run_source("package main\n\nfunc main() { println(\"PASS\") }\n");
    let report = result.unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(report.output_text(), "PASS\n");
    assert!(log.starts_with("ssa-Input: "));
    assert!(log.ends_with("PASS\n"));
    assert!(!log.contains("FAIL"));
}

#[test]
fn syntax_error_fails_loading_with_the_dump_hint() {
    let (result, log) = run_source("package main\n\nfunc main() {\n");
    let error = result.err().unwrap_or_else(|| panic!("expected a failure"));
    assert!(matches!(error, HarnessError::Load { source: LoadError::Parse(_), .. }));
    assert!(!error.is_fatal());
    assert!(error.captured_output().is_none());
    assert!(log.contains("ssa-Load("));
    assert!(log.contains("FAIL\nTo dump SSA representation, run:\n"));
}

#[test]
fn non_zero_exit_is_fatal_with_the_trace_hint() {
    let (result, log) = run_source(
        "package main\n\nimport \"os\"\n\nfunc main() {\n\tprintln(\"partial\")\n\tos.Exit(4)\n}\n",
    );
    match result {
        Err(error @ HarnessError::NonZeroExit { code: 4, .. }) => {
            assert!(error.is_fatal());
            assert_eq!(error.captured_output(), Some(&b"partial\n"[..]));
        }
        other => panic!("expected a non-zero exit, got {other:?}"),
    }
    assert!(log.contains(": exit code was 4\n"));
    assert!(log.contains("FAIL\nTo trace execution, run:\n"));
}

#[test]
fn bug_marker_fails_a_clean_exit() {
    let (result, log) = run_source("package main\n\nfunc main() { println(\"BUG: wrong\") }\n");
    let error = result.err().unwrap_or_else(|| panic!("expected a failure"));
    assert!(matches!(error, HarnessError::BugMarkerFound { .. }));
    assert!(error.is_fatal());
    assert!(log.contains("exited zero but output contained 'BUG'"));
}

#[test]
fn library_package_is_not_runnable() {
    let (result, log) = run_source("package lib\n\nfunc Helper() int { return 1 }\n");
    let error = result.err().unwrap_or_else(|| panic!("expected a failure"));
    assert!(matches!(error, HarnessError::NotMainPackage { .. }));
    assert!(error.is_fatal());
    assert!(log.contains("ssa-not a main package: "));
    assert!(log.contains("FAIL\nTo dump SSA representation"));
}

#[test]
fn main_package_without_main_fails_fatally_at_run_time() {
    let (result, log) = run_source("package main\n\nfunc helper() {}\n");
    match result {
        Err(error @ HarnessError::NonZeroExit { code: 1, .. }) => assert!(error.is_fatal()),
        other => panic!("expected exit code 1, got {other:?}"),
    }
    assert!(!log.contains("Load("));
    assert!(log.contains("FAIL\nTo trace execution, run:\n"));
}
