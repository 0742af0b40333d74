use std::fs;

use pretty_assertions::assert_eq;

use crate::{run_batch, HarnessConfig, HarnessError};

#[test]
fn batch_runs_are_independent() {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    let programs = [
        ("cmd/ok/ok.go", "package main\n\nfunc main() { println(\"ok\") }\n"),
        (
            "cmd/exit/exit.go",
            "package main\n\nimport \"os\"\n\nfunc main() { os.Exit(9) }\n",
        ),
        (
            "cmd/deadlock/deadlock.go",
            "package main\n\nfunc main() {\n\tch := make(chan int)\n\t<-ch\n}\n",
        ),
        ("cmd/ok2/ok2.go", "package main\n\nfunc main() { println(\"ok2\") }\n"),
    ];
    let mut entries = Vec::new();
    for (rel, source) in programs {
        let path = dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|e| panic!("mkdir: {e}"));
        }
        fs::write(&path, source).unwrap_or_else(|e| panic!("write: {e}"));
        entries.push(path.to_string_lossy().into_owned());
    }

    let summary = run_batch(&HarnessConfig::new("", dir.path()), &entries);
    assert_eq!((summary.passed, summary.failed, summary.fatal), (2, 2, 2));
    assert!(!summary.all_passed());

    let names: Vec<&str> = summary.results.iter().map(|r| r.entry.as_str()).collect();
    let expected: Vec<&str> = entries.iter().map(String::as_str).collect();
    assert_eq!(names, expected);

    let outputs: Vec<String> = summary
        .results
        .iter()
        .filter_map(|r| r.outcome.as_ref().ok())
        .map(crate::RunReport::output_text)
        .collect();
    assert_eq!(outputs, vec!["ok\n".to_string(), "ok2\n".to_string()]);

    let codes: Vec<i32> = summary
        .failures()
        .filter_map(|r| match &r.outcome {
            Err(HarnessError::NonZeroExit { code, .. }) => Some(*code),
            _ => None,
        })
        .collect();
    assert_eq!(codes, vec![9, 2]);
    assert!(summary.results[0].log_text().ends_with("PASS\n"));
}
