use pretty_assertions::assert_eq;

use super::{build_line, BuildContext, Constraint};

fn linux() -> BuildContext {
    BuildContext::new("/testdata")
}

#[test]
fn defaults_to_linux_amd64() {
    let ctx = linux();
    assert_eq!((ctx.goos.as_str(), ctx.goarch.as_str()), ("linux", "amd64"));
    assert_eq!(ctx.sizes().word_size, 8);
    assert_eq!(
        ctx.candidate_dirs("a/b"),
        vec![std::path::PathBuf::from("/testdata/src/a/b")]
    );
}

#[test]
fn file_name_suffixes() {
    let ctx = linux();
    assert!(ctx.match_file("main.go", ""));
    assert!(ctx.match_file("linux.go", ""));
    assert!(ctx.match_file("x_linux.go", ""));
    assert!(ctx.match_file("x_amd64.go", ""));
    assert!(ctx.match_file("x_linux_amd64.go", ""));
    assert!(ctx.match_file("x_helper.go", ""));
    assert!(!ctx.match_file("x_windows.go", ""));
    assert!(!ctx.match_file("x_arm64.go", ""));
    assert!(!ctx.match_file("x_linux_arm64.go", ""));
    assert!(!ctx.match_file("x_test.go", ""));
    assert!(!ctx.match_file("_hidden.go", ""));
    assert!(!ctx.match_file("notes.txt", ""));
}

#[test]
fn other_targets() {
    let ctx = BuildContext::new("/r").with_target("windows", "386");
    assert!(ctx.match_file("x_windows_386.go", ""));
    assert!(!ctx.match_file("x_linux.go", ""));
    assert_eq!(ctx.sizes().word_size, 4);
    assert!(!ctx.matches_tag("unix"));
    assert!(BuildContext::new("/r").with_target("android", "arm64").matches_tag("linux"));
}

#[test]
fn build_line_only_in_header() {
    assert_eq!(build_line("//go:build linux\n\npackage p\n"), Some("linux"));
    assert_eq!(
        build_line("// Copyright\n/* block\n comment */\n//go:build !windows\npackage p\n"),
        Some("!windows")
    );
    assert_eq!(build_line("package p\n//go:build linux\n"), None);
    assert_eq!(build_line("//go:buildx linux\npackage p\n"), None);
}

#[test]
fn constraint_parsing() {
    let parsed = Constraint::parse("linux && (amd64 || arm64) && !cgo");
    let tag = |s: &str| Box::new(Constraint::Tag(s.to_string()));
    assert_eq!(
        parsed,
        Some(Constraint::And(
            Box::new(Constraint::And(
                tag("linux"),
                Box::new(Constraint::Or(tag("amd64"), tag("arm64")))
            )),
            Box::new(Constraint::Not(tag("cgo")))
        ))
    );
    assert_eq!(Constraint::parse("linux &&"), None);
    assert_eq!(Constraint::parse("(linux"), None);
    assert_eq!(Constraint::parse("linux & amd64"), None);
    assert_eq!(Constraint::parse("go1.21"), Some(Constraint::Tag("go1.21".to_string())));
}

#[test]
fn constraints_select_files() {
    let ctx = linux();
    assert!(ctx.match_file("a.go", "//go:build linux && amd64\n\npackage p\n"));
    assert!(ctx.match_file("a.go", "//go:build unix && gc\n\npackage p\n"));
    assert!(!ctx.match_file("a.go", "//go:build ignore\n\npackage main\n"));
    assert!(!ctx.match_file("a.go", "//go:build windows || darwin\n\npackage p\n"));
    assert!(!ctx.match_file("a.go", "//go:build linux &&\n\npackage p\n"));
}
