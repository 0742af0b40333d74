use std::fs;
use std::path::Path;

use gossa_diagnostic::ErrorCode;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

use crate::{BuildContext, Config, LoadError, CREATED_PACKAGE_PATH};

fn write(root: &Path, rel: &str, text: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap_or_else(|e| panic!("mkdir {}: {e}", parent.display()));
    }
    fs::write(&path, text).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
}

fn tree(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
    for (rel, text) in files {
        write(dir.path(), rel, text);
    }
    dir
}

fn load(root: &Path, args: &[&str]) -> Result<crate::LoadedProgram, LoadError> {
    let args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
    let mut config = Config::from_args(BuildContext::new(root), &args, true)?;
    config.import("runtime");
    config.load()
}

const MAIN: &str = "package main\n\nimport \"greet\"\n\nfunc main() { println(greet.Hello()) }\n";

#[test]
fn from_args_classifies_arguments() {
    let ctx = BuildContext::new("/r");
    assert!(matches!(Config::from_args(ctx.clone(), &[], false), Err(LoadError::NoArgs)));

    let mixed = vec!["a.go".to_string(), "fmt".to_string()];
    let err = Config::from_args(ctx.clone(), &mixed, false).err();
    assert_eq!(
        err.map(|e| e.to_string()),
        Some("named files must all be .go files: fmt".to_string())
    );

    let paths = vec!["x/y".to_string()];
    let config = Config::from_args(ctx.clone(), &paths, false).unwrap_or_else(|e| panic!("{e}"));
    assert!(config.created.is_empty());
    assert_eq!(config.imports, vec!["x/y".to_string()]);

    let files = vec!["cmd/a.go".to_string()];
    let config = Config::from_args(ctx, &files, false).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(config.created, vec![Path::new("/r/cmd/a.go").to_path_buf()]);
}

#[test]
fn loads_created_package_and_imports() {
    let dir = tree(&[
        ("cmd/main.go", MAIN),
        ("src/greet/greet.go", "package greet\n\nfunc Hello() string { return word }\n"),
        ("src/greet/word.go", "package greet\n\nvar word = \"hi\"\n"),
        ("src/greet/word_test.go", "package greet\n\nthis is not go\n"),
        ("src/greet/word_windows.go", "package greet\n\nvar word = \"windows\"\n"),
    ]);
    let program = load(dir.path(), &["cmd/main.go"]).unwrap_or_else(|e| panic!("{e}"));

    let order: Vec<&str> = program.packages.iter().map(|p| p.path.as_str()).collect();
    assert_eq!(order, vec!["greet", "runtime", CREATED_PACKAGE_PATH]);
    assert_eq!(program.created.len(), 1);
    assert_eq!(program.created[0].name, "main");
    assert_eq!(program.created[0].imports, vec!["greet".to_string()]);

    let greet = &program.imported["greet"];
    assert_eq!(greet.files.len(), 2);
    assert!(!greet.is_intrinsic());
    assert!(program.imported["runtime"].is_intrinsic());
    assert_eq!(program.source_map.files().len(), 3);
}

#[test]
fn build_tags_pick_files() {
    let dir = tree(&[
        ("cmd/main.go", MAIN),
        ("src/greet/greet.go", "package greet\n\nfunc Hello() string { return word }\n"),
        ("src/greet/a.go", "//go:build linux\n\npackage greet\n\nvar word = \"linux\"\n"),
        ("src/greet/b.go", "//go:build !linux\n\npackage greet\n\nvar word = \"other\"\n"),
    ]);
    let program = load(dir.path(), &["cmd/main.go"]).unwrap_or_else(|e| panic!("{e}"));
    let names: Vec<String> = program.imported["greet"]
        .file_names
        .iter()
        .map(|n| Path::new(n).file_name().map(|f| f.to_string_lossy().into_owned()).unwrap_or_default())
        .collect();
    assert_eq!(names, vec!["a.go".to_string(), "greet.go".to_string()]);
}

#[test]
fn search_paths_are_consulted_in_order() {
    let root = tree(&[("cmd/main.go", MAIN)]);
    let extra = tree(&[("src/greet/greet.go", "package greet\n\nfunc Hello() string { return \"x\" }\n")]);
    let mut ctx = BuildContext::new(root.path());
    ctx.search_paths.push(extra.path().to_path_buf());
    let config = Config::from_args(ctx, &["cmd/main.go".to_string()], false)
        .unwrap_or_else(|e| panic!("{e}"));
    let program = config.load().unwrap_or_else(|e| panic!("{e}"));
    assert!(program.imported.contains_key("greet"));
}

#[test]
fn missing_import() {
    let dir = tree(&[("cmd/main.go", MAIN)]);
    let err = load(dir.path(), &["cmd/main.go"]).err();
    let Some(err) = err else { panic!("expected an error") };
    assert_eq!(err.code(), Some(ErrorCode::E3001));
    assert!(err.to_string().starts_with("cannot find package \"greet\" in any of:"), "{err}");
}

#[test]
fn import_cycle() {
    let dir = tree(&[
        ("cmd/main.go", "package main\n\nimport \"a\"\n\nfunc main() { a.F() }\n"),
        ("src/a/a.go", "package a\n\nimport \"b\"\n\nfunc F() { b.G() }\n"),
        ("src/b/b.go", "package b\n\nimport \"a\"\n\nfunc G() { a.F() }\n"),
    ]);
    let err = load(dir.path(), &["cmd/main.go"]).err();
    let Some(err) = err else { panic!("expected an error") };
    assert_eq!(err.code(), Some(ErrorCode::E3002));
    assert_eq!(err.to_string(), "import cycle not allowed: a -> b -> a");
}

#[test]
fn mixed_packages_in_directory() {
    let dir = tree(&[
        ("cmd/main.go", MAIN),
        ("src/greet/a.go", "package greet\n\nfunc Hello() string { return \"\" }\n"),
        ("src/greet/b.go", "package other\n"),
    ]);
    let err = load(dir.path(), &["cmd/main.go"]).err();
    assert!(matches!(err, Some(LoadError::MultiplePackages { .. })), "{err:?}");
}

#[test]
fn directory_without_go_files() {
    let dir = tree(&[("cmd/main.go", MAIN), ("src/greet/README", "nothing here\n")]);
    let err = load(dir.path(), &["cmd/main.go"]).err();
    assert!(matches!(err, Some(LoadError::NoGoFiles { .. })), "{err:?}");
}

#[test]
fn syntax_errors_are_rendered_with_positions() {
    let dir = tree(&[("cmd/main.go", "package main\n\nfunc main() {\n\tx := )\n}\n")]);
    let err = load(dir.path(), &["cmd/main.go"]).err();
    let Some(LoadError::Parse(text)) = err else {
        panic!("expected a parse error, got {err:?}")
    };
    assert!(text.contains("main.go:4:"), "{text}");
}

#[test]
fn type_errors_are_rendered() {
    let dir = tree(&[("cmd/main.go", "package main\n\nfunc main() {\n\tx := 1\n}\n")]);
    let err = load(dir.path(), &["cmd/main.go"]).err();
    let Some(LoadError::Type(text)) = err else {
        panic!("expected a type error, got {err:?}")
    };
    assert!(text.ends_with("main.go:4:2: declared and not used: x"), "{text}");
}

#[test]
fn missing_file() {
    let dir = tree(&[]);
    let err = load(dir.path(), &["nope.go"]).err();
    assert!(matches!(err, Some(LoadError::Io { .. })), "{err:?}");
}

#[test]
fn import_paths_only() {
    let dir = tree(&[("src/greet/greet.go", "package greet\n\nfunc Hello() string { return \"x\" }\n")]);
    let program = load(dir.path(), &["greet"]).unwrap_or_else(|e| panic!("{e}"));
    assert!(program.created.is_empty());
    assert_eq!(program.packages.len(), 2);
}
