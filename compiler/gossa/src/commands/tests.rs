use std::path::PathBuf;

use gossa_ssa::BuilderMode;
use pretty_assertions::assert_eq;

use super::parse_options;

fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| (*a).to_string()).collect()
}

#[test]
fn flags_then_files_then_program_arguments() {
    let options = parse_options(&strings(&[
        "-build=CF",
        "-trace",
        "-root=/gossa/testdata",
        "-goarch=386",
        "main.go",
        "util.go",
        "first",
        "second.go",
    ]))
    .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(
        options.build,
        Some(BuilderMode::SANITY_CHECK_FUNCTIONS | BuilderMode::PRINT_FUNCTIONS)
    );
    assert!(options.trace);
    assert_eq!(options.root, Some(PathBuf::from("/gossa/testdata")));
    assert_eq!(options.goarch.as_deref(), Some("386"));
    assert_eq!(options.files, strings(&["main.go", "util.go"]));
    assert_eq!(options.args, strings(&["first", "second.go"]));
}

#[test]
fn flags_are_optional() {
    let options = parse_options(&strings(&["main.go"])).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(options.build, None);
    assert!(!options.trace);
    assert_eq!(options.files, strings(&["main.go"]));
    assert!(options.args.is_empty());

    let empty = parse_options(&[]).unwrap_or_else(|e| panic!("{e}"));
    assert!(empty.files.is_empty());
}

#[test]
fn bad_flags_are_rejected() {
    assert_eq!(
        parse_options(&strings(&["-build=CQ", "main.go"])).err(),
        Some("unknown -build letter 'Q' (expected C, F or P)".to_string())
    );
    assert_eq!(
        parse_options(&strings(&["-fast", "main.go"])).err(),
        Some("unknown flag: -fast".to_string())
    );
}

#[test]
fn flags_override_the_harness_target() {
    let options = parse_options(&strings(&["-root=/r", "-goos=darwin", "-goarch=386", "m.go", "x"]))
        .unwrap_or_else(|e| panic!("{e}"));
    let config = options.harness_config();
    assert_eq!(config.root, PathBuf::from("/r"));
    assert_eq!(config.goos, "darwin");
    assert_eq!(config.sizes.word_size, 4);
    assert_eq!(config.args, strings(&["x"]));
    assert_eq!(options.build_context().goarch, "386");
}
