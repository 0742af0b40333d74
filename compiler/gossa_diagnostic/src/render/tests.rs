use gossa_ir::Span;
use pretty_assertions::assert_eq;

use crate::{render_all, Diagnostic, ErrorCode, SourceMap, MAX_REPORTED_ERRORS};

fn map() -> SourceMap {
    let mut map = SourceMap::new();
    map.add("main.go", "package main\n\nfunc main() {\n\tx := 1\n}\n");
    map
}

#[test]
fn sorted_by_position() {
    let map = map();
    let diags = vec![
        Diagnostic::error(ErrorCode::E2003)
            .with_message("declared and not used: x")
            .with_label(Span::new(29, 30), ""),
        Diagnostic::error(ErrorCode::E2002)
            .with_message("undefined: y")
            .with_label(Span::new(14, 18), ""),
    ];
    assert_eq!(
        render_all(&map, &diags),
        "main.go:3:1: undefined: y\nmain.go:4:2: declared and not used: x\n"
    );
}

#[test]
fn secondary_labels_are_indented() {
    let map = map();
    let diags = vec![Diagnostic::error(ErrorCode::E2009)
        .with_message("main redeclared in this block")
        .with_label(Span::new(19, 23), "")
        .with_secondary_label(Span::new(0, 7), "other declaration of main")];
    assert_eq!(
        render_all(&map, &diags),
        "main.go:3:6: main redeclared in this block\n\tmain.go:1:1: other declaration of main\n"
    );
}

#[test]
fn unpositioned_goes_last() {
    let map = map();
    let diags = vec![
        Diagnostic::error(ErrorCode::E3001).with_message("package fmt is not in the search path"),
        Diagnostic::error(ErrorCode::E2002)
            .with_message("undefined: y")
            .with_label(Span::new(14, 18), ""),
    ];
    assert_eq!(
        render_all(&map, &diags),
        "main.go:3:1: undefined: y\npackage fmt is not in the search path\n"
    );
}

#[test]
fn output_is_capped() {
    let map = map();
    let diags: Vec<_> = (0..MAX_REPORTED_ERRORS + 3)
        .map(|i| {
            Diagnostic::error(ErrorCode::E2002)
                .with_message(format!("undefined: v{i}"))
                .with_label(Span::new(i as u32, i as u32 + 1), "")
        })
        .collect();
    let text = render_all(&map, &diags);
    assert_eq!(text.lines().count(), MAX_REPORTED_ERRORS + 1);
    assert!(text.ends_with("too many errors\n"));
}
