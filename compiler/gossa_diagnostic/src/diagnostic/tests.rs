use gossa_ir::Span;
use pretty_assertions::assert_eq;

use crate::{Diagnostic, ErrorCode, Severity};

#[test]
fn builder_collects_labels_and_notes() {
    let diag = Diagnostic::error(ErrorCode::E2001)
        .with_message("cannot use s (variable of type string) as int value")
        .with_secondary_label(Span::new(0, 3), "declared here")
        .with_label(Span::new(10, 11), "string value")
        .with_note("conversions must be explicit");

    assert!(diag.is_error());
    assert_eq!(diag.labels.len(), 2);
    assert_eq!(diag.primary_span(), Some(Span::new(10, 11)));
    assert_eq!(diag.notes, vec!["conversions must be explicit".to_string()]);
}

#[test]
fn display_includes_code() {
    let diag = Diagnostic::warning(ErrorCode::E1005).with_message("labels are not supported");
    assert_eq!(diag.severity, Severity::Warning);
    assert_eq!(diag.to_string(), "warning [E1005]: labels are not supported");
}

#[test]
fn code_ranges() {
    assert!(ErrorCode::E0001.is_lexer_error());
    assert!(ErrorCode::E1002.is_parser_error());
    assert!(ErrorCode::E1002.is_syntax_error());
    assert!(!ErrorCode::E2003.is_syntax_error());
    assert_eq!(ErrorCode::E3002.to_string(), "E3002");
}
