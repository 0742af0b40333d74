use pretty_assertions::assert_eq;

use crate::LineIndex;

#[test]
fn lines_and_columns() {
    let src = "ab\ncd\n\nef";
    let index = LineIndex::new(src);
    assert_eq!(index.line_count(), 4);
    assert_eq!(index.line_col(src, 0), (1, 1));
    assert_eq!(index.line_col(src, 1), (1, 2));
    assert_eq!(index.line_col(src, 3), (2, 1));
    assert_eq!(index.line_col(src, 6), (3, 1));
    assert_eq!(index.line_col(src, 8), (4, 2));
}

#[test]
fn offset_past_end_clamps() {
    let src = "x\n";
    let index = LineIndex::new(src);
    assert_eq!(index.line_col(src, 100), (2, 1));
}

#[test]
fn columns_count_bytes() {
    let src = "s := \"é\"; x";
    let index = LineIndex::new(src);
    // 'é' is two bytes
    assert_eq!(index.line_col(src, 11), (1, 12));
}

#[test]
fn line_text_strips_newline() {
    let src = "first\nsecond\n";
    let index = LineIndex::new(src);
    assert_eq!(index.line_text(src, 1), Some("first"));
    assert_eq!(index.line_text(src, 2), Some("second"));
    assert_eq!(index.line_text(src, 3), Some(""));
    assert_eq!(index.line_text(src, 0), None);
    assert_eq!(index.line_text(src, 9), None);
}
