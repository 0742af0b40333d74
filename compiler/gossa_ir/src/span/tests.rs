use super::*;

#[test]
fn basic_properties() {
    let span = Span::new(10, 20);
    assert_eq!(span.len(), 10);
    assert!(!span.is_empty());
    assert!(span.contains(15));
    assert!(!span.contains(20));
}

#[test]
fn merge_covers_both() {
    let merged = Span::new(10, 20).merge(Span::new(15, 30));
    assert_eq!(merged, Span::new(10, 30));
}

#[test]
fn try_from_range_rejects_huge_offsets() {
    let large = u32::MAX as usize + 1;
    assert_eq!(
        Span::try_from_range(large..large + 1),
        Err(SpanError::StartTooLarge(large))
    );
    assert_eq!(
        Span::try_from_range(0..large),
        Err(SpanError::EndTooLarge(large))
    );
}

#[test]
fn from_range_saturates() {
    let large = u32::MAX as usize + 10;
    let span = Span::from_range(5..large);
    assert_eq!(span.start, 5);
    assert_eq!(span.end, u32::MAX);
}

#[test]
fn point_is_empty() {
    assert!(Span::point(7).is_empty());
    assert_eq!(format!("{:?}", Span::point(7)), "7..7");
}
