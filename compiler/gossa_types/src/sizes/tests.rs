use pretty_assertions::assert_eq;

use crate::{IntKind, Sizes, Type};

#[test]
fn sixty_four_bit_layout() {
    let sizes = Sizes::default();
    assert_eq!(sizes.sizeof(&Type::INT), 8);
    assert_eq!(sizes.sizeof(&Type::BYTE), 1);
    assert_eq!(sizes.sizeof(&Type::RUNE), 4);
    assert_eq!(sizes.sizeof(&Type::String), 16);
    assert_eq!(sizes.sizeof(&Type::slice(Type::INT)), 24);
    assert_eq!(sizes.sizeof(&Type::Any), 16);
    assert_eq!(sizes.alignof(&Type::String), 8);
    assert_eq!(sizes.alignof(&Type::Bool), 1);
}

#[test]
fn thirty_two_bit_layout() {
    let sizes = Sizes::for_arch("386");
    assert_eq!(sizes.int_bits(IntKind::Int), 32);
    assert_eq!(sizes.sizeof(&Type::INT), 4);
    assert_eq!(sizes.sizeof(&Type::Int(IntKind::Int64)), 8);
    // int64 alignment is capped by the maximum alignment
    assert_eq!(sizes.alignof(&Type::Int(IntKind::Int64)), 4);
    assert_eq!(sizes.sizeof(&Type::slice(Type::BYTE)), 12);
}
