use pretty_assertions::assert_eq;

use gossa_ir::{BinaryOp, UnaryOp};
use gossa_types::{IntKind, Sizes, Type};

use crate::errors::Unwind;
use crate::ops::{binary, convert, decode_rune, decode_runes, unary, wrap};
use crate::value::{SliceValue, Value};

fn sizes() -> Sizes {
    Sizes::default()
}

fn int(op: BinaryOp, a: i128, b: i128, ty: &Type) -> String {
    match binary(op, &Value::Int(a), &Value::Int(b), ty, &sizes()) {
        Ok(v) => v.to_display_string(),
        Err(Unwind::Panic(v)) => format!("panic: {}", v.to_display_string()),
        Err(Unwind::Exit) => "exit".to_string(),
    }
}

#[test]
fn wrapping_follows_the_kind() {
    let s = sizes();
    assert_eq!(wrap(300, IntKind::Uint8, &s), 44);
    assert_eq!(wrap(128, IntKind::Int8, &s), -128);
    assert_eq!(wrap(-1, IntKind::Uint16, &s), 65535);
    assert_eq!(wrap(i128::from(i64::MAX) + 1, IntKind::Int, &s), i128::from(i64::MIN));
    assert_eq!(wrap(1 << 40, IntKind::Int, &Sizes::new(4, 4)), 0);
}

#[test]
fn integer_arithmetic() {
    assert_eq!(int(BinaryOp::Add, 250, 10, &Type::BYTE), "4");
    assert_eq!(int(BinaryOp::Sub, 7, 10, &Type::INT), "-3");
    assert_eq!(int(BinaryOp::Div, -7, 2, &Type::INT), "-3");
    assert_eq!(int(BinaryOp::Rem, -7, 2, &Type::INT), "-1");
    assert_eq!(int(BinaryOp::AndNot, 0b1110, 0b0100, &Type::INT), "10");
    assert_eq!(
        int(BinaryOp::Mul, i128::from(u64::MAX), 2, &Type::Int(IntKind::Uint64)),
        (u64::MAX - 1).to_string()
    );
    assert_eq!(
        int(BinaryOp::Div, i128::from(i64::MIN), -1, &Type::Int(IntKind::Int64)),
        i64::MIN.to_string()
    );
}

#[test]
fn division_by_zero_panics() {
    assert_eq!(
        int(BinaryOp::Div, 1, 0, &Type::INT),
        "panic: runtime error: integer divide by zero"
    );
    assert_eq!(
        int(BinaryOp::Rem, 1, 0, &Type::INT),
        "panic: runtime error: integer divide by zero"
    );
}

#[test]
fn shifts() {
    assert_eq!(int(BinaryOp::Shl, 1, 10, &Type::INT), "1024");
    assert_eq!(int(BinaryOp::Shl, 1, 64, &Type::INT), "0");
    assert_eq!(int(BinaryOp::Shl, 1, 7, &Type::Int(IntKind::Int8)), "-128");
    assert_eq!(int(BinaryOp::Shr, -8, 1, &Type::INT), "-4");
    assert_eq!(int(BinaryOp::Shr, -8, 200, &Type::INT), "-1");
    assert_eq!(
        int(BinaryOp::Shl, 1, -1, &Type::INT),
        "panic: runtime error: negative shift amount"
    );
}

#[test]
fn comparisons_and_strings() {
    assert_eq!(int(BinaryOp::Lt, 1, 2, &Type::Bool), "true");
    assert_eq!(int(BinaryOp::NotEq, 1, 1, &Type::Bool), "false");
    let joined = binary(BinaryOp::Add, &Value::str("go"), &Value::str("ssa"), &Type::String, &sizes())
        .map(|v| v.to_display_string())
        .unwrap_or_default();
    assert_eq!(joined, "gossa");
    let less = binary(BinaryOp::Lt, &Value::str("ab"), &Value::str("b"), &Type::Bool, &sizes())
        .map(|v| v.to_display_string())
        .unwrap_or_default();
    assert_eq!(less, "true");
}

#[test]
fn unary_operators() {
    let s = sizes();
    assert_eq!(unary(UnaryOp::Neg, &Value::Int(5), &Type::INT, &s).as_int(), -5);
    assert_eq!(unary(UnaryOp::BitNot, &Value::Int(0), &Type::BYTE, &s).as_int(), 255);
    assert_eq!(unary(UnaryOp::Neg, &Value::Int(-128), &Type::Int(IntKind::Int8), &s).as_int(), -128);
    assert!(unary(UnaryOp::Not, &Value::Bool(false), &Type::Bool, &s).as_bool());
}

#[test]
fn conversions() {
    let s = sizes();
    let text = |v: Value| v.to_display_string();
    assert_eq!(convert(&Value::Int(-1), &Type::INT, &Type::BYTE, &s).as_int(), 255);
    assert_eq!(text(convert(&Value::Int(0x4e16), &Type::RUNE, &Type::String, &s)), "世");
    assert_eq!(text(convert(&Value::Int(-1), &Type::INT, &Type::String, &s)), "\u{FFFD}");

    let bytes = convert(&Value::str("hé"), &Type::String, &Type::slice(Type::BYTE), &s);
    assert_eq!(text(bytes.clone()), "[104 195 169]");
    let runes = convert(&Value::str("hé"), &Type::String, &Type::slice(Type::RUNE), &s);
    assert_eq!(text(runes.clone()), "[104 233]");

    assert_eq!(text(convert(&bytes, &Type::slice(Type::BYTE), &Type::String, &s)), "hé");
    assert_eq!(text(convert(&runes, &Type::slice(Type::RUNE), &Type::String, &s)), "hé");
    let empty = Value::Slice(SliceValue::default());
    assert_eq!(text(convert(&empty, &Type::slice(Type::BYTE), &Type::String, &s)), "");
}

#[test]
fn rune_decoding() {
    assert_eq!(decode_rune(b"a"), (97, 1));
    assert_eq!(decode_rune("é".as_bytes()), (0xE9, 2));
    assert_eq!(decode_rune(&[0xFF, 0x41]), (0xFFFD, 1));
    assert_eq!(decode_rune(&[0xE4, 0xB8]), (0xFFFD, 1));
    assert_eq!(
        decode_runes("aé\u{10348}".as_bytes()),
        vec![(0, 97), (1, 0xE9), (3, 0x10348)]
    );
}
