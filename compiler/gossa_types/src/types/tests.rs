use pretty_assertions::assert_eq;

use crate::{IntKind, Signature, Type, Untyped};

#[test]
fn display_matches_go_spelling() {
    assert_eq!(Type::slice(Type::BYTE).to_string(), "[]uint8");
    assert_eq!(Type::chan(Type::slice(Type::INT)).to_string(), "chan []int");
    assert_eq!(
        Type::func(vec![Type::INT, Type::String], vec![Type::Bool]).to_string(),
        "func(int, string) bool"
    );
    assert_eq!(
        Type::func(vec![], vec![Type::INT, Type::Any]).to_string(),
        "func() (int, interface {})"
    );
    assert_eq!(Type::Untyped(Untyped::Nil).to_string(), "untyped nil");
}

#[test]
fn identity_is_structural() {
    assert_eq!(Type::slice(Type::INT), Type::slice(Type::INT));
    assert_ne!(Type::slice(Type::INT), Type::slice(Type::RUNE));
    assert_ne!(Type::chan(Type::INT), Type::slice(Type::INT));
}

#[test]
fn predicates() {
    assert!(Type::Int(IntKind::Uint16).is_unsigned());
    assert!(!Type::INT.is_unsigned());
    assert!(Type::Untyped(Untyped::Rune).is_integer());
    assert!(Type::String.is_ordered());
    assert!(!Type::slice(Type::INT).is_comparable());
    assert!(Type::chan(Type::INT).is_comparable());
    assert!(Type::Func(Signature::default().into()).has_nil());
    assert!(!Type::String.has_nil());
}

#[test]
fn call_result_types() {
    assert_eq!(Signature::new(vec![], vec![]).result_type(), Type::unit());
    assert_eq!(
        Signature::new(vec![], vec![Type::String]).result_type(),
        Type::String
    );
    assert_eq!(
        Signature::new(vec![], vec![Type::INT, Type::Bool]).result_type().arity(),
        2
    );
}

#[test]
fn untyped_defaults() {
    assert_eq!(Type::Untyped(Untyped::Rune).defaulted(), Type::RUNE);
    assert_eq!(Type::Untyped(Untyped::Int).defaulted(), Type::INT);
    assert_eq!(Type::Bool.defaulted(), Type::Bool);
}
