use pretty_assertions::assert_eq;

use gossa_types::{Signature, Type};

use crate::errors::Unwind;
use crate::value::{SliceValue, Value};

fn ints(values: &[i128]) -> Value {
    Value::Slice(SliceValue::from_vec(values.iter().map(|v| Value::Int(*v)).collect()))
}

fn printed(value: &Value) -> String {
    value.to_display_string()
}

#[test]
fn zero_values() {
    assert_eq!(printed(&Value::zero(&Type::INT)), "0");
    assert_eq!(printed(&Value::zero(&Type::Bool)), "false");
    assert_eq!(printed(&Value::zero(&Type::String)), "");
    assert!(Value::zero(&Type::slice(Type::INT)).is_nil());
    assert!(Value::zero(&Type::chan(Type::INT)).is_nil());
    assert!(Value::zero(&Type::func(vec![], vec![])).is_nil());
    assert!(Value::zero(&Type::Any).is_nil());
    let pair = Value::zero(&Type::Tuple(vec![Type::INT, Type::String].into()));
    assert_eq!(printed(&pair), "(0, )");
}

#[test]
fn equality_of_basic_values() {
    assert!(Value::Int(3).equals(&Value::Int(3)).unwrap_or(false));
    assert!(!Value::str("a").equals(&Value::str("b")).unwrap_or(true));
    assert!(Value::Chan(None).equals(&Value::Chan(None)).unwrap_or(false));
}

#[test]
fn slices_and_functions_equal_only_nil() {
    let nil = Value::zero(&Type::slice(Type::INT));
    assert!(nil.equals(&nil).unwrap_or(false));
    assert!(!ints(&[]).equals(&nil).unwrap_or(true));
    let f = Value::zero(&Type::Func(std::sync::Arc::new(Signature::default())));
    assert!(f.equals(&f).unwrap_or(false));
}

#[test]
fn interfaces_compare_type_then_value() {
    let one = Value::boxed(Type::INT, Value::Int(1));
    let one_byte = Value::boxed(Type::BYTE, Value::Int(1));
    assert!(one.equals(&Value::boxed(Type::INT, Value::Int(1))).unwrap_or(false));
    assert!(!one.equals(&one_byte).unwrap_or(true));
    assert!(!one.equals(&Value::Interface(None)).unwrap_or(true));
    assert!(Value::Interface(None).equals(&Value::Interface(None)).unwrap_or(false));
}

#[test]
fn comparing_boxed_slices_panics() {
    let boxed = Value::boxed(Type::slice(Type::INT), ints(&[1]));
    match boxed.equals(&boxed.clone()) {
        Err(Unwind::Panic(value)) => assert_eq!(
            printed(&value),
            "runtime error: comparing uncomparable type []int"
        ),
        other => panic!("expected a panic, got {other:?}"),
    }
}

#[test]
fn print_forms() {
    assert_eq!(printed(&Value::Int(-42)), "-42");
    assert_eq!(printed(&Value::Bool(true)), "true");
    assert_eq!(printed(&ints(&[1, 2, 3])), "[1 2 3]");
    assert_eq!(printed(&Value::boxed(Type::String, Value::str("hi"))), "hi");
    assert_eq!(printed(&Value::Interface(None)), "<nil>");
    assert_eq!(printed(&Value::Chan(None)), "0x0");
}

#[test]
fn slice_bounds_are_checked() {
    let s = ints(&[10, 20]);
    let Value::Slice(s) = s else { unreachable!() };
    assert_eq!(printed(&s.get(1).unwrap_or_default()), "20");
    match s.get(2) {
        Err(Unwind::Panic(value)) => assert_eq!(
            printed(&value),
            "runtime error: index out of range [2] with length 2"
        ),
        other => panic!("expected a panic, got {other:?}"),
    }
    assert!(s.set(-1, Value::Int(0)).is_err());
}
