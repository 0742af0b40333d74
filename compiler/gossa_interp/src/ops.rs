//! Operators and conversions.
//!
//! Direct enum dispatch over the operator and operand shapes; the checker
//! has already made sure the operands agree.

use std::sync::Arc;

use gossa_ir::{BinaryOp, UnaryOp};
use gossa_types::{IntKind, Sizes, Type};

use crate::errors::{divide_by_zero, negative_shift, ExecResult};
use crate::value::{SliceValue, Value};

/// Reduce `v` to the range of `kind`, wrapping like two's complement.
pub fn wrap(v: i128, kind: IntKind, sizes: &Sizes) -> i128 {
    let bits = sizes.int_bits(kind);
    let mask = (1i128 << bits) - 1;
    let low = v & mask;
    if kind.is_signed() && (low >> (bits - 1)) & 1 == 1 {
        low - (1i128 << bits)
    } else {
        low
    }
}

fn wrap_to(v: i128, ty: &Type, sizes: &Sizes) -> i128 {
    match ty {
        Type::Int(kind) => wrap(v, *kind, sizes),
        _ => v,
    }
}

/// `left op right` for a result of type `ty`. Comparisons ignore `ty`.
pub fn binary(op: BinaryOp, left: &Value, right: &Value, ty: &Type, sizes: &Sizes) -> ExecResult<Value> {
    match op {
        BinaryOp::Eq => return left.equals(right).map(Value::Bool),
        BinaryOp::NotEq => return left.equals(right).map(|eq| Value::Bool(!eq)),
        _ => {}
    }
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => int_binary(op, *a, *b, ty, sizes),
        (Value::Str(a), Value::Str(b)) => Ok(match op {
            BinaryOp::Add => {
                let mut joined = Vec::with_capacity(a.len() + b.len());
                joined.extend_from_slice(a);
                joined.extend_from_slice(b);
                Value::Str(Arc::from(joined))
            }
            BinaryOp::Lt => Value::Bool(a < b),
            BinaryOp::LtEq => Value::Bool(a <= b),
            BinaryOp::Gt => Value::Bool(a > b),
            BinaryOp::GtEq => Value::Bool(a >= b),
            _ => Value::Str(Arc::clone(a)),
        }),
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(match op {
            BinaryOp::LogAnd => *a && *b,
            BinaryOp::LogOr => *a || *b,
            _ => *a,
        })),
        _ => Ok(left.clone()),
    }
}

fn int_binary(op: BinaryOp, a: i128, b: i128, ty: &Type, sizes: &Sizes) -> ExecResult<Value> {
    let v = match op {
        BinaryOp::Lt => return Ok(Value::Bool(a < b)),
        BinaryOp::LtEq => return Ok(Value::Bool(a <= b)),
        BinaryOp::Gt => return Ok(Value::Bool(a > b)),
        BinaryOp::GtEq => return Ok(Value::Bool(a >= b)),
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::Div => {
            if b == 0 {
                return Err(divide_by_zero());
            }
            a / b
        }
        BinaryOp::Rem => {
            if b == 0 {
                return Err(divide_by_zero());
            }
            a % b
        }
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::AndNot => a & !b,
        BinaryOp::Shl => {
            if b < 0 {
                return Err(negative_shift());
            }
            if b >= 64 {
                0
            } else {
                a << b
            }
        }
        BinaryOp::Shr => {
            if b < 0 {
                return Err(negative_shift());
            }
            a >> b.min(127)
        }
        BinaryOp::Eq | BinaryOp::NotEq | BinaryOp::LogAnd | BinaryOp::LogOr => a,
    };
    Ok(Value::Int(wrap_to(v, ty, sizes)))
}

pub fn unary(op: UnaryOp, operand: &Value, ty: &Type, sizes: &Sizes) -> Value {
    match (op, operand) {
        (UnaryOp::Neg, Value::Int(v)) => Value::Int(wrap_to(-v, ty, sizes)),
        (UnaryOp::BitNot, Value::Int(v)) => Value::Int(wrap_to(!v, ty, sizes)),
        (UnaryOp::Not, Value::Bool(b)) => Value::Bool(!b),
        _ => operand.clone(),
    }
}

/// Convert `value` of type `from` to type `to`.
pub fn convert(value: &Value, from: &Type, to: &Type, sizes: &Sizes) -> Value {
    match (value, to) {
        (Value::Int(v), Type::Int(kind)) => Value::Int(wrap(*v, *kind, sizes)),
        (Value::Int(v), Type::String) => {
            let c = u32::try_from(*v)
                .ok()
                .and_then(char::from_u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            let mut buf = [0u8; 4];
            Value::str(c.encode_utf8(&mut buf))
        }
        (Value::Str(s), Type::Slice(elem)) if **elem == Type::RUNE => {
            let runes = decode_runes(s).into_iter().map(|(_, r)| Value::Int(i128::from(r)));
            Value::Slice(SliceValue::from_vec(runes.collect()))
        }
        (Value::Str(s), Type::Slice(_)) => {
            let bytes = s.iter().map(|b| Value::Int(i128::from(*b)));
            Value::Slice(SliceValue::from_vec(bytes.collect()))
        }
        (Value::Slice(s), Type::String) => {
            let elems = s.elems();
            if from.elem() == Some(&Type::RUNE) {
                let text: String = elems
                    .iter()
                    .map(|r| {
                        u32::try_from(r.as_int())
                            .ok()
                            .and_then(char::from_u32)
                            .unwrap_or(char::REPLACEMENT_CHARACTER)
                    })
                    .collect();
                Value::str(&text)
            } else {
                let bytes: Vec<u8> = elems.iter().map(|b| b.as_int() as u8).collect();
                Value::Str(Arc::from(bytes))
            }
        }
        _ => value.clone(),
    }
}

/// Decode one rune at the start of `bytes`: the rune and its width.
/// Invalid encodings decode as U+FFFD with width 1.
pub fn decode_rune(bytes: &[u8]) -> (u32, usize) {
    let width = match bytes.first() {
        None => return (0xFFFD, 0),
        Some(b) if *b < 0x80 => return (u32::from(*b), 1),
        Some(b) if b & 0xE0 == 0xC0 => 2,
        Some(b) if b & 0xF0 == 0xE0 => 3,
        Some(b) if b & 0xF8 == 0xF0 => 4,
        Some(_) => return (0xFFFD, 1),
    };
    match bytes.get(..width).and_then(|b| std::str::from_utf8(b).ok()) {
        Some(s) => s.chars().next().map_or((0xFFFD, 1), |c| (c as u32, width)),
        None => (0xFFFD, 1),
    }
}

/// Every rune of a string with its byte offset.
pub fn decode_runes(bytes: &[u8]) -> Vec<(usize, u32)> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let (r, width) = decode_rune(&bytes[pos..]);
        out.push((pos, r));
        pos += width.max(1);
    }
    out
}

#[cfg(test)]
mod tests;
