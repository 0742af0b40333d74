//! Compile-time constant values and their arithmetic.
//!
//! Integer constants are held in `i128`, wide enough for every value that
//! fits one of the integer kinds plus intermediate results; a result that
//! leaves `i128` is reported as an overflow.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use gossa_ir::{BinaryOp, UnaryOp};

use crate::{IntKind, Sizes};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Int(i128),
    Bool(bool),
    Str(Arc<str>),
}

/// Why constant evaluation failed.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ConstError {
    DivisionByZero,
    Overflow,
    NegativeShift,
    ShiftTooLarge,
    /// Operator does not apply to these constants.
    Mismatch,
}

impl ConstValue {
    pub fn str(s: &str) -> Self {
        ConstValue::Str(Arc::from(s))
    }

    pub fn as_int(&self) -> Option<i128> {
        match self {
            ConstValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConstValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

/// Whether `value` fits in the integer kind under the given sizes.
pub fn representable(value: i128, kind: IntKind, sizes: &Sizes) -> bool {
    let bits = sizes.int_bits(kind);
    if kind.is_signed() {
        let max = (1i128 << (bits - 1)) - 1;
        value >= -max - 1 && value <= max
    } else {
        value >= 0 && value < (1i128 << bits)
    }
}

fn compare(op: BinaryOp, ord: Ordering) -> Option<bool> {
    Some(match op {
        BinaryOp::Eq => ord == Ordering::Equal,
        BinaryOp::NotEq => ord != Ordering::Equal,
        BinaryOp::Lt => ord == Ordering::Less,
        BinaryOp::LtEq => ord != Ordering::Greater,
        BinaryOp::Gt => ord == Ordering::Greater,
        BinaryOp::GtEq => ord != Ordering::Less,
        _ => return None,
    })
}

/// Fold a binary operation on two constants of matching kind.
///
/// Shifts take the count from `b`; representability in a typed result is
/// checked by the caller.
pub fn binary(op: BinaryOp, a: &ConstValue, b: &ConstValue) -> Result<ConstValue, ConstError> {
    match (a, b) {
        (ConstValue::Int(x), ConstValue::Int(y)) => {
            let (x, y) = (*x, *y);
            if let Some(result) = compare(op, x.cmp(&y)) {
                return Ok(ConstValue::Bool(result));
            }
            let value = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Sub => x.checked_sub(y),
                BinaryOp::Mul => x.checked_mul(y),
                BinaryOp::Div | BinaryOp::Rem if y == 0 => {
                    return Err(ConstError::DivisionByZero)
                }
                BinaryOp::Div => x.checked_div(y),
                BinaryOp::Rem => x.checked_rem(y),
                BinaryOp::And => Some(x & y),
                BinaryOp::Or => Some(x | y),
                BinaryOp::Xor => Some(x ^ y),
                BinaryOp::AndNot => Some(x & !y),
                BinaryOp::Shl => return shift_left(x, y),
                BinaryOp::Shr => {
                    if y < 0 {
                        return Err(ConstError::NegativeShift);
                    }
                    Some(x >> y.min(127))
                }
                _ => return Err(ConstError::Mismatch),
            };
            value.map(ConstValue::Int).ok_or(ConstError::Overflow)
        }
        (ConstValue::Str(x), ConstValue::Str(y)) => {
            if let Some(result) = compare(op, x.cmp(y)) {
                return Ok(ConstValue::Bool(result));
            }
            match op {
                BinaryOp::Add => Ok(ConstValue::Str(Arc::from(format!("{x}{y}")))),
                _ => Err(ConstError::Mismatch),
            }
        }
        (ConstValue::Bool(x), ConstValue::Bool(y)) => match op {
            BinaryOp::LogAnd => Ok(ConstValue::Bool(*x && *y)),
            BinaryOp::LogOr => Ok(ConstValue::Bool(*x || *y)),
            BinaryOp::Eq => Ok(ConstValue::Bool(x == y)),
            BinaryOp::NotEq => Ok(ConstValue::Bool(x != y)),
            _ => Err(ConstError::Mismatch),
        },
        _ => Err(ConstError::Mismatch),
    }
}

fn shift_left(x: i128, count: i128) -> Result<ConstValue, ConstError> {
    if count < 0 {
        return Err(ConstError::NegativeShift);
    }
    if x == 0 {
        return Ok(ConstValue::Int(0));
    }
    if count > 126 {
        return Err(ConstError::ShiftTooLarge);
    }
    let shifted = x << count;
    if shifted >> count == x {
        Ok(ConstValue::Int(shifted))
    } else {
        Err(ConstError::Overflow)
    }
}

/// Fold a unary operation. `unsigned_bits` is the width of a typed
/// unsigned operand, which makes `^x` a mask rather than `-x-1`.
pub fn unary(
    op: UnaryOp,
    a: &ConstValue,
    unsigned_bits: Option<u32>,
) -> Result<ConstValue, ConstError> {
    match (op, a) {
        (UnaryOp::Plus, ConstValue::Int(x)) => Ok(ConstValue::Int(*x)),
        (UnaryOp::Neg, ConstValue::Int(x)) => {
            x.checked_neg().map(ConstValue::Int).ok_or(ConstError::Overflow)
        }
        (UnaryOp::BitNot, ConstValue::Int(x)) => Ok(ConstValue::Int(match unsigned_bits {
            Some(bits) => !x & ((1i128 << bits) - 1),
            None => !x,
        })),
        (UnaryOp::Not, ConstValue::Bool(b)) => Ok(ConstValue::Bool(!b)),
        _ => Err(ConstError::Mismatch),
    }
}
