//! Runtime values.
//!
//! Integers of every kind are held as `i128`, always normalized to the
//! width and signedness of their static type, so comparisons never need the
//! type. Strings are byte sequences, as in Go. Slices share a backing array
//! behind a lock; cells (locals and globals) are shared the same way so that
//! closures and goroutines see each other's writes.

use std::fmt::Write as _;
use std::sync::Arc;

use gossa_ssa::FuncId;
use gossa_types::{Type, Untyped};
use parking_lot::Mutex;

use crate::errors::{runtime_error, ExecResult};

/// A storage location: a local variable or a package-level variable.
pub type Cell = Arc<Mutex<Value>>;

pub fn new_cell(value: Value) -> Cell {
    Arc::new(Mutex::new(value))
}

/// Index of a channel in the machine's channel table.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChanId(pub u32);

impl ChanId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A function value. Plain functions have no bindings.
#[derive(Clone, Debug)]
pub struct Closure {
    pub func: FuncId,
    /// Captured cells, one per free variable of `func`.
    pub bindings: Arc<[Value]>,
}

/// A window onto a shared backing array. `array` is `None` for a nil slice.
#[derive(Clone, Debug, Default)]
pub struct SliceValue {
    pub array: Option<Arc<Mutex<Vec<Value>>>>,
    pub offset: usize,
    pub len: usize,
    pub cap: usize,
}

impl SliceValue {
    pub fn from_vec(elems: Vec<Value>) -> Self {
        let len = elems.len();
        SliceValue {
            array: Some(Arc::new(Mutex::new(elems))),
            offset: 0,
            len,
            cap: len,
        }
    }

    pub fn is_nil(&self) -> bool {
        self.array.is_none()
    }

    /// A copy of the visible elements.
    pub fn elems(&self) -> Vec<Value> {
        match &self.array {
            Some(array) => array.lock()[self.offset..self.offset + self.len].to_vec(),
            None => Vec::new(),
        }
    }

    pub fn get(&self, index: i128) -> ExecResult<Value> {
        let i = self.check_index(index)?;
        match &self.array {
            Some(array) => Ok(array.lock()[self.offset + i].clone()),
            None => Err(index_out_of_range(index, self.len)),
        }
    }

    pub fn set(&self, index: i128, value: Value) -> ExecResult<()> {
        let i = self.check_index(index)?;
        match &self.array {
            Some(array) => {
                array.lock()[self.offset + i] = value;
                Ok(())
            }
            None => Err(index_out_of_range(index, self.len)),
        }
    }

    fn check_index(&self, index: i128) -> ExecResult<usize> {
        match usize::try_from(index) {
            Ok(i) if i < self.len => Ok(i),
            _ => Err(index_out_of_range(index, self.len)),
        }
    }
}

pub(crate) fn index_out_of_range(index: i128, len: usize) -> crate::errors::Unwind {
    runtime_error(format!("index out of range [{index}] with length {len}"))
}

/// Position in a string being ranged over.
#[derive(Debug)]
pub struct StringIter {
    pub bytes: Arc<[u8]>,
    pub pos: usize,
}

#[derive(Clone, Debug)]
pub enum Value {
    Int(i128),
    Bool(bool),
    Str(Arc<[u8]>),
    Slice(SliceValue),
    Chan(Option<ChanId>),
    Func(Option<Closure>),
    /// `None` is the nil interface; otherwise the dynamic type and value.
    Interface(Option<Arc<(Type, Value)>>),
    Cell(Cell),
    Tuple(Arc<[Value]>),
    Iter(Arc<Mutex<StringIter>>),
}

impl Default for Value {
    fn default() -> Self {
        Value::unit()
    }
}

impl Value {
    pub fn unit() -> Value {
        Value::Tuple(Arc::from(Vec::new()))
    }

    pub fn str(s: &str) -> Value {
        Value::Str(Arc::from(s.as_bytes()))
    }

    pub fn boxed(ty: Type, value: Value) -> Value {
        Value::Interface(Some(Arc::new((ty, value))))
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Arc::from(items))
    }

    /// The zero value of `ty`.
    pub fn zero(ty: &Type) -> Value {
        match ty {
            Type::Int(_) | Type::Untyped(Untyped::Int | Untyped::Rune) => {
                Value::Int(0)
            }
            Type::Bool | Type::Untyped(Untyped::Bool) => Value::Bool(false),
            Type::String | Type::Untyped(Untyped::String) => Value::Str(Arc::from(&[][..])),
            Type::Slice(_) => Value::Slice(SliceValue::default()),
            Type::Chan(_) => Value::Chan(None),
            Type::Func(_) => Value::Func(None),
            Type::Tuple(items) => Value::Tuple(items.iter().map(Value::zero).collect()),
            Type::Any | Type::Untyped(Untyped::Nil) | Type::Invalid => {
                Value::Interface(None)
            }
        }
    }

    pub fn as_int(&self) -> i128 {
        match self {
            Value::Int(v) => *v,
            _ => 0,
        }
    }

    pub fn as_bool(&self) -> bool {
        matches!(self, Value::Bool(true))
    }

    pub fn is_nil(&self) -> bool {
        match self {
            Value::Slice(s) => s.is_nil(),
            Value::Chan(c) => c.is_none(),
            Value::Func(f) => f.is_none(),
            Value::Interface(i) => i.is_none(),
            _ => false,
        }
    }

    /// Go `==`. Comparing interfaces holding slices or functions panics.
    pub fn equals(&self, other: &Value) -> ExecResult<bool> {
        Ok(match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Chan(a), Value::Chan(b)) => a == b,
            (Value::Interface(a), Value::Interface(b)) => match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => {
                    if a.0 != b.0 {
                        return Ok(false);
                    }
                    if !a.0.is_comparable() {
                        return Err(runtime_error(format!(
                            "comparing uncomparable type {}",
                            a.0
                        )));
                    }
                    a.1.equals(&b.1)?
                }
                _ => false,
            },
            // Slices and functions compare only against nil.
            (Value::Slice(_) | Value::Func(_), _) => self.is_nil() && other.is_nil(),
            _ => false,
        })
    }

    /// Append the `print`/`println` form of the value to `out`.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Value::Int(v) => {
                let _ = write!(Utf8Sink(out), "{v}");
            }
            Value::Bool(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
            Value::Str(s) => out.extend_from_slice(s),
            Value::Slice(s) => {
                out.push(b'[');
                for (i, elem) in s.elems().iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    elem.write_to(out);
                }
                out.push(b']');
            }
            Value::Chan(c) => {
                let id = c.map_or(0, |c| u64::from(c.0) + 1);
                let _ = write!(Utf8Sink(out), "0x{id:x}");
            }
            Value::Func(f) => {
                let id = f.as_ref().map_or(0, |f| u64::from(f.func.raw()) + 1);
                let _ = write!(Utf8Sink(out), "0x{id:x}");
            }
            Value::Interface(None) => out.extend_from_slice(b"<nil>"),
            Value::Interface(Some(boxed)) => boxed.1.write_to(out),
            Value::Cell(cell) => cell.lock().write_to(out),
            Value::Tuple(items) => {
                out.push(b'(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.extend_from_slice(b", ");
                    }
                    item.write_to(out);
                }
                out.push(b')');
            }
            Value::Iter(_) => out.extend_from_slice(b"<iter>"),
        }
    }

    /// The `print` form as a string, with invalid UTF-8 replaced.
    pub fn to_display_string(&self) -> String {
        let mut out = Vec::new();
        self.write_to(&mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}

/// `fmt::Write` over a byte buffer.
struct Utf8Sink<'a>(&'a mut Vec<u8>);

impl std::fmt::Write for Utf8Sink<'_> {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        self.0.extend_from_slice(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests;
