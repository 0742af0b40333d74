//! Machine sizes: word size and maximum alignment.

use crate::{IntKind, Type};

/// Word size and maximum alignment in bytes.
///
/// `int`, `uint` and `uintptr` are one word wide; `unsafe.Sizeof` and
/// `unsafe.Alignof` follow the usual gc layout rules under these sizes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Sizes {
    pub word_size: u64,
    pub max_align: u64,
}

impl Default for Sizes {
    fn default() -> Self {
        Sizes {
            word_size: 8,
            max_align: 8,
        }
    }
}

impl Sizes {
    pub const fn new(word_size: u64, max_align: u64) -> Self {
        Sizes {
            word_size,
            max_align,
        }
    }

    /// Sizes for a GOARCH value; unknown architectures get 64-bit sizes.
    pub fn for_arch(goarch: &str) -> Self {
        match goarch {
            "386" | "arm" | "mips" | "mipsle" | "wasm32" => Sizes::new(4, 4),
            _ => Sizes::new(8, 8),
        }
    }

    pub fn int_bits(&self, kind: IntKind) -> u32 {
        kind.bits(self.word_size)
    }

    pub fn sizeof(&self, ty: &Type) -> u64 {
        match ty {
            Type::Int(k) => u64::from(self.int_bits(*k) / 8),
            Type::Bool => 1,
            Type::String | Type::Any => 2 * self.word_size,
            Type::Slice(_) => 3 * self.word_size,
            Type::Chan(_) | Type::Func(_) => self.word_size,
            Type::Untyped(u) => self.sizeof(&u.default_type()),
            Type::Tuple(_) | Type::Invalid => 0,
        }
    }

    pub fn alignof(&self, ty: &Type) -> u64 {
        let natural = match ty {
            Type::String | Type::Any | Type::Slice(_) => self.word_size,
            other => self.sizeof(other).max(1),
        };
        natural.min(self.max_align)
    }
}

#[cfg(test)]
mod tests;
