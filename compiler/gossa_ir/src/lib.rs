//! Shared front-end data for gossa.
//!
//! This crate holds the types every front-end phase agrees on:
//! - [`Span`] byte ranges into a source file
//! - [`NodeId`] identities for expressions and declared identifiers
//! - [`Token`]/[`TokenKind`] produced by the lexer
//! - the [`ast`] of the accepted Go subset
//!
//! The type checker keys its side tables by [`NodeId`], so the tree itself
//! stays plain data with no interior annotations.

/// Compile-time assertion that a type has a specific size.
#[macro_export]
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

pub mod ast;
mod node_id;
mod span;
mod token;

pub use ast::{BinaryOp, UnaryOp};
pub use node_id::{NodeId, NodeIdGen};
pub use span::{Span, SpanError};
pub use token::{Token, TokenKind};
