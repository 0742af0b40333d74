//! Diagnostics for the gossa front end.
//!
//! Every phase (lexer, parser, checker, loader) reports problems as a
//! [`Diagnostic`] carrying an [`ErrorCode`], a message and labeled spans.
//! Spans are offsets into a [`SourceMap`], which gives every loaded file
//! its own base offset so one span type covers a whole program.
//!
//! Diagnostics are rendered the way the Go toolchain prints them,
//! `file:line:col: message`.

mod diagnostic;
mod error_code;
mod line_index;
mod render;
mod source_map;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use line_index::LineIndex;
pub use render::{render_all, MAX_REPORTED_ERRORS};
pub use source_map::{Position, SourceFile, SourceMap};
