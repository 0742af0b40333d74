//! Stack growth for deeply recursive passes.
//!
//! The parser, type checker and IR builder recurse over the syntax tree, and
//! the interpreter recurses once per Go call. A Go program that recurses a few
//! hundred thousand levels (or a generated file with very deep nesting) would
//! overflow a fixed thread stack, so every recursive entry point goes through
//! [`ensure_sufficient_stack`].
//!
//! Goroutines run on their own threads; `stacker` grows whichever stack the
//! current thread is on, so the same helper works there too.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each freshly allocated stack segment.
const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

/// Run `f`, first switching to a new stack segment if the current one is
/// close to exhaustion.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM manages its own stack; call straight through.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
