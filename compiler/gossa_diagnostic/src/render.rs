//! Go-style rendering: `file:line:col: message`, one per line.

use std::fmt::Write as _;

use crate::{Diagnostic, SourceMap};

/// Errors shown before the list is cut off with "too many errors".
pub const MAX_REPORTED_ERRORS: usize = 10;

/// Render diagnostics sorted by position.
///
/// Diagnostics without a resolvable primary span are printed with a bare
/// message after the positioned ones.
pub fn render_all(map: &SourceMap, diagnostics: &[Diagnostic]) -> String {
    let mut sorted: Vec<&Diagnostic> = diagnostics.iter().collect();
    sorted.sort_by_key(|d| d.primary_span().map_or(u32::MAX, |s| s.start));

    let mut out = String::new();
    for (count, diag) in sorted.iter().enumerate() {
        if count == MAX_REPORTED_ERRORS {
            out.push_str("too many errors\n");
            break;
        }
        match diag.primary_span().and_then(|s| map.position(s.start)) {
            Some(pos) => {
                let _ = writeln!(out, "{pos}: {}", diag.message);
            }
            None => {
                let _ = writeln!(out, "{}", diag.message);
            }
        }
        for label in diag.labels.iter().filter(|l| !l.is_primary) {
            if let Some(pos) = map.position(label.span.start) {
                let _ = writeln!(out, "\t{pos}: {}", label.message);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests;
