//! Decoding of Go string and rune literal bodies.

use gossa_diagnostic::{Diagnostic, ErrorCode};
use gossa_ir::Span;

/// Which literal the body belongs to; the quote that may be escaped differs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Quote {
    Double,
    Single,
}

impl Quote {
    fn char(self) -> char {
        match self {
            Quote::Double => '"',
            Quote::Single => '\'',
        }
    }
}

/// Decode escapes in the text between the quotes.
///
/// `start` is the program offset of the first content byte, used to place
/// diagnostics on the offending escape. Byte escapes (`\xNN`, `\NNN`) above
/// 0x7F are rejected in strings because strings are held as UTF-8 text.
pub(crate) fn unescape(
    content: &str,
    quote: Quote,
    start: u32,
    errors: &mut Vec<Diagnostic>,
) -> String {
    if !content.contains('\\') {
        return content.to_string();
    }

    let mut out = String::with_capacity(content.len());
    let mut chars = content.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let at = start + i as u32;
        let Some((_, esc)) = chars.next() else {
            errors.push(bad_escape(at, 1, "escape sequence not terminated"));
            break;
        };
        let simple = match esc {
            'a' => Some('\u{7}'),
            'b' => Some('\u{8}'),
            'f' => Some('\u{c}'),
            'n' => Some('\n'),
            'r' => Some('\r'),
            't' => Some('\t'),
            'v' => Some('\u{b}'),
            '\\' => Some('\\'),
            q if q == quote.char() => Some(q),
            _ => None,
        };
        if let Some(ch) = simple {
            out.push(ch);
            continue;
        }

        let (radix, digits, is_byte) = match esc {
            'x' => (16, 2, true),
            'u' => (16, 4, false),
            'U' => (16, 8, false),
            '0'..='7' => (8, 3, true),
            _ => {
                errors.push(bad_escape(at, 2, "unknown escape sequence"));
                continue;
            }
        };

        let mut text = String::new();
        if radix == 8 {
            text.push(esc);
        }
        while text.len() < digits {
            match chars.peek() {
                Some(&(_, d)) if d.is_digit(radix) => {
                    text.push(d);
                    chars.next();
                }
                _ => break,
            }
        }
        if text.len() < digits {
            errors.push(bad_escape(
                at,
                text.len() as u32 + 2,
                "escape sequence has too few digits",
            ));
            continue;
        }
        let Ok(value) = u32::from_str_radix(&text, radix) else {
            errors.push(bad_escape(at, digits as u32 + 2, "invalid escape sequence"));
            continue;
        };
        if is_byte && value > 0xFF {
            errors.push(bad_escape(at, 4, "octal escape value > 255"));
            continue;
        }
        if is_byte && value > 0x7F && quote == Quote::Double {
            errors.push(bad_escape(
                at,
                digits as u32 + 2,
                "byte escapes above \\x7f are not supported in strings",
            ));
            continue;
        }
        match char::from_u32(value) {
            Some(ch) => out.push(ch),
            None => errors.push(bad_escape(
                at,
                digits as u32 + 2,
                "escape sequence is invalid Unicode code point",
            )),
        }
    }
    out
}

fn bad_escape(at: u32, len: u32, message: &str) -> Diagnostic {
    Diagnostic::error(ErrorCode::E0005)
        .with_message(message)
        .with_label(Span::new(at, at + len), "")
}
