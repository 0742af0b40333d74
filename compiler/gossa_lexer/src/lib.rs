//! Lexer for the Go subset accepted by gossa.
//!
//! Raw tokens come from a logos automaton ([`raw_token`]); this crate then
//! decodes literal payloads, turns reserved words into keywords and applies
//! Go's automatic semicolon rule: a line break after an identifier, literal,
//! one of `break continue fallthrough return ++ -- ) ] }`, becomes a `;`.
//!
//! Spans are shifted by the file's base offset in the program source map.

mod escape;
mod raw_token;

use gossa_diagnostic::{Diagnostic, ErrorCode};
use gossa_ir::{Span, Token, TokenKind};
use logos::Logos;

use escape::{unescape, Quote};
use raw_token::RawToken;

/// Tokens of one file plus any lexical errors.
#[derive(Clone, Debug, Default)]
pub struct LexOutput {
    /// Always ends with [`TokenKind::Eof`].
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Tokenize `source`, whose first byte sits at `base` in the source map.
pub fn lex(source: &str, base: u32) -> LexOutput {
    Lexer::new(source, base).run()
}

struct Lexer<'src> {
    source: &'src str,
    base: u32,
    out: LexOutput,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str, base: u32) -> Self {
        Lexer {
            source,
            base,
            out: LexOutput::default(),
        }
    }

    fn run(mut self) -> LexOutput {
        let mut raw = RawToken::lexer(self.source);
        while let Some(result) = raw.next() {
            let range = raw.span();
            let span = self.span(range.start, range.end);
            let slice = raw.slice();
            match result {
                Ok(RawToken::Newline) => self.line_break(span),
                Ok(RawToken::LineComment) => {}
                Ok(RawToken::BlockComment) => {
                    if slice.contains('\n') {
                        self.line_break(span);
                    }
                }
                Ok(tok) => {
                    let kind = self.convert(tok, slice, span);
                    self.out.tokens.push(Token::new(kind, span));
                }
                Err(()) => {
                    let extra = self.recover(&mut raw, slice);
                    let span = self.span(range.start, range.end + extra);
                    self.error_token(slice, span);
                }
            }
        }

        let end = self.base + self.source.len() as u32;
        self.line_break(Span::point(end));
        self.out.tokens.push(Token::new(TokenKind::Eof, Span::point(end)));
        self.out
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.base + start as u32, self.base + end as u32)
    }

    /// Insert a semicolon if the previous token can end a statement.
    fn line_break(&mut self, span: Span) {
        if self
            .out
            .tokens
            .last()
            .is_some_and(|t| t.kind.ends_statement() || t.kind == TokenKind::Error)
        {
            self.out
                .tokens
                .push(Token::new(TokenKind::Semi, Span::point(span.start)));
        }
    }

    /// After an unterminated literal, skip the rest of the line so its
    /// contents are not lexed as code. Returns the number of bytes skipped.
    fn recover(&self, raw: &mut logos::Lexer<'src, RawToken>, slice: &str) -> usize {
        if !matches!(slice.chars().next(), Some('"' | '\'' | '`')) {
            return 0;
        }
        let rest = raw.remainder();
        let skip = if slice.starts_with('`') {
            rest.len()
        } else {
            rest.find('\n').unwrap_or(rest.len())
        };
        raw.bump(skip);
        skip
    }

    fn error_token(&mut self, slice: &str, span: Span) {
        let (code, message) = match slice.chars().next() {
            Some('"' | '`') => (ErrorCode::E0001, "string literal not terminated".to_string()),
            Some('\'') => (ErrorCode::E0004, "rune literal not terminated".to_string()),
            Some('/') if slice.starts_with("/*") => {
                (ErrorCode::E0006, "comment not terminated".to_string())
            }
            Some(c) => (
                ErrorCode::E0002,
                format!("invalid character U+{:04X} '{c}'", c as u32),
            ),
            None => (ErrorCode::E0002, "invalid character".to_string()),
        };
        self.out
            .diagnostics
            .push(Diagnostic::error(code).with_message(message).with_label(span, ""));
        self.out.tokens.push(Token::new(TokenKind::Error, span));
    }

    fn convert(&mut self, raw: RawToken, slice: &str, span: Span) -> TokenKind {
        match raw {
            RawToken::Ident => {
                TokenKind::keyword(slice).unwrap_or_else(|| TokenKind::Ident(slice.to_string()))
            }
            RawToken::Number => self.number(slice, span),
            RawToken::Float => {
                self.out.diagnostics.push(
                    Diagnostic::error(ErrorCode::E0003)
                        .with_message("floating-point literals are not supported")
                        .with_label(span, ""),
                );
                TokenKind::Error
            }
            RawToken::Str => {
                let body = &slice[1..slice.len() - 1];
                TokenKind::Str(unescape(
                    body,
                    Quote::Double,
                    span.start + 1,
                    &mut self.out.diagnostics,
                ))
            }
            RawToken::RawStr => {
                // Carriage returns are discarded from raw strings.
                TokenKind::Str(slice[1..slice.len() - 1].replace('\r', ""))
            }
            RawToken::Char => self.rune(slice, span),

            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Star => TokenKind::Star,
            RawToken::Slash => TokenKind::Slash,
            RawToken::Percent => TokenKind::Percent,
            RawToken::Amp => TokenKind::Amp,
            RawToken::Pipe => TokenKind::Pipe,
            RawToken::Caret => TokenKind::Caret,
            RawToken::Shl => TokenKind::Shl,
            RawToken::Shr => TokenKind::Shr,
            RawToken::AmpCaret => TokenKind::AmpCaret,
            RawToken::PlusEq => TokenKind::PlusEq,
            RawToken::MinusEq => TokenKind::MinusEq,
            RawToken::StarEq => TokenKind::StarEq,
            RawToken::SlashEq => TokenKind::SlashEq,
            RawToken::PercentEq => TokenKind::PercentEq,
            RawToken::AmpEq => TokenKind::AmpEq,
            RawToken::PipeEq => TokenKind::PipeEq,
            RawToken::CaretEq => TokenKind::CaretEq,
            RawToken::ShlEq => TokenKind::ShlEq,
            RawToken::ShrEq => TokenKind::ShrEq,
            RawToken::AmpCaretEq => TokenKind::AmpCaretEq,
            RawToken::AndAnd => TokenKind::AndAnd,
            RawToken::OrOr => TokenKind::OrOr,
            RawToken::Arrow => TokenKind::Arrow,
            RawToken::Inc => TokenKind::Inc,
            RawToken::Dec => TokenKind::Dec,
            RawToken::EqEq => TokenKind::EqEq,
            RawToken::Lt => TokenKind::Lt,
            RawToken::Gt => TokenKind::Gt,
            RawToken::Assign => TokenKind::Assign,
            RawToken::Bang => TokenKind::Bang,
            RawToken::Tilde => TokenKind::Tilde,
            RawToken::NotEq => TokenKind::NotEq,
            RawToken::LtEq => TokenKind::LtEq,
            RawToken::GtEq => TokenKind::GtEq,
            RawToken::Define => TokenKind::Define,
            RawToken::Ellipsis => TokenKind::Ellipsis,

            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Semi => TokenKind::Semi,

            // Handled in `run` before conversion.
            RawToken::Newline | RawToken::LineComment | RawToken::BlockComment => TokenKind::Semi,
        }
    }

    fn number(&mut self, slice: &str, span: Span) -> TokenKind {
        match parse_int(slice) {
            Some(v) => TokenKind::Int(v),
            None => {
                self.out.diagnostics.push(
                    Diagnostic::error(ErrorCode::E0003)
                        .with_message(format!("invalid integer literal {slice}"))
                        .with_label(span, ""),
                );
                TokenKind::Error
            }
        }
    }

    fn rune(&mut self, slice: &str, span: Span) -> TokenKind {
        let body = &slice[1..slice.len() - 1];
        let before = self.out.diagnostics.len();
        let text = unescape(body, Quote::Single, span.start + 1, &mut self.out.diagnostics);
        if self.out.diagnostics.len() > before {
            return TokenKind::Error;
        }
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => TokenKind::Char(i64::from(u32::from(c))),
            _ => {
                self.out.diagnostics.push(
                    Diagnostic::error(ErrorCode::E0004)
                        .with_message("more than one character in rune literal")
                        .with_label(span, ""),
                );
                TokenKind::Error
            }
        }
    }
}

/// Parse a Go integer literal: decimal, `0x` hex, `0o`/leading-zero octal,
/// `0b` binary, with `_` separators between digits.
pub fn parse_int(text: &str) -> Option<u64> {
    if text.starts_with('_') || text.ends_with('_') || text.contains("__") {
        return None;
    }
    let lower = text.to_ascii_lowercase();
    let (radix, digits) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest)
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest)
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest)
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, &lower[1..])
    } else {
        (10, lower.as_str())
    };
    let digits = digits.strip_prefix('_').unwrap_or(digits);
    let cleaned: String = digits.chars().filter(|&c| c != '_').collect();
    if cleaned.is_empty() {
        return None;
    }
    u64::from_str_radix(&cleaned, radix).ok()
}

#[cfg(test)]
mod tests;
