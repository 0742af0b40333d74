use gossa_ir::TokenKind::{self, *};
use pretty_assertions::assert_eq;

use crate::{lex, parse_int};

fn kinds(src: &str) -> Vec<TokenKind> {
    let out = lex(src, 0);
    assert!(out.diagnostics.is_empty(), "{:?}", out.diagnostics);
    out.tokens.into_iter().map(|t| t.kind).collect()
}

fn ident(name: &str) -> TokenKind {
    Ident(name.to_string())
}

#[test]
fn semicolons_after_statement_enders() {
    let src = "package main\n\nfunc main() {\n\tx++\n\treturn\n}\n";
    assert_eq!(
        kinds(src),
        vec![
            Package,
            ident("main"),
            Semi,
            Func,
            ident("main"),
            LParen,
            RParen,
            LBrace,
            ident("x"),
            Inc,
            Semi,
            Return,
            Semi,
            RBrace,
            Semi,
            Eof,
        ]
    );
}

#[test]
fn no_semicolon_after_operator() {
    assert_eq!(
        kinds("a +\nb"),
        vec![ident("a"), Plus, ident("b"), Semi, Eof]
    );
}

#[test]
fn semicolon_at_eof_without_newline() {
    assert_eq!(kinds("x"), vec![ident("x"), Semi, Eof]);
}

#[test]
fn comments() {
    assert_eq!(
        kinds("x // trailing\ny /* inline */ z /* multi\nline */ w"),
        vec![ident("x"), Semi, ident("y"), ident("z"), Semi, ident("w"), Semi, Eof]
    );
}

#[test]
fn literals() {
    assert_eq!(
        kinds(r#"42 0x2A 0o52 052 0b101010 1_000 "a\n" `raw\n` 'x' '\n'"#),
        vec![
            Int(42),
            Int(42),
            Int(42),
            Int(42),
            Int(42),
            Int(1000),
            Str("a\n".to_string()),
            Str("raw\\n".to_string()),
            Char('x' as i64),
            Char('\n' as i64),
            Semi,
            Eof,
        ]
    );
}

#[test]
fn longest_operator_match() {
    assert_eq!(
        kinds("a &^= b <<= c <- d := e ..."),
        vec![
            ident("a"),
            AmpCaretEq,
            ident("b"),
            ShlEq,
            ident("c"),
            Arrow,
            ident("d"),
            Define,
            ident("e"),
            Ellipsis,
            Eof,
        ]
    );
}

#[test]
fn keywords_are_recognised() {
    assert_eq!(
        kinds("go defer chan range"),
        vec![Go, Defer, Chan, Range, Eof]
    );
}

#[test]
fn spans_are_shifted_by_base() {
    let out = lex("var x", 100);
    assert_eq!(out.tokens[1].span.start, 104);
    assert_eq!(out.tokens[1].span.end, 105);
}

#[test]
fn unterminated_string_skips_line() {
    let out = lex("x := \"abc\ny", 0);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].message, "string literal not terminated");
    let kinds: Vec<_> = out.tokens.into_iter().map(|t| t.kind).collect();
    assert_eq!(&kinds[..3], &[ident("x"), Define, Error]);
    assert!(kinds.contains(&ident("y")));
}

#[test]
fn invalid_character() {
    let out = lex("a @ b", 0);
    assert_eq!(out.diagnostics.len(), 1);
    assert_eq!(out.diagnostics[0].message, "invalid character U+0040 '@'");
}

#[test]
fn unterminated_comment() {
    let out = lex("x /* never closed", 0);
    assert_eq!(out.diagnostics[0].message, "comment not terminated");
}

#[test]
fn float_literals_are_rejected() {
    let out = lex("1.5", 0);
    assert_eq!(
        out.diagnostics[0].message,
        "floating-point literals are not supported"
    );
}

#[test]
fn multi_char_rune() {
    let out = lex("'ab'", 0);
    assert_eq!(
        out.diagnostics[0].message,
        "more than one character in rune literal"
    );
}

#[test]
fn integer_parsing() {
    assert_eq!(parse_int("0"), Some(0));
    assert_eq!(parse_int("0x_ff"), Some(255));
    assert_eq!(parse_int("0B11"), Some(3));
    assert_eq!(parse_int("18446744073709551615"), Some(u64::MAX));
    assert_eq!(parse_int("18446744073709551616"), None);
    assert_eq!(parse_int("09"), None);
    assert_eq!(parse_int("1__0"), None);
    assert_eq!(parse_int("0x"), None);
    assert_eq!(parse_int("12abc"), None);
}
