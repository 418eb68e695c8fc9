use thicket_core::{Language, Point, Range, SYMBOL_END, SYMBOL_ERROR};
use thicket_langs::{json, script};

use crate::length::Length;
use crate::lexer::{InputEncoding, Lexer, SliceSource, Token};

/// Lexes with every token allowed, rendering `kind text` per token.
fn tokens(language: &Language, text: &str, ranges: &[Range]) -> Vec<String> {
    let mut source = SliceSource(text.as_bytes());
    let mut lexer = Lexer::new(&mut source, language, InputEncoding::Utf8, ranges);
    let mut position = Length::ZERO;
    let mut out = Vec::new();
    loop {
        let token = lexer.lex(position, &|_| true);
        let start = position + token.padding;
        let end = start + token.size;
        if token.symbol == SYMBOL_END {
            return out;
        }
        let name = match token.symbol {
            SYMBOL_ERROR => "ERROR",
            symbol => language.symbol_name(symbol),
        };
        out.push(format!("{name} {}", &text[start.bytes..end.bytes]));
        position = end;
    }
}

fn first_token(language: &Language, text: &str) -> Token {
    let mut source = SliceSource(text.as_bytes());
    let ranges = [Range::FULL];
    let mut lexer = Lexer::new(&mut source, language, InputEncoding::Utf8, &ranges);
    lexer.lex(Length::ZERO, &|_| true)
}

#[test]
fn tokens_and_padding() {
    let lexed = tokens(&script(), "x = 12.5 # note\n+ \"s\\\"\"", &[Range::FULL]);
    assert_eq!(
        lexed,
        [
            "identifier x",
            "= =",
            "number 12.5",
            "comment # note",
            "+ +",
            "string \"s\\\"\"",
        ]
    );
}

#[test]
fn keywords_win_ties_with_identifiers() {
    let lexed = tokens(&script(), "if iffy else", &[Range::FULL]);
    assert_eq!(lexed, ["if if", "identifier iffy", "else else"]);
}

#[test]
fn unlexable_run_becomes_one_error() {
    let lexed = tokens(&script(), "x @@ y", &[Range::FULL]);
    assert_eq!(lexed, ["identifier x", "ERROR @@", "identifier y"]);
}

#[test]
fn literal_values_in_json() {
    let lexed = tokens(&json(), "[true, -1.5e3, null]", &[Range::FULL]);
    assert_eq!(
        lexed,
        ["[ [", "true true", ", ,", "number -1.5e3", ", ,", "null null", "] ]"]
    );
}

#[test]
fn padding_and_points_span_lines() {
    let token = first_token(&script(), "\n\n  abc");
    assert_eq!(token.padding, Length::new(4, Point::new(2, 2)));
    assert_eq!(token.size, Length::new(3, Point::new(0, 3)));
}

#[test]
fn lookahead_covers_examined_bytes() {
    // `12.` is examined while looking for a fraction.
    let token = first_token(&script(), "12.x");
    assert_eq!(token.size.bytes, 2);
    assert!(token.lookahead_bytes >= 2);

    let token = first_token(&script(), "ab");
    assert!(token.lookahead_bytes >= 1);
}

#[test]
fn end_of_input_keeps_padding() {
    let token = first_token(&script(), "   ");
    assert_eq!(token.symbol, SYMBOL_END);
    assert_eq!(token.padding.bytes, 3);
    assert_eq!(token.size, Length::ZERO);
}

#[test]
fn accept_filter_restricts_tokens() {
    let language = script();
    let identifier = language.symbol_for_name("identifier", true).unwrap();
    let mut source = SliceSource(b"if");
    let ranges = [Range::FULL];
    let mut lexer = Lexer::new(&mut source, &language, InputEncoding::Utf8, &ranges);

    let token = lexer.lex(Length::ZERO, &|symbol| symbol == identifier);
    assert_eq!(token.symbol, identifier);
    assert_eq!(token.size.bytes, 2);
}

#[test]
fn included_ranges_skip_gaps() {
    let ranges = [
        Range::new(0, 4, Point::new(0, 0), Point::new(0, 4)),
        Range::new(8, 10, Point::new(0, 8), Point::new(0, 10)),
    ];
    let lexed = tokens(&script(), "x = @@@ 1;", &ranges);
    assert_eq!(lexed, ["identifier x", "= =", "number 1", "; ;"]);
}

#[test]
fn range_end_cuts_tokens() {
    let ranges = [Range::new(0, 3, Point::new(0, 0), Point::new(0, 3))];
    let lexed = tokens(&script(), "abcdef", &ranges);
    assert_eq!(lexed, ["identifier abc"]);
}

#[test]
fn utf16_widths() {
    let text: Vec<u8> = "é1"
        .encode_utf16()
        .flat_map(|unit| unit.to_le_bytes())
        .collect();
    let mut source = SliceSource(&text);
    let ranges = [Range::FULL];
    let language = script();
    let mut lexer = Lexer::new(&mut source, &language, InputEncoding::Utf16, &ranges);

    let error = lexer.lex(Length::ZERO, &|_| true);
    assert_eq!(error.symbol, SYMBOL_ERROR);
    assert_eq!(error.size, Length::new(2, Point::new(0, 2)));

    let number = lexer.lex(error.size, &|_| true);
    assert_eq!(language.symbol_name(number.symbol), "number");
    assert_eq!(number.size.bytes, 2);
}
