use super::cst::SyntaxKind::{self, *};
use super::lexer::{lex, token_text, unescape};

fn kinds(source: &str) -> Vec<(SyntaxKind, &str)> {
    lex(source)
        .iter()
        .filter(|t| !t.kind.is_trivia())
        .map(|t| (t.kind, token_text(source, t)))
        .collect()
}

#[test]
fn punctuation_and_names() {
    assert_eq!(
        kinds("(assignment left: (_) @l !right)*"),
        [
            (ParenOpen, "("),
            (Id, "assignment"),
            (Id, "left"),
            (Colon, ":"),
            (ParenOpen, "("),
            (Underscore, "_"),
            (ParenClose, ")"),
            (CaptureName, "@l"),
            (Negation, "!"),
            (Id, "right"),
            (ParenClose, ")"),
            (Star, "*"),
        ]
    );
}

#[test]
fn keywords_and_predicates() {
    assert_eq!(
        kinds("(ERROR) (MISSING identifier) (#eq? @a b)"),
        [
            (ParenOpen, "("),
            (KwError, "ERROR"),
            (ParenClose, ")"),
            (ParenOpen, "("),
            (KwMissing, "MISSING"),
            (Id, "identifier"),
            (ParenClose, ")"),
            (ParenOpen, "("),
            (PredicateName, "#eq?"),
            (CaptureName, "@a"),
            (Id, "b"),
            (ParenClose, ")"),
        ]
    );
}

#[test]
fn string_literals_are_split() {
    assert_eq!(
        kinds(r#""a\"b" """#),
        [
            (DoubleQuote, "\""),
            (StrVal, r#"a\"b"#),
            (DoubleQuote, "\""),
            (DoubleQuote, "\""),
            (DoubleQuote, "\""),
        ]
    );
}

#[test]
fn comments_are_trivia() {
    let source = "; leading\n(a) ; trailing";
    let all: Vec<SyntaxKind> = lex(source).iter().map(|t| t.kind).collect();
    assert_eq!(
        all,
        [LineComment, Newline, ParenOpen, Id, ParenClose, Whitespace, LineComment]
    );
}

#[test]
fn unknown_characters_coalesce() {
    assert_eq!(kinds("(a) $%^ (b)")[3], (Garbage, "$%^"));
}

#[test]
fn unescape_sequences() {
    assert_eq!(unescape(r#"a\nb\t\\\"\0"#), "a\nb\t\\\"\0");
    assert_eq!(unescape(r"\q"), "q");
}
