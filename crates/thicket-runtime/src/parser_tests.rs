use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indoc::indoc;
use thicket_core::{LANGUAGE_VERSION, Language, LanguageError, Point, Range};
use thicket_langs::{json, script, template};

use crate::subtree::Subtree;
use crate::{IncludedRangesError, Parser, Tree};

fn parse(language: &Language, text: &str) -> Tree {
    let mut parser = Parser::new();
    parser.set_language(language).unwrap();
    parser.parse(text, None).unwrap()
}

fn sexp(language: &Language, text: &str) -> String {
    parse(language, text).root_node().to_sexp()
}

fn subtree_depth(root: &Subtree) -> usize {
    let mut max = 0;
    let mut stack = vec![(root, 1)];
    while let Some((tree, depth)) = stack.pop() {
        max = max.max(depth);
        stack.extend(tree.children().iter().map(|c| (c, depth + 1)));
    }
    max
}

#[test]
fn two_assignments() {
    insta::assert_snapshot!(sexp(&script(), "a=1;a=2;"), @"(source_file (assignment left: (identifier) right: (number)) (assignment left: (identifier) right: (number)))");
}

#[test]
fn operator_precedence() {
    insta::assert_snapshot!(sexp(&script(), "x = 1 + 2 * 3;"), @"(source_file (assignment left: (identifier) right: (binary_expression left: (number) right: (binary_expression left: (number) right: (number)))))");
}

#[test]
fn left_associative_operators() {
    insta::assert_snapshot!(sexp(&script(), "x = 1 - 2 - 3;"), @"(source_file (assignment left: (identifier) right: (binary_expression left: (binary_expression left: (number) right: (number)) right: (number))))");
}

#[test]
fn statements_with_comment() {
    let text = indoc! {r#"
        if x { y = 1; } else { f(2, "s"); }
        # done
    "#};
    insta::assert_snapshot!(sexp(&script(), text), @r#"(source_file (if_statement condition: (identifier) consequence: (block (assignment left: (identifier) right: (number))) alternative: (block (expression_statement (call_expression function: (identifier) arguments: (argument_list (number) (string)))))) (comment))"#);
}

#[test]
fn keyword_prefix_is_identifier() {
    insta::assert_snapshot!(sexp(&script(), "iffy = elsewhere;"), @"(source_file (assignment left: (identifier) right: (identifier)))");
}

#[test]
fn json_document() {
    insta::assert_snapshot!(sexp(&json(), r#"{"a": [1, true, null], "b": {}}"#), @"(document (object (pair key: (string) value: (array (number) (true) (null))) (pair key: (string) value: (object))))");
}

#[test]
fn template_falls_back_to_state_tokens() {
    let tree = parse(&template(), "hi <% code %> there");
    insta::assert_snapshot!(tree.root_node().to_sexp(), @"(template (content) (directive code: (code)) (content))");

    let directive = tree.root_node().child(1).unwrap();
    let code = directive.child_by_field_name("code").unwrap();
    assert_eq!(code.byte_range(), 5..11);
}

#[test]
fn empty_document() {
    let tree = parse(&script(), "");
    insta::assert_snapshot!(tree.root_node().to_sexp(), @"(source_file)");
    assert!(!tree.root_node().has_error());
    assert_eq!(tree.root_node().byte_range(), 0..0);
}

#[test]
fn whitespace_only_document() {
    let tree = parse(&script(), "  \n\n  ");
    insta::assert_snapshot!(tree.root_node().to_sexp(), @"(source_file)");
    assert_eq!(tree.root_node().end_position(), Point::new(2, 2));
}

#[test]
fn missing_expression_is_inserted() {
    let tree = parse(&script(), "a = ;");
    insta::assert_snapshot!(tree.root_node().to_sexp(), @"(source_file (assignment left: (identifier) right: (MISSING identifier)))");
    assert!(tree.root_node().has_error());

    let missing = tree.root_node().child(0).unwrap().child(2).unwrap();
    assert!(missing.is_missing());
    assert_eq!(missing.byte_range(), 3..3);
}

#[test]
fn missing_semicolon_at_end() {
    insta::assert_snapshot!(sexp(&script(), "a = 1"), @r#"(source_file (assignment left: (identifier) right: (number) (MISSING ";")))"#);
}

#[test]
fn unexpected_token_is_skipped() {
    let tree = parse(&script(), "a = = 1;");
    insta::assert_snapshot!(tree.root_node().to_sexp(), @"(source_file (assignment left: (identifier) (ERROR) right: (number)))");

    let error = tree.root_node().child(0).unwrap().child(2).unwrap();
    assert!(error.is_error());
    assert!(error.is_extra());
    assert_eq!(error.byte_range(), 4..5);
}

#[test]
fn unlexable_text_becomes_error_leaf() {
    let tree = parse(&script(), "a @@ = 1;");
    insta::assert_snapshot!(tree.root_node().to_sexp(), @"(source_file (assignment left: (identifier) (ERROR) right: (number)))");

    let error = tree.root_node().child(0).unwrap().child(1).unwrap();
    assert!(error.is_error());
    assert_eq!(error.child_count(), 0);
    assert_eq!(error.byte_range(), 2..4);
}

#[test]
fn stray_token_at_statement_start() {
    insta::assert_snapshot!(sexp(&script(), ")"), @"(source_file (ERROR))");
}

#[test]
fn unfinished_input_is_wrapped_in_error() {
    insta::assert_snapshot!(sexp(&script(), "a = (1"), @"(source_file (ERROR (identifier) (number)))");
}

#[test]
fn error_free_tree_has_no_error() {
    let tree = parse(&script(), "a = f(1, 2);");
    assert!(!tree.root_node().has_error());
}

#[test]
fn incompatible_version_is_rejected() {
    let mut tables = script().tables().clone();
    tables.version = LANGUAGE_VERSION + 1;
    let future = Language::new(tables).unwrap();

    let mut parser = Parser::new();
    parser.set_language(&json()).unwrap();
    let err = parser.set_language(&future).unwrap_err();

    assert!(matches!(err, LanguageError::Version { version } if version == LANGUAGE_VERSION + 1));
    assert_eq!(parser.language().unwrap().name(), "json");
}

#[test]
fn parse_without_language_is_none() {
    let mut parser = Parser::new();
    assert!(parser.parse("a = 1;", None).is_none());
}

#[test]
fn unsorted_included_ranges_are_rejected() {
    let mut parser = Parser::new();
    parser.set_language(&script()).unwrap();
    let ranges = [
        Range::new(4, 8, Point::new(0, 4), Point::new(0, 8)),
        Range::new(0, 4, Point::new(0, 0), Point::new(0, 4)),
    ];

    assert_eq!(
        parser.set_included_ranges(&ranges),
        Err(IncludedRangesError { index: 1 })
    );
    assert_eq!(parser.included_ranges(), vec![Range::FULL]);

    let tree = parser.parse("a=1;a=2;", None).unwrap();
    assert_eq!(tree.root_node().named_child_count(), 2);
    assert_eq!(tree.root_node().end_byte(), 8);
}

#[test]
fn failed_update_keeps_previous_ranges() {
    let mut parser = Parser::new();
    let good = [Range::new(0, 6, Point::new(0, 0), Point::new(0, 6))];
    let overlapping = [
        Range::new(0, 6, Point::new(0, 0), Point::new(0, 6)),
        Range::new(5, 9, Point::new(0, 5), Point::new(0, 9)),
    ];
    parser.set_included_ranges(&good).unwrap();

    assert!(parser.set_included_ranges(&overlapping).is_err());
    assert_eq!(parser.included_ranges(), good.to_vec());
}

#[test]
fn included_ranges_skip_foreign_text() {
    let mut parser = Parser::new();
    parser.set_language(&script()).unwrap();
    parser
        .set_included_ranges(&[
            Range::new(0, 6, Point::new(0, 0), Point::new(0, 6)),
            Range::new(15, 21, Point::new(0, 15), Point::new(0, 21)),
        ])
        .unwrap();

    let tree = parser.parse("x = 1; GARBAGE y = 2;", None).unwrap();
    insta::assert_snapshot!(tree.root_node().to_sexp(), @"(source_file (assignment left: (identifier) right: (number)) (assignment left: (identifier) right: (number)))");
    assert_eq!(tree.root_node().child(1).unwrap().start_byte(), 15);
    assert_eq!(tree.included_ranges().len(), 2);
}

#[test]
fn cancelled_parse_resumes() {
    let flag = Arc::new(AtomicBool::new(true));
    let mut parser = Parser::new();
    parser.set_language(&script()).unwrap();
    parser.set_cancellation_flag(Some(flag.clone()));

    let text = "a = 1;\nb = a + 2;\n";
    assert!(parser.parse(text, None).is_none());
    assert!(parser.parse(text, None).is_none());

    flag.store(false, Ordering::Relaxed);
    let tree = parser.parse(text, None).unwrap();
    assert_eq!(tree.root_node().to_sexp(), sexp(&script(), text));
}

#[test]
fn reset_discards_interrupted_parse() {
    let flag = Arc::new(AtomicBool::new(true));
    let mut parser = Parser::new();
    parser.set_language(&script()).unwrap();
    parser.set_cancellation_flag(Some(flag.clone()));
    assert!(parser.parse("a = 1;", None).is_none());

    flag.store(false, Ordering::Relaxed);
    parser.reset();
    let tree = parser.parse("b = 2;", None).unwrap();
    assert_eq!(tree.root_node().end_byte(), 6);
    assert!(parser.cancellation_flag().is_some());
}

#[test]
fn timeout_accessors() {
    let mut parser = Parser::new();
    assert_eq!(parser.timeout_micros(), 0);
    parser.set_timeout_micros(1_000_000);
    assert_eq!(parser.timeout_micros(), 1_000_000);

    parser.set_language(&script()).unwrap();
    assert!(parser.parse("a = 1;", None).is_some());
}

#[test]
fn chunked_reader_matches_slice_parse() {
    let text = "alpha = beta(1, 2);\nif alpha { gamma = \"x\"; }\n".as_bytes();
    let mut parser = Parser::new();
    parser.set_language(&script()).unwrap();

    let mut read = |byte: usize, _: Point| {
        let start = byte.min(text.len());
        &text[start..(start + 3).min(text.len())]
    };
    let tree = parser.parse_with(&mut read, None).unwrap();

    assert_eq!(
        tree.root_node().to_sexp(),
        sexp(&script(), std::str::from_utf8(text).unwrap())
    );
}

#[test]
fn utf16_offsets_count_bytes() {
    let text: Vec<u16> = "a = \"é\";".encode_utf16().collect();
    let mut parser = Parser::new();
    parser.set_language(&script()).unwrap();
    let tree = parser.parse_utf16(&text, None).unwrap();

    insta::assert_snapshot!(tree.root_node().to_sexp(), @"(source_file (assignment left: (identifier) right: (string)))");
    let string = tree.root_node().child(0).unwrap().child(2).unwrap();
    assert_eq!(string.byte_range(), 8..14);
    assert_eq!(string.start_position(), Point::new(0, 8));
}

#[test]
fn long_lists_are_balanced() {
    let items = vec!["0"; 2000].join(",");
    let tree = parse(&json(), &format!("[{items}]"));

    let array = tree.root_node().child(0).unwrap();
    assert_eq!(array.kind(), "array");
    assert_eq!(array.named_child_count(), 2000);
    assert_eq!(array.named_child(1999).unwrap().start_byte(), 1 + 2 * 1999);
    assert!(subtree_depth(tree.root()) < 40);
}

#[test]
fn long_statement_lists_are_balanced() {
    let text = "a = 1;\n".repeat(1000);
    let tree = parse(&script(), &text);

    assert_eq!(tree.root_node().named_child_count(), 1000);
    assert!(subtree_depth(tree.root()) < 40);
}
