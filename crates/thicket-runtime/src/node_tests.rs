use indoc::indoc;
use thicket_core::{InputEdit, Language, Point};
use thicket_langs::{json, script};

use crate::{Parser, Tree};

fn parse(language: &Language, text: &str) -> Tree {
    let mut parser = Parser::new();
    parser.set_language(language).unwrap();
    parser.parse(text, None).unwrap()
}

const PROGRAM: &str = indoc! {"
    a = 1;
    b = f(a, 2);
"};

#[test]
fn children_look_through_hidden_rules() {
    let tree = parse(&script(), PROGRAM);
    let root = tree.root_node();
    assert_eq!(root.kind(), "source_file");
    assert_eq!(root.child_count(), 2);

    let assignment = root.child(0).unwrap();
    let kinds: Vec<&str> = (0..assignment.child_count())
        .map(|i| assignment.child(i).unwrap().kind())
        .collect();
    assert_eq!(kinds, ["identifier", "=", "number", ";"]);
    assert_eq!(assignment.named_child_count(), 2);
    assert_eq!(assignment.named_child(1).unwrap().kind(), "number");
    assert!(assignment.child(4).is_none());
}

#[test]
fn children_with_cursor() {
    let tree = parse(&script(), PROGRAM);
    let call = tree
        .root_node()
        .child(1)
        .unwrap()
        .child_by_field_name("right")
        .unwrap();
    let arguments = call.child_by_field_name("arguments").unwrap();

    let mut cursor = tree.walk();
    let all: Vec<&str> = arguments.children(&mut cursor).map(|n| n.kind()).collect();
    assert_eq!(all, ["(", "identifier", ",", "number", ")"]);

    let named: Vec<&str> = arguments
        .named_children(&mut cursor)
        .map(|n| n.kind())
        .collect();
    assert_eq!(named, ["identifier", "number"]);
}

#[test]
fn fields() {
    let tree = parse(&script(), PROGRAM);
    let language = tree.language();
    let assignment = tree.root_node().child(0).unwrap();

    assert_eq!(assignment.child_by_field_name("left").unwrap().kind(), "identifier");
    assert_eq!(assignment.child_by_field_name("right").unwrap().kind(), "number");
    assert!(assignment.child_by_field_name("condition").is_none());
    assert!(assignment.child_by_field_name("nonsense").is_none());

    assert_eq!(assignment.field_name_for_child(0), Some("left"));
    assert_eq!(assignment.field_name_for_child(1), None);
    assert_eq!(assignment.field_name_for_child(2), Some("right"));

    let right = language.field_id_for_name("right").unwrap();
    assert_eq!(
        assignment.child_by_field_id(right),
        assignment.child_by_field_name("right")
    );
    assert_eq!(assignment.children_by_field_id(right).count(), 1);
}

#[test]
fn repeated_field_children() {
    let tree = parse(&script(), "x = 1 + 2;");
    let binary = tree
        .root_node()
        .child(0)
        .unwrap()
        .child_by_field_name("right")
        .unwrap();
    let operator = tree.language().field_id_for_name("operator").unwrap();

    let operators: Vec<&str> = binary.children_by_field_id(operator).map(|n| n.kind()).collect();
    assert_eq!(operators, ["+"]);
}

#[test]
fn positions() {
    let tree = parse(&script(), PROGRAM);
    let second = tree.root_node().child(1).unwrap();

    assert_eq!(second.start_byte(), 7);
    assert_eq!(second.end_byte(), 19);
    assert_eq!(second.start_position(), Point::new(1, 0));
    assert_eq!(second.end_position(), Point::new(1, 12));
    assert_eq!(second.range().start_point, Point::new(1, 0));
    assert_eq!(second.utf8_text(PROGRAM.as_bytes()).unwrap(), "b = f(a, 2);");
}

#[test]
fn parent_and_siblings() {
    let tree = parse(&script(), PROGRAM);
    let root = tree.root_node();
    let assignment = root.child(0).unwrap();
    let identifier = assignment.child(0).unwrap();
    let number = assignment.child(2).unwrap();

    assert_eq!(number.parent(), Some(assignment));
    assert_eq!(assignment.parent(), Some(root));
    assert_eq!(root.parent(), None);

    assert_eq!(identifier.next_sibling().unwrap().kind(), "=");
    assert_eq!(identifier.next_named_sibling(), Some(number));
    assert_eq!(number.prev_named_sibling(), Some(identifier));
    assert_eq!(number.prev_sibling().unwrap().kind(), "=");
    assert_eq!(identifier.prev_sibling(), None);
    assert_eq!(assignment.next_sibling(), root.child(1));
    assert_eq!(root.child(1).unwrap().next_sibling(), None);
}

#[test]
fn parent_of_nested_argument() {
    let tree = parse(&script(), PROGRAM);
    let second = tree.root_node().child(1).unwrap();
    let a = second.descendant_for_byte_range(13, 14).unwrap();

    assert_eq!(a.kind(), "identifier");
    assert_eq!(a.parent().unwrap().kind(), "argument_list");
    assert_eq!(a.parent().unwrap().parent().unwrap().kind(), "call_expression");
}

#[test]
fn descendants_for_ranges() {
    let tree = parse(&script(), PROGRAM);
    let root = tree.root_node();

    assert_eq!(root.descendant_for_byte_range(4, 5).unwrap().kind(), "number");
    assert_eq!(root.descendant_for_byte_range(2, 3).unwrap().kind(), "=");
    assert_eq!(
        root.named_descendant_for_byte_range(2, 3).unwrap().kind(),
        "assignment"
    );
    assert_eq!(root.descendant_for_byte_range(0, 19).unwrap(), root);

    let call = root
        .descendant_for_point_range(Point::new(1, 4), Point::new(1, 11))
        .unwrap();
    assert_eq!(call.kind(), "call_expression");
    let paren = root
        .descendant_for_point_range(Point::new(1, 5), Point::new(1, 6))
        .unwrap();
    assert_eq!(paren.kind(), "(");
    assert_eq!(
        root.named_descendant_for_point_range(Point::new(1, 5), Point::new(1, 6))
            .unwrap()
            .kind(),
        "argument_list"
    );
}

#[test]
fn first_child_for_byte() {
    let tree = parse(&script(), PROGRAM);
    let root = tree.root_node();
    let assignment = root.child(0).unwrap();

    assert_eq!(root.first_child_for_byte(6), root.child(1));
    assert_eq!(assignment.first_child_for_byte(2).unwrap().kind(), "=");
    assert_eq!(
        assignment.first_named_child_for_byte(2).unwrap().kind(),
        "number"
    );
    assert_eq!(assignment.first_child_for_byte(6), None);
}

#[test]
fn subtree_sexp() {
    let tree = parse(&script(), PROGRAM);
    let call = tree.root_node().child(1).unwrap().child(2).unwrap();
    insta::assert_snapshot!(call.to_sexp(), @"(call_expression function: (identifier) arguments: (argument_list (identifier) (number)))");
}

#[test]
fn anonymous_node_sexp_is_empty() {
    let tree = parse(&script(), "a = 1;");
    let equals = tree.root_node().child(0).unwrap().child(1).unwrap();
    assert!(!equals.is_named());
    assert_eq!(equals.to_sexp(), "");
}

#[test]
fn node_identity() {
    let tree = parse(&json(), "[1, 2]");
    let root = tree.root_node();
    let first = root.child(0).unwrap().named_child(0).unwrap();
    let again = root.child(0).unwrap().named_child(0).unwrap();
    let second = root.child(0).unwrap().named_child(1).unwrap();

    assert_eq!(first, again);
    assert_eq!(first.id(), again.id());
    assert_ne!(first, second);
    assert_ne!(first.id(), second.id());
    assert_eq!(format!("{first:?}"), "{Node number (0, 1) - (0, 2)}");
}

#[test]
fn flags() {
    let tree = parse(&script(), "a = 1; # note\n");
    let root = tree.root_node();
    let comment = root.child(1).unwrap();

    assert_eq!(comment.kind(), "comment");
    assert!(comment.is_extra());
    assert!(comment.is_named());
    assert!(!comment.is_error());
    assert!(!comment.is_missing());
    assert!(!comment.has_changes());
    assert_eq!(root.child(0).unwrap().kind_id(), tree.language().symbol_for_name("assignment", true).unwrap());
}

#[test]
fn node_edit_shifts_detached_view() {
    let text = "a = 1;\nb = 2;";
    let tree = parse(&script(), text);
    let mut second = tree.root_node().child(1).unwrap();

    let edit = InputEdit::for_replacement(text.as_bytes(), 0, 0, b"zz = 0;\n");
    second.edit(&edit);

    assert_eq!(second.start_byte(), 15);
    assert_eq!(second.start_position(), Point::new(2, 0));
    // The tree itself is untouched.
    assert_eq!(tree.root_node().child(1).unwrap().start_byte(), 7);
}

#[test]
fn missing_token_at_sibling_boundary() {
    let tree = parse(&script(), "a = 1\nb = 2;");
    let root = tree.root_node();
    let first = root.child(0).unwrap();
    let missing = first.child(3).unwrap();
    assert!(missing.is_missing());
    assert_eq!(missing.byte_range(), 5..5);

    let parent = missing.parent().unwrap();
    assert_eq!(parent, first);
    assert_eq!(parent.byte_range(), 0..5);
    assert_eq!(parent.parent(), Some(root));

    let number = first.child(2).unwrap();
    assert_eq!(number.next_sibling(), Some(missing));
    assert_eq!(missing.prev_named_sibling(), Some(number));
    assert!(missing.next_sibling().is_none());
    assert_eq!(first.next_sibling().unwrap().start_byte(), 6);
}
