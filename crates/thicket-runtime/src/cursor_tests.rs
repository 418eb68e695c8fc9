use thicket_core::Language;
use thicket_langs::{json, script};

use crate::{Parser, Tree, TreeCursor};

fn parse(language: &Language, text: &str) -> Tree {
    let mut parser = Parser::new();
    parser.set_language(language).unwrap();
    parser.parse(text, None).unwrap()
}

/// Pre-order walk rendered one node per line.
fn render(cursor: &mut TreeCursor<'_>) -> String {
    let mut out = String::new();
    loop {
        let node = cursor.node();
        let indent = "  ".repeat(cursor.depth());
        match cursor.field_name() {
            Some(field) => out.push_str(&format!("{indent}{field}: {}\n", node.kind())),
            None => out.push_str(&format!("{indent}{}\n", node.kind())),
        }
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return out;
            }
        }
    }
}

#[test]
fn preorder_walk() {
    let tree = parse(&script(), "a = 1;\nif a { f(); }");
    insta::assert_snapshot!(render(&mut tree.walk()), @r"
    source_file
      assignment
        left: identifier
        =
        right: number
        ;
      if_statement
        if
        condition: identifier
        consequence: block
          {
          expression_statement
            call_expression
              function: identifier
              arguments: argument_list
                (
                )
            ;
          }
    ");
}

#[test]
fn failed_moves_leave_cursor_in_place() {
    let tree = parse(&script(), "a = 1;");
    let mut cursor = tree.walk();

    assert!(!cursor.goto_parent());
    assert!(!cursor.goto_next_sibling());
    assert_eq!(cursor.node(), tree.root_node());

    assert!(cursor.goto_first_child());
    assert!(cursor.goto_first_child());
    let identifier = cursor.node();
    assert_eq!(identifier.kind(), "identifier");
    assert!(!cursor.goto_first_child());
    assert_eq!(cursor.node(), identifier);
    assert_eq!(cursor.depth(), 2);
}

#[test]
fn last_sibling_stays_put() {
    let tree = parse(&script(), "a = 1;");
    let mut cursor = tree.walk();
    cursor.goto_first_child();
    cursor.goto_first_child();
    while cursor.goto_next_sibling() {}

    assert_eq!(cursor.node().kind(), ";");
    assert!(!cursor.goto_next_sibling());
    assert_eq!(cursor.node().kind(), ";");
    assert!(cursor.goto_parent());
    assert_eq!(cursor.node().kind(), "assignment");
}

#[test]
fn first_child_for_byte() {
    let tree = parse(&script(), "a = 1;\nb = 2;\nc = 3;");
    let mut cursor = tree.walk();

    assert_eq!(cursor.goto_first_child_for_byte(8), Some(1));
    assert_eq!(cursor.node().start_byte(), 7);
    assert_eq!(cursor.goto_first_child_for_byte(11), Some(2));
    assert_eq!(cursor.node().kind(), "number");

    cursor.reset(tree.root_node());
    assert_eq!(cursor.goto_first_child_for_byte(100), None);
    assert_eq!(cursor.node(), tree.root_node());
}

#[test]
fn first_child_for_byte_in_balanced_list() {
    let items = vec!["1"; 100].join(",");
    let tree = parse(&json(), &format!("[{items}]"));
    let array = tree.root_node().child(0).unwrap();
    let mut cursor = array.walk();

    // `[` comes first, then values alternate with commas; value `i` starts at byte 1 + 2 * i.
    assert_eq!(cursor.goto_first_child_for_byte(1 + 2 * 57), Some(1 + 2 * 57));
    assert_eq!(cursor.node().start_byte(), 1 + 2 * 57);
    assert_eq!(cursor.node().kind(), "number");
}

#[test]
fn cursor_is_confined_to_its_node() {
    let tree = parse(&script(), "a = 1;\nb = 2;");
    let first = tree.root_node().child(0).unwrap();
    let mut cursor = first.walk();

    assert!(!cursor.goto_next_sibling());
    assert!(!cursor.goto_parent());
    assert_eq!(cursor.field_name(), None);
    assert!(cursor.goto_first_child());
    assert_eq!(cursor.field_name(), Some("left"));
    assert_eq!(cursor.depth(), 1);
}

#[test]
fn copied_cursor_moves_independently() {
    let tree = parse(&script(), "a = 1;");
    let mut cursor = tree.walk();
    cursor.goto_first_child();
    let mut copy = cursor.clone();

    assert!(copy.goto_first_child());
    assert_eq!(copy.node().kind(), "identifier");
    assert_eq!(cursor.node().kind(), "assignment");
}

#[test]
fn field_id_matches_name() {
    let tree = parse(&script(), "x = y;");
    let mut cursor = tree.walk();
    cursor.goto_first_child();
    cursor.goto_first_child();
    cursor.goto_next_sibling();
    assert_eq!(cursor.field_id(), None);
    cursor.goto_next_sibling();

    let right = tree.language().field_id_for_name("right");
    assert_eq!(cursor.field_id(), right);
    assert_eq!(cursor.field_name(), Some("right"));
}

#[test]
fn full_walk_visits_every_node() {
    let items = vec!["[1, {\"k\": null}]"; 200].join(",");
    let tree = parse(&json(), &format!("[{items}]"));
    let mut cursor = tree.walk();
    let mut count = 0;
    loop {
        count += 1;
        if cursor.goto_first_child() {
            continue;
        }
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                // Each item: array, [, 1, ",", object, {, pair, string, :, null, }, ]
                assert_eq!(count, 1 + 1 + 2 + 200 * 12 + 199);
                return;
            }
        }
    }
}
