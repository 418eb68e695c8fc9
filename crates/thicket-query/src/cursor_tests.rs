use indoc::indoc;
use thicket_core::{InputEdit, Language, Point};
use thicket_langs::script;
use thicket_runtime::{Parser, Tree};

use crate::{Query, QueryCursor, QueryMatch};

fn parse(language: &Language, text: &str) -> Tree {
    let mut parser = Parser::new();
    parser.set_language(language).unwrap();
    parser.parse(text, None).unwrap()
}

fn format_match(query: &Query, text: &str, m: &QueryMatch<'_>) -> String {
    let captures: Vec<String> = m
        .captures
        .iter()
        .map(|c| {
            let name = query.capture_name_for_id(c.index).unwrap();
            format!("@{name} {:?}", c.node.utf8_text(text.as_bytes()).unwrap())
        })
        .collect();
    format!("{}: {}", m.pattern_index, captures.join(" "))
}

fn matches_with(
    source: &str,
    text: &str,
    configure: impl FnOnce(&mut QueryCursor<'_, '_>),
) -> Vec<String> {
    let language = script();
    let tree = parse(&language, text);
    let query = Query::new(&language, source).unwrap();
    let mut cursor = QueryCursor::new();
    configure(&mut cursor);
    cursor.exec(&query, tree.root_node());
    cursor
        .matches()
        .map(|m| format_match(&query, text, &m))
        .collect()
}

fn matches(source: &str, text: &str) -> Vec<String> {
    matches_with(source, text, |_| {})
}

/// Capture stream as `@name text` lines.
fn captures(source: &str, text: &str) -> Vec<String> {
    let language = script();
    let tree = parse(&language, text);
    let query = Query::new(&language, source).unwrap();
    let mut cursor = QueryCursor::new();
    cursor.exec(&query, tree.root_node());
    cursor
        .captures()
        .map(|(m, i)| {
            let c = m.captures[i];
            let name = query.capture_name_for_id(c.index).unwrap();
            format!("@{name} {:?}", c.node.utf8_text(text.as_bytes()).unwrap())
        })
        .collect()
}

#[test]
fn one_match_per_assignment() {
    let res = matches("(assignment left: (_) @l right: (_) @r)", "a=1;a=2;");

    assert_eq!(res, [r#"0: @l "a" @r "1""#, r#"0: @l "a" @r "2""#]);
}

#[test]
fn capture_nodes_keep_their_positions() {
    let language = script();
    let tree = parse(&language, "a=1;a=2;");
    let query = Query::new(&language, "(assignment left: (_) @l right: (_) @r)").unwrap();
    let mut cursor = QueryCursor::new();
    cursor.exec(&query, tree.root_node());

    let ranges: Vec<Vec<(u32, std::ops::Range<usize>)>> = cursor
        .matches()
        .map(|m| m.captures.iter().map(|c| (c.index, c.node.byte_range())).collect())
        .collect();
    assert_eq!(ranges, [vec![(0, 0..1), (1, 2..3)], vec![(0, 4..5), (1, 6..7)]]);
}

#[test]
fn alternation_in_fields() {
    let res = matches(
        "(binary_expression left: [(identifier) @var (number) @num] right: [(identifier) @var (number) @num])",
        "x = a + 1;",
    );

    assert_eq!(res, [r#"0: @var "a" @num "1""#]);
}

#[test]
fn anonymous_nodes_and_fields() {
    let res = matches(r#"(binary_expression operator: "+" @op)"#, "x = a + b * c;");

    assert_eq!(res, [r#"0: @op "+""#]);
}

#[test]
fn repetition_is_greedy() {
    let res = matches("(block (assignment)* @stmts)", "{ a = 1; b = 2; }");

    assert_eq!(res, [r#"0: @stmts "a = 1;" @stmts "b = 2;""#]);
}

#[test]
fn empty_repetition_still_matches() {
    let res = matches("(block (assignment)* @stmts) @block", "{ f(); }");

    assert_eq!(res, [r#"0: @block "{ f(); }""#]);
}

#[test]
fn optional_child() {
    let text = "if a { b; } if c { d; } else { e; }";
    let res = matches(
        "(if_statement condition: (_) @cond alternative: (_)? @alt)",
        text,
    );

    assert_eq!(
        res,
        [r#"0: @cond "a""#, r#"0: @cond "c" @alt "{ e; }""#]
    );
}

#[test]
fn group_capture_reaches_past_missing_optional() {
    let res = matches("((comment)? (identifier)) @x", "a = b;");

    assert_eq!(res, [r#"0: @x "a""#, r#"0: @x "b""#]);
}

#[test]
fn group_field_reaches_past_missing_optional() {
    let res = matches("(assignment left: ((comment)? (identifier) @id))", "a = b;");

    assert_eq!(res, [r#"0: @id "a""#]);
}

#[test]
fn negated_field() {
    let res = matches(
        "(if_statement !alternative) @if",
        "if a { b; } if c { d; } else { e; }",
    );

    assert_eq!(res, [r#"0: @if "if a { b; }""#]);
}

#[test]
fn first_child_anchor() {
    let res = matches(
        "(block . (assignment) @first)",
        "{ a = 1; b = 2; c = 3; }",
    );

    assert_eq!(res, [r#"0: @first "a = 1;""#]);
}

#[test]
fn last_child_anchor() {
    let res = matches(
        "(block (assignment) @last .)",
        "{ a = 1; b = 2; c = 3; }",
    );

    assert_eq!(res, [r#"0: @last "c = 3;""#]);
}

#[test]
fn last_child_anchor_over_wide_list() {
    let args: Vec<String> = (0..2000).map(|i| i.to_string()).collect();
    let text = format!("f({}\n# trailing\n);", args.join(", "));
    let res = matches("(argument_list (number) @last .)", &text);

    assert_eq!(res, [r#"0: @last "1999""#]);
}

#[test]
fn last_child_anchor_from_inner_start() {
    let language = script();
    let text = "{ a = 1; b = 2; }";
    let tree = parse(&language, text);
    let query = Query::new(&language, "(block (assignment) @last .)").unwrap();
    let block = tree.root_node().child(0).unwrap();

    let mut cursor = QueryCursor::new();
    cursor.exec(&query, block);
    let res: Vec<String> = cursor
        .matches()
        .map(|m| format_match(&query, text, &m))
        .collect();
    assert_eq!(res, [r#"0: @last "b = 2;""#]);
}

#[test]
fn sibling_anchor() {
    let res = matches(
        "(block (assignment) @a . (assignment) @b)",
        "{ a = 1; b = 2; c = 3; }",
    );

    assert_eq!(
        res,
        [
            r#"0: @a "a = 1;" @b "b = 2;""#,
            r#"0: @a "b = 2;" @b "c = 3;""#,
        ]
    );
}

#[test]
fn anchors_skip_comments() {
    let text = indoc! {"
        {
          # leading
          a = 1;
          b = 2;
        }
    "};
    let res = matches("(block . (assignment) @first)", text);

    assert_eq!(res, [r#"0: @first "a = 1;""#]);
}

#[test]
fn unanchored_siblings_pair_up() {
    let res = matches(
        "(source_file (assignment) @a (assignment) @b)",
        "a=1;b=2;c=3;",
    );

    assert_eq!(
        res,
        [
            r#"0: @a "a=1;" @b "b=2;""#,
            r#"0: @a "a=1;" @b "c=3;""#,
            r#"0: @a "b=2;" @b "c=3;""#,
        ]
    );
}

#[test]
fn predicates_are_not_evaluated() {
    let res = matches(r#"((identifier) @id (#eq? @id "zzz"))"#, "a = b;");

    assert_eq!(res, [r#"0: @id "a""#, r#"0: @id "b""#]);
}

#[test]
fn matches_come_in_completion_order() {
    let res = matches(
        indoc! {"
            (assignment left: (_) @l right: (_) @r)
            (identifier) @id
        "},
        "a = b;",
    );

    assert_eq!(
        res,
        [
            r#"1: @id "a""#,
            r#"0: @l "a" @r "b""#,
            r#"1: @id "b""#,
        ]
    );
}

#[test]
fn captures_come_in_document_order() {
    let res = captures(
        indoc! {"
            (assignment left: (_) @l right: (_) @r)
            (identifier) @id
        "},
        "a = b;",
    );

    assert_eq!(res, [r#"@id "a""#, r#"@l "a""#, r#"@r "b""#, r#"@id "b""#]);
}

#[test]
fn captures_wait_for_earlier_matches() {
    let res = captures(
        indoc! {"
            (assignment left: (_) @l right: (_) @r)
            (number) @n
        "},
        "a = 1; b = 2;",
    );

    assert_eq!(
        res,
        [
            r#"@l "a""#,
            r#"@r "1""#,
            r#"@n "1""#,
            r#"@l "b""#,
            r#"@r "2""#,
            r#"@n "2""#,
        ]
    );
}

#[test]
fn capture_stream_has_the_same_captures_as_matches() {
    let source = indoc! {"
        (call_expression function: (identifier) @fn arguments: (argument_list (_)* @arg))
        (binary_expression left: (_) @lhs right: (_) @rhs) @bin
        (identifier) @id
    "};
    let text = "x = f(a + 1, g(b), 3); y = x * 2;";
    let language = script();
    let tree = parse(&language, text);
    let query = Query::new(&language, source).unwrap();
    let mut cursor = QueryCursor::new();

    cursor.exec(&query, tree.root_node());
    let mut from_matches: Vec<(u32, usize, usize)> = cursor
        .matches()
        .flat_map(|m| {
            m.captures
                .iter()
                .map(|c| (c.index, c.node.start_byte(), c.node.end_byte()))
                .collect::<Vec<_>>()
        })
        .collect();

    cursor.exec(&query, tree.root_node());
    let stream: Vec<(u32, usize, usize)> = cursor
        .captures()
        .map(|(m, i)| {
            let c = m.captures[i];
            (c.index, c.node.start_byte(), c.node.end_byte())
        })
        .collect();

    let positions: Vec<(usize, std::cmp::Reverse<usize>)> = stream
        .iter()
        .map(|&(_, start, end)| (start, std::cmp::Reverse(end)))
        .collect();
    assert!(positions.is_sorted());

    let mut from_stream = stream.clone();
    from_matches.sort();
    from_stream.sort();
    assert_eq!(from_matches, from_stream);
}

/// Matches and the capture stream, as pattern indices and capture ranges.
fn query_results(query: &Query, tree: &Tree) -> (Vec<String>, Vec<String>) {
    let mut cursor = QueryCursor::new();
    cursor.exec(query, tree.root_node());
    let matches = cursor
        .matches()
        .map(|m| {
            let spans: Vec<String> = m
                .captures
                .iter()
                .map(|c| format!("{}@{:?}", c.index, c.node.byte_range()))
                .collect();
            format!("{} {}", m.pattern_index, spans.join(" "))
        })
        .collect();

    cursor.exec(query, tree.root_node());
    let captures = cursor
        .captures()
        .map(|(m, i)| format!("{}@{:?}", m.captures[i].index, m.captures[i].node.byte_range()))
        .collect();
    (matches, captures)
}

#[test]
fn copied_tree_gives_the_same_results() {
    let language = script();
    let text = "x = f(a + 1, g(b));\nif x { y = x * 2; }";
    let tree = parse(&language, text);
    let query = Query::new(
        &language,
        "(call_expression function: (identifier) @fn) (binary_expression) @bin (identifier) @id",
    )
    .unwrap();
    let before = query_results(&query, &tree);
    assert!(!before.0.is_empty());

    let mut copy = tree.clone();
    assert_eq!(query_results(&query, &copy), before);

    let edit = InputEdit::for_replacement(text.as_bytes(), 0, 0, b"z = h(1);\n");
    copy.edit(&edit);
    let new_text = edit.apply(text.as_bytes(), b"z = h(1);\n");
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();
    let reparsed = parser.parse(&new_text, Some(&copy)).unwrap();

    assert_ne!(query_results(&query, &reparsed), before);
    assert_eq!(query_results(&query, &tree), before);
    assert!(!tree.root_node().has_changes());
}

#[test]
fn removed_match_stops_reporting_captures() {
    let language = script();
    let text = "a=1;b=2;";
    let tree = parse(&language, text);
    let query = Query::new(&language, "(assignment left: (_) @l right: (_) @r)").unwrap();
    let mut cursor = QueryCursor::new();
    cursor.exec(&query, tree.root_node());

    let (first, index) = cursor.next_capture().unwrap();
    assert_eq!(first.captures[index].node.byte_range(), 0..1);
    cursor.remove_match(first.id);

    let rest: Vec<std::ops::Range<usize>> = cursor
        .captures()
        .map(|(m, i)| m.captures[i].node.byte_range())
        .collect();
    assert_eq!(rest, [4..5, 6..7]);
}

#[test]
fn match_ids_are_unique() {
    let language = script();
    let tree = parse(&language, "a=1;b=2;c=3;");
    let query = Query::new(&language, "(assignment) @a (number) @n").unwrap();
    let mut cursor = QueryCursor::new();
    cursor.exec(&query, tree.root_node());

    let mut ids: Vec<u32> = cursor.matches().map(|m| m.id).collect();
    assert_eq!(ids.len(), 6);
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 6);
}

#[test]
fn disabled_pattern_never_matches() {
    let language = script();
    let text = "a = 1;";
    let tree = parse(&language, text);
    let mut query = Query::new(&language, "(identifier) @id (number) @n").unwrap();
    query.disable_pattern(0);
    let mut cursor = QueryCursor::new();
    cursor.exec(&query, tree.root_node());

    let res: Vec<String> = cursor
        .matches()
        .map(|m| format_match(&query, text, &m))
        .collect();
    assert_eq!(res, [r#"1: @n "1""#]);
}

#[test]
fn disabled_capture_is_dropped_from_matches() {
    let language = script();
    let text = "a = 1;";
    let tree = parse(&language, text);
    let mut query = Query::new(&language, "(assignment left: (_) @l right: (_) @r)").unwrap();
    query.disable_capture("l");
    let mut cursor = QueryCursor::new();
    cursor.exec(&query, tree.root_node());

    let res: Vec<String> = cursor
        .matches()
        .map(|m| format_match(&query, text, &m))
        .collect();
    assert_eq!(res, [r#"0: @r "1""#]);
}

#[test]
fn byte_range_limits_where_matches_start() {
    let res = matches_with(
        "(assignment) @a",
        "a = 1;\nb = 2;\nc = 3;",
        |cursor| cursor.set_byte_range(7..13).unwrap(),
    );

    assert_eq!(res, [r#"0: @a "b = 2;""#]);
}

#[test]
fn point_range_limits_where_matches_start() {
    let res = matches_with(
        "(assignment) @a",
        "a = 1;\nb = 2;\nc = 3;",
        |cursor| {
            cursor
                .set_point_range(Point::new(2, 0)..Point::new(2, 6))
                .unwrap()
        },
    );

    assert_eq!(res, [r#"0: @a "c = 3;""#]);
}

#[test]
fn reversed_ranges_are_rejected() {
    let mut cursor = QueryCursor::new();
    let (start, end) = (5, 2);

    assert!(cursor.set_byte_range(start..end).is_err());
    assert!(
        cursor
            .set_point_range(Point::new(1, 0)..Point::new(0, 4))
            .is_err()
    );
}

#[test]
fn max_start_depth() {
    let res = matches_with("(assignment) @a", "{ a = 1; } b = 2;", |cursor| {
        cursor.set_max_start_depth(Some(1))
    });

    assert_eq!(res, [r#"0: @a "b = 2;""#]);
}

#[test]
fn match_limit_drops_states() {
    let language = script();
    let tree = parse(&language, "a=1;b=2;c=3;");
    let query = Query::new(&language, "(source_file (assignment) @a (assignment) @b)").unwrap();
    let mut cursor = QueryCursor::new();
    assert_eq!(cursor.match_limit(), u32::MAX);

    cursor.exec(&query, tree.root_node());
    assert_eq!(cursor.matches().count(), 3);
    assert!(!cursor.did_exceed_match_limit());

    cursor.set_match_limit(1);
    cursor.exec(&query, tree.root_node());
    assert!(cursor.matches().count() < 3);
    assert!(cursor.did_exceed_match_limit());
}

#[test]
fn exec_starts_over() {
    let language = script();
    let tree = parse(&language, "a=1;b=2;");
    let query = Query::new(&language, "(assignment) @a").unwrap();
    let mut cursor = QueryCursor::new();

    cursor.exec(&query, tree.root_node());
    assert!(cursor.next_match().is_some());

    cursor.exec(&query, tree.root_node());
    assert_eq!(cursor.matches().count(), 2);
}

#[test]
fn exec_on_a_subtree() {
    let language = script();
    let text = "a = 1; { b = 2; }";
    let tree = parse(&language, text);
    let query = Query::new(&language, "(assignment left: (_) @l)").unwrap();
    let block = tree.root_node().child(1).unwrap();
    let mut cursor = QueryCursor::new();
    cursor.exec(&query, block);

    let res: Vec<String> = cursor
        .matches()
        .map(|m| format_match(&query, text, &m))
        .collect();
    assert_eq!(res, [r#"0: @l "b""#]);
}

#[test]
fn no_exec_no_matches() {
    let mut cursor = QueryCursor::new();

    assert!(cursor.next_match().is_none());
    assert!(cursor.next_capture().is_none());
}
