use thicket_core::Colors;
use thicket_langs::script;
use thicket_runtime::Parser;

use crate::{PrintQueryTracer, Query, QueryCursor};

fn trace(source: &str, text: &str, match_limit: u32) -> Vec<String> {
    let language = script();
    let mut parser = Parser::new();
    parser.set_language(&language).unwrap();
    let tree = parser.parse(text, None).unwrap();
    let query = Query::new(&language, source).unwrap();

    let mut cursor = QueryCursor::with_tracer(PrintQueryTracer::new(Colors::OFF));
    cursor.set_match_limit(match_limit);
    cursor.exec(&query, tree.root_node());
    while cursor.next_match().is_some() {}
    cursor.tracer().lines().to_vec()
}

#[test]
fn states_start_advance_and_finish() {
    let lines = trace("(assignment left: (_) @l)", "a = 1;", u32::MAX);

    let res: Vec<&str> = lines.iter().map(|l| l.trim_start()).collect();
    insta::assert_snapshot!(res.join("\n"), @r"
    start    #0 pattern 0 at assignment 0..6
    advance  #1 pattern 0 step 0 on assignment 0..6
    advance  #2 pattern 0 step 1 on identifier 0..1
    finish   #2 pattern 0
    ");
}

#[test]
fn match_limit_abandons_states() {
    let lines = trace(
        "(source_file (assignment) @a (assignment) @b)",
        "a=1;b=2;c=3;",
        1,
    );

    assert!(lines.iter().any(|l| l.starts_with("  abandon  #")));
    assert!(!lines.iter().any(|l| l.starts_with("  finish")));
}

#[test]
fn anonymous_nodes_are_quoted() {
    let lines = trace(r#"(assignment "=" @eq)"#, "a = 1;", u32::MAX);

    assert!(lines.iter().any(|l| l == r#"  advance  #2 pattern 0 step 1 on "=" 2..3"#));
}
