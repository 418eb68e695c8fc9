use thicket_langs::script;

use crate::{Query, QueryError, QueryErrorKind};

fn compile_error(source: &str) -> QueryError {
    Query::new(&script(), source)
        .err()
        .unwrap_or_else(|| panic!("expected {source:?} to fail"))
}

#[test]
fn display_uses_one_based_positions() {
    let error = compile_error("(assignment\n  (nope))");

    assert_eq!(error.kind, QueryErrorKind::NodeType);
    assert_eq!((error.offset, error.row, error.column), (15, 1, 3));
    assert_eq!(
        error.to_string(),
        "invalid node type at 2:4: `nope` is not a node kind of script"
    );
}

#[test]
fn render_with_path() {
    let source = "(assignment (nope))";
    let error = compile_error(source);

    let res = error.printer(source).path("q.scm").render();

    insta::assert_snapshot!(res, @r"
    error: invalid node type
     --> q.scm:1:14
      |
    1 | (assignment (nope))
      |              ^^^^ `nope` is not a node kind of script
    ");
}

#[test]
fn render_syntax_error_without_path() {
    let source = "(a ())";
    let error = compile_error(source);

    let res = error.printer(source).render();

    insta::assert_snapshot!(res, @r"
    error: syntax error
      |
    1 | (a ())
      |     ^ empty pattern `()`
    ");
}
