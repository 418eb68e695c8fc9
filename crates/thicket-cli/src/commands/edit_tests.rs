use thicket_core::Colors;
use thicket_langs::script;

use super::edit::apply;
use super::run_common::CliError;

#[test]
fn reports_changed_ranges_and_new_tree() {
    let out = apply(&script(), "a = 1;\nb = 2;\nc = 3;", &(11..12), "x + y", Colors::OFF).unwrap();

    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines[0], "edit 11..12 -> 11..16 [1:4-1:9]");
    assert_eq!(lines[1], "changed [1:4-1:9] 11..16");
    assert_eq!(lines[2], "");
    assert!(out.contains("right: (binary_expression [1:4-1:9]"), "{out}");
}

#[test]
fn token_body_edit_changes_nothing() {
    let out = apply(&script(), "x = \"abc\";", &(8..8), "d", Colors::OFF).unwrap();

    insta::assert_snapshot!(out, @r#"
    edit 8..8 -> 8..9 [0:8-0:9]
    no changed ranges

    (source_file [0:0-0:11]
      (assignment [0:0-0:11]
        left: (identifier "x") [0:0-0:1]
        right: (string "\"abcd\"") [0:4-0:10]))
    "#);
}

#[test]
fn out_of_bounds_edit_is_rejected() {
    let err = apply(&script(), "a = 1;", &(4..40), "2", Colors::OFF).unwrap_err();

    assert!(matches!(
        err,
        CliError::RangeOutOfBounds {
            start: 4,
            end: 40,
            len: 6
        }
    ));
    assert_eq!(err.to_string(), "range 4..40 is outside the source (6 bytes)");
}

#[test]
fn edit_inside_character_is_rejected() {
    let err = apply(&script(), "s = \"é\";", &(6..6), "x", Colors::OFF).unwrap_err();

    assert!(matches!(err, CliError::RangeNotCharBoundary { .. }));
}
