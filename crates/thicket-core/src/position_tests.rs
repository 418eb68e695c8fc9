use crate::{InputEdit, Point, Range, extent_of, point_at};

#[test]
fn advance_within_row_adds_columns() {
    let p = Point::new(2, 4).advance(Point::new(0, 3));
    assert_eq!(p, Point::new(2, 7));
}

#[test]
fn advance_across_rows_replaces_column() {
    let p = Point::new(2, 4).advance(Point::new(1, 3));
    assert_eq!(p, Point::new(3, 3));
}

#[test]
fn extent_from_inverts_advance() {
    let origin = Point::new(1, 5);
    for extent in [Point::new(0, 0), Point::new(0, 7), Point::new(3, 2)] {
        assert_eq!(origin.advance(extent).extent_from(origin), extent);
    }
}

#[test]
fn point_at_counts_rows_and_columns() {
    let text = b"a = 1;\nbb = 22;\n";
    assert_eq!(point_at(text, 0), Point::ZERO);
    assert_eq!(point_at(text, 7), Point::new(1, 0));
    assert_eq!(point_at(text, 10), Point::new(1, 3));
    assert_eq!(extent_of(text), Point::new(2, 0));
}

#[test]
fn replacement_edit_points() {
    let old = b"x = 1;\ny = 2;";
    let edit = InputEdit::for_replacement(old, 11, 12, b"22\n");

    assert_eq!(edit.start_byte, 11);
    assert_eq!(edit.old_end_byte, 12);
    assert_eq!(edit.new_end_byte, 14);
    assert_eq!(edit.start_position, Point::new(1, 4));
    assert_eq!(edit.old_end_position, Point::new(1, 5));
    assert_eq!(edit.new_end_position, Point::new(2, 0));
    assert_eq!(edit.apply(old, b"22\n"), b"x = 1;\ny = 22\n;");
}

#[test]
fn range_cover_and_intersection() {
    let a = Range::new(2, 5, Point::new(0, 2), Point::new(0, 5));
    let b = Range::new(5, 9, Point::new(0, 5), Point::new(1, 1));
    let empty = Range::new(5, 5, Point::new(0, 5), Point::new(0, 5));

    assert!(!a.intersects(&b));
    assert!(a.intersects(&empty));
    assert_eq!(a.cover(&b), Range::new(2, 9, Point::new(0, 2), Point::new(1, 1)));
    assert_eq!(a.len(), 3);
    assert!(empty.is_empty());
}

#[test]
fn display_formats() {
    let r = Range::new(0, 4, Point::new(0, 0), Point::new(1, 2));
    assert_eq!(r.to_string(), "[0:0-1:2] 0..4");
}
