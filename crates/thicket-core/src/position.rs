//! Document coordinates: points, ranges and edit descriptions.
//!
//! Byte offsets and columns are measured in bytes of the input encoding,
//! so a UTF-16 document has two bytes per code unit.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Zero-based row/column position.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Point {
    pub row: usize,
    pub column: usize,
}

impl Point {
    pub const ZERO: Point = Point { row: 0, column: 0 };
    pub const MAX: Point = Point {
        row: usize::MAX,
        column: usize::MAX,
    };

    pub const fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Appends `extent` to this point.
    ///
    /// An extent spanning rows replaces the column; a single-row extent adds to it.
    pub fn advance(self, extent: Point) -> Point {
        if extent.row > 0 {
            Point::new(self.row + extent.row, extent.column)
        } else {
            Point::new(self.row, self.column + extent.column)
        }
    }

    /// Extent from `origin` to `self`. Inverse of [`Point::advance`].
    pub fn extent_from(self, origin: Point) -> Point {
        if self.row > origin.row {
            Point::new(self.row - origin.row, self.column)
        } else {
            Point::new(0, self.column.saturating_sub(origin.column))
        }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.row, self.column)
    }
}

/// Contiguous document span in both bytes and points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_point: Point,
    pub end_point: Point,
}

impl Range {
    /// The whole-document range used when no included ranges are configured.
    pub const FULL: Range = Range {
        start_byte: 0,
        end_byte: usize::MAX,
        start_point: Point::ZERO,
        end_point: Point::MAX,
    };

    pub const fn new(start_byte: usize, end_byte: usize, start_point: Point, end_point: Point) -> Self {
        Self {
            start_byte,
            end_byte,
            start_point,
            end_point,
        }
    }

    pub fn len(&self) -> usize {
        self.end_byte.saturating_sub(self.start_byte)
    }

    pub fn is_empty(&self) -> bool {
        self.end_byte <= self.start_byte
    }

    pub fn byte_range(&self) -> std::ops::Range<usize> {
        self.start_byte..self.end_byte
    }

    /// True when the byte spans share at least one byte, or touch at an empty range.
    pub fn intersects(&self, other: &Range) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
            || (self.is_empty() || other.is_empty())
                && self.start_byte <= other.end_byte
                && other.start_byte <= self.end_byte
    }

    /// Smallest range covering both.
    pub fn cover(&self, other: &Range) -> Range {
        let (start_byte, start_point) = if other.start_byte < self.start_byte {
            (other.start_byte, other.start_point)
        } else {
            (self.start_byte, self.start_point)
        };
        let (end_byte, end_point) = if other.end_byte > self.end_byte {
            (other.end_byte, other.end_point)
        } else {
            (self.end_byte, self.end_point)
        };
        Range::new(start_byte, end_byte, start_point, end_point)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}-{}] {}..{}",
            self.start_point, self.end_point, self.start_byte, self.end_byte
        )
    }
}

/// One contiguous replacement of `[start_byte, old_end_byte)` by text ending at `new_end_byte`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputEdit {
    pub start_byte: usize,
    pub old_end_byte: usize,
    pub new_end_byte: usize,
    pub start_position: Point,
    pub old_end_position: Point,
    pub new_end_position: Point,
}

impl InputEdit {
    /// Describes replacing `old[start..old_end]` with `replacement`, deriving the points from
    /// the text before the change.
    pub fn for_replacement(old: &[u8], start: usize, old_end: usize, replacement: &[u8]) -> Self {
        let start_position = point_at(old, start);
        let old_end_position = start_position.advance(extent_of(&old[start..old_end]));
        let new_end_position = start_position.advance(extent_of(replacement));
        Self {
            start_byte: start,
            old_end_byte: old_end,
            new_end_byte: start + replacement.len(),
            start_position,
            old_end_position,
            new_end_position,
        }
    }

    /// Applies the replacement to `text`, returning the new document.
    pub fn apply(&self, text: &[u8], replacement: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(text.len() + replacement.len());
        out.extend_from_slice(&text[..self.start_byte]);
        out.extend_from_slice(replacement);
        out.extend_from_slice(&text[self.old_end_byte..]);
        out
    }
}

/// Row/column of `byte` within UTF-8 `text`.
pub fn point_at(text: &[u8], byte: usize) -> Point {
    extent_of(&text[..byte.min(text.len())])
}

/// Row count and trailing column of `text`.
pub fn extent_of(text: &[u8]) -> Point {
    let mut point = Point::ZERO;
    for &b in text {
        if b == b'\n' {
            point.row += 1;
            point.column = 0;
        } else {
            point.column += 1;
        }
    }
    point
}
