//! Byte length paired with its row/column extent.

use std::ops::{Add, Sub};

use thicket_core::Point;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Length {
    pub bytes: usize,
    pub extent: Point,
}

impl Length {
    pub const ZERO: Length = Length {
        bytes: 0,
        extent: Point::ZERO,
    };

    pub const fn new(bytes: usize, extent: Point) -> Self {
        Self { bytes, extent }
    }

    /// `self - other`, clamped at zero.
    pub fn saturating_sub(self, other: Length) -> Length {
        if self.bytes <= other.bytes {
            return Length::ZERO;
        }
        self - other
    }
}

impl Add for Length {
    type Output = Length;

    fn add(self, other: Length) -> Length {
        Length {
            bytes: self.bytes + other.bytes,
            extent: self.extent.advance(other.extent),
        }
    }
}

impl Sub for Length {
    type Output = Length;

    fn sub(self, other: Length) -> Length {
        Length {
            bytes: self.bytes.saturating_sub(other.bytes),
            extent: self.extent.extent_from(other.extent),
        }
    }
}
