//! Rectangles for block geometry.
//!
//! A [`Rect`] names a region of a plane: the full extent of a transform block,
//! the interior a block writes back, or a noise-only region used for pattern
//! estimation.
//!
//! # Coordinate System
//!
//! - Origin (0, 0) is at the **top-left** corner of the (padded) plane
//! - X increases to the right, Y increases downward
//! - Left/top edges are inclusive, right/bottom edges are exclusive
//!
//! ```text
//! (0,0) ────────► X
//!   │   ┌───────────────┐
//!   │   │ overlap halo  │
//!   │   │   ┌───────┐   │
//!   │   │   │interior│  │
//!   │   │   └───────┘   │
//!   │   └───────────────┘
//!   ▼
//!   Y
//! ```
//!
//! # Usage
//!
//! ```rust
//! use fftnr_core::Rect;
//!
//! let block = Rect::new(0, 0, 128, 128);
//! let interior = Rect::new(16, 16, 96, 96);
//! assert!(block.contains_rect(&interior));
//! assert_eq!(interior.right(), 112);
//! ```

/// A rectangle defined by origin (x, y) and dimensions (width, height).
///
/// A rectangle with zero width or height is considered empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// X coordinate of the left edge (inclusive)
    pub x: usize,
    /// Y coordinate of the top edge (inclusive)
    pub y: usize,
    /// Width in samples
    pub width: usize,
    /// Height in samples
    pub height: usize,
}

impl Rect {
    /// Creates a new rectangle with the given origin and dimensions.
    #[inline]
    pub const fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle from origin (0, 0) with given dimensions.
    ///
    /// ```rust
    /// use fftnr_core::Rect;
    ///
    /// let rect = Rect::from_size(1920, 1080);
    /// assert_eq!((rect.x, rect.y), (0, 0));
    /// ```
    #[inline]
    pub const fn from_size(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Returns the X coordinate of the right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> usize {
        self.x + self.width
    }

    /// Returns the Y coordinate of the bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> usize {
        self.y + self.height
    }

    /// Returns `true` if the rectangle has zero area.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns `true` if this rectangle fully contains another.
    #[inline]
    pub const fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns `true` if the rectangle lies inside a `width` x `height` plane.
    #[inline]
    pub const fn fits_within(&self, width: usize, height: usize) -> bool {
        self.right() <= width && self.bottom() <= height
    }

    /// Returns this rectangle expressed relative to `origin`'s top-left corner.
    ///
    /// # Panics
    ///
    /// Panics if `self` starts left of or above `origin`.
    #[inline]
    pub fn relative_to(&self, origin: &Rect) -> Rect {
        assert!(
            self.x >= origin.x && self.y >= origin.y,
            "rect {self:?} starts outside {origin:?}"
        );
        Rect::new(self.x - origin.x, self.y - origin.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edges() {
        let rect = Rect::new(10, 20, 100, 50);
        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 70);
        assert!(!rect.is_empty());
        assert!(Rect::new(0, 0, 0, 10).is_empty());
    }

    #[test]
    fn test_contains_rect() {
        let outer = Rect::new(0, 0, 128, 128);
        assert!(outer.contains_rect(&Rect::new(16, 16, 96, 96)));
        assert!(!outer.contains_rect(&Rect::new(64, 64, 96, 96)));
        assert!(outer.fits_within(128, 128));
        assert!(!Rect::new(1, 0, 128, 128).fits_within(128, 128));
        assert!(outer.contains_rect(&Rect::new(127, 127, 1, 1)));
        assert!(!outer.contains_rect(&Rect::new(128, 0, 1, 1)));
    }

    #[test]
    fn test_relative_to() {
        let block = Rect::new(96, 192, 128, 128);
        let interior = Rect::new(112, 208, 96, 96);
        assert_eq!(interior.relative_to(&block), Rect::new(16, 16, 96, 96));
    }

    #[test]
    #[should_panic]
    fn test_relative_to_outside_panics() {
        Rect::new(0, 0, 4, 4).relative_to(&Rect::new(8, 8, 4, 4));
    }
}
