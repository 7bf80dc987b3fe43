//! Padded float planes and borrowed views into them.
//!
//! A [`BlockBuffer`] is a single-channel `f32` plane whose rows are padded to a
//! multiple of [`VECTOR_LANES`] samples, so every row starts on a vector
//! boundary. It is used both for whole image planes (with overlap padding on
//! every side) and for one-block scratch areas.
//!
//! Sub-regions are exposed as [`PlaneView`] / [`PlaneViewMut`]: borrowed,
//! non-owning windows that share the parent's storage and pitch.
//!
//! # Memory Layout
//!
//! ```text
//! pitch = width rounded up to VECTOR_LANES
//! ┌──────────────── pitch ───────────────┐
//! │ row 0: [s0 s1 ... s(w-1)] [pad ...]  │
//! │ row 1: [s0 s1 ... s(w-1)] [pad ...]  │
//! │ ...                                  │
//! └──────────────────────────────────────┘
//! ```
//!
//! Padding samples are always zero and never read by plane operations.
//!
//! # Example
//!
//! ```rust
//! use fftnr_core::{BlockBuffer, Rect};
//!
//! let mut plane = BlockBuffer::zeroed(100, 60);
//! assert_eq!(plane.pitch(), 104);
//!
//! plane.set(10, 20, 1.5);
//! let view = plane.slice(Rect::new(10, 20, 8, 8));
//! assert_eq!(view.get(0, 0), 1.5);
//! assert_eq!(view.pitch(), plane.pitch());
//! ```

use crate::rect::Rect;

/// Number of `f32` lanes in the widest vector kernels (`f32x8`).
pub const VECTOR_LANES: usize = 8;

/// Rounds `width` up to the next multiple of [`VECTOR_LANES`].
#[inline]
pub const fn aligned_pitch(width: usize) -> usize {
    width.div_ceil(VECTOR_LANES) * VECTOR_LANES
}

/// Single-channel `f32` plane with vector-aligned row pitch.
///
/// A buffer created by [`BlockBuffer::new`] has its geometry fixed but owns
/// no storage until [`BlockBuffer::allocate`] is called. All sample access on
/// an unallocated buffer panics.
#[derive(Clone, PartialEq)]
pub struct BlockBuffer {
    data: Vec<f32>,
    width: usize,
    height: usize,
    pitch: usize,
}

impl BlockBuffer {
    /// Creates a buffer with the given geometry and no storage.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn new(width: usize, height: usize) -> Self {
        assert!(
            width > 0 && height > 0,
            "block buffer dimensions must be non-zero, got {width}x{height}"
        );
        Self {
            data: Vec::new(),
            width,
            height,
            pitch: aligned_pitch(width),
        }
    }

    /// Creates an allocated, zero-filled buffer.
    ///
    /// # Panics
    ///
    /// Panics if either dimension is zero.
    pub fn zeroed(width: usize, height: usize) -> Self {
        let mut buf = Self::new(width, height);
        buf.allocate();
        buf
    }

    /// Reserves zeroed storage. Calling this on an allocated buffer is a no-op.
    pub fn allocate(&mut self) {
        if self.data.is_empty() {
            self.data = vec![0.0; self.pitch * self.height];
        }
    }

    /// Returns `true` once storage has been reserved.
    #[inline]
    pub fn is_allocated(&self) -> bool {
        !self.data.is_empty()
    }

    /// Width in samples.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Distance between row starts, in samples.
    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Full extent of the buffer as a rectangle at the origin.
    #[inline]
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Raw storage including row padding.
    #[inline]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Mutable raw storage including row padding.
    ///
    /// Callers must leave padding samples at zero.
    #[inline]
    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Returns the `width` live samples of row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.pitch;
        &self.data[start..start + self.width]
    }

    /// Mutable access to the `width` live samples of row `y`.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let start = y * self.pitch;
        &mut self.data[start..start + self.width]
    }

    /// Sample at (x, y).
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.pitch + x]
    }

    /// Writes the sample at (x, y).
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.pitch + x] = value;
    }

    /// Sets every live sample to `value`.
    pub fn fill(&mut self, value: f32) {
        for y in 0..self.height {
            self.row_mut(y).fill(value);
        }
    }

    /// Borrows the whole buffer as a view.
    #[inline]
    pub fn view(&self) -> PlaneView<'_> {
        self.slice(self.bounds())
    }

    /// Borrows `rect` as a view sharing this buffer's storage and pitch.
    ///
    /// # Panics
    ///
    /// Panics if `rect` extends past the buffer.
    pub fn slice(&self, rect: Rect) -> PlaneView<'_> {
        let range = self.slice_range(rect);
        PlaneView {
            data: &self.data[range],
            width: rect.width,
            height: rect.height,
            pitch: self.pitch,
        }
    }

    /// Mutable counterpart of [`BlockBuffer::slice`].
    ///
    /// # Panics
    ///
    /// Panics if `rect` extends past the buffer.
    pub fn slice_mut(&mut self, rect: Rect) -> PlaneViewMut<'_> {
        let range = self.slice_range(rect);
        PlaneViewMut {
            data: &mut self.data[range],
            width: rect.width,
            height: rect.height,
            pitch: self.pitch,
        }
    }

    fn slice_range(&self, rect: Rect) -> std::ops::Range<usize> {
        assert!(
            rect.fits_within(self.width, self.height),
            "slice {rect:?} out of bounds for {}x{} plane",
            self.width,
            self.height
        );
        if rect.is_empty() {
            return 0..0;
        }
        let start = rect.y * self.pitch + rect.x;
        let end = (rect.bottom() - 1) * self.pitch + rect.right();
        start..end
    }

    /// Reflects the interior outward into a border of `mx` columns and `my`
    /// rows on every side.
    ///
    /// Padding column `mx - 1 - i` receives interior column `mx + i`, and the
    /// far side mirrors likewise. Columns are mirrored first on interior rows,
    /// then whole rows are mirrored, which fills the corners.
    ///
    /// # Panics
    ///
    /// Panics if the interior is narrower than `mx` or shorter than `my`.
    pub fn mirror_edges(&mut self, mx: usize, my: usize) {
        let (w, h) = (self.width, self.height);
        assert!(
            w >= 3 * mx && h >= 3 * my,
            "interior of {w}x{h} plane too small to mirror {mx}x{my} border"
        );

        if mx > 0 {
            for y in my..h - my {
                let row = self.row_mut(y);
                for i in 0..mx {
                    row[mx - 1 - i] = row[mx + i];
                    row[w - mx + i] = row[w - mx - 1 - i];
                }
            }
        }

        let pitch = self.pitch;
        for i in 0..my {
            let top_src = (my + i) * pitch;
            self.data
                .copy_within(top_src..top_src + pitch, (my - 1 - i) * pitch);
            let bottom_src = (h - my - 1 - i) * pitch;
            self.data
                .copy_within(bottom_src..bottom_src + pitch, (h - my + i) * pitch);
        }
    }

    /// Copies this buffer onto `dst` row by row.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    pub fn blit_onto(&self, dst: &mut BlockBuffer) {
        self.view().blit_onto(dst);
    }
}

impl std::fmt::Debug for BlockBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pitch", &self.pitch)
            .field("allocated", &self.is_allocated())
            .finish()
    }
}

/// Read-only window into a [`BlockBuffer`].
#[derive(Clone, Copy)]
pub struct PlaneView<'a> {
    data: &'a [f32],
    width: usize,
    height: usize,
    pitch: usize,
}

impl<'a> PlaneView<'a> {
    /// View width.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// View height.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row pitch inherited from the parent buffer.
    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Row `y` of the view.
    #[inline]
    pub fn row(&self, y: usize) -> &'a [f32] {
        let start = y * self.pitch;
        &self.data[start..start + self.width]
    }

    /// Sample at (x, y) relative to the view origin.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.pitch + x]
    }

    /// Sub-view relative to this view's origin.
    ///
    /// # Panics
    ///
    /// Panics if `rect` extends past the view.
    pub fn subview(&self, rect: Rect) -> PlaneView<'a> {
        assert!(
            rect.fits_within(self.width, self.height),
            "subview {rect:?} out of bounds for {}x{} view",
            self.width,
            self.height
        );
        if rect.is_empty() {
            return PlaneView {
                data: &[],
                width: rect.width,
                height: rect.height,
                pitch: self.pitch,
            };
        }
        let start = rect.y * self.pitch + rect.x;
        let end = (rect.bottom() - 1) * self.pitch + rect.right();
        PlaneView {
            data: &self.data[start..end],
            width: rect.width,
            height: rect.height,
            pitch: self.pitch,
        }
    }

    /// Copies the view row by row onto `dst`.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    pub fn blit_onto(&self, dst: &mut BlockBuffer) {
        assert_eq!(
            self.dimensions(),
            dst.dimensions(),
            "blit requires matching dimensions"
        );
        dst.allocate();
        for y in 0..self.height {
            dst.row_mut(y).copy_from_slice(self.row(y));
        }
    }
}

impl std::fmt::Debug for PlaneView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaneView")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pitch", &self.pitch)
            .finish()
    }
}

/// Mutable window into a [`BlockBuffer`].
pub struct PlaneViewMut<'a> {
    data: &'a mut [f32],
    width: usize,
    height: usize,
    pitch: usize,
}

impl PlaneViewMut<'_> {
    /// View width.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// View height.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row pitch inherited from the parent buffer.
    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    /// Returns `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Row `y` of the view.
    #[inline]
    pub fn row(&self, y: usize) -> &[f32] {
        let start = y * self.pitch;
        &self.data[start..start + self.width]
    }

    /// Mutable row `y` of the view.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [f32] {
        let start = y * self.pitch;
        &mut self.data[start..start + self.width]
    }

    /// Sample at (x, y) relative to the view origin.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.pitch + x]
    }

    /// Writes the sample at (x, y) relative to the view origin.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        debug_assert!(x < self.width && y < self.height);
        self.data[y * self.pitch + x] = value;
    }

    /// Sets every sample of the view to `value`.
    pub fn fill(&mut self, value: f32) {
        for y in 0..self.height {
            self.row_mut(y).fill(value);
        }
    }

    /// Copies a same-sized view into this one.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    pub fn copy_from(&mut self, src: &PlaneView<'_>) {
        assert_eq!(
            self.dimensions(),
            src.dimensions(),
            "copy requires matching dimensions"
        );
        for y in 0..self.height {
            self.row_mut(y).copy_from_slice(src.row(y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(width: usize, height: usize) -> BlockBuffer {
        let mut buf = BlockBuffer::zeroed(width, height);
        for y in 0..height {
            for x in 0..width {
                buf.set(x, y, (y * 1000 + x) as f32);
            }
        }
        buf
    }

    #[test]
    fn test_pitch_alignment() {
        assert_eq!(aligned_pitch(1), 8);
        assert_eq!(aligned_pitch(8), 8);
        assert_eq!(aligned_pitch(129), 136);
        for w in 1..40 {
            let buf = BlockBuffer::new(w, 3);
            assert!(buf.pitch() >= w);
            assert_eq!(buf.pitch() % VECTOR_LANES, 0);
        }
    }

    #[test]
    fn test_allocate_idempotent() {
        let mut buf = BlockBuffer::new(16, 4);
        assert!(!buf.is_allocated());
        buf.allocate();
        buf.set(3, 2, 7.0);
        buf.allocate();
        assert_eq!(buf.get(3, 2), 7.0);
        assert_eq!(buf.data().len(), 16 * 4);
    }

    #[test]
    fn test_slice_shares_storage() {
        let buf = ramp(20, 10);
        let view = buf.slice(Rect::new(3, 4, 5, 6));
        assert_eq!(view.pitch(), buf.pitch());
        assert_eq!(view.get(0, 0), 4003.0);
        assert_eq!(view.row(5), &[9003.0, 9004.0, 9005.0, 9006.0, 9007.0]);
        let sub = view.subview(Rect::new(1, 1, 2, 2));
        assert_eq!(sub.get(1, 1), 6005.0);
    }

    #[test]
    #[should_panic]
    fn test_slice_out_of_bounds_panics() {
        let buf = BlockBuffer::zeroed(16, 16);
        let _ = buf.slice(Rect::new(10, 0, 8, 4));
    }

    #[test]
    fn test_slice_mut_writes_parent() {
        let mut buf = BlockBuffer::zeroed(16, 16);
        {
            let mut view = buf.slice_mut(Rect::new(4, 4, 4, 4));
            view.fill(2.0);
            view.set(0, 0, 5.0);
        }
        assert_eq!(buf.get(4, 4), 5.0);
        assert_eq!(buf.get(7, 7), 2.0);
        assert_eq!(buf.get(8, 8), 0.0);
        assert_eq!(buf.get(3, 4), 0.0);
    }

    #[test]
    fn test_mirror_edges() {
        let (mx, my) = (3, 2);
        let mut buf = ramp(16, 12);
        buf.mirror_edges(mx, my);
        let (w, h) = buf.dimensions();

        for y in my..h - my {
            for i in 0..mx {
                assert_eq!(buf.get(mx - 1 - i, y), buf.get(mx + i, y));
                assert_eq!(buf.get(w - mx + i, y), buf.get(w - mx - 1 - i, y));
            }
        }
        for x in 0..w {
            for i in 0..my {
                assert_eq!(buf.get(x, my - 1 - i), buf.get(x, my + i));
                assert_eq!(buf.get(x, h - my + i), buf.get(x, h - my - 1 - i));
            }
        }
        // corner is the doubly reflected interior sample
        assert_eq!(buf.get(0, 0), buf.get(2 * mx - 1, 2 * my - 1));
    }

    #[test]
    fn test_blit_and_copy() {
        let src = ramp(9, 5);
        let mut dst = BlockBuffer::new(9, 5);
        src.blit_onto(&mut dst);
        assert_eq!(src, dst);

        let big = ramp(32, 32);
        let mut block = BlockBuffer::zeroed(8, 8);
        block
            .slice_mut(Rect::new(2, 2, 4, 4))
            .copy_from(&big.slice(Rect::new(10, 10, 4, 4)));
        assert_eq!(block.get(2, 2), 10010.0);
        assert_eq!(block.get(5, 5), 13013.0);
        assert_eq!(block.get(6, 6), 0.0);
        assert_eq!(block.get(1, 2), 0.0);
    }

    #[test]
    #[should_panic(expected = "matching dimensions")]
    fn test_copy_from_mismatch_panics() {
        let src = BlockBuffer::zeroed(4, 4);
        let mut dst = BlockBuffer::zeroed(8, 8);
        dst.slice_mut(Rect::new(0, 0, 4, 3)).copy_from(&src.view());
    }
}
