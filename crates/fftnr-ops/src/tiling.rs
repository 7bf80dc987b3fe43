//! Overlapped block tiling of padded planes.
//!
//! A plane of `len` samples is padded by `overlap` on each side. Blocks of
//! `block` samples are placed every `block - 2 * overlap` samples starting at
//! zero, and one extra block sits flush against the far edge when the regular
//! steps fall short of it.
//!
//! Every block writes back only part of its interior. Write spans are chained
//! so that each starts where the previous one ended, which makes the spans
//! cover `[overlap, len + overlap)` exactly once:
//!
//! ```text
//! padded:   |ov|<----------------- len ----------------->|ov|
//! block 0:  [ov|====write====|ov]
//! block 1:             [ov|====write====|ov]
//! flush:                          [ov|..|==write==|ov]
//! ```
//!
//! # Example
//!
//! ```rust
//! use fftnr_ops::tiling::tile_axis;
//!
//! // 200 samples padded to 232, 128-sample blocks with 16 overlap
//! let spans = tile_axis(232, 128, 16);
//! assert_eq!(spans.len(), 3);
//! assert_eq!(spans[2].start, 104);
//! assert_eq!((spans[2].write_start, spans[2].write_end), (208, 216));
//! ```

use fftnr_core::Rect;

/// One block position along an axis of the padded plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSpan {
    /// First sample of the block.
    pub start: usize,
    /// First sample this block writes back.
    pub write_start: usize,
    /// One past the last sample this block writes back.
    pub write_end: usize,
}

impl AxisSpan {
    /// Number of samples written back.
    pub fn write_len(&self) -> usize {
        self.write_end - self.write_start
    }
}

/// Places blocks along one padded axis of length `padded_len`.
///
/// Returns an empty list when `padded_len < block`.
///
/// # Panics
///
/// Panics if `block <= 2 * overlap`.
pub fn tile_axis(padded_len: usize, block: usize, overlap: usize) -> Vec<AxisSpan> {
    assert!(
        block > 2 * overlap,
        "block {block} leaves no interior with overlap {overlap}"
    );
    if padded_len < block {
        return Vec::new();
    }

    let step = block - 2 * overlap;
    let last = padded_len - block;

    let mut starts: Vec<usize> = (0..=last).step_by(step).collect();
    if starts.last().is_some_and(|&s| s < last) {
        starts.push(last);
    }

    let mut spans = Vec::with_capacity(starts.len());
    let mut write_start = overlap;
    for start in starts {
        let write_end = start + block - overlap;
        spans.push(AxisSpan {
            start,
            write_start,
            write_end,
        });
        write_start = write_end;
    }
    spans
}

/// One block of a plane: its full extent and the part it writes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTile {
    /// Horizontal placement.
    pub x: AxisSpan,
    /// Vertical placement.
    pub y: AxisSpan,
    /// Block width.
    pub width: usize,
    /// Block height.
    pub height: usize,
}

impl BlockTile {
    /// Full block extent in padded-plane coordinates.
    pub fn block_rect(&self) -> Rect {
        Rect::new(self.x.start, self.y.start, self.width, self.height)
    }

    /// Written-back region in padded-plane coordinates.
    pub fn write_rect(&self) -> Rect {
        Rect::new(
            self.x.write_start,
            self.y.write_start,
            self.x.write_len(),
            self.y.write_len(),
        )
    }

    /// Written-back region relative to the block origin.
    pub fn write_rect_in_block(&self) -> Rect {
        self.write_rect().relative_to(&self.block_rect())
    }
}

/// Tiles a `padded_width x padded_height` plane row by row.
pub fn tile_plane(
    padded_width: usize,
    padded_height: usize,
    block_width: usize,
    block_height: usize,
    overlap: usize,
) -> Vec<BlockTile> {
    let xs = tile_axis(padded_width, block_width, overlap);
    let ys = tile_axis(padded_height, block_height, overlap);

    ys.iter()
        .flat_map(|&y| {
            xs.iter().map(move |&x| BlockTile {
                x,
                y,
                width: block_width,
                height: block_height,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_fit_has_no_flush_block() {
        // 128 + 2 * 96 = 320 padded, steps land exactly on the far edge
        let spans = tile_axis(320, 128, 16);
        let starts: Vec<_> = spans.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![0, 96, 192]);
        assert_eq!(spans[2].write_end, 304);
    }

    #[test]
    fn test_single_block() {
        let spans = tile_axis(128, 128, 16);
        assert_eq!(
            spans,
            vec![AxisSpan {
                start: 0,
                write_start: 16,
                write_end: 112
            }]
        );
        assert!(tile_axis(127, 128, 16).is_empty());
    }

    #[test]
    fn test_axis_covers_interior_once() {
        for len in [128usize, 129, 150, 200, 255, 256, 1000, 4001] {
            for (block, overlap) in [(128, 16), (64, 8), (32, 0), (16, 7)] {
                if len < block {
                    continue;
                }
                let padded = len + 2 * overlap;
                let spans = tile_axis(padded, block, overlap);
                let mut hits = vec![0u8; padded];
                for s in &spans {
                    assert!(s.start + block <= padded);
                    assert!(s.write_start >= s.start + overlap);
                    assert!(s.write_end <= s.start + block - overlap);
                    assert!(s.write_end > s.write_start);
                    for h in &mut hits[s.write_start..s.write_end] {
                        *h += 1;
                    }
                }
                for (i, &h) in hits.iter().enumerate() {
                    let inside = i >= overlap && i < padded - overlap;
                    assert_eq!(h, inside as u8, "len {len} block {block} ov {overlap} at {i}");
                }
            }
        }
    }

    #[test]
    fn test_plane_covers_interior_once() {
        let (w, h, bw, bh, ov) = (300, 170, 64, 32, 6);
        let (pw, ph) = (w + 2 * ov, h + 2 * ov);
        let tiles = tile_plane(pw, ph, bw, bh, ov);
        let mut hits = vec![0u8; pw * ph];
        for t in &tiles {
            let r = t.write_rect();
            assert!(t.block_rect().contains_rect(&r));
            for y in r.y..r.bottom() {
                for x in r.x..r.right() {
                    hits[y * pw + x] += 1;
                }
            }
        }
        let interior = Rect::new(ov, ov, w, h);
        for y in 0..ph {
            for x in 0..pw {
                assert_eq!(hits[y * pw + x], interior.contains_rect(&Rect::new(x, y, 1, 1)) as u8);
            }
        }
    }

    #[test]
    fn test_write_rect_in_block() {
        let tiles = tile_plane(232, 128, 128, 128, 16);
        assert_eq!(tiles.len(), 3);
        assert_eq!(tiles[0].write_rect_in_block(), Rect::new(16, 16, 96, 96));
        assert_eq!(tiles[1].write_rect_in_block(), Rect::new(16, 16, 96, 96));
        // flush block starts at 104 and only writes what block 1 left
        assert_eq!(tiles[2].write_rect_in_block(), Rect::new(104, 16, 8, 96));
    }
}
