//! Analysis and synthesis windows for overlapped blocks.
//!
//! Each window is separable: a 1-D taper over the block width times a 1-D
//! taper over the block height. A taper rises over the first `overlap`
//! samples, stays at 1.0 through the interior, and falls symmetrically over
//! the last `overlap` samples. With `t = (i + 0.5) / overlap`:
//!
//! | Kind | Analysis | Synthesis |
//! |------|----------|-----------|
//! | `Flat` | 1 | 1 |
//! | `HalfCosine` | `sin(pi/2 * t)` | `sin(pi/2 * t)` |
//! | `RaisedCosine` | `0.5 * (1 - cos(pi * t))` | 1 |
//! | `IdentityHalfCosine` | 1 | `sin(pi/2 * t)` |
//!
//! A flat window is never multiplied; applying it is a plain copy.

use std::f32::consts::{FRAC_PI_2, PI};

use fftnr_core::{BlockBuffer, PlaneView};
use fftnr_math::KernelSet;
use serde::{Deserialize, Serialize};

use crate::{OpsError, OpsResult};

/// Taper shape for a [`WindowSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    /// No weighting.
    Flat,
    /// Half-cosine analysis and synthesis.
    #[default]
    HalfCosine,
    /// Raised-cosine analysis, flat synthesis.
    RaisedCosine,
    /// Flat analysis, half-cosine synthesis.
    IdentityHalfCosine,
}

#[derive(Clone, Copy, PartialEq)]
enum Taper {
    Flat,
    HalfCosine,
    RaisedCosine,
}

impl Taper {
    fn edge(self, t: f32) -> f32 {
        match self {
            Taper::Flat => 1.0,
            Taper::HalfCosine => (FRAC_PI_2 * t).sin(),
            Taper::RaisedCosine => 0.5 * (1.0 - (PI * t).cos()),
        }
    }

    fn build(self, len: usize, overlap: usize) -> Vec<f32> {
        let mut taper = vec![1.0; len];
        if self == Taper::Flat {
            return taper;
        }
        for i in 0..overlap {
            let w = self.edge((i as f32 + 0.5) / overlap as f32);
            taper[i] = w;
            taper[len - 1 - i] = w;
        }
        taper
    }
}

impl WindowKind {
    fn tapers(self) -> (Taper, Taper) {
        match self {
            WindowKind::Flat => (Taper::Flat, Taper::Flat),
            WindowKind::HalfCosine => (Taper::HalfCosine, Taper::HalfCosine),
            WindowKind::RaisedCosine => (Taper::RaisedCosine, Taper::Flat),
            WindowKind::IdentityHalfCosine => (Taper::Flat, Taper::HalfCosine),
        }
    }
}

/// Paired analysis/synthesis weights for one block size, immutable once built.
#[derive(Debug, Clone)]
pub struct WindowSet {
    kind: WindowKind,
    overlap: usize,
    analysis: BlockBuffer,
    synthesis: BlockBuffer,
    analysis_flat: bool,
    synthesis_flat: bool,
    kernels: KernelSet,
}

impl WindowSet {
    /// Builds a window set using the detected kernel table.
    pub fn new(kind: WindowKind, width: usize, height: usize, overlap: usize) -> OpsResult<Self> {
        Self::with_kernels(kind, width, height, overlap, KernelSet::detect())
    }

    /// Builds a window set that applies weights with `kernels`.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::InvalidParameter`] if the two tapers of an axis
    /// would overlap (`2 * overlap > side`).
    pub fn with_kernels(
        kind: WindowKind,
        width: usize,
        height: usize,
        overlap: usize,
        kernels: KernelSet,
    ) -> OpsResult<Self> {
        if width == 0 || height == 0 {
            return Err(OpsError::InvalidDimensions(format!(
                "window size {width}x{height}"
            )));
        }
        if 2 * overlap > width.min(height) {
            return Err(OpsError::invalid_param(format!(
                "overlap {overlap} too large for {width}x{height} window"
            )));
        }

        let (analysis_taper, synthesis_taper) = if overlap == 0 {
            (Taper::Flat, Taper::Flat)
        } else {
            kind.tapers()
        };

        Ok(Self {
            kind,
            overlap,
            analysis: separable(analysis_taper, width, height, overlap),
            synthesis: separable(synthesis_taper, width, height, overlap),
            analysis_flat: analysis_taper == Taper::Flat,
            synthesis_flat: synthesis_taper == Taper::Flat,
            kernels,
        })
    }

    /// Taper kind requested at construction.
    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    /// Taper length in samples.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Block dimensions the window was built for.
    pub fn dimensions(&self) -> (usize, usize) {
        self.analysis.dimensions()
    }

    /// Analysis weights.
    pub fn analysis(&self) -> &BlockBuffer {
        &self.analysis
    }

    /// Synthesis weights.
    pub fn synthesis(&self) -> &BlockBuffer {
        &self.synthesis
    }

    /// `true` when the analysis weights are all 1.0.
    pub fn is_analysis_flat(&self) -> bool {
        self.analysis_flat
    }

    /// `true` when the synthesis weights are all 1.0.
    pub fn is_synthesis_flat(&self) -> bool {
        self.synthesis_flat
    }

    /// Writes `analysis * src` into `dst`, or copies when the analysis window is flat.
    ///
    /// # Panics
    ///
    /// Panics if `src` or `dst` differ from the window size.
    pub fn apply_analysis(&self, src: &PlaneView<'_>, dst: &mut BlockBuffer) {
        assert_eq!(src.dimensions(), self.dimensions(), "source block size");
        if self.analysis_flat {
            src.blit_onto(dst);
            return;
        }
        assert_eq!(dst.dimensions(), self.dimensions(), "destination block size");
        dst.allocate();
        for y in 0..dst.height() {
            (self.kernels.apply_window)(src.row(y), self.analysis.row(y), dst.row_mut(y));
        }
    }

    /// Multiplies `block` by the synthesis weights in place. No-op when flat.
    pub fn apply_synthesis(&self, block: &mut BlockBuffer) {
        if self.synthesis_flat {
            return;
        }
        assert_eq!(block.dimensions(), self.dimensions(), "block size");
        for y in 0..block.height() {
            for (v, &w) in block.row_mut(y).iter_mut().zip(self.synthesis.row(y)) {
                *v *= w;
            }
        }
    }
}

fn separable(taper: Taper, width: usize, height: usize, overlap: usize) -> BlockBuffer {
    let mut window = BlockBuffer::zeroed(width, height);
    let rows = taper.build(width, overlap);
    let cols = taper.build(height, overlap);
    for (y, &cy) in cols.iter().enumerate() {
        for (v, &rx) in window.row_mut(y).iter_mut().zip(&rows) {
            *v = rx * cy;
        }
    }
    window
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_half_cosine_shape() {
        let w = WindowSet::new(WindowKind::HalfCosine, 32, 16, 4).unwrap();
        assert!(!w.is_analysis_flat());
        assert!(!w.is_synthesis_flat());

        let a = w.analysis();
        // interior is exactly 1
        assert_eq!(a.get(16, 8), 1.0);
        assert_eq!(a.get(4, 4), 1.0);
        // separable product at the corner
        let edge = (FRAC_PI_2 * 0.5 / 4.0).sin();
        assert_relative_eq!(a.get(0, 0), edge * edge, epsilon = 1e-6);
        // symmetric
        for x in 0..32 {
            assert_eq!(a.get(x, 3), a.get(31 - x, 3));
        }
        // rising
        for i in 1..4 {
            assert!(a.get(i, 8) > a.get(i - 1, 8));
        }
    }

    #[test]
    fn test_half_cosine_squares_sum_to_one() {
        // sin^2 + cos^2 across a mirrored overlap pair
        let w = WindowSet::new(WindowKind::HalfCosine, 16, 16, 4).unwrap();
        let a = w.analysis();
        for i in 0..4 {
            let rise = a.get(i, 8);
            let fall = a.get(15 - (3 - i), 8);
            assert_relative_eq!(rise * rise + fall * fall, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_kind_flatness() {
        let raised = WindowSet::new(WindowKind::RaisedCosine, 16, 16, 4).unwrap();
        assert!(!raised.is_analysis_flat());
        assert!(raised.is_synthesis_flat());

        let ident = WindowSet::new(WindowKind::IdentityHalfCosine, 16, 16, 4).unwrap();
        assert!(ident.is_analysis_flat());
        assert!(!ident.is_synthesis_flat());

        let none = WindowSet::new(WindowKind::HalfCosine, 16, 16, 0).unwrap();
        assert!(none.is_analysis_flat() && none.is_synthesis_flat());
    }

    #[test]
    fn test_apply_analysis_matches_definition() {
        let w = WindowSet::new(WindowKind::RaisedCosine, 24, 16, 5).unwrap();
        let mut src = BlockBuffer::zeroed(24, 16);
        for y in 0..16 {
            for x in 0..24 {
                src.set(x, y, (x + y * 24) as f32);
            }
        }
        let mut dst = BlockBuffer::new(24, 16);
        w.apply_analysis(&src.view(), &mut dst);
        for y in 0..16 {
            for x in 0..24 {
                assert_eq!(dst.get(x, y), w.analysis().get(x, y) * src.get(x, y));
            }
        }
    }

    #[test]
    fn test_flat_analysis_copies() {
        let w = WindowSet::new(WindowKind::Flat, 8, 8, 2).unwrap();
        let mut src = BlockBuffer::zeroed(8, 8);
        src.fill(3.5);
        let mut dst = BlockBuffer::new(8, 8);
        w.apply_analysis(&src.view(), &mut dst);
        assert_eq!(src, dst);

        let mut block = src.clone();
        w.apply_synthesis(&mut block);
        assert_eq!(block, src);
    }

    #[test]
    fn test_overlap_too_large() {
        assert!(WindowSet::new(WindowKind::HalfCosine, 16, 16, 9).is_err());
    }
}
