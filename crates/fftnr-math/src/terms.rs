//! Per-bin inputs shared by the scalar and vector spectral kernels.
//!
//! All slices index the same contiguous half-spectrum as the bins being
//! filtered (`bh` rows of `bw / 2 + 1` bins).

use num_complex::Complex32;

/// Added to every power estimate so the attenuation ratio never divides by zero.
pub const PSD_EPSILON: f32 = 1e-15;

/// Noise power model for one block.
#[derive(Debug, Clone, Copy)]
pub enum Noise<'a> {
    /// The same normalized noise power at every bin.
    Flat(f32),
    /// A reference power spectrum scaled by `factor`.
    Pattern {
        /// Per-bin noise power, one entry per spectrum bin.
        spectrum: &'a [f32],
        /// Multiplier applied to every entry.
        factor: f32,
    },
}

impl<'a> Noise<'a> {
    /// Noise power at bin `i`.
    #[inline(always)]
    pub fn at(&self, i: usize) -> f32 {
        match *self {
            Noise::Flat(sigma2) => sigma2,
            Noise::Pattern { spectrum, factor } => spectrum[i] * factor,
        }
    }

    /// The same model starting at bin `offset`.
    #[inline]
    pub fn tail(&self, offset: usize) -> Noise<'a> {
        match *self {
            Noise::Flat(sigma2) => Noise::Flat(sigma2),
            Noise::Pattern { spectrum, factor } => Noise::Pattern {
                spectrum: &spectrum[offset..],
                factor,
            },
        }
    }
}

/// Sharpening weights and the normalized power band they act on.
#[derive(Debug, Clone, Copy)]
pub struct SharpenTerms<'a> {
    /// Per-bin sharpen weight (`amount` times the radial falloff).
    pub mask: &'a [f32],
    /// Normalized power below which sharpening rolls off.
    pub sigma2_min: f32,
    /// Normalized power above which sharpening rolls off.
    pub sigma2_max: f32,
}

impl<'a> SharpenTerms<'a> {
    /// The same terms starting at bin `offset`.
    #[inline]
    pub fn tail(&self, offset: usize) -> SharpenTerms<'a> {
        SharpenTerms {
            mask: &self.mask[offset..],
            ..*self
        }
    }

    /// Multiplier for a bin with weight `weight` and power `psd`.
    #[inline(always)]
    pub fn factor(&self, weight: f32, psd: f32) -> f32 {
        1.0 + weight
            * (psd * self.sigma2_max / ((psd + self.sigma2_min) * (psd + self.sigma2_max))).sqrt()
    }
}

/// Windowing-artifact spectrum and the share of it to remove.
#[derive(Debug, Clone, Copy)]
pub struct GridTerms<'a> {
    /// Spectrum of a constant block passed through the analysis window.
    pub grid: &'a [Complex32],
    /// `degrid * X[0].re / grid[0].re` for the block being filtered.
    pub fraction: f32,
}

impl<'a> GridTerms<'a> {
    /// Computes the grid fraction for a block whose DC bin is `dc`.
    ///
    /// Returns a fraction of zero when the grid has no DC energy.
    pub fn new(grid: &'a [Complex32], degrid: f32, dc: Complex32) -> Self {
        let grid_dc = grid.first().map_or(0.0, |g| g.re);
        let fraction = if grid_dc != 0.0 {
            degrid * dc.re / grid_dc
        } else {
            0.0
        };
        Self { grid, fraction }
    }

    /// The same terms starting at bin `offset`.
    #[inline]
    pub fn tail(&self, offset: usize) -> GridTerms<'a> {
        GridTerms {
            grid: &self.grid[offset..],
            fraction: self.fraction,
        }
    }
}
