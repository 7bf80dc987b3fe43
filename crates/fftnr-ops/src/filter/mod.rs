//! Spectral filters applied to one block's half-spectrum.
//!
//! Every filter attenuates each bin `X` by a Wiener factor
//!
//! ```text
//! psd    = |X|^2 + 1e-15
//! factor = max((psd - noise) / psd, (beta - 1) / beta)
//! ```
//!
//! where `noise` is either a flat power (`sigma^2 * bw * bh`, since the
//! transform is un-normalized) or a per-bin pattern spectrum. Optional
//! sharpening multiplies the factor by
//! `1 + mask * sqrt(psd * smax / ((psd + smin) * (psd + smax)))`.
//!
//! The degrid variants subtract a share of the window's own spectrum before
//! estimating power and add it back afterwards, see [`GridSample`].
//!
//! | Variant | Noise model | Sharpening |
//! |---------|-------------|------------|
//! | [`WienerFilter`] | flat | yes |
//! | [`WienerDegridFilter`] | flat, degridded | yes |
//! | [`PatternFilter`] | pattern | no |
//! | [`PatternDegridFilter`] | pattern, degridded | two-stage |

mod grid;
mod pattern;
mod wiener;

pub use grid::GridSample;
pub use pattern::{PatternDegridFilter, PatternFilter, PatternSpectrum};
pub use wiener::{WienerDegridFilter, WienerFilter};

use std::sync::Arc;

use fftnr_math::{KernelSet, SharpenTerms};

use crate::freq::FrequencyBlock;
use crate::params::{PlaneSettings, SharpenParams};
use crate::{OpsError, OpsResult};

/// Sharpen amounts at or below this leave the spectrum unsharpened.
pub const SHARPEN_EPSILON: f32 = 0.001;

/// Noise powers below this make a filter a no-op.
pub const SKIP_EPSILON: f32 = 1e-15;

/// Radial sharpen weights for one block size.
///
/// The spectrum is not shifted, so distances are measured from the DC bin
/// with vertical wrap-around: `dy = min(y, bh - y) / (bh / 2)` and
/// `dx = x / (bw / 2)` over the half-spectrum columns.
#[derive(Debug, Clone)]
pub struct SharpenMask {
    amount: f32,
    cutoff: f32,
    sigma2_min: f32,
    sigma2_max: f32,
    mask: Vec<f32>,
}

impl SharpenMask {
    /// Builds `amount * (1 - exp(-d^2 / (2 * cutoff^2)))` over the half-spectrum.
    ///
    /// `sigma2_min` and `sigma2_max` are already normalized powers.
    pub fn new(
        width: usize,
        height: usize,
        amount: f32,
        cutoff: f32,
        sigma2_min: f32,
        sigma2_max: f32,
    ) -> Self {
        let bins = width / 2 + 1;
        let half_w = (width / 2) as f32;
        let half_h = (height / 2) as f32;
        let denom = 2.0 * cutoff * cutoff;

        let mut mask = Vec::with_capacity(height * bins);
        for y in 0..height {
            let dy = y.min(height - y) as f32 / half_h;
            for x in 0..bins {
                let dx = x as f32 / half_w;
                let d2 = dx * dx + dy * dy;
                mask.push(amount * (1.0 - (-d2 / denom).exp()));
            }
        }

        Self {
            amount,
            cutoff,
            sigma2_min,
            sigma2_max,
            mask,
        }
    }

    /// Sharpen strength.
    pub fn amount(&self) -> f32 {
        self.amount
    }

    /// Radial falloff.
    pub fn cutoff(&self) -> f32 {
        self.cutoff
    }

    /// Per-bin weights, row-major over the half-spectrum.
    pub fn weights(&self) -> &[f32] {
        &self.mask
    }

    /// Kernel inputs for this mask.
    pub fn terms(&self) -> SharpenTerms<'_> {
        SharpenTerms {
            mask: &self.mask,
            sigma2_min: self.sigma2_min,
            sigma2_max: self.sigma2_max,
        }
    }
}

/// State common to every filter variant.
#[derive(Debug, Clone)]
pub struct FilterShared {
    width: usize,
    height: usize,
    lowlimit: f32,
    sharpen: Option<SharpenMask>,
    kernels: KernelSet,
}

impl FilterShared {
    /// Filter state for `width x height` blocks.
    ///
    /// # Errors
    ///
    /// [`OpsError::InvalidParameter`] if `beta < 1` or is not finite.
    pub fn new(width: usize, height: usize, beta: f32, kernels: KernelSet) -> OpsResult<Self> {
        if !(beta.is_finite() && beta >= 1.0) {
            return Err(OpsError::invalid_param(format!("beta must be >= 1, got {beta}")));
        }
        if width < 2 || height < 2 || width % 2 != 0 || height % 2 != 0 {
            return Err(OpsError::InvalidDimensions(format!(
                "filter block {width}x{height} must have even sides"
            )));
        }
        Ok(Self {
            width,
            height,
            lowlimit: (beta - 1.0) / beta,
            sharpen: None,
            kernels,
        })
    }

    /// Block width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Block height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bins per spectrum row.
    pub fn bins_per_row(&self) -> usize {
        self.width / 2 + 1
    }

    /// Minimum attenuation factor.
    pub fn lowlimit(&self) -> f32 {
        self.lowlimit
    }

    /// Kernel table.
    pub fn kernels(&self) -> &KernelSet {
        &self.kernels
    }

    /// Converts a standard deviation to a power in the un-normalized spectrum.
    pub fn normalize(&self, sigma: f32) -> f32 {
        sigma * sigma * (self.width * self.height) as f32
    }

    /// Builds the sharpen mask, or clears it for negligible amounts.
    pub fn set_sharpen(&mut self, sharpen: &SharpenParams) {
        self.sharpen = sharpen.is_enabled().then(|| {
            SharpenMask::new(
                self.width,
                self.height,
                sharpen.amount,
                sharpen.cutoff,
                self.normalize(sharpen.sigma_min),
                self.normalize(sharpen.sigma_max),
            )
        });
    }

    /// Configured sharpen amount, zero when disabled.
    pub fn sharpen_amount(&self) -> f32 {
        self.sharpen.as_ref().map_or(0.0, SharpenMask::amount)
    }

    /// Sharpen mask, if enabled.
    pub fn sharpen(&self) -> Option<&SharpenMask> {
        self.sharpen.as_ref()
    }

    /// Kernel inputs for the sharpen mask, if enabled.
    pub fn sharpen_terms(&self) -> Option<SharpenTerms<'_>> {
        self.sharpen.as_ref().map(SharpenMask::terms)
    }
}

/// Per-block processing contract shared by all filter variants.
pub trait SpectralFilter: Send + Sync {
    /// Common filter state.
    fn shared(&self) -> &FilterShared;

    /// Attenuates without sharpening.
    fn process_no_sharpen(&self, block: &mut FrequencyBlock);

    /// Attenuates and sharpens.
    fn process_sharpen(&self, block: &mut FrequencyBlock);

    /// `true` when processing would leave every block unchanged.
    fn skip_block(&self) -> bool;

    /// Filters `block` in place.
    ///
    /// # Panics
    ///
    /// Panics if the block size differs from the filter's.
    fn process(&self, block: &mut FrequencyBlock) {
        let shared = self.shared();
        assert_eq!(
            (block.width(), block.height()),
            (shared.width(), shared.height()),
            "block size does not match filter"
        );
        if shared.sharpen_amount() > SHARPEN_EPSILON {
            self.process_sharpen(block);
        } else {
            self.process_no_sharpen(block);
        }
    }
}

/// One of the four filter variants, chosen per plane.
#[derive(Debug, Clone)]
pub enum ComplexFilter {
    /// Flat noise.
    Wiener(WienerFilter),
    /// Flat noise with grid removal.
    WienerDegrid(WienerDegridFilter),
    /// Pattern noise.
    Pattern(PatternFilter),
    /// Pattern noise with grid removal.
    PatternDegrid(PatternDegridFilter),
}

impl ComplexFilter {
    /// Picks and builds the variant for one plane.
    ///
    /// A pattern spectrum selects a pattern variant; `degrid > 0` selects a
    /// degrid variant.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::SizeMismatch`] if the pattern spectrum was made for
    /// another block size and [`OpsError::Unsupported`] if sharpening is
    /// requested for a pattern filter without grid removal.
    pub fn build(
        width: usize,
        height: usize,
        settings: &PlaneSettings,
        grid: &Arc<GridSample>,
        kernels: KernelSet,
    ) -> OpsResult<Self> {
        let mut shared = FilterShared::new(width, height, settings.beta, kernels)?;
        let degrid = settings.degrid > 0.0;

        let filter = match &settings.pattern {
            Some((pattern, factor)) => {
                pattern.check_size(width, height)?;
                if degrid {
                    shared.set_sharpen(&settings.sharpen);
                    ComplexFilter::PatternDegrid(PatternDegridFilter::new(
                        shared,
                        pattern.clone(),
                        *factor,
                        settings.degrid,
                        Arc::clone(grid),
                    ))
                } else {
                    shared.set_sharpen(&settings.sharpen);
                    ComplexFilter::Pattern(PatternFilter::new(shared, pattern.clone(), *factor)?)
                }
            }
            None => {
                shared.set_sharpen(&settings.sharpen);
                let sigma2 = shared.normalize(settings.sigma);
                if degrid {
                    ComplexFilter::WienerDegrid(WienerDegridFilter::new(
                        shared,
                        sigma2,
                        settings.degrid,
                        Arc::clone(grid),
                    ))
                } else {
                    ComplexFilter::Wiener(WienerFilter::new(shared, sigma2))
                }
            }
        };
        Ok(filter)
    }

    /// Variant name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            ComplexFilter::Wiener(_) => "wiener",
            ComplexFilter::WienerDegrid(_) => "wiener_degrid",
            ComplexFilter::Pattern(_) => "pattern",
            ComplexFilter::PatternDegrid(_) => "pattern_degrid",
        }
    }

    fn inner(&self) -> &dyn SpectralFilter {
        match self {
            ComplexFilter::Wiener(f) => f,
            ComplexFilter::WienerDegrid(f) => f,
            ComplexFilter::Pattern(f) => f,
            ComplexFilter::PatternDegrid(f) => f,
        }
    }
}

impl SpectralFilter for ComplexFilter {
    fn shared(&self) -> &FilterShared {
        self.inner().shared()
    }

    fn process_no_sharpen(&self, block: &mut FrequencyBlock) {
        self.inner().process_no_sharpen(block)
    }

    fn process_sharpen(&self, block: &mut FrequencyBlock) {
        self.inner().process_sharpen(block)
    }

    fn skip_block(&self) -> bool {
        self.inner().skip_block()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft::BlockTransform;
    use crate::window::{WindowKind, WindowSet};
    use fftnr_core::BlockBuffer;
    use fftnr_math::SimdLevel;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const N: usize = 32;

    fn settings(sigma: f32, degrid: f32) -> PlaneSettings {
        PlaneSettings {
            sigma,
            beta: 1.0,
            degrid,
            sharpen: SharpenParams::default(),
            pattern: None,
        }
    }

    fn grid() -> Arc<GridSample> {
        let transform = BlockTransform::new(N, N).unwrap();
        let window = WindowSet::new(WindowKind::HalfCosine, N, N, 8).unwrap();
        Arc::new(GridSample::new(&transform, &window).unwrap())
    }

    fn noisy_block(seed: u64) -> BlockBuffer {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut buf = BlockBuffer::zeroed(N, N);
        for y in 0..N {
            for v in buf.row_mut(y) {
                *v = 100.0 + rng.random_range(-5.0..5.0);
            }
        }
        buf
    }

    #[test]
    fn test_variant_selection() {
        let g = grid();
        let kernels = KernelSet::detect();
        let f = ComplexFilter::build(N, N, &settings(1.0, 0.0), &g, kernels).unwrap();
        assert_eq!(f.name(), "wiener");
        let f = ComplexFilter::build(N, N, &settings(1.0, 0.5), &g, kernels).unwrap();
        assert_eq!(f.name(), "wiener_degrid");

        let pattern = PatternSpectrum::flat(N, N, 1.0);
        let mut s = settings(1.0, 0.0);
        s.pattern = Some((pattern, 1.0));
        assert_eq!(ComplexFilter::build(N, N, &s, &g, kernels).unwrap().name(), "pattern");
        s.degrid = 1.0;
        assert_eq!(
            ComplexFilter::build(N, N, &s, &g, kernels).unwrap().name(),
            "pattern_degrid"
        );
    }

    #[test]
    fn test_pattern_size_mismatch() {
        let mut s = settings(1.0, 0.0);
        s.pattern = Some((PatternSpectrum::flat(16, 16, 1.0), 1.0));
        let err = ComplexFilter::build(N, N, &s, &grid(), KernelSet::detect()).unwrap_err();
        assert!(matches!(err, OpsError::SizeMismatch(_)));
    }

    #[test]
    fn test_pattern_sharpen_rejected_without_degrid() {
        let mut s = settings(1.0, 0.0);
        s.pattern = Some((PatternSpectrum::flat(N, N, 1.0), 1.0));
        s.sharpen.amount = 0.8;
        let err = ComplexFilter::build(N, N, &s, &grid(), KernelSet::detect()).unwrap_err();
        assert!(matches!(err, OpsError::Unsupported(_)));

        s.degrid = 1.0;
        let f = ComplexFilter::build(N, N, &s, &grid(), KernelSet::detect()).unwrap();
        assert_eq!(f.name(), "pattern_degrid");
    }

    #[test]
    fn test_lowlimit_from_beta() {
        let shared = FilterShared::new(N, N, 4.0, KernelSet::detect()).unwrap();
        assert_eq!(shared.lowlimit(), 0.75);
        assert!(FilterShared::new(N, N, 0.9, KernelSet::detect()).is_err());
    }

    #[test]
    fn test_sharpen_mask_shape() {
        let mask = SharpenMask::new(N, N, 2.0, 0.3, 1.0, 10.0);
        let bins = N / 2 + 1;
        let w = mask.weights();
        assert_eq!(w.len(), N * bins);
        // DC gets no boost, far corner approaches the full amount
        assert_eq!(w[0], 0.0);
        assert!(w[(N / 2) * bins + bins - 1] > 1.9);
        // vertical wrap-around is symmetric
        for x in 0..bins {
            assert_eq!(w[bins + x], w[(N - 1) * bins + x]);
        }
        // grows with distance along a row
        for x in 1..bins {
            assert!(w[x] >= w[x - 1]);
        }
    }

    #[test]
    fn test_negligible_sharpen_is_disabled() {
        let mut shared = FilterShared::new(N, N, 1.0, KernelSet::detect()).unwrap();
        shared.set_sharpen(&SharpenParams {
            amount: 0.0005,
            ..Default::default()
        });
        assert!(shared.sharpen().is_none());
        assert_eq!(shared.sharpen_amount(), 0.0);
    }

    #[test]
    fn test_zero_sigma_round_trip() {
        let transform = BlockTransform::new(N, N).unwrap();
        let window = WindowSet::new(WindowKind::HalfCosine, N, N, 8).unwrap();
        let filter =
            ComplexFilter::build(N, N, &settings(0.0, 0.0), &grid(), KernelSet::detect()).unwrap();
        assert!(filter.skip_block());

        let input = noisy_block(7);
        let mut block = FrequencyBlock::new(&transform);
        block.forward(&transform, &input.view(), &window).unwrap();
        filter.process(&mut block);
        let mut out = BlockBuffer::new(N, N);
        block.inverse(&transform, &mut out).unwrap();

        let scale = 1.0 / transform.scale();
        for y in 0..N {
            for x in 0..N {
                let expected = input.get(x, y) * window.analysis().get(x, y);
                assert!((out.get(x, y) * scale - expected).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_degrid_zero_is_bit_identical() {
        let transform = BlockTransform::new(N, N).unwrap();
        let window = WindowSet::new(WindowKind::HalfCosine, N, N, 8).unwrap();
        let g = grid();
        let kernels = KernelSet::for_level(SimdLevel::Scalar);
        let shared = FilterShared::new(N, N, 1.0, kernels).unwrap();
        let sigma2 = shared.normalize(2.0);
        let plain = WienerFilter::new(shared.clone(), sigma2);
        let degrid = WienerDegridFilter::new(shared, sigma2, 0.0, g);

        let input = noisy_block(11);
        let mut a = FrequencyBlock::new(&transform);
        let mut b = FrequencyBlock::new(&transform);
        a.forward(&transform, &input.view(), &window).unwrap();
        b.forward(&transform, &input.view(), &window).unwrap();
        plain.process(&mut a);
        degrid.process(&mut b);
        assert_eq!(a.spectrum(), b.spectrum());
    }

    #[test]
    fn test_factor_bounded_by_lowlimit() {
        let transform = BlockTransform::new(N, N).unwrap();
        let window = WindowSet::new(WindowKind::Flat, N, N, 0).unwrap();
        for beta in [1.0f32, 1.5, 4.0, 100.0] {
            let mut s = settings(3.0, 0.0);
            s.beta = beta;
            let filter = ComplexFilter::build(N, N, &s, &grid(), KernelSet::detect()).unwrap();
            let lowlimit = (beta - 1.0) / beta;

            let input = noisy_block(3);
            let mut block = FrequencyBlock::new(&transform);
            block.forward(&transform, &input.view(), &window).unwrap();
            let before = block.spectrum().to_vec();
            filter.process(&mut block);

            for (x, y) in before.iter().zip(block.spectrum()) {
                if x.norm() < 1.0 {
                    continue;
                }
                let factor = y.norm() / x.norm();
                assert!(factor <= 1.0 + 1e-4, "beta {beta}: {factor}");
                assert!(factor >= lowlimit - 1e-4, "beta {beta}: {factor}");
            }
        }
    }

    #[test]
    #[should_panic(expected = "block size")]
    fn test_block_size_mismatch_panics() {
        let filter =
            ComplexFilter::build(N, N, &settings(1.0, 0.0), &grid(), KernelSet::detect()).unwrap();
        let transform = BlockTransform::new(16, 16).unwrap();
        let mut block = FrequencyBlock::new(&transform);
        filter.process(&mut block);
    }
}
