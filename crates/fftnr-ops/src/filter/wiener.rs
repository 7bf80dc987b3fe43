use std::sync::Arc;

use fftnr_math::{GridTerms, Noise};

use super::{FilterShared, GridSample, SpectralFilter, SKIP_EPSILON};
use crate::freq::FrequencyBlock;

/// Wiener filter with a flat noise power.
#[derive(Debug, Clone)]
pub struct WienerFilter {
    shared: FilterShared,
    sigma2: f32,
}

impl WienerFilter {
    /// `sigma2` is the normalized noise power (see [`FilterShared::normalize`]).
    pub fn new(shared: FilterShared, sigma2: f32) -> Self {
        Self { shared, sigma2 }
    }

    /// Normalized noise power.
    pub fn sigma2(&self) -> f32 {
        self.sigma2
    }
}

impl SpectralFilter for WienerFilter {
    fn shared(&self) -> &FilterShared {
        &self.shared
    }

    fn process_no_sharpen(&self, block: &mut FrequencyBlock) {
        let k = self.shared.kernels();
        (k.attenuate)(block.spectrum_mut(), Noise::Flat(self.sigma2), self.shared.lowlimit());
    }

    fn process_sharpen(&self, block: &mut FrequencyBlock) {
        let Some(sharpen) = self.shared.sharpen_terms() else {
            return self.process_no_sharpen(block);
        };
        let k = self.shared.kernels();
        (k.attenuate_sharpen)(
            block.spectrum_mut(),
            Noise::Flat(self.sigma2),
            self.shared.lowlimit(),
            &sharpen,
        );
    }

    fn skip_block(&self) -> bool {
        self.shared.sharpen().is_none() && self.sigma2 < SKIP_EPSILON
    }
}

/// Wiener filter that removes a share of the window grid before filtering.
#[derive(Debug, Clone)]
pub struct WienerDegridFilter {
    shared: FilterShared,
    sigma2: f32,
    degrid: f32,
    grid: Arc<GridSample>,
}

impl WienerDegridFilter {
    /// `degrid` in `0..=1` scales the removed grid share.
    pub fn new(shared: FilterShared, sigma2: f32, degrid: f32, grid: Arc<GridSample>) -> Self {
        Self {
            shared,
            sigma2,
            degrid,
            grid,
        }
    }

    /// Normalized noise power.
    pub fn sigma2(&self) -> f32 {
        self.sigma2
    }

    fn grid_terms(&self, block: &FrequencyBlock) -> GridTerms<'_> {
        GridTerms::new(self.grid.spectrum(), self.degrid, block.spectrum()[0])
    }
}

impl SpectralFilter for WienerDegridFilter {
    fn shared(&self) -> &FilterShared {
        &self.shared
    }

    fn process_no_sharpen(&self, block: &mut FrequencyBlock) {
        let grid = self.grid_terms(block);
        let k = self.shared.kernels();
        let noise = Noise::Flat(self.sigma2);
        // zero fraction takes the plain path so output matches the plain filter exactly
        if grid.fraction == 0.0 {
            (k.attenuate)(block.spectrum_mut(), noise, self.shared.lowlimit());
        } else {
            (k.attenuate_degrid)(block.spectrum_mut(), noise, self.shared.lowlimit(), &grid);
        }
    }

    fn process_sharpen(&self, block: &mut FrequencyBlock) {
        let Some(sharpen) = self.shared.sharpen_terms() else {
            return self.process_no_sharpen(block);
        };
        let grid = self.grid_terms(block);
        let k = self.shared.kernels();
        let noise = Noise::Flat(self.sigma2);
        if grid.fraction == 0.0 {
            (k.attenuate_sharpen)(block.spectrum_mut(), noise, self.shared.lowlimit(), &sharpen);
        } else {
            (k.attenuate_degrid_sharpen)(
                block.spectrum_mut(),
                noise,
                self.shared.lowlimit(),
                &grid,
                &sharpen,
            );
        }
    }

    fn skip_block(&self) -> bool {
        self.shared.sharpen().is_none() && self.sigma2 < SKIP_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft::BlockTransform;
    use crate::params::SharpenParams;
    use crate::window::{WindowKind, WindowSet};
    use fftnr_core::BlockBuffer;
    use fftnr_math::KernelSet;

    const N: usize = 32;

    fn edge_block() -> BlockBuffer {
        let mut buf = BlockBuffer::zeroed(N, N);
        for y in 0..N {
            for (x, v) in buf.row_mut(y).iter_mut().enumerate() {
                *v = if x < N / 2 { 40.0 } else { 160.0 };
            }
        }
        buf
    }

    #[test]
    fn test_sharpen_boosts_detail() {
        let transform = BlockTransform::new(N, N).unwrap();
        let window = WindowSet::new(WindowKind::Flat, N, N, 0).unwrap();
        let shared = FilterShared::new(N, N, 1.0, KernelSet::detect()).unwrap();
        let mut sharp_shared = shared.clone();
        sharp_shared.set_sharpen(&SharpenParams {
            amount: 1.0,
            ..Default::default()
        });
        let sigma2 = shared.normalize(0.5);
        let plain = WienerFilter::new(shared, sigma2);
        let sharp = WienerFilter::new(sharp_shared, sigma2);
        assert!(!sharp.skip_block());

        let input = edge_block();
        let mut a = FrequencyBlock::new(&transform);
        let mut b = FrequencyBlock::new(&transform);
        a.forward(&transform, &input.view(), &window).unwrap();
        b.forward(&transform, &input.view(), &window).unwrap();
        plain.process(&mut a);
        sharp.process(&mut b);

        let energy = |s: &[num_complex::Complex32]| s[1..].iter().map(|c| c.norm_sqr()).sum::<f32>();
        assert!(energy(b.spectrum()) > energy(a.spectrum()));
        // DC is not sharpened
        assert!((a.spectrum()[0] - b.spectrum()[0]).norm() < 1e-2);
    }

    #[test]
    fn test_degrid_preserves_flat_block() {
        // a constant block is all grid, so nothing is left to attenuate
        let transform = BlockTransform::new(N, N).unwrap();
        let window = WindowSet::new(WindowKind::HalfCosine, N, N, 8).unwrap();
        let grid = Arc::new(GridSample::new(&transform, &window).unwrap());
        let shared = FilterShared::new(N, N, 1.0, KernelSet::detect()).unwrap();
        let sigma2 = shared.normalize(4.0);
        let filter = WienerDegridFilter::new(shared, sigma2, 1.0, grid);

        let mut input = BlockBuffer::zeroed(N, N);
        input.fill(1000.0);
        let mut block = FrequencyBlock::new(&transform);
        block.forward(&transform, &input.view(), &window).unwrap();
        let before = block.spectrum().to_vec();
        filter.process(&mut block);
        let tolerance = 1e-5 * before[0].norm();
        for (x, y) in before.iter().zip(block.spectrum()) {
            assert!((x - y).norm() <= tolerance);
        }
    }

    #[test]
    fn test_skip_only_without_noise_or_sharpen() {
        let shared = FilterShared::new(N, N, 1.0, KernelSet::detect()).unwrap();
        assert!(WienerFilter::new(shared.clone(), 0.0).skip_block());
        assert!(!WienerFilter::new(shared, 1.0).skip_block());
    }
}
