use fftnr_core::BlockBuffer;
use num_complex::Complex32;

use crate::fft::BlockTransform;
use crate::freq::FrequencyBlock;
use crate::window::WindowSet;
use crate::OpsResult;

/// Spectrum of a constant block seen through the analysis window.
///
/// Windowing a flat region leaks energy into a regular pattern of bins. The
/// degrid filters scale this sample by the ratio of DC terms and remove it
/// before estimating signal power.
#[derive(Debug, Clone)]
pub struct GridSample {
    width: usize,
    height: usize,
    spectrum: Vec<Complex32>,
}

impl GridSample {
    /// Transforms a block of ones through `window`.
    pub fn new(transform: &BlockTransform, window: &WindowSet) -> OpsResult<Self> {
        let (width, height) = (transform.width(), transform.height());
        let mut ones = BlockBuffer::zeroed(width, height);
        ones.fill(1.0);

        let mut block = FrequencyBlock::new(transform);
        block.forward(transform, &ones.view(), window)?;

        Ok(Self {
            width,
            height,
            spectrum: block.spectrum().to_vec(),
        })
    }

    /// Block dimensions.
    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Grid bins, row-major.
    pub fn spectrum(&self) -> &[Complex32] {
        &self.spectrum
    }

    /// Real part of the DC bin, the sum of the analysis weights.
    pub fn dc(&self) -> f32 {
        self.spectrum.first().map_or(0.0, |c| c.re)
    }
}
