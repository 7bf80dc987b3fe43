//! Per-worker spectrum buffer.

use fftnr_core::{BlockBuffer, PlaneView};
use num_complex::Complex32;

use crate::fft::{BlockTransform, TransformScratch};
use crate::window::WindowSet;
use crate::OpsResult;

/// Complex half-spectrum of one block plus the scratch used to produce it.
///
/// One instance lives for the lifetime of a worker and is overwritten by
/// every block it processes.
pub struct FrequencyBlock {
    width: usize,
    height: usize,
    bins: usize,
    spectrum: Vec<Complex32>,
    scratch: BlockBuffer,
    transform_scratch: TransformScratch,
}

impl FrequencyBlock {
    /// Allocates a spectrum and scratch sized for `transform`.
    pub fn new(transform: &BlockTransform) -> Self {
        let (width, height) = (transform.width(), transform.height());
        Self {
            width,
            height,
            bins: transform.bins_per_row(),
            spectrum: vec![Complex32::new(0.0, 0.0); transform.spectrum_len()],
            scratch: BlockBuffer::zeroed(width, height),
            transform_scratch: transform.make_scratch(),
        }
    }

    /// Spatial block width.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Spatial block height.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bins per spectrum row (`width / 2 + 1`).
    pub fn bins_per_row(&self) -> usize {
        self.bins
    }

    /// All bins, row-major.
    pub fn spectrum(&self) -> &[Complex32] {
        &self.spectrum
    }

    /// Mutable bins, row-major.
    pub fn spectrum_mut(&mut self) -> &mut [Complex32] {
        &mut self.spectrum
    }

    /// Bins of spectrum row `y`.
    pub fn row(&self, y: usize) -> &[Complex32] {
        &self.spectrum[y * self.bins..(y + 1) * self.bins]
    }

    /// Mutable bins of spectrum row `y`.
    pub fn row_mut(&mut self, y: usize) -> &mut [Complex32] {
        &mut self.spectrum[y * self.bins..(y + 1) * self.bins]
    }

    /// Windowed spatial block from the last forward pass.
    pub fn scratch(&self) -> &BlockBuffer {
        &self.scratch
    }

    /// Mutable spatial scratch block.
    pub fn scratch_mut(&mut self) -> &mut BlockBuffer {
        &mut self.scratch
    }

    /// Windows `input` and transforms it into the spectrum.
    pub fn forward(
        &mut self,
        transform: &BlockTransform,
        input: &PlaneView<'_>,
        window: &WindowSet,
    ) -> OpsResult<()> {
        window.apply_analysis(input, &mut self.scratch);
        transform.forward(&self.scratch, &mut self.spectrum, &mut self.transform_scratch)
    }

    /// Transforms the spectrum back into `output`, scaled by `width * height`.
    ///
    /// The spectrum is left in an unspecified state.
    pub fn inverse(&mut self, transform: &BlockTransform, output: &mut BlockBuffer) -> OpsResult<()> {
        transform.inverse(&mut self.spectrum, output, &mut self.transform_scratch)
    }
}

impl std::fmt::Debug for FrequencyBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrequencyBlock")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bins", &self.bins)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowKind;

    #[test]
    fn test_forward_inverse_reproduces_windowed_input() {
        let transform = BlockTransform::new(32, 32).unwrap();
        let window = WindowSet::new(WindowKind::HalfCosine, 32, 32, 8).unwrap();
        let mut block = FrequencyBlock::new(&transform);

        let mut input = BlockBuffer::zeroed(32, 32);
        for y in 0..32 {
            for x in 0..32 {
                input.set(x, y, 100.0 + ((x * 3 + y * 5) % 17) as f32);
            }
        }
        block.forward(&transform, &input.view(), &window).unwrap();
        assert_eq!(block.row(0).len(), 17);

        let mut output = BlockBuffer::new(32, 32);
        block.inverse(&transform, &mut output).unwrap();
        let scale = 1.0 / transform.scale();
        for y in 0..32 {
            for x in 0..32 {
                let expected = input.get(x, y) * window.analysis().get(x, y);
                assert!((output.get(x, y) * scale - expected).abs() < 1e-3);
            }
        }
    }
}
