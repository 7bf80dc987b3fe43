//! Planned 2-D real FFT for one block size.
//!
//! A block of `bw x bh` real samples maps to a half-spectrum of `bh` rows by
//! `bw / 2 + 1` bins, stored row-major and contiguous. The forward pass runs
//! real-to-complex FFTs over rows, then complex FFTs over the bin columns;
//! the inverse pass runs columns first, then complex-to-real rows.
//!
//! Neither direction normalizes: a forward/inverse round trip scales every
//! sample by `bw * bh`.
//!
//! # Example
//!
//! ```rust
//! use fftnr_core::BlockBuffer;
//! use fftnr_ops::fft::BlockTransform;
//! use num_complex::Complex32;
//!
//! let transform = BlockTransform::new(16, 16).unwrap();
//! let mut scratch = transform.make_scratch();
//! let mut input = BlockBuffer::zeroed(16, 16);
//! input.fill(1.0);
//!
//! let mut spectrum = vec![Complex32::new(0.0, 0.0); transform.spectrum_len()];
//! transform.forward(&input, &mut spectrum, &mut scratch).unwrap();
//! assert!((spectrum[0].re - 256.0).abs() < 1e-3);
//! ```

use std::sync::Arc;

use fftnr_core::BlockBuffer;
use num_complex::Complex32;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftPlanner};

use crate::{OpsError, OpsResult};

/// Forward and inverse plans for a fixed block size, shared by all workers.
pub struct BlockTransform {
    width: usize,
    height: usize,
    bins: usize,
    row_forward: Arc<dyn RealToComplex<f32>>,
    row_inverse: Arc<dyn ComplexToReal<f32>>,
    col_forward: Arc<dyn Fft<f32>>,
    col_inverse: Arc<dyn Fft<f32>>,
}

/// Per-thread working memory for [`BlockTransform`].
pub struct TransformScratch {
    row_input: Vec<f32>,
    row_forward: Vec<Complex32>,
    row_inverse: Vec<Complex32>,
    columns: Vec<Complex32>,
    column: Vec<Complex32>,
}

impl BlockTransform {
    /// Plans transforms for `width x height` blocks.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::InvalidDimensions`] unless both sides are even and
    /// at least 2.
    pub fn new(width: usize, height: usize) -> OpsResult<Self> {
        if width < 2 || height < 2 || width % 2 != 0 || height % 2 != 0 {
            return Err(OpsError::InvalidDimensions(format!(
                "block must have even sides >= 2, got {width}x{height}"
            )));
        }

        let mut real_planner = RealFftPlanner::<f32>::new();
        let row_forward = real_planner.plan_fft_forward(width);
        let row_inverse = real_planner.plan_fft_inverse(width);

        let mut planner = FftPlanner::<f32>::new();
        let col_forward = planner.plan_fft_forward(height);
        let col_inverse = planner.plan_fft_inverse(height);

        Ok(Self {
            width,
            height,
            bins: width / 2 + 1,
            row_forward,
            row_inverse,
            col_forward,
            col_inverse,
        })
    }

    /// Block width in samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Block height in samples.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bins per spectrum row (`width / 2 + 1`).
    pub fn bins_per_row(&self) -> usize {
        self.bins
    }

    /// Total bins in one spectrum.
    pub fn spectrum_len(&self) -> usize {
        self.bins * self.height
    }

    /// Gain introduced by a forward/inverse round trip.
    pub fn scale(&self) -> f32 {
        (self.width * self.height) as f32
    }

    /// Allocates working memory sized for these plans.
    pub fn make_scratch(&self) -> TransformScratch {
        let zero = Complex32::new(0.0, 0.0);
        let col_scratch = self
            .col_forward
            .get_inplace_scratch_len()
            .max(self.col_inverse.get_inplace_scratch_len());
        TransformScratch {
            row_input: vec![0.0; self.width],
            row_forward: vec![zero; self.row_forward.get_scratch_len()],
            row_inverse: vec![zero; self.row_inverse.get_scratch_len()],
            columns: vec![zero; self.spectrum_len()],
            column: vec![zero; col_scratch],
        }
    }

    /// Transforms `input` into `spectrum`.
    ///
    /// # Panics
    ///
    /// Panics if `input` or `spectrum` do not match the planned block size.
    pub fn forward(
        &self,
        input: &BlockBuffer,
        spectrum: &mut [Complex32],
        scratch: &mut TransformScratch,
    ) -> OpsResult<()> {
        assert_eq!(input.dimensions(), (self.width, self.height));
        assert_eq!(spectrum.len(), self.spectrum_len());

        for (y, row) in spectrum.chunks_exact_mut(self.bins).enumerate() {
            scratch.row_input.copy_from_slice(input.row(y));
            self.row_forward
                .process_with_scratch(&mut scratch.row_input, row, &mut scratch.row_forward)
                .map_err(|e| OpsError::Transform(format!("row {y} forward: {e}")))?;
        }

        self.columns(spectrum, scratch, &*self.col_forward);
        Ok(())
    }

    /// Transforms `spectrum` back into `output`. The spectrum is consumed as
    /// working memory.
    ///
    /// # Panics
    ///
    /// Panics if `output` or `spectrum` do not match the planned block size.
    pub fn inverse(
        &self,
        spectrum: &mut [Complex32],
        output: &mut BlockBuffer,
        scratch: &mut TransformScratch,
    ) -> OpsResult<()> {
        assert_eq!(output.dimensions(), (self.width, self.height));
        assert_eq!(spectrum.len(), self.spectrum_len());
        output.allocate();

        self.columns(spectrum, scratch, &*self.col_inverse);

        let nyquist = self.bins - 1;
        for (y, row) in spectrum.chunks_exact_mut(self.bins).enumerate() {
            // Hermitian rows carry no imaginary DC or Nyquist term
            row[0].im = 0.0;
            row[nyquist].im = 0.0;
            self.row_inverse
                .process_with_scratch(row, output.row_mut(y), &mut scratch.row_inverse)
                .map_err(|e| OpsError::Transform(format!("row {y} inverse: {e}")))?;
        }
        Ok(())
    }

    /// Runs `plan` over every bin column of `spectrum`.
    fn columns(&self, spectrum: &mut [Complex32], scratch: &mut TransformScratch, plan: &dyn Fft<f32>) {
        let (bins, height) = (self.bins, self.height);

        for (y, row) in spectrum.chunks_exact(bins).enumerate() {
            for (x, &v) in row.iter().enumerate() {
                scratch.columns[x * height + y] = v;
            }
        }

        // One call covers all columns: the buffer is a whole number of plans
        plan.process_with_scratch(&mut scratch.columns, &mut scratch.column);

        for (y, row) in spectrum.chunks_exact_mut(bins).enumerate() {
            for (x, v) in row.iter_mut().enumerate() {
                *v = scratch.columns[x * height + y];
            }
        }
    }
}

impl std::fmt::Debug for BlockTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockTransform")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bins", &self.bins)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_block(width: usize, height: usize) -> BlockBuffer {
        let mut block = BlockBuffer::zeroed(width, height);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 7 + y * 13) % 31) as f32 + (x as f32 * 0.3).sin() * 10.0;
                block.set(x, y, v);
            }
        }
        block
    }

    #[test]
    fn test_rejects_odd_size() {
        assert!(BlockTransform::new(15, 16).is_err());
        assert!(BlockTransform::new(16, 0).is_err());
    }

    #[test]
    fn test_constant_block_dc_only() {
        let t = BlockTransform::new(16, 8).unwrap();
        let mut scratch = t.make_scratch();
        let mut input = BlockBuffer::zeroed(16, 8);
        input.fill(2.0);

        let mut spectrum = vec![Complex32::new(0.0, 0.0); t.spectrum_len()];
        t.forward(&input, &mut spectrum, &mut scratch).unwrap();

        assert!((spectrum[0].re - 256.0).abs() < 1e-3);
        for v in &spectrum[1..] {
            assert!(v.norm() < 1e-3);
        }
    }

    #[test]
    fn test_round_trip() {
        for (w, h) in [(16, 16), (32, 8), (128, 128)] {
            let t = BlockTransform::new(w, h).unwrap();
            let mut scratch = t.make_scratch();
            let input = test_block(w, h);

            let mut spectrum = vec![Complex32::new(0.0, 0.0); t.spectrum_len()];
            t.forward(&input, &mut spectrum, &mut scratch).unwrap();
            let mut output = BlockBuffer::new(w, h);
            t.inverse(&mut spectrum, &mut output, &mut scratch).unwrap();

            let scale = 1.0 / t.scale();
            for y in 0..h {
                for x in 0..w {
                    let diff = (output.get(x, y) * scale - input.get(x, y)).abs();
                    assert!(diff < 1e-3, "{w}x{h} at ({x}, {y}): {diff}");
                }
            }
        }
    }

    #[test]
    fn test_parseval() {
        let (w, h) = (32, 16);
        let t = BlockTransform::new(w, h).unwrap();
        let mut scratch = t.make_scratch();
        let input = test_block(w, h);
        let mut spectrum = vec![Complex32::new(0.0, 0.0); t.spectrum_len()];
        t.forward(&input, &mut spectrum, &mut scratch).unwrap();

        let spatial: f64 = (0..h)
            .flat_map(|y| input.row(y).iter().map(|&v| (v as f64).powi(2)).collect::<Vec<_>>())
            .sum();

        // Columns 1..bins-1 stand for two bins of the full spectrum
        let bins = t.bins_per_row();
        let mut spectral = 0.0f64;
        for (i, v) in spectrum.iter().enumerate() {
            let x = i % bins;
            let weight = if x == 0 || x == bins - 1 { 1.0 } else { 2.0 };
            spectral += weight * (v.norm_sqr() as f64);
        }
        spectral /= (w * h) as f64;
        assert!((spatial - spectral).abs() / spatial < 1e-4);
    }
}
