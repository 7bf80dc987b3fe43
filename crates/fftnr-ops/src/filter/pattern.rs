use std::sync::Arc;

use fftnr_core::{PlaneView, Rect};
use fftnr_math::{GridTerms, Noise};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{FilterShared, GridSample, SpectralFilter, SHARPEN_EPSILON, SKIP_EPSILON};
use crate::fft::BlockTransform;
use crate::freq::FrequencyBlock;
use crate::tiling::tile_plane;
use crate::window::WindowSet;
use crate::{OpsError, OpsResult};

/// Reference noise power per spectrum bin, for fixed-pattern noise.
///
/// Values are in the un-normalized spectrum domain, the same domain as
/// `|X|^2` of a transformed block, so they can be estimated directly from a
/// noise-only region of an image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSpectrum {
    width: usize,
    height: usize,
    values: Vec<f32>,
}

impl PatternSpectrum {
    /// Wraps precomputed powers for `width x height` blocks.
    ///
    /// # Errors
    ///
    /// [`OpsError::SizeMismatch`] unless `values` holds
    /// `height * (width / 2 + 1)` entries.
    pub fn from_values(width: usize, height: usize, values: Vec<f32>) -> OpsResult<Self> {
        let expected = height * (width / 2 + 1);
        if values.len() != expected {
            return Err(OpsError::SizeMismatch(format!(
                "pattern for {width}x{height} needs {expected} bins, got {}",
                values.len()
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// The same power at every bin.
    pub fn flat(width: usize, height: usize, power: f32) -> Self {
        Self {
            width,
            height,
            values: vec![power; height * (width / 2 + 1)],
        }
    }

    /// Averages `|X|^2` over every block that fits inside `rect` of `plane`.
    ///
    /// Blocks are laid edge to edge, with one more flush against the far edge
    /// when the region is not a whole number of blocks. Each is windowed with
    /// `window` so the estimate matches what the filter will see.
    ///
    /// # Errors
    ///
    /// [`OpsError::InvalidDimensions`] if `rect` leaves the plane or is smaller
    /// than one block.
    pub fn estimate(
        plane: &PlaneView<'_>,
        rect: Rect,
        transform: &BlockTransform,
        window: &WindowSet,
    ) -> OpsResult<Self> {
        let (bw, bh) = (transform.width(), transform.height());
        if !rect.fits_within(plane.width(), plane.height()) {
            return Err(OpsError::InvalidDimensions(format!(
                "region {rect:?} outside {}x{} plane",
                plane.width(),
                plane.height()
            )));
        }
        if rect.width < bw || rect.height < bh {
            return Err(OpsError::InvalidDimensions(format!(
                "region {}x{} smaller than {bw}x{bh} block",
                rect.width, rect.height
            )));
        }

        let region = plane.subview(rect);
        let tiles = tile_plane(rect.width, rect.height, bw, bh, 0);
        let mut sums = vec![0.0f64; transform.spectrum_len()];
        let mut block = FrequencyBlock::new(transform);

        for tile in &tiles {
            block.forward(transform, &region.subview(tile.block_rect()), window)?;
            for (sum, c) in sums.iter_mut().zip(block.spectrum()) {
                *sum += c.norm_sqr() as f64;
            }
        }

        let n = tiles.len() as f64;
        debug!(blocks = tiles.len(), ?rect, "estimated pattern spectrum");
        Ok(Self {
            width: bw,
            height: bh,
            values: sums.into_iter().map(|s| (s / n) as f32).collect(),
        })
    }

    /// Block width the spectrum was made for.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Block height the spectrum was made for.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Powers, row-major over the half-spectrum.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub(crate) fn check_size(&self, width: usize, height: usize) -> OpsResult<()> {
        if (self.width, self.height) != (width, height)
            || self.values.len() != height * (width / 2 + 1)
        {
            return Err(OpsError::SizeMismatch(format!(
                "pattern spectrum is {}x{}, blocks are {width}x{height}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    fn negligible(&self, factor: f32) -> bool {
        self.values.iter().all(|&v| v * factor < SKIP_EPSILON)
    }
}

/// Filter driven by a pattern spectrum. Cannot sharpen.
#[derive(Debug, Clone)]
pub struct PatternFilter {
    shared: FilterShared,
    pattern: PatternSpectrum,
    factor: f32,
}

impl PatternFilter {
    /// Builds the filter.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::Unsupported`] if `shared` carries a sharpen mask;
    /// sharpening a pattern needs grid removal, see [`PatternDegridFilter`].
    pub fn new(shared: FilterShared, pattern: PatternSpectrum, factor: f32) -> OpsResult<Self> {
        if shared.sharpen_amount() > SHARPEN_EPSILON {
            return Err(OpsError::Unsupported(
                "pattern filter cannot sharpen without grid removal".into(),
            ));
        }
        Ok(Self {
            shared,
            pattern,
            factor,
        })
    }

    fn noise(&self) -> Noise<'_> {
        Noise::Pattern {
            spectrum: &self.pattern.values,
            factor: self.factor,
        }
    }
}

impl SpectralFilter for PatternFilter {
    fn shared(&self) -> &FilterShared {
        &self.shared
    }

    fn process_no_sharpen(&self, block: &mut FrequencyBlock) {
        let k = self.shared.kernels();
        (k.attenuate)(block.spectrum_mut(), self.noise(), self.shared.lowlimit());
    }

    // never carries a sharpen mask
    fn process_sharpen(&self, block: &mut FrequencyBlock) {
        self.process_no_sharpen(block);
    }

    fn skip_block(&self) -> bool {
        self.pattern.negligible(self.factor)
    }
}

/// Pattern filter with grid removal; sharpening runs as a second pass.
#[derive(Debug, Clone)]
pub struct PatternDegridFilter {
    shared: FilterShared,
    pattern: PatternSpectrum,
    factor: f32,
    degrid: f32,
    grid: Arc<GridSample>,
}

impl PatternDegridFilter {
    /// Builds the filter.
    pub fn new(
        shared: FilterShared,
        pattern: PatternSpectrum,
        factor: f32,
        degrid: f32,
        grid: Arc<GridSample>,
    ) -> Self {
        Self {
            shared,
            pattern,
            factor,
            degrid,
            grid,
        }
    }

    fn noise(&self) -> Noise<'_> {
        Noise::Pattern {
            spectrum: &self.pattern.values,
            factor: self.factor,
        }
    }
}

impl SpectralFilter for PatternDegridFilter {
    fn shared(&self) -> &FilterShared {
        &self.shared
    }

    fn process_no_sharpen(&self, block: &mut FrequencyBlock) {
        let grid = GridTerms::new(self.grid.spectrum(), self.degrid, block.spectrum()[0]);
        let k = self.shared.kernels();
        if grid.fraction == 0.0 {
            (k.attenuate)(block.spectrum_mut(), self.noise(), self.shared.lowlimit());
        } else {
            (k.attenuate_degrid)(block.spectrum_mut(), self.noise(), self.shared.lowlimit(), &grid);
        }
    }

    fn process_sharpen(&self, block: &mut FrequencyBlock) {
        let Some(sharpen) = self.shared.sharpen_terms() else {
            return self.process_no_sharpen(block);
        };
        let grid = GridTerms::new(self.grid.spectrum(), self.degrid, block.spectrum()[0]);
        let k = self.shared.kernels();
        (k.attenuate_degrid_sharpen_two_stage)(
            block.spectrum_mut(),
            self.noise(),
            self.shared.lowlimit(),
            &grid,
            &sharpen,
        );
    }

    fn skip_block(&self) -> bool {
        self.shared.sharpen().is_none() && self.pattern.negligible(self.factor)
    }
}
