//! Padded planar working image.
//!
//! Interleaved 16-bit pixels are unpacked into three `f32` planes in the
//! companded domain, optionally converted to luma/chroma. Each plane carries
//! an `overlap`-wide border on every side so that blocks at the image edge
//! see mirrored content instead of a hard discontinuity.
//!
//! ```text
//! +--------------------------+
//! |  mirrored border (ov)    |
//! |   +------------------+   |
//! |   |  image interior  |   |
//! |   +------------------+   |
//! |                          |
//! +--------------------------+
//! ```

use std::sync::Arc;

use fftnr_core::{BlockBuffer, PlaneView, PlaneViewMut, Rect};
use fftnr_math::KernelSet;
use rayon::prelude::*;
use tracing::trace;

use crate::convert::ConversionContext;
use crate::filter::{ComplexFilter, SpectralFilter};
use crate::image::InterleavedImage;
use crate::job::Job;
use crate::params::ColorMode;
use crate::tiling::tile_plane;
use crate::window::WindowSet;

/// Number of planes in every [`PlanarImage`].
pub const PLANE_COUNT: usize = 3;

/// Three padded `f32` planes.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanarImage {
    width: usize,
    height: usize,
    overlap: usize,
    mode: ColorMode,
    planes: [BlockBuffer; PLANE_COUNT],
}

impl PlanarImage {
    /// Zeroed planes for a `width x height` image with an `overlap` border.
    ///
    /// # Panics
    ///
    /// Panics if a dimension is zero.
    pub fn new(width: usize, height: usize, overlap: usize, mode: ColorMode) -> Self {
        let (pw, ph) = (width + 2 * overlap, height + 2 * overlap);
        Self {
            width,
            height,
            overlap,
            mode,
            planes: std::array::from_fn(|_| BlockBuffer::zeroed(pw, ph)),
        }
    }

    /// Image width without the border.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height without the border.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Border width on each side.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Color representation of the planes.
    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Number of planes.
    pub fn plane_count(&self) -> usize {
        self.planes.len()
    }

    /// Plane size including the border.
    pub fn padded_dimensions(&self) -> (usize, usize) {
        (self.width + 2 * self.overlap, self.height + 2 * self.overlap)
    }

    /// Image region within a padded plane.
    pub fn interior_rect(&self) -> Rect {
        Rect::new(self.overlap, self.overlap, self.width, self.height)
    }

    /// Padded plane `index`.
    pub fn plane(&self, index: usize) -> &BlockBuffer {
        &self.planes[index]
    }

    /// Mutable padded plane `index`.
    pub fn plane_mut(&mut self, index: usize) -> &mut BlockBuffer {
        &mut self.planes[index]
    }

    /// Image samples of plane `index`, without the border.
    pub fn interior(&self, index: usize) -> PlaneView<'_> {
        self.planes[index].slice(self.interior_rect())
    }

    /// Mutable image samples of plane `index`, without the border.
    pub fn interior_mut(&mut self, index: usize) -> PlaneViewMut<'_> {
        let rect = self.interior_rect();
        self.planes[index].slice_mut(rect)
    }

    /// Fills the interiors from interleaved pixels.
    ///
    /// The first three channels are companded; in YUV mode they are then
    /// white-balanced by `red`/`blue` and converted to luma/chroma.
    ///
    /// # Panics
    ///
    /// Panics if the image size differs or it has fewer than three channels.
    pub fn unpack_interleaved(
        &mut self,
        image: &InterleavedImage<'_>,
        ctx: &ConversionContext,
        red: f32,
        blue: f32,
    ) {
        assert_eq!((image.width(), image.height()), (self.width, self.height), "image size");
        assert!(image.channels() >= PLANE_COUNT, "need at least three channels");
        trace!(width = self.width, height = self.height, mode = ?self.mode, "unpack");

        let (ov, width, height, mode) = (self.overlap, self.width, self.height, self.mode);
        let pitch = self.planes[0].pitch();
        let [p0, p1, p2] = &mut self.planes;

        p0.data_mut()
            .par_chunks_mut(pitch)
            .zip(p1.data_mut().par_chunks_mut(pitch))
            .zip(p2.data_mut().par_chunks_mut(pitch))
            .skip(ov)
            .take(height)
            .enumerate()
            .for_each(|(y, ((r0, r1), r2))| {
                for x in 0..width {
                    let px = image.pixel(x, y);
                    let mut v = [ctx.to_float(px[0]), ctx.to_float(px[1]), ctx.to_float(px[2])];
                    if mode == ColorMode::Yuv {
                        v = ctx.rgb_to_yuv(v, red, blue);
                    }
                    r0[ov + x] = v[0];
                    r1[ov + x] = v[1];
                    r2[ov + x] = v[2];
                }
            });
    }

    /// Writes the interiors back as interleaved pixels, the inverse of
    /// [`PlanarImage::unpack_interleaved`]. Channels past the third are
    /// left untouched.
    ///
    /// # Panics
    ///
    /// Panics if the image size differs or it has fewer than three channels.
    pub fn pack_interleaved(
        &self,
        image: &mut InterleavedImage<'_>,
        ctx: &ConversionContext,
        red: f32,
        blue: f32,
    ) {
        assert_eq!((image.width(), image.height()), (self.width, self.height), "image size");
        assert!(image.channels() >= PLANE_COUNT, "need at least three channels");
        trace!(width = self.width, height = self.height, mode = ?self.mode, "pack");

        let (ov, width, height, mode) = (self.overlap, self.width, self.height, self.mode);
        let pitch = self.planes[0].pitch();
        let (row_stride, pixel_stride) = (image.row_stride(), image.pixel_stride());
        let [p0, p1, p2] = &self.planes;

        image
            .pixels_mut()
            .par_chunks_mut(row_stride)
            .take(height)
            .zip(
                p0.data()
                    .par_chunks(pitch)
                    .zip(p1.data().par_chunks(pitch))
                    .zip(p2.data().par_chunks(pitch))
                    .skip(ov),
            )
            .for_each(|(out, ((r0, r1), r2))| {
                for x in 0..width {
                    let mut v = [r0[ov + x], r1[ov + x], r2[ov + x]];
                    if mode == ColorMode::Yuv {
                        v = ctx.yuv_to_rgb(v, red, blue);
                    }
                    let px = &mut out[x * pixel_stride..x * pixel_stride + PLANE_COUNT];
                    for (dst, p) in px.iter_mut().zip(v) {
                        *dst = ctx.to_u16(p);
                    }
                }
            });
    }

    /// Mirrors every plane's interior into its border.
    pub fn mirror_edges(&mut self) {
        let ov = self.overlap;
        self.planes.par_iter_mut().for_each(|p| p.mirror_edges(ov, ov));
    }

    /// Tiles every plane into jobs reading from this image.
    ///
    /// `filters` holds one filter per plane. Jobs of planes whose filter
    /// would not change anything are marked skipped.
    ///
    /// # Panics
    ///
    /// Panics if `filters` does not have one entry per plane.
    pub fn jobs(
        self: &Arc<Self>,
        filters: &[Arc<ComplexFilter>],
        window: &Arc<WindowSet>,
        block_width: usize,
        block_height: usize,
    ) -> Vec<Job> {
        assert_eq!(filters.len(), self.planes.len(), "one filter per plane");
        let (pw, ph) = self.padded_dimensions();
        let tiles = tile_plane(pw, ph, block_width, block_height, self.overlap);

        let mut jobs = Vec::with_capacity(tiles.len() * filters.len());
        for (plane, filter) in filters.iter().enumerate() {
            let skip = filter.skip_block();
            for &tile in &tiles {
                let mut job =
                    Job::new(Arc::clone(self), plane, tile, Arc::clone(filter), Arc::clone(window));
                if skip {
                    job.mark_skipped();
                }
                jobs.push(job);
            }
        }
        jobs
    }

    /// Writes the interior of a finished job into its plane.
    ///
    /// Filtered output is scaled by `1 / (width * height)` of the block to
    /// undo the un-normalized transform; skipped jobs copy their input.
    ///
    /// # Panics
    ///
    /// Panics if the job's output is missing or lies outside this image.
    pub fn apply_slice(&mut self, job: &Job, kernels: &KernelSet) {
        let tile = job.tile();
        let dst_rect = tile.write_rect();
        let src_rect = tile.write_rect_in_block();
        let plane = &mut self.planes[job.plane()];
        assert!(
            dst_rect.fits_within(plane.width(), plane.height()),
            "write rect {dst_rect:?} outside plane"
        );

        if job.is_skipped() {
            plane.slice_mut(dst_rect).copy_from(&job.input().subview(src_rect));
            return;
        }

        let output = job.output();
        assert!(output.is_allocated(), "job finished without output");
        let scale = 1.0 / (tile.width * tile.height) as f32;
        for row in 0..dst_rect.height {
            let src = &output.row(src_rect.y + row)[src_rect.x..src_rect.right()];
            let dst = &mut plane.row_mut(dst_rect.y + row)[dst_rect.x..dst_rect.right()];
            (kernels.scale_copy)(src, dst, scale);
        }
    }
}
