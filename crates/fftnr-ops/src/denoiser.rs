//! Denoising session: planning, dispatch and reconstruction.
//!
//! A [`Denoiser`] owns everything that depends only on block geometry and
//! parameters: transform plans, windows, the grid sample, one filter per
//! plane and the worker pool. A call to [`Denoiser::denoise`] then runs
//!
//! 1. unpack and compand the interleaved pixels into padded planes
//! 2. mirror the planes into their borders
//! 3. tile every plane into jobs and hand them to the workers
//! 4. merge finished blocks into a fresh output image as they arrive
//! 5. pack the output back into the caller's buffer
//!
//! # Example
//!
//! ```rust,no_run
//! use fftnr_ops::{DenoiseParams, Denoiser, InterleavedImage, Outcome};
//!
//! let mut pixels = vec![1000u16; 512 * 512 * 3];
//! let mut image = InterleavedImage::new(&mut pixels, 512, 512, 3)?;
//! let denoiser = Denoiser::new(DenoiseParams::default())?;
//! match denoiser.denoise(&mut image)? {
//!     Outcome::Completed { blocks } => println!("{blocks} blocks"),
//!     other => println!("not denoised: {other:?}"),
//! }
//! # Ok::<(), fftnr_ops::OpsError>(())
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fftnr_core::Rect;
use fftnr_math::{KernelSet, SimdLevel};
use tracing::{debug, info, trace};

use crate::convert::ConversionContext;
use crate::fft::BlockTransform;
use crate::filter::{ComplexFilter, GridSample, PatternSpectrum};
use crate::image::InterleavedImage;
use crate::job::{Job, JobQueue};
use crate::params::{DenoiseParams, DenoiserConfig};
use crate::planar::{PlanarImage, PLANE_COUNT};
use crate::window::WindowSet;
use crate::worker::WorkerPool;
use crate::{OpsError, OpsResult};

/// How often the orchestrator wakes to check the abort flag.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Result of one denoise call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every block was processed and written back.
    Completed {
        /// Blocks processed across all planes, skipped ones included.
        blocks: usize,
    },
    /// The image was left untouched.
    Skipped(SkipReason),
    /// Cancelled through the [`AbortHandle`]; the image was left untouched.
    Aborted,
}

/// Why an image was not denoised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Smaller than one block.
    TooSmall,
    /// Fewer than three channels.
    UnsupportedChannels,
    /// Undemosaiced sensor data.
    Mosaic,
}

/// Cooperative cancellation flag shared with a [`Denoiser`].
///
/// The flag is sticky: once set, every denoise call returns
/// [`Outcome::Aborted`] until [`AbortHandle::reset`] is called.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    /// Requests cancellation.
    pub fn abort(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clears the request.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }

    /// `true` once cancellation was requested.
    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

enum Run {
    Completed { output: PlanarImage, blocks: usize },
    Aborted(PlanarImage),
}

/// A block FFT denoiser with its own worker threads.
pub struct Denoiser {
    params: DenoiseParams,
    config: DenoiserConfig,
    kernels: KernelSet,
    transform: Arc<BlockTransform>,
    window: Arc<WindowSet>,
    grid: Arc<GridSample>,
    filters: Vec<Arc<ComplexFilter>>,
    conversion: ConversionContext,
    pool: WorkerPool,
    abort: AbortHandle,
}

impl Denoiser {
    /// Creates a denoiser with the default [`DenoiserConfig`].
    pub fn new(params: DenoiseParams) -> OpsResult<Self> {
        Self::with_config(params, DenoiserConfig::default())
    }

    /// Creates a denoiser and spawns its workers.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid parameters or configuration, or if the
    /// worker threads cannot be spawned.
    pub fn with_config(params: DenoiseParams, config: DenoiserConfig) -> OpsResult<Self> {
        config.validate()?;
        params.validate()?;

        let (bw, bh) = (config.block_width, config.block_height);
        let kernels = config.simd.map_or_else(KernelSet::detect, KernelSet::for_level);
        let transform = Arc::new(BlockTransform::new(bw, bh)?);
        let window = Arc::new(WindowSet::with_kernels(config.window, bw, bh, config.overlap, kernels)?);
        let grid = Arc::new(GridSample::new(&transform, &window)?);
        let filters = build_filters(&params, bw, bh, &grid, kernels)?;
        let pool = WorkerPool::new(config.worker_count(), Arc::clone(&transform), config.batch_percent)?;

        info!(
            block_width = bw,
            block_height = bh,
            overlap = config.overlap,
            workers = pool.len(),
            simd = %kernels.level(),
            mode = ?params.mode,
            "denoiser ready"
        );

        Ok(Self {
            params,
            config,
            kernels,
            transform,
            window,
            grid,
            filters,
            conversion: ConversionContext::new(),
            pool,
            abort: AbortHandle::default(),
        })
    }

    /// Replaces the parameters, rebuilding the filters but keeping the workers.
    pub fn set_params(&mut self, params: DenoiseParams) -> OpsResult<()> {
        params.validate()?;
        let (bw, bh) = self.block_size();
        self.filters = build_filters(&params, bw, bh, &self.grid, self.kernels)?;
        debug!(filters = ?self.filters.iter().map(|f| f.name()).collect::<Vec<_>>(), "parameters updated");
        self.params = params;
        Ok(())
    }

    /// Current parameters.
    pub fn params(&self) -> &DenoiseParams {
        &self.params
    }

    /// Session configuration.
    pub fn config(&self) -> &DenoiserConfig {
        &self.config
    }

    /// Handle that cancels running and future denoise calls.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Number of worker threads.
    pub fn worker_count(&self) -> usize {
        self.pool.len()
    }

    /// Block width and height.
    pub fn block_size(&self) -> (usize, usize) {
        (self.transform.width(), self.transform.height())
    }

    /// Samples shared between neighbouring blocks.
    pub fn overlap(&self) -> usize {
        self.config.overlap
    }

    /// Kernel tier in use.
    pub fn simd_level(&self) -> SimdLevel {
        self.kernels.level()
    }

    /// Denoises `image` in place.
    ///
    /// Images that cannot be processed are left untouched and reported as
    /// [`Outcome::Skipped`]. An abort leaves the image untouched as well.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::WorkerLost`] if a worker thread died mid-run.
    pub fn denoise(&self, image: &mut InterleavedImage<'_>) -> OpsResult<Outcome> {
        trace!(
            width = image.width(),
            height = image.height(),
            channels = image.channels(),
            "denoise"
        );
        if let Some(reason) = self.check_image(image) {
            debug!(?reason, width = image.width(), height = image.height(), "image skipped");
            return Ok(Outcome::Skipped(reason));
        }
        if self.abort.is_aborted() {
            debug!("abort requested before unpack");
            return Ok(Outcome::Aborted);
        }

        let start = Instant::now();
        let (red, blue) = self.white_balance();
        let mut planar = PlanarImage::new(image.width(), image.height(), self.overlap(), self.params.mode);
        planar.unpack_interleaved(image, &self.conversion, red, blue);
        planar.mirror_edges();

        match self.run(planar)? {
            Run::Completed { output, blocks } => {
                output.pack_interleaved(image, &self.conversion, red, blue);
                info!(
                    width = image.width(),
                    height = image.height(),
                    blocks,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "denoise complete"
                );
                Ok(Outcome::Completed { blocks })
            }
            Run::Aborted(_) => Ok(Outcome::Aborted),
        }
    }

    /// Denoises planes that are already unpacked.
    ///
    /// The interiors are read and replaced; borders are re-mirrored first.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::SizeMismatch`] if the border width or color mode
    /// differs from this denoiser's.
    pub fn denoise_planes(&self, planes: &mut PlanarImage) -> OpsResult<Outcome> {
        trace!(width = planes.width(), height = planes.height(), "denoise planes");
        if planes.overlap() != self.overlap() || planes.mode() != self.params.mode {
            return Err(OpsError::SizeMismatch(format!(
                "planes have overlap {} and mode {:?}, denoiser expects {} and {:?}",
                planes.overlap(),
                planes.mode(),
                self.overlap(),
                self.params.mode
            )));
        }
        let (bw, bh) = self.block_size();
        if planes.width() < bw || planes.height() < bh {
            debug!(width = planes.width(), height = planes.height(), "planes skipped");
            return Ok(Outcome::Skipped(SkipReason::TooSmall));
        }
        if self.abort.is_aborted() {
            return Ok(Outcome::Aborted);
        }

        planes.mirror_edges();
        let placeholder = PlanarImage::new(1, 1, 0, planes.mode());
        let source = std::mem::replace(planes, placeholder);
        match self.run(source)? {
            Run::Completed { output, blocks } => {
                *planes = output;
                Ok(Outcome::Completed { blocks })
            }
            Run::Aborted(source) => {
                *planes = source;
                Ok(Outcome::Aborted)
            }
        }
    }

    /// Estimates one pattern spectrum per plane from a noise-only `region`.
    ///
    /// The image is unpacked with the current mode and white balance, so the
    /// result can be fed back through [`DenoiseParams::patterns`].
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::Unsupported`] for images the denoiser would skip
    /// and [`OpsError::InvalidDimensions`] if `region` is outside the image
    /// or smaller than one block.
    pub fn estimate_patterns(
        &self,
        image: &InterleavedImage<'_>,
        region: Rect,
    ) -> OpsResult<Vec<PatternSpectrum>> {
        if let Some(reason) = self.check_image(image) {
            if reason != SkipReason::TooSmall {
                return Err(OpsError::Unsupported(format!("cannot estimate pattern: {reason:?}")));
            }
        }
        let (red, blue) = self.white_balance();
        let mut planar = PlanarImage::new(image.width(), image.height(), 0, self.params.mode);
        planar.unpack_interleaved(image, &self.conversion, red, blue);

        (0..PLANE_COUNT)
            .map(|i| PatternSpectrum::estimate(&planar.interior(i), region, &self.transform, &self.window))
            .collect()
    }

    fn check_image(&self, image: &InterleavedImage<'_>) -> Option<SkipReason> {
        let (bw, bh) = self.block_size();
        if image.filters() != 0 {
            Some(SkipReason::Mosaic)
        } else if image.channels() < PLANE_COUNT {
            Some(SkipReason::UnsupportedChannels)
        } else if image.width() < bw || image.height() < bh {
            Some(SkipReason::TooSmall)
        } else {
            None
        }
    }

    fn white_balance(&self) -> (f32, f32) {
        (self.params.red_correction, self.params.blue_correction)
    }

    fn run(&self, source: PlanarImage) -> OpsResult<Run> {
        let (bw, bh) = self.block_size();
        let (width, height, mode) = (source.width(), source.height(), source.mode());
        let source = Arc::new(source);

        let jobs = source.jobs(&self.filters, &self.window, bw, bh);
        let blocks = jobs.len();
        let (skipped, pending): (Vec<Job>, Vec<Job>) = jobs.into_iter().partition(Job::is_skipped);
        debug!(blocks, skipped = skipped.len(), "tiled planes");

        if self.abort.is_aborted() {
            debug!("abort requested before dispatch");
            drop((skipped, pending));
            return Ok(Run::Aborted(reclaim(source)));
        }

        let mut output = PlanarImage::new(width, height, self.overlap(), mode);
        for job in skipped {
            output.apply_slice(&job, &self.kernels);
        }

        let waiting = Arc::new(JobQueue::new());
        let finished = Arc::new(JobQueue::new());
        let mut expected = pending.len();
        waiting.add_jobs(pending);
        self.pool.dispatch(&waiting, &finished);

        let mut merged = 0;
        let mut aborted = false;
        while merged < expected {
            if !aborted && self.abort.is_aborted() {
                let removed = waiting.remove_remaining();
                expected -= removed;
                aborted = true;
                debug!(removed, in_flight = expected - merged, "abort requested, draining");
                continue;
            }
            match finished.wait_for_job_timeout(POLL_INTERVAL) {
                Some(job) => {
                    if !aborted {
                        output.apply_slice(&job, &self.kernels);
                    }
                    merged += 1;
                }
                None => {
                    if let Some(id) = self.pool.lost_worker() {
                        waiting.remove_remaining();
                        return Err(OpsError::WorkerLost(id));
                    }
                }
            }
        }

        if aborted {
            return Ok(Run::Aborted(reclaim(source)));
        }
        Ok(Run::Completed { output, blocks })
    }
}

impl std::fmt::Debug for Denoiser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Denoiser")
            .field("params", &self.params)
            .field("config", &self.config)
            .field("simd", &self.kernels.level())
            .field("workers", &self.pool.len())
            .finish()
    }
}

fn build_filters(
    params: &DenoiseParams,
    width: usize,
    height: usize,
    grid: &Arc<GridSample>,
    kernels: KernelSet,
) -> OpsResult<Vec<Arc<ComplexFilter>>> {
    (0..PLANE_COUNT)
        .map(|plane| {
            let filter = ComplexFilter::build(width, height, &params.plane_settings(plane), grid, kernels)?;
            trace!(plane, filter = filter.name(), "filter built");
            Ok(Arc::new(filter))
        })
        .collect()
}

/// Takes the source back once every job referencing it is gone.
fn reclaim(source: Arc<PlanarImage>) -> PlanarImage {
    Arc::try_unwrap(source).unwrap_or_else(|shared| (*shared).clone())
}
