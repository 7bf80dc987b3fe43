//! # fftnr-ops
//!
//! Multi-threaded block FFT denoiser for 16-bit interleaved images.
//!
//! Each plane is cut into overlapping blocks, every block is windowed and
//! transformed, a per-bin Wiener gain suppresses noise in the frequency
//! domain, and the inverse transforms are stitched back together.
//!
//! # Modules
//!
//! - [`denoiser`] - Session orchestration and cancellation
//! - [`filter`] - Wiener, pattern and degrid filter variants
//! - [`fft`] - Real 2-D block transform
//! - [`window`] - Analysis and synthesis tapers
//! - [`tiling`] - Overlapped block placement
//! - [`planar`] - Padded working planes, unpack and pack
//! - [`job`], [`worker`] - Job queues and the worker pool
//! - [`params`] - Parameters and configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use fftnr_ops::{DenoiseParams, Denoiser, InterleavedImage};
//!
//! let params = DenoiseParams {
//!     sigma_luma: 3.0,
//!     sigma_chroma: 5.0,
//!     ..Default::default()
//! };
//! let denoiser = Denoiser::new(params)?;
//!
//! let mut pixels = vec![0u16; 1024 * 768 * 3];
//! let mut image = InterleavedImage::new(&mut pixels, 1024, 768, 3)?;
//! denoiser.denoise(&mut image)?;
//! # Ok::<(), fftnr_ops::OpsError>(())
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
pub mod convert;
pub mod denoiser;
pub mod fft;
pub mod filter;
pub mod freq;
pub mod image;
pub mod job;
pub mod params;
pub mod planar;
pub mod tiling;
pub mod window;
pub mod worker;

pub use convert::ConversionContext;
pub use denoiser::{AbortHandle, Denoiser, Outcome, SkipReason};
pub use error::{OpsError, OpsResult};
pub use fft::BlockTransform;
pub use filter::{ComplexFilter, PatternSpectrum, SpectralFilter};
pub use freq::FrequencyBlock;
pub use image::InterleavedImage;
pub use params::{ColorMode, DenoiseParams, DenoiserConfig, SharpenParams};
pub use planar::PlanarImage;
pub use window::{WindowKind, WindowSet};

pub use fftnr_core::Rect;
pub use fftnr_math::SimdLevel;
