//! # fftnr-math
//!
//! Per-sample and per-bin kernels for frequency-domain denoising.
//!
//! - [`scalar`] - Reference kernels (window multiply, Wiener/sharpen/degrid attenuation)
//! - [`simd`] - The same kernels on `wide::f32x8`
//! - [`KernelSet`] - Function table chosen once per session via [`SimdLevel::detect`]
//! - [`Noise`], [`SharpenTerms`], [`GridTerms`] - Per-bin kernel inputs
//!
//! # Attenuation Model
//!
//! ```text
//! psd    = |X|^2 + 1e-15
//! factor = max((psd - noise) / psd, lowlimit)
//! sharp  = 1 + w * sqrt(psd * smax / ((psd + smin) * (psd + smax)))
//! X'     = X * factor [* sharp]
//! ```
//!
//! # Dependencies
//!
//! - [`wide`] - Portable SIMD on stable Rust
//! - [`num_complex`] - Spectrum bins
//! - `fftnr-core` - Vector lane width

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod dispatch;
pub mod scalar;
pub mod simd;
mod terms;

pub use dispatch::*;
pub use terms::*;

pub use num_complex::Complex32;
