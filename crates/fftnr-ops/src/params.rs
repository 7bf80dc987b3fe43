//! Denoiser parameters and session configuration.
//!
//! [`DenoiseParams`] carries the user-facing filter strengths and is
//! serializable; every field has a default so partial JSON is accepted.
//! [`DenoiserConfig`] fixes the session geometry (block size, overlap, worker
//! count) and cannot change without rebuilding the denoiser.
//!
//! Noise levels are standard deviations in the companded (square-root)
//! sample domain.
//!
//! # Example
//!
//! ```rust
//! use fftnr_ops::{ColorMode, DenoiseParams};
//!
//! let params: DenoiseParams = serde_json::from_str(r#"{"sigma_luma": 3.5}"#).unwrap();
//! assert_eq!(params.sigma_luma, 3.5);
//! assert_eq!(params.mode, ColorMode::Yuv);
//! assert!(params.validate().is_ok());
//! ```

use fftnr_math::SimdLevel;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::filter::{PatternSpectrum, SHARPEN_EPSILON};
use crate::window::WindowKind;
use crate::{OpsError, OpsResult};

/// Color representation the planes are filtered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Filter R, G and B independently with the luma settings.
    Rgb,
    /// Filter Y with the luma settings and Cb/Cr with the chroma settings.
    #[default]
    Yuv,
}

/// Frequency-selective sharpening settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharpenParams {
    /// Strength; values at or below 0.001 disable sharpening.
    pub amount: f32,
    /// Radial falloff of the sharpen mask, relative to half the block.
    pub cutoff: f32,
    /// Noise level below which sharpening fades out.
    pub sigma_min: f32,
    /// Signal level above which sharpening fades out.
    pub sigma_max: f32,
}

impl Default for SharpenParams {
    fn default() -> Self {
        Self {
            amount: 0.0,
            cutoff: 0.3,
            sigma_min: 4.0,
            sigma_max: 20.0,
        }
    }
}

impl SharpenParams {
    /// `true` when the amount is large enough to change the output.
    pub fn is_enabled(&self) -> bool {
        self.amount > SHARPEN_EPSILON
    }

    fn validate(&self, what: &str) -> OpsResult<()> {
        finite_non_negative(&format!("{what}.amount"), self.amount)?;
        if !(self.cutoff.is_finite() && self.cutoff > 0.0) {
            return Err(OpsError::invalid_param(format!(
                "{what}.cutoff must be positive, got {}",
                self.cutoff
            )));
        }
        finite_non_negative(&format!("{what}.sigma_min"), self.sigma_min)?;
        finite_non_negative(&format!("{what}.sigma_max"), self.sigma_max)?;
        if self.is_enabled() && self.sigma_min >= self.sigma_max {
            warn!(
                sigma_min = self.sigma_min,
                sigma_max = self.sigma_max,
                "{what}: sharpen band is empty or inverted"
            );
        }
        Ok(())
    }
}

/// Filter strengths for one denoising session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseParams {
    /// RGB or luma/chroma filtering.
    pub mode: ColorMode,
    /// Noise level of the luma plane (all planes in RGB mode).
    pub sigma_luma: f32,
    /// Noise level of the chroma planes.
    pub sigma_chroma: f32,
    /// Wiener floor control; the minimum gain is `(beta - 1) / beta`.
    pub beta: f32,
    /// Share of the windowing grid removed before filtering, 0 to 1.
    pub degrid: f32,
    /// Sharpening of the luma plane (all planes in RGB mode).
    pub sharpen_luma: SharpenParams,
    /// Sharpening of the chroma planes.
    pub sharpen_chroma: SharpenParams,
    /// Red white-balance correction applied before the luma/chroma matrix.
    pub red_correction: f32,
    /// Blue white-balance correction applied before the luma/chroma matrix.
    pub blue_correction: f32,
    /// Optional per-plane noise spectra; empty or one per plane.
    pub patterns: Vec<PatternSpectrum>,
    /// Multiplier applied to the pattern spectra.
    pub pattern_factor: f32,
}

impl Default for DenoiseParams {
    fn default() -> Self {
        Self {
            mode: ColorMode::Yuv,
            sigma_luma: 2.0,
            sigma_chroma: 2.0,
            beta: 1.0,
            degrid: 1.0,
            sharpen_luma: SharpenParams::default(),
            sharpen_chroma: SharpenParams::default(),
            red_correction: 1.0,
            blue_correction: 1.0,
            patterns: Vec::new(),
            pattern_factor: 1.0,
        }
    }
}

/// Resolved settings for the filter of one plane.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaneSettings {
    /// Noise standard deviation.
    pub sigma: f32,
    /// Wiener floor control.
    pub beta: f32,
    /// Grid removal share.
    pub degrid: f32,
    /// Sharpening.
    pub sharpen: SharpenParams,
    /// Pattern spectrum and its multiplier, if pattern filtering is used.
    pub pattern: Option<(PatternSpectrum, f32)>,
}

impl DenoiseParams {
    /// Number of planes a session filters.
    pub const PLANES: usize = 3;

    /// Checks ranges and feature combinations.
    ///
    /// # Errors
    ///
    /// [`OpsError::InvalidParameter`] for out-of-range values and
    /// [`OpsError::Unsupported`] for sharpening a pattern filter without
    /// grid removal.
    pub fn validate(&self) -> OpsResult<()> {
        finite_non_negative("sigma_luma", self.sigma_luma)?;
        finite_non_negative("sigma_chroma", self.sigma_chroma)?;
        if !(self.beta.is_finite() && self.beta >= 1.0) {
            return Err(OpsError::invalid_param(format!(
                "beta must be >= 1, got {}",
                self.beta
            )));
        }
        if !(0.0..=1.0).contains(&self.degrid) {
            return Err(OpsError::invalid_param(format!(
                "degrid must be in 0..=1, got {}",
                self.degrid
            )));
        }
        self.sharpen_luma.validate("sharpen_luma")?;
        self.sharpen_chroma.validate("sharpen_chroma")?;
        for (name, v) in [
            ("red_correction", self.red_correction),
            ("blue_correction", self.blue_correction),
        ] {
            if !(v.is_finite() && v > 0.0) {
                return Err(OpsError::invalid_param(format!("{name} must be positive, got {v}")));
            }
        }
        finite_non_negative("pattern_factor", self.pattern_factor)?;

        if !self.patterns.is_empty() {
            if self.patterns.len() != Self::PLANES {
                return Err(OpsError::invalid_param(format!(
                    "expected {} pattern spectra, got {}",
                    Self::PLANES,
                    self.patterns.len()
                )));
            }
            let sharpen = self.sharpen_luma.is_enabled()
                || (self.mode == ColorMode::Yuv && self.sharpen_chroma.is_enabled());
            if sharpen && self.degrid == 0.0 {
                return Err(OpsError::Unsupported(
                    "sharpening with a pattern spectrum requires degrid > 0".into(),
                ));
            }
        }

        if self.sigma_luma > 100.0 || self.sigma_chroma > 100.0 {
            warn!(
                sigma_luma = self.sigma_luma,
                sigma_chroma = self.sigma_chroma,
                "noise level exceeds companded sample range"
            );
        }
        Ok(())
    }

    /// Settings for plane `plane`: luma for plane 0 (every plane in RGB
    /// mode), chroma for planes 1 and 2 in YUV mode.
    pub fn plane_settings(&self, plane: usize) -> PlaneSettings {
        let chroma = self.mode == ColorMode::Yuv && plane > 0;
        let (sigma, sharpen) = if chroma {
            (self.sigma_chroma, self.sharpen_chroma)
        } else {
            (self.sigma_luma, self.sharpen_luma)
        };
        PlaneSettings {
            sigma,
            beta: self.beta,
            degrid: self.degrid,
            sharpen,
            pattern: self
                .patterns
                .get(plane)
                .map(|p| (p.clone(), self.pattern_factor)),
        }
    }
}

fn finite_non_negative(name: &str, v: f32) -> OpsResult<()> {
    if v.is_finite() && v >= 0.0 {
        Ok(())
    } else {
        Err(OpsError::invalid_param(format!("{name} must be finite and >= 0, got {v}")))
    }
}

/// Session geometry and threading.
#[derive(Debug, Clone, PartialEq)]
pub struct DenoiserConfig {
    /// Block width; even, at least 8.
    pub block_width: usize,
    /// Block height; even, at least 8.
    pub block_height: usize,
    /// Samples shared between neighbouring blocks.
    pub overlap: usize,
    /// Worker threads; `None` uses one per logical CPU.
    pub workers: Option<usize>,
    /// Share of the waiting queue a worker claims at once, 1 to 100.
    pub batch_percent: usize,
    /// Analysis window shape.
    pub window: WindowKind,
    /// Kernel tier; `None` detects the CPU.
    pub simd: Option<SimdLevel>,
}

impl Default for DenoiserConfig {
    fn default() -> Self {
        Self {
            block_width: 128,
            block_height: 128,
            overlap: 16,
            workers: None,
            batch_percent: 10,
            window: WindowKind::HalfCosine,
            simd: None,
        }
    }
}

impl DenoiserConfig {
    /// Checks block geometry and threading settings.
    pub fn validate(&self) -> OpsResult<()> {
        for (name, side) in [("block_width", self.block_width), ("block_height", self.block_height)] {
            if side < 8 || side % 2 != 0 {
                return Err(OpsError::invalid_param(format!(
                    "{name} must be even and >= 8, got {side}"
                )));
            }
        }
        if 2 * self.overlap >= self.block_width.min(self.block_height) {
            return Err(OpsError::invalid_param(format!(
                "overlap {} leaves no interior in {}x{} blocks",
                self.overlap, self.block_width, self.block_height
            )));
        }
        if self.workers == Some(0) {
            return Err(OpsError::invalid_param("workers must be at least 1"));
        }
        if !(1..=100).contains(&self.batch_percent) {
            return Err(OpsError::invalid_param(format!(
                "batch_percent must be in 1..=100, got {}",
                self.batch_percent
            )));
        }
        Ok(())
    }

    /// Worker count after resolving `None` to the CPU count.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}
