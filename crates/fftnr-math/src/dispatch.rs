//! Runtime kernel selection.
//!
//! The CPU is queried once per session; the resulting [`KernelSet`] is a
//! plain table of function pointers that filters and block transforms call
//! without further branching.
//!
//! ```rust
//! use fftnr_math::{KernelSet, SimdLevel};
//!
//! let kernels = KernelSet::for_level(SimdLevel::detect());
//! let mut dst = [0.0f32; 4];
//! (kernels.scale_copy)(&[1.0, 2.0, 3.0, 4.0], &mut dst, 0.5);
//! assert_eq!(dst, [0.5, 1.0, 1.5, 2.0]);
//! ```

use std::fmt;

use num_complex::Complex32;

use crate::terms::{GridTerms, Noise, SharpenTerms};
use crate::{scalar, simd};

/// Instruction-set tier for the spectral kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimdLevel {
    /// Plain Rust loops.
    Scalar,
    /// Eight-lane `wide` vectors.
    Wide,
}

impl SimdLevel {
    /// Best level supported by the running CPU.
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            if std::arch::is_x86_feature_detected!("avx")
                || std::arch::is_x86_feature_detected!("sse2")
            {
                return SimdLevel::Wide;
            }
        }
        #[cfg(target_arch = "aarch64")]
        {
            if std::arch::is_aarch64_feature_detected!("neon") {
                return SimdLevel::Wide;
            }
        }
        SimdLevel::Scalar
    }

    /// Short lowercase name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            SimdLevel::Scalar => "scalar",
            SimdLevel::Wide => "wide",
        }
    }
}

impl fmt::Display for SimdLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Multiplies a row by window weights.
pub type WindowFn = fn(src: &[f32], win: &[f32], dst: &mut [f32]);
/// Copies a row with a constant gain.
pub type ScaleFn = fn(src: &[f32], dst: &mut [f32], scale: f32);
/// Wiener attenuation.
pub type AttenuateFn = fn(bins: &mut [Complex32], noise: Noise<'_>, lowlimit: f32);
/// Wiener attenuation with sharpening.
pub type AttenuateSharpenFn =
    fn(bins: &mut [Complex32], noise: Noise<'_>, lowlimit: f32, sharpen: &SharpenTerms<'_>);
/// Degridded Wiener attenuation.
pub type AttenuateDegridFn =
    fn(bins: &mut [Complex32], noise: Noise<'_>, lowlimit: f32, grid: &GridTerms<'_>);
/// Degridded Wiener attenuation with sharpening.
pub type AttenuateDegridSharpenFn = fn(
    bins: &mut [Complex32],
    noise: Noise<'_>,
    lowlimit: f32,
    grid: &GridTerms<'_>,
    sharpen: &SharpenTerms<'_>,
);

/// Function table for one [`SimdLevel`].
#[derive(Clone, Copy)]
pub struct KernelSet {
    level: SimdLevel,
    /// Analysis-window multiply.
    pub apply_window: WindowFn,
    /// Scaled row copy (inverse-transform normalization on merge).
    pub scale_copy: ScaleFn,
    /// Plain Wiener attenuation.
    pub attenuate: AttenuateFn,
    /// Wiener attenuation times the sharpen factor.
    pub attenuate_sharpen: AttenuateSharpenFn,
    /// Wiener attenuation of the degridded bin.
    pub attenuate_degrid: AttenuateDegridFn,
    /// Degridded attenuation times the sharpen factor.
    pub attenuate_degrid_sharpen: AttenuateDegridSharpenFn,
    /// Degridded attenuation followed by a separately degridded sharpen pass.
    pub attenuate_degrid_sharpen_two_stage: AttenuateDegridSharpenFn,
}

impl KernelSet {
    /// Kernel table for `level`.
    pub fn for_level(level: SimdLevel) -> Self {
        match level {
            SimdLevel::Scalar => Self {
                level,
                apply_window: scalar::apply_window,
                scale_copy: scalar::scale_copy,
                attenuate: scalar::attenuate,
                attenuate_sharpen: scalar::attenuate_sharpen,
                attenuate_degrid: scalar::attenuate_degrid,
                attenuate_degrid_sharpen: scalar::attenuate_degrid_sharpen,
                attenuate_degrid_sharpen_two_stage: scalar::attenuate_degrid_sharpen_two_stage,
            },
            SimdLevel::Wide => Self {
                level,
                apply_window: simd::apply_window,
                scale_copy: simd::scale_copy,
                attenuate: simd::attenuate,
                attenuate_sharpen: simd::attenuate_sharpen,
                attenuate_degrid: simd::attenuate_degrid,
                attenuate_degrid_sharpen: simd::attenuate_degrid_sharpen,
                attenuate_degrid_sharpen_two_stage: simd::attenuate_degrid_sharpen_two_stage,
            },
        }
    }

    /// Kernel table for the running CPU.
    pub fn detect() -> Self {
        Self::for_level(SimdLevel::detect())
    }

    /// Level this table was built for.
    pub fn level(&self) -> SimdLevel {
        self.level
    }
}

impl Default for KernelSet {
    fn default() -> Self {
        Self::detect()
    }
}

impl fmt::Debug for KernelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelSet").field("level", &self.level).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_level_reports_level() {
        assert_eq!(KernelSet::for_level(SimdLevel::Scalar).level(), SimdLevel::Scalar);
        assert_eq!(KernelSet::for_level(SimdLevel::Wide).level(), SimdLevel::Wide);
    }

    #[test]
    fn test_tables_agree() {
        let src: Vec<f32> = (0..37).map(|i| i as f32 * 1.25).collect();
        let win: Vec<f32> = (0..37).map(|i| 1.0 / (i as f32 + 1.0)).collect();
        let mut a = vec![0.0; 37];
        let mut b = vec![0.0; 37];
        (KernelSet::for_level(SimdLevel::Scalar).apply_window)(&src, &win, &mut a);
        (KernelSet::for_level(SimdLevel::Wide).apply_window)(&src, &win, &mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_detect_display() {
        let level = SimdLevel::detect();
        assert!(["scalar", "wide"].contains(&level.to_string().as_str()));
    }
}
