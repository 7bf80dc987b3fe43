//! Scalar reference kernels.
//!
//! These define the exact per-sample arithmetic; the vector kernels in
//! [`crate::simd`] perform the same operations in the same order, eight
//! samples at a time.
//!
//! Spectral kernels attenuate each complex bin `X` by
//!
//! ```text
//! psd    = Re(X)^2 + Im(X)^2 + PSD_EPSILON
//! factor = max((psd - noise) / psd, lowlimit)
//! ```
//!
//! optionally multiplied by a sharpen factor, and optionally after removing
//! a scaled grid spectrum which is added back afterwards.

use num_complex::Complex32;

use crate::terms::{GridTerms, Noise, SharpenTerms, PSD_EPSILON};

/// `dst[i] = src[i] * win[i]`.
pub fn apply_window(src: &[f32], win: &[f32], dst: &mut [f32]) {
    debug_assert!(src.len() == win.len() && src.len() == dst.len());
    for ((d, &s), &w) in dst.iter_mut().zip(src).zip(win) {
        *d = s * w;
    }
}

/// `dst[i] = src[i] * scale`.
pub fn scale_copy(src: &[f32], dst: &mut [f32], scale: f32) {
    debug_assert_eq!(src.len(), dst.len());
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = s * scale;
    }
}

#[inline(always)]
fn power(x: Complex32) -> f32 {
    x.re * x.re + x.im * x.im + PSD_EPSILON
}

#[inline(always)]
fn wiener_factor(psd: f32, noise: f32, lowlimit: f32) -> f32 {
    ((psd - noise) / psd).max(lowlimit)
}

/// Wiener attenuation of every bin.
pub fn attenuate(bins: &mut [Complex32], noise: Noise<'_>, lowlimit: f32) {
    for (i, x) in bins.iter_mut().enumerate() {
        let psd = power(*x);
        let factor = wiener_factor(psd, noise.at(i), lowlimit);
        *x = *x * factor;
    }
}

/// Wiener attenuation combined with the sharpen multiplier.
pub fn attenuate_sharpen(
    bins: &mut [Complex32],
    noise: Noise<'_>,
    lowlimit: f32,
    sharpen: &SharpenTerms<'_>,
) {
    debug_assert_eq!(bins.len(), sharpen.mask.len());
    for (i, x) in bins.iter_mut().enumerate() {
        let psd = power(*x);
        let factor = wiener_factor(psd, noise.at(i), lowlimit) * sharpen.factor(sharpen.mask[i], psd);
        *x = *x * factor;
    }
}

/// Wiener attenuation of each bin with the grid share removed first.
pub fn attenuate_degrid(
    bins: &mut [Complex32],
    noise: Noise<'_>,
    lowlimit: f32,
    grid: &GridTerms<'_>,
) {
    debug_assert_eq!(bins.len(), grid.grid.len());
    for (i, x) in bins.iter_mut().enumerate() {
        let correction = grid.grid[i] * grid.fraction;
        let corrected = *x - correction;
        let psd = power(corrected);
        let factor = wiener_factor(psd, noise.at(i), lowlimit);
        *x = corrected * factor + correction;
    }
}

/// Degridded Wiener attenuation with sharpening from the same power estimate.
pub fn attenuate_degrid_sharpen(
    bins: &mut [Complex32],
    noise: Noise<'_>,
    lowlimit: f32,
    grid: &GridTerms<'_>,
    sharpen: &SharpenTerms<'_>,
) {
    debug_assert_eq!(bins.len(), grid.grid.len());
    debug_assert_eq!(bins.len(), sharpen.mask.len());
    for (i, x) in bins.iter_mut().enumerate() {
        let correction = grid.grid[i] * grid.fraction;
        let corrected = *x - correction;
        let psd = power(corrected);
        let factor = wiener_factor(psd, noise.at(i), lowlimit) * sharpen.factor(sharpen.mask[i], psd);
        *x = corrected * factor + correction;
    }
}

/// Two-pass degridded filter used by the pattern filter when sharpening.
///
/// The first pass attenuates the degridded bin. The second pass removes the
/// grid share again from that result, derives the sharpen factor from the
/// power of what remains, and restores the grid share once.
pub fn attenuate_degrid_sharpen_two_stage(
    bins: &mut [Complex32],
    noise: Noise<'_>,
    lowlimit: f32,
    grid: &GridTerms<'_>,
    sharpen: &SharpenTerms<'_>,
) {
    debug_assert_eq!(bins.len(), grid.grid.len());
    debug_assert_eq!(bins.len(), sharpen.mask.len());
    for (i, x) in bins.iter_mut().enumerate() {
        let correction = grid.grid[i] * grid.fraction;
        let first = *x - correction;
        let psd = power(first);
        let filtered = first * wiener_factor(psd, noise.at(i), lowlimit);

        let second = filtered - correction;
        let psd = power(second);
        *x = second * sharpen.factor(sharpen.mask[i], psd) + correction;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_window() {
        let src = [1.0, 2.0, 3.0];
        let win = [0.5, 1.0, 0.0];
        let mut dst = [9.0; 3];
        apply_window(&src, &win, &mut dst);
        assert_eq!(dst, [0.5, 2.0, 0.0]);
    }

    #[test]
    fn test_attenuate_bounds() {
        // factor lies in [lowlimit, 1] for every bin
        let beta = 2.5f32;
        let lowlimit = (beta - 1.0) / beta;
        let original: Vec<Complex32> = (0..64)
            .map(|i| Complex32::new(i as f32 * 0.7 - 20.0, (i % 7) as f32 * 3.0))
            .collect();
        let mut bins = original.clone();
        attenuate(&mut bins, Noise::Flat(150.0), lowlimit);
        for (a, b) in original.iter().zip(&bins) {
            let ratio = if a.norm() > 0.0 { b.norm() / a.norm() } else { 1.0 };
            assert!(ratio >= lowlimit - 1e-6 && ratio <= 1.0 + 1e-6, "ratio {ratio}");
        }
    }

    #[test]
    fn test_zero_noise_identity() {
        let original = vec![Complex32::new(1000.0, -3.0), Complex32::new(0.5, 0.25)];
        let mut bins = original.clone();
        attenuate(&mut bins, Noise::Flat(0.0), 0.0);
        for (a, b) in original.iter().zip(&bins) {
            assert!((a - b).norm() < 1e-6);
        }
    }

    #[test]
    fn test_degrid_zero_fraction_matches_plain() {
        let grid = vec![Complex32::new(3.0, 1.0); 16];
        let original: Vec<Complex32> =
            (0..16).map(|i| Complex32::new(i as f32, 1.0 - i as f32)).collect();

        let mut plain = original.clone();
        attenuate(&mut plain, Noise::Flat(20.0), 0.0);

        let mut degrid = original;
        let terms = GridTerms {
            grid: &grid,
            fraction: 0.0,
        };
        attenuate_degrid(&mut degrid, Noise::Flat(20.0), 0.0, &terms);
        assert_eq!(plain, degrid);
    }

    #[test]
    fn test_sharpen_boosts() {
        let mask = vec![1.0; 4];
        let terms = SharpenTerms {
            mask: &mask,
            sigma2_min: 1.0,
            sigma2_max: 1e6,
        };
        let mut bins = vec![Complex32::new(100.0, 0.0); 4];
        attenuate_sharpen(&mut bins, Noise::Flat(0.0), 0.0, &terms);
        assert!(bins[0].re > 100.0);
    }
}
