//! `wide`-based vector kernels.
//!
//! Every kernel here mirrors its counterpart in [`crate::scalar`]: eight
//! samples (or eight complex bins) per step using `f32x8`, with the tail
//! handed to the scalar kernel. Because each lane performs the same IEEE
//! operations in the same order, results match the scalar reference.
//!
//! # Example
//!
//! ```rust
//! use fftnr_math::simd::apply_window;
//!
//! let src = [2.0f32; 10];
//! let win = [0.5f32; 10];
//! let mut dst = [0.0f32; 10];
//! apply_window(&src, &win, &mut dst);
//! assert!(dst.iter().all(|&v| (v - 1.0).abs() < 1e-6));
//! ```

use fftnr_core::VECTOR_LANES;
use num_complex::Complex32;
use wide::f32x8;

use crate::scalar;
use crate::terms::{GridTerms, Noise, SharpenTerms, PSD_EPSILON};

const LANES: usize = VECTOR_LANES;

#[inline(always)]
fn load(values: &[f32]) -> f32x8 {
    f32x8::from(std::array::from_fn::<f32, LANES, _>(|k| values[k]))
}

/// Splits 8 interleaved complex bins into real and imaginary lanes.
#[inline(always)]
fn load_bins(bins: &[Complex32]) -> (f32x8, f32x8) {
    let re = std::array::from_fn::<f32, LANES, _>(|k| bins[k].re);
    let im = std::array::from_fn::<f32, LANES, _>(|k| bins[k].im);
    (f32x8::from(re), f32x8::from(im))
}

#[inline(always)]
fn store_bins(bins: &mut [Complex32], re: f32x8, im: f32x8) {
    let re = re.to_array();
    let im = im.to_array();
    for (k, bin) in bins.iter_mut().enumerate().take(LANES) {
        *bin = Complex32::new(re[k], im[k]);
    }
}

#[inline(always)]
fn noise_lanes(noise: &Noise<'_>, offset: usize) -> f32x8 {
    match *noise {
        Noise::Flat(sigma2) => f32x8::splat(sigma2),
        Noise::Pattern { spectrum, factor } => {
            load(&spectrum[offset..offset + LANES]) * f32x8::splat(factor)
        }
    }
}

#[inline(always)]
fn power(re: f32x8, im: f32x8) -> f32x8 {
    re * re + im * im + f32x8::splat(PSD_EPSILON)
}

#[inline(always)]
fn wiener_factor(psd: f32x8, noise: f32x8, lowlimit: f32x8) -> f32x8 {
    ((psd - noise) / psd).max(lowlimit)
}

#[inline(always)]
fn sharpen_factor(terms: &SharpenTerms<'_>, offset: usize, psd: f32x8) -> f32x8 {
    let weight = load(&terms.mask[offset..offset + LANES]);
    let smin = f32x8::splat(terms.sigma2_min);
    let smax = f32x8::splat(terms.sigma2_max);
    f32x8::splat(1.0) + weight * (psd * smax / ((psd + smin) * (psd + smax))).sqrt()
}

#[inline(always)]
fn grid_lanes(terms: &GridTerms<'_>, offset: usize) -> (f32x8, f32x8) {
    let (re, im) = load_bins(&terms.grid[offset..offset + LANES]);
    let fraction = f32x8::splat(terms.fraction);
    (re * fraction, im * fraction)
}

#[inline(always)]
fn vector_len(len: usize) -> usize {
    len - len % LANES
}

/// `dst[i] = src[i] * win[i]`, eight samples per step.
pub fn apply_window(src: &[f32], win: &[f32], dst: &mut [f32]) {
    debug_assert!(src.len() == win.len() && src.len() == dst.len());
    let split = vector_len(dst.len());
    let (head, tail) = dst.split_at_mut(split);

    for (c, chunk) in head.chunks_exact_mut(LANES).enumerate() {
        let offset = c * LANES;
        let v = load(&src[offset..]) * load(&win[offset..]);
        chunk.copy_from_slice(&v.to_array());
    }
    scalar::apply_window(&src[split..], &win[split..], tail);
}

/// `dst[i] = src[i] * scale`, eight samples per step.
pub fn scale_copy(src: &[f32], dst: &mut [f32], scale: f32) {
    debug_assert_eq!(src.len(), dst.len());
    let split = vector_len(dst.len());
    let (head, tail) = dst.split_at_mut(split);
    let s = f32x8::splat(scale);

    for (c, chunk) in head.chunks_exact_mut(LANES).enumerate() {
        let v = load(&src[c * LANES..]) * s;
        chunk.copy_from_slice(&v.to_array());
    }
    scalar::scale_copy(&src[split..], tail, scale);
}

/// Vector form of [`scalar::attenuate`].
pub fn attenuate(bins: &mut [Complex32], noise: Noise<'_>, lowlimit: f32) {
    let split = vector_len(bins.len());
    let (head, tail) = bins.split_at_mut(split);
    let low = f32x8::splat(lowlimit);

    for (c, chunk) in head.chunks_exact_mut(LANES).enumerate() {
        let (re, im) = load_bins(chunk);
        let psd = power(re, im);
        let factor = wiener_factor(psd, noise_lanes(&noise, c * LANES), low);
        store_bins(chunk, re * factor, im * factor);
    }
    scalar::attenuate(tail, noise.tail(split), lowlimit);
}

/// Vector form of [`scalar::attenuate_sharpen`].
pub fn attenuate_sharpen(
    bins: &mut [Complex32],
    noise: Noise<'_>,
    lowlimit: f32,
    sharpen: &SharpenTerms<'_>,
) {
    let split = vector_len(bins.len());
    let (head, tail) = bins.split_at_mut(split);
    let low = f32x8::splat(lowlimit);

    for (c, chunk) in head.chunks_exact_mut(LANES).enumerate() {
        let offset = c * LANES;
        let (re, im) = load_bins(chunk);
        let psd = power(re, im);
        let factor = wiener_factor(psd, noise_lanes(&noise, offset), low)
            * sharpen_factor(sharpen, offset, psd);
        store_bins(chunk, re * factor, im * factor);
    }
    scalar::attenuate_sharpen(tail, noise.tail(split), lowlimit, &sharpen.tail(split));
}

/// Vector form of [`scalar::attenuate_degrid`].
pub fn attenuate_degrid(
    bins: &mut [Complex32],
    noise: Noise<'_>,
    lowlimit: f32,
    grid: &GridTerms<'_>,
) {
    let split = vector_len(bins.len());
    let (head, tail) = bins.split_at_mut(split);
    let low = f32x8::splat(lowlimit);

    for (c, chunk) in head.chunks_exact_mut(LANES).enumerate() {
        let offset = c * LANES;
        let (re, im) = load_bins(chunk);
        let (gre, gim) = grid_lanes(grid, offset);
        let (cre, cim) = (re - gre, im - gim);
        let psd = power(cre, cim);
        let factor = wiener_factor(psd, noise_lanes(&noise, offset), low);
        store_bins(chunk, cre * factor + gre, cim * factor + gim);
    }
    scalar::attenuate_degrid(tail, noise.tail(split), lowlimit, &grid.tail(split));
}

/// Vector form of [`scalar::attenuate_degrid_sharpen`].
pub fn attenuate_degrid_sharpen(
    bins: &mut [Complex32],
    noise: Noise<'_>,
    lowlimit: f32,
    grid: &GridTerms<'_>,
    sharpen: &SharpenTerms<'_>,
) {
    let split = vector_len(bins.len());
    let (head, tail) = bins.split_at_mut(split);
    let low = f32x8::splat(lowlimit);

    for (c, chunk) in head.chunks_exact_mut(LANES).enumerate() {
        let offset = c * LANES;
        let (re, im) = load_bins(chunk);
        let (gre, gim) = grid_lanes(grid, offset);
        let (cre, cim) = (re - gre, im - gim);
        let psd = power(cre, cim);
        let factor = wiener_factor(psd, noise_lanes(&noise, offset), low)
            * sharpen_factor(sharpen, offset, psd);
        store_bins(chunk, cre * factor + gre, cim * factor + gim);
    }
    scalar::attenuate_degrid_sharpen(
        tail,
        noise.tail(split),
        lowlimit,
        &grid.tail(split),
        &sharpen.tail(split),
    );
}

/// Vector form of [`scalar::attenuate_degrid_sharpen_two_stage`].
pub fn attenuate_degrid_sharpen_two_stage(
    bins: &mut [Complex32],
    noise: Noise<'_>,
    lowlimit: f32,
    grid: &GridTerms<'_>,
    sharpen: &SharpenTerms<'_>,
) {
    let split = vector_len(bins.len());
    let (head, tail) = bins.split_at_mut(split);
    let low = f32x8::splat(lowlimit);

    for (c, chunk) in head.chunks_exact_mut(LANES).enumerate() {
        let offset = c * LANES;
        let (re, im) = load_bins(chunk);
        let (gre, gim) = grid_lanes(grid, offset);

        let (fre, fim) = (re - gre, im - gim);
        let factor = wiener_factor(power(fre, fim), noise_lanes(&noise, offset), low);
        let (fre, fim) = (fre * factor, fim * factor);

        let (sre, sim) = (fre - gre, fim - gim);
        let boost = sharpen_factor(sharpen, offset, power(sre, sim));
        store_bins(chunk, sre * boost + gre, sim * boost + gim);
    }
    scalar::attenuate_degrid_sharpen_two_stage(
        tail,
        noise.tail(split),
        lowlimit,
        &grid.tail(split),
        &sharpen.tail(split),
    );
}
