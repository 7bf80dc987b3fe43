//! Integration tests for fftnr crates.
//!
//! End-to-end checks of a denoising session: tiling, color conversion,
//! filter selection, cancellation and worker reuse working together.

use fftnr_ops::DenoiserConfig;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Horizontal gradient with uniform noise of `+-amplitude` code values.
pub fn noisy_gradient(width: usize, height: usize, channels: usize, amplitude: f32, seed: u64) -> Vec<u16> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..width * height * channels)
        .map(|i| {
            let x = i / channels % width;
            let base = 9000.0 + 6000.0 * x as f32 / width as f32;
            (base + rng.random_range(-amplitude..amplitude)).clamp(0.0, 65535.0) as u16
        })
        .collect()
}

/// Sum of absolute horizontal neighbour differences in one channel.
pub fn roughness(pixels: &[u16], width: usize, height: usize, channels: usize, channel: usize) -> f64 {
    (0..height)
        .flat_map(|y| (1..width).map(move |x| (y, x)))
        .map(|(y, x)| {
            let a = pixels[(y * width + x) * channels + channel] as f64;
            let b = pixels[(y * width + x - 1) * channels + channel] as f64;
            (a - b).abs()
        })
        .sum()
}

/// Sum of absolute differences between two buffers.
pub fn total_change(a: &[u16], b: &[u16]) -> u64 {
    a.iter().zip(b).map(|(&x, &y)| x.abs_diff(y) as u64).sum()
}

/// Small blocks and two workers keep the tests fast.
pub fn small_config() -> DenoiserConfig {
    DenoiserConfig {
        block_width: 32,
        block_height: 32,
        overlap: 8,
        workers: Some(2),
        ..Default::default()
    }
}
