//! CLI command implementations

pub mod denoise;
pub mod estimate;
pub mod params;

use anyhow::{bail, Context, Result};
use fftnr_ops::{ColorMode, DenoiseParams, Denoiser, DenoiserConfig, WindowKind};
use image::{ImageBuffer, Rgb, Rgba};
use std::path::Path;

use crate::{Mode, SessionArgs, Window};

/// Interleaved 16-bit pixels loaded from disk.
pub struct Image16 {
    pub width: u32,
    pub height: u32,
    pub channels: usize,
    pub pixels: Vec<u16>,
}

/// Load an image as 16-bit RGB, or RGBA when it has alpha.
pub fn load_image(path: &Path) -> Result<Image16> {
    let image = image::open(path).with_context(|| format!("Failed to load: {}", path.display()))?;
    let (width, height) = (image.width(), image.height());
    let (channels, pixels) = if image.color().has_alpha() {
        (4, image.into_rgba16().into_raw())
    } else {
        (3, image.into_rgb16().into_raw())
    };
    Ok(Image16 {
        width,
        height,
        channels,
        pixels,
    })
}

/// Save 16-bit pixels; the format follows the file extension.
pub fn save_image(path: &Path, image: Image16) -> Result<()> {
    let Image16 {
        width,
        height,
        channels,
        pixels,
    } = image;
    let saved = match channels {
        3 => ImageBuffer::<Rgb<u16>, _>::from_raw(width, height, pixels)
            .context("pixel buffer does not match image size")?
            .save(path),
        4 => ImageBuffer::<Rgba<u16>, _>::from_raw(width, height, pixels)
            .context("pixel buffer does not match image size")?
            .save(path),
        n => bail!("cannot save {n}-channel image"),
    };
    saved.with_context(|| format!("Failed to save: {}", path.display()))
}

/// Read parameters from JSON, or start from the defaults.
pub fn load_params(path: Option<&Path>) -> Result<DenoiseParams> {
    let Some(path) = path else {
        return Ok(DenoiseParams::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid parameters: {}", path.display()))
}

/// Apply session flags on top of `params` and build the denoiser.
pub fn build_denoiser(session: &SessionArgs, mut params: DenoiseParams) -> Result<Denoiser> {
    if let Some(mode) = session.mode {
        params.mode = match mode {
            Mode::Rgb => ColorMode::Rgb,
            Mode::Yuv => ColorMode::Yuv,
        };
    }
    if let Some(red) = session.red {
        params.red_correction = red;
    }
    if let Some(blue) = session.blue {
        params.blue_correction = blue;
    }

    let config = DenoiserConfig {
        block_width: session.block,
        block_height: session.block,
        overlap: session.overlap,
        workers: (session.workers > 0).then_some(session.workers),
        window: match session.window {
            Window::Flat => WindowKind::Flat,
            Window::HalfCosine => WindowKind::HalfCosine,
            Window::RaisedCosine => WindowKind::RaisedCosine,
            Window::IdentityHalfCosine => WindowKind::IdentityHalfCosine,
        },
        ..Default::default()
    };
    Denoiser::with_config(params, config).context("Failed to set up denoiser")
}
