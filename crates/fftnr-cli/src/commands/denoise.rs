//! Denoise command

use crate::DenoiseArgs;
use anyhow::{bail, Context, Result};
use fftnr_ops::{InterleavedImage, Outcome, PatternSpectrum};
use std::time::Instant;
use tracing::warn;

pub fn run(args: DenoiseArgs, verbose: bool) -> Result<()> {
    let mut image = super::load_image(&args.input)?;

    let mut params = super::load_params(args.session.config.as_deref())?;
    if let Some(sigma) = args.sigma {
        params.sigma_luma = sigma;
        params.sigma_chroma = args.chroma.unwrap_or(sigma);
    } else if let Some(chroma) = args.chroma {
        params.sigma_chroma = chroma;
    }
    if let Some(beta) = args.beta {
        params.beta = beta;
    }
    if let Some(degrid) = args.degrid {
        params.degrid = degrid;
    }
    if let Some(amount) = args.sharpen {
        params.sharpen_luma.amount = amount;
    }
    if let Some(path) = &args.pattern {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read: {}", path.display()))?;
        params.patterns = serde_json::from_str::<Vec<PatternSpectrum>>(&text)
            .with_context(|| format!("Invalid pattern file: {}", path.display()))?;
    }

    let denoiser = super::build_denoiser(&args.session, params)?;
    let abort = denoiser.abort_handle();
    ctrlc::set_handler(move || abort.abort()).context("Failed to install Ctrl-C handler")?;

    if verbose {
        println!(
            "Denoising {} ({}x{}, {} workers, {})",
            args.input.display(),
            image.width,
            image.height,
            denoiser.worker_count(),
            denoiser.simd_level()
        );
    }

    let start = Instant::now();
    let outcome = {
        let mut view = InterleavedImage::new(
            &mut image.pixels,
            image.width as usize,
            image.height as usize,
            image.channels,
        )?;
        denoiser.denoise(&mut view)?
    };

    match outcome {
        Outcome::Completed { blocks } => {
            if verbose {
                println!("Filtered {blocks} blocks in {:.2?}", start.elapsed());
            }
        }
        Outcome::Skipped(reason) => warn!(?reason, "image left unchanged"),
        Outcome::Aborted => bail!("Interrupted"),
    }

    super::save_image(&args.output, image)?;

    if verbose {
        println!("Done.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{load_image, save_image, Image16};
    use crate::{SessionArgs, Window};

    fn session() -> SessionArgs {
        SessionArgs {
            config: None,
            mode: None,
            red: None,
            blue: None,
            block: 32,
            overlap: 8,
            window: Window::HalfCosine,
            workers: 2,
        }
    }

    #[test]
    fn test_png_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.png");
        let output = dir.path().join("out.png");

        let (w, h) = (72u32, 48u32);
        let pixels: Vec<u16> = (0..w * h * 3)
            .map(|i| 20000 + ((i * 7919) % 1500) as u16)
            .collect();
        save_image(
            &input,
            Image16 {
                width: w,
                height: h,
                channels: 3,
                pixels: pixels.clone(),
            },
        )
        .unwrap();

        let args = DenoiseArgs {
            input: input.clone(),
            output: output.clone(),
            session: session(),
            sigma: Some(2.0),
            chroma: None,
            beta: None,
            degrid: None,
            sharpen: None,
            pattern: None,
        };
        run(args, false).unwrap();

        let result = load_image(&output).unwrap();
        assert_eq!((result.width, result.height, result.channels), (w, h, 3));
        assert_ne!(result.pixels, pixels);
    }
}
