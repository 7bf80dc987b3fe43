//! Pattern estimation command

use crate::EstimateArgs;
use anyhow::{bail, Context, Result};
use fftnr_ops::{InterleavedImage, Rect};

pub fn run(args: EstimateArgs, verbose: bool) -> Result<()> {
    let [x, y, width, height] = args.region[..] else {
        bail!("--region needs x,y,width,height");
    };
    let region = Rect::new(x, y, width, height);

    let mut image = super::load_image(&args.input)?;
    let params = super::load_params(args.session.config.as_deref())?;
    let denoiser = super::build_denoiser(&args.session, params)?;

    let patterns = {
        let view = InterleavedImage::new(
            &mut image.pixels,
            image.width as usize,
            image.height as usize,
            image.channels,
        )?;
        denoiser
            .estimate_patterns(&view, region)
            .with_context(|| format!("Failed to estimate pattern from {region:?}"))?
    };

    if verbose {
        for (plane, pattern) in patterns.iter().enumerate() {
            let (w, h) = (pattern.width(), pattern.height());
            let mean = pattern.values().iter().map(|&v| v as f64).sum::<f64>() / pattern.values().len() as f64;
            println!("Plane {plane}: {w}x{h} block, mean power {mean:.1}");
        }
    }

    let json = serde_json::to_string_pretty(&patterns)?;
    match &args.output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write: {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}
