//! fftnr - block FFT denoiser for 16-bit images

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "fftnr")]
#[command(author, version, about = "Frequency-domain noise reduction for 16-bit images")]
#[command(long_about = "
Denoises 16-bit RGB(A) images with overlapped block FFTs and a per-bin
Wiener gain. Noise levels are standard deviations of square-root
companded samples (0..=256).

Examples:
  fftnr denoise in.png -o out.png                 # default strength
  fftnr denoise in.tif -o out.tif --sigma 3 --chroma 6
  fftnr denoise in.png -o out.png --config params.json
  fftnr params > params.json                      # editable defaults
  fftnr estimate flat.png --region 0,0,256,256 -o pattern.json
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Denoise an image
    #[command(visible_alias = "d")]
    Denoise(DenoiseArgs),

    /// Print parameters as JSON
    Params(ParamsArgs),

    /// Estimate pattern noise spectra from a featureless region
    Estimate(EstimateArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Rgb,
    Yuv,
}

#[derive(Clone, Copy, ValueEnum)]
enum Window {
    Flat,
    HalfCosine,
    RaisedCosine,
    IdentityHalfCosine,
}

/// Options shared by commands that build a denoiser.
#[derive(Args)]
struct SessionArgs {
    /// JSON parameter file (see `fftnr params`)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Color representation to filter in
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Red white-balance correction (YUV mode)
    #[arg(long)]
    red: Option<f32>,

    /// Blue white-balance correction (YUV mode)
    #[arg(long)]
    blue: Option<f32>,

    /// Block size in pixels (even, >= 8)
    #[arg(short, long, default_value = "128")]
    block: usize,

    /// Overlap between blocks in pixels
    #[arg(long, default_value = "16")]
    overlap: usize,

    /// Analysis window
    #[arg(long, value_enum, default_value = "half-cosine")]
    window: Window,

    /// Worker threads (0 = one per CPU)
    #[arg(short = 'j', long, default_value = "0")]
    workers: usize,
}

#[derive(Args)]
struct DenoiseArgs {
    /// Input image (16-bit PNG, TIFF or PNM)
    input: PathBuf,

    /// Output image
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    session: SessionArgs,

    /// Luma noise level (all planes in RGB mode)
    #[arg(short, long)]
    sigma: Option<f32>,

    /// Chroma noise level
    #[arg(long)]
    chroma: Option<f32>,

    /// Wiener floor control (>= 1)
    #[arg(long)]
    beta: Option<f32>,

    /// Grid removal strength (0..=1)
    #[arg(long)]
    degrid: Option<f32>,

    /// Luma sharpening amount
    #[arg(long)]
    sharpen: Option<f32>,

    /// Pattern spectra from `fftnr estimate`
    #[arg(long)]
    pattern: Option<PathBuf>,
}

#[derive(Args)]
struct ParamsArgs {
    /// Validate and print this file instead of the defaults
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct EstimateArgs {
    /// Input image
    input: PathBuf,

    /// Noise-only region as x,y,width,height
    #[arg(short, long, value_delimiter = ',', num_args = 4)]
    region: Vec<usize>,

    /// Output JSON file (stdout if omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    session: SessionArgs,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v
    let default = if cli.verbose { "info,fftnr_ops=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(cli.verbose)
        .init();

    match cli.command {
        Commands::Denoise(args) => commands::denoise::run(args, cli.verbose),
        Commands::Params(args) => commands::params::run(args),
        Commands::Estimate(args) => commands::estimate::run(args, cli.verbose),
    }
}
