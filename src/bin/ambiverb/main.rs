//! ambiverb - measure and calibrate an ambisonic FDN reverb
//!
//! Run with: cargo run -- fit room.toml

mod report;

use std::path::{Path, PathBuf};

use ambiverb::reverb::{fit_t60, FitOptions};
use ambiverb::{FdnReverb, ReverbConfig};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ambiverb")]
#[command(about = "First-order ambisonic FDN reverb calibration", long_about = None)]
struct Cli {
    /// Sample rate in Hz
    #[arg(short, long, default_value = "44100", global = true)]
    sample_rate: f32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit absorption and damping to the configured vcf/vt60 curve
    Fit {
        /// Room configuration (TOML)
        config: PathBuf,

        /// Simplex rounds per stage (defaults to numiter from the config)
        #[arg(short, long)]
        iterations: Option<usize>,
    },
    /// Print the measured T60 per band and broadband
    Measure {
        /// Room configuration (TOML)
        config: PathBuf,

        /// Band centre frequencies; defaults to vcf from the config, or
        /// octaves from 125 Hz to 4 kHz
        #[arg(short, long, value_delimiter = ',')]
        bands: Vec<f32>,
    },
}

const DEFAULT_BANDS: &[f32] = &[125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0];

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fit { config, iterations } => {
            let reverb = load(&config, cli.sample_rate)?;
            let vcf = reverb.config().vcf.clone();
            let vt60 = reverb.config().vt60.clone();

            let before = reverb
                .get_t60(&vcf)
                .ok_or_else(|| eyre!("reverb busy, could not measure"))?;

            let mut options = FitOptions::from_reverb(&reverb);
            if let Some(iterations) = iterations {
                options.numiter = iterations;
            }
            let fit = fit_t60(&reverb, &options).wrap_err("T60 fit failed")?;

            report::print_fit(&vcf, &vt60, &before, &fit);
        }
        Commands::Measure { config, bands } => {
            let reverb = load(&config, cli.sample_rate)?;
            let bands = if !bands.is_empty() {
                bands
            } else if !reverb.config().vcf.is_empty() {
                reverb.config().vcf.clone()
            } else {
                DEFAULT_BANDS.to_vec()
            };

            let t60 = reverb
                .get_t60(&bands)
                .ok_or_else(|| eyre!("reverb busy, could not measure"))?;
            let broadband = reverb
                .get_broadband_t60()
                .ok_or_else(|| eyre!("reverb busy, could not measure"))?;

            report::print_measurement(&reverb, &bands, &t60, broadband);
        }
    }

    Ok(())
}

fn load(path: &Path, sample_rate: f32) -> color_eyre::Result<FdnReverb> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("could not read {}", path.display()))?;
    let config = ReverbConfig::from_toml_str(&text)
        .wrap_err_with(|| format!("invalid configuration in {}", path.display()))?;
    let reverb = FdnReverb::new(config)?;
    reverb.configure(sample_rate, ambiverb::MAX_BLOCK_SIZE)?;
    Ok(reverb)
}
