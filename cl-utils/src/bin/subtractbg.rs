//! Interactive sigma-clipped background subtraction of FITS images.
//!
//! With no files, every `sci_psf*.fits` in the current directory is used.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cl_utils::prompt::{AcceptEstimate, ConsolePrompt, SubtractionPrompt};
use cl_utils::subtract::{default_inputs, subtract_background_file, DEFAULT_INPUT_PATTERN};
use log::{error, info};
use shared::ext_ref::parse_image_ref;
use shared::image_proc::background::BackgroundConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Subtract a sigma-clipped background from FITS images")]
struct Args {
    /// JSON file with clip_sigma, max_iterations and min_pixels
    #[arg(long)]
    config: Option<PathBuf>,

    /// Clip threshold in standard deviations
    #[arg(long)]
    clip_sigma: Option<f64>,

    /// Maximum number of clipping rounds
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Stop clipping below this many surviving pixels
    #[arg(long)]
    min_pixels: Option<usize>,

    /// Subtract the estimate without prompting
    #[arg(long, default_value_t = false)]
    accept_estimate: bool,

    /// With --accept-estimate, write the result back
    #[arg(long, default_value_t = false)]
    save: bool,

    /// Images to process (path or path[ext])
    files: Vec<String>,
}

fn load_config(args: &Args) -> Result<BackgroundConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => BackgroundConfig::default(),
    };
    if let Some(k) = args.clip_sigma {
        config.clip_sigma = k;
    }
    if let Some(n) = args.max_iterations {
        config.max_iterations = n;
    }
    if let Some(m) = args.min_pixels {
        config.min_pixels = m;
    }
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;
    info!("Background config: {config:?}");

    let inputs: Vec<String> = if args.files.is_empty() {
        let found = default_inputs(&std::env::current_dir()?)?;
        if found.is_empty() {
            bail!("no files given and none match {DEFAULT_INPUT_PATTERN}");
        }
        found.iter().map(|p| p.display().to_string()).collect()
    } else {
        args.files.clone()
    };

    let mut prompt: Box<dyn SubtractionPrompt> = if args.accept_estimate {
        Box::new(AcceptEstimate { save: args.save })
    } else {
        Box::new(ConsolePrompt::stdio())
    };

    let mut failures = 0;
    for input in &inputs {
        let result = parse_image_ref(input)
            .with_context(|| format!("invalid image reference {input:?}"))
            .and_then(|reference| subtract_background_file(&reference, prompt.as_mut(), &config));
        match result {
            Ok(outcome) => println!(
                "{}: level {:.6} (estimate {:.6}, sigma {:.6}){}",
                input,
                outcome.level,
                outcome.estimate.mode,
                outcome.estimate.sigma,
                if outcome.saved { ", saved" } else { "" }
            ),
            Err(e) => {
                error!("{input}: {e:#}");
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} files failed", inputs.len());
    }
    Ok(())
}
