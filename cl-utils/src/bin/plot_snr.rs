//! Render SNR images, or linearity diagnostics, for science/noise pairs.
//!
//! Inputs mix files and numbers: `plot_snr a_sci.fits b_sci.fits a_wht.fits
//! b_wht.fits 3 -3` pairs each science image with the noise map at the same
//! position in the second half and draws contours at -3 and 3 sigma.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use cl_utils::args::classify_inputs;
use cl_utils::batch::{pair_inputs, run_linearity_batch, run_snr_batch, BatchSummary, PairOutcome};
use viz::{LinearityPlotConfig, PngLinearityRenderer, PngSnrRenderer, SnrPlotConfig};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Render SNR images from science images and noise maps",
    after_help = "INPUTS are science files, then the same number of noise files. \
                  Numbers among them are contour levels in sigma. The word \
                  'linearity' selects the linearity diagnostic and 'help' \
                  prints this message.\n\n\
                  Noise maps are recognised by 'ivm'/'wh' (inverse variance) \
                  or 'rms'/'sig' (standard deviation) in the file name, or by \
                  a [WHT] / [ERR] extension."
)]
struct Args {
    /// Plot the linearity diagnostic instead of the SNR image
    #[arg(long, default_value_t = false)]
    linearity: bool,

    /// Directory for the PNG files
    #[arg(long, default_value = "plots")]
    output_dir: PathBuf,

    /// Plot width in pixels
    #[arg(long, default_value_t = 900)]
    width: u32,

    /// Plot height in pixels
    #[arg(long, default_value_t = 750)]
    height: u32,

    /// Science files, noise files and contour levels
    #[arg(allow_negative_numbers = true, num_args = 0..)]
    inputs: Vec<String>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let inputs = classify_inputs(&args.inputs);
    if inputs.help {
        return match Args::command().print_help() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("plot_snr: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let pairs = match pair_inputs(&inputs.files) {
        Ok(pairs) => pairs,
        Err(e) => {
            eprintln!("plot_snr: {e}");
            return ExitCode::FAILURE;
        }
    };

    let reports = if args.linearity || inputs.linearity {
        let config = LinearityPlotConfig {
            width: args.width,
            height: args.height,
            output_dir: args.output_dir.clone(),
            ..Default::default()
        };
        let ideal_samples = config.ideal_samples;
        let mut renderer = PngLinearityRenderer::new(config);
        run_linearity_batch(&pairs, ideal_samples, &mut renderer)
    } else {
        let config = SnrPlotConfig {
            width: args.width,
            height: args.height,
            output_dir: args.output_dir.clone(),
            ..Default::default()
        };
        let mut renderer = PngSnrRenderer::new(config);
        run_snr_batch(&pairs, &inputs.levels, &mut renderer)
    };

    for report in &reports {
        match &report.outcome {
            PairOutcome::Rendered { output: Some(path) } => {
                println!("{} -> {}", report.science, path.display())
            }
            PairOutcome::Rendered { output: None } => println!("{} rendered", report.science),
            PairOutcome::Skipped { reason } => println!("{} skipped: {reason}", report.science),
            PairOutcome::Failed { error } => println!("{} failed: {error}", report.science),
        }
    }
    println!("{}", BatchSummary::from_reports(&reports));

    ExitCode::SUCCESS
}
