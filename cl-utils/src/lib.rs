//! Workflows behind the command-line tools.
//!
//! - [`batch`]: science/noise pairing and per-pair SNR or linearity runs
//! - [`args`]: sorting free-form `plot_snr` inputs into files, levels and modes
//! - [`subtract`]: interactive background subtraction of a single image
//! - [`prompt`]: the decision seam used by `subtract`
//! - [`strip_keys`]: removal of drizzle bookkeeping keywords

pub mod args;
pub mod batch;
pub mod prompt;
pub mod strip_keys;
pub mod subtract;

pub use batch::{
    pair_inputs, run_linearity_batch, run_snr_batch, BatchError, PairOutcome, PairReport, SnrPair,
};
pub use prompt::{AcceptEstimate, ConsolePrompt, SubtractionPrompt};
pub use subtract::{subtract_background_file, SubtractionOutcome};
