//! Science/noise pair batches.
//!
//! Inputs are split in half: the first half are science images, the second
//! half the matching noise maps, paired by position. Each pair is processed
//! on its own; a pair whose noise map cannot be classified is skipped and
//! any other per-pair failure is recorded, without stopping the batch.

use std::fmt;
use std::path::PathBuf;

use anyhow::Context;
use log::{error, info, warn};
use shared::ext_ref::{parse_image_ref, ExtRefError, ImageRef};
use shared::image_proc::linearity::linearity_diagnostic;
use shared::image_proc::snr::{compute_snr, SigmaLevels};
use shared::io::read_image;
use shared::noise_map::{NoiseKind, UnknownNoiseFormat};
use thiserror::Error;
use viz::{LinearityRenderer, SnrRenderer};

/// Problems with the batch as a whole; these stop the run before any pair
/// is processed.
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("no input files given")]
    NoInputs,

    #[error("expected equal numbers of science and noise files, got {0} files in total")]
    OddInputCount(usize),

    #[error("invalid image reference {input:?}")]
    Reference {
        input: String,
        #[source]
        source: ExtRefError,
    },
}

/// A science image and its noise map, with the noise kind decided up front.
#[derive(Debug, Clone)]
pub struct SnrPair {
    pub science: ImageRef,
    pub noise: ImageRef,
    pub noise_kind: Result<NoiseKind, UnknownNoiseFormat>,
}

impl SnrPair {
    pub fn new(science: ImageRef, noise: ImageRef) -> Self {
        let noise_kind = NoiseKind::classify(&noise);
        Self {
            science,
            noise,
            noise_kind,
        }
    }
}

/// Pair `inputs` positionally: first half science, second half noise.
pub fn pair_inputs<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<SnrPair>, BatchError> {
    if inputs.is_empty() {
        return Err(BatchError::NoInputs);
    }
    if inputs.len() % 2 != 0 {
        return Err(BatchError::OddInputCount(inputs.len()));
    }

    let refs = inputs
        .iter()
        .map(|raw| {
            parse_image_ref(raw.as_ref()).map_err(|source| BatchError::Reference {
                input: raw.as_ref().to_string(),
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let (science, noise) = refs.split_at(refs.len() / 2);
    Ok(science
        .iter()
        .zip(noise)
        .map(|(s, n)| SnrPair::new(s.clone(), n.clone()))
        .collect())
}

#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    /// The renderer ran; `output` is the file it wrote, if any.
    Rendered { output: Option<PathBuf> },
    /// The noise map could not be classified.
    Skipped { reason: String },
    /// Reading, computing or rendering failed.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairReport {
    pub science: String,
    pub noise: String,
    pub outcome: PairOutcome,
}

impl PairReport {
    pub fn is_rendered(&self) -> bool {
        matches!(self.outcome, PairOutcome::Rendered { .. })
    }
}

/// Counts of pair outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub rendered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_reports(reports: &[PairReport]) -> Self {
        reports
            .iter()
            .fold(BatchSummary::default(), |mut acc, r| {
                match r.outcome {
                    PairOutcome::Rendered { .. } => acc.rendered += 1,
                    PairOutcome::Skipped { .. } => acc.skipped += 1,
                    PairOutcome::Failed { .. } => acc.failed += 1,
                }
                acc
            })
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rendered, {} skipped, {} failed",
            self.rendered, self.skipped, self.failed
        )
    }
}

/// Compute and render the SNR image of every pair.
pub fn run_snr_batch(
    pairs: &[SnrPair],
    levels: &SigmaLevels,
    renderer: &mut dyn SnrRenderer,
) -> Vec<PairReport> {
    run_pairs(pairs, |pair, kind| {
        let science = read_image(&pair.science)
            .with_context(|| format!("reading science image {}", pair.science))?;
        let noise = read_image(&pair.noise)
            .with_context(|| format!("reading noise map {}", pair.noise))?;
        let snr = compute_snr(&science.data.view(), &noise.data.view(), kind)?;
        let output = renderer.render_snr(snr.view(), levels, &pair.science.file_name())?;
        Ok(output)
    })
}

/// Build and render the linearity diagnostic of every pair.
///
/// The exposure time comes from the science image's `EXPTIME` keyword.
pub fn run_linearity_batch(
    pairs: &[SnrPair],
    ideal_samples: usize,
    renderer: &mut dyn LinearityRenderer,
) -> Vec<PairReport> {
    run_pairs(pairs, |pair, kind| {
        let science = read_image(&pair.science)
            .with_context(|| format!("reading science image {}", pair.science))?;
        let noise = read_image(&pair.noise)
            .with_context(|| format!("reading noise map {}", pair.noise))?;
        let exposure_time = science
            .keyword_f64("EXPTIME")
            .with_context(|| format!("{} has no EXPTIME keyword", pair.science))?;
        let analysis = linearity_diagnostic(
            &science.data.view(),
            &noise.data.view(),
            kind,
            exposure_time,
            ideal_samples,
        )?;
        info!(
            "{}: sky variance {:.4e}, {} pixels above {:.4}",
            pair.science,
            analysis.sky_variance,
            analysis.points.len(),
            analysis.threshold
        );
        let output = renderer.render_linearity(&analysis, &pair.science.file_name())?;
        Ok(output)
    })
}

fn run_pairs<F>(pairs: &[SnrPair], mut process: F) -> Vec<PairReport>
where
    F: FnMut(&SnrPair, NoiseKind) -> anyhow::Result<Option<PathBuf>>,
{
    pairs
        .iter()
        .map(|pair| {
            let outcome = match &pair.noise_kind {
                Err(unknown) => {
                    warn!("Skipping {} / {}: {}", pair.science, pair.noise, unknown);
                    PairOutcome::Skipped {
                        reason: unknown.to_string(),
                    }
                }
                Ok(kind) => {
                    info!("Processing {} with {} noise map {}", pair.science, kind, pair.noise);
                    match process(pair, *kind) {
                        Ok(output) => PairOutcome::Rendered { output },
                        Err(e) => {
                            error!("Failed on {} / {}: {:#}", pair.science, pair.noise, e);
                            PairOutcome::Failed {
                                error: format!("{e:#}"),
                            }
                        }
                    }
                }
            };
            PairReport {
                science: pair.science.to_string(),
                noise: pair.noise.to_string(),
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_split_in_half() {
        let pairs = pair_inputs(&["a_sci.fits", "b_sci.fits", "a_ivm.fits", "b_rms.fits"]).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].science.file_name(), "a_sci.fits");
        assert_eq!(pairs[0].noise.file_name(), "a_ivm.fits");
        assert_eq!(pairs[0].noise_kind, Ok(NoiseKind::InverseVariance));
        assert_eq!(pairs[1].science.file_name(), "b_sci.fits");
        assert_eq!(pairs[1].noise_kind, Ok(NoiseKind::Rms));
    }

    #[test]
    fn test_unclassified_noise_kept_as_pair() {
        let pairs = pair_inputs(&["a.fits", "b.fits"]).unwrap();
        assert!(pairs[0].noise_kind.is_err());
    }

    #[test]
    fn test_bad_batches() {
        let empty: [&str; 0] = [];
        assert!(matches!(pair_inputs(&empty), Err(BatchError::NoInputs)));
        assert!(matches!(
            pair_inputs(&["a.fits", "b.fits", "c.fits"]),
            Err(BatchError::OddInputCount(3))
        ));
        assert!(matches!(
            pair_inputs(&["a.fits[x", "b_wht.fits"]),
            Err(BatchError::Reference { .. })
        ));
    }

    #[test]
    fn test_summary_counts() {
        let report = |outcome| PairReport {
            science: "s".into(),
            noise: "n".into(),
            outcome,
        };
        let reports = vec![
            report(PairOutcome::Rendered { output: None }),
            report(PairOutcome::Skipped { reason: "x".into() }),
            report(PairOutcome::Rendered { output: None }),
            report(PairOutcome::Failed { error: "y".into() }),
        ];
        let summary = BatchSummary::from_reports(&reports);
        assert_eq!(
            summary,
            BatchSummary {
                rendered: 2,
                skipped: 1,
                failed: 1
            }
        );
        assert_eq!(summary.to_string(), "2 rendered, 1 skipped, 1 failed");
    }
}
