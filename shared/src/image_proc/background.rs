//! Robust sky background estimation by iterative sigma clipping.
//!
//! The background level is the skewness-corrected mode approximation
//! `3 * median - 2 * mean` of the pixels that survive clipping, and the
//! noise is their standard deviation. Clipping is measured from the
//! survivors' median but re-evaluated against the whole working set on each
//! round, intersected with the previous round's survivors.

use log::debug;
use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::algo::stats::{mean, median, pearson_mode, pixel_value_mode, std_dev};

/// Errors from background estimation and subtraction.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackgroundError {
    #[error("mask shape {mask:?} does not match image shape {image:?}")]
    ShapeMismatch {
        image: (usize, usize),
        mask: (usize, usize),
    },

    #[error("no usable pixels: {total} pixels, {masked} masked, {non_finite} non-finite")]
    NoUsablePixels {
        total: usize,
        masked: usize,
        non_finite: usize,
    },
}

/// Sigma-clipping parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Clip threshold in units of the current standard deviation.
    pub clip_sigma: f64,
    /// Upper bound on clipping rounds.
    pub max_iterations: usize,
    /// Clipping stops once fewer than this many pixels survive.
    pub min_pixels: usize,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            clip_sigma: 3.0,
            max_iterations: 10,
            min_pixels: 50,
        }
    }
}

/// Result of [`estimate_background`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackgroundEstimate {
    /// Mode approximation of the background level.
    pub mode: f64,
    /// Standard deviation of the surviving pixels.
    pub sigma: f64,
    /// Number of clipping rounds evaluated.
    pub iterations: usize,
    /// Pixels surviving the final clip.
    pub retained: usize,
}

/// Estimate background level and noise of `image`, ignoring pixels where
/// `bad_mask` is true.
///
/// Non-finite pixels are excluded from the working set as well. Neither the
/// image nor the mask is modified.
///
/// # Errors
///
/// Returns [`BackgroundError::NoUsablePixels`] when nothing remains after
/// masking and [`BackgroundError::ShapeMismatch`] when the mask does not
/// cover the image.
pub fn estimate_background(
    image: &ArrayView2<f64>,
    bad_mask: &ArrayView2<bool>,
    config: &BackgroundConfig,
) -> Result<BackgroundEstimate, BackgroundError> {
    check_shapes(image, bad_mask)?;

    let working: Vec<f64> = image
        .iter()
        .zip(bad_mask.iter())
        .filter(|(v, bad)| !**bad && v.is_finite())
        .map(|(v, _)| *v)
        .collect();

    if working.is_empty() {
        let masked = bad_mask.iter().filter(|b| **b).count();
        let non_finite = image
            .iter()
            .zip(bad_mask.iter())
            .filter(|(v, bad)| !**bad && !v.is_finite())
            .count();
        return Err(BackgroundError::NoUsablePixels {
            total: image.len(),
            masked,
            non_finite,
        });
    }

    let mut keep = vec![true; working.len()];
    let mut survivors = working.clone();
    let mut estimate = BackgroundEstimate {
        mode: 0.0,
        sigma: 0.0,
        iterations: 0,
        retained: survivors.len(),
    };

    for iteration in 1..=config.max_iterations.max(1) {
        let (Some(mu), Ok(med), Some(sig)) =
            (mean(&survivors), median(&survivors), std_dev(&survivors))
        else {
            break;
        };

        estimate.mode = pearson_mode(med, mu);
        estimate.sigma = sig;
        estimate.iterations = iteration;

        let limit = config.clip_sigma * sig;
        for (k, v) in keep.iter_mut().zip(&working) {
            *k &= (v - med).abs() < limit;
        }
        survivors = working
            .iter()
            .zip(&keep)
            .filter(|(_, k)| **k)
            .map(|(v, _)| *v)
            .collect();
        estimate.retained = survivors.len();

        debug!(
            "clip round {}: mode={:.4} sigma={:.4} retained={}/{}",
            iteration,
            estimate.mode,
            estimate.sigma,
            estimate.retained,
            working.len()
        );

        if survivors.len() < config.min_pixels {
            break;
        }
    }

    Ok(estimate)
}

/// Most frequent pixel value and the mask of pixels equal to it.
///
/// Images with a zero-filled (or constant-filled) footprint outside the
/// exposed area use this value to flag unexposed pixels.
pub fn mode_value_mask(image: &ArrayView2<f64>) -> Option<(f64, Array2<bool>)> {
    let (value, _) = pixel_value_mode(image.iter().copied())?;
    Some((value, image.mapv(|v| v == value)))
}

/// Subtract `level` from every pixel not flagged in `bad_mask`.
///
/// Returns the number of pixels changed.
pub fn subtract_level(
    image: &mut Array2<f64>,
    bad_mask: &ArrayView2<bool>,
    level: f64,
) -> Result<usize, BackgroundError> {
    check_shapes(&image.view(), bad_mask)?;

    let mut changed = 0;
    Zip::from(image).and(bad_mask).for_each(|v, &bad| {
        if !bad {
            *v -= level;
            changed += 1;
        }
    });
    Ok(changed)
}

fn check_shapes(
    image: &ArrayView2<f64>,
    bad_mask: &ArrayView2<bool>,
) -> Result<(), BackgroundError> {
    if image.dim() != bad_mask.dim() {
        return Err(BackgroundError::ShapeMismatch {
            image: image.dim(),
            mask: bad_mask.dim(),
        });
    }
    Ok(())
}
