//! Background subtraction of a single image.
//!
//! The most frequent pixel value marks unexposed pixels. The background
//! of the remaining pixels is estimated by sigma clipping, the chosen level
//! is subtracted from them, and the file is rewritten only if the prompt
//! confirms.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use log::{info, warn};
use ndarray::Array2;
use once_cell::sync::Lazy;
use regex::Regex;
use shared::ext_ref::ImageRef;
use shared::image_proc::background::{
    estimate_background, mode_value_mask, subtract_level, BackgroundConfig, BackgroundEstimate,
};
use shared::io::{read_image, replace_image};
use viz::histogram::pixel_histogram;

use crate::prompt::SubtractionPrompt;

/// Files picked up when no inputs are given.
pub const DEFAULT_INPUT_PATTERN: &str = "sci_psf*.fits";

static DEFAULT_INPUT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^sci_psf.*\.fits$").expect("default input pattern is valid"));

#[derive(Debug, Clone, PartialEq)]
pub struct SubtractionOutcome {
    pub path: PathBuf,
    /// Value flagging bad pixels.
    pub bad_value: f64,
    pub bad_pixels: usize,
    pub estimate: BackgroundEstimate,
    /// Level actually subtracted.
    pub level: f64,
    pub pixels_changed: usize,
    pub saved: bool,
}

/// Estimate and subtract the background of the image `reference` points at.
///
/// Nothing is written unless `prompt.confirm_save()` returns true.
pub fn subtract_background_file(
    reference: &ImageRef,
    prompt: &mut dyn SubtractionPrompt,
    config: &BackgroundConfig,
) -> anyhow::Result<SubtractionOutcome> {
    let loaded = read_image(reference).with_context(|| format!("reading {reference}"))?;
    let index = loaded.hdu_index;
    let mut image = loaded.data;

    let (bad_value, bad_mask) = mode_value_mask(&image.view())
        .ok_or_else(|| anyhow!("{reference} has no pixel values"))?;
    let bad_pixels = bad_mask.iter().filter(|&&bad| bad).count();
    if bad_value != 0.0 {
        warn!("{reference}: most common pixel value is {bad_value}, not 0; treating it as bad");
    }

    let estimate = estimate_background(&image.view(), &bad_mask.view(), config)
        .with_context(|| format!("estimating background of {reference}"))?;
    info!(
        "{reference}: background {:.6} sigma {:.6} after {} iterations ({} pixels)",
        estimate.mode, estimate.sigma, estimate.iterations, estimate.retained
    );

    show_histogram(
        prompt,
        &image,
        &bad_mask,
        estimate.mode,
        estimate.sigma,
        format!("{reference} before subtraction"),
    );

    let level = prompt.choose_level(&estimate)?;
    let pixels_changed = subtract_level(&mut image, &bad_mask.view(), level)?;
    info!("{reference}: subtracted {level} from {pixels_changed} pixels");

    show_histogram(
        prompt,
        &image,
        &bad_mask,
        0.0,
        estimate.sigma,
        format!("{reference} after subtraction"),
    );

    let saved = prompt.confirm_save()?;
    if saved {
        replace_image(reference.path(), index, &image)
            .with_context(|| format!("writing {}", reference.path().display()))?;
        info!("Saved {}", reference.path().display());
    } else {
        info!("{reference} left unchanged");
    }

    Ok(SubtractionOutcome {
        path: reference.path().to_path_buf(),
        bad_value,
        bad_pixels,
        estimate,
        level,
        pixels_changed,
        saved,
    })
}

fn show_histogram(
    prompt: &mut dyn SubtractionPrompt,
    image: &Array2<f64>,
    bad_mask: &Array2<bool>,
    center: f64,
    sigma: f64,
    title: String,
) {
    let good: Vec<f64> = image
        .iter()
        .zip(bad_mask.iter())
        .filter(|(_, &bad)| !bad)
        .map(|(&v, _)| v)
        .collect();
    match pixel_histogram(&good, center, sigma, Some(title)) {
        Ok(text) => prompt.display(&text),
        Err(e) => warn!("No histogram: {e}"),
    }
}

/// Whether `name` matches [`DEFAULT_INPUT_PATTERN`].
pub fn is_default_input(name: &str) -> bool {
    DEFAULT_INPUT_RE.is_match(name)
}

/// Files in `dir` matching [`DEFAULT_INPUT_PATTERN`], sorted by name.
pub fn default_inputs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() && is_default_input(&entry.file_name().to_string_lossy()) {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}
