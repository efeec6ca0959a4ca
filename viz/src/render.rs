//! Rendering seams used by the batch drivers.

use std::path::PathBuf;

use ndarray::ArrayView2;
use shared::image_proc::linearity::LinearityAnalysis;
use shared::image_proc::snr::SigmaLevels;

use crate::Result;

/// Displays an SNR image with optional contours.
pub trait SnrRenderer {
    /// Render `snr`, returning the written file if the renderer produces one.
    fn render_snr(
        &mut self,
        snr: ArrayView2<f64>,
        levels: &SigmaLevels,
        title: &str,
    ) -> Result<Option<PathBuf>>;
}

/// Displays a linearity diagnostic.
pub trait LinearityRenderer {
    fn render_linearity(
        &mut self,
        analysis: &LinearityAnalysis,
        title: &str,
    ) -> Result<Option<PathBuf>>;
}

/// File-name friendly form of a plot title.
pub(crate) fn file_stem(title: &str) -> String {
    let name = title.rsplit(['/', '\\']).next().unwrap_or(title);
    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_end_matches(".fits").trim_end_matches(".fit");
    if stem.is_empty() {
        "image".to_string()
    } else {
        stem.to_string()
    }
}
