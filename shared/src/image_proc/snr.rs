//! Per-pixel signal-to-noise images.
//!
//! `snr = science * multiplier(noise)` where the multiplier depends on the
//! [`NoiseKind`]. Zero, negative or non-finite noise values are not masked;
//! they produce `inf`/`NaN` SNR values which the renderers draw as missing
//! data. IEEE float operations never trap here, so no error state has to
//! be saved or restored around the division.

use ndarray::{Array2, ArrayView2, Zip};
use thiserror::Error;

use crate::noise_map::{NoiseKind, UnknownNoiseFormat};

/// Errors from SNR and linearity calculations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnrError {
    #[error("science image shape {science:?} does not match noise map shape {noise:?}")]
    ShapeMismatch {
        science: (usize, usize),
        noise: (usize, usize),
    },

    #[error(transparent)]
    UnknownNoiseFormat(#[from] UnknownNoiseFormat),

    #[error("no pixels lie above {threshold:.4} with a finite SNR")]
    EmptyLinearityPopulation { threshold: f64 },

    #[error("noise map contains no finite variance values")]
    NoFiniteVariance,
}

/// Contour thresholds in SNR units, sorted ascending.
///
/// Non-finite inputs are dropped; an empty set means no contour overlay.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SigmaLevels(Vec<f64>);

impl SigmaLevels {
    pub fn new(levels: impl IntoIterator<Item = f64>) -> Self {
        let mut levels: Vec<f64> = levels.into_iter().filter(|l| l.is_finite()).collect();
        levels.sort_by(f64::total_cmp);
        SigmaLevels(levels)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

impl FromIterator<f64> for SigmaLevels {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        SigmaLevels::new(iter)
    }
}

pub(crate) fn check_same_shape(
    science: &ArrayView2<f64>,
    noise: &ArrayView2<f64>,
) -> Result<(), SnrError> {
    if science.dim() != noise.dim() {
        return Err(SnrError::ShapeMismatch {
            science: science.dim(),
            noise: noise.dim(),
        });
    }
    Ok(())
}

/// Element-wise SNR of `science` given a `noise` map of the given kind.
///
/// ```
/// use ndarray::Array2;
/// use shared::image_proc::snr::compute_snr;
/// use shared::noise_map::NoiseKind;
///
/// let sci = Array2::from_elem((2, 2), 10.0);
/// let ivm = Array2::from_elem((2, 2), 4.0);
/// let snr = compute_snr(&sci.view(), &ivm.view(), NoiseKind::InverseVariance).unwrap();
/// assert!(snr.iter().all(|&v| v == 20.0));
/// ```
pub fn compute_snr(
    science: &ArrayView2<f64>,
    noise: &ArrayView2<f64>,
    kind: NoiseKind,
) -> Result<Array2<f64>, SnrError> {
    check_same_shape(science, noise)?;
    Ok(Zip::from(science)
        .and(noise)
        .map_collect(|&s, &n| s * kind.snr_multiplier(n)))
}

/// Finite minimum and maximum of `values`, if any value is finite.
pub fn finite_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}
