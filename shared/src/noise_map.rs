//! Noise-map classification.
//!
//! A noise map is either an inverse-variance map or an RMS map. The kind is
//! decided once, from the reference alone, before any pixels are read.
//! Inverse-variance hints are checked first, so a name matching both kinds
//! (e.g. `wht_rms.fits`) is treated as inverse variance.

use std::fmt;

use thiserror::Error;

use crate::ext_ref::ImageRef;

/// File-name substrings that mark an inverse-variance map.
pub const INVERSE_VARIANCE_HINTS: &[&str] = &["ivm", "wh"];
/// File-name substrings that mark an RMS map.
pub const RMS_HINTS: &[&str] = &["rms", "sig"];
/// Extension name of HST-style weight extensions.
pub const INVERSE_VARIANCE_EXTNAME: &str = "WHT";
/// Extension name of HST-style error extensions.
pub const RMS_EXTNAME: &str = "ERR";

/// Noise map could not be assigned a kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown weight map format {reference}")]
pub struct UnknownNoiseFormat {
    pub reference: String,
}

/// What the values of a noise map represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseKind {
    /// Values are proportional to 1/variance.
    InverseVariance,
    /// Values are the per-pixel standard deviation.
    Rms,
}

impl NoiseKind {
    /// Factor that turns a science value into an SNR.
    ///
    /// Zero and negative inputs are not special-cased: they yield `inf` or
    /// `NaN`, which downstream code treats as missing.
    pub fn snr_multiplier(self, value: f64) -> f64 {
        match self {
            NoiseKind::InverseVariance => value.sqrt(),
            NoiseKind::Rms => value.recip(),
        }
    }

    /// Per-pixel variance described by a noise value.
    pub fn variance(self, value: f64) -> f64 {
        match self {
            NoiseKind::InverseVariance => value.recip(),
            NoiseKind::Rms => value * value,
        }
    }

    /// Classify a noise map from its reference.
    ///
    /// Only the file-name component is searched for hints, and matching is
    /// case-sensitive. Extension names are compared case-insensitively.
    pub fn classify(reference: &ImageRef) -> Result<Self, UnknownNoiseFormat> {
        let file_name = reference.file_name();
        let extname = reference.extension_name().map(str::trim);
        let extname_is = |wanted: &str| extname.is_some_and(|e| e.eq_ignore_ascii_case(wanted));

        if INVERSE_VARIANCE_HINTS.iter().any(|h| file_name.contains(h))
            || extname_is(INVERSE_VARIANCE_EXTNAME)
        {
            return Ok(NoiseKind::InverseVariance);
        }
        if RMS_HINTS.iter().any(|h| file_name.contains(h)) || extname_is(RMS_EXTNAME) {
            return Ok(NoiseKind::Rms);
        }

        Err(UnknownNoiseFormat {
            reference: reference.to_string(),
        })
    }
}

impl fmt::Display for NoiseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseKind::InverseVariance => write!(f, "inverse-variance"),
            NoiseKind::Rms => write!(f, "rms"),
        }
    }
}
