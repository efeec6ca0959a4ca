//! Image processing for background and signal-to-noise analysis.
//!
//! # Module Organization
//!
//! - **background**: iterative sigma-clipped background level and noise
//! - **snr**: per-pixel SNR from a science image and a noise map
//! - **linearity**: SNR-versus-signal diagnostic against the Poisson ideal
//! - **symlog**: symmetric log normalization used to display SNR images
//! - **contour**: marching-squares iso-contours
//! - **noise**: seeded synthetic noise fields

pub mod background;
pub mod contour;
pub mod linearity;
pub mod noise;
pub mod snr;
pub mod symlog;

pub use background::{
    estimate_background, mode_value_mask, subtract_level, BackgroundConfig, BackgroundError,
    BackgroundEstimate,
};
pub use contour::{contour_lines, contour_segments, ContourLine, Segment};
pub use linearity::{linearity_diagnostic, LinearityAnalysis, LinearityPoint};
pub use snr::{compute_snr, SigmaLevels, SnrError};
pub use symlog::SymLogNorm;
