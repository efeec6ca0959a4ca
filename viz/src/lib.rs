//! Visualization for background and SNR analysis.
//!
//! Two kinds of output are provided:
//!
//! - **ASCII histograms** (`histogram`) printed to the terminal while a
//!   background level is being chosen. They work over SSH and inside logs.
//! - **PNG renderers** (`snr_plot`, `linearity_plot`) built on plotters,
//!   implementing the [`render::SnrRenderer`] and
//!   [`render::LinearityRenderer`] traits. Callers depend only on the
//!   traits, so batch code can be exercised with a recording renderer.
//!
//! # Example
//!
//! ```rust
//! use viz::histogram::pixel_histogram;
//!
//! let pixels = vec![9.8, 10.1, 10.0, 9.9, 10.3, 10.0];
//! let text = pixel_histogram(&pixels, 10.0, 0.2, Some("Sky".to_string()))?;
//! println!("{text}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::io;

use thiserror::Error;

/// Error types for visualization operations.
#[derive(Debug, Error)]
pub enum VizError {
    /// Histogram creation or analysis error.
    ///
    /// Includes issues with bin configuration and data validation.
    #[error("Histogram error: {0}")]
    HistogramError(String),

    /// Text formatting error.
    #[error("Formatting error: {0}")]
    FmtError(#[from] fmt::Error),

    /// Plot backend failure (font lookup, PNG encoding, layout).
    #[error("Drawing error: {0}")]
    Drawing(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Nothing to draw.
    #[error("Empty image: {0}")]
    EmptyImage(String),
}

/// Standard Result type for all visualization operations.
pub type Result<T> = std::result::Result<T, VizError>;

pub mod colormap;
pub mod histogram;
pub mod linearity_plot;
pub mod render;
pub mod snr_plot;

pub use linearity_plot::{LinearityPlotConfig, PngLinearityRenderer};
pub use render::{LinearityRenderer, SnrRenderer};
pub use snr_plot::{PngSnrRenderer, SnrPlotConfig};
