//! Algorithms shared across the image analysis pipeline
//!
//! Currently this is the statistics toolbox used by background estimation,
//! the linearity diagnostic and the histogram displays.

pub mod stats;

pub use stats::{
    biweight_location, linspace, mean, median, pearson_mode, pixel_value_mode, std_dev,
    BIWEIGHT_TUNING_CONSTANT,
};
