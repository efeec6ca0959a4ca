//! Noise generation for tests and simulations
//!
//! - **generate**: seeded Gaussian and tail-contaminated noise fields

pub mod generate;

pub use generate::{contaminated_normal_array, simple_normal_array};
