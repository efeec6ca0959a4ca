//! Synthetic noise fields for exercising the estimators.
//!
//! # Core Functions
//!
//! ## Simple Normal Array
//! Deterministic Gaussian noise fields for reproducible tests.
//!
//! ## Contaminated Normal Array
//! Gaussian background with a one-sided exponential tail mixed in, the
//! shape of a sky background polluted by faint sources and cosmic rays.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal, NormalError};

/// Generate a 2D array of normally distributed values for testing purposes.
///
/// # Arguments
/// * `size` - Tuple of (height, width) for the output array dimensions
/// * `mean` - Mean value of the normal distribution
/// * `std_dev` - Standard deviation of the normal distribution
/// * `seed` - Random seed for deterministic output
///
/// # Returns
/// A 2D array with values sampled from Normal(mean, std_dev), or the
/// distribution error for a negative or non-finite `std_dev`.
pub fn simple_normal_array(
    size: (usize, usize),
    mean: f64,
    std_dev: f64,
    seed: u64,
) -> Result<Array2<f64>, NormalError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal_dist = Normal::new(mean, std_dev)?;
    Ok(Array2::from_shape_fn(size, |_| normal_dist.sample(&mut rng)))
}

/// Gaussian noise with a fraction of pixels pushed up by an exponential tail.
///
/// Each pixel is drawn from Normal(mean, std_dev); with probability
/// `tail_fraction` an Exp(1/`tail_scale`) deviate is added on top. The
/// fraction is clamped to `[0, 1]`; a non-positive `tail_scale` disables the tail.
pub fn contaminated_normal_array(
    size: (usize, usize),
    mean: f64,
    std_dev: f64,
    tail_fraction: f64,
    tail_scale: f64,
    seed: u64,
) -> Result<Array2<f64>, NormalError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal_dist = Normal::new(mean, std_dev)?;
    let tail = Exp::new(tail_scale.recip()).ok().filter(|_| tail_scale > 0.0);
    let fraction = tail_fraction.clamp(0.0, 1.0);

    Ok(Array2::from_shape_fn(size, |_| {
        let base = normal_dist.sample(&mut rng);
        match &tail {
            Some(exp) if rng.gen_bool(fraction) => base + exp.sample(&mut rng),
            _ => base,
        }
    }))
}
