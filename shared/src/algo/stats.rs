//! Statistical functions for background and noise analysis

use std::collections::HashMap;

/// Tuning constant for the biweight location estimator (Beers, Flynn & Gebhardt 1990).
pub const BIWEIGHT_TUNING_CONSTANT: f64 = 6.0;

/// Calculate median of a slice of f64 values
///
/// This function computes the median while filtering out NaN values but including
/// infinite values (±inf). For even-length data, returns the average of the two
/// middle values.
///
/// # Arguments
///
/// * `values` - Slice of f64 values to compute median from
///
/// # Returns
///
/// * `Ok(median)` - The median value
/// * `Err(message)` - If no valid values remain after filtering NaN
pub fn median(values: &[f64]) -> Result<f64, String> {
    let mut valid_values: Vec<f64> = values.iter().filter(|v| !v.is_nan()).copied().collect();

    if valid_values.is_empty() {
        return Err(format!(
            "Insufficient data points to compute median: {} total values, 0 valid (all NaN)",
            values.len()
        ));
    }

    valid_values.sort_by(|a, b| a.total_cmp(b));

    let median_value = if valid_values.len() % 2 == 0 {
        let mid = valid_values.len() / 2;
        (valid_values[mid - 1] + valid_values[mid]) / 2.0
    } else {
        valid_values[valid_values.len() / 2]
    };

    Ok(median_value)
}

/// Arithmetic mean, or `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by N, not N - 1).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let mu = mean(values)?;
    let variance = values.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Pearson's skewness-corrected approximation of the mode: `3 * median - 2 * mean`.
///
/// Valid for mildly skewed unimodal distributions. For symmetric data
/// mean and median coincide and this reduces to the median.
pub fn pearson_mode(median: f64, mean: f64) -> f64 {
    3.0 * median - 2.0 * mean
}

/// Biweight location of the finite values in `values`.
///
/// One-step Tukey biweight centred on the median with MAD scaling:
///
/// `M + Σ(x - M)(1 - u²)² / Σ(1 - u²)²` over `|u| < 1`, where
/// `u = (x - M) / (c · MAD)`.
///
/// Returns the median when the MAD is zero and `None` when there are no
/// finite values.
pub fn biweight_location(values: &[f64], tuning: f64) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let center = median(&finite).ok()?;

    let deviations: Vec<f64> = finite.iter().map(|v| (v - center).abs()).collect();
    let mad = median(&deviations).ok()?;
    if mad == 0.0 {
        return Some(center);
    }

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for &x in &finite {
        let d = x - center;
        let u = d / (tuning * mad);
        if u.abs() < 1.0 {
            let w = (1.0 - u * u).powi(2);
            numerator += d * w;
            denominator += w;
        }
    }

    if denominator == 0.0 {
        return Some(center);
    }
    Some(center + numerator / denominator)
}

/// Most frequent value in `values` together with its count.
///
/// NaN values are ignored and `-0.0` counts as `0.0`. Ties resolve to the
/// smallest value.
pub fn pixel_value_mode(values: impl IntoIterator<Item = f64>) -> Option<(f64, usize)> {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for v in values {
        if v.is_nan() {
            continue;
        }
        let key = if v == 0.0 { 0.0f64 } else { v };
        *counts.entry(key.to_bits()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(bits, count)| (f64::from_bits(bits), count))
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.total_cmp(va)))
}

/// `n` evenly spaced samples over `[start, stop]`, inclusive of both ends.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}
