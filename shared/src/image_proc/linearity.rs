//! SNR-versus-signal diagnostic for checking the Poisson noise assumption.
//!
//! Input science data is assumed sky-subtracted and in counts per second.
//! The sky contribution to the variance is estimated with a biweight
//! location over the whole variance map and removed before computing an
//! empirical SNR, which is compared with the ideal `sqrt(counts * exptime)`.

use ndarray::{ArrayView2, Zip};

use crate::algo::stats::{biweight_location, linspace, BIWEIGHT_TUNING_CONSTANT};
use crate::image_proc::snr::{check_same_shape, SnrError};
use crate::noise_map::NoiseKind;

/// Number of samples along the ideal Poisson curve.
pub const DEFAULT_IDEAL_SAMPLES: usize = 200;

/// Pixels must exceed this many sky sigmas to be plotted.
pub const SKY_SIGMA_THRESHOLD: f64 = 2.0;

/// One plotted pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearityPoint {
    pub signal: f64,
    pub snr: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearityAnalysis {
    pub exposure_time: f64,
    pub sky_variance: f64,
    /// Signal cut, `2 * sqrt(sky_variance)`.
    pub threshold: f64,
    pub points: Vec<LinearityPoint>,
    /// Ideal `(signal, sqrt(signal * exposure_time))` samples from 0 to the
    /// largest plotted signal.
    pub ideal: Vec<(f64, f64)>,
}

impl LinearityAnalysis {
    /// Axis extents `(x_min, x_max, y_min, y_max)` of the ideal curve.
    pub fn ideal_extent(&self) -> (f64, f64, f64, f64) {
        let (first, last) = match (self.ideal.first(), self.ideal.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => ((0.0, 0.0), (0.0, 0.0)),
        };
        (first.0, last.0, first.1, last.1)
    }
}

/// Build the linearity diagnostic for one science/noise pair.
///
/// # Errors
///
/// - [`SnrError::ShapeMismatch`] if the images differ in shape
/// - [`SnrError::NoFiniteVariance`] if the noise map yields no finite variance
/// - [`SnrError::EmptyLinearityPopulation`] if no pixel clears the sky threshold
pub fn linearity_diagnostic(
    science: &ArrayView2<f64>,
    noise: &ArrayView2<f64>,
    kind: NoiseKind,
    exposure_time: f64,
    ideal_samples: usize,
) -> Result<LinearityAnalysis, SnrError> {
    check_same_shape(science, noise)?;

    let variance = noise.mapv(|n| kind.variance(n));
    let variance_values: Vec<f64> = variance.iter().copied().collect();
    let sky_variance = biweight_location(&variance_values, BIWEIGHT_TUNING_CONSTANT)
        .ok_or(SnrError::NoFiniteVariance)?;
    let threshold = SKY_SIGMA_THRESHOLD * sky_variance.sqrt();

    let mut points = Vec::new();
    Zip::from(science).and(&variance).for_each(|&signal, &var| {
        let snr = signal / (var - sky_variance).sqrt();
        if signal > threshold && snr.is_finite() {
            points.push(LinearityPoint { signal, snr });
        }
    });

    if points.is_empty() {
        return Err(SnrError::EmptyLinearityPopulation { threshold });
    }
    let max_signal = points
        .iter()
        .map(|p| p.signal)
        .fold(f64::NEG_INFINITY, f64::max);

    let ideal = linspace(0.0, max_signal, ideal_samples)
        .into_iter()
        .map(|x| (x, (x * exposure_time).sqrt()))
        .collect();

    Ok(LinearityAnalysis {
        exposure_time,
        sky_variance,
        threshold,
        points,
        ideal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    /// Sky-dominated ivm map with a few bright pixels whose variance carries
    /// a Poisson term.
    fn poisson_pair(exptime: f64) -> (Array2<f64>, Array2<f64>) {
        let sky_var = 0.01;
        let mut sci = Array2::zeros((20, 20));
        let mut ivm = Array2::from_elem((20, 20), 1.0 / sky_var);
        for (i, rate) in [1.0, 4.0, 9.0, 16.0].into_iter().enumerate() {
            sci[[i, i]] = rate;
            ivm[[i, i]] = 1.0 / (sky_var + rate / exptime);
        }
        (sci, ivm)
    }

    #[test]
    fn test_poisson_pixels_follow_ideal_curve() {
        let exptime = 100.0;
        let (sci, ivm) = poisson_pair(exptime);
        let analysis = linearity_diagnostic(
            &sci.view(),
            &ivm.view(),
            NoiseKind::InverseVariance,
            exptime,
            DEFAULT_IDEAL_SAMPLES,
        )
        .unwrap();

        assert_relative_eq!(analysis.sky_variance, 0.01, epsilon = 1e-9);
        assert_relative_eq!(analysis.threshold, 0.2, epsilon = 1e-9);
        assert_eq!(analysis.points.len(), 4);
        for p in &analysis.points {
            assert_relative_eq!(p.snr, (p.signal * exptime).sqrt(), epsilon = 1e-6);
        }

        assert_eq!(analysis.ideal.len(), DEFAULT_IDEAL_SAMPLES);
        let (x0, x1, y0, y1) = analysis.ideal_extent();
        assert_eq!((x0, y0), (0.0, 0.0));
        assert_relative_eq!(x1, 16.0);
        assert_relative_eq!(y1, 40.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rms_maps_are_accepted() {
        let exptime = 50.0;
        let (sci, ivm) = poisson_pair(exptime);
        let rms = ivm.mapv(|w| (1.0 / w).sqrt());
        let analysis =
            linearity_diagnostic(&sci.view(), &rms.view(), NoiseKind::Rms, exptime, 10).unwrap();
        assert_eq!(analysis.points.len(), 4);
        assert_relative_eq!(analysis.sky_variance, 0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_faint_pixels_are_excluded() {
        let (mut sci, ivm) = poisson_pair(100.0);
        sci[[10, 10]] = 0.1;
        let analysis = linearity_diagnostic(
            &sci.view(),
            &ivm.view(),
            NoiseKind::InverseVariance,
            100.0,
            5,
        )
        .unwrap();
        assert!(analysis.points.iter().all(|p| p.signal > 0.2));
    }

    #[test]
    fn test_empty_population() {
        let sci = Array2::zeros((5, 5));
        let ivm = Array2::from_elem((5, 5), 100.0);
        let err = linearity_diagnostic(
            &sci.view(),
            &ivm.view(),
            NoiseKind::InverseVariance,
            10.0,
            DEFAULT_IDEAL_SAMPLES,
        )
        .unwrap_err();
        assert!(matches!(err, SnrError::EmptyLinearityPopulation { .. }));
    }

    #[test]
    fn test_no_finite_variance() {
        let sci = Array2::from_elem((2, 2), 1.0);
        let ivm = Array2::from_elem((2, 2), f64::NAN);
        let err =
            linearity_diagnostic(&sci.view(), &ivm.view(), NoiseKind::InverseVariance, 1.0, 5)
                .unwrap_err();
        assert_eq!(err, SnrError::NoFiniteVariance);
    }
}
