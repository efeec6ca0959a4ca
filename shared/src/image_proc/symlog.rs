//! Symmetric logarithmic normalization for signed, high dynamic range images.
//!
//! Values within `±linear_threshold` map linearly; beyond that the scale is
//! logarithmic in `base`. With a threshold of one SNR unit the sky noise is
//! shown linearly while bright sources compress.

use crate::algo::stats::linspace;
use crate::image_proc::snr::finite_range;

/// Linear/log scale with a symmetric linear region around zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymLogNorm {
    linear_threshold: f64,
    base: f64,
    /// `linscale / (1 - 1/base)`: slope of the linear region.
    linear_scale_adj: f64,
    vmin: f64,
    vmax: f64,
}

impl SymLogNorm {
    pub const DEFAULT_BASE: f64 = 10.0;
    pub const DEFAULT_LINEAR_SCALE: f64 = 1.0;

    /// Norm over `[vmin, vmax]` with base 10 and unit linear scale.
    ///
    /// `linear_threshold` must be positive; non-positive values fall back to 1.
    pub fn new(linear_threshold: f64, vmin: f64, vmax: f64) -> Self {
        Self::with_base(
            linear_threshold,
            Self::DEFAULT_LINEAR_SCALE,
            Self::DEFAULT_BASE,
            vmin,
            vmax,
        )
    }

    pub fn with_base(
        linear_threshold: f64,
        linear_scale: f64,
        base: f64,
        vmin: f64,
        vmax: f64,
    ) -> Self {
        let linear_threshold = if linear_threshold > 0.0 {
            linear_threshold
        } else {
            1.0
        };
        let (vmin, vmax) = if vmin <= vmax { (vmin, vmax) } else { (vmax, vmin) };
        Self {
            linear_threshold,
            base,
            linear_scale_adj: linear_scale / (1.0 - base.recip()),
            vmin,
            vmax,
        }
    }

    /// Norm spanning the finite range of `values`.
    ///
    /// A constant image is widened by one threshold on each side; an image
    /// with no finite values spans `[-threshold, threshold]`.
    pub fn from_data<'a>(linear_threshold: f64, values: impl IntoIterator<Item = &'a f64>) -> Self {
        let t = if linear_threshold > 0.0 {
            linear_threshold
        } else {
            1.0
        };
        let (lo, hi) = match finite_range(values) {
            Some((lo, hi)) if lo < hi => (lo, hi),
            Some((v, _)) => (v - t, v + t),
            None => (-t, t),
        };
        Self::new(t, lo, hi)
    }

    pub fn vmin(&self) -> f64 {
        self.vmin
    }

    pub fn vmax(&self) -> f64 {
        self.vmax
    }

    /// Forward transform into the scaled space.
    pub fn transform(&self, x: f64) -> f64 {
        let t = self.linear_threshold;
        if x.abs() <= t {
            x * self.linear_scale_adj
        } else {
            x.signum() * t * (self.linear_scale_adj + (x.abs() / t).log(self.base))
        }
    }

    pub fn inverse_transform(&self, y: f64) -> f64 {
        let t = self.linear_threshold;
        if y.abs() <= t * self.linear_scale_adj {
            y / self.linear_scale_adj
        } else {
            y.signum() * t * self.base.powf(y.abs() / t - self.linear_scale_adj)
        }
    }

    /// Map `x` to `[0, 1]` over `[vmin, vmax]`. Values outside the range are
    /// not clipped; non-finite input stays non-finite.
    pub fn normalize(&self, x: f64) -> f64 {
        let lo = self.transform(self.vmin);
        let hi = self.transform(self.vmax);
        if hi == lo {
            return 0.0;
        }
        (self.transform(x) - lo) / (hi - lo)
    }

    /// Data value whose normalized position is `v`.
    pub fn inverse(&self, v: f64) -> f64 {
        let lo = self.transform(self.vmin);
        let hi = self.transform(self.vmax);
        self.inverse_transform(lo + v * (hi - lo))
    }

    /// `n` tick values evenly spaced in normalized space, in data units.
    pub fn ticks(&self, n: usize) -> Vec<f64> {
        linspace(0.0, 1.0, n)
            .into_iter()
            .map(|v| self.inverse(v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_region() {
        let norm = SymLogNorm::new(1.0, -100.0, 100.0);
        let c = 1.0 / (1.0 - 0.1);
        assert_relative_eq!(norm.transform(0.5), 0.5 * c, epsilon = 1e-12);
        assert_relative_eq!(norm.transform(-1.0), -c, epsilon = 1e-12);
        assert_eq!(norm.transform(0.0), 0.0);
    }

    #[test]
    fn test_log_region() {
        let norm = SymLogNorm::new(1.0, -100.0, 100.0);
        let c = 1.0 / (1.0 - 0.1);
        assert_relative_eq!(norm.transform(10.0), c + 1.0, epsilon = 1e-12);
        assert_relative_eq!(norm.transform(-100.0), -(c + 2.0), epsilon = 1e-12);
    }

    #[test]
    fn test_transform_is_continuous_at_threshold() {
        let norm = SymLogNorm::new(2.0, -50.0, 50.0);
        let below = norm.transform(2.0 - 1e-9);
        let above = norm.transform(2.0 + 1e-9);
        assert_relative_eq!(below, above, epsilon = 1e-6);
    }

    #[test]
    fn test_inverse_round_trip() {
        let norm = SymLogNorm::new(1.0, -20.0, 300.0);
        for x in [-20.0, -3.0, -0.7, 0.0, 0.4, 1.0, 5.0, 299.0] {
            assert_relative_eq!(norm.inverse_transform(norm.transform(x)), x, epsilon = 1e-9);
            assert_relative_eq!(norm.inverse(norm.normalize(x)), x, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_normalize_endpoints() {
        let norm = SymLogNorm::new(1.0, -5.0, 1000.0);
        assert_relative_eq!(norm.normalize(-5.0), 0.0, epsilon = 1e-12);
        assert_relative_eq!(norm.normalize(1000.0), 1.0, epsilon = 1e-12);
        assert!(norm.normalize(f64::NAN).is_nan());
    }

    #[test]
    fn test_ticks_span_range() {
        let norm = SymLogNorm::new(1.0, -10.0, 1000.0);
        let ticks = norm.ticks(10);
        assert_eq!(ticks.len(), 10);
        assert_relative_eq!(ticks[0], -10.0, epsilon = 1e-9);
        assert_relative_eq!(ticks[9], 1000.0, epsilon = 1e-6);
        assert!(ticks.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_from_data_ignores_non_finite() {
        let values = [f64::NAN, -2.0, 7.0, f64::INFINITY];
        let norm = SymLogNorm::from_data(1.0, &values);
        assert_eq!((norm.vmin(), norm.vmax()), (-2.0, 7.0));

        let flat = SymLogNorm::from_data(1.0, &[3.0, 3.0]);
        assert_eq!((flat.vmin(), flat.vmax()), (2.0, 4.0));

        let empty = SymLogNorm::from_data(1.0, &[f64::NAN]);
        assert_eq!((empty.vmin(), empty.vmax()), (-1.0, 1.0));
    }
}
