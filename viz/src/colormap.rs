//! Perceptually uniform colour map for image display.

use plotters::style::colors::colormaps::{ColorMap, ViridisRGB};
use plotters::style::RGBColor;

/// Colour for pixels without a finite value.
pub const MISSING: RGBColor = RGBColor(128, 128, 128);

/// Viridis colour at normalized position `t`, clamped to `[0, 1]`.
///
/// Non-finite `t` maps to [`MISSING`].
pub fn viridis(t: f64) -> RGBColor {
    if !t.is_finite() {
        return MISSING;
    }
    ViridisRGB.get_color(t.clamp(0.0, 1.0))
}
