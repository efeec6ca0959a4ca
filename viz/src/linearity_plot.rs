//! Signal versus SNR scatter against the photon-noise limit.

use std::error::Error;
use std::path::{Path, PathBuf};

use log::info;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use shared::image_proc::linearity::{LinearityAnalysis, DEFAULT_IDEAL_SAMPLES};

use crate::render::{file_stem, LinearityRenderer};
use crate::{Result, VizError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearityPlotConfig {
    pub width: u32,
    pub height: u32,
    /// Samples along the ideal Poisson curve.
    pub ideal_samples: usize,
    pub output_dir: PathBuf,
}

impl Default for LinearityPlotConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            ideal_samples: DEFAULT_IDEAL_SAMPLES,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Plot ranges `(x, y)` taken from the ideal curve, widened when it
/// collapses to a point.
pub fn plot_ranges(analysis: &LinearityAnalysis) -> ((f64, f64), (f64, f64)) {
    let (x_min, x_max, y_min, y_max) = analysis.ideal_extent();
    let widen = |lo: f64, hi: f64| {
        if hi > lo {
            (lo, hi)
        } else {
            (lo - 0.5, lo + 0.5)
        }
    };
    (widen(x_min, x_max), widen(y_min, y_max))
}

/// Writes `NNN_<title>_linearity.png` files into `config.output_dir`.
#[derive(Debug, Clone)]
pub struct PngLinearityRenderer {
    config: LinearityPlotConfig,
    rendered: usize,
}

impl PngLinearityRenderer {
    pub fn new(config: LinearityPlotConfig) -> Self {
        Self {
            config,
            rendered: 0,
        }
    }

    pub fn config(&self) -> &LinearityPlotConfig {
        &self.config
    }
}

impl LinearityRenderer for PngLinearityRenderer {
    fn render_linearity(
        &mut self,
        analysis: &LinearityAnalysis,
        title: &str,
    ) -> Result<Option<PathBuf>> {
        std::fs::create_dir_all(&self.config.output_dir)?;
        self.rendered += 1;
        let path = self.config.output_dir.join(format!(
            "{:03}_{}_linearity.png",
            self.rendered,
            file_stem(title)
        ));
        draw_linearity_png(&path, analysis, title, &self.config)
            .map_err(|e| VizError::Drawing(e.to_string()))?;
        info!(
            "Saved linearity plot ({} points): {}",
            analysis.points.len(),
            path.display()
        );
        Ok(Some(path))
    }
}

fn draw_linearity_png(
    path: &Path,
    analysis: &LinearityAnalysis,
    title: &str,
    config: &LinearityPlotConfig,
) -> std::result::Result<(), Box<dyn Error>> {
    let ((x_min, x_max), (y_min, y_max)) = plot_ranges(analysis);

    let root = BitMapBackend::new(path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Signal (counts/sec)")
        .y_desc("SNR (sky variance subtracted)")
        .draw()?;

    // Axes follow the ideal curve; points beyond it are clipped
    let in_view = analysis
        .points
        .iter()
        .filter(|p| (x_min..=x_max).contains(&p.signal) && (y_min..=y_max).contains(&p.snr))
        .map(|p| (p.signal, p.snr));

    chart
        .draw_series(PointSeries::of_element(
            in_view,
            2,
            BLUE.mix(0.5).filled(),
            &|c, s, st| EmptyElement::at(c) + Circle::new((0, 0), s, st),
        ))?
        .label("Predicted (Data*sqrt(Weight))")
        .legend(|(x, y)| Circle::new((x + 5, y), 3, BLUE.filled()));

    chart
        .draw_series(LineSeries::new(analysis.ideal.iter().copied(), RED.stroke_width(2)))?
        .label("Ideal (sqrt(Counts))")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 10, y)], RED));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
