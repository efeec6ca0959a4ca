//! SNR image rendering to PNG.
//!
//! The image is drawn with the origin at the lower left, coloured with
//! viridis after symmetric-log normalization, with a colour bar whose ticks
//! are evenly spaced in normalized space and labelled in SNR units.
//! Contours at the requested sigma levels are drawn in black.

use std::error::Error;
use std::path::{Path, PathBuf};

use log::info;
use ndarray::ArrayView2;
use plotters::coord::Shift;
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use shared::image_proc::contour::contour_lines;
use shared::image_proc::snr::SigmaLevels;
use shared::image_proc::symlog::SymLogNorm;

use crate::colormap::viridis;
use crate::render::{file_stem, SnrRenderer};
use crate::{Result, VizError};

/// Steps used to draw the colour bar gradient.
const COLORBAR_STEPS: usize = 256;

/// Layout and scaling of SNR plots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnrPlotConfig {
    pub width: u32,
    pub height: u32,
    /// Half-width of the linear region of the colour scale, in SNR units.
    pub linear_threshold: f64,
    pub colorbar_ticks: usize,
    pub output_dir: PathBuf,
}

impl Default for SnrPlotConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 750,
            linear_threshold: 1.0,
            colorbar_ticks: 10,
            output_dir: PathBuf::from("."),
        }
    }
}

/// Colour bar tick values in SNR units: `norm.inverse(linspace(0, 1, n))`.
pub fn colorbar_ticks(norm: &SymLogNorm, n: usize) -> Vec<f64> {
    norm.ticks(n)
}

/// Short tick label: three significant digits.
pub fn format_tick(v: f64) -> String {
    if v == 0.0 {
        return "0".to_string();
    }
    let magnitude = v.abs().log10().floor();
    if (-2.0..4.0).contains(&magnitude) {
        let decimals = (2.0 - magnitude).max(0.0) as usize;
        format!("{v:.decimals$}")
    } else {
        format!("{v:.2e}")
    }
}

/// Pixel stride so the image fits within `max_cols` x `max_rows` cells.
pub fn decimation_stride(shape: (usize, usize), max_cols: u32, max_rows: u32) -> usize {
    let (rows, cols) = shape;
    let by_cols = cols.div_ceil(max_cols.max(1) as usize);
    let by_rows = rows.div_ceil(max_rows.max(1) as usize);
    by_cols.max(by_rows).max(1)
}

/// Writes one PNG per rendered SNR image into `config.output_dir`.
///
/// Files are named `NNN_<title>_snr.png`, numbered in rendering order.
#[derive(Debug, Clone)]
pub struct PngSnrRenderer {
    config: SnrPlotConfig,
    rendered: usize,
}

impl PngSnrRenderer {
    pub fn new(config: SnrPlotConfig) -> Self {
        Self {
            config,
            rendered: 0,
        }
    }

    pub fn config(&self) -> &SnrPlotConfig {
        &self.config
    }

    fn next_path(&mut self, title: &str) -> PathBuf {
        self.rendered += 1;
        self.config
            .output_dir
            .join(format!("{:03}_{}_snr.png", self.rendered, file_stem(title)))
    }
}

impl SnrRenderer for PngSnrRenderer {
    fn render_snr(
        &mut self,
        snr: ArrayView2<f64>,
        levels: &SigmaLevels,
        title: &str,
    ) -> Result<Option<PathBuf>> {
        if snr.is_empty() {
            return Err(VizError::EmptyImage(title.to_string()));
        }
        std::fs::create_dir_all(&self.config.output_dir)?;
        let path = self.next_path(title);
        draw_snr_png(&path, &snr, levels, title, &self.config)
            .map_err(|e| VizError::Drawing(e.to_string()))?;
        info!("Saved SNR image: {}", path.display());
        Ok(Some(path))
    }
}

fn draw_snr_png(
    path: &Path,
    snr: &ArrayView2<f64>,
    levels: &SigmaLevels,
    title: &str,
    config: &SnrPlotConfig,
) -> std::result::Result<(), Box<dyn Error>> {
    let (rows, cols) = snr.dim();
    let norm = SymLogNorm::from_data(config.linear_threshold, snr.iter());

    let root = BitMapBackend::new(path, (config.width, config.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let colorbar_width = (config.width / 7).max(90);
    let (image_area, bar_area) =
        root.split_horizontally(config.width.saturating_sub(colorbar_width));

    let mut chart = ChartBuilder::on(&image_area)
        .caption(title, ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(0f64..cols as f64, 0f64..rows as f64)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("x (pixel)")
        .y_desc("y (pixel)")
        .draw()?;

    let (plot_w, plot_h) = chart.plotting_area().dim_in_pixel();
    let stride = decimation_stride((rows, cols), plot_w, plot_h);

    chart.draw_series(
        (0..rows)
            .step_by(stride)
            .flat_map(|r| (0..cols).step_by(stride).map(move |c| (r, c)))
            .map(|(r, c)| {
                let color = viridis(norm.normalize(snr[[r, c]]));
                let (x1, y1) = ((c + stride).min(cols), (r + stride).min(rows));
                Rectangle::new(
                    [(c as f64, r as f64), (x1 as f64, y1 as f64)],
                    color.filled(),
                )
            }),
    )?;

    // Contour vertices sit on pixel centres
    for line in contour_lines(snr, levels.as_slice()) {
        chart.draw_series(line.segments.iter().map(|s| {
            PathElement::new(
                vec![
                    (s.start.0 + 0.5, s.start.1 + 0.5),
                    (s.end.0 + 0.5, s.end.1 + 0.5),
                ],
                BLACK.stroke_width(1),
            )
        }))?;
    }

    draw_colorbar(&bar_area, &norm, config.colorbar_ticks)?;

    root.present()?;
    Ok(())
}

/// Vertical colour bar in normalized space; tick `i` of `n` sits at
/// `i / (n - 1)`, labelled with its SNR value.
fn draw_colorbar(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    norm: &SymLogNorm,
    n_ticks: usize,
) -> std::result::Result<(), Box<dyn Error>> {
    let n_ticks = n_ticks.max(2);
    let last = (n_ticks - 1) as f64;
    let ticks = colorbar_ticks(norm, n_ticks);

    // Y runs over tick indices so the mesh puts a label on each one
    let mut bar = ChartBuilder::on(area)
        .margin_top(52)
        .margin_bottom(50)
        .margin_right(10)
        .right_y_label_area_size(60)
        .build_cartesian_2d(0f64..1f64, 0f64..last)?;

    let formatter = |y: &f64| {
        let index = y.round().clamp(0.0, last) as usize;
        ticks.get(index).map(|&t| format_tick(t)).unwrap_or_default()
    };
    bar.configure_mesh()
        .disable_mesh()
        .x_labels(0)
        .y_labels(n_ticks)
        .y_label_formatter(&formatter)
        .y_desc("S/N")
        .draw()?;

    let step = last / COLORBAR_STEPS as f64;
    bar.draw_series((0..COLORBAR_STEPS).map(|i| {
        let y0 = i as f64 * step;
        let color = viridis((i as f64 + 0.5) / COLORBAR_STEPS as f64);
        Rectangle::new([(0.0, y0), (1.0, y0 + step)], color.filled())
    }))?;
    Ok(())
}
