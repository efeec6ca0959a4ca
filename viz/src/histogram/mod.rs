//! Pixel-value histograms for the terminal
//!
//! Used while choosing a background level: the distribution of non-bad
//! pixels is binned around the estimated background and printed with
//! log-scaled bars, with the bin holding the estimate marked.

use crate::{Result, VizError};
use shared::algo::stats::linspace;
use std::fmt::Write;

/// Number of bin edges spanning `center ± 3 sigma`.
pub const DEFAULT_EDGE_COUNT: usize = 20;

/// Half-width of the displayed window in units of sigma.
pub const WINDOW_SIGMAS: f64 = 3.0;

/// Bar scaling for histogram display
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    /// Bar length proportional to count
    Linear,
    /// Bar length proportional to log10(count)
    Log10,
}

/// Configuration for histogram display
#[derive(Debug, Clone)]
pub struct HistogramConfig {
    /// Title for the histogram
    pub title: Option<String>,
    /// Character to use for bars
    pub bar_char: char,
    /// Whether to show counts
    pub show_counts: bool,
    pub scale: Scale,
    /// Whether to show empty bins
    pub show_empty_bins: bool,
    /// Maximum bar width in characters
    pub max_bar_width: usize,
    /// Value to mark (the `axvline` of a plotted histogram)
    pub marker: Option<f64>,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            title: None,
            bar_char: '#',
            show_counts: true,
            scale: Scale::Log10,
            show_empty_bins: true,
            max_bar_width: 50,
            marker: None,
        }
    }
}

/// Histogram over fixed bin edges.
///
/// Bins are half-open `[lo, hi)` except the last, which includes its upper
/// edge. Values outside the edges (and NaN) are counted separately.
#[derive(Debug, Clone)]
pub struct Histogram {
    bin_edges: Vec<f64>,
    counts: Vec<u64>,
    below: u64,
    above: u64,
    invalid: u64,
    config: HistogramConfig,
}

impl Histogram {
    /// Create a new histogram with specified bin edges
    pub fn new(bin_edges: Vec<f64>) -> Result<Self> {
        if bin_edges.len() < 2 {
            return Err(VizError::HistogramError(
                "Histogram must have at least 2 bin edges".to_string(),
            ));
        }
        if bin_edges.iter().any(|e| !e.is_finite()) {
            return Err(VizError::HistogramError(
                "Histogram bin edges must be finite".to_string(),
            ));
        }
        if bin_edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(VizError::HistogramError(
                "Histogram bin edges must be in ascending order".to_string(),
            ));
        }

        let counts = vec![0; bin_edges.len() - 1];
        Ok(Self {
            bin_edges,
            counts,
            below: 0,
            above: 0,
            invalid: 0,
            config: HistogramConfig::default(),
        })
    }

    /// `edge_count` evenly spaced edges over `[start, stop]`.
    pub fn with_edges(start: f64, stop: f64, edge_count: usize) -> Result<Self> {
        Self::new(linspace(start, stop, edge_count))
    }

    pub fn with_config(mut self, config: HistogramConfig) -> Self {
        self.config = config;
        self
    }

    pub fn add(&mut self, value: f64) {
        if value.is_nan() {
            self.invalid += 1;
            return;
        }
        match self.find_bin(value) {
            Some(idx) => self.counts[idx] += 1,
            None if value < self.bin_edges[0] => self.below += 1,
            None => self.above += 1,
        }
    }

    pub fn add_all<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = f64>,
    {
        for value in values {
            self.add(value);
        }
    }

    fn find_bin(&self, value: f64) -> Option<usize> {
        let last = self.bin_edges.len() - 1;
        if value < self.bin_edges[0] || value > self.bin_edges[last] {
            return None;
        }
        // First edge strictly greater than value, minus one
        let idx = self.bin_edges.partition_point(|&e| e <= value);
        Some(idx.saturating_sub(1).min(last - 1))
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn bin_edges(&self) -> &[f64] {
        &self.bin_edges
    }

    /// Values that landed in a bin.
    pub fn total_count(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Values below the first edge and above the last edge.
    pub fn out_of_range(&self) -> (u64, u64) {
        (self.below, self.above)
    }

    fn bar_length(&self, count: u64, max_count: u64) -> usize {
        if count == 0 || max_count == 0 {
            return 0;
        }
        let fraction = match self.config.scale {
            Scale::Linear => count as f64 / max_count as f64,
            // log10(1) would be an empty bar; shift so one count shows
            Scale::Log10 => (1.0 + (count as f64).log10()) / (1.0 + (max_count as f64).log10()),
        };
        ((fraction * self.config.max_bar_width as f64).round() as usize).max(1)
    }

    /// Format the histogram as a string
    pub fn format(&self) -> Result<String> {
        let mut output = String::new();

        if let Some(title) = &self.config.title {
            writeln!(output, "{}", title)?;
            writeln!(output, "{}", "=".repeat(title.len()))?;
        }

        let max_count = self.counts.iter().copied().max().unwrap_or(0);
        let count_width = max_count.to_string().len().max(5);
        let marked_bin = self.config.marker.and_then(|m| self.find_bin(m));

        writeln!(
            output,
            "{:>11}   {:>11} | {:>count_width$} | Bar",
            "From", "To", "Count"
        )?;

        for (i, &count) in self.counts.iter().enumerate() {
            if count == 0 && !self.config.show_empty_bins {
                continue;
            }
            let bar = self
                .config
                .bar_char
                .to_string()
                .repeat(self.bar_length(count, max_count));
            let mark = if marked_bin == Some(i) { " <" } else { "" };

            write!(
                output,
                "{:>+11.4e} - {:>+11.4e}",
                self.bin_edges[i],
                self.bin_edges[i + 1]
            )?;
            if self.config.show_counts {
                write!(output, " | {count:>count_width$}")?;
            }
            writeln!(output, " | {bar}{mark}")?;
        }

        if self.below + self.above + self.invalid > 0 {
            writeln!(
                output,
                "({} below, {} above range, {} NaN)",
                self.below, self.above, self.invalid
            )?;
        }
        if let Some(marker) = self.config.marker {
            writeln!(output, "< marks {marker:.6}")?;
        }
        if self.config.scale == Scale::Log10 {
            writeln!(output, "Note: bar lengths use a log10 scale")?;
        }

        Ok(output)
    }

    /// Print the histogram to stdout
    pub fn print(&self) -> Result<()> {
        println!("{}", self.format()?);
        Ok(())
    }
}

/// Log-scaled histogram of `values` over `center ± 3 sigma`, marking `center`.
///
/// A non-positive or non-finite `sigma` is an error since it leaves no
/// window to bin over.
pub fn pixel_histogram(
    values: &[f64],
    center: f64,
    sigma: f64,
    title: Option<String>,
) -> Result<String> {
    if !(sigma > 0.0 && sigma.is_finite() && center.is_finite()) {
        return Err(VizError::HistogramError(format!(
            "cannot bin around {center} with sigma {sigma}"
        )));
    }
    let half_width = WINDOW_SIGMAS * sigma;
    let mut hist =
        Histogram::with_edges(center - half_width, center + half_width, DEFAULT_EDGE_COUNT)?
            .with_config(HistogramConfig {
                title,
                marker: Some(center),
                ..HistogramConfig::default()
            });
    hist.add_all(values.iter().copied());
    hist.format()
}
