//! Batch runs over science/noise pairs written to disk.

use std::path::{Path, PathBuf};

use approx::assert_relative_eq;
use cl_utils::batch::{pair_inputs, run_linearity_batch, run_snr_batch, PairOutcome};
use ndarray::{Array2, ArrayView2};
use shared::image_proc::linearity::LinearityAnalysis;
use shared::image_proc::snr::SigmaLevels;
use test_helpers::fits::{write_fits, TestHdu};
use viz::{LinearityRenderer, SnrRenderer};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn write_image(dir: &Path, name: &str, image: &Array2<f64>) -> String {
    let path = dir.join(name);
    write_fits(&path, &[TestHdu::primary(image)]).unwrap();
    path.display().to_string()
}

/// Keeps what it was asked to draw instead of drawing it.
#[derive(Default)]
struct RecordingSnrRenderer {
    rendered: Vec<(String, Array2<f64>, Vec<f64>)>,
}

impl SnrRenderer for RecordingSnrRenderer {
    fn render_snr(
        &mut self,
        snr: ArrayView2<f64>,
        levels: &SigmaLevels,
        title: &str,
    ) -> viz::Result<Option<PathBuf>> {
        self.rendered
            .push((title.to_string(), snr.to_owned(), levels.as_slice().to_vec()));
        Ok(None)
    }
}

#[derive(Default)]
struct RecordingLinearityRenderer {
    rendered: Vec<(String, LinearityAnalysis)>,
}

impl LinearityRenderer for RecordingLinearityRenderer {
    fn render_linearity(
        &mut self,
        analysis: &LinearityAnalysis,
        title: &str,
    ) -> viz::Result<Option<PathBuf>> {
        self.rendered.push((title.to_string(), analysis.clone()));
        Ok(None)
    }
}

#[test]
fn test_unclassifiable_pair_does_not_stop_batch() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let sci = Array2::from_elem((8, 8), 10.0);

    let inputs = vec![
        write_image(dir.path(), "p1_sci.fits", &sci),
        write_image(dir.path(), "p2_sci.fits", &sci),
        write_image(dir.path(), "p3_sci.fits", &sci),
        write_image(dir.path(), "p1_ivm.fits", &Array2::from_elem((8, 8), 4.0)),
        write_image(dir.path(), "p2_noise.fits", &Array2::from_elem((8, 8), 4.0)),
        write_image(dir.path(), "p3_rms.fits", &Array2::from_elem((8, 8), 2.0)),
    ];

    let pairs = pair_inputs(&inputs).unwrap();
    let mut renderer = RecordingSnrRenderer::default();
    let reports = run_snr_batch(&pairs, &SigmaLevels::new([1.5, -1.5]), &mut renderer);

    assert_eq!(reports.len(), 3);
    assert!(reports[0].is_rendered());
    assert!(matches!(
        &reports[1].outcome,
        PairOutcome::Skipped { reason } if reason.contains("p2_noise.fits")
    ));
    assert!(reports[2].is_rendered());

    assert_eq!(renderer.rendered.len(), 2);
    let (title, snr, levels) = &renderer.rendered[0];
    assert_eq!(title, "p1_sci.fits");
    assert!(snr.iter().all(|&v| v == 20.0));
    assert_eq!(levels, &vec![-1.5, 1.5]);

    let (title, snr, _) = &renderer.rendered[1];
    assert_eq!(title, "p3_sci.fits");
    assert!(snr.iter().all(|&v| v == 5.0));
}

#[test]
fn test_failed_pair_is_reported_and_batch_continues() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let sci = Array2::from_elem((4, 4), 3.0);

    let missing = dir.path().join("missing_sci.fits").display().to_string();
    let inputs = vec![
        missing,
        write_image(dir.path(), "b_sci.fits", &sci),
        write_image(dir.path(), "small_sci.fits", &Array2::from_elem((2, 2), 1.0)),
        write_image(dir.path(), "a_wht.fits", &Array2::from_elem((4, 4), 1.0)),
        write_image(dir.path(), "b_wht.fits", &Array2::from_elem((4, 4), 9.0)),
        write_image(dir.path(), "c_wht.fits", &Array2::from_elem((4, 4), 1.0)),
    ];

    let pairs = pair_inputs(&inputs).unwrap();
    let mut renderer = RecordingSnrRenderer::default();
    let reports = run_snr_batch(&pairs, &SigmaLevels::default(), &mut renderer);

    assert!(matches!(
        &reports[0].outcome,
        PairOutcome::Failed { error } if error.contains("missing_sci.fits")
    ));
    assert!(reports[1].is_rendered());
    assert!(matches!(
        &reports[2].outcome,
        PairOutcome::Failed { error } if error.contains("shape")
    ));

    assert_eq!(renderer.rendered.len(), 1);
    assert!(renderer.rendered[0].1.iter().all(|&v| v == 9.0));
    assert!(renderer.rendered[0].2.is_empty());
}

#[test]
fn test_non_positive_noise_gives_non_finite_snr() {
    let dir = tempfile::tempdir().unwrap();
    let sci = Array2::from_elem((2, 2), 5.0);
    let mut ivm = Array2::from_elem((2, 2), 1.0);
    ivm[[0, 0]] = -1.0;
    let mut rms = Array2::from_elem((2, 2), 1.0);
    rms[[1, 1]] = 0.0;

    let inputs = vec![
        write_image(dir.path(), "a_sci.fits", &sci),
        write_image(dir.path(), "b_sci.fits", &sci),
        write_image(dir.path(), "a_ivm.fits", &ivm),
        write_image(dir.path(), "b_rms.fits", &rms),
    ];
    let pairs = pair_inputs(&inputs).unwrap();
    let mut renderer = RecordingSnrRenderer::default();
    let reports = run_snr_batch(&pairs, &SigmaLevels::default(), &mut renderer);

    assert!(reports.iter().all(|r| r.is_rendered()));
    assert!(renderer.rendered[0].1[[0, 0]].is_nan());
    assert_eq!(renderer.rendered[0].1[[1, 1]], 5.0);
    assert!(renderer.rendered[1].1[[1, 1]].is_infinite());
}

#[test]
fn test_linearity_batch_reads_exposure_time() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let exptime = 400.0;
    let sky_variance = 0.01;

    // Mostly sky, with a ramp of sources whose variance has a Poisson term
    let sci = Array2::from_shape_fn((20, 20), |(r, c)| if r < 4 { (c + 1) as f64 } else { 0.0 });
    let ivm = sci.mapv(|s| 1.0 / (sky_variance + s / exptime));

    let sci_path = dir.path().join("src_sci.fits");
    write_fits(&sci_path, &[TestHdu::primary(&sci).key("EXPTIME", exptime)]).unwrap();

    let inputs = vec![
        sci_path.display().to_string(),
        write_image(dir.path(), "no_exptime_sci.fits", &sci),
        write_image(dir.path(), "src_ivm.fits", &ivm),
        write_image(dir.path(), "other_ivm.fits", &ivm),
    ];
    let pairs = pair_inputs(&inputs).unwrap();
    let mut renderer = RecordingLinearityRenderer::default();
    let reports = run_linearity_batch(&pairs, 50, &mut renderer);

    assert!(reports[0].is_rendered());
    assert!(matches!(
        &reports[1].outcome,
        PairOutcome::Failed { error } if error.contains("EXPTIME")
    ));

    let (title, analysis) = &renderer.rendered[0];
    assert_eq!(title, "src_sci.fits");
    assert_eq!(analysis.exposure_time, exptime);
    assert_relative_eq!(analysis.sky_variance, sky_variance, max_relative = 1e-6);
    assert_eq!(analysis.points.len(), 4 * 20);
    assert_eq!(analysis.ideal.len(), 50);
    for p in &analysis.points {
        assert_relative_eq!(p.snr, (p.signal * exptime).sqrt(), max_relative = 1e-4);
    }
}
