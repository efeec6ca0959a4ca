//! FITS file I/O for astronomical images
//!
//! Built on `fitsio`. Images are 2-D with array row 0 holding the first
//! FITS row; values come back as `f64` with any BSCALE/BZERO applied.
//! Files are modified through a copy that replaces the original only once
//! every change has been written.

pub mod header;

use std::fs;
use std::path::Path;

use fitsio::hdu::HduInfo;
use fitsio::images::ImageType;
use fitsio::FitsFile;
use log::debug;
use ndarray::Array2;
use thiserror::Error;

use crate::ext_ref::{ExtensionSelector, ImageRef};

pub use header::{Card, Header};

/// Errors that can occur during FITS file operations
#[derive(Error, Debug)]
pub enum FitsError {
    #[error("FITS I/O error: {0}")]
    FitsIo(#[from] fitsio::errors::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cfitsio {call} failed with status {status}")]
    Cfitsio { call: &'static str, status: i32 },
    #[error("HDU not found: {0}")]
    HduNotFound(String),
    #[error("Invalid data type in HDU: {0}")]
    InvalidDataType(String),
    #[error("Unsupported image dimensions {0}; only 2-D images are handled")]
    UnsupportedDimensions(String),
    #[error("HDU {0} has no image data")]
    NoImageData(usize),
}

/// What [`resolve`] needs to know about one HDU.
#[derive(Debug, Clone, PartialEq)]
pub struct HduSummary {
    pub index: usize,
    /// `EXTNAME`, surrounding blanks removed.
    pub extname: Option<String>,
    /// `EXTVER`, defaulting to 1.
    pub extver: i64,
    /// Image BITPIX, `None` for tables.
    pub bitpix: Option<i32>,
    /// Axis lengths, slowest varying first: `[NAXIS2, NAXIS1]` for 2-D.
    pub shape: Vec<usize>,
}

impl HduSummary {
    /// Image HDU with at least one pixel.
    pub fn has_image_data(&self) -> bool {
        self.bitpix.is_some() && !self.shape.is_empty() && self.shape.iter().all(|&n| n > 0)
    }

    fn is_named(&self, name: &str, version: u32) -> bool {
        self.extname
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case(name.trim()))
            && self.extver == i64::from(version)
    }
}

fn image_type_to_bitpix(image_type: &ImageType) -> i32 {
    match image_type {
        ImageType::UnsignedByte | ImageType::Byte => 8,
        ImageType::Short | ImageType::UnsignedShort => 16,
        ImageType::Long | ImageType::UnsignedLong => 32,
        ImageType::LongLong => 64,
        ImageType::Float => -32,
        ImageType::Double => -64,
    }
}

/// Walk every HDU of an open file.
pub fn hdu_summaries(fptr: &mut FitsFile) -> Vec<HduSummary> {
    let mut summaries = Vec::new();
    let mut index = 0;
    while let Ok(hdu) = fptr.hdu(index) {
        let extname = hdu
            .read_key::<String>(fptr, "EXTNAME")
            .ok()
            .map(|n| n.trim().to_string());
        let extver = hdu.read_key::<i64>(fptr, "EXTVER").unwrap_or(1);
        let (bitpix, shape) = match &hdu.info {
            HduInfo::ImageInfo { shape, image_type } => {
                (Some(image_type_to_bitpix(image_type)), shape.clone())
            }
            _ => (None, Vec::new()),
        };
        summaries.push(HduSummary {
            index,
            extname,
            extver,
            bitpix,
            shape,
        });
        index += 1;
    }
    summaries
}

/// Index of the HDU a selector refers to.
///
/// With no selector this is the primary HDU when it holds image data,
/// otherwise the first image extension.
pub fn resolve(
    hdus: &[HduSummary],
    selector: Option<&ExtensionSelector>,
) -> Result<usize, FitsError> {
    match selector {
        Some(ExtensionSelector::Index(i)) => {
            if *i < hdus.len() {
                Ok(*i)
            } else {
                Err(FitsError::HduNotFound(format!(
                    "index {i} (file has {} HDUs)",
                    hdus.len()
                )))
            }
        }
        Some(ExtensionSelector::Named { name, version }) => hdus
            .iter()
            .find(|h| h.is_named(name, *version))
            .map(|h| h.index)
            .ok_or_else(|| FitsError::HduNotFound(format!("{name},{version}"))),
        None => hdus
            .iter()
            .find(|h| h.has_image_data())
            .map(|h| h.index)
            .ok_or_else(|| FitsError::HduNotFound("no HDU with image data".to_string())),
    }
}

/// `(rows, cols)` of a 2-D image HDU. Axis products that overflow are
/// rejected rather than trusted.
pub fn image_shape(hdu: &HduSummary) -> Result<(usize, usize), FitsError> {
    if !hdu.has_image_data() {
        return Err(FitsError::NoImageData(hdu.index));
    }
    match hdu.shape[..] {
        [rows, cols] if rows.checked_mul(cols).is_some() => Ok((rows, cols)),
        _ => Err(FitsError::UnsupportedDimensions(format!("{:?}", hdu.shape))),
    }
}

fn read_hdu_image(fptr: &mut FitsFile, hdu: &HduSummary) -> Result<Array2<f64>, FitsError> {
    let (rows, cols) = image_shape(hdu)?;
    let pixels: Vec<f64> = fptr.hdu(hdu.index)?.read_image(fptr)?;
    Array2::from_shape_vec((rows, cols), pixels).map_err(|_| {
        FitsError::InvalidDataType(format!(
            "Cannot reshape image data for HDU {} to {rows}x{cols}",
            hdu.index
        ))
    })
}

/// An image read through an [`ImageRef`], with the headers needed to
/// interpret it.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub data: Array2<f64>,
    pub hdu_index: usize,
    pub header: Header,
    pub primary_header: Header,
}

impl LoadedImage {
    /// Numeric keyword from the image HDU, falling back to the primary header.
    pub fn keyword_f64(&self, keyword: &str) -> Option<f64> {
        self.header
            .get_f64(keyword)
            .or_else(|| self.primary_header.get_f64(keyword))
    }
}

/// Read the image a compound reference points at.
pub fn read_image(reference: &ImageRef) -> Result<LoadedImage, FitsError> {
    let mut fptr = FitsFile::open(reference.path())?;
    let hdus = hdu_summaries(&mut fptr);
    let index = resolve(&hdus, reference.extension.as_ref())?;
    let data = read_hdu_image(&mut fptr, &hdus[index])?;
    let header = header::read_header(&mut fptr, index)?;
    let primary_header = if index == 0 {
        header.clone()
    } else {
        header::read_header(&mut fptr, 0)?
    };
    debug!(
        "read {}x{} image from HDU {index} of {}",
        data.nrows(),
        data.ncols(),
        reference.path().display()
    );
    Ok(LoadedImage {
        data,
        hdu_index: index,
        header,
        primary_header,
    })
}

/// Every card of HDU `index` of the file at `path`.
pub fn read_header_at(path: &Path, index: usize) -> Result<Header, FitsError> {
    let mut fptr = FitsFile::open(path)?;
    header::read_header(&mut fptr, index)
}

/// Run `edit` on a copy of `path`, then move the copy over the original.
///
/// The original is untouched if `edit` fails.
pub fn edit_in_place<T, F>(path: &Path, edit: F) -> Result<T, FitsError>
where
    F: FnOnce(&mut FitsFile) -> Result<T, FitsError>,
{
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    fs::copy(path, tmp.path())?;

    let result = {
        let mut fptr = FitsFile::edit(tmp.path())?;
        edit(&mut fptr)?
        // dropping fptr closes and flushes the copy
    };
    tmp.persist(path).map_err(|e| FitsError::Io(e.error))?;
    Ok(result)
}

/// Replace the pixels of image HDU `index`.
///
/// The image is stored as BITPIX -32 if the HDU already was, otherwise as
/// -64; BSCALE, BZERO and BLANK are removed.
pub fn write_hdu_image(
    fptr: &mut FitsFile,
    index: usize,
    pixels: &Array2<f64>,
) -> Result<(), FitsError> {
    let hdu = fptr.hdu(index)?;
    let bitpix = match &hdu.info {
        HduInfo::ImageInfo {
            image_type: ImageType::Float,
            ..
        } => -32,
        HduInfo::ImageInfo { .. } => -64,
        _ => {
            return Err(FitsError::InvalidDataType(format!(
                "HDU {index} is not an image"
            )))
        }
    };

    header::delete_matching(fptr, index, |k| matches!(k, "BSCALE" | "BZERO" | "BLANK"))?;
    header::reshape_image(fptr, index, bitpix, pixels.dim())?;

    let hdu = fptr.hdu(index)?;
    if bitpix == -32 {
        let flat: Vec<f32> = pixels.iter().map(|&v| v as f32).collect();
        hdu.write_image(fptr, &flat)?;
    } else {
        let flat: Vec<f64> = pixels.iter().copied().collect();
        hdu.write_image(fptr, &flat)?;
    }
    Ok(())
}

/// Replace the pixels of HDU `index` of the file at `path`, leaving every
/// other HDU as it was.
pub fn replace_image(path: &Path, index: usize, pixels: &Array2<f64>) -> Result<(), FitsError> {
    edit_in_place(path, |fptr| write_hdu_image(fptr, index, pixels))?;
    debug!("rewrote HDU {index} of {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use tempfile::tempdir;
    use test_helpers::fits::{write_fits, write_header_only, TestHdu};

    fn summary(index: usize, extname: Option<&str>, extver: i64, shape: &[usize]) -> HduSummary {
        HduSummary {
            index,
            extname: extname.map(str::to_string),
            extver,
            bitpix: Some(-64),
            shape: shape.to_vec(),
        }
    }

    fn mef_summaries() -> Vec<HduSummary> {
        vec![
            summary(0, None, 1, &[]),
            summary(1, Some("SCI"), 1, &[2, 2]),
            summary(2, Some("ERR"), 1, &[2, 2]),
            summary(3, Some("SCI"), 2, &[2, 2]),
        ]
    }

    fn write_mef(path: &Path) {
        let sci = array![[1.0, 2.0], [3.0, 4.0]];
        let err = array![[0.5, 0.5], [0.5, 0.5]];
        write_fits(
            path,
            &[
                TestHdu::empty_primary().key("EXPTIME", 500.0),
                TestHdu::extension("SCI", 1, &sci),
                TestHdu::extension("ERR", 1, &err),
                TestHdu::extension("SCI", 2, &(sci * 10.0)).single_precision(),
            ],
        )
        .unwrap();
    }

    #[test]
    fn test_fits_error_display() {
        let error = FitsError::HduNotFound("TEST".to_string());
        assert!(error.to_string().contains("HDU not found: TEST"));

        let error = FitsError::InvalidDataType("bad data".to_string());
        assert!(error
            .to_string()
            .contains("Invalid data type in HDU: bad data"));
    }

    #[test]
    fn test_resolve_selectors() {
        let hdus = mef_summaries();
        assert_eq!(resolve(&hdus, None).unwrap(), 1);
        assert_eq!(resolve(&hdus, Some(&ExtensionSelector::Index(2))).unwrap(), 2);
        assert_eq!(
            resolve(&hdus, Some(&ExtensionSelector::named("sci"))).unwrap(),
            1
        );
        assert_eq!(
            resolve(
                &hdus,
                Some(&ExtensionSelector::Named {
                    name: "SCI".to_string(),
                    version: 2
                })
            )
            .unwrap(),
            3
        );
        assert!(matches!(
            resolve(&hdus, Some(&ExtensionSelector::named("WHT"))),
            Err(FitsError::HduNotFound(_))
        ));
        assert!(matches!(
            resolve(&hdus, Some(&ExtensionSelector::Index(9))),
            Err(FitsError::HduNotFound(_))
        ));
    }

    #[test]
    fn test_default_is_primary_when_it_has_data() {
        let hdus = vec![summary(0, None, 1, &[1, 1]), summary(1, Some("SCI"), 1, &[2, 2])];
        assert_eq!(resolve(&hdus, None).unwrap(), 0);
    }

    #[test]
    fn test_image_shape_rejects_overflowing_axes() {
        let huge = 1usize << 40;
        let hdu = summary(0, None, 1, &[huge, huge]);
        assert!(matches!(
            image_shape(&hdu),
            Err(FitsError::UnsupportedDimensions(_))
        ));
        assert!(matches!(
            image_shape(&summary(0, None, 1, &[2, 3, 4])),
            Err(FitsError::UnsupportedDimensions(_))
        ));
        assert!(matches!(
            image_shape(&summary(4, None, 1, &[])),
            Err(FitsError::NoImageData(4))
        ));
        assert_eq!(image_shape(&summary(0, None, 1, &[3, 5])).unwrap(), (3, 5));
    }

    #[test]
    fn test_huge_naxis_header_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huge.fits");
        write_header_only(
            &path,
            &[
                "SIMPLE  =                    T",
                "BITPIX  =                  -64",
                "NAXIS   =                    2",
                "NAXIS1  =        1099511627776",
                "NAXIS2  =        1099511627776",
            ],
        )
        .unwrap();
        assert!(read_image(&ImageRef::new(&path)).is_err());
    }

    #[test]
    fn test_read_selected_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mef.fits");
        write_mef(&path);

        let mut fptr = FitsFile::open(&path).unwrap();
        let hdus = hdu_summaries(&mut fptr);
        assert_eq!(hdus.len(), 4);
        assert!(!hdus[0].has_image_data());
        assert_eq!(hdus[1].extname.as_deref(), Some("SCI"));
        assert_eq!(hdus[3].extver, 2);
        assert_eq!(hdus[3].bitpix, Some(-32));

        let r: ImageRef = format!("{}[SCI,2]", path.display()).parse().unwrap();
        let loaded = read_image(&r).unwrap();
        assert_eq!(loaded.hdu_index, 3);
        assert_eq!(loaded.data, array![[10.0, 20.0], [30.0, 40.0]]);

        let loaded = read_image(&ImageRef::new(&path)).unwrap();
        assert_eq!(loaded.hdu_index, 1);
        assert_eq!(loaded.data, array![[1.0, 2.0], [3.0, 4.0]]);
    }

    #[test]
    fn test_keyword_fallback_to_primary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mef.fits");
        write_mef(&path);
        let loaded = read_image(&ImageRef::new(&path)).unwrap();
        assert_eq!(loaded.keyword_f64("EXPTIME"), Some(500.0));
        assert_eq!(loaded.header.get_str("EXTNAME"), Some("SCI"));

        let path = dir.path().join("own.fits");
        write_fits(
            &path,
            &[
                TestHdu::empty_primary().key("EXPTIME", 500.0),
                TestHdu::extension("SCI", 1, &array![[1.0]]).key("EXPTIME", 250i64),
            ],
        )
        .unwrap();
        let loaded = read_image(&ImageRef::new(&path)).unwrap();
        assert_eq!(loaded.keyword_f64("EXPTIME"), Some(250.0));
    }

    #[test]
    fn test_replace_image_keeps_other_hdus() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mef.fits");
        write_mef(&path);

        let ones = array![[1.0, 1.0], [1.0, 1.0]];
        replace_image(&path, 2, &ones).unwrap();
        replace_image(&path, 3, &array![[0.25, 0.5], [0.75, 1.0]]).unwrap();

        let mut fptr = FitsFile::open(&path).unwrap();
        let hdus = hdu_summaries(&mut fptr);
        assert_eq!(hdus.len(), 4);
        assert_eq!(hdus[2].bitpix, Some(-64));
        assert_eq!(hdus[3].bitpix, Some(-32));
        drop(fptr);

        let at = |sel: &str| {
            let r: ImageRef = format!("{}[{sel}]", path.display()).parse().unwrap();
            read_image(&r).unwrap().data
        };
        assert_eq!(at("1"), array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(at("ERR"), ones);
        assert_eq!(at("SCI,2"), array![[0.25, 0.5], [0.75, 1.0]]);
        assert_eq!(read_header_at(&path, 0).unwrap().get_f64("EXPTIME"), Some(500.0));
    }

    #[test]
    fn test_failed_edit_leaves_original() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mef.fits");
        write_mef(&path);
        let before = fs::read(&path).unwrap();

        let result = edit_in_place(&path, |fptr| {
            header::delete_matching(fptr, 0, |k| k == "EXPTIME")?;
            Err::<(), _>(FitsError::HduNotFound("stop".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(fs::read(&path).unwrap(), before);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_empty_data_hdu_has_no_image() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mef.fits");
        write_mef(&path);
        let r: ImageRef = format!("{}[0]", path.display()).parse().unwrap();
        assert!(matches!(read_image(&r), Err(FitsError::NoImageData(0))));
    }
}
