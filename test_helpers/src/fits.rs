//! FITS fixtures for tests.
//!
//! Images are written as BITPIX -64 unless marked single precision, with
//! array row 0 as the first FITS row.

use std::path::Path;

use fitsio::errors::Result;
use fitsio::hdu::FitsHdu;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::FitsFile;
use ndarray::Array2;

/// A header value for [`TestHdu::key`].
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Str(String),
    Float(f64),
    Int(i64),
}

impl From<&str> for KeyValue {
    fn from(v: &str) -> Self {
        KeyValue::Str(v.to_string())
    }
}

impl From<f64> for KeyValue {
    fn from(v: f64) -> Self {
        KeyValue::Float(v)
    }
}

impl From<i64> for KeyValue {
    fn from(v: i64) -> Self {
        KeyValue::Int(v)
    }
}

/// One HDU of a fixture file. The first HDU written is the primary.
#[derive(Debug, Clone, Default)]
pub struct TestHdu {
    extname: Option<String>,
    image: Option<Array2<f64>>,
    single_precision: bool,
    keys: Vec<(String, KeyValue)>,
}

impl TestHdu {
    pub fn primary(image: &Array2<f64>) -> Self {
        Self {
            image: Some(image.clone()),
            ..Default::default()
        }
    }

    /// Data-less primary, as in front of image extensions.
    pub fn empty_primary() -> Self {
        Self::default()
    }

    pub fn extension(extname: &str, extver: i64, image: &Array2<f64>) -> Self {
        Self {
            extname: Some(extname.to_string()),
            image: Some(image.clone()),
            ..Default::default()
        }
        .key("EXTVER", extver)
    }

    /// Store the image as BITPIX -32.
    pub fn single_precision(mut self) -> Self {
        self.single_precision = true;
        self
    }

    pub fn key(mut self, name: &str, value: impl Into<KeyValue>) -> Self {
        self.keys.push((name.to_string(), value.into()));
        self
    }

    fn image_type(&self) -> ImageType {
        if self.single_precision {
            ImageType::Float
        } else {
            ImageType::Double
        }
    }

    fn write_contents(&self, fptr: &mut FitsFile, hdu: &FitsHdu) -> Result<()> {
        if let Some(image) = &self.image {
            if self.single_precision {
                let flat: Vec<f32> = image.iter().map(|&v| v as f32).collect();
                hdu.write_image(fptr, &flat)?;
            } else {
                let flat: Vec<f64> = image.iter().copied().collect();
                hdu.write_image(fptr, &flat)?;
            }
        }
        for (name, value) in &self.keys {
            match value {
                KeyValue::Str(v) => hdu.write_key(fptr, name, v.clone())?,
                KeyValue::Float(v) => hdu.write_key(fptr, name, *v)?,
                KeyValue::Int(v) => hdu.write_key(fptr, name, *v)?,
            }
        }
        Ok(())
    }
}

/// Write `hdus` to `path`, replacing any existing file.
pub fn write_fits(path: &Path, hdus: &[TestHdu]) -> Result<()> {
    let Some((first, rest)) = hdus.split_first() else {
        return Ok(());
    };

    let builder = FitsFile::create(path).overwrite();
    let mut fptr = match &first.image {
        Some(image) => {
            let (rows, cols) = image.dim();
            let dimensions = [rows, cols];
            let description = ImageDescription {
                data_type: first.image_type(),
                dimensions: &dimensions,
            };
            builder.with_custom_primary(&description).open()?
        }
        None => builder.open()?,
    };
    let primary = fptr.primary_hdu()?;
    first.write_contents(&mut fptr, &primary)?;

    for spec in rest {
        let (rows, cols) = spec.image.as_ref().map_or((0, 0), |i| i.dim());
        let dimensions = [rows, cols];
        let description = ImageDescription {
            data_type: spec.image_type(),
            dimensions: &dimensions,
        };
        let name = spec.extname.clone().unwrap_or_default();
        let hdu = fptr.create_image(name, &description)?;
        spec.write_contents(&mut fptr, &hdu)?;
    }
    Ok(())
}

/// Write a primary header made of `cards` and nothing else: no data
/// follows, whatever the header claims.
pub fn write_header_only(path: &Path, cards: &[&str]) -> std::io::Result<()> {
    const BLOCK: usize = 2880;
    let mut bytes = Vec::with_capacity(BLOCK);
    for card in cards.iter().copied().chain(std::iter::once("END")) {
        bytes.extend(format!("{card:<80.80}").bytes());
    }
    bytes.resize(bytes.len().div_ceil(BLOCK) * BLOCK, b' ');
    std::fs::write(path, bytes)
}
