//! Compound image references of the form `path[ext]` or `path[name,version]`.
//!
//! A reference names a FITS file and, optionally, one header-data unit
//! inside it. Bracket contents are either a numeric HDU index
//! (`img.fits[3]`) or an extension name with an optional version
//! (`img.fits[SCI]`, `img.fits[SCI,2]`). Without brackets the selector is
//! left unset, meaning the conventional default image extension.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// Version assumed for a named extension when none is given.
pub const DEFAULT_EXTENSION_VERSION: u32 = 1;

/// Errors produced while parsing a compound image reference.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtRefError {
    #[error("empty image reference")]
    EmptyReference,

    #[error("image reference '{0}' has no file path before the extension selector")]
    EmptyPath(String),

    #[error("image reference '{0}' has unbalanced brackets")]
    Unbalanced(String),

    #[error("image reference '{0}' has an empty extension selector")]
    EmptySelector(String),

    #[error("invalid extension index '{index}' in '{reference}'")]
    InvalidIndex { reference: String, index: String },

    #[error("invalid extension version '{version}' in '{reference}'")]
    InvalidVersion { reference: String, version: String },

    #[error("image reference '{0}' has an empty extension name")]
    EmptyName(String),
}

/// Which HDU inside a FITS file a reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionSelector {
    /// Zero-based HDU index; 0 is the primary HDU.
    Index(usize),
    /// `EXTNAME`/`EXTVER` pair.
    Named { name: String, version: u32 },
}

impl ExtensionSelector {
    /// Named selector with the default version.
    pub fn named(name: impl Into<String>) -> Self {
        ExtensionSelector::Named {
            name: name.into(),
            version: DEFAULT_EXTENSION_VERSION,
        }
    }

    /// Extension name, if this selector is a named one.
    pub fn name(&self) -> Option<&str> {
        match self {
            ExtensionSelector::Index(_) => None,
            ExtensionSelector::Named { name, .. } => Some(name),
        }
    }
}

impl fmt::Display for ExtensionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionSelector::Index(index) => write!(f, "{index}"),
            ExtensionSelector::Named { name, version } => write!(f, "{name},{version}"),
        }
    }
}

/// A file path plus an optional extension selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub path: PathBuf,
    pub extension: Option<ExtensionSelector>,
}

impl ImageRef {
    /// Reference to the default image extension of `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extension: None,
        }
    }

    pub fn with_extension(path: impl Into<PathBuf>, extension: ExtensionSelector) -> Self {
        Self {
            path: path.into(),
            extension: Some(extension),
        }
    }

    /// Final path component as text, used for noise-map classification and titles.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Extension name when the selector is a named one.
    pub fn extension_name(&self) -> Option<&str> {
        self.extension.as_ref().and_then(ExtensionSelector::name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.extension {
            Some(ext) => write!(f, "{}[{}]", self.path.display(), ext),
            None => write!(f, "{}", self.path.display()),
        }
    }
}

impl FromStr for ImageRef {
    type Err = ExtRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_image_ref(s)
    }
}

/// Parse a compound reference string.
///
/// The selector is split off at the last `[` when the string ends with `]`.
/// A single bracket token made only of digits is an HDU index; a token that
/// looks numeric but is not a valid index (`-1`, `2.5`, `1e3`) is rejected
/// rather than treated as a name. Any other single token is an extension
/// name with version 1.
///
/// ```
/// use shared::ext_ref::{parse_image_ref, ExtensionSelector};
///
/// let r = parse_image_ref("img.fits[SCI,2]").unwrap();
/// assert_eq!(r.path.to_str(), Some("img.fits"));
/// assert_eq!(
///     r.extension,
///     Some(ExtensionSelector::Named { name: "SCI".into(), version: 2 })
/// );
/// ```
pub fn parse_image_ref(reference: &str) -> Result<ImageRef, ExtRefError> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err(ExtRefError::EmptyReference);
    }

    let Some(body) = trimmed.strip_suffix(']') else {
        if trimmed.contains('[') {
            return Err(ExtRefError::Unbalanced(reference.to_string()));
        }
        return Ok(ImageRef::new(trimmed));
    };

    let open = body
        .rfind('[')
        .ok_or_else(|| ExtRefError::Unbalanced(reference.to_string()))?;
    let path = &body[..open];
    let selector = body[open + 1..].trim();

    if selector.contains(']') {
        return Err(ExtRefError::Unbalanced(reference.to_string()));
    }
    if path.is_empty() {
        return Err(ExtRefError::EmptyPath(reference.to_string()));
    }
    if selector.is_empty() {
        return Err(ExtRefError::EmptySelector(reference.to_string()));
    }

    let extension = parse_selector(reference, selector)?;
    Ok(ImageRef::with_extension(path, extension))
}

fn parse_selector(reference: &str, selector: &str) -> Result<ExtensionSelector, ExtRefError> {
    if let Some((name, version)) = selector.split_once(',') {
        let name = name.trim();
        let version = version.trim();
        if name.is_empty() {
            return Err(ExtRefError::EmptyName(reference.to_string()));
        }
        let version = if version.is_empty() {
            DEFAULT_EXTENSION_VERSION
        } else {
            version
                .parse::<u32>()
                .map_err(|_| ExtRefError::InvalidVersion {
                    reference: reference.to_string(),
                    version: version.to_string(),
                })?
        };
        return Ok(ExtensionSelector::Named {
            name: name.to_string(),
            version,
        });
    }

    let invalid_index = || ExtRefError::InvalidIndex {
        reference: reference.to_string(),
        index: selector.to_string(),
    };

    if selector.bytes().all(|b| b.is_ascii_digit()) {
        return selector
            .parse::<usize>()
            .map(ExtensionSelector::Index)
            .map_err(|_| invalid_index());
    }

    match selector.chars().next() {
        Some(c) if c.is_ascii_digit() || matches!(c, '+' | '-' | '.') => Err(invalid_index()),
        _ => Ok(ExtensionSelector::named(selector)),
    }
}
