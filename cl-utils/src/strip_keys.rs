//! Removal of per-input drizzle keywords (`D001DATA`, `D012EXPT`, ...)
//! from primary headers.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use shared::io::fits::{edit_in_place, header::delete_matching};
use shared::io::{read_header_at, FitsError};

static DRIZZLE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^D\d{3}").expect("drizzle keyword pattern is valid"));

pub fn is_drizzle_key(keyword: &str) -> bool {
    DRIZZLE_KEY.is_match(keyword)
}

/// Remove drizzle keywords from the primary header of `path`. Returns the
/// number of cards removed; the file is left alone when there are none.
pub fn strip_drizzle_keys(path: &Path) -> Result<usize, FitsError> {
    let has_keys = read_header_at(path, 0)?.keywords().any(is_drizzle_key);
    if !has_keys {
        return Ok(0);
    }

    let removed = edit_in_place(path, |fptr| delete_matching(fptr, 0, is_drizzle_key))?;
    log::info!("Removed {removed} drizzle keywords from {}", path.display());
    Ok(removed)
}
