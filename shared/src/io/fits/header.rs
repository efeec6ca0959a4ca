//! Header keyword access that `fitsio` has no safe wrapper for: listing
//! every card, deleting keywords, and changing an image's BITPIX.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int, c_long};

use fitsio::{sys, FitsFile};

use super::FitsError;

/// Room for any cfitsio keyword, value or comment string.
const FLEN_CARD: usize = 81;

/// One header card: keyword plus its value exactly as written.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    pub value: String,
}

impl Card {
    /// String value with the quotes and trailing blanks removed.
    pub fn as_str(&self) -> Option<&str> {
        let v = self.value.trim();
        v.strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .map(str::trim_end)
    }

    /// Integer or real value; `D` exponents are accepted.
    pub fn as_f64(&self) -> Option<f64> {
        let v = self.value.trim();
        if v.is_empty() || v.starts_with('\'') {
            return None;
        }
        v.replace(['D', 'd'], "E").parse().ok()
    }
}

/// The cards of one HDU, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.cards.iter().map(|c| c.keyword.as_str())
    }

    fn card(&self, keyword: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.keyword == keyword)
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.card(keyword).is_some()
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.card(keyword).and_then(Card::as_str)
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.card(keyword).and_then(Card::as_f64)
    }
}

fn check(status: c_int, call: &'static str) -> Result<(), FitsError> {
    if status == 0 {
        Ok(())
    } else {
        Err(FitsError::Cfitsio { call, status })
    }
}

fn c_string(buf: &[c_char]) -> String {
    // SAFETY: cfitsio NUL-terminates every string it writes into `buf`
    unsafe { CStr::from_ptr(buf.as_ptr()) }
        .to_string_lossy()
        .into_owned()
}

/// Every card of HDU `index`.
pub fn read_header(fptr: &mut FitsFile, index: usize) -> Result<Header, FitsError> {
    fptr.hdu(index)?;
    let mut status = 0;
    let mut existing: c_int = 0;
    let mut more: c_int = 0;
    // SAFETY: `fptr` is open and positioned on HDU `index`
    let raw = unsafe { fptr.as_raw() };
    unsafe { sys::ffghsp(raw, &mut existing, &mut more, &mut status) };
    check(status, "ffghsp")?;

    let mut cards = Vec::with_capacity(existing.max(0) as usize);
    for n in 1..=existing {
        let mut keyword = [0 as c_char; FLEN_CARD];
        let mut value = [0 as c_char; FLEN_CARD];
        let mut comment = [0 as c_char; FLEN_CARD];
        unsafe {
            sys::ffgkyn(
                raw,
                n,
                keyword.as_mut_ptr(),
                value.as_mut_ptr(),
                comment.as_mut_ptr(),
                &mut status,
            )
        };
        check(status, "ffgkyn")?;
        cards.push(Card {
            keyword: c_string(&keyword),
            value: c_string(&value),
        });
    }
    Ok(Header { cards })
}

/// Delete every keyword of HDU `index` that `matches`. Returns how many
/// cards went.
pub fn delete_matching<F>(fptr: &mut FitsFile, index: usize, matches: F) -> Result<usize, FitsError>
where
    F: Fn(&str) -> bool,
{
    let doomed: Vec<String> = read_header(fptr, index)?
        .keywords()
        .filter(|k| matches(k))
        .map(str::to_string)
        .collect();
    if doomed.is_empty() {
        return Ok(0);
    }

    fptr.hdu(index)?;
    let raw = unsafe { fptr.as_raw() };
    let mut status = 0;
    for keyword in &doomed {
        let name = CString::new(keyword.as_str())
            .map_err(|_| FitsError::InvalidDataType(format!("keyword {keyword:?}")))?;
        unsafe { sys::ffdkey(raw, name.as_ptr(), &mut status) };
        check(status, "ffdkey")?;
    }
    // Re-read structural and scaling keywords
    unsafe { sys::ffrdef(raw, &mut status) };
    check(status, "ffrdef")?;
    Ok(doomed.len())
}

/// Give image HDU `index` a new BITPIX and shape.
pub fn reshape_image(
    fptr: &mut FitsFile,
    index: usize,
    bitpix: i32,
    (rows, cols): (usize, usize),
) -> Result<(), FitsError> {
    fptr.hdu(index)?;
    let raw = unsafe { fptr.as_raw() };
    // NAXIS1 is the column count
    let mut naxes = [cols as c_long, rows as c_long];
    let mut status = 0;
    unsafe { sys::ffrsim(raw, bitpix, 2, naxes.as_mut_ptr(), &mut status) };
    check(status, "ffrsim")
}
