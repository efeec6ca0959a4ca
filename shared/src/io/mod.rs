//! File formats read and written by the tools

pub mod fits;

pub use fits::{read_header_at, read_image, replace_image, FitsError, Header, LoadedImage};
