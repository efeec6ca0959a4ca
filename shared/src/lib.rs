//! Shared components for the background and SNR analysis utilities.
//!
//! This crate contains the pure numerical pieces used by the command-line
//! tools: FITS image I/O, compound extension references, noise-map
//! classification, robust background estimation and SNR construction.
//! Nothing in here prompts, renders, or touches the terminal.

pub mod algo;
pub mod ext_ref;
pub mod image_proc;
pub mod io;
pub mod noise_map;
