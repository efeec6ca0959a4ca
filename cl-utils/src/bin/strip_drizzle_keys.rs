//! Remove `Dnnn*` drizzle keywords from FITS primary headers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cl_utils::strip_keys::strip_drizzle_keys;

#[derive(Parser, Debug)]
#[command(author, version, about = "Remove drizzle keywords from FITS primary headers")]
struct Args {
    /// FITS files to rewrite
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    for path in &args.files {
        let removed = strip_drizzle_keys(path)
            .with_context(|| format!("stripping keywords from {}", path.display()))?;
        println!("{}: removed {removed} keywords", path.display());
    }
    Ok(())
}
