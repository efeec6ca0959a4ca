//! Test helpers for the workspace
//!
//! Locates the workspace root and provides a `test_output/` directory for
//! artifacts tests leave behind for inspection, such as rendered SNR plots.
//! [`fits`] writes small FITS fixtures.

pub mod fits;

use once_cell::sync::Lazy;
use std::env;
use std::path::{Path, PathBuf};

/// Error type for test helper operations
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),
}

/// Walks up from the current directory to the first `Cargo.toml` that
/// declares a `[workspace]`.
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {}", e))
    })?;

    // Search for workspace Cargo.toml
    loop {
        let cargo_toml = current_dir.join("Cargo.toml");
        if cargo_toml.exists() {
            let content = std::fs::read_to_string(&cargo_toml).map_err(|e| {
                TestHelperError::ProjectRootNotFound(format!("Failed to read Cargo.toml: {}", e))
            })?;

            if content.contains("[workspace]") {
                return Ok(current_dir);
            }
        }

        if !current_dir.pop() {
            break;
        }
    }

    Err(TestHelperError::ProjectRootNotFound(
        "Workspace root not found".to_string(),
    ))
}

/// Lazily initialized project root path
static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// `<workspace>/test_output`, created on first use.
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");
    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }
    output_dir
}

/// `path` inside [`get_output_dir`]. Subdirectories are not created.
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    get_output_dir().join(path)
}

/// Fresh `test_output/<name>` directory, emptied of any earlier run's files.
pub fn artifact_dir(name: &str) -> PathBuf {
    let dir = output_path(name);
    if dir.exists() {
        std::fs::remove_dir_all(&dir).expect("Failed to clear artifact directory");
    }
    std::fs::create_dir_all(&dir).expect("Failed to create artifact directory");
    dir
}
