//! Test helpers for the calorimeter noise workspace
//!
//! Locates the workspace root and gives tests a place to write fixture files
//! (histogram sets, detector descriptions, cell maps) that the code under
//! test then reads back from disk.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};

/// Error type for test helper operations
#[derive(thiserror::Error, Debug)]
pub enum TestHelperError {
    #[error("Failed to find project root: {0}")]
    ProjectRootNotFound(String),

    #[error("Failed to write fixture {path}: {reason}")]
    FixtureWrite { path: PathBuf, reason: String },
}

/// Returns the path to the workspace root directory.
///
/// Walks up from the current directory until a Cargo.toml declaring
/// `[workspace]` is found.
pub fn find_project_root() -> Result<PathBuf, TestHelperError> {
    let mut current_dir = env::current_dir().map_err(|e| {
        TestHelperError::ProjectRootNotFound(format!("Failed to get current directory: {}", e))
    })?;

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

static PROJECT_ROOT: Lazy<PathBuf> =
    Lazy::new(|| find_project_root().expect("Failed to find project root directory"));

/// Directory for test artifacts (`<workspace>/test_output`), created on demand.
pub fn get_output_dir() -> PathBuf {
    let output_dir = PROJECT_ROOT.join("test_output");

    if !output_dir.exists() {
        std::fs::create_dir_all(&output_dir).expect("Failed to create output directory");
    }

    output_dir
}

/// Returns a path within the output directory.
pub fn output_path<P: AsRef<Path>>(path: P) -> PathBuf {
    get_output_dir().join(path)
}

/// Serialize `value` as pretty JSON into the output directory.
///
/// Tests running in parallel must use distinct file names.
///
/// # Returns
/// * Ok(PathBuf) - Full path of the written file
/// * Err(TestHelperError) - If serialization or the write failed
pub fn write_json_fixture<T: Serialize>(name: &str, value: &T) -> Result<PathBuf, TestHelperError> {
    let path = output_path(name);
    let fail = |reason: String| TestHelperError::FixtureWrite {
        path: path.clone(),
        reason,
    };

    let json = serde_json::to_string_pretty(value).map_err(|e| fail(e.to_string()))?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
    }
    std::fs::write(&path, json).map_err(|e| fail(e.to_string()))?;
    Ok(path)
}

/// Write raw text into the output directory, e.g. deliberately broken fixtures.
pub fn write_text_fixture(name: &str, contents: &str) -> Result<PathBuf, TestHelperError> {
    let path = output_path(name);
    std::fs::write(&path, contents).map_err(|e| TestHelperError::FixtureWrite {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok(path)
}
