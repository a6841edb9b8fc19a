//! Error types for the core crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur at the run level.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("prerequisite not found: {tool} - {hint}")]
    PrerequisiteMissing { tool: String, hint: String },

    #[error("manifest not found: {0}")]
    ManifestMissing(PathBuf),

    #[error("run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
