//! Error types for credential and certificate provisioning.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for credential operations.
pub type CredsResult<T> = Result<T, CredsError>;

/// Errors that can occur during credential or certificate provisioning.
#[derive(Error, Debug)]
pub enum CredsError {
    #[error("credential store unwritable at {path}: {message}")]
    StoreUnwritable { path: PathBuf, message: String },

    #[error("credential store corrupt at {path}: {message}")]
    StoreCorrupt { path: PathBuf, message: String },

    #[error("credential store locked: {0} (is another run in progress?)")]
    LockHeld(PathBuf),

    #[error("certificate issuance failed: {0}")]
    IssuanceFailed(String),

    #[error("certificate parsing error: {0}")]
    CertificateParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
