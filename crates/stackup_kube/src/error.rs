//! Error types for cluster operations.

use thiserror::Error;

/// Result type alias for cluster operations.
pub type KubeResult<T> = Result<T, KubeError>;

/// Errors that can occur while talking to the declarative resource system.
#[derive(Error, Debug)]
pub enum KubeError {
    /// The external system rejected the submitted artifact.
    ///
    /// Some resources may already have been committed; reconciling that is
    /// the external system's responsibility.
    #[error("apply rejected: {diagnostic}")]
    ApplyRejected { diagnostic: String },

    #[error("command failed: {command} - {message}")]
    CommandFailed { command: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
