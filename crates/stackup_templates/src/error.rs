//! Error types for template rendering.

use thiserror::Error;

/// Result type alias for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;

/// Errors that can occur during template rendering.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("unresolved placeholders after rendering: {}", placeholders.join(", "))]
    UnboundPlaceholder { placeholders: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
