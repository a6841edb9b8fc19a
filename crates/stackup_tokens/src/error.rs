//! Error types for the token exchange step.

use thiserror::Error;

/// Result type alias for exchange operations.
pub type ExchangeResult<T> = Result<T, ExchangeError>;

/// Errors that can occur during the token exchange.
///
/// All of them are non-fatal to a provisioning run; the caller reports a
/// warning and the step can be re-run standalone.
#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("dashboard API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("dashboard rejected the bootstrap credentials (HTTP 401)")]
    Unauthorized,

    #[error("dashboard API returned HTTP {status}: {body}")]
    ApiStatus { status: u16, body: String },
}
