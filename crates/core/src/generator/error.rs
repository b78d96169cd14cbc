//! Error types for the generator module.

use thiserror::Error;

/// Errors raised by a generator backend itself, as opposed to a reported
/// generation failure.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The backend answered with something we could not decode.
    #[error("failed to decode generator response: {0}")]
    Decode(String),

    /// The request did not finish in time.
    #[error("generation timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Any other backend error.
    #[error("generator backend error: {0}")]
    Backend(String),
}
