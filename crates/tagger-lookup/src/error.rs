//! # Lookup Error Types
//!
//! Faults of a single provider call. The chain logs these and moves on;
//! they never reach the pages.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    /// Network failure, timeout, or undecodable body.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// The body did not have the documented shape.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The provider reported an error of its own.
    #[error("Provider error: {0}")]
    Provider(String),

    /// A configured provider id is not known.
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

pub type LookupResult<T> = Result<T, LookupError>;
