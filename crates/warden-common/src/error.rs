//! Common error types for Warden components.

use thiserror::Error;

/// Result alias used across Warden components
pub type Result<T> = std::result::Result<T, WardenError>;

/// Common errors across Warden components
#[derive(Debug, Error)]
pub enum WardenError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Challenge store connection/operation error
    #[error("Store error: {0}")]
    Store(String),

    /// Malformed payload, missing or wrong-typed field. Carries no
    /// detail: every malformed request looks the same from outside.
    #[error("Bad request")]
    BadRequest,

    /// Challenge absent, expired, consumed, or owned by another session.
    /// Externally indistinguishable from `BadRequest`.
    #[error("Not found")]
    NotFound,

    /// Rate limit exceeded (surfaced verbatim from the login backend)
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Account banned (surfaced verbatim from the login backend)
    #[error("Banned: {0}")]
    Banned(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WardenError {
    /// Returns the HTTP status code for this error.
    ///
    /// `BadRequest` and `NotFound` share a status so callers cannot
    /// probe for challenge existence.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Config(_) => 500,
            Self::Store(_) => 503,
            Self::BadRequest => 400,
            Self::NotFound => 400,
            Self::RateLimited(_) => 429,
            Self::Banned(_) => 403,
            Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error should be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}
