//! Common error types for AI4NG services

use thiserror::Error;

/// Common result type for AI4NG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds surfaced at every service boundary
///
/// The HTTP layer maps each variant to exactly one status code, so no
/// internal failure can escape as a success response.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Missing or invalid caller input (never retried)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested record or artifact does not exist or is not owned by the caller
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backing store unreachable, throttled or timed out (retry with backoff)
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),

    /// Anything not classified above
    #[error("Unexpected error: {0}")]
    Unexpected(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::DependencyUnavailable(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    /// Whether a caller may retry the failed operation with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::DependencyUnavailable(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Unexpected(format!("IO error: {}", err))
    }
}
