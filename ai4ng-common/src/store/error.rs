//! Key-value store errors

use crate::Error;
use thiserror::Error;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Errors raised by a record store backend
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// The named secondary index does not exist in this deployment
    #[error("Index {index} not found on table {table}")]
    IndexNotFound { table: String, index: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Transient outage, throttling or timeout
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Error::DependencyUnavailable(msg),
            other => Error::Unexpected(other.to_string()),
        }
    }
}

#[cfg(feature = "sqlx")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            // SQLITE_BUSY (5) and SQLITE_LOCKED (6) clear up on retry
            sqlx::Error::Database(db) if matches!(db.code().as_deref(), Some("5") | Some("6")) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}
