//! Dispatch error types

use thiserror::Error;

/// Dispatch and handler errors
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Storage failure: {0}")]
    Db(#[from] callbridge_db::DbError),

    #[error("Query error: {0}")]
    Query(#[from] sqlx::Error),

    /// A call row holds a status string the matrix does not know. Only
    /// possible after a bad manual edit; the event is left pending.
    #[error("Corrupt call status: {0}")]
    CorruptStatus(String),
}

/// Result type for dispatch operations
pub type DispatchResult<T> = Result<T, DispatchError>;
