//! Credential error types

use thiserror::Error;

/// Credential operation errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// The presented key does not validate. Deliberately carries no detail
    /// distinguishing unknown keys from wrong keys.
    #[error("Invalid API key")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid key format")]
    InvalidKeyFormat,

    #[error("Hashing failure")]
    Hashing,

    #[error("Storage failure: {0}")]
    Db(#[from] callbridge_db::DbError),
}

/// Result type for credential operations
pub type AuthResult<T> = Result<T, AuthError>;
