//! Upstream error types

use thiserror::Error;

/// Provider call errors
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx from the provider, with its payload when safely decodable.
    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    /// Token refresh failed; the tenant must re-authorize.
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Storage failure: {0}")]
    Db(#[from] callbridge_db::DbError),
}

/// Result type for provider calls
pub type UpstreamResult<T> = Result<T, UpstreamError>;
