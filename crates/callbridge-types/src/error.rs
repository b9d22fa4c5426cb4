//! Shared error taxonomy
//!
//! The kinds surfaced at the HTTP boundary. Every crate keeps its own
//! `thiserror` enum internally; conversions into `BrokerError` happen where
//! responses are produced so status mapping lives in exactly one place.

use thiserror::Error;

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Broker error kinds, mapped 1:1 onto HTTP statuses at the API surface.
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    /// Bad webhook signature, unknown API key, or bad internal bearer.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The tenant is inactive or the operation is disallowed.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Unknown tenant, call, message, or voicemail.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad identifier format, missing required field, out-of-range paging.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A non-idempotent insert collided with an existing row.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The upstream provider returned an error.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// Database unreachable or an unhandled constraint violation.
    #[error("storage failure: {0}")]
    StorageFailure(String),
}

impl BrokerError {
    /// Stable machine-readable code for the response body.
    pub fn error_code(&self) -> &'static str {
        match self {
            BrokerError::AuthenticationFailed(_) => "authentication_failed",
            BrokerError::Forbidden(_) => "forbidden",
            BrokerError::NotFound(_) => "not_found",
            BrokerError::InvalidInput(_) => "invalid_input",
            BrokerError::Conflict(_) => "conflict",
            BrokerError::UpstreamFailure(_) => "upstream_failure",
            BrokerError::StorageFailure(_) => "storage_failure",
        }
    }

    /// HTTP status code for this kind.
    pub fn http_status(&self) -> u16 {
        match self {
            BrokerError::AuthenticationFailed(_) => 401,
            BrokerError::Forbidden(_) => 403,
            BrokerError::NotFound(_) => 404,
            BrokerError::InvalidInput(_) => 400,
            BrokerError::Conflict(_) => 409,
            BrokerError::UpstreamFailure(_) => 502,
            BrokerError::StorageFailure(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            BrokerError::AuthenticationFailed("bad signature".into()).http_status(),
            401
        );
        assert_eq!(BrokerError::Forbidden("inactive".into()).http_status(), 403);
        assert_eq!(BrokerError::NotFound("call".into()).http_status(), 404);
        assert_eq!(BrokerError::InvalidInput("page".into()).http_status(), 400);
        assert_eq!(BrokerError::Conflict("dup".into()).http_status(), 409);
        assert_eq!(
            BrokerError::UpstreamFailure("token".into()).http_status(),
            502
        );
        assert_eq!(BrokerError::StorageFailure("db".into()).http_status(), 500);
    }

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            BrokerError::NotFound("x".into()).error_code(),
            "not_found"
        );
        assert_eq!(
            BrokerError::StorageFailure("x".into()).error_code(),
            "storage_failure"
        );
    }
}
