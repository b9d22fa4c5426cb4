//! API error handling
//!
//! Handlers produce `ApiError`, a thin response wrapper around the shared
//! `BrokerError` taxonomy; the status and machine code for every kind live
//! on the taxonomy itself, so the mapping exists in exactly one place.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use callbridge_auth::AuthError;
use callbridge_db::DbError;
use callbridge_ingest::IngestError;
use callbridge_types::BrokerError;
use callbridge_upstream::UpstreamError;

/// An error ready to be rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub BrokerError);

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self(BrokerError::AuthenticationFailed(message.into()))
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self(BrokerError::Forbidden(message.into()))
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self(BrokerError::NotFound(message.into()))
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(BrokerError::InvalidInput(message.into()))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self(BrokerError::Conflict(message.into()))
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self(BrokerError::StorageFailure(message.into()))
    }

    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.0.error_code(),
            message: self.0.to_string(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<BrokerError> for ApiError {
    fn from(err: BrokerError) -> Self {
        Self(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let kind = match err {
            AuthError::Unauthorized | AuthError::InvalidKeyFormat => {
                BrokerError::AuthenticationFailed("invalid API key".to_string())
            }
            AuthError::Forbidden(msg) => BrokerError::Forbidden(msg),
            AuthError::NotFound(msg) => BrokerError::NotFound(msg),
            AuthError::Hashing => {
                BrokerError::StorageFailure("credential hashing failed".to_string())
            }
            AuthError::Db(e) => return ApiError::from(e),
        };
        Self(kind)
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        let kind = match err {
            DbError::NotFound(msg) => BrokerError::NotFound(msg),
            DbError::Duplicate(msg) => BrokerError::Conflict(msg),
            DbError::InvalidInput(msg) => BrokerError::InvalidInput(msg),
            other => BrokerError::StorageFailure(other.to_string()),
        };
        Self(kind)
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        let kind = match err {
            IngestError::SignatureMismatch => {
                BrokerError::AuthenticationFailed("invalid signature".to_string())
            }
            IngestError::InvalidPayload(msg) => BrokerError::InvalidInput(msg),
            IngestError::Db(e) => return ApiError::from(e),
        };
        Self(kind)
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        let kind = match err {
            UpstreamError::Provider { status, body } => {
                BrokerError::UpstreamFailure(format!("provider returned {status}: {body}"))
            }
            UpstreamError::RefreshFailed(msg) => BrokerError::UpstreamFailure(msg),
            UpstreamError::Transport(e) => BrokerError::UpstreamFailure(e.to_string()),
            UpstreamError::Db(e) => return ApiError::from(e),
        };
        Self(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::unauthorized("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::forbidden("x").status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::bad_request("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            ApiError::internal("x").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError(BrokerError::UpstreamFailure("x".into())).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_signature_mismatch_maps_to_401() {
        let err = ApiError::from(IngestError::SignatureMismatch);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_auth_errors_collapse_to_401() {
        assert_eq!(
            ApiError::from(AuthError::Unauthorized).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthError::InvalidKeyFormat).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_cross_tenant_reads_surface_as_not_found() {
        // 404 rather than 403, to avoid leaking row existence.
        let err = ApiError::not_found("Call 9999 not found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }
}
