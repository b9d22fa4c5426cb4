//! Custom Axum Extractors
//!
//! Request extractors for tenant API key authentication and the internal
//! admin bearer.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use callbridge_db::DbApp;

use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the tenant API key.
pub const APP_API_KEY_HEADER: &str = "x-app-api-key";

/// The tenant authenticated by its API key.
#[derive(Debug, Clone)]
pub struct AuthenticatedApp(pub DbApp);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthenticatedApp {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let key = parts
            .headers
            .get(APP_API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing API key header"))?;

        let app = state.keys.verify(key).await?;
        Ok(AuthenticatedApp(app))
    }
}

/// Marker extractor proving the internal admin bearer was presented.
pub struct InternalAdmin;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for InternalAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;

        if callbridge_auth::verify_internal_bearer(&state.config.internal_admin_secret, presented)
        {
            Ok(InternalAdmin)
        } else {
            Err(ApiError::unauthorized("invalid internal bearer"))
        }
    }
}
