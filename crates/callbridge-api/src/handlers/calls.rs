//! Tenant call query handlers
//!
//! Every query binds the authenticated tenant's id, so cross-tenant rows
//! are invisible at the SQL level; a foreign call id yields 404, never 403.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use callbridge_types::{CallDirection, CallStatus};

use crate::dto::{CallResponse, CallsQuery};
use crate::error::ApiError;
use crate::extractors::AuthenticatedApp;
use crate::state::AppState;

/// `GET /api/calls` — list the tenant's calls, newest first.
pub async fn list_calls(
    AuthenticatedApp(app): AuthenticatedApp,
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallsQuery>,
) -> Result<Json<Vec<CallResponse>>, ApiError> {
    let (limit, offset) = query.page_query().limits()?;

    let status = query
        .status
        .as_deref()
        .map(|s| {
            CallStatus::parse(s)
                .map(|s| s.as_str())
                .ok_or_else(|| ApiError::bad_request(format!("unknown status {s:?}")))
        })
        .transpose()?;
    let direction = query
        .direction
        .as_deref()
        .map(|d| {
            CallDirection::parse(d)
                .map(|d| d.as_str())
                .ok_or_else(|| ApiError::bad_request(format!("unknown direction {d:?}")))
        })
        .transpose()?;

    let calls = state
        .db
        .call_repo()
        .list(app.id, status, direction, limit, offset)
        .await?;
    Ok(Json(calls.into_iter().map(Into::into).collect()))
}

/// `GET /api/calls/active` — calls currently ringing or active.
pub async fn list_active_calls(
    AuthenticatedApp(app): AuthenticatedApp,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CallResponse>>, ApiError> {
    let calls = state.db.call_repo().list_active(app.id).await?;
    Ok(Json(calls.into_iter().map(Into::into).collect()))
}

/// `GET /api/calls/:call_id` — one call by its upstream id.
pub async fn get_call(
    AuthenticatedApp(app): AuthenticatedApp,
    State(state): State<Arc<AppState>>,
    Path(call_id): Path<String>,
) -> Result<Json<CallResponse>, ApiError> {
    let call = state
        .db
        .call_repo()
        .find_by_upstream_id(app.id, &call_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Call {} not found", call_id)))?;
    Ok(Json(call.into()))
}
