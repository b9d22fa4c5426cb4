//! Tenant message query handlers

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::dto::{MessageResponse, PageQuery};
use crate::error::ApiError;
use crate::extractors::AuthenticatedApp;
use crate::state::AppState;

/// `GET /api/messages` — list the tenant's messages, newest first.
pub async fn list_messages(
    AuthenticatedApp(app): AuthenticatedApp,
    State(state): State<Arc<AppState>>,
    Query(paging): Query<PageQuery>,
) -> Result<Json<Vec<MessageResponse>>, ApiError> {
    let (limit, offset) = paging.limits()?;
    let messages = state.db.message_repo().list(app.id, limit, offset).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}
