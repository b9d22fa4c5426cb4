//! Tenant voicemail query handlers

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::dto::{PageQuery, VoicemailResponse};
use crate::error::ApiError;
use crate::extractors::AuthenticatedApp;
use crate::state::AppState;

/// `GET /api/voicemails` — list the tenant's voicemails, newest first.
pub async fn list_voicemails(
    AuthenticatedApp(app): AuthenticatedApp,
    State(state): State<Arc<AppState>>,
    Query(paging): Query<PageQuery>,
) -> Result<Json<Vec<VoicemailResponse>>, ApiError> {
    let (limit, offset) = paging.limits()?;
    let voicemails = state.db.voicemail_repo().list(app.id, limit, offset).await?;
    Ok(Json(voicemails.into_iter().map(Into::into).collect()))
}
