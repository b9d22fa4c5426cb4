//! Internal provisioning handlers
//!
//! Tenant creation, API key lifecycle, user mappings, and webhook
//! registration with the upstream. Every route requires the internal admin
//! bearer. Plaintext API keys appear only in the one-shot issuance
//! responses produced here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use callbridge_db::NewRegistration;

use crate::dto::{AuditEntryResponse, PageQuery};
use crate::error::ApiError;
use crate::extractors::InternalAdmin;
use crate::state::AppState;

// =============================================================================
// Tenant creation & key lifecycle
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateAppRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateAppResponse {
    pub app_id: Uuid,
    pub name: String,
    /// One-shot plaintext key; never retrievable again.
    pub api_key: String,
    pub api_key_hint: String,
}

/// `POST /internal/apps` — create a tenant and issue its first key.
pub async fn create_app(
    _admin: InternalAdmin,
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAppRequest>,
) -> Result<(StatusCode, Json<CreateAppResponse>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    let app = state.db.app_repo().create(name).await?;
    let issued = state.keys.issue(app.id).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateAppResponse {
            app_id: app.id,
            name: app.name,
            api_key: issued.api_key,
            api_key_hint: issued.hint,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct RotateKeyResponse {
    pub app_id: Uuid,
    /// One-shot plaintext key; never retrievable again.
    pub api_key: String,
    pub api_key_hint: String,
}

/// `POST /internal/apps/:id/api-key` — issue or rotate the tenant key.
pub async fn rotate_key(
    _admin: InternalAdmin,
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<Uuid>,
) -> Result<Json<RotateKeyResponse>, ApiError> {
    let issued = state.keys.issue(app_id).await?;
    Ok(Json(RotateKeyResponse {
        app_id,
        api_key: issued.api_key,
        api_key_hint: issued.hint,
    }))
}

/// `POST /internal/apps/:id/api-key/revoke` — null the active key.
pub async fn revoke_key(
    _admin: InternalAdmin,
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.keys.revoke(app_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct KeyStatusResponse {
    pub app_id: Uuid,
    pub has_active_key: bool,
    pub api_key_hint: Option<String>,
    pub rotated_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// `GET /internal/apps/:id/api-key/status`
pub async fn key_status(
    _admin: InternalAdmin,
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<Uuid>,
) -> Result<Json<KeyStatusResponse>, ApiError> {
    let status = state.keys.status(app_id).await?;
    Ok(Json(KeyStatusResponse {
        app_id: status.app_id,
        has_active_key: status.has_active_key,
        api_key_hint: status.hint,
        rotated_at: status.rotated_at,
    }))
}

/// `GET /internal/apps/:id/api-key/audit` — paginated audit entries.
pub async fn key_audit(
    _admin: InternalAdmin,
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<Uuid>,
    Query(paging): Query<PageQuery>,
) -> Result<Json<Vec<AuditEntryResponse>>, ApiError> {
    let (limit, offset) = paging.limits()?;
    let entries = state.keys.audit(app_id, limit, offset).await?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

// =============================================================================
// User mappings
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct MapUserRequest {
    pub upstream_user_id: String,
    pub crm_user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct MapUsersBatchRequest {
    pub mappings: Vec<MapUserRequest>,
}

#[derive(Debug, Serialize)]
pub struct MapUsersResponse {
    pub mapped: usize,
}

/// `POST /internal/apps/:id/users/map` — upsert one mapping.
pub async fn map_user(
    _admin: InternalAdmin,
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<Uuid>,
    Json(request): Json<MapUserRequest>,
) -> Result<Json<MapUsersResponse>, ApiError> {
    require_app(&state, app_id).await?;
    validate_mapping(&request)?;
    state
        .db
        .user_mapping_repo()
        .upsert(app_id, &request.upstream_user_id, &request.crm_user_id)
        .await?;
    Ok(Json(MapUsersResponse { mapped: 1 }))
}

/// `POST /internal/apps/:id/users/map/batch` — upsert many mappings.
pub async fn map_users_batch(
    _admin: InternalAdmin,
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<Uuid>,
    Json(request): Json<MapUsersBatchRequest>,
) -> Result<Json<MapUsersResponse>, ApiError> {
    require_app(&state, app_id).await?;
    for mapping in &request.mappings {
        validate_mapping(mapping)?;
    }
    let repo = state.db.user_mapping_repo();
    for mapping in &request.mappings {
        repo.upsert(app_id, &mapping.upstream_user_id, &mapping.crm_user_id)
            .await?;
    }
    Ok(Json(MapUsersResponse {
        mapped: request.mappings.len(),
    }))
}

fn validate_mapping(mapping: &MapUserRequest) -> Result<(), ApiError> {
    if mapping.upstream_user_id.trim().is_empty() || mapping.crm_user_id.trim().is_empty() {
        return Err(ApiError::bad_request(
            "upstream_user_id and crm_user_id must not be empty",
        ));
    }
    Ok(())
}

// =============================================================================
// Webhook registration
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterWebhookRequest {
    pub delivery_url: String,
    pub signing_secret: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterWebhookResponse {
    pub webhook_id: String,
    pub delivery_url: String,
}

/// `POST /internal/apps/:id/webhooks` — create a webhook subscription with
/// the upstream on the tenant's behalf and record it.
pub async fn register_webhook(
    _admin: InternalAdmin,
    State(state): State<Arc<AppState>>,
    Path(app_id): Path<Uuid>,
    Json(request): Json<RegisterWebhookRequest>,
) -> Result<(StatusCode, Json<RegisterWebhookResponse>), ApiError> {
    require_app(&state, app_id).await?;

    let binding = state
        .db
        .binding_repo()
        .find_by_app(app_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("App {} has no upstream binding", app_id)))?;

    let access_token = state.upstream.ensure_fresh_token(&binding).await?;
    let webhook = state
        .upstream
        .create_webhook(&access_token, &request.delivery_url, &request.signing_secret)
        .await?;

    state
        .db
        .registration_repo()
        .upsert(&NewRegistration {
            app_id,
            upstream_webhook_id: webhook.id.clone(),
            delivery_url: request.delivery_url.clone(),
            signing_secret: request.signing_secret,
            signature_algorithm: "hmac-sha256".to_string(),
            signature_header: state.config.signature_header.clone(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterWebhookResponse {
            webhook_id: webhook.id,
            delivery_url: request.delivery_url,
        }),
    ))
}

async fn require_app(state: &AppState, app_id: Uuid) -> Result<(), ApiError> {
    state
        .db
        .app_repo()
        .find_by_id(app_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("App {} not found", app_id)))?;
    Ok(())
}
