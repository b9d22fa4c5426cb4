//! Database models - mapped from PostgreSQL tables

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============================================================================
// Tenant Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbApp {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
    /// Argon2id hash of the current API key; null while revoked.
    pub api_key_hash: Option<String>,
    /// Peppered HMAC digest of the current key, for O(1) lookup.
    pub api_key_lookup: Option<String>,
    /// Redacted hint (first 8 + last 4 characters) of the current key.
    pub api_key_hint: Option<String>,
    pub api_key_rotated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbUpstreamBinding {
    pub app_id: Uuid,
    pub organization_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_expires_at: DateTime<Utc>,
    /// Environment label: `sandbox` or `production`.
    pub environment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbWebhookRegistration {
    pub id: Uuid,
    pub app_id: Uuid,
    pub upstream_webhook_id: String,
    pub delivery_url: String,
    pub signing_secret: String,
    pub signature_algorithm: String,
    pub signature_header: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Queue Model
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbRawEvent {
    pub id: Uuid,
    /// Null when the delivery could not be attributed to a tenant; such
    /// rows are retained for forensics and never dispatched.
    pub app_id: Option<Uuid>,
    pub event_type: String,
    pub upstream_event_id: Option<String>,
    /// Verbatim payload as delivered by the upstream.
    pub payload: serde_json::Value,
    pub received_at: DateTime<Utc>,
    /// Monotonic: null while pending, set exactly once on success.
    pub processed_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Call / Message / Voicemail Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbCall {
    pub id: Uuid,
    pub app_id: Uuid,
    pub upstream_call_id: String,
    pub direction: Option<String>,
    pub status: String,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub dialing_user_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub recording_url: Option<String>,
    pub has_voicemail: bool,
    pub voicemail_url: Option<String>,
    pub voicemail_transcript: Option<String>,
    /// Sanitized copy of the last relevant payload, for debugging.
    pub last_payload: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbMessage {
    pub id: Uuid,
    pub app_id: Uuid,
    pub upstream_message_id: String,
    pub direction: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub body: Option<String>,
    pub user_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbVoicemail {
    pub id: Uuid,
    pub app_id: Uuid,
    pub upstream_call_id: Option<String>,
    pub user_id: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub recording_url: Option<String>,
    pub transcript: Option<String>,
    pub duration_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Mapping & Audit Models
// ============================================================================

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbUserMapping {
    pub id: Uuid,
    pub app_id: Uuid,
    pub upstream_user_id: String,
    pub crm_user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DbKeyAuditEntry {
    pub id: Uuid,
    pub app_id: Uuid,
    /// One of `created`, `rotated`, `revoked`.
    pub action: String,
    pub old_key_hint: Option<String>,
    pub new_key_hint: Option<String>,
    pub created_at: DateTime<Utc>,
}
