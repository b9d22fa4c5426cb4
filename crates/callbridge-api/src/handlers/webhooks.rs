//! Webhook ingestion handler
//!
//! The body is extracted as raw `Bytes` so the signature verifier sees the
//! exact wire bytes; parsing happens inside the ingestor, after
//! verification, on the same buffer.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use callbridge_ingest::IngestError;

use crate::extractors::APP_API_KEY_HEADER;
use crate::state::AppState;

/// Optional header naming the event type when the payload omits it.
const EVENT_TYPE_HEADER: &str = "x-event-type";

/// `POST /webhooks/telephony` — receive a signed upstream event.
///
/// Responses: 200 `{"received": true}` on persistence or confirmed
/// duplicate, 401 on signature mismatch, 400 on an undecodable body, 500 on
/// storage failure (the upstream retries non-2xx).
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let signature = header_str(&headers, &state.config.signature_header);
    let api_key = header_str(&headers, APP_API_KEY_HEADER);
    let event_type = header_str(&headers, EVENT_TYPE_HEADER);

    match state
        .ingestor
        .ingest(&body, signature, api_key, event_type)
        .await
    {
        Ok(_) => (StatusCode::OK, Json(json!({ "received": true }))),
        Err(IngestError::SignatureMismatch) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid signature" })),
        ),
        Err(IngestError::InvalidPayload(_)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "malformed payload" })),
        ),
        Err(IngestError::Db(e)) => {
            tracing::error!(error = %e, "Webhook persistence failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "persistence failure" })),
            )
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
