//! Webhook ingestor
//!
//! The single entry point for webhook deliveries: verify, attribute, queue.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use callbridge_db::Database;
use callbridge_types::WebhookEnvelope;

use crate::error::{IngestError, IngestResult};
use crate::resolver::TenantResolver;
use crate::signature::verify_signature;

/// Ingest configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Shared signing secret. Verification is mandatory whenever this is
    /// set; an unset secret disables it (local development only).
    pub signing_secret: Option<String>,
}

/// Result of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// Queue row id; `None` when the delivery was a confirmed duplicate.
    pub event_id: Option<Uuid>,
    /// Tenant the delivery was attributed to, when resolvable.
    pub app_id: Option<Uuid>,
    pub duplicate: bool,
}

/// Webhook ingestor.
#[derive(Clone)]
pub struct Ingestor {
    db: Arc<Database>,
    resolver: TenantResolver,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(db: Arc<Database>, resolver: TenantResolver, config: IngestConfig) -> Self {
        Self {
            db,
            resolver,
            config,
        }
    }

    /// Ingest one delivery.
    ///
    /// `body` must be the exact raw request bytes; the same buffer feeds the
    /// signature check and the parser. Returns success for both fresh
    /// inserts and confirmed duplicates, so the upstream sees 2xx either way.
    pub async fn ingest(
        &self,
        body: &[u8],
        signature: Option<&str>,
        api_key_header: Option<&str>,
        event_type_header: Option<&str>,
    ) -> IngestResult<IngestOutcome> {
        if let Some(secret) = &self.config.signing_secret {
            let presented = signature.unwrap_or("");
            if !verify_signature(body, presented, secret) {
                warn!("Webhook rejected: signature mismatch");
                metrics::counter!("ingest_signature_failures").increment(1);
                return Err(IngestError::SignatureMismatch);
            }
        }

        let payload: Value = serde_json::from_slice(body)
            .map_err(|e| IngestError::InvalidPayload(e.to_string()))?;

        let envelope = WebhookEnvelope::from_value(&payload);
        let event_type = envelope
            .event_type
            .clone()
            .or_else(|| event_type_header.map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());

        let app_id = self.resolver.resolve(&envelope, api_key_header).await?;
        if app_id.is_none() {
            warn!(event_type = %event_type, "Webhook could not be attributed to a tenant; queued unresolved");
        }

        let upstream_event_id = envelope.event_id.as_ref().map(|id| id.as_str().to_string());
        let inserted = self
            .db
            .event_repo()
            .append(app_id, &event_type, upstream_event_id.as_deref(), &payload)
            .await?;

        metrics::counter!("ingest_events_received").increment(1);

        match inserted {
            Some(event) => {
                info!(
                    event_id = %event.id,
                    event_type = %event_type,
                    app_id = ?app_id,
                    "Webhook queued"
                );
                Ok(IngestOutcome {
                    event_id: Some(event.id),
                    app_id,
                    duplicate: false,
                })
            }
            None => {
                info!(
                    upstream_event_id = ?upstream_event_id,
                    event_type = %event_type,
                    "Duplicate webhook delivery ignored"
                );
                metrics::counter!("ingest_duplicates").increment(1);
                Ok(IngestOutcome {
                    event_id: None,
                    app_id,
                    duplicate: true,
                })
            }
        }
    }
}
