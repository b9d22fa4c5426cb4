//! Tenant resolution
//!
//! Maps an incoming delivery to exactly one tenant: first by the upstream
//! organization id found in the payload, then by the tenant API key header.
//! Unresolvable deliveries are still queued (with a null tenant) for
//! forensics, so resolution failure is a warning, never an error.

use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use callbridge_auth::ApiKeyService;
use callbridge_db::Database;
use callbridge_types::WebhookEnvelope;

use crate::error::IngestResult;

/// Resolves webhook deliveries to tenants.
#[derive(Clone)]
pub struct TenantResolver {
    db: Arc<Database>,
    keys: ApiKeyService,
}

impl TenantResolver {
    pub fn new(db: Arc<Database>, keys: ApiKeyService) -> Self {
        Self { db, keys }
    }

    /// Resolve the tenant for a delivery.
    ///
    /// Storage failures during the binding lookup propagate (the caller
    /// returns 500 and the upstream retries); a failed API key verification
    /// does not, because an unresolved event is still ingestible.
    pub async fn resolve(
        &self,
        envelope: &WebhookEnvelope,
        api_key_header: Option<&str>,
    ) -> IngestResult<Option<Uuid>> {
        if let Some(org) = envelope.organization() {
            if let Some(binding) = self.db.binding_repo().find_by_organization(org.as_str()).await? {
                debug!(organization_id = %org, app_id = %binding.app_id, "Resolved tenant by organization id");
                return Ok(Some(binding.app_id));
            }
            warn!(organization_id = %org, "No binding for organization id");
        }

        if let Some(key) = api_key_header {
            match self.keys.verify(key).await {
                Ok(app) => {
                    debug!(app_id = %app.id, "Resolved tenant by API key header");
                    return Ok(Some(app.id));
                }
                Err(e) => {
                    warn!(error = %e, "API key header did not resolve a tenant");
                }
            }
        }

        Ok(None)
    }
}
