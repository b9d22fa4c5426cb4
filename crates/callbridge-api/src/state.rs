//! Shared application state

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

use callbridge_auth::ApiKeyService;
use callbridge_db::Database;
use callbridge_fanout::FanoutHub;
use callbridge_ingest::Ingestor;
use callbridge_upstream::UpstreamClient;

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Header carrying the upstream webhook signature.
    pub signature_header: String,
    /// Shared bearer secret for the internal provisioning endpoints.
    pub internal_admin_secret: String,
    /// Enable permissive CORS (development).
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            signature_header: "x-dialpad-signature".to_string(),
            internal_admin_secret: String::new(),
            enable_cors: false,
        }
    }
}

/// Application state shared across handlers.
pub struct AppState {
    pub db: Arc<Database>,
    pub keys: ApiKeyService,
    pub ingestor: Ingestor,
    pub fanout: FanoutHub,
    pub upstream: UpstreamClient,
    pub config: ApiConfig,
    /// Prometheus recorder handle; `None` when metrics are disabled.
    pub metrics: Option<PrometheusHandle>,
}
