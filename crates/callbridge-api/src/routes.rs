//! API Routes
//!
//! Route definitions for all broker endpoints.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;
use crate::websocket;

/// Build the full router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let enable_cors = state.config.enable_cors;

    let router = Router::new()
        // Operational endpoints
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics))
        // Upstream event ingestion
        .route("/webhooks/telephony", post(handlers::webhooks::receive_webhook))
        // Provisioning (internal bearer)
        .nest("/internal", internal_routes())
        // Tenant REST (API key)
        .nest("/api", api_routes())
        // Real-time fanout subscriptions
        .route("/ws", get(websocket::ws_subscriber_handler))
        .layer(TraceLayer::new_for_http());

    let router = if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(state)
}

/// Internal provisioning routes.
fn internal_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/apps", post(handlers::admin::create_app))
        .route("/apps/:id/api-key", post(handlers::admin::rotate_key))
        .route("/apps/:id/api-key/revoke", post(handlers::admin::revoke_key))
        .route("/apps/:id/api-key/status", get(handlers::admin::key_status))
        .route("/apps/:id/api-key/audit", get(handlers::admin::key_audit))
        .route("/apps/:id/users/map", post(handlers::admin::map_user))
        .route("/apps/:id/users/map/batch", post(handlers::admin::map_users_batch))
        .route("/apps/:id/webhooks", post(handlers::admin::register_webhook))
}

/// Tenant query routes.
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/calls", get(handlers::calls::list_calls))
        .route("/calls/active", get(handlers::calls::list_active_calls))
        .route("/calls/:call_id", get(handlers::calls::get_call))
        .route("/messages", get(handlers::messages::list_messages))
        .route("/voicemails", get(handlers::voicemails::list_voicemails))
}
