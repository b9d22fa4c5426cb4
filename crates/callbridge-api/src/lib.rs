//! CallBridge API
//!
//! The broker's HTTP surface:
//!
//! - `POST /webhooks/telephony` — signed upstream event ingestion
//! - `/internal/*` — tenant provisioning and credential lifecycle, guarded
//!   by the shared admin bearer
//! - `/api/*` — tenant REST reads, guarded by the tenant API key and
//!   scoped to the authenticated tenant at the SQL level
//! - `GET /ws` — WebSocket upgrade for real-time fanout subscriptions
//! - `/health`, `/ready`, `/metrics` — operational endpoints

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod websocket;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{ApiConfig, AppState};
