//! CallBridge Upstream
//!
//! Outbound client for the telephony provider: OAuth authorization-code
//! exchange, transparent refresh-token renewal, and webhook registration on
//! behalf of a tenant. Every request carries a bounded timeout; provider
//! errors surface with the provider payload attached when it decodes
//! safely.

pub mod client;
pub mod config;
pub mod error;

pub use client::{TokenResponse, UpstreamClient, UpstreamWebhook};
pub use config::{Environment, OAuthSettings, UpstreamConfig};
pub use error::{UpstreamError, UpstreamResult};
