//! Server configuration
//!
//! Everything comes from environment variables (after a `.env` load) and is
//! validated up front: a missing required value stops the process before it
//! binds a port.

use std::time::Duration;

use callbridge_db::DatabaseConfig;
use callbridge_upstream::{Environment, OAuthSettings};

/// Full server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub environment: Environment,
    pub database: DatabaseConfig,
    /// Shared signing secret for inbound webhooks. Verification is skipped
    /// when unset (local development only).
    pub webhook_signing_secret: Option<String>,
    pub signature_header: String,
    pub internal_admin_secret: String,
    pub api_key_pepper: String,
    /// Optional shared provider API key used instead of per-tenant OAuth.
    pub upstream_api_key: Option<String>,
    pub oauth: OAuthSettings,
    pub dispatcher_workers: usize,
    pub dispatch_batch_size: i64,
    pub dispatch_poll_interval: Duration,
    pub token_refresh_window: Duration,
}

impl ServerConfig {
    /// Load and validate from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = require("ENVIRONMENT")?;
        let environment = Environment::parse(&environment)
            .ok_or_else(|| anyhow::anyhow!("ENVIRONMENT must be 'sandbox' or 'production'"))?;

        let database = DatabaseConfig {
            postgres_url: require("DATABASE_URL")?,
            ..Default::default()
        };

        Ok(Self {
            port: optional("PORT")
                .map(|v| v.parse())
                .transpose()
                .map_err(|_| anyhow::anyhow!("PORT must be a number"))?
                .unwrap_or(8080),
            environment,
            database,
            webhook_signing_secret: optional("WEBHOOK_SIGNING_SECRET"),
            signature_header: optional("WEBHOOK_SIGNATURE_HEADER")
                .unwrap_or_else(|| "x-dialpad-signature".to_string()),
            internal_admin_secret: require("INTERNAL_ADMIN_SECRET")?,
            api_key_pepper: require("API_KEY_PEPPER")?,
            upstream_api_key: optional("UPSTREAM_API_KEY"),
            oauth: oauth_for(environment)?,
            dispatcher_workers: parse_or("DISPATCHER_WORKERS", 1)?,
            dispatch_batch_size: parse_or("DISPATCH_BATCH_SIZE", 50)?,
            dispatch_poll_interval: Duration::from_millis(parse_or(
                "DISPATCH_POLL_INTERVAL_MS",
                1000,
            )?),
            token_refresh_window: Duration::from_secs(parse_or(
                "TOKEN_REFRESH_WINDOW_SECS",
                300,
            )?),
        })
    }
}

/// OAuth settings for the active environment, read from per-environment
/// variable names (`OAUTH_SANDBOX_*` / `OAUTH_PRODUCTION_*`).
fn oauth_for(environment: Environment) -> anyhow::Result<OAuthSettings> {
    let prefix = match environment {
        Environment::Sandbox => "OAUTH_SANDBOX",
        Environment::Production => "OAUTH_PRODUCTION",
    };
    Ok(OAuthSettings {
        client_id: require(&format!("{prefix}_CLIENT_ID"))?,
        client_secret: require(&format!("{prefix}_CLIENT_SECRET"))?,
        redirect_url: require(&format!("{prefix}_REDIRECT_URL"))?,
        scopes: optional("OAUTH_SCOPES").unwrap_or_default(),
    })
}

fn require(name: &str) -> anyhow::Result<String> {
    std::env::var(name).map_err(|_| anyhow::anyhow!("{} must be set", name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match optional(name) {
        Some(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} has an invalid value", name)),
        None => Ok(default),
    }
}
