//! CallBridge Server
//!
//! The deployable broker binary: binds the HTTP surface, runs the embedded
//! migrations, and spawns the dispatcher workers that drain the webhook
//! queue.
//!
//! # Usage
//!
//! ```bash
//! # Start with environment configuration (.env is honored)
//! callbridge-server
//!
//! # Override the port and log level
//! callbridge-server --port 8080 --log-level debug
//! ```

mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::signal;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use callbridge_api::{create_router, ApiConfig, AppState};
use callbridge_auth::{ApiKeyService, AuthConfig};
use callbridge_db::Database;
use callbridge_dispatch::{default_registry, Dispatcher, DispatcherConfig};
use callbridge_fanout::{FanoutConfig, FanoutHub};
use callbridge_ingest::{IngestConfig, Ingestor, TenantResolver};
use callbridge_upstream::{UpstreamClient, UpstreamConfig};

use crate::config::ServerConfig;

// =============================================================================
// CLI Arguments
// =============================================================================

/// CallBridge Server - multi-tenant telephony webhook broker
#[derive(Parser, Debug)]
#[command(name = "callbridge-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "CALLBRIDGE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Log format (json, pretty)
    #[arg(long, env = "CALLBRIDGE_LOG_FORMAT", default_value = "pretty")]
    log_format: String,

    /// Number of dispatcher workers (overrides DISPATCHER_WORKERS)
    #[arg(long)]
    dispatcher_workers: Option<usize>,
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log_level, &args.log_format)?;

    let mut server_config = ServerConfig::from_env()?;
    if let Some(port) = args.port {
        server_config.port = port;
    }
    if let Some(workers) = args.dispatcher_workers {
        server_config.dispatcher_workers = workers;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = server_config.environment.as_str(),
        "Starting CallBridge server"
    );

    if server_config.webhook_signing_secret.is_none() {
        tracing::warn!("WEBHOOK_SIGNING_SECRET unset; webhook signature verification is DISABLED");
    }

    // Database
    let db = Arc::new(Database::connect(&server_config.database).await?);
    db.migrate().await?;

    // Metrics recorder
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;

    // Credential manager
    let auth_config = AuthConfig {
        api_key_pepper: server_config.api_key_pepper.clone(),
        internal_admin_secret: server_config.internal_admin_secret.clone(),
        ..Default::default()
    };
    let keys = ApiKeyService::new(db.clone(), auth_config);

    // Ingestion pipeline
    let resolver = TenantResolver::new(db.clone(), keys.clone());
    let ingestor = Ingestor::new(
        db.clone(),
        resolver,
        IngestConfig {
            signing_secret: server_config.webhook_signing_secret.clone(),
        },
    );

    // Fanout
    let fanout = FanoutHub::new(db.clone(), FanoutConfig::default());

    // Upstream client
    let mut upstream_config =
        UpstreamConfig::new(server_config.environment, server_config.oauth.clone());
    upstream_config.shared_api_key = server_config.upstream_api_key.clone();
    upstream_config.token_refresh_window = server_config.token_refresh_window;
    let upstream = UpstreamClient::new(db.clone(), upstream_config)?;

    // Dispatcher workers
    let registry = Arc::new(default_registry());
    let dispatcher = Dispatcher::new(
        db.clone(),
        registry,
        fanout.clone(),
        DispatcherConfig {
            batch_size: server_config.dispatch_batch_size,
            poll_interval: server_config.dispatch_poll_interval,
        },
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = Vec::new();
    for worker in 0..server_config.dispatcher_workers.max(1) {
        let dispatcher = dispatcher.clone();
        let shutdown = shutdown_rx.clone();
        workers.push(tokio::spawn(async move {
            tracing::info!(worker, "Dispatcher worker spawned");
            dispatcher.run(shutdown).await;
        }));
    }

    // HTTP surface
    let state = Arc::new(AppState {
        db,
        keys,
        ingestor,
        fanout,
        upstream,
        config: ApiConfig {
            signature_header: server_config.signature_header.clone(),
            internal_admin_secret: server_config.internal_admin_secret.clone(),
            enable_cors: server_config.environment == callbridge_upstream::Environment::Sandbox,
        },
        metrics: Some(metrics_handle),
    });
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], server_config.port));
    tracing::info!(port = server_config.port, "Server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop dispatcher workers at their next transaction boundary.
    let _ = shutdown_tx.send(true);
    for worker in workers {
        let _ = worker.await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

// =============================================================================
// Initialization
// =============================================================================

/// Initialize tracing/logging.
fn init_logging(level: &str, format: &str) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    match format {
        "json" => {
            subscriber.with(fmt::layer().json().with_target(true)).init();
        }
        _ => {
            subscriber
                .with(fmt::layer().pretty().with_target(true))
                .init();
        }
    }

    Ok(())
}

// =============================================================================
// Graceful Shutdown
// =============================================================================

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let args = Args::parse_from(["callbridge-server", "--port", "8080"]);
        assert_eq!(args.port, Some(8080));
    }

    #[test]
    fn test_cli_defaults() {
        let args = Args::parse_from(["callbridge-server"]);
        assert_eq!(args.log_level, "info");
        assert_eq!(args.log_format, "pretty");
        assert!(args.dispatcher_workers.is_none());
    }
}
