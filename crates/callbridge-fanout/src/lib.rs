//! CallBridge Fanout - Real-Time Event Delivery
//!
//! In-process subscription registry and delivery path for pipeline events.
//! Connections are registered per tenant; every committed transition is
//! serialized once and sent to all open connections of the owning tenant.
//!
//! Delivery is best-effort: a send failure on one connection evicts that
//! connection and never delays the others. Keepalive policy (ping interval,
//! missed-pong eviction) is owned here; the WebSocket layer drives it.
//!
//! The registry is process-local by design. Scaling horizontally means
//! swapping this module for an out-of-process bus without changing handler
//! logic.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use callbridge_db::Database;
pub use callbridge_types::FanoutEvent;

/// Fanout configuration.
#[derive(Debug, Clone)]
pub struct FanoutConfig {
    /// Keepalive probe interval. A connection that misses a pong for one
    /// full interval is terminated.
    pub ping_interval: Duration,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
        }
    }
}

/// Fanout errors
#[derive(Debug, Error)]
pub enum FanoutError {
    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for fanout operations
pub type FanoutResult<T> = Result<T, FanoutError>;

/// Handle identifying a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId {
    pub app_id: Uuid,
    pub connection_id: u64,
}

/// Registry of open subscriber connections, keyed by tenant.
///
/// All insertion, removal, and iteration happens under one lock, so
/// delivery never observes a half-removed entry. Empty per-tenant maps are
/// pruned eagerly.
pub struct SubscriptionRegistry {
    connections: RwLock<HashMap<Uuid, HashMap<u64, mpsc::UnboundedSender<String>>>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a connection for a tenant. Returns the subscription handle
    /// and the receiving end the transport task drains.
    pub fn subscribe(&self, app_id: Uuid) -> (SubscriptionId, mpsc::UnboundedReceiver<String>) {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.connections
            .write()
            .entry(app_id)
            .or_default()
            .insert(connection_id, tx);
        debug!(app_id = %app_id, connection_id, "Subscriber registered");
        (
            SubscriptionId {
                app_id,
                connection_id,
            },
            rx,
        )
    }

    /// Remove a connection, pruning the tenant entry when it empties.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut connections = self.connections.write();
        if let Some(subscribers) = connections.get_mut(&id.app_id) {
            subscribers.remove(&id.connection_id);
            if subscribers.is_empty() {
                connections.remove(&id.app_id);
            }
        }
        debug!(app_id = %id.app_id, connection_id = id.connection_id, "Subscriber removed");
    }

    /// Send a frame to every open connection of a tenant.
    ///
    /// Connections whose channel is closed are evicted in the same pass.
    /// Returns the number of successful sends.
    pub fn broadcast(&self, app_id: Uuid, frame: &str) -> usize {
        let mut connections = self.connections.write();
        let Some(subscribers) = connections.get_mut(&app_id) else {
            return 0;
        };

        let mut dead = Vec::new();
        let mut sent = 0;
        for (&connection_id, tx) in subscribers.iter() {
            if tx.send(frame.to_string()).is_ok() {
                sent += 1;
            } else {
                dead.push(connection_id);
            }
        }
        for connection_id in dead {
            subscribers.remove(&connection_id);
            debug!(app_id = %app_id, connection_id, "Evicted dead subscriber");
        }
        if subscribers.is_empty() {
            connections.remove(&app_id);
        }
        sent
    }

    /// Open connections for a tenant.
    pub fn connection_count(&self, app_id: Uuid) -> usize {
        self.connections
            .read()
            .get(&app_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Total open connections across all tenants.
    pub fn total_connections(&self) -> usize {
        self.connections.read().values().map(|s| s.len()).sum()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The delivery hub: enriches events with mapped CRM users and broadcasts
/// them to the owning tenant's subscribers.
#[derive(Clone)]
pub struct FanoutHub {
    registry: Arc<SubscriptionRegistry>,
    db: Arc<Database>,
    config: FanoutConfig,
}

impl FanoutHub {
    pub fn new(db: Arc<Database>, config: FanoutConfig) -> Self {
        Self {
            registry: Arc::new(SubscriptionRegistry::new()),
            db,
            config,
        }
    }

    /// The shared registry, for the WebSocket layer.
    pub fn registry(&self) -> Arc<SubscriptionRegistry> {
        self.registry.clone()
    }

    /// Keepalive probe interval for subscriber connections.
    pub fn ping_interval(&self) -> Duration {
        self.config.ping_interval
    }

    /// Deliver an event to the owning tenant's subscribers.
    ///
    /// When the event carries an upstream user id, the user mapping is
    /// consulted and the resolved CRM user id is attached. The event is then
    /// broadcast tenant-wide exactly once; enrichment never produces a
    /// second send.
    pub async fn publish(&self, mut event: FanoutEvent) -> FanoutResult<usize> {
        if event.crm_user_id.is_none() {
            if let Some(user_id) = event.user_id.clone() {
                match self
                    .db
                    .user_mapping_repo()
                    .resolve(event.app_id, &user_id)
                    .await
                {
                    Ok(Some(crm_user_id)) => event.crm_user_id = Some(crm_user_id),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(error = %e, app_id = %event.app_id, "User mapping lookup failed; broadcasting unenriched");
                    }
                }
            }
        }

        let frame = serde_json::to_string(&event)?;
        let sent = self.registry.broadcast(event.app_id, &frame);
        metrics::counter!("fanout_messages_sent").increment(sent as u64);
        debug!(app_id = %event.app_id, event = %event.event, subscribers = sent, "Fanout delivered");
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_and_broadcast() {
        let registry = SubscriptionRegistry::new();
        let app = Uuid::new_v4();
        let (_id, mut rx) = registry.subscribe(app);

        let sent = registry.broadcast(app, "frame-1");
        assert_eq!(sent, 1);
        assert_eq!(rx.try_recv().unwrap(), "frame-1");
    }

    #[test]
    fn test_tenant_isolation() {
        let registry = SubscriptionRegistry::new();
        let app_a = Uuid::new_v4();
        let app_b = Uuid::new_v4();
        let (_a, mut rx_a) = registry.subscribe(app_a);
        let (_b, mut rx_b) = registry.subscribe(app_b);

        registry.broadcast(app_a, "for-a");

        assert_eq!(rx_a.try_recv().unwrap(), "for-a");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn test_unsubscribe_prunes_empty_tenant() {
        let registry = SubscriptionRegistry::new();
        let app = Uuid::new_v4();
        let (id, _rx) = registry.subscribe(app);
        assert_eq!(registry.connection_count(app), 1);

        registry.unsubscribe(id);
        assert_eq!(registry.connection_count(app), 0);
        assert_eq!(registry.total_connections(), 0);
    }

    #[test]
    fn test_dead_subscriber_evicted_on_broadcast() {
        let registry = SubscriptionRegistry::new();
        let app = Uuid::new_v4();
        let (_id1, rx1) = registry.subscribe(app);
        let (_id2, mut rx2) = registry.subscribe(app);

        // Dropping the receiver closes the channel; the next broadcast
        // evicts that connection and still reaches the live one.
        drop(rx1);
        let sent = registry.broadcast(app, "frame");
        assert_eq!(sent, 1);
        assert_eq!(registry.connection_count(app), 1);
        assert_eq!(rx2.try_recv().unwrap(), "frame");
    }

    #[test]
    fn test_broadcast_to_unknown_tenant_is_noop() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(registry.broadcast(Uuid::new_v4(), "frame"), 0);
    }

    #[test]
    fn test_multiple_subscribers_all_receive() {
        let registry = SubscriptionRegistry::new();
        let app = Uuid::new_v4();
        let (_i1, mut rx1) = registry.subscribe(app);
        let (_i2, mut rx2) = registry.subscribe(app);
        let (_i3, mut rx3) = registry.subscribe(app);

        let sent = registry.broadcast(app, "frame");
        assert_eq!(sent, 3);
        for rx in [&mut rx1, &mut rx2, &mut rx3] {
            assert_eq!(rx.try_recv().unwrap(), "frame");
        }
    }

    #[test]
    fn test_fanout_config_default_interval() {
        let config = FanoutConfig::default();
        assert_eq!(config.ping_interval, Duration::from_secs(30));
    }
}
