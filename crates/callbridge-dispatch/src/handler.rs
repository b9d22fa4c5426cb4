//! Handler registry
//!
//! Handlers register at startup under the upstream event type string. An
//! event whose type has no handler is still stamped processed, to keep the
//! queue from accumulating unroutable rows.

use async_trait::async_trait;
use sqlx::PgConnection;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use callbridge_db::DbRawEvent;
use callbridge_types::FanoutEvent;

use crate::error::DispatchResult;

/// A type-specific event handler.
///
/// Handlers run inside the dispatcher's per-event savepoint; every
/// statement they issue commits or rolls back with the event's stamp.
/// Redelivery is normal, so handlers must be side-effect idempotent.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Process one event, returning an optional fanout emission that the
    /// dispatcher delivers after the batch commits.
    async fn handle(
        &self,
        conn: &mut PgConnection,
        app_id: Uuid,
        event: &DbRawEvent,
    ) -> DispatchResult<Option<FanoutEvent>>;
}

/// Mapping from event type to handler, built once at startup.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under an event type string.
    pub fn register(&mut self, event_type: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.handlers.insert(event_type.into(), handler);
    }

    pub fn get(&self, event_type: &str) -> Option<&Arc<dyn EventHandler>> {
        self.handlers.get(event_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopHandler;

    #[async_trait]
    impl EventHandler for NoopHandler {
        async fn handle(
            &self,
            _conn: &mut PgConnection,
            _app_id: Uuid,
            _event: &DbRawEvent,
        ) -> DispatchResult<Option<FanoutEvent>> {
            Ok(None)
        }
    }

    #[test]
    fn test_registry_routing() {
        let mut registry = HandlerRegistry::new();
        registry.register("call.ring", Arc::new(NoopHandler));
        registry.register("sms.received", Arc::new(NoopHandler));

        assert!(registry.get("call.ring").is_some());
        assert!(registry.get("sms.received").is_some());
        assert!(registry.get("call.unknown").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_default_registry_covers_known_types() {
        let registry = crate::default_registry();
        for event_type in [
            "call.ring",
            "call.started",
            "call.ended",
            "call.missed",
            "call.rejected",
            "call.recording_completed",
            "voicemail.received",
            "sms.received",
            "sms.sent",
        ] {
            assert!(registry.get(event_type).is_some(), "missing {event_type}");
        }
    }
}
