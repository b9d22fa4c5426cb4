//! Message handler
//!
//! Idempotent upsert keyed by the upstream message id. Messages carry no
//! state machine and emit no fanout in the current design.

use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::{debug, warn};
use uuid::Uuid;

use callbridge_db::{DbRawEvent, MessageRepo, NewMessage};
use callbridge_types::{CallDirection, FanoutEvent, MessagePayload};

use crate::error::DispatchResult;

/// Handler for short-message events.
pub struct MessageHandler;

#[async_trait]
impl crate::handler::EventHandler for MessageHandler {
    async fn handle(
        &self,
        conn: &mut PgConnection,
        app_id: Uuid,
        event: &DbRawEvent,
    ) -> DispatchResult<Option<FanoutEvent>> {
        let payload = MessagePayload::from_event(&event.payload);
        let Some(message_id) = payload.id.as_ref() else {
            warn!(event_id = %event.id, "Message event without a message id dropped");
            return Ok(None);
        };

        let direction = derive_direction(payload.direction.as_deref(), &event.event_type);

        let new = NewMessage {
            app_id,
            upstream_message_id: message_id.as_str().to_string(),
            direction: direction.map(|d| d.as_str().to_string()),
            from_number: payload.from.clone(),
            to_number: payload.to.clone(),
            body: payload.text.clone(),
            user_id: payload.user_id.as_ref().map(|u| u.as_str().to_string()),
            sent_at: payload.sent_at,
        };
        MessageRepo::upsert(conn, &new).await?;
        debug!(message_id = %message_id, "Message recorded");
        Ok(None)
    }
}

/// Direction from the explicit field first, then inferred from the event
/// type string; null when neither yields a value.
pub fn derive_direction(explicit: Option<&str>, event_type: &str) -> Option<CallDirection> {
    if let Some(raw) = explicit {
        if let Some(direction) = CallDirection::normalize(raw) {
            return Some(direction);
        }
        warn!(direction = raw, "Unrecognized message direction");
    }

    let lowered = event_type.to_ascii_lowercase();
    if lowered.contains("received") || lowered.contains("inbound") {
        Some(CallDirection::Inbound)
    } else if lowered.contains("sent") || lowered.contains("outbound") {
        Some(CallDirection::Outbound)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_direction_wins() {
        assert_eq!(
            derive_direction(Some("outbound"), "sms.received"),
            Some(CallDirection::Outbound)
        );
    }

    #[test]
    fn test_event_type_inference() {
        assert_eq!(
            derive_direction(None, "sms.received"),
            Some(CallDirection::Inbound)
        );
        assert_eq!(
            derive_direction(None, "sms.sent"),
            Some(CallDirection::Outbound)
        );
        assert_eq!(
            derive_direction(None, "message.inbound"),
            Some(CallDirection::Inbound)
        );
        assert_eq!(
            derive_direction(None, "message.outbound_delivery"),
            Some(CallDirection::Outbound)
        );
    }

    #[test]
    fn test_unknown_direction_is_null() {
        assert_eq!(derive_direction(None, "sms.update"), None);
        assert_eq!(derive_direction(Some("sideways"), "sms.update"), None);
    }

    #[test]
    fn test_bad_explicit_falls_back_to_event_type() {
        assert_eq!(
            derive_direction(Some("sideways"), "sms.received"),
            Some(CallDirection::Inbound)
        );
    }
}
