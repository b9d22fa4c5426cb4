//! Fanout event envelope
//!
//! The JSON frame delivered to every subscriber connection of a tenant when
//! the pipeline commits a transition. One shape covers call and voicemail
//! notifications; optional fields are omitted from the wire when absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{CallDirection, CallStatus};

/// A real-time event addressed to a tenant's subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutEvent {
    /// Tenant the event belongs to. Not serialized to the wire; routing only.
    #[serde(skip)]
    pub app_id: Uuid,
    /// Event name, e.g. `call.ring` or `voicemail.received`.
    pub event: String,
    /// Upstream call id, when the event concerns a call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<CallDirection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CallStatus>,
    /// Upstream user id attached to the event, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Tenant-defined CRM user id resolved through the user mapping.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crm_user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recording_url: Option<String>,
    /// When the transition was committed.
    pub timestamp: DateTime<Utc>,
}

impl FanoutEvent {
    /// Start an event with only the required fields set.
    pub fn new(app_id: Uuid, event: impl Into<String>) -> Self {
        Self {
            app_id,
            event: event.into(),
            call_id: None,
            direction: None,
            from_number: None,
            to_number: None,
            status: None,
            user_id: None,
            crm_user_id: None,
            duration_secs: None,
            recording_url: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_fields_omitted() {
        let event = FanoutEvent::new(Uuid::new_v4(), "call.ring");
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"call.ring\""));
        assert!(json.contains("timestamp"));
        assert!(!json.contains("crm_user_id"));
        assert!(!json.contains("duration_secs"));
        assert!(!json.contains("app_id"));
    }

    #[test]
    fn test_populated_fields_serialized() {
        let mut event = FanoutEvent::new(Uuid::new_v4(), "call.ended");
        event.call_id = Some("9999".to_string());
        event.status = Some(CallStatus::Ended);
        event.direction = Some(CallDirection::Inbound);
        event.duration_secs = Some(180);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"call_id\":\"9999\""));
        assert!(json.contains("\"status\":\"ended\""));
        assert!(json.contains("\"direction\":\"inbound\""));
        assert!(json.contains("\"duration_secs\":180"));
    }
}
