//! Typed webhook payloads
//!
//! The upstream delivers the same logical field under several names
//! (`from` / `from_number` / `caller`), sometimes nested under a
//! per-family object (`call`, `message`, `voicemail`) and sometimes flat at
//! the payload root. These structs codify every known alias with
//! `#[serde(alias)]` so extraction happens in a single typed pass instead of
//! probing paths at runtime.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// An upstream-assigned identifier.
///
/// The provider is inconsistent about numeric vs. string ids, so both wire
/// shapes decode into the canonical string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct UpstreamId(pub String);

impl UpstreamId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UpstreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UpstreamId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for UpstreamId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Str(String),
            Int(i64),
        }
        match Repr::deserialize(deserializer)? {
            Repr::Str(s) => Ok(UpstreamId(s)),
            Repr::Int(n) => Ok(UpstreamId(n.to_string())),
        }
    }
}

/// Deserialize an optional integer that may arrive as a number or a string.
fn flex_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(i64),
        Float(f64),
        Str(String),
    }
    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Int(n)) => Some(n),
        Some(Repr::Float(f)) => Some(f as i64),
        Some(Repr::Str(s)) => s.trim().parse().ok(),
        None => None,
    })
}

/// Deserialize an optional timestamp delivered either as an RFC 3339 string
/// or as a Unix epoch number (seconds or milliseconds).
fn flex_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Int(i64),
        Str(String),
    }
    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Int(n)) => {
            // Eleven-digit-plus epoch values are milliseconds.
            if n > 99_999_999_999 {
                Utc.timestamp_millis_opt(n).single()
            } else {
                Utc.timestamp_opt(n, 0).single()
            }
        }
        Some(Repr::Str(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        None => None,
    })
}

/// First-pass envelope extracted from every webhook delivery.
///
/// Carries only the routing fields: event type, upstream delivery identity,
/// and the organization the delivery belongs to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookEnvelope {
    #[serde(default, alias = "type")]
    pub event_type: Option<String>,
    #[serde(default, alias = "id")]
    pub event_id: Option<UpstreamId>,
    #[serde(default, alias = "org_id", alias = "company_id")]
    pub organization_id: Option<UpstreamId>,
    #[serde(default)]
    target: Option<EnvelopeTarget>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct EnvelopeTarget {
    #[serde(default, alias = "org_id")]
    organization_id: Option<UpstreamId>,
}

impl WebhookEnvelope {
    /// Parse the envelope from a decoded payload.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// The organization id, trying the flat aliases before the nested
    /// `target.organization_id` path.
    pub fn organization(&self) -> Option<&UpstreamId> {
        self.organization_id
            .as_ref()
            .or_else(|| self.target.as_ref().and_then(|t| t.organization_id.as_ref()))
    }
}

/// Returns the per-family nested object when present, else the payload root.
///
/// Upstream events wrap their fields under `"call"` / `"message"` /
/// `"voicemail"` in newer payloads and deliver them flat in older ones.
fn nested_or_root<'a>(value: &'a Value, key: &str) -> &'a Value {
    match value.get(key) {
        Some(nested) if nested.is_object() => nested,
        _ => value,
    }
}

/// Fields of a call-family webhook event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallPayload {
    #[serde(default, alias = "call_id")]
    pub id: Option<UpstreamId>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default, alias = "from_number", alias = "caller")]
    pub from: Option<String>,
    #[serde(default, alias = "to_number", alias = "callee")]
    pub to: Option<String>,
    #[serde(default, alias = "target_user_id")]
    pub user_id: Option<UpstreamId>,
    #[serde(default, deserialize_with = "flex_i64")]
    pub duration: Option<i64>,
    #[serde(default, alias = "date_started", deserialize_with = "flex_time")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "date_ended", deserialize_with = "flex_time")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default, alias = "recording")]
    pub recording_url: Option<String>,
}

impl CallPayload {
    /// Extract from a full event payload, preferring the nested `call`
    /// object.
    pub fn from_event(value: &Value) -> Self {
        serde_json::from_value(nested_or_root(value, "call").clone()).unwrap_or_default()
    }
}

/// Fields of a message-family webhook event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagePayload {
    #[serde(default, alias = "message_id")]
    pub id: Option<UpstreamId>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default, alias = "from_number", alias = "sender")]
    pub from: Option<String>,
    #[serde(default, alias = "to_number", alias = "recipient")]
    pub to: Option<String>,
    #[serde(default, alias = "body")]
    pub text: Option<String>,
    #[serde(default, alias = "target_user_id")]
    pub user_id: Option<UpstreamId>,
    #[serde(default, alias = "created_date", deserialize_with = "flex_time")]
    pub sent_at: Option<DateTime<Utc>>,
}

impl MessagePayload {
    /// Extract from a full event payload, preferring the nested `message`
    /// object.
    pub fn from_event(value: &Value) -> Self {
        serde_json::from_value(nested_or_root(value, "message").clone()).unwrap_or_default()
    }
}

/// Fields of a voicemail-family webhook event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VoicemailPayload {
    #[serde(default)]
    pub call_id: Option<UpstreamId>,
    #[serde(default, alias = "target_user_id")]
    pub user_id: Option<UpstreamId>,
    #[serde(default, alias = "from_number", alias = "caller")]
    pub from: Option<String>,
    #[serde(default, alias = "to_number")]
    pub to: Option<String>,
    #[serde(default, alias = "recording", alias = "voicemail_url")]
    pub recording_url: Option<String>,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default, deserialize_with = "flex_i64")]
    pub duration: Option<i64>,
}

impl VoicemailPayload {
    /// Extract from a full event payload, preferring the nested `voicemail`
    /// object.
    pub fn from_event(value: &Value) -> Self {
        serde_json::from_value(nested_or_root(value, "voicemail").clone()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_flat_fields() {
        let payload = json!({
            "event_type": "call.ring",
            "event_id": "evt-1",
            "organization_id": 42
        });
        let env = WebhookEnvelope::from_value(&payload);
        assert_eq!(env.event_type.as_deref(), Some("call.ring"));
        assert_eq!(env.event_id.as_ref().map(|i| i.as_str()), Some("evt-1"));
        assert_eq!(env.organization().map(|i| i.as_str()), Some("42"));
    }

    #[test]
    fn test_envelope_aliases() {
        let payload = json!({ "type": "call.ended", "id": 9001, "org_id": "org-7" });
        let env = WebhookEnvelope::from_value(&payload);
        assert_eq!(env.event_type.as_deref(), Some("call.ended"));
        assert_eq!(env.event_id.as_ref().map(|i| i.as_str()), Some("9001"));
        assert_eq!(env.organization().map(|i| i.as_str()), Some("org-7"));

        let payload = json!({ "company_id": 5 });
        let env = WebhookEnvelope::from_value(&payload);
        assert_eq!(env.organization().map(|i| i.as_str()), Some("5"));
    }

    #[test]
    fn test_envelope_nested_target_org() {
        let payload = json!({ "target": { "organization_id": "org-9" } });
        let env = WebhookEnvelope::from_value(&payload);
        assert_eq!(env.organization().map(|i| i.as_str()), Some("org-9"));
    }

    #[test]
    fn test_envelope_missing_everything() {
        let env = WebhookEnvelope::from_value(&json!({ "unrelated": true }));
        assert!(env.event_type.is_none());
        assert!(env.event_id.is_none());
        assert!(env.organization().is_none());
    }

    #[test]
    fn test_call_payload_nested() {
        let payload = json!({
            "event_type": "call.ring",
            "call": {
                "id": 9999,
                "direction": "INBOUND",
                "from": "+15550001111",
                "to": "+15550002222",
                "user_id": 12345
            },
            "organization_id": 42
        });
        let call = CallPayload::from_event(&payload);
        assert_eq!(call.id.as_ref().map(|i| i.as_str()), Some("9999"));
        assert_eq!(call.direction.as_deref(), Some("INBOUND"));
        assert_eq!(call.from.as_deref(), Some("+15550001111"));
        assert_eq!(call.to.as_deref(), Some("+15550002222"));
        assert_eq!(call.user_id.as_ref().map(|i| i.as_str()), Some("12345"));
    }

    #[test]
    fn test_call_payload_flat_with_aliases() {
        let payload = json!({
            "call_id": "abc",
            "from_number": "+1111",
            "callee": "+2222",
            "duration": "180"
        });
        let call = CallPayload::from_event(&payload);
        assert_eq!(call.id.as_ref().map(|i| i.as_str()), Some("abc"));
        assert_eq!(call.from.as_deref(), Some("+1111"));
        assert_eq!(call.to.as_deref(), Some("+2222"));
        assert_eq!(call.duration, Some(180));
    }

    #[test]
    fn test_call_payload_epoch_millis_start() {
        let payload = json!({ "call": { "id": 1, "date_started": 1700000000000_i64 } });
        let call = CallPayload::from_event(&payload);
        let started = call.started_at.unwrap();
        assert_eq!(started.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_message_payload_aliases() {
        let payload = json!({
            "message": {
                "message_id": 77,
                "sender": "+1000",
                "recipient": "+2000",
                "body": "hello"
            }
        });
        let msg = MessagePayload::from_event(&payload);
        assert_eq!(msg.id.as_ref().map(|i| i.as_str()), Some("77"));
        assert_eq!(msg.from.as_deref(), Some("+1000"));
        assert_eq!(msg.to.as_deref(), Some("+2000"));
        assert_eq!(msg.text.as_deref(), Some("hello"));
    }

    #[test]
    fn test_voicemail_payload_orphan() {
        let payload = json!({
            "voicemail": {
                "user_id": 12345,
                "from": "+15550001111",
                "recording_url": "https://example.test/vm.mp3",
                "duration": 22
            }
        });
        let vm = VoicemailPayload::from_event(&payload);
        assert!(vm.call_id.is_none());
        assert_eq!(vm.user_id.as_ref().map(|i| i.as_str()), Some("12345"));
        assert_eq!(vm.duration, Some(22));
    }

    #[test]
    fn test_malformed_nested_object_falls_back_to_root() {
        // "call" is a string, not an object: root-level fields still parse.
        let payload = json!({ "call": "weird", "call_id": 3, "from": "+1" });
        let call = CallPayload::from_event(&payload);
        assert_eq!(call.id.as_ref().map(|i| i.as_str()), Some("3"));
        assert_eq!(call.from.as_deref(), Some("+1"));
    }
}
