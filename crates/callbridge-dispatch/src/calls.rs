//! Call lifecycle handlers
//!
//! One handler per upstream call event type, all funneling through the same
//! pattern: read the existing row under a lock, validate the proposed
//! status against the transition matrix, then insert or update. Illegal
//! transitions are dropped with a warning, never surfaced as errors;
//! terminal states must stay sticky against late deliveries.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgConnection;
use tracing::{debug, warn};
use uuid::Uuid;

use callbridge_db::{CallRepo, DbCall, DbRawEvent, NewCall};
use callbridge_types::{CallDirection, CallPayload, CallStatus, FanoutEvent, Transition};

use crate::error::{DispatchError, DispatchResult};
use crate::sanitize::sanitize_payload;

/// Targets `ringing`; the usual first event of a call.
pub struct RingHandler;

/// Targets `active`; records when the call was answered.
pub struct StartedHandler;

/// Targets `ended`; prefers UPDATE so richer data from earlier events
/// survives, but creates a minimal row when the ended event arrives first.
pub struct EndedHandler;

/// Targets `missed`.
pub struct MissedHandler;

/// Targets `rejected`.
pub struct RejectedHandler;

/// Attaches the recording URL to an existing call without transitioning.
/// No row is ever created for a recording alone.
pub struct RecordingHandler;

#[async_trait]
impl crate::handler::EventHandler for RingHandler {
    async fn handle(
        &self,
        conn: &mut PgConnection,
        app_id: Uuid,
        event: &DbRawEvent,
    ) -> DispatchResult<Option<FanoutEvent>> {
        apply_call_transition(conn, app_id, event, CallStatus::Ringing).await
    }
}

#[async_trait]
impl crate::handler::EventHandler for StartedHandler {
    async fn handle(
        &self,
        conn: &mut PgConnection,
        app_id: Uuid,
        event: &DbRawEvent,
    ) -> DispatchResult<Option<FanoutEvent>> {
        apply_call_transition(conn, app_id, event, CallStatus::Active).await
    }
}

#[async_trait]
impl crate::handler::EventHandler for EndedHandler {
    async fn handle(
        &self,
        conn: &mut PgConnection,
        app_id: Uuid,
        event: &DbRawEvent,
    ) -> DispatchResult<Option<FanoutEvent>> {
        apply_call_transition(conn, app_id, event, CallStatus::Ended).await
    }
}

#[async_trait]
impl crate::handler::EventHandler for MissedHandler {
    async fn handle(
        &self,
        conn: &mut PgConnection,
        app_id: Uuid,
        event: &DbRawEvent,
    ) -> DispatchResult<Option<FanoutEvent>> {
        apply_call_transition(conn, app_id, event, CallStatus::Missed).await
    }
}

#[async_trait]
impl crate::handler::EventHandler for RejectedHandler {
    async fn handle(
        &self,
        conn: &mut PgConnection,
        app_id: Uuid,
        event: &DbRawEvent,
    ) -> DispatchResult<Option<FanoutEvent>> {
        apply_call_transition(conn, app_id, event, CallStatus::Rejected).await
    }
}

#[async_trait]
impl crate::handler::EventHandler for RecordingHandler {
    async fn handle(
        &self,
        conn: &mut PgConnection,
        app_id: Uuid,
        event: &DbRawEvent,
    ) -> DispatchResult<Option<FanoutEvent>> {
        let payload = CallPayload::from_event(&event.payload);
        let Some(call_id) = payload.id.as_ref() else {
            warn!(event_id = %event.id, "Recording event without a call id dropped");
            return Ok(None);
        };
        let Some(url) = payload.recording_url.as_deref() else {
            warn!(event_id = %event.id, call_id = %call_id, "Recording event without a URL dropped");
            return Ok(None);
        };

        match CallRepo::attach_recording(conn, app_id, call_id.as_str(), url).await? {
            Some(_) => {
                debug!(call_id = %call_id, "Recording attached");
            }
            None => {
                warn!(call_id = %call_id, "Recording event for unknown call dropped");
            }
        }
        Ok(None)
    }
}

/// Normalize a raw direction value, logging unrecognized variants.
pub fn normalize_direction(raw: Option<&str>) -> Option<CallDirection> {
    let raw = raw?;
    match CallDirection::normalize(raw) {
        Some(direction) => Some(direction),
        None => {
            warn!(direction = raw, "Unrecognized call direction");
            None
        }
    }
}

/// The shared read-validate-write sequence for status-bearing call events.
async fn apply_call_transition(
    conn: &mut PgConnection,
    app_id: Uuid,
    event: &DbRawEvent,
    target: CallStatus,
) -> DispatchResult<Option<FanoutEvent>> {
    let payload = CallPayload::from_event(&event.payload);
    let Some(call_id) = payload.id.clone() else {
        warn!(event_id = %event.id, event_type = %event.event_type, "Call event without a call id dropped");
        return Ok(None);
    };

    let direction = normalize_direction(payload.direction.as_deref());
    let sanitized = sanitize_payload(&event.payload);

    // Answer and hangup timestamps default to arrival time when the
    // upstream omits them.
    let started_at = match target {
        CallStatus::Active => payload.started_at.or_else(|| Some(Utc::now())),
        _ => payload.started_at,
    };
    let ended_at = match target {
        CallStatus::Ended | CallStatus::Missed | CallStatus::Rejected => {
            payload.ended_at.or_else(|| Some(Utc::now()))
        }
        _ => payload.ended_at,
    };

    let existing = CallRepo::find_for_update(conn, app_id, call_id.as_str()).await?;

    let call = match existing {
        None => {
            let new = NewCall {
                app_id,
                upstream_call_id: call_id.as_str().to_string(),
                status: target.as_str().to_string(),
                direction: direction.map(|d| d.as_str().to_string()),
                from_number: payload.from.clone(),
                to_number: payload.to.clone(),
                dialing_user_id: payload.user_id.as_ref().map(|u| u.as_str().to_string()),
                started_at,
                ended_at,
                duration_secs: payload.duration,
                last_payload: Some(sanitized),
                ..Default::default()
            };
            let call = CallRepo::insert(conn, &new).await?;
            debug!(call_id = %call_id, status = %target, "Call row created");
            call
        }
        Some(row) => {
            let current = CallStatus::parse(&row.status)
                .ok_or_else(|| DispatchError::CorruptStatus(row.status.clone()))?;

            match current.transition_to(target) {
                Transition::Deny => {
                    warn!(
                        call_id = %call_id,
                        from = %current,
                        to = %target,
                        "Illegal call transition dropped"
                    );
                    metrics::counter!("dispatch_illegal_transitions").increment(1);
                    return Ok(None);
                }
                Transition::Reentry => {
                    // Same-state redelivery: merge any richer fields, but
                    // do not notify subscribers again.
                    CallRepo::apply_transition(
                        conn,
                        row.id,
                        target.as_str(),
                        direction.map(|d| d.as_str()),
                        payload.from.as_deref(),
                        payload.to.as_deref(),
                        payload.user_id.as_ref().map(|u| u.as_str()),
                        started_at,
                        ended_at,
                        payload.duration,
                        Some(&sanitized),
                    )
                    .await?;
                    debug!(call_id = %call_id, status = %target, "Same-state re-entry merged");
                    return Ok(None);
                }
                Transition::Accept => {
                    let call = CallRepo::apply_transition(
                        conn,
                        row.id,
                        target.as_str(),
                        direction.map(|d| d.as_str()),
                        payload.from.as_deref(),
                        payload.to.as_deref(),
                        payload.user_id.as_ref().map(|u| u.as_str()),
                        started_at,
                        ended_at,
                        payload.duration,
                        Some(&sanitized),
                    )
                    .await?;
                    debug!(call_id = %call_id, from = %current, to = %target, "Call transitioned");
                    call
                }
            }
        }
    };

    Ok(Some(emission_for(&call, &event.event_type, target)))
}

/// Build the fanout emission for a committed transition.
fn emission_for(call: &DbCall, event_type: &str, target: CallStatus) -> FanoutEvent {
    let mut emission = FanoutEvent::new(call.app_id, event_type);
    emission.call_id = Some(call.upstream_call_id.clone());
    emission.direction = call.direction.as_deref().and_then(CallDirection::parse);
    emission.from_number = call.from_number.clone();
    emission.to_number = call.to_number.clone();
    emission.status = Some(target);
    emission.user_id = call.dialing_user_id.clone();
    if target == CallStatus::Ended {
        emission.duration_secs = call.duration_secs;
    }
    emission
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_direction_variants() {
        assert_eq!(
            normalize_direction(Some("INBOUND")),
            Some(CallDirection::Inbound)
        );
        assert_eq!(
            normalize_direction(Some("outgoing")),
            Some(CallDirection::Outbound)
        );
        assert_eq!(normalize_direction(Some("sideways")), None);
        assert_eq!(normalize_direction(None), None);
    }

    #[test]
    fn test_emission_carries_duration_only_for_ended() {
        let call = DbCall {
            id: Uuid::new_v4(),
            app_id: Uuid::new_v4(),
            upstream_call_id: "9999".to_string(),
            direction: Some("inbound".to_string()),
            status: "ended".to_string(),
            from_number: Some("+15550001111".to_string()),
            to_number: Some("+15550002222".to_string()),
            dialing_user_id: Some("12345".to_string()),
            started_at: None,
            ended_at: None,
            duration_secs: Some(180),
            recording_url: None,
            has_voicemail: false,
            voicemail_url: None,
            voicemail_transcript: None,
            last_payload: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let ended = emission_for(&call, "call.ended", CallStatus::Ended);
        assert_eq!(ended.duration_secs, Some(180));
        assert_eq!(ended.status, Some(CallStatus::Ended));
        assert_eq!(ended.direction, Some(CallDirection::Inbound));

        let ring = emission_for(&call, "call.ring", CallStatus::Ringing);
        assert_eq!(ring.duration_secs, None);
    }
}
