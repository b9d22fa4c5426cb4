//! Voicemail handler
//!
//! Upserts a voicemail row, cross-links it to a call when the upstream
//! supplied a call id, and guards orphan voicemails (no call id) against
//! duplicate delivery with a short time window.

use async_trait::async_trait;
use sqlx::PgConnection;
use tracing::{debug, warn};
use uuid::Uuid;

use callbridge_db::{CallRepo, DbRawEvent, DbVoicemail, NewCall, NewVoicemail, VoicemailRepo};
use callbridge_types::{CallStatus, FanoutEvent, Transition, VoicemailPayload};

use crate::error::{DispatchError, DispatchResult};
use crate::sanitize::sanitize_payload;

/// Window within which an identical orphan voicemail is a duplicate.
const ORPHAN_DEDUP_WINDOW_SECS: i64 = 60;

/// Handler for voicemail events.
pub struct VoicemailHandler;

#[async_trait]
impl crate::handler::EventHandler for VoicemailHandler {
    async fn handle(
        &self,
        conn: &mut PgConnection,
        app_id: Uuid,
        event: &DbRawEvent,
    ) -> DispatchResult<Option<FanoutEvent>> {
        let payload = VoicemailPayload::from_event(&event.payload);

        let voicemail = match payload.call_id.as_ref() {
            Some(call_id) => {
                upsert_by_call(conn, app_id, call_id.as_str(), &payload).await?
            }
            None => match insert_orphan(conn, app_id, &payload).await? {
                Some(voicemail) => voicemail,
                // Duplicate within the window: the earlier delivery already
                // produced the row and the notification.
                None => return Ok(None),
            },
        };

        if let Some(call_id) = payload.call_id.as_ref() {
            cross_link_call(conn, app_id, call_id.as_str(), event, &payload).await?;
        }

        let mut emission = FanoutEvent::new(app_id, "voicemail.received");
        emission.call_id = payload.call_id.as_ref().map(|id| id.as_str().to_string());
        emission.from_number = voicemail.from_number.clone();
        emission.to_number = voicemail.to_number.clone();
        emission.status = Some(CallStatus::Voicemail);
        emission.user_id = voicemail.user_id.clone();
        emission.duration_secs = voicemail.duration_secs;
        emission.recording_url = voicemail.recording_url.clone();
        Ok(Some(emission))
    }
}

/// Update the voicemail for this call if one exists; insert otherwise.
async fn upsert_by_call(
    conn: &mut PgConnection,
    app_id: Uuid,
    call_id: &str,
    payload: &VoicemailPayload,
) -> DispatchResult<DbVoicemail> {
    match VoicemailRepo::find_by_call(conn, app_id, call_id).await? {
        Some(existing) => {
            let voicemail = VoicemailRepo::update_media(
                conn,
                existing.id,
                payload.recording_url.as_deref(),
                payload.transcript.as_deref(),
                payload.duration,
            )
            .await?;
            debug!(call_id, "Voicemail media refreshed");
            Ok(voicemail)
        }
        None => {
            let voicemail = VoicemailRepo::insert(conn, &new_voicemail(app_id, payload)).await?;
            debug!(call_id, "Voicemail recorded");
            Ok(voicemail)
        }
    }
}

/// Insert an orphan voicemail unless an identical one landed inside the
/// duplicate window. Returns `None` on a confirmed duplicate.
async fn insert_orphan(
    conn: &mut PgConnection,
    app_id: Uuid,
    payload: &VoicemailPayload,
) -> DispatchResult<Option<DbVoicemail>> {
    let user_id = payload.user_id.as_ref().map(|u| u.as_str());
    let existing = VoicemailRepo::find_recent_orphan(
        conn,
        app_id,
        user_id,
        payload.from.as_deref(),
        ORPHAN_DEDUP_WINDOW_SECS,
    )
    .await?;

    if let Some(existing) = existing {
        warn!(
            voicemail_id = %existing.id,
            "Duplicate orphan voicemail within window; keeping existing row"
        );
        return Ok(None);
    }

    let voicemail = VoicemailRepo::insert(conn, &new_voicemail(app_id, payload)).await?;
    debug!(voicemail_id = %voicemail.id, "Orphan voicemail recorded");
    Ok(Some(voicemail))
}

/// Transition the corresponding call to `voicemail` when the matrix permits
/// and record the media onto it. Creates an informational call row in the
/// terminal `voicemail` state when none exists.
async fn cross_link_call(
    conn: &mut PgConnection,
    app_id: Uuid,
    call_id: &str,
    event: &DbRawEvent,
    payload: &VoicemailPayload,
) -> DispatchResult<()> {
    match CallRepo::find_for_update(conn, app_id, call_id).await? {
        Some(row) => {
            let current = CallStatus::parse(&row.status)
                .ok_or_else(|| DispatchError::CorruptStatus(row.status.clone()))?;
            match current.transition_to(CallStatus::Voicemail) {
                Transition::Accept => {
                    CallRepo::apply_transition(
                        conn,
                        row.id,
                        CallStatus::Voicemail.as_str(),
                        None,
                        payload.from.as_deref(),
                        payload.to.as_deref(),
                        payload.user_id.as_ref().map(|u| u.as_str()),
                        None,
                        None,
                        payload.duration,
                        None,
                    )
                    .await?;
                    debug!(call_id, from = %current, "Call transitioned to voicemail");
                }
                Transition::Reentry => {}
                Transition::Deny => {
                    warn!(call_id, from = %current, "Call not moved to voicemail; matrix denies");
                }
            }
            CallRepo::set_voicemail_media(
                conn,
                row.id,
                payload.recording_url.as_deref(),
                payload.transcript.as_deref(),
            )
            .await?;
        }
        None => {
            let new = NewCall {
                app_id,
                upstream_call_id: call_id.to_string(),
                status: CallStatus::Voicemail.as_str().to_string(),
                direction: None,
                from_number: payload.from.clone(),
                to_number: payload.to.clone(),
                dialing_user_id: payload.user_id.as_ref().map(|u| u.as_str().to_string()),
                duration_secs: payload.duration,
                has_voicemail: true,
                voicemail_url: payload.recording_url.clone(),
                voicemail_transcript: payload.transcript.clone(),
                last_payload: Some(sanitize_payload(&event.payload)),
                ..Default::default()
            };
            CallRepo::insert(conn, &new).await?;
            debug!(call_id, "Informational voicemail call row created");
        }
    }
    Ok(())
}

fn new_voicemail(app_id: Uuid, payload: &VoicemailPayload) -> NewVoicemail {
    NewVoicemail {
        app_id,
        upstream_call_id: payload.call_id.as_ref().map(|id| id.as_str().to_string()),
        user_id: payload.user_id.as_ref().map(|u| u.as_str().to_string()),
        from_number: payload.from.clone(),
        to_number: payload.to.clone(),
        recording_url: payload.recording_url.clone(),
        transcript: payload.transcript.clone(),
        duration_secs: payload.duration,
    }
}
