//! Request and response shapes for the REST surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use callbridge_db::{DbCall, DbKeyAuditEntry, DbMessage, DbVoicemail};

use crate::error::ApiError;

/// Hard cap on page size.
const MAX_PER_PAGE: i64 = 200;

/// Pagination query parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl PageQuery {
    /// Resolve to (limit, offset), rejecting out-of-range values.
    pub fn limits(&self) -> Result<(i64, i64), ApiError> {
        let page = self.page.unwrap_or(1);
        let per_page = self.per_page.unwrap_or(50);
        if page < 1 {
            return Err(ApiError::bad_request("page must be >= 1"));
        }
        if !(1..=MAX_PER_PAGE).contains(&per_page) {
            return Err(ApiError::bad_request(format!(
                "per_page must be between 1 and {MAX_PER_PAGE}"
            )));
        }
        Ok((per_page, (page - 1) * per_page))
    }
}

/// Call list filters plus pagination.
#[derive(Debug, Clone, Deserialize)]
pub struct CallsQuery {
    pub status: Option<String>,
    pub direction: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl CallsQuery {
    pub fn page_query(&self) -> PageQuery {
        PageQuery {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Call record as exposed to tenants.
#[derive(Debug, Serialize)]
pub struct CallResponse {
    pub id: Uuid,
    pub call_id: String,
    pub direction: Option<String>,
    pub status: String,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub user_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub recording_url: Option<String>,
    pub has_voicemail: bool,
    pub voicemail_url: Option<String>,
    pub voicemail_transcript: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<DbCall> for CallResponse {
    fn from(c: DbCall) -> Self {
        Self {
            id: c.id,
            call_id: c.upstream_call_id,
            direction: c.direction,
            status: c.status,
            from_number: c.from_number,
            to_number: c.to_number,
            user_id: c.dialing_user_id,
            started_at: c.started_at,
            ended_at: c.ended_at,
            duration_secs: c.duration_secs,
            recording_url: c.recording_url,
            has_voicemail: c.has_voicemail,
            voicemail_url: c.voicemail_url,
            voicemail_transcript: c.voicemail_transcript,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// Message record as exposed to tenants.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub message_id: String,
    pub direction: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub body: Option<String>,
    pub user_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<DbMessage> for MessageResponse {
    fn from(m: DbMessage) -> Self {
        Self {
            id: m.id,
            message_id: m.upstream_message_id,
            direction: m.direction,
            from_number: m.from_number,
            to_number: m.to_number,
            body: m.body,
            user_id: m.user_id,
            sent_at: m.sent_at,
            created_at: m.created_at,
        }
    }
}

/// Voicemail record as exposed to tenants.
#[derive(Debug, Serialize)]
pub struct VoicemailResponse {
    pub id: Uuid,
    pub call_id: Option<String>,
    pub user_id: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub recording_url: Option<String>,
    pub transcript: Option<String>,
    pub duration_secs: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl From<DbVoicemail> for VoicemailResponse {
    fn from(v: DbVoicemail) -> Self {
        Self {
            id: v.id,
            call_id: v.upstream_call_id,
            user_id: v.user_id,
            from_number: v.from_number,
            to_number: v.to_number,
            recording_url: v.recording_url,
            transcript: v.transcript,
            duration_secs: v.duration_secs,
            created_at: v.created_at,
        }
    }
}

/// Audit entry as exposed to operators.
#[derive(Debug, Serialize)]
pub struct AuditEntryResponse {
    pub id: Uuid,
    pub action: String,
    pub old_key_hint: Option<String>,
    pub new_key_hint: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbKeyAuditEntry> for AuditEntryResponse {
    fn from(e: DbKeyAuditEntry) -> Self {
        Self {
            id: e.id,
            action: e.action,
            old_key_hint: e.old_key_hint,
            new_key_hint: e.new_key_hint,
            created_at: e.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paging() {
        let query = PageQuery {
            page: None,
            per_page: None,
        };
        assert_eq!(query.limits().unwrap(), (50, 0));
    }

    #[test]
    fn test_paging_offset() {
        let query = PageQuery {
            page: Some(3),
            per_page: Some(20),
        };
        assert_eq!(query.limits().unwrap(), (20, 40));
    }

    #[test]
    fn test_out_of_range_paging_rejected() {
        assert!(PageQuery {
            page: Some(0),
            per_page: None
        }
        .limits()
        .is_err());
        assert!(PageQuery {
            page: None,
            per_page: Some(0)
        }
        .limits()
        .is_err());
        assert!(PageQuery {
            page: None,
            per_page: Some(1000)
        }
        .limits()
        .is_err());
    }
}
