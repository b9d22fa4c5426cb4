//! Call repository
//!
//! Transition validation happens in the dispatch layer; every mutation here
//! runs against the caller's transaction so the read-validate-write sequence
//! holds a row lock for its whole lifetime.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{DbCall, DbResult};

/// Fields for a fresh call row.
#[derive(Debug, Clone, Default)]
pub struct NewCall {
    pub app_id: Uuid,
    pub upstream_call_id: String,
    pub status: String,
    pub direction: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub dialing_user_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<i64>,
    pub has_voicemail: bool,
    pub voicemail_url: Option<String>,
    pub voicemail_transcript: Option<String>,
    pub last_payload: Option<serde_json::Value>,
}

/// Repository for call rows.
pub struct CallRepo {
    pool: PgPool,
}

impl CallRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read a call under a row lock, serializing concurrent transitions on
    /// the same call.
    pub async fn find_for_update(
        conn: &mut PgConnection,
        app_id: Uuid,
        upstream_call_id: &str,
    ) -> DbResult<Option<DbCall>> {
        let call = sqlx::query_as::<_, DbCall>(
            "SELECT * FROM calls WHERE app_id = $1 AND upstream_call_id = $2 FOR UPDATE",
        )
        .bind(app_id)
        .bind(upstream_call_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(call)
    }

    /// Insert a fresh call row.
    pub async fn insert(conn: &mut PgConnection, new: &NewCall) -> DbResult<DbCall> {
        let call = sqlx::query_as::<_, DbCall>(
            r#"
            INSERT INTO calls
                (app_id, upstream_call_id, status, direction, from_number, to_number,
                 dialing_user_id, started_at, ended_at, duration_secs,
                 has_voicemail, voicemail_url, voicemail_transcript, last_payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(new.app_id)
        .bind(&new.upstream_call_id)
        .bind(&new.status)
        .bind(&new.direction)
        .bind(&new.from_number)
        .bind(&new.to_number)
        .bind(&new.dialing_user_id)
        .bind(new.started_at)
        .bind(new.ended_at)
        .bind(new.duration_secs)
        .bind(new.has_voicemail)
        .bind(&new.voicemail_url)
        .bind(&new.voicemail_transcript)
        .bind(&new.last_payload)
        .fetch_one(&mut *conn)
        .await?;
        Ok(call)
    }

    /// Apply an accepted transition to an existing row.
    ///
    /// Every optional column uses COALESCE so a sparse late event never
    /// erases richer data recorded by an earlier one; in particular a
    /// non-null direction is never overwritten by null.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_transition(
        conn: &mut PgConnection,
        id: Uuid,
        status: &str,
        direction: Option<&str>,
        from_number: Option<&str>,
        to_number: Option<&str>,
        dialing_user_id: Option<&str>,
        started_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
        duration_secs: Option<i64>,
        last_payload: Option<&serde_json::Value>,
    ) -> DbResult<DbCall> {
        let call = sqlx::query_as::<_, DbCall>(
            r#"
            UPDATE calls
            SET status = $2,
                direction = COALESCE($3, direction),
                from_number = COALESCE($4, from_number),
                to_number = COALESCE($5, to_number),
                dialing_user_id = COALESCE($6, dialing_user_id),
                started_at = COALESCE($7, started_at),
                ended_at = COALESCE($8, ended_at),
                duration_secs = COALESCE($9, duration_secs),
                last_payload = COALESCE($10, last_payload),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(direction)
        .bind(from_number)
        .bind(to_number)
        .bind(dialing_user_id)
        .bind(started_at)
        .bind(ended_at)
        .bind(duration_secs)
        .bind(last_payload)
        .fetch_one(&mut *conn)
        .await?;
        Ok(call)
    }

    /// Attach a recording URL without touching status.
    ///
    /// Returns `None` when no row exists; recording events never create one.
    pub async fn attach_recording(
        conn: &mut PgConnection,
        app_id: Uuid,
        upstream_call_id: &str,
        recording_url: &str,
    ) -> DbResult<Option<DbCall>> {
        let call = sqlx::query_as::<_, DbCall>(
            r#"
            UPDATE calls
            SET recording_url = $3, updated_at = NOW()
            WHERE app_id = $1 AND upstream_call_id = $2
            RETURNING *
            "#,
        )
        .bind(app_id)
        .bind(upstream_call_id)
        .bind(recording_url)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(call)
    }

    /// Record voicemail media onto a call row.
    pub async fn set_voicemail_media(
        conn: &mut PgConnection,
        id: Uuid,
        voicemail_url: Option<&str>,
        voicemail_transcript: Option<&str>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE calls
            SET has_voicemail = TRUE,
                voicemail_url = COALESCE($2, voicemail_url),
                voicemail_transcript = COALESCE($3, voicemail_transcript),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(voicemail_url)
        .bind(voicemail_transcript)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// List calls for a tenant, newest first, with optional filters.
    pub async fn list(
        &self,
        app_id: Uuid,
        status: Option<&str>,
        direction: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<DbCall>> {
        let calls = sqlx::query_as::<_, DbCall>(
            r#"
            SELECT * FROM calls
            WHERE app_id = $1
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR direction = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(app_id)
        .bind(status)
        .bind(direction)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(calls)
    }

    /// Calls currently ringing or active for a tenant.
    pub async fn list_active(&self, app_id: Uuid) -> DbResult<Vec<DbCall>> {
        let calls = sqlx::query_as::<_, DbCall>(
            r#"
            SELECT * FROM calls
            WHERE app_id = $1 AND status IN ('ringing', 'active')
            ORDER BY updated_at DESC
            "#,
        )
        .bind(app_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(calls)
    }

    pub async fn find_by_upstream_id(
        &self,
        app_id: Uuid,
        upstream_call_id: &str,
    ) -> DbResult<Option<DbCall>> {
        let call = sqlx::query_as::<_, DbCall>(
            "SELECT * FROM calls WHERE app_id = $1 AND upstream_call_id = $2",
        )
        .bind(app_id)
        .bind(upstream_call_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(call)
    }
}
