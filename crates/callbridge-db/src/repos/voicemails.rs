//! Voicemail repository

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{DbResult, DbVoicemail};

/// Fields for a fresh voicemail row.
#[derive(Debug, Clone, Default)]
pub struct NewVoicemail {
    pub app_id: Uuid,
    pub upstream_call_id: Option<String>,
    pub user_id: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub recording_url: Option<String>,
    pub transcript: Option<String>,
    pub duration_secs: Option<i64>,
}

/// Repository for voicemail rows.
pub struct VoicemailRepo {
    pool: PgPool,
}

impl VoicemailRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_call(
        conn: &mut PgConnection,
        app_id: Uuid,
        upstream_call_id: &str,
    ) -> DbResult<Option<DbVoicemail>> {
        let voicemail = sqlx::query_as::<_, DbVoicemail>(
            "SELECT * FROM voicemails WHERE app_id = $1 AND upstream_call_id = $2",
        )
        .bind(app_id)
        .bind(upstream_call_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(voicemail)
    }

    /// Refresh media fields on an existing voicemail.
    pub async fn update_media(
        conn: &mut PgConnection,
        id: Uuid,
        recording_url: Option<&str>,
        transcript: Option<&str>,
        duration_secs: Option<i64>,
    ) -> DbResult<DbVoicemail> {
        let voicemail = sqlx::query_as::<_, DbVoicemail>(
            r#"
            UPDATE voicemails
            SET recording_url = COALESCE($2, recording_url),
                transcript = COALESCE($3, transcript),
                duration_secs = COALESCE($4, duration_secs)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(recording_url)
        .bind(transcript)
        .bind(duration_secs)
        .fetch_one(&mut *conn)
        .await?;
        Ok(voicemail)
    }

    pub async fn insert(conn: &mut PgConnection, new: &NewVoicemail) -> DbResult<DbVoicemail> {
        let voicemail = sqlx::query_as::<_, DbVoicemail>(
            r#"
            INSERT INTO voicemails
                (app_id, upstream_call_id, user_id, from_number, to_number,
                 recording_url, transcript, duration_secs)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(new.app_id)
        .bind(&new.upstream_call_id)
        .bind(&new.user_id)
        .bind(&new.from_number)
        .bind(&new.to_number)
        .bind(&new.recording_url)
        .bind(&new.transcript)
        .bind(new.duration_secs)
        .fetch_one(&mut *conn)
        .await?;
        Ok(voicemail)
    }

    /// Duplicate guard for voicemails that arrive without a call id: an
    /// existing row for the same recipient and caller inside the window is
    /// treated as the same voicemail.
    pub async fn find_recent_orphan(
        conn: &mut PgConnection,
        app_id: Uuid,
        user_id: Option<&str>,
        from_number: Option<&str>,
        window_secs: i64,
    ) -> DbResult<Option<DbVoicemail>> {
        let voicemail = sqlx::query_as::<_, DbVoicemail>(
            r#"
            SELECT * FROM voicemails
            WHERE app_id = $1
              AND upstream_call_id IS NULL
              AND user_id IS NOT DISTINCT FROM $2
              AND from_number IS NOT DISTINCT FROM $3
              AND created_at > NOW() - ($4 * INTERVAL '1 second')
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(app_id)
        .bind(user_id)
        .bind(from_number)
        .bind(window_secs)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(voicemail)
    }

    /// List voicemails for a tenant, newest first.
    pub async fn list(&self, app_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<DbVoicemail>> {
        let voicemails = sqlx::query_as::<_, DbVoicemail>(
            "SELECT * FROM voicemails WHERE app_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(app_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(voicemails)
    }
}
