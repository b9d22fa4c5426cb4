//! Message repository

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{DbMessage, DbResult};

/// Fields for a message upsert.
#[derive(Debug, Clone, Default)]
pub struct NewMessage {
    pub app_id: Uuid,
    pub upstream_message_id: String,
    pub direction: Option<String>,
    pub from_number: Option<String>,
    pub to_number: Option<String>,
    pub body: Option<String>,
    pub user_id: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Repository for short-message rows. Messages have no state machine, so a
/// single idempotent upsert keyed by the upstream message id suffices.
pub struct MessageRepo {
    pool: PgPool,
}

impl MessageRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert inside the caller's transaction.
    pub async fn upsert(conn: &mut PgConnection, new: &NewMessage) -> DbResult<DbMessage> {
        let message = sqlx::query_as::<_, DbMessage>(
            r#"
            INSERT INTO messages
                (app_id, upstream_message_id, direction, from_number, to_number, body, user_id, sent_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (upstream_message_id) DO UPDATE
            SET direction = COALESCE(EXCLUDED.direction, messages.direction),
                from_number = COALESCE(EXCLUDED.from_number, messages.from_number),
                to_number = COALESCE(EXCLUDED.to_number, messages.to_number),
                body = COALESCE(EXCLUDED.body, messages.body),
                user_id = COALESCE(EXCLUDED.user_id, messages.user_id),
                sent_at = COALESCE(EXCLUDED.sent_at, messages.sent_at)
            RETURNING *
            "#,
        )
        .bind(new.app_id)
        .bind(&new.upstream_message_id)
        .bind(&new.direction)
        .bind(&new.from_number)
        .bind(&new.to_number)
        .bind(&new.body)
        .bind(&new.user_id)
        .bind(new.sent_at)
        .fetch_one(&mut *conn)
        .await?;
        Ok(message)
    }

    /// List messages for a tenant, newest first.
    pub async fn list(&self, app_id: Uuid, limit: i64, offset: i64) -> DbResult<Vec<DbMessage>> {
        let messages = sqlx::query_as::<_, DbMessage>(
            "SELECT * FROM messages WHERE app_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(app_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }
}
