//! Raw event (queue) repository

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{DbRawEvent, DbResult};

/// Repository for the durable webhook queue.
pub struct EventRepo {
    pool: PgPool,
}

impl EventRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append a delivery idempotently.
    ///
    /// Returns `None` when a row with the same upstream event id already
    /// exists; concurrent duplicate deliveries race on the unique index and
    /// exactly one insert wins. Deliveries without an upstream id are always
    /// inserted.
    pub async fn append(
        &self,
        app_id: Option<Uuid>,
        event_type: &str,
        upstream_event_id: Option<&str>,
        payload: &serde_json::Value,
    ) -> DbResult<Option<DbRawEvent>> {
        let event = sqlx::query_as::<_, DbRawEvent>(
            r#"
            INSERT INTO raw_events (app_id, event_type, upstream_event_id, payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (upstream_event_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(app_id)
        .bind(event_type)
        .bind(upstream_event_id)
        .bind(payload)
        .fetch_optional(&self.pool)
        .await?;
        Ok(event)
    }

    /// Lease a batch of pending events inside the caller's transaction.
    ///
    /// `FOR UPDATE SKIP LOCKED` is what makes concurrent dispatchers safe:
    /// a row leased by one worker is invisible to the others until the
    /// transaction ends. Unattributed events (null app id) are never leased.
    pub async fn lease_batch(conn: &mut PgConnection, limit: i64) -> DbResult<Vec<DbRawEvent>> {
        let events = sqlx::query_as::<_, DbRawEvent>(
            r#"
            SELECT * FROM raw_events
            WHERE processed_at IS NULL AND app_id IS NOT NULL
            ORDER BY received_at ASC
            LIMIT $1
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
        Ok(events)
    }

    /// Stamp an event processed inside the caller's transaction.
    pub async fn mark_processed(conn: &mut PgConnection, id: Uuid) -> DbResult<()> {
        sqlx::query("UPDATE raw_events SET processed_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Number of events still waiting for a dispatcher pass.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM raw_events WHERE processed_at IS NULL AND app_id IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbRawEvent>> {
        let event = sqlx::query_as::<_, DbRawEvent>("SELECT * FROM raw_events WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(event)
    }
}
