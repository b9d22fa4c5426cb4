//! Credential audit repository

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{DbKeyAuditEntry, DbResult};

/// Append-only log of credential actions.
pub struct KeyAuditRepo {
    pool: PgPool,
}

impl KeyAuditRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Append an entry inside the caller's transaction, so credential swaps
    /// and their audit records commit together.
    pub async fn append(
        conn: &mut PgConnection,
        app_id: Uuid,
        action: &str,
        old_key_hint: Option<&str>,
        new_key_hint: Option<&str>,
    ) -> DbResult<DbKeyAuditEntry> {
        let entry = sqlx::query_as::<_, DbKeyAuditEntry>(
            r#"
            INSERT INTO api_key_audit (app_id, action, old_key_hint, new_key_hint)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(app_id)
        .bind(action)
        .bind(old_key_hint)
        .bind(new_key_hint)
        .fetch_one(&mut *conn)
        .await?;
        Ok(entry)
    }

    pub async fn list_by_app(
        &self,
        app_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> DbResult<Vec<DbKeyAuditEntry>> {
        let entries = sqlx::query_as::<_, DbKeyAuditEntry>(
            "SELECT * FROM api_key_audit WHERE app_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(app_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
