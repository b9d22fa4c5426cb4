//! App (tenant) repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::repos::KeyAuditRepo;
use crate::{DbApp, DbError, DbResult};

/// Repository for tenant rows and their credential columns.
pub struct AppRepo {
    pool: PgPool,
}

impl AppRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new app without credentials; the credential manager issues
    /// the first key immediately afterwards.
    pub async fn create(&self, name: &str) -> DbResult<DbApp> {
        let app = sqlx::query_as::<_, DbApp>(
            r#"
            INSERT INTO apps (name)
            VALUES ($1)
            RETURNING *
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(app)
    }

    pub async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DbApp>> {
        let app = sqlx::query_as::<_, DbApp>("SELECT * FROM apps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(app)
    }

    /// Look up a candidate app by the peppered key digest.
    pub async fn find_by_key_lookup(&self, lookup: &str) -> DbResult<Option<DbApp>> {
        let app = sqlx::query_as::<_, DbApp>("SELECT * FROM apps WHERE api_key_lookup = $1")
            .bind(lookup)
            .fetch_optional(&self.pool)
            .await?;
        Ok(app)
    }

    /// Swap the stored credential material atomically.
    ///
    /// The old hash stops validating at the instant of commit, and the audit
    /// entry lands in the same transaction. Passing `None` for the material
    /// revokes the key.
    pub async fn swap_api_key(
        &self,
        id: Uuid,
        material: Option<(&str, &str, &str)>,
        action: &str,
    ) -> DbResult<DbApp> {
        let mut tx = self.pool.begin().await?;

        let old_hint: Option<Option<String>> = sqlx::query_scalar(
            "SELECT api_key_hint FROM apps WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let old_hint = match old_hint {
            Some(hint) => hint,
            None => return Err(DbError::NotFound(format!("App {} not found", id))),
        };

        let (hash, lookup, hint) = match material {
            Some((hash, lookup, hint)) => (Some(hash), Some(lookup), Some(hint)),
            None => (None, None, None),
        };

        let app = sqlx::query_as::<_, DbApp>(
            r#"
            UPDATE apps
            SET api_key_hash = $2,
                api_key_lookup = $3,
                api_key_hint = $4,
                api_key_rotated_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(hash)
        .bind(lookup)
        .bind(hint)
        .fetch_one(&mut *tx)
        .await?;

        KeyAuditRepo::append(&mut *tx, id, action, old_hint.as_deref(), hint).await?;

        tx.commit().await?;
        Ok(app)
    }
}
