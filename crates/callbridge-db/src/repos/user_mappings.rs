//! User mapping repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbResult, DbUserMapping};

/// Repository for tenant-defined CRM user mappings.
pub struct UserMappingRepo {
    pool: PgPool,
}

impl UserMappingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert a mapping from an upstream user id to a CRM user id.
    pub async fn upsert(
        &self,
        app_id: Uuid,
        upstream_user_id: &str,
        crm_user_id: &str,
    ) -> DbResult<DbUserMapping> {
        let mapping = sqlx::query_as::<_, DbUserMapping>(
            r#"
            INSERT INTO user_mappings (app_id, upstream_user_id, crm_user_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (app_id, upstream_user_id) DO UPDATE
            SET crm_user_id = EXCLUDED.crm_user_id,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(app_id)
        .bind(upstream_user_id)
        .bind(crm_user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(mapping)
    }

    /// Resolve the CRM user id for an upstream user, if mapped.
    pub async fn resolve(
        &self,
        app_id: Uuid,
        upstream_user_id: &str,
    ) -> DbResult<Option<String>> {
        let crm_user_id: Option<String> = sqlx::query_scalar(
            "SELECT crm_user_id FROM user_mappings WHERE app_id = $1 AND upstream_user_id = $2",
        )
        .bind(app_id)
        .bind(upstream_user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(crm_user_id)
    }

    pub async fn list_by_app(&self, app_id: Uuid) -> DbResult<Vec<DbUserMapping>> {
        let mappings = sqlx::query_as::<_, DbUserMapping>(
            "SELECT * FROM user_mappings WHERE app_id = $1 ORDER BY upstream_user_id",
        )
        .bind(app_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(mappings)
    }
}
