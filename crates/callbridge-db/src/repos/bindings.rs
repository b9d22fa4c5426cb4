//! Upstream binding repository

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbResult, DbUpstreamBinding};

/// Repository for the one-per-tenant upstream OAuth binding.
pub struct BindingRepo {
    pool: PgPool,
}

impl BindingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace the binding for an app.
    pub async fn upsert(
        &self,
        app_id: Uuid,
        organization_id: &str,
        access_token: &str,
        refresh_token: &str,
        token_expires_at: DateTime<Utc>,
        environment: &str,
    ) -> DbResult<DbUpstreamBinding> {
        let binding = sqlx::query_as::<_, DbUpstreamBinding>(
            r#"
            INSERT INTO upstream_bindings
                (app_id, organization_id, access_token, refresh_token, token_expires_at, environment)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (app_id) DO UPDATE
            SET organization_id = EXCLUDED.organization_id,
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                token_expires_at = EXCLUDED.token_expires_at,
                environment = EXCLUDED.environment,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(app_id)
        .bind(organization_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(token_expires_at)
        .bind(environment)
        .fetch_one(&self.pool)
        .await?;
        Ok(binding)
    }

    /// Resolve a tenant from the upstream organization id.
    pub async fn find_by_organization(
        &self,
        organization_id: &str,
    ) -> DbResult<Option<DbUpstreamBinding>> {
        let binding = sqlx::query_as::<_, DbUpstreamBinding>(
            "SELECT * FROM upstream_bindings WHERE organization_id = $1",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(binding)
    }

    pub async fn find_by_app(&self, app_id: Uuid) -> DbResult<Option<DbUpstreamBinding>> {
        let binding = sqlx::query_as::<_, DbUpstreamBinding>(
            "SELECT * FROM upstream_bindings WHERE app_id = $1",
        )
        .bind(app_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(binding)
    }

    /// Persist refreshed tokens.
    pub async fn update_tokens(
        &self,
        app_id: Uuid,
        access_token: &str,
        refresh_token: &str,
        token_expires_at: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE upstream_bindings
            SET access_token = $2,
                refresh_token = $3,
                token_expires_at = $4,
                updated_at = NOW()
            WHERE app_id = $1
            "#,
        )
        .bind(app_id)
        .bind(access_token)
        .bind(refresh_token)
        .bind(token_expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
