//! Webhook registration repository

use sqlx::PgPool;
use uuid::Uuid;

use crate::{DbResult, DbWebhookRegistration};

/// Fields for recording a webhook registration made with the upstream.
#[derive(Debug, Clone)]
pub struct NewRegistration {
    pub app_id: Uuid,
    pub upstream_webhook_id: String,
    pub delivery_url: String,
    pub signing_secret: String,
    pub signature_algorithm: String,
    pub signature_header: String,
}

/// Repository for webhook registrations.
pub struct RegistrationRepo {
    pool: PgPool,
}

impl RegistrationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a registration, replacing any previous record of the same
    /// upstream webhook id.
    pub async fn upsert(&self, new: &NewRegistration) -> DbResult<DbWebhookRegistration> {
        let registration = sqlx::query_as::<_, DbWebhookRegistration>(
            r#"
            INSERT INTO webhook_registrations
                (app_id, upstream_webhook_id, delivery_url, signing_secret,
                 signature_algorithm, signature_header)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (upstream_webhook_id) DO UPDATE
            SET delivery_url = EXCLUDED.delivery_url,
                signing_secret = EXCLUDED.signing_secret,
                signature_algorithm = EXCLUDED.signature_algorithm,
                signature_header = EXCLUDED.signature_header
            RETURNING *
            "#,
        )
        .bind(new.app_id)
        .bind(&new.upstream_webhook_id)
        .bind(&new.delivery_url)
        .bind(&new.signing_secret)
        .bind(&new.signature_algorithm)
        .bind(&new.signature_header)
        .fetch_one(&self.pool)
        .await?;
        Ok(registration)
    }

    pub async fn list_by_app(&self, app_id: Uuid) -> DbResult<Vec<DbWebhookRegistration>> {
        let registrations = sqlx::query_as::<_, DbWebhookRegistration>(
            "SELECT * FROM webhook_registrations WHERE app_id = $1 ORDER BY created_at DESC",
        )
        .bind(app_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(registrations)
    }
}
