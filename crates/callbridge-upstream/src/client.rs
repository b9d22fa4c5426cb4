//! Provider HTTP client

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use callbridge_db::{Database, DbUpstreamBinding};

use crate::config::UpstreamConfig;
use crate::error::{UpstreamError, UpstreamResult};

/// Token grant response from the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
}

impl TokenResponse {
    /// Absolute expiry computed from now.
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc::now() + ChronoDuration::seconds(self.expires_in)
    }
}

/// A webhook subscription created with the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamWebhook {
    pub id: String,
    #[serde(default)]
    pub hook_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CreateWebhookRequest<'a> {
    hook_url: &'a str,
    secret: &'a str,
}

/// Client for the provider's OAuth and webhook APIs.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    db: Arc<Database>,
    config: UpstreamConfig,
}

impl UpstreamClient {
    pub fn new(db: Arc<Database>, config: UpstreamConfig) -> UpstreamResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, db, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.environment.api_base(), path)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> UpstreamResult<TokenResponse> {
        let request = TokenRequest {
            grant_type: "authorization_code",
            client_id: &self.config.oauth.client_id,
            client_secret: &self.config.oauth.client_secret,
            code: Some(code),
            redirect_uri: Some(&self.config.oauth.redirect_url),
            refresh_token: None,
        };
        self.token_request(&request).await
    }

    /// Redeem a refresh token for a fresh access token.
    pub async fn refresh(&self, refresh_token: &str) -> UpstreamResult<TokenResponse> {
        let request = TokenRequest {
            grant_type: "refresh_token",
            client_id: &self.config.oauth.client_id,
            client_secret: &self.config.oauth.client_secret,
            code: None,
            redirect_uri: None,
            refresh_token: Some(refresh_token),
        };
        self.token_request(&request).await
    }

    async fn token_request(&self, request: &TokenRequest<'_>) -> UpstreamResult<TokenResponse> {
        let response = self
            .http
            .post(self.url("/oauth2/token"))
            .form(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }

    /// Return a valid access token for the binding, refreshing transparently
    /// when the stored token is inside the refresh window. Refreshed tokens
    /// are persisted before being returned.
    pub async fn ensure_fresh_token(
        &self,
        binding: &DbUpstreamBinding,
    ) -> UpstreamResult<String> {
        if let Some(shared) = &self.config.shared_api_key {
            return Ok(shared.clone());
        }

        let window = ChronoDuration::from_std(self.config.token_refresh_window)
            .unwrap_or_else(|_| ChronoDuration::seconds(300));
        if binding.token_expires_at > Utc::now() + window {
            return Ok(binding.access_token.clone());
        }

        info!(app_id = %binding.app_id, "Access token near expiry; refreshing");
        let tokens = self.refresh(&binding.refresh_token).await.map_err(|e| {
            warn!(app_id = %binding.app_id, error = %e, "Token refresh failed");
            UpstreamError::RefreshFailed(e.to_string())
        })?;

        self.db
            .binding_repo()
            .update_tokens(
                binding.app_id,
                &tokens.access_token,
                &tokens.refresh_token,
                tokens.expires_at(),
            )
            .await?;

        Ok(tokens.access_token)
    }

    /// Create a webhook subscription with the provider.
    pub async fn create_webhook(
        &self,
        access_token: &str,
        delivery_url: &str,
        signing_secret: &str,
    ) -> UpstreamResult<UpstreamWebhook> {
        let request = CreateWebhookRequest {
            hook_url: delivery_url,
            secret: signing_secret,
        };
        let response = self
            .http
            .post(self.url("/api/v2/webhooks"))
            .bearer_auth(access_token)
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Provider {
                status: status.as_u16(),
                body,
            });
        }
        let webhook: UpstreamWebhook = response.json().await?;
        info!(webhook_id = %webhook.id, "Webhook registered with provider");
        Ok(webhook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry_is_in_future() {
        let response = TokenResponse {
            access_token: "at".to_string(),
            refresh_token: "rt".to_string(),
            expires_in: 3600,
        };
        let expires = response.expires_at();
        let delta = expires - Utc::now();
        assert!(delta.num_seconds() > 3500 && delta.num_seconds() <= 3600);
    }

    #[test]
    fn test_webhook_response_decodes() {
        let webhook: UpstreamWebhook = serde_json::from_str(
            r#"{"id": "wh-123", "hook_url": "https://broker.example/webhooks/telephony"}"#,
        )
        .unwrap();
        assert_eq!(webhook.id, "wh-123");
    }

    #[test]
    fn test_webhook_numeric_id_rejected_as_string() {
        // Provider ids for webhooks arrive as strings; a bare number is a
        // decode error rather than a silent coercion.
        let result = serde_json::from_str::<UpstreamWebhook>(r#"{"id": 7}"#);
        assert!(result.is_err());
    }
}
