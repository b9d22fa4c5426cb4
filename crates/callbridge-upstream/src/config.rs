//! Upstream client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Provider environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Sandbox,
    Production,
}

impl Environment {
    /// API base URL for this environment.
    pub fn api_base(&self) -> &'static str {
        match self {
            Environment::Sandbox => "https://sandbox.dialpad.com",
            Environment::Production => "https://dialpad.com",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sandbox" => Some(Environment::Sandbox),
            "production" => Some(Environment::Production),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Sandbox => "sandbox",
            Environment::Production => "production",
        }
    }
}

/// OAuth application settings for one environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    /// Space-separated scope string requested at authorization.
    pub scopes: String,
}

/// Full upstream client configuration.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub environment: Environment,
    pub oauth: OAuthSettings,
    /// Optional shared provider API key; when set it takes precedence over
    /// per-tenant OAuth tokens for outbound calls.
    pub shared_api_key: Option<String>,
    /// Request timeout for every provider call.
    pub request_timeout: Duration,
    /// Refresh the access token when it expires within this window.
    pub token_refresh_window: Duration,
}

impl UpstreamConfig {
    pub fn new(environment: Environment, oauth: OAuthSettings) -> Self {
        Self {
            environment,
            oauth,
            shared_api_key: None,
            request_timeout: Duration::from_secs(10),
            token_refresh_window: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("sandbox"), Some(Environment::Sandbox));
        assert_eq!(Environment::parse("Production"), Some(Environment::Production));
        assert_eq!(Environment::parse("staging"), None);
    }

    #[test]
    fn test_api_base_per_environment() {
        assert!(Environment::Sandbox.api_base().contains("sandbox"));
        assert!(!Environment::Production.api_base().contains("sandbox"));
    }
}
