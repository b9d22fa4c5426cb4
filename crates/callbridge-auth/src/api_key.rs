//! API Key Service
//!
//! Tenant API keys are 32 bytes of cryptographic randomness with a visible
//! `raw_` prefix. Storage is two-layered:
//!
//! - an Argon2id hash (salted per key) is the verification authority
//! - a peppered HMAC-SHA256 digest in a unique column gives O(1) candidate
//!   lookup, since adaptive hashes cannot be queried by equality
//!
//! The plaintext leaves this module exactly once, in the issuance response.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, Version,
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::Serialize;
use sha2::Sha256;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use callbridge_db::{Database, DbApp, DbKeyAuditEntry};

type HmacSha256 = Hmac<Sha256>;

/// Visible prefix on every issued key.
pub const KEY_PREFIX: &str = "raw_";

/// Total plaintext length: prefix + 64 hex characters.
const KEY_LEN: usize = KEY_PREFIX.len() + 64;

/// A freshly issued key. The `api_key` field is the only place the
/// plaintext ever appears.
#[derive(Debug, Serialize)]
pub struct IssuedKey {
    pub app_id: Uuid,
    pub api_key: String,
    pub hint: String,
    pub rotated_at: Option<DateTime<Utc>>,
}

/// Current credential status for a tenant.
#[derive(Debug, Serialize)]
pub struct KeyStatus {
    pub app_id: Uuid,
    pub has_active_key: bool,
    pub hint: Option<String>,
    pub rotated_at: Option<DateTime<Utc>>,
}

/// API key service for issuance and verification.
#[derive(Clone)]
pub struct ApiKeyService {
    db: Arc<Database>,
    config: AuthConfig,
}

impl ApiKeyService {
    /// Create a new API key service.
    pub fn new(db: Arc<Database>, config: AuthConfig) -> Self {
        Self { db, config }
    }

    /// Issue a key for an app, rotating any existing one.
    ///
    /// The previous hash is replaced atomically; the old key stops
    /// validating at the instant of commit. An audit entry lands in the
    /// same transaction.
    pub async fn issue(&self, app_id: Uuid) -> AuthResult<IssuedKey> {
        let apps = self.db.app_repo();
        let app = apps
            .find_by_id(app_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("App {} not found", app_id)))?;

        let plaintext = generate_key();
        let hash = hash_key(&plaintext, &self.config)?;
        let lookup = lookup_digest(&self.config.api_key_pepper, &plaintext);
        let hint = key_hint(&plaintext);

        let action = if app.api_key_hash.is_some() {
            "rotated"
        } else {
            "created"
        };

        let app = apps
            .swap_api_key(app_id, Some((&hash, &lookup, &hint)), action)
            .await?;

        info!(app_id = %app_id, action = action, hint = %hint, "API key issued");

        Ok(IssuedKey {
            app_id,
            api_key: plaintext.to_string(),
            hint,
            rotated_at: app.api_key_rotated_at,
        })
    }

    /// Revoke the active key. Authentication fails until a new one is
    /// issued.
    pub async fn revoke(&self, app_id: Uuid) -> AuthResult<()> {
        let apps = self.db.app_repo();
        apps.find_by_id(app_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("App {} not found", app_id)))?;
        apps.swap_api_key(app_id, None, "revoked").await?;
        info!(app_id = %app_id, "API key revoked");
        Ok(())
    }

    /// Verify a presented plaintext key and return its app.
    ///
    /// The lookup digest resolves the single candidate tenant; the Argon2
    /// verify is the authority. Failures are collapsed into one
    /// `Unauthorized` so callers cannot distinguish unknown from wrong keys.
    pub async fn verify(&self, presented: &str) -> AuthResult<DbApp> {
        if !is_well_formed(presented) {
            return Err(AuthError::Unauthorized);
        }

        let lookup = lookup_digest(&self.config.api_key_pepper, presented);
        let app = self
            .db
            .app_repo()
            .find_by_key_lookup(&lookup)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        if !app.is_active {
            return Err(AuthError::Forbidden("App is inactive".to_string()));
        }

        let hash = app.api_key_hash.as_deref().ok_or(AuthError::Unauthorized)?;
        if verify_hash(presented, hash)? {
            Ok(app)
        } else {
            Err(AuthError::Unauthorized)
        }
    }

    /// Report whether the app currently holds an active key.
    pub async fn status(&self, app_id: Uuid) -> AuthResult<KeyStatus> {
        let app = self
            .db
            .app_repo()
            .find_by_id(app_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("App {} not found", app_id)))?;
        Ok(KeyStatus {
            app_id,
            has_active_key: app.api_key_hash.is_some(),
            hint: app.api_key_hint,
            rotated_at: app.api_key_rotated_at,
        })
    }

    /// Paginated audit entries for an app.
    pub async fn audit(
        &self,
        app_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AuthResult<Vec<DbKeyAuditEntry>> {
        self.db
            .app_repo()
            .find_by_id(app_id)
            .await?
            .ok_or_else(|| AuthError::NotFound(format!("App {} not found", app_id)))?;
        Ok(self.db.key_audit_repo().list_by_app(app_id, limit, offset).await?)
    }
}

/// Generate a fresh plaintext key: `raw_` + 64 hex chars of randomness.
pub fn generate_key() -> Zeroizing<String> {
    let mut material = Zeroizing::new([0u8; 32]);
    rand::thread_rng().fill_bytes(&mut material[..]);
    Zeroizing::new(format!("{}{}", KEY_PREFIX, hex::encode(&material[..])))
}

/// Shape check before any crypto work.
fn is_well_formed(key: &str) -> bool {
    key.len() == KEY_LEN
        && key.starts_with(KEY_PREFIX)
        && key[KEY_PREFIX.len()..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Redacted hint: first 8 and last 4 characters.
pub fn key_hint(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() < 12 {
        return "…".to_string();
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}…{tail}")
}

/// Peppered HMAC-SHA256 digest used as the lookup column value.
pub fn lookup_digest(pepper: &str, key: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(pepper.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(key.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Hash a plaintext key with Argon2id for storage.
pub fn hash_key(key: &str, config: &AuthConfig) -> AuthResult<String> {
    let params = Params::new(
        config.argon2_memory_kib,
        config.argon2_iterations,
        config.argon2_parallelism,
        None,
    )
    .map_err(|_| AuthError::Hashing)?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);
    let hash = argon2
        .hash_password(key.as_bytes(), &salt)
        .map_err(|_| AuthError::Hashing)?;
    Ok(hash.to_string())
}

/// Verify a plaintext key against a stored Argon2 hash.
pub fn verify_hash(key: &str, hash: &str) -> AuthResult<bool> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::Hashing)?;
    match Argon2::default().verify_password(key.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(_) => Err(AuthError::Hashing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> AuthConfig {
        // Minimal legal Argon2 parameters keep the tests quick.
        AuthConfig {
            api_key_pepper: "test-pepper".to_string(),
            argon2_memory_kib: 8,
            argon2_iterations: 1,
            argon2_parallelism: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_generated_key_shape() {
        let key = generate_key();
        assert!(key.starts_with(KEY_PREFIX));
        assert_eq!(key.len(), KEY_LEN);
        assert!(key[KEY_PREFIX.len()..].chars().all(|c| c.is_ascii_hexdigit()));
        assert!(is_well_formed(&key));
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let a = generate_key();
        let b = generate_key();
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_well_formed_rejections() {
        assert!(!is_well_formed("raw_short"));
        assert!(!is_well_formed(&format!("key_{}", "a".repeat(64))));
        assert!(!is_well_formed(&format!("raw_{}", "z".repeat(64))));
        assert!(!is_well_formed(""));
    }

    #[test]
    fn test_key_hint_redaction() {
        let key = format!("raw_{}", "a".repeat(64));
        let hint = key_hint(&key);
        assert_eq!(hint, "raw_aaaa…aaaa");
        assert!(hint.len() < key.len());
    }

    #[test]
    fn test_lookup_digest_depends_on_pepper() {
        let key = generate_key();
        let a = lookup_digest("pepper-a", &key);
        let b = lookup_digest("pepper-b", &key);
        assert_ne!(a, b);
        assert_eq!(a, lookup_digest("pepper-a", &key));
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_hash_round_trip() {
        let config = fast_config();
        let key = generate_key();
        let hash = hash_key(&key, &config).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_hash(&key, &hash).unwrap());
        assert!(!verify_hash("raw_wrong", &hash).unwrap());
    }

    #[test]
    fn test_rotation_produces_new_digest() {
        let old_key = generate_key();
        let new_key = generate_key();
        let old_digest = lookup_digest("p", &old_key);
        let new_digest = lookup_digest("p", &new_key);
        assert_ne!(old_digest, new_digest);
    }

    #[test]
    fn test_hash_never_contains_plaintext() {
        let config = fast_config();
        let key = generate_key();
        let hash = hash_key(&key, &config).unwrap();
        assert!(!hash.contains(&key[KEY_PREFIX.len()..]));
    }
}
