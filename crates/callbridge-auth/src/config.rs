//! Credential configuration

use serde::{Deserialize, Serialize};

/// Configuration for the credential manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Server-side pepper for the HMAC lookup digest. A database dump alone
    /// is not enough to resolve a key to a tenant without it.
    pub api_key_pepper: String,
    /// Shared bearer secret guarding the internal provisioning endpoints.
    pub internal_admin_secret: String,
    /// Argon2id memory cost in KiB.
    pub argon2_memory_kib: u32,
    /// Argon2id iteration count.
    pub argon2_iterations: u32,
    /// Argon2id lane count.
    pub argon2_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            api_key_pepper: String::new(),
            internal_admin_secret: String::new(),
            // OWASP second recommended configuration (19 MiB, t=2, p=1).
            argon2_memory_kib: 19 * 1024,
            argon2_iterations: 2,
            argon2_parallelism: 1,
        }
    }
}
