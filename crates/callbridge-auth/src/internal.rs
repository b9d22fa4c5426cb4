//! Internal admin bearer verification

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Verify the shared bearer secret guarding the provisioning endpoints.
///
/// Both sides are hashed before comparison so the check is constant-time
/// even when lengths differ.
pub fn verify_internal_bearer(configured: &str, presented: &str) -> bool {
    if configured.is_empty() {
        return false;
    }
    let expected = Sha256::digest(configured.as_bytes());
    let got = Sha256::digest(presented.as_bytes());
    expected.ct_eq(&got).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching_secret_accepted() {
        assert!(verify_internal_bearer("admin-secret", "admin-secret"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        assert!(!verify_internal_bearer("admin-secret", "admin-secre"));
        assert!(!verify_internal_bearer("admin-secret", "admin-secret2"));
        assert!(!verify_internal_bearer("admin-secret", ""));
    }

    #[test]
    fn test_empty_configuration_rejects_everything() {
        assert!(!verify_internal_bearer("", ""));
        assert!(!verify_internal_bearer("", "anything"));
    }
}
