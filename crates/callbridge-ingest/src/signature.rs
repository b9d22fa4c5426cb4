//! Webhook signature verification
//!
//! The upstream signs each delivery as base64(HMAC-SHA256(raw body, shared
//! secret)). The verifier sees the body as bytes before any parsing; a
//! reparse-and-reserialize path would invalidate signatures and is forbidden.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Compute the expected signature for a body under a secret.
pub fn compute_signature(body: &[u8], secret: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    BASE64.encode(mac.finalize().into_bytes())
}

/// Verify a presented signature in constant time.
pub fn verify_signature(body: &[u8], presented: &str, secret: &str) -> bool {
    let expected = compute_signature(body, secret);
    expected.as_bytes().ct_eq(presented.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vector_round_trip() {
        let body = br#"{"event_type":"call.ring","call":{"id":9999}}"#;
        let signature = compute_signature(body, "S");
        assert!(verify_signature(body, &signature, "S"));
    }

    #[test]
    fn test_body_mutation_rejected() {
        let body = b"payload-bytes";
        let signature = compute_signature(body, "secret");
        assert!(!verify_signature(b"payload-byteS", &signature, "secret"));
    }

    #[test]
    fn test_secret_mutation_rejected() {
        let body = b"payload-bytes";
        let signature = compute_signature(body, "secret");
        assert!(!verify_signature(body, &signature, "Secret"));
    }

    #[test]
    fn test_signature_mutation_rejected() {
        let body = b"payload-bytes";
        let mut signature = compute_signature(body, "secret").into_bytes();
        // Flip one bit of the base64 text.
        signature[0] ^= 0x01;
        let mutated = String::from_utf8(signature).unwrap();
        assert!(!verify_signature(body, &mutated, "secret"));
    }

    #[test]
    fn test_empty_signature_rejected() {
        assert!(!verify_signature(b"body", "", "secret"));
    }

    #[test]
    fn test_signature_is_base64() {
        let signature = compute_signature(b"body", "secret");
        assert!(BASE64.decode(&signature).is_ok());
    }
}
