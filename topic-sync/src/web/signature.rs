//! Discourse webhook signature verification.
//!
//! Discourse signs every webhook delivery with HMAC-SHA256 over the raw
//! request body and sends the hex digest in `X-Discourse-Event-Signature`,
//! prefixed with `sha256=`.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::sync::SyncConfig;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a Discourse webhook signature against the configured secret.
///
/// # Arguments
///
/// * `body` - The raw, unparsed request body
/// * `header_signature` - The `X-Discourse-Event-Signature` header value, if any
/// * `config` - Sync settings holding the shared secret and the enabled flag
///
/// # Returns
///
/// `true` only when the webhook feature is enabled, a secret is configured,
/// and the header carries the HMAC-SHA256 digest of `body`.
pub fn verify_signature(body: &[u8], header_signature: Option<&str>, config: &SyncConfig) -> bool {
    if !config.webhook_enabled {
        warn!("discourse_webhook_disabled");
        return false;
    }

    if !is_signature_verification_enabled(&config.webhook_secret) {
        warn!("discourse_webhook_secret_missing");
        return false;
    }
    let secret = config.webhook_secret.as_deref().unwrap_or_default();

    let provided = match header_signature.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s,
        None => {
            warn!("discourse_signature_missing");
            return false;
        }
    };

    let digest_hex = provided.strip_prefix(SIGNATURE_PREFIX).unwrap_or(provided);
    let digest = match hex::decode(digest_hex) {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "discourse_signature_not_hex");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("discourse_signature_invalid_key");
            return false;
        }
    };
    mac.update(body);

    // verify_slice compares in constant time and rejects length mismatches
    let valid = mac.verify_slice(&digest).is_ok();

    if !valid {
        warn!(
            body_length = body.len(),
            signature_length = digest.len(),
            "discourse_signature_mismatch"
        );
    }

    valid
}

/// Compute the header value Discourse would send for `body`.
pub fn sign_body(body: &[u8], secret: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Check if a usable webhook secret is configured.
pub fn is_signature_verification_enabled(secret: &Option<String>) -> bool {
    secret
        .as_ref()
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "1234567891011";

    fn enabled(secret: &str) -> SyncConfig {
        SyncConfig {
            webhook_secret: Some(secret.to_string()),
            webhook_enabled: true,
            match_old_topics: false,
        }
    }

    #[test]
    fn test_verify_signature_valid() {
        let body = br#"{"post":{"topic_id":1}}"#;
        let signature = sign_body(body, SECRET).unwrap();

        assert!(signature.starts_with("sha256="));
        assert!(verify_signature(body, Some(&signature), &enabled(SECRET)));
    }

    #[test]
    fn test_verify_signature_without_prefix() {
        let body = b"payload";
        let signature = sign_body(body, SECRET).unwrap();
        let bare = signature.trim_start_matches("sha256=");

        assert!(verify_signature(body, Some(bare), &enabled(SECRET)));
    }

    #[test]
    fn test_verify_signature_tampered_body() {
        let signature = sign_body(br#"{"post":{"topic_id":1}}"#, SECRET).unwrap();

        assert!(!verify_signature(
            br#"{"post":{"topic_id":2}}"#,
            Some(&signature),
            &enabled(SECRET)
        ));
    }

    #[test]
    fn test_verify_signature_wrong_secret() {
        let body = b"payload";
        let signature = sign_body(body, SECRET).unwrap();

        assert!(!verify_signature(
            body,
            Some(&signature),
            &enabled("123456789101112")
        ));
    }

    #[test]
    fn test_verify_signature_disabled() {
        let body = b"payload";
        let signature = sign_body(body, SECRET).unwrap();
        let config = SyncConfig {
            webhook_enabled: false,
            ..enabled(SECRET)
        };

        assert!(!verify_signature(body, Some(&signature), &config));
    }

    #[test]
    fn test_verify_signature_missing_secret() {
        let body = b"payload";
        let signature = sign_body(body, "").unwrap();

        for secret in [None, Some(String::new()), Some("  ".to_string())] {
            let config = SyncConfig {
                webhook_secret: secret,
                ..enabled(SECRET)
            };
            assert!(!verify_signature(body, Some(&signature), &config));
        }
    }

    #[test]
    fn test_verify_signature_malformed_header() {
        let body = b"payload";
        let config = enabled(SECRET);

        assert!(!verify_signature(body, None, &config));
        assert!(!verify_signature(body, Some(""), &config));
        assert!(!verify_signature(body, Some("sha256=not-hex"), &config));
        assert!(!verify_signature(body, Some("sha256=abcd"), &config));
    }

    #[test]
    fn test_is_signature_verification_enabled() {
        assert!(!is_signature_verification_enabled(&None));
        assert!(!is_signature_verification_enabled(&Some("".to_string())));
        assert!(!is_signature_verification_enabled(&Some("   ".to_string())));
        assert!(is_signature_verification_enabled(&Some(
            "key123".to_string()
        )));
    }
}
