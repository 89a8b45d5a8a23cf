//! Shopify webhook verification.
//!
//! Shopify signs each delivery with HMAC-SHA256 over the raw body, keyed
//! by the app's webhook secret, and sends it base64-encoded in
//! `X-Shopify-Hmac-Sha256`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const HMAC_HEADER: &str = "x-shopify-hmac-sha256";
pub const TOPIC_HEADER: &str = "x-shopify-topic";

/// Check a webhook signature in constant time.
#[must_use]
pub fn verify_webhook(secret: &[u8], body: &[u8], signature_b64: &str) -> bool {
    let Ok(signature) = STANDARD.decode(signature_b64.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&signature).is_ok()
}

/// Sign a body the way Shopify does.
#[must_use]
pub fn sign_webhook(secret: &[u8], body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(body);
    Some(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Whether a topic changes catalog data the sync imports.
#[must_use]
pub fn is_catalog_topic(topic: &str) -> bool {
    let topic = topic.trim().to_ascii_lowercase();
    topic.starts_with("products/") || topic.starts_with("collections/")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"whsec_8f2kLm9Qx";

    #[test]
    fn test_signature_round_trip() {
        let body = br#"{"id":7,"handle":"chelsea-boot"}"#;
        let signature = sign_webhook(SECRET, body).unwrap();
        assert!(verify_webhook(SECRET, body, &signature));
    }

    #[test]
    fn test_tampered_body_rejected() {
        let signature = sign_webhook(SECRET, b"{\"id\":7}").unwrap();
        assert!(!verify_webhook(SECRET, b"{\"id\":8}", &signature));
        assert!(!verify_webhook(b"other", b"{\"id\":7}", &signature));
    }

    #[test]
    fn test_malformed_signature_rejected() {
        assert!(!verify_webhook(SECRET, b"{}", "not base64!"));
        assert!(!verify_webhook(SECRET, b"{}", ""));
    }

    #[test]
    fn test_catalog_topics() {
        assert!(is_catalog_topic("products/update"));
        assert!(is_catalog_topic("PRODUCTS/DELETE"));
        assert!(is_catalog_topic("collections/create"));
        assert!(!is_catalog_topic("orders/create"));
        assert!(!is_catalog_topic("app/uninstalled"));
    }
}
