//! Payload signing.
//!
//! Every delivery carries an HMAC-SHA256 of the exact body bytes, keyed by
//! the subscriber's shared secret, so receivers can verify both origin and
//! integrity before acting on a notification.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "X-Tapestry-Signature";
/// Header carrying the dotted event name.
pub const EVENT_HEADER: &str = "X-Tapestry-Event";
/// Header carrying the unique per-attempt delivery id.
pub const DELIVERY_HEADER: &str = "X-Tapestry-Delivery";

/// Compute the signature header value for a payload body:
/// `sha256=<lowercase hex HMAC>`.
pub fn signature_header(secret: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify a received signature header against a body and secret.
///
/// Comparison is constant-time via the MAC's own verification.
pub fn verify_signature(secret: &str, body: &str, header: &str) -> bool {
    let Some(hex_digest) = header.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body.as_bytes());
    mac.verify_slice(&expected).is_ok()
}
