//! Keyed integrity tags for activation codes.
//!
//! Tags are HMAC-SHA256 over the UTF-8 bytes of the encoded payload text,
//! hex encoded and truncated to [`SIGNATURE_HEX_LEN`] characters (64 bits).
//! The truncation is part of the wire format and leaves a far smaller margin
//! than the full digest.

use crate::config::SigningSecret;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Number of hex characters kept from the HMAC digest.
pub const SIGNATURE_HEX_LEN: usize = 16;

/// Signs and verifies encoded payloads with a shared secret.
#[derive(Debug, Clone)]
pub struct SignatureEngine {
    secret: SigningSecret,
}

impl SignatureEngine {
    /// Creates an engine around the given secret.
    #[must_use]
    pub fn new(secret: SigningSecret) -> Self {
        Self { secret }
    }

    /// Computes the truncated hex tag for `payload`.
    #[must_use]
    pub fn sign(&self, payload: &str) -> String {
        // HMAC pads or hashes the key, so no key length is rejected.
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(payload.as_bytes());
        let mut tag = hex::encode(mac.finalize().into_bytes());
        tag.truncate(SIGNATURE_HEX_LEN);
        tag
    }

    /// Checks `tag` against `payload` in constant time.
    #[must_use]
    pub fn verify(&self, payload: &str, tag: &str) -> bool {
        let expected = self.sign(payload);
        let expected = expected.as_bytes();
        let provided = tag.as_bytes();
        if provided.len() != expected.len() {
            return false;
        }
        provided.ct_eq(expected).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(secret: &str) -> SignatureEngine {
        SignatureEngine::new(SigningSecret::new(secret).unwrap())
    }

    #[test]
    fn tag_is_truncated_lowercase_hex() {
        let tag = engine("secret").sign("payload");
        assert_eq!(tag.len(), SIGNATURE_HEX_LEN);
        assert!(tag.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn matches_known_hmac_prefix() {
        // RFC 4231 test case 2.
        let tag = engine("Jefe").sign("what do ya want for nothing?");
        assert_eq!(tag, "5bdcc146bf60754e");
    }

    #[test]
    fn deterministic() {
        let e = engine("secret");
        assert_eq!(e.sign("abc"), e.sign("abc"));
    }

    #[test]
    fn verify_accepts_own_tag() {
        let e = engine("secret");
        let tag = e.sign("payload");
        assert!(e.verify("payload", &tag));
    }

    #[test]
    fn verify_rejects_other_secret() {
        let tag = engine("secret").sign("payload");
        assert!(!engine("other").verify("payload", &tag));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let e = engine("secret");
        let tag = e.sign("payload");
        assert!(!e.verify("paylaod", &tag));
    }

    #[test]
    fn verify_rejects_wrong_length() {
        let e = engine("secret");
        let tag = e.sign("payload");
        assert!(!e.verify("payload", &tag[..10]));
        assert!(!e.verify("payload", &format!("{tag}00")));
        assert!(!e.verify("payload", ""));
    }
}
