//! Webhook signature verification using HMAC-SHA256.
//!
//! GitHub signs each delivery with the shared webhook secret and sends the
//! result in the `X-Hub-Signature-256` header as `sha256=<hex>`. Deliveries
//! are verified against the raw body before anything parses it.

use std::fmt;

use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Why a signature header was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// Not of the form `sha256=<hex>`.
    #[error("signature header is not of the form sha256=<hex>")]
    Malformed,

    /// Well-formed, but not the signature of this payload.
    #[error("signature does not match the payload")]
    Mismatch,
}

/// The shared secret webhook deliveries are signed with.
#[derive(Clone)]
pub struct WebhookSecret {
    mac: HmacSha256,
}

impl WebhookSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, InvalidLength> {
        Ok(WebhookSecret {
            mac: HmacSha256::new_from_slice(secret.as_ref())?,
        })
    }

    /// Returns the `X-Hub-Signature-256` header value for `payload`.
    pub fn sign(&self, payload: &[u8]) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Checks `header` against `payload` in constant time.
    ///
    /// # Examples
    ///
    /// ```
    /// use review_helper::webhooks::{SignatureError, WebhookSecret};
    ///
    /// let secret = WebhookSecret::new("my-secret-key").unwrap();
    /// let header = secret.sign(b"Hello, World!");
    ///
    /// assert_eq!(secret.verify(b"Hello, World!", &header), Ok(()));
    /// assert_eq!(
    ///     WebhookSecret::new("wrong").unwrap().verify(b"Hello, World!", &header),
    ///     Err(SignatureError::Mismatch)
    /// );
    /// assert_eq!(
    ///     secret.verify(b"Hello, World!", "sha1=abcd"),
    ///     Err(SignatureError::Malformed)
    /// );
    /// ```
    pub fn verify(&self, payload: &[u8], header: &str) -> Result<(), SignatureError> {
        let expected = header
            .strip_prefix("sha256=")
            .and_then(|hex_sig| hex::decode(hex_sig).ok())
            .ok_or(SignatureError::Malformed)?;

        let mut mac = self.mac.clone();
        mac.update(payload);
        mac.verify_slice(&expected)
            .map_err(|_| SignatureError::Mismatch)
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(..)")
    }
}
