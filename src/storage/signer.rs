//! HMAC-signed URLs for the local storage backends.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::encode_object_path;

type HmacSha256 = Hmac<Sha256>;

/// Issues and verifies `/signed/<path>?expires=..&signature=..` URLs.
///
/// The signature covers the object path and the expiry timestamp, so a URL
/// cannot be retargeted at another object or have its lifetime extended.
#[derive(Clone)]
pub struct UrlSigner {
    key: Vec<u8>,
    base_url: String,
}

impl UrlSigner {
    /// Create a signer with the given secret and externally visible base URL.
    pub fn new(secret: &str, base_url: &str) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn mac(&self, path: &str, expires: i64) -> HmacSha256 {
        // HMAC accepts keys of any length.
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC accepts any key length");
        mac.update(path.as_bytes());
        mac.update(b"\n");
        mac.update(expires.to_string().as_bytes());
        mac
    }

    /// Hex signature for `path` expiring at `expires` (unix seconds).
    pub fn signature(&self, path: &str, expires: i64) -> String {
        hex::encode(self.mac(path, expires).finalize().into_bytes())
    }

    /// Build a URL for `path` valid for `ttl_secs` from `now` (unix seconds).
    pub fn sign_at(&self, path: &str, ttl_secs: u64, now: i64) -> String {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let expires = now.saturating_add(ttl);
        format!(
            "{}/signed/{}?expires={}&signature={}",
            self.base_url,
            encode_object_path(path),
            expires,
            self.signature(path, expires)
        )
    }

    /// Build a URL for `path` valid for `ttl_secs` from now.
    pub fn sign(&self, path: &str, ttl_secs: u64) -> String {
        self.sign_at(path, ttl_secs, chrono::Utc::now().timestamp())
    }

    /// Check a signature at time `now`.
    pub fn verify_at(&self, path: &str, expires: i64, signature: &str, now: i64) -> bool {
        if expires < now {
            return false;
        }
        let Ok(raw) = hex::decode(signature) else {
            return false;
        };
        self.mac(path, expires).verify_slice(&raw).is_ok()
    }

    /// Check a signature against the current time.
    pub fn verify(&self, path: &str, expires: i64, signature: &str) -> bool {
        self.verify_at(path, expires, signature, chrono::Utc::now().timestamp())
    }
}

impl std::fmt::Debug for UrlSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UrlSigner")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
