//! CSRF tokens for linkboard forms.
//!
//! A token is `base64url(HMAC-SHA256(secret, subject, action, issued)) ":" issued`
//! where `issued` is a millisecond timestamp. Tokens are not stored: they are
//! recomputed and compared on validation.

use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::{ForumError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime (24 hours).
pub const DEFAULT_CSRF_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Generates and checks CSRF tokens.
#[derive(Clone)]
pub struct CsrfGenerator {
    mac: HmacSha256,
    ttl: Duration,
}

impl CsrfGenerator {
    /// Create a generator keyed with `secret`.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ForumError::Config(format!("invalid csrf secret: {e}")))?;
        Ok(Self { mac, ttl })
    }

    /// Token lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Generate a token for `(subject, action)` issued now.
    pub fn generate(&self, subject: &str, action: &str) -> String {
        self.generate_at(subject, action, now_millis())
    }

    /// Generate a token issued at `issued_ms`.
    pub fn generate_at(&self, subject: &str, action: &str, issued_ms: i64) -> String {
        let signature = self.sign(subject, action, issued_ms).finalize().into_bytes();
        format!("{}:{}", URL_SAFE_NO_PAD.encode(signature), issued_ms)
    }

    /// Check a token against `(subject, action)` now.
    pub fn valid(&self, token: &str, subject: &str, action: &str) -> bool {
        self.valid_at(token, subject, action, now_millis())
    }

    /// Check a token at the clock value `now_ms`.
    pub fn valid_at(&self, token: &str, subject: &str, action: &str, now_ms: i64) -> bool {
        let Some((encoded, issued)) = token.rsplit_once(':') else {
            return false;
        };
        let Ok(issued_ms) = issued.parse::<i64>() else {
            return false;
        };
        // The timestamp is client-supplied; an overflowing age is never valid.
        let Some(age_ms) = now_ms.checked_sub(issued_ms).filter(|age| *age >= 0) else {
            return false;
        };
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        if age_ms > ttl_ms {
            return false;
        }
        let Ok(signature) = URL_SAFE_NO_PAD.decode(encoded) else {
            return false;
        };

        self.sign(subject, action, issued_ms)
            .verify_slice(&signature)
            .is_ok()
    }

    fn sign(&self, subject: &str, action: &str, issued_ms: i64) -> HmacSha256 {
        let mut mac = self.mac.clone();
        mac.update(subject.as_bytes());
        mac.update(&[0]);
        mac.update(action.as_bytes());
        mac.update(&[0]);
        mac.update(issued_ms.to_string().as_bytes());
        mac
    }
}

impl std::fmt::Debug for CsrfGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsrfGenerator")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
