//! # Content Locators
//!
//! A locator is a time-limited, read-only capability for one object in
//! blob storage — in production, the object store's own presigned URL.
//! The core only needs the [`ContentLocatorIssuer`] trait: hand over an
//! object key and a lifetime, get back a URL that dies on schedule.
//!
//! [`SignedPathIssuer`] is the development stand-in. It mints URLs signed
//! with a BLAKE3 keyed hash over `object_key || expiry`, which a matching
//! gateway (or a test) can validate without any cloud credentials. The
//! shape is the same as the real thing: possession of the URL grants
//! exactly one object, for a bounded window, and nothing else.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::clock::Clock;
use crate::crypto::derivation::constant_time_eq;

/// A minted locator, ready to hand to the caller.
#[derive(Debug, Clone)]
pub struct ContentLocator {
    /// The capability URL.
    pub url: String,
    /// Seconds until the locator stops working.
    pub expires_in: u64,
}

/// Errors the issuer can raise.
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("content locator service unavailable: {0}")]
    Unavailable(String),
}

/// Mints time-limited, read-only locators for opaque object keys.
#[async_trait]
pub trait ContentLocatorIssuer: Send + Sync {
    /// Issue a locator for `object_key` valid for `ttl_secs` seconds.
    async fn issue(&self, object_key: &str, ttl_secs: u64) -> Result<ContentLocator, LocatorError>;
}

/// Issues BLAKE3-signed expiring URLs under a fixed base.
///
/// URL shape: `{base}/{object_key}?exp={unix_secs}&sig={hex}`.
pub struct SignedPathIssuer {
    base_url: String,
    signing_key: [u8; 32],
    clock: Arc<dyn Clock>,
}

impl SignedPathIssuer {
    /// An issuer serving from `base_url`, signing with `signing_key`.
    pub fn new(base_url: impl Into<String>, signing_key: [u8; 32], clock: Arc<dyn Clock>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            signing_key,
            clock,
        }
    }

    fn signature(&self, object_key: &str, expires_at_secs: u64) -> String {
        let payload = format!("{}:{}", object_key, expires_at_secs);
        hex::encode(blake3::keyed_hash(&self.signing_key, payload.as_bytes()).as_bytes())
    }

    /// Check a locator's components: the signature must match and the
    /// expiry must still be in the future. Both failures look the same to
    /// the caller — a dead link.
    pub fn validate(&self, object_key: &str, expires_at_secs: u64, sig: &str) -> bool {
        let expected = self.signature(object_key, expires_at_secs);
        let fresh = self.clock.now_ms() / 1_000 < expires_at_secs;
        constant_time_eq(sig, &expected) && fresh
    }
}

#[async_trait]
impl ContentLocatorIssuer for SignedPathIssuer {
    async fn issue(&self, object_key: &str, ttl_secs: u64) -> Result<ContentLocator, LocatorError> {
        let expires_at_secs = self.clock.now_ms() / 1_000 + ttl_secs;
        let sig = self.signature(object_key, expires_at_secs);
        Ok(ContentLocator {
            url: format!(
                "{}/{}?exp={}&sig={}",
                self.base_url, object_key, expires_at_secs, sig
            ),
            expires_in: ttl_secs,
        })
    }
}
