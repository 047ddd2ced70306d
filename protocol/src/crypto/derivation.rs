//! # Challenge Response Derivation
//!
//! The shared computation that turns a disclosed challenge nonce into the
//! response the server expects. Client and server agree on this out of
//! band; at `verify` time the server recomputes it and compares in
//! constant time.
//!
//! ## Why a trait
//!
//! A fixed `hash(nonce + address)` formula is a weak authenticator: it is
//! deterministic, has no rotating material, and is guessable the moment the
//! formula leaks. We don't pretend otherwise. The derivation is therefore a
//! pluggable primitive — deployments supply their own secret (or an entirely
//! different scheme) through configuration, and the access protocol only
//! ever sees the trait. The real anti-replay property lives in single-use
//! challenge consumption, not here.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Computes the expected response for a challenge.
///
/// Implementations must be deterministic: the legitimate client computes
/// the same function locally and submits the result.
pub trait ResponseDerivation: Send + Sync {
    /// Derive the expected response from a challenge nonce and the
    /// subject's wallet address. Returns lowercase hex.
    fn derive(&self, nonce: &str, subject_address: &str) -> String;
}

/// SHA-256 over `nonce || address || secret`, hex-encoded.
///
/// With an empty secret this is the bare derivation legacy reader clients
/// ship with. Deployments should configure a non-empty secret and roll it
/// into their client build.
pub struct SaltedSha256Derivation {
    secret: String,
}

impl SaltedSha256Derivation {
    /// A derivation salted with the given deployment secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// The unsalted legacy derivation. Only appropriate when the client
    /// fleet cannot be updated to carry a secret.
    pub fn unsalted() -> Self {
        Self::new("")
    }
}

impl ResponseDerivation for SaltedSha256Derivation {
    fn derive(&self, nonce: &str, subject_address: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(nonce.as_bytes());
        hasher.update(subject_address.as_bytes());
        hasher.update(self.secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// Constant-time string equality.
///
/// Used for response comparison so that a byte-by-byte early exit doesn't
/// hand an attacker a timing oracle on the expected response. Unequal
/// lengths short-circuit — length is not a secret here, both sides know
/// the derivation produces 64 hex characters.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
