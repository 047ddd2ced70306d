//! # Protocol Configuration & Constants
//!
//! Every magic number in LEDGERBOUND lives here. If you're hardcoding a
//! constant somewhere else, you're doing it wrong and you owe the team
//! coffee.
//!
//! Most of these values are load-bearing: the envelope frame sizes are a
//! wire format, and the challenge TTL is a security parameter. Changing
//! them after content has been published is somewhere between "painful"
//! and "every reader re-downloads their library", so choose wisely.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// Protocol fingerprint for identification in logs and status endpoints.
pub const PROTOCOL_FINGERPRINT: &str = "ALAS-LEDGERBOUND-2026";

/// The full version string, assembled at compile time so we don't allocate
/// for something this trivial at runtime.
pub const PROTOCOL_VERSION: &str = "0.1.0";

// ---------------------------------------------------------------------------
// Envelope Parameters
// ---------------------------------------------------------------------------

/// AES-256-GCM for content encryption. 256-bit keys, 128-bit IVs, 128-bit
/// authentication tags. Authentication and encryption in one primitive —
/// no encrypt-then-MAC debates at standup.
pub const ENVELOPE_ALGORITHM: &str = "AES-256-GCM";

/// Content encryption key length in bytes.
pub const ENVELOPE_KEY_LENGTH: usize = 32;

/// Envelope IV length in bytes. 16, not the GCM-default 12 — the envelope
/// format predates us and every published blob already carries a 16-byte IV.
/// GCM handles non-96-bit nonces by GHASHing them down internally.
pub const ENVELOPE_IV_LENGTH: usize = 16;

/// GCM authentication tag length in bytes.
pub const ENVELOPE_TAG_LENGTH: usize = 16;

/// Minimum size of a well-formed envelope: IV + tag, zero ciphertext.
/// Anything shorter is rejected before we touch the cipher.
pub const ENVELOPE_MIN_LENGTH: usize = ENVELOPE_IV_LENGTH + ENVELOPE_TAG_LENGTH;

// ---------------------------------------------------------------------------
// Challenge Parameters
// ---------------------------------------------------------------------------

/// Challenge nonce length in bytes. 256 bits of CSPRNG output, disclosed
/// to the caller on purpose — the anti-replay guarantee lives in challenge
/// consumption, not in nonce secrecy.
pub const CHALLENGE_NONCE_LENGTH: usize = 32;

/// How long a minted challenge stays valid. Five minutes is generous for
/// a client that computes one hash; it is not generous for an attacker
/// shopping a captured challenge id around.
pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(300);

/// How often the registry sweeps expired challenges. Expired entries are
/// also reaped lazily on `create`, so this bounds reclamation latency,
/// not correctness.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Upper bound on simultaneously pending challenges. Sustained `initiate`
/// traffic with no matching `verify` hits this wall instead of eating the
/// host's memory.
pub const MAX_PENDING_CHALLENGES: usize = 100_000;

// ---------------------------------------------------------------------------
// Grant Parameters
// ---------------------------------------------------------------------------

/// Lifetime of an issued content locator, in seconds. One hour matches the
/// exposure window of the object store's own presigned URLs.
pub const DEFAULT_LOCATOR_TTL_SECS: u64 = 3_600;

/// Upper bound on a single oracle round-trip. A ledger that takes longer
/// than this to answer is treated as unreachable, and unreachable means
/// "not owner".
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on minting a content locator.
pub const DEFAULT_LOCATOR_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on a catalog lookup.
pub const DEFAULT_CATALOG_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Network Parameters
// ---------------------------------------------------------------------------

/// Default HTTP API port.
pub const DEFAULT_RPC_PORT: u16 = 9760;

/// Default metrics (Prometheus) port.
pub const DEFAULT_METRICS_PORT: u16 = 9761;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_frame_sizes_are_consistent() {
        // The minimum frame must hold exactly one IV and one tag. If this
        // breaks, every published envelope on the object store breaks with it.
        assert_eq!(ENVELOPE_MIN_LENGTH, ENVELOPE_IV_LENGTH + ENVELOPE_TAG_LENGTH);
        assert_eq!(ENVELOPE_KEY_LENGTH, 32);
        assert_eq!(ENVELOPE_IV_LENGTH, 16);
        assert_eq!(ENVELOPE_TAG_LENGTH, 16);
    }

    #[test]
    fn challenge_parameters_sanity() {
        assert_eq!(CHALLENGE_NONCE_LENGTH, 32);
        // A sweep interval longer than the TTL would let expired entries
        // outlive their own lifetime several times over.
        assert!(DEFAULT_SWEEP_INTERVAL <= DEFAULT_CHALLENGE_TTL);
        assert!(MAX_PENDING_CHALLENGES > 0);
    }

    #[test]
    fn timeout_parameters_sanity() {
        // All collaborator calls must be bounded; a zero timeout would turn
        // every request into an instant denial.
        assert!(DEFAULT_ORACLE_TIMEOUT.as_millis() > 0);
        assert!(DEFAULT_LOCATOR_TIMEOUT.as_millis() > 0);
        assert!(DEFAULT_CATALOG_TIMEOUT.as_millis() > 0);
    }

    #[test]
    fn locator_ttl_is_an_hour() {
        assert_eq!(DEFAULT_LOCATOR_TTL_SECS, 3_600);
    }

    #[test]
    fn fingerprint_format() {
        assert!(!PROTOCOL_FINGERPRINT.is_empty());
        assert!(PROTOCOL_FINGERPRINT.contains("LEDGERBOUND"));
    }
}
