//! # Cryptographic Primitives for LEDGERBOUND
//!
//! Every key that gates content and every challenge response flows through
//! this module. We deliberately chose boring, well-audited cryptography:
//!
//! - **AES-256-GCM** for content envelopes — AEAD done right, with the
//!   tag validated before a single plaintext byte is released.
//! - **SHA-256** for the challenge-response derivation — because that is
//!   what every reader client on the planet can compute.
//! - **BLAKE3** for locator signing — keyed hashing without an HMAC
//!   construction bolted on the side.
//!
//! ## A note on "rolling your own crypto"
//!
//! We don't. Everything here is a thin, type-safe wrapper around audited
//! implementations. The only genuinely custom thing in this module is the
//! envelope *framing* — byte offsets, not math — and it has tests for
//! every byte region.

pub mod derivation;
pub mod envelope;

// Re-export the things people actually need so they don't have to memorize
// our module hierarchy.
pub use derivation::{constant_time_eq, ResponseDerivation, SaltedSha256Derivation};
pub use envelope::{decrypt, encrypt, generate_key, key_from_hex};
