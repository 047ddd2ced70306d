//! # Access Module — The Challenge-Response Handshake
//!
//! This module is the reason the repository exists. It converts "I hold
//! this wallet and this wallet holds this token" into a single-use grant
//! of (decryption key, expiring content locator), and makes sure that
//! conversion can happen exactly once per challenge no matter how many
//! requests race for it.
//!
//! Two pieces:
//!
//! - [`challenge`] — the registry of short-lived challenge tokens.
//!   Creation, atomic consumption, expiry, sweeping. The one piece of
//!   shared mutable state in the protocol.
//! - [`protocol`] — the two-phase `initiate`/`verify` state machine that
//!   orchestrates the oracle, the registry, the catalog, the locator
//!   issuer, and the audit sink.
//!
//! The failure taxonomy both halves speak lives in [`error`].

pub mod challenge;
pub mod error;
pub mod protocol;

pub use challenge::{Challenge, ChallengeRegistry, ChallengeState, RegistryConfig};
pub use error::AccessError;
pub use protocol::{
    AccessConfig, AccessGrant, AccessProtocol, InitiateRequest, InitiateResponse, VerifyRequest,
};
