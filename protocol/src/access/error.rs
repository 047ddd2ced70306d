//! # Access Failure Taxonomy
//!
//! Every way the handshake can fail, in one enum. Oracle faults, catalog
//! faults, and anything unexpected are all mapped into these kinds at the
//! protocol boundary — nothing inside the core leaks an unshaped error to
//! a caller.
//!
//! Nothing here is retried internally. Challenges are single-use, so
//! replaying `verify` with the same id deterministically fails; if a
//! caller wants to retry a transient denial, they start a fresh handshake.

use thiserror::Error;

/// Why an `initiate` or `verify` attempt was denied.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// A required field was missing or empty.
    #[error("missing required field: {0}")]
    MalformedRequest(&'static str),

    /// The wallet signature did not verify.
    #[error("invalid signature")]
    InvalidSignature,

    /// The claimed wallet does not own the token.
    #[error("requester does not own this token")]
    NotOwner,

    /// No content is published under the requested token/contract pair.
    #[error("content not found")]
    ContentNotFound,

    /// The challenge id is unknown, already consumed, or expired. The
    /// three cases are deliberately indistinguishable from outside.
    #[error("invalid or expired challenge")]
    InvalidOrExpiredChallenge,

    /// The supplied response did not match the expected derivation. The
    /// challenge is already consumed by the time this is reported.
    #[error("invalid challenge response")]
    ResponseMismatch,

    /// The ownership oracle could not be consulted. Fail closed.
    #[error("ownership verification unavailable")]
    OracleUnavailable,

    /// The locator issuer could not be consulted.
    #[error("content locator unavailable")]
    LocatorUnavailable,

    /// Anything unexpected. The details go to the log, not the caller.
    #[error("internal failure")]
    Internal,
}

impl AccessError {
    /// Stable snake_case kind, for audit records and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed_request",
            Self::InvalidSignature => "invalid_signature",
            Self::NotOwner => "not_owner",
            Self::ContentNotFound => "content_not_found",
            Self::InvalidOrExpiredChallenge => "invalid_or_expired_challenge",
            Self::ResponseMismatch => "response_mismatch",
            Self::OracleUnavailable => "oracle_unavailable",
            Self::LocatorUnavailable => "locator_unavailable",
            Self::Internal => "internal_failure",
        }
    }

    /// The message callers see. Denials that would fingerprint the
    /// verification stack (which check failed, how, against what) share
    /// deliberately bland phrasing.
    pub fn client_message(&self) -> String {
        match self {
            Self::MalformedRequest(field) => format!("missing required field: {field}"),
            Self::InvalidSignature => "invalid signature".into(),
            Self::NotOwner => "requester does not own this token".into(),
            Self::ContentNotFound => "content not found".into(),
            Self::InvalidOrExpiredChallenge => "invalid or expired challenge".into(),
            Self::ResponseMismatch => "invalid challenge response".into(),
            Self::OracleUnavailable | Self::LocatorUnavailable => {
                "service temporarily unavailable".into()
            }
            Self::Internal => "internal failure".into(),
        }
    }
}
