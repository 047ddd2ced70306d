//! # The Two-Phase Access Protocol
//!
//! `initiate` → `verify`, and nothing else. The state machine is small on
//! purpose; the care went into the edges:
//!
//! - Every collaborator call is bounded by a timeout, and a timeout is a
//!   denial, never a grant. The oracle being down looks exactly like the
//!   oracle saying "no".
//! - The challenge is consumed *before* the response is checked. A wrong
//!   response burns the challenge — there is no second guess against the
//!   same nonce, so the derivation cannot be brute-forced in place.
//! - Response comparison is constant-time.
//! - Both phases, both outcomes, hit the audit sink.
//!
//! Per-phase flow, in the order the checks run:
//!
//! ```text
//! initiate: fields → signature → ownership → catalog → mint challenge
//! verify:   fields → consume challenge → binding + response → catalog
//!           → mint locator → grant
//! ```

use std::sync::Arc;

use tokio::time::timeout;

use crate::audit::{AccessPhase, AuditRecord, AuditSink};
use crate::catalog::{ContentCatalog, ContentRecord};
use crate::clock::Clock;
use crate::config::{
    DEFAULT_CATALOG_TIMEOUT, DEFAULT_LOCATOR_TIMEOUT, DEFAULT_LOCATOR_TTL_SECS,
    DEFAULT_ORACLE_TIMEOUT,
};
use crate::crypto::derivation::{constant_time_eq, ResponseDerivation};
use crate::locator::ContentLocatorIssuer;
use crate::oracle::OwnershipOracle;

use super::challenge::{ChallengeError, ChallengeRegistry};
use super::error::AccessError;

/// Tunable parameters for the protocol.
#[derive(Debug, Clone)]
pub struct AccessConfig {
    /// Lifetime of issued content locators, in seconds.
    pub locator_ttl_secs: u64,
    /// Bound on a single oracle round-trip.
    pub oracle_timeout: std::time::Duration,
    /// Bound on minting a locator.
    pub locator_timeout: std::time::Duration,
    /// Bound on a catalog lookup.
    pub catalog_timeout: std::time::Duration,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            locator_ttl_secs: DEFAULT_LOCATOR_TTL_SECS,
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            locator_timeout: DEFAULT_LOCATOR_TIMEOUT,
            catalog_timeout: DEFAULT_CATALOG_TIMEOUT,
        }
    }
}

/// Input to `initiate`.
#[derive(Debug, Clone)]
pub struct InitiateRequest {
    pub token_id: u64,
    pub contract_address: String,
    pub subject_address: String,
    /// Hex wallet signature over `message`.
    pub signature: String,
    /// The signed message, exactly as presented to the wallet.
    pub message: String,
}

/// Output of `initiate`: what the caller needs to compute a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiateResponse {
    pub challenge_id: String,
    /// Disclosed on purpose — consumption, not nonce secrecy, is the
    /// replay barrier.
    pub nonce: String,
}

/// Input to `verify`.
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub challenge_id: String,
    /// The caller's computed response to the challenge nonce.
    pub response: String,
    pub subject_address: String,
    pub token_id: u64,
    pub contract_address: String,
}

/// A successful grant. Transient — handed to the caller once, never
/// persisted, never reissued for the same challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    /// Hex content encryption key from the catalog.
    pub decryption_key: String,
    /// Time-limited read-only locator for the encrypted object.
    pub content_locator: String,
    /// Locator lifetime in seconds.
    pub expires_in: u64,
}

/// The access protocol state machine.
///
/// Owns nothing but references: the registry is the only mutable state,
/// and every trust decision is delegated through a trait object.
pub struct AccessProtocol {
    oracle: Arc<dyn OwnershipOracle>,
    catalog: Arc<dyn ContentCatalog>,
    locators: Arc<dyn ContentLocatorIssuer>,
    audit: Arc<dyn AuditSink>,
    registry: Arc<ChallengeRegistry>,
    derivation: Arc<dyn ResponseDerivation>,
    clock: Arc<dyn Clock>,
    config: AccessConfig,
}

impl AccessProtocol {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        oracle: Arc<dyn OwnershipOracle>,
        catalog: Arc<dyn ContentCatalog>,
        locators: Arc<dyn ContentLocatorIssuer>,
        audit: Arc<dyn AuditSink>,
        registry: Arc<ChallengeRegistry>,
        derivation: Arc<dyn ResponseDerivation>,
        clock: Arc<dyn Clock>,
        config: AccessConfig,
    ) -> Self {
        Self {
            oracle,
            catalog,
            locators,
            audit,
            registry,
            derivation,
            clock,
            config,
        }
    }

    /// Phase one: prove identity and ownership, receive a challenge.
    pub async fn initiate(
        &self,
        request: &InitiateRequest,
    ) -> Result<InitiateResponse, AccessError> {
        let outcome = self.initiate_inner(request).await;
        let (content_id, result) = match outcome {
            Ok((response, content_id)) => (Some(content_id), Ok(response)),
            Err(err) => (None, Err(err)),
        };
        self.record_attempt(
            AccessPhase::Initiate,
            content_id,
            &request.subject_address,
            request.token_id,
            &request.contract_address,
            result.as_ref().err(),
        )
        .await;
        result
    }

    /// Phase two: answer the challenge, receive the grant.
    pub async fn verify(&self, request: &VerifyRequest) -> Result<AccessGrant, AccessError> {
        let outcome = self.verify_inner(request).await;
        let (content_id, result) = match outcome {
            Ok((grant, content_id)) => (Some(content_id), Ok(grant)),
            Err(err) => (None, Err(err)),
        };
        self.record_attempt(
            AccessPhase::Verify,
            content_id,
            &request.subject_address,
            request.token_id,
            &request.contract_address,
            result.as_ref().err(),
        )
        .await;
        result
    }

    async fn initiate_inner(
        &self,
        request: &InitiateRequest,
    ) -> Result<(InitiateResponse, String), AccessError> {
        require(&request.contract_address, "contractAddress")?;
        require(&request.subject_address, "userAddress")?;
        require(&request.signature, "signature")?;
        require(&request.message, "message")?;

        let signature_ok = timeout(
            self.config.oracle_timeout,
            self.oracle.verify_signature(
                &request.message,
                &request.signature,
                &request.subject_address,
            ),
        )
        .await
        .map_err(|_| AccessError::OracleUnavailable)?
        .map_err(|err| {
            tracing::warn!(error = %err, "signature verification unavailable");
            AccessError::OracleUnavailable
        })?;
        if !signature_ok {
            return Err(AccessError::InvalidSignature);
        }

        let is_owner = timeout(
            self.config.oracle_timeout,
            self.oracle.verify_ownership(
                request.token_id,
                &request.contract_address,
                &request.subject_address,
            ),
        )
        .await
        .map_err(|_| AccessError::OracleUnavailable)?
        .map_err(|err| {
            tracing::warn!(error = %err, "ownership verification unavailable");
            AccessError::OracleUnavailable
        })?;
        if !is_owner {
            return Err(AccessError::NotOwner);
        }

        let record = self
            .lookup_content(request.token_id, &request.contract_address)
            .await?;

        let challenge = self
            .registry
            .create(
                &request.subject_address,
                request.token_id,
                &request.contract_address,
            )
            .map_err(|err| {
                // Only `RegistryFull` can surface here; the caller sees an
                // internal failure, the log sees the real reason.
                tracing::warn!(error = %err, "challenge mint refused");
                AccessError::Internal
            })?;

        tracing::debug!(
            challenge_id = %challenge.id,
            subject = %request.subject_address,
            token_id = request.token_id,
            "challenge minted"
        );

        Ok((
            InitiateResponse {
                challenge_id: challenge.id,
                nonce: challenge.nonce,
            },
            record.id,
        ))
    }

    async fn verify_inner(
        &self,
        request: &VerifyRequest,
    ) -> Result<(AccessGrant, String), AccessError> {
        require(&request.challenge_id, "challengeId")?;
        require(&request.response, "response")?;
        require(&request.subject_address, "userAddress")?;
        require(&request.contract_address, "contractAddress")?;

        // Consume first. From here on the challenge is spent no matter
        // what happens — a failed response does not reinstate it.
        let challenge = self
            .registry
            .consume(&request.challenge_id)
            .map_err(|err| match err {
                ChallengeError::NotFound | ChallengeError::Expired => {
                    AccessError::InvalidOrExpiredChallenge
                }
                other => {
                    tracing::error!(error = %other, "unexpected registry failure on consume");
                    AccessError::Internal
                }
            })?;

        // The challenge is bound to the identity and content it was minted
        // for. A stolen id presented with a different subject or token gets
        // the same bland answer as a wrong hash.
        let bound = challenge.subject_address == request.subject_address
            && challenge.token_id == request.token_id
            && challenge.contract_address == request.contract_address;
        let expected = self
            .derivation
            .derive(&challenge.nonce, &challenge.subject_address);
        if !bound || !constant_time_eq(&request.response, &expected) {
            return Err(AccessError::ResponseMismatch);
        }

        // Re-resolve: the catalog may have changed between phases.
        let record = self
            .lookup_content(request.token_id, &request.contract_address)
            .await?;

        let locator = timeout(
            self.config.locator_timeout,
            self.locators
                .issue(&record.object_key, self.config.locator_ttl_secs),
        )
        .await
        .map_err(|_| AccessError::LocatorUnavailable)?
        .map_err(|err| {
            tracing::warn!(error = %err, "locator issuance unavailable");
            AccessError::LocatorUnavailable
        })?;

        tracing::debug!(
            challenge_id = %request.challenge_id,
            content_id = %record.id,
            "access granted"
        );

        Ok((
            AccessGrant {
                decryption_key: record.encryption_key,
                content_locator: locator.url,
                expires_in: locator.expires_in,
            },
            record.id,
        ))
    }

    async fn lookup_content(
        &self,
        token_id: u64,
        contract_address: &str,
    ) -> Result<ContentRecord, AccessError> {
        timeout(
            self.config.catalog_timeout,
            self.catalog.lookup(token_id, contract_address),
        )
        .await
        .map_err(|_| {
            tracing::error!("catalog lookup timed out");
            AccessError::Internal
        })?
        .map_err(|err| {
            tracing::error!(error = %err, "catalog lookup failed");
            AccessError::Internal
        })?
        .ok_or(AccessError::ContentNotFound)
    }

    /// Audit is best-effort: a sink outage is logged, not converted into
    /// revoking a grant the caller already holds.
    async fn record_attempt(
        &self,
        phase: AccessPhase,
        content_id: Option<String>,
        requester: &str,
        token_id: u64,
        contract_address: &str,
        error: Option<&AccessError>,
    ) {
        let record = AuditRecord {
            phase,
            content_id,
            requester_address: requester.to_string(),
            token_id,
            contract_address: contract_address.to_string(),
            timestamp_ms: self.clock.now_ms(),
            success: error.is_none(),
            error_kind: error.map(|e| e.kind().to_string()),
        };
        if let Err(err) = self.audit.record(record).await {
            tracing::warn!(error = %err, "audit sink rejected access record");
        }
    }
}

fn require(value: &str, name: &'static str) -> Result<(), AccessError> {
    if value.trim().is_empty() {
        return Err(AccessError::MalformedRequest(name));
    }
    Ok(())
}
