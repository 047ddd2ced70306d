//! # Challenge Registry
//!
//! Short-lived, single-use challenge tokens. A challenge binds a random
//! 256-bit nonce to a claimed identity and a content reference, lives for
//! a few minutes, and can be consumed exactly once.
//!
//! ## Concurrency
//!
//! The registry is the one piece of shared mutable state in the protocol,
//! so the rules are strict:
//!
//! - `create` inserts never lose entries under concurrent insertion, and
//!   never hand out an id that collides with a live entry.
//! - `consume` is an atomic check-and-remove. Two callers racing on the
//!   same id: exactly one gets the challenge, the other gets `NotFound`.
//!   This is the anti-replay linchpin — a captured challenge-response
//!   pair is worth at most one grant, even under concurrent replay.
//! - `sweep_expired` runs concurrently with both without racing a
//!   mid-consumption entry: removal goes through the same per-shard lock
//!   with the expiry predicate re-checked under it.
//!
//! `DashMap` gives us sharded per-entry locking; `remove` / `remove_if`
//! are the atomic primitives everything above reduces to.
//!
//! ## Memory
//!
//! Expired entries are reaped lazily on every `create` and by the node's
//! periodic sweeper, and the registry refuses new entries past a hard
//! capacity bound. `initiate` floods make the caller queue, not the
//! resident set.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::RngCore;
use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::{CHALLENGE_NONCE_LENGTH, DEFAULT_CHALLENGE_TTL, MAX_PENDING_CHALLENGES};

/// Lifecycle state of a challenge.
///
/// `Pending` is the only state the registry stores — consumption removes
/// the entry, and expiry is a fact about the clock, not a stored flag.
/// The other two states exist on the value handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    Pending,
    Consumed,
    Expired,
}

/// A minted challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Opaque unique id. The caller echoes this back at `verify`.
    pub id: String,
    /// Hex-encoded 256-bit random nonce. Disclosed to the caller — the
    /// secret boundary is consumption, not the nonce.
    pub nonce: String,
    /// Wallet address the challenge was minted for.
    pub subject_address: String,
    pub token_id: u64,
    pub contract_address: String,
    /// Mint time, epoch milliseconds.
    pub issued_at_ms: u64,
    /// Lifetime in milliseconds.
    pub ttl_ms: u64,
    pub state: ChallengeState,
}

impl Challenge {
    /// The instant after which this challenge is dead.
    pub fn expires_at_ms(&self) -> u64 {
        self.issued_at_ms.saturating_add(self.ttl_ms)
    }

    fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.expires_at_ms()
    }
}

/// Errors from registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChallengeError {
    /// No pending challenge under that id — never minted, already
    /// consumed, or already swept. The registry cannot tell and does not
    /// try to.
    #[error("challenge not found")]
    NotFound,

    /// The challenge existed but outlived its TTL. It is gone either way.
    #[error("challenge expired")]
    Expired,

    /// The pending set is at capacity even after sweeping.
    #[error("challenge registry at capacity ({0} pending)")]
    RegistryFull(usize),
}

/// Tunable parameters for the registry.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Lifetime of a minted challenge.
    pub ttl: Duration,
    /// Hard bound on simultaneously pending challenges.
    pub max_pending: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CHALLENGE_TTL,
            max_pending: MAX_PENDING_CHALLENGES,
        }
    }
}

/// Thread-safe registry of pending challenges.
pub struct ChallengeRegistry {
    entries: DashMap<String, Challenge>,
    config: RegistryConfig,
    clock: Arc<dyn Clock>,
}

impl ChallengeRegistry {
    /// A registry with the given knobs and time source.
    pub fn new(config: RegistryConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            config,
            clock,
        }
    }

    /// Mint a fresh challenge for `(subject, token, contract)`.
    ///
    /// Sweeps expired entries first, then enforces the capacity bound.
    /// Multiple pending challenges per subject/content pair are allowed —
    /// each is independently single-use.
    pub fn create(
        &self,
        subject_address: &str,
        token_id: u64,
        contract_address: &str,
    ) -> Result<Challenge, ChallengeError> {
        self.sweep_expired();

        if self.entries.len() >= self.config.max_pending {
            return Err(ChallengeError::RegistryFull(self.entries.len()));
        }

        let now = self.clock.now_ms();
        let mut nonce = [0u8; CHALLENGE_NONCE_LENGTH];
        rand::rngs::OsRng.fill_bytes(&mut nonce);

        // UUIDv4 collisions are a cosmological event, but the invariant is
        // "never hand out an id colliding with a live entry", so regenerate
        // rather than reason about probabilities.
        loop {
            let id = Uuid::new_v4().to_string();
            match self.entries.entry(id.clone()) {
                Entry::Occupied(_) => continue,
                Entry::Vacant(slot) => {
                    let challenge = Challenge {
                        id,
                        nonce: hex::encode(nonce),
                        subject_address: subject_address.to_string(),
                        token_id,
                        contract_address: contract_address.to_string(),
                        issued_at_ms: now,
                        ttl_ms: self.config.ttl.as_millis() as u64,
                        state: ChallengeState::Pending,
                    };
                    slot.insert(challenge.clone());
                    return Ok(challenge);
                }
            }
        }
    }

    /// Atomically consume the challenge with the given id.
    ///
    /// Exactly one caller ever succeeds per id: the entry is removed under
    /// its shard lock before anyone else can observe it as pending. A
    /// consumed-but-expired challenge reports [`ChallengeError::Expired`]
    /// and stays gone — expiry never resurrects anything.
    pub fn consume(&self, challenge_id: &str) -> Result<Challenge, ChallengeError> {
        let (_, challenge) = self
            .entries
            .remove(challenge_id)
            .ok_or(ChallengeError::NotFound)?;

        if challenge.is_expired(self.clock.now_ms()) {
            return Err(ChallengeError::Expired);
        }

        Ok(Challenge {
            state: ChallengeState::Consumed,
            ..challenge
        })
    }

    /// Remove every entry past its TTL. Returns how many were reclaimed.
    ///
    /// Safe against concurrent `consume`: the expiry predicate runs under
    /// the entry's shard lock, and an entry that a `consume` call has
    /// already removed is simply not found here.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now_ms();

        // Collect candidates first, then re-check under the lock —
        // iterating and removing in one pass would hold shard locks across
        // the whole scan.
        let candidates: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut swept = 0;
        for id in candidates {
            if self
                .entries
                .remove_if(&id, |_, challenge| challenge.is_expired(now))
                .is_some()
            {
                swept += 1;
            }
        }
        swept
    }

    /// Number of currently pending challenges (including any not yet
    /// swept past their TTL).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
