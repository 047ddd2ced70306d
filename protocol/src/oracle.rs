//! # Ownership Oracle
//!
//! The trust boundary between this service and the ledger. The core never
//! talks to an RPC endpoint, parses a receipt, or recovers a public key
//! from a signature itself — it asks an [`OwnershipOracle`] two questions
//! and acts on the answers:
//!
//! 1. Did the claimed wallet really sign this message?
//! 2. Does the claimed wallet really own this token right now?
//!
//! ## Fail closed
//!
//! An oracle that cannot be reached answers neither question. The access
//! protocol treats [`OracleError::Unavailable`] exactly like "not owner":
//! the request is denied. There is no cached-last-known-good, no grace
//! window, no "the chain was probably fine a minute ago". A lying RPC
//! node can deny service; it must never mint access.
//!
//! ## The development ledger
//!
//! [`DevLedgerOracle`] is an in-memory ledger for tests, demos, and local
//! stacks: wallets are Ed25519 keypairs, addresses are derived from the
//! verifying key, and ownership is whatever the fixture says it is. The
//! signature check is real — strict Ed25519 verification, not a stub that
//! returns `true` — so the full protocol path is exercised end to end
//! with zero network dependency.

use async_trait::async_trait;
use dashmap::DashMap;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use thiserror::Error;

/// Errors an oracle can raise.
///
/// There is only one: the ledger could not be consulted. Wrong answers
/// are `Ok(false)`, not errors — the distinction matters because both are
/// denials, but only one is retryable.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("ownership oracle unavailable: {0}")]
    Unavailable(String),
}

/// Verifies wallet signatures and on-chain ownership claims.
///
/// Implementations wrap whatever ledger the deployment trusts. Both
/// methods answer `Ok(false)` for "checked and no", and
/// `Err(Unavailable)` for "could not check".
#[async_trait]
pub trait OwnershipOracle: Send + Sync {
    /// Does `signature` over `message` verify under the key behind
    /// `claimed_address`?
    async fn verify_signature(
        &self,
        message: &str,
        signature: &str,
        claimed_address: &str,
    ) -> Result<bool, OracleError>;

    /// Does `claimed_address` currently own `token_id` under
    /// `contract_address`?
    async fn verify_ownership(
        &self,
        token_id: u64,
        contract_address: &str,
        claimed_address: &str,
    ) -> Result<bool, OracleError>;
}

/// Derives a wallet address from an Ed25519 verifying key.
///
/// `0x` plus the first 20 bytes of the BLAKE3 digest of the key, hex
/// encoded — the same shape as the addresses readers paste around, short
/// enough to eyeball in logs.
pub fn wallet_address(key: &VerifyingKey) -> String {
    let digest = blake3::hash(key.as_bytes());
    format!("0x{}", hex::encode(&digest.as_bytes()[..20]))
}

/// Signs a message with a wallet key, producing the hex signature the
/// protocol expects on the wire. Client-side helper for tests and demos.
pub fn sign_message(key: &SigningKey, message: &str) -> String {
    hex::encode(key.sign(message.as_bytes()).to_bytes())
}

/// An in-memory ledger: enrolled wallets plus an ownership table.
///
/// Not a mock in the pejorative sense — signature verification is real
/// strict Ed25519. Only the *ownership facts* are fixture data.
#[derive(Default)]
pub struct DevLedgerOracle {
    /// Enrolled wallets, address → verifying key.
    wallets: DashMap<String, VerifyingKey>,
    /// Ownership table, (contract, token) → owner address.
    owners: DashMap<(String, u64), String>,
}

impl DevLedgerOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll a wallet and return its derived address.
    pub fn enroll(&self, key: VerifyingKey) -> String {
        let address = wallet_address(&key);
        self.wallets.insert(address.clone(), key);
        address
    }

    /// Record `owner_address` as the owner of `(contract, token)`.
    /// Overwrites any previous owner, like a transfer would.
    pub fn set_owner(&self, contract_address: &str, token_id: u64, owner_address: &str) {
        self.owners.insert(
            (contract_address.to_string(), token_id),
            owner_address.to_string(),
        );
    }
}

#[async_trait]
impl OwnershipOracle for DevLedgerOracle {
    async fn verify_signature(
        &self,
        message: &str,
        signature: &str,
        claimed_address: &str,
    ) -> Result<bool, OracleError> {
        // Unknown wallet, malformed hex, wrong-length signature: all the
        // same answer. No error oracle for attackers probing the ledger.
        let Some(key) = self.wallets.get(claimed_address) else {
            return Ok(false);
        };
        let Ok(sig_bytes) = hex::decode(signature) else {
            return Ok(false);
        };
        let sig_array: [u8; 64] = match sig_bytes.try_into() {
            Ok(array) => array,
            Err(_) => return Ok(false),
        };
        let sig = Signature::from_bytes(&sig_array);
        Ok(key.verify(message.as_bytes(), &sig).is_ok())
    }

    async fn verify_ownership(
        &self,
        token_id: u64,
        contract_address: &str,
        claimed_address: &str,
    ) -> Result<bool, OracleError> {
        let owner = self
            .owners
            .get(&(contract_address.to_string(), token_id));
        Ok(matches!(owner, Some(o) if o.value() == claimed_address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn wallet() -> (SigningKey, String, DevLedgerOracle) {
        let sk = SigningKey::generate(&mut OsRng);
        let oracle = DevLedgerOracle::new();
        let address = oracle.enroll(sk.verifying_key());
        (sk, address, oracle)
    }

    #[tokio::test]
    async fn valid_signature_verifies() {
        let (sk, address, oracle) = wallet();
        let sig = sign_message(&sk, "unlock my library");
        assert!(oracle
            .verify_signature("unlock my library", &sig, &address)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn wrong_message_rejected() {
        let (sk, address, oracle) = wallet();
        let sig = sign_message(&sk, "unlock my library");
        assert!(!oracle
            .verify_signature("unlock someone else's", &sig, &address)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn wrong_wallet_rejected() {
        let (sk, _address, oracle) = wallet();
        let other = SigningKey::generate(&mut OsRng);
        let other_address = oracle.enroll(other.verifying_key());
        // Signature from `sk`, claimed by the other wallet.
        let sig = sign_message(&sk, "msg");
        assert!(!oracle.verify_signature("msg", &sig, &other_address).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_address_and_garbage_signature_rejected() {
        let (_sk, address, oracle) = wallet();
        assert!(!oracle
            .verify_signature("msg", "deadbeef", &address)
            .await
            .unwrap());
        assert!(!oracle
            .verify_signature("msg", "zz-not-hex", &address)
            .await
            .unwrap());
        assert!(!oracle
            .verify_signature("msg", &"00".repeat(64), "0xnobody")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn ownership_follows_the_table() {
        let (_sk, address, oracle) = wallet();
        assert!(!oracle.verify_ownership(7, "0xBOOK", &address).await.unwrap());

        oracle.set_owner("0xBOOK", 7, &address);
        assert!(oracle.verify_ownership(7, "0xBOOK", &address).await.unwrap());
        // Same token id under a different contract is a different asset.
        assert!(!oracle.verify_ownership(7, "0xOTHER", &address).await.unwrap());

        // Transfer away.
        oracle.set_owner("0xBOOK", 7, "0xsomeoneelse");
        assert!(!oracle.verify_ownership(7, "0xBOOK", &address).await.unwrap());
    }

    #[test]
    fn addresses_are_stable_and_distinct() {
        let a = SigningKey::generate(&mut OsRng);
        let b = SigningKey::generate(&mut OsRng);
        assert_eq!(
            wallet_address(&a.verifying_key()),
            wallet_address(&a.verifying_key())
        );
        assert_ne!(
            wallet_address(&a.verifying_key()),
            wallet_address(&b.verifying_key())
        );
        let addr = wallet_address(&a.verifying_key());
        assert!(addr.starts_with("0x"));
        assert_eq!(addr.len(), 42);
    }
}
