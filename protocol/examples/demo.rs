//! Interactive CLI demo of the full LEDGERBOUND access lifecycle.
//!
//! Walks through wallet enrollment, content publishing, the two-phase
//! challenge-response handshake, grant issuance, and a replay attempt
//! bouncing off the consumed challenge. The output uses ANSI escape codes
//! for colored, storytelling-style terminal rendering.
//!
//! Run with:
//!   cargo run --example demo --release

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use ledgerbound_protocol::access::{
    AccessConfig, AccessProtocol, ChallengeRegistry, InitiateRequest, RegistryConfig,
    VerifyRequest,
};
use ledgerbound_protocol::audit::{AuditSink, MemoryAuditSink};
use ledgerbound_protocol::catalog::{ContentCatalog, ContentRecord, MemoryCatalog};
use ledgerbound_protocol::clock::{Clock, SystemClock};
use ledgerbound_protocol::crypto::derivation::{ResponseDerivation, SaltedSha256Derivation};
use ledgerbound_protocol::crypto::envelope;
use ledgerbound_protocol::locator::SignedPathIssuer;
use ledgerbound_protocol::oracle::{sign_message, DevLedgerOracle, OwnershipOracle};

// ---------------------------------------------------------------------------
// ANSI color constants
// ---------------------------------------------------------------------------

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const RED: &str = "\x1b[31m";
const WHITE: &str = "\x1b[37m";

const BG_BLUE: &str = "\x1b[44m";

// ---------------------------------------------------------------------------
// Display helpers
// ---------------------------------------------------------------------------

fn banner() {
    println!();
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                              {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    LEDGERBOUND  --  NFT-Gated Content Access Demo            {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}    Version 0.1.0  |  Ed25519 + AES-256-GCM + BLAKE3          {RESET}"
    );
    println!(
        "{BG_BLUE}{BOLD}{WHITE}                                                              {RESET}"
    );
    println!();
}

fn step(n: u32, title: &str) {
    println!();
    println!("{BOLD}{CYAN}-- Step {n}: {title} {RESET}");
}

fn detail(label: &str, value: &str) {
    println!("   {DIM}{label:<18}{RESET}{value}");
}

fn truncated(value: &str) -> String {
    if value.len() > 24 {
        format!("{}…", &value[..24])
    } else {
        value.to_string()
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    banner();

    let clock = Arc::new(SystemClock);

    // --- Step 1: a reader enrolls a wallet and buys token #1 ---
    step(1, "Wallet enrollment");
    let wallet = SigningKey::generate(&mut OsRng);
    let ledger = DevLedgerOracle::new();
    let address = ledger.enroll(wallet.verifying_key());
    ledger.set_owner("0xB00C", 1, &address);
    detail("wallet address", &address);
    detail("owns", "token #1 under contract 0xB00C");

    // --- Step 2: a publisher seals content and lists it in the catalog ---
    step(2, "Publishing");
    let content_key = envelope::generate_key();
    let manuscript = b"It was the best of ciphertexts, it was the worst of ciphertexts.";
    let sealed = envelope::encrypt_with_hex_key(&content_key, manuscript).expect("seal");
    detail("content key", &truncated(&content_key));
    detail("sealed bytes", &format!("{} (plaintext {})", sealed.len(), manuscript.len()));

    let catalog = Arc::new(MemoryCatalog::new());
    catalog.publish(
        "0xB00C",
        1,
        ContentRecord {
            id: "two-ciphertexts".into(),
            object_key: "books/two-ciphertexts/payload.bin".into(),
            encryption_key: content_key,
        },
    );

    // --- Step 3: wire up the access protocol ---
    step(3, "Gateway assembly");
    let registry = Arc::new(ChallengeRegistry::new(
        RegistryConfig::default(),
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));
    let derivation = Arc::new(SaltedSha256Derivation::new("demo-secret"));
    let protocol = AccessProtocol::new(
        Arc::new(ledger) as Arc<dyn OwnershipOracle>,
        Arc::clone(&catalog) as Arc<dyn ContentCatalog>,
        Arc::new(SignedPathIssuer::new(
            "https://content.local/o",
            [42u8; 32],
            Arc::clone(&clock) as Arc<dyn Clock>,
        )),
        Arc::new(MemoryAuditSink::new()) as Arc<dyn AuditSink>,
        Arc::clone(&registry),
        Arc::clone(&derivation) as Arc<dyn ResponseDerivation>,
        Arc::clone(&clock) as Arc<dyn Clock>,
        AccessConfig::default(),
    );
    detail("challenge ttl", "300s");
    detail("locator ttl", "3600s");

    // --- Step 4: initiate ---
    step(4, "Handshake phase one: initiate");
    let message = "Unlock token #1 for my wallet";
    let challenge = protocol
        .initiate(&InitiateRequest {
            token_id: 1,
            contract_address: "0xB00C".into(),
            subject_address: address.clone(),
            signature: sign_message(&wallet, message),
            message: message.into(),
        })
        .await
        .expect("initiate");
    detail("challenge id", &challenge.challenge_id);
    detail("nonce", &truncated(&challenge.nonce));
    println!("   {GREEN}signature verified, ownership verified, challenge minted{RESET}");

    // --- Step 5: verify ---
    step(5, "Handshake phase two: verify");
    let grant = protocol
        .verify(&VerifyRequest {
            challenge_id: challenge.challenge_id.clone(),
            response: derivation.derive(&challenge.nonce, &address),
            subject_address: address.clone(),
            token_id: 1,
            contract_address: "0xB00C".into(),
        })
        .await
        .expect("verify");
    detail("decryption key", &truncated(&grant.decryption_key));
    detail("locator", &truncated(&grant.content_locator));
    detail("expires in", &format!("{}s", grant.expires_in));

    let opened =
        envelope::decrypt_with_hex_key(&grant.decryption_key, &sealed).expect("open envelope");
    println!(
        "   {GREEN}envelope opened:{RESET} {}",
        String::from_utf8_lossy(&opened)
    );

    // --- Step 6: replay ---
    step(6, "Replay attempt");
    let replay = protocol
        .verify(&VerifyRequest {
            challenge_id: challenge.challenge_id,
            response: derivation.derive(&challenge.nonce, &address),
            subject_address: address,
            token_id: 1,
            contract_address: "0xB00C".into(),
        })
        .await;
    match replay {
        Err(err) => println!("   {RED}denied:{RESET} {err} {DIM}(challenge already consumed){RESET}"),
        Ok(_) => unreachable!("a consumed challenge must never grant twice"),
    }

    println!();
    println!("{BOLD}{YELLOW}Done.{RESET} One challenge, one grant, zero replays.");
    println!();
}
