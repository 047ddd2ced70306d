// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # LEDGERBOUND Protocol — Core Library
//!
//! LEDGERBOUND gates encrypted content behind on-chain ownership: whoever
//! provably holds a given NFT can obtain a one-time decryption key and a
//! time-limited pointer to the encrypted blob. Nobody else can — not a
//! replaying attacker, not a second requester racing on a stolen challenge
//! id, not us.
//!
//! The protocol is a two-phase challenge-response handshake:
//!
//! 1. **initiate** — the caller presents a wallet signature and an ownership
//!    claim. We check both against the ledger, then mint a short-lived,
//!    single-use challenge bound to the caller's identity and the requested
//!    content.
//! 2. **verify** — the caller returns the agreed response to the challenge.
//!    The challenge is consumed atomically (exactly once, ever), the response
//!    is checked in constant time, and on success the caller receives the
//!    content's decryption key plus a signed, expiring locator.
//!
//! ## Architecture
//!
//! The modules mirror the actual trust boundaries of the system:
//!
//! - **crypto** — Envelope framing (AEAD) and response derivation.
//! - **access** — The challenge registry and the two-phase state machine.
//!   This is the part that has to be right.
//! - **oracle** — Ownership and signature verification, behind a trait so
//!   the core never talks to a live ledger directly.
//! - **catalog** — Where content records (object key + encryption key) live.
//! - **locator** — Minting time-limited, read-only content locators.
//! - **audit** — Durable record of every access attempt, granted or not.
//! - **clock** — Injected time, so expiry is testable without sleeping.
//! - **config** — Protocol constants and frame-size parameters.
//!
//! ## Design Philosophy
//!
//! 1. Fail closed. An unreachable ledger is a "no", never a "probably".
//! 2. A challenge is consumed exactly once, under any interleaving.
//! 3. Every collaborator that can lie or vanish sits behind a trait.
//! 4. If it guards a key, it has tests. Plural.

pub mod access;
pub mod audit;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod locator;
pub mod oracle;
