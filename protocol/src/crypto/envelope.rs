//! # Content Envelopes
//!
//! Deterministic binary framing and AEAD encryption for content blobs.
//! Every encrypted object in storage is one envelope:
//!
//! ```text
//! IV (16 bytes) || AuthTag (16 bytes) || Ciphertext (variable)
//! ```
//!
//! The envelope is self-contained: given the key, nothing else is needed
//! to decrypt it. No side-channel metadata, no external nonce registry,
//! no "which version of the format is this" negotiation.
//!
//! ## Cipher choice
//!
//! AES-256-GCM with a random 128-bit IV per encryption. GCM is unforgiving
//! about nonce reuse — two messages under the same (key, IV) pair leak the
//! XOR of the plaintexts and let an attacker forge tags. Our IVs come from
//! the OS CSPRNG, and each content object gets its own key anyway, so the
//! birthday bound is not within driving distance.
//!
//! Note the IV is 16 bytes, not GCM's native 12. The published envelope
//! format carries 16-byte IVs, and GCM specifies exactly what to do with
//! them (GHASH the nonce down to a counter block). The `aes-gcm` crate
//! supports this through its generic nonce parameter.
//!
//! ## Tag placement
//!
//! The tag sits *between* the IV and the ciphertext. The AEAD library
//! appends it after the ciphertext, so `encrypt`/`decrypt` shuffle the
//! regions when framing and unframing. Get the offsets wrong and
//! decryption fails closed — the tag won't verify.

use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;
use rand::RngCore;
use thiserror::Error;

use crate::config::{
    ENVELOPE_IV_LENGTH, ENVELOPE_KEY_LENGTH, ENVELOPE_MIN_LENGTH, ENVELOPE_TAG_LENGTH,
};

/// AES-256-GCM instantiated with the envelope's 16-byte IV size.
type EnvelopeCipher = AesGcm<Aes256, U16>;

/// Errors that can occur while sealing or opening envelopes.
///
/// We intentionally keep these vague. The difference between "wrong key",
/// "flipped tag bit", and "truncated ciphertext" is none of the caller's
/// business — and definitely none of an attacker's.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("authentication failed -- wrong key or tampered envelope")]
    AuthenticationFailed,

    #[error("envelope too short: minimum frame is {ENVELOPE_MIN_LENGTH} bytes")]
    EnvelopeTooShort,

    #[error("invalid key: expected {ENVELOPE_KEY_LENGTH} bytes of hex")]
    InvalidKey,
}

/// Generate a fresh content encryption key.
///
/// Draws 32 bytes from the OS CSPRNG and returns them as 64 lowercase hex
/// characters — the exact encoding the catalog persists, so the value can
/// be stored and later fed back to [`decrypt`] without reformatting.
pub fn generate_key() -> String {
    let mut key = [0u8; ENVELOPE_KEY_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut key);
    hex::encode(key)
}

/// Decode a hex-encoded content key into raw bytes.
///
/// Accepts exactly 64 hex characters. Anything else — wrong length, stray
/// whitespace, a key that was truncated in transit — is `InvalidKey`.
pub fn key_from_hex(key_hex: &str) -> Result<[u8; ENVELOPE_KEY_LENGTH], EnvelopeError> {
    let bytes = hex::decode(key_hex).map_err(|_| EnvelopeError::InvalidKey)?;
    bytes.try_into().map_err(|_| EnvelopeError::InvalidKey)
}

/// Seal plaintext into an envelope under the given key.
///
/// Returns `IV || tag || ciphertext` as a single `Vec<u8>`. The IV is
/// freshly random per call; encrypting the same plaintext twice yields
/// two entirely different envelopes.
pub fn encrypt(
    key: &[u8; ENVELOPE_KEY_LENGTH],
    plaintext: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    let cipher =
        EnvelopeCipher::new_from_slice(key).map_err(|_| EnvelopeError::EncryptFailed)?;

    let mut iv = [0u8; ENVELOPE_IV_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut iv);

    // The AEAD library returns ciphertext with the tag appended. The
    // envelope format wants the tag up front, so split and reorder.
    let sealed = cipher
        .encrypt(GenericArray::from_slice(&iv), plaintext)
        .map_err(|_| EnvelopeError::EncryptFailed)?;
    let tag_at = sealed.len() - ENVELOPE_TAG_LENGTH;

    let mut out = Vec::with_capacity(ENVELOPE_IV_LENGTH + sealed.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&sealed[tag_at..]);
    out.extend_from_slice(&sealed[..tag_at]);
    Ok(out)
}

/// Open an envelope previously produced by [`encrypt`].
///
/// # Errors
///
/// Returns `EnvelopeTooShort` if the input cannot even hold an IV and a
/// tag, and `AuthenticationFailed` if the tag does not verify — wrong key,
/// flipped bit, truncation, it's all the same answer. There is no partial
/// plaintext release: either the whole envelope authenticates or the
/// caller gets nothing.
pub fn decrypt(
    key: &[u8; ENVELOPE_KEY_LENGTH],
    envelope: &[u8],
) -> Result<Vec<u8>, EnvelopeError> {
    if envelope.len() < ENVELOPE_MIN_LENGTH {
        return Err(EnvelopeError::EnvelopeTooShort);
    }

    let (iv, rest) = envelope.split_at(ENVELOPE_IV_LENGTH);
    let (tag, ciphertext) = rest.split_at(ENVELOPE_TAG_LENGTH);

    let cipher =
        EnvelopeCipher::new_from_slice(key).map_err(|_| EnvelopeError::AuthenticationFailed)?;

    // Reassemble into the library's ciphertext||tag layout.
    let mut sealed = Vec::with_capacity(ciphertext.len() + ENVELOPE_TAG_LENGTH);
    sealed.extend_from_slice(ciphertext);
    sealed.extend_from_slice(tag);

    cipher
        .decrypt(GenericArray::from_slice(iv), sealed.as_ref())
        .map_err(|_| EnvelopeError::AuthenticationFailed)
}

/// Seal with a hex-encoded key, as stored in the catalog.
pub fn encrypt_with_hex_key(key_hex: &str, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let key = key_from_hex(key_hex)?;
    encrypt(&key, plaintext)
}

/// Open with a hex-encoded key, as stored in the catalog.
pub fn decrypt_with_hex_key(key_hex: &str, envelope: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let key = key_from_hex(key_hex)?;
    decrypt(&key, envelope)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        // A fixed key for testing. Never use a predictable key in production.
        // But you knew that. Right?
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn roundtrip() {
        let key = test_key();
        let plaintext = b"chapter one: it was a dark and stormy night";

        let envelope = encrypt(&key, plaintext).unwrap();
        let recovered = decrypt(&key, &envelope).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn empty_plaintext_is_valid() {
        // Sealing nothing still yields a full frame: IV + tag.
        let key = test_key();
        let envelope = encrypt(&key, b"").unwrap();
        assert_eq!(envelope.len(), ENVELOPE_MIN_LENGTH);
        assert!(decrypt(&key, &envelope).unwrap().is_empty());
    }

    #[test]
    fn envelope_length_is_plaintext_plus_frame() {
        let key = test_key();
        let plaintext = b"exactly 26 bytes of input!";
        let envelope = encrypt(&key, plaintext).unwrap();
        assert_eq!(envelope.len(), ENVELOPE_MIN_LENGTH + plaintext.len());
    }

    #[test]
    fn wrong_key_fails() {
        let key = test_key();
        let envelope = encrypt(&key, b"secret").unwrap();

        let mut wrong_key = test_key();
        wrong_key[0] ^= 0xFF;

        assert!(matches!(
            decrypt(&wrong_key, &envelope),
            Err(EnvelopeError::AuthenticationFailed)
        ));
    }

    #[test]
    fn tampered_ciphertext_fails() {
        let key = test_key();
        let mut envelope = encrypt(&key, b"secret").unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0x01;

        assert!(matches!(
            decrypt(&key, &envelope),
            Err(EnvelopeError::AuthenticationFailed)
        ));
    }

    #[test]
    fn tampered_tag_fails() {
        let key = test_key();
        let mut envelope = encrypt(&key, b"secret").unwrap();
        // The tag region starts right after the IV.
        envelope[ENVELOPE_IV_LENGTH] ^= 0x01;

        assert!(matches!(
            decrypt(&key, &envelope),
            Err(EnvelopeError::AuthenticationFailed)
        ));
    }

    #[test]
    fn tampered_iv_fails() {
        let key = test_key();
        let mut envelope = encrypt(&key, b"secret").unwrap();
        envelope[0] ^= 0x01;

        assert!(matches!(
            decrypt(&key, &envelope),
            Err(EnvelopeError::AuthenticationFailed)
        ));
    }

    #[test]
    fn every_bit_of_the_frame_is_authenticated() {
        // Flip each byte of a small envelope in turn; decryption must fail
        // for all of them. This is the "no partial plaintext" property in
        // its most literal form.
        let key = test_key();
        let envelope = encrypt(&key, b"ok").unwrap();

        for i in 0..envelope.len() {
            let mut bent = envelope.clone();
            bent[i] ^= 0x80;
            assert!(
                decrypt(&key, &bent).is_err(),
                "byte {} flipped but decryption succeeded",
                i
            );
        }
    }

    #[test]
    fn short_envelope_rejected() {
        let key = test_key();
        // One byte short of the minimum frame.
        let short = vec![0u8; ENVELOPE_MIN_LENGTH - 1];
        assert!(matches!(
            decrypt(&key, &short),
            Err(EnvelopeError::EnvelopeTooShort)
        ));
        assert!(matches!(
            decrypt(&key, &[]),
            Err(EnvelopeError::EnvelopeTooShort)
        ));
    }

    #[test]
    fn ivs_are_unique_across_calls() {
        // Two encryptions with the same key must produce different IVs.
        // If this fails, the RNG is broken and we need to burn everything down.
        let key = test_key();
        let a = encrypt(&key, b"message").unwrap();
        let b = encrypt(&key, b"message").unwrap();
        assert_ne!(&a[..ENVELOPE_IV_LENGTH], &b[..ENVELOPE_IV_LENGTH]);
    }

    #[test]
    fn generated_keys_are_hex_and_distinct() {
        let a = generate_key();
        let b = generate_key();
        assert_eq!(a.len(), ENVELOPE_KEY_LENGTH * 2);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn hex_key_roundtrip() {
        let key_hex = generate_key();
        let envelope = encrypt_with_hex_key(&key_hex, b"payload").unwrap();
        let recovered = decrypt_with_hex_key(&key_hex, &envelope).unwrap();
        assert_eq!(recovered, b"payload");
    }

    #[test]
    fn malformed_hex_key_rejected() {
        assert!(matches!(
            key_from_hex("not-hex-at-all"),
            Err(EnvelopeError::InvalidKey)
        ));
        // Right charset, wrong length (AES-128-sized).
        assert!(matches!(
            key_from_hex(&"ab".repeat(16)),
            Err(EnvelopeError::InvalidKey)
        ));
    }

    #[test]
    fn large_plaintext() {
        // 1 MiB, the size of a modestly illustrated chapter.
        let key = test_key();
        let plaintext = vec![0xAB; 1_000_000];
        let envelope = encrypt(&key, &plaintext).unwrap();
        let recovered = decrypt(&key, &envelope).unwrap();
        assert_eq!(recovered, plaintext);
    }
}
