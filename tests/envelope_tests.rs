//! Adversarial tests for the hybrid envelope (RSA-OAEP wrapped AES-256-GCM).
//!
//! Validates that:
//! - Seal/open round-trips arbitrary plaintexts
//! - Every seal draws fresh key material (byte-distinct envelopes)
//! - Tampered ciphertext / wrapped key / nonce are rejected
//! - A different keypair cannot open the envelope
//! - Undersized RSA keys are rejected up front

use std::sync::{Arc, OnceLock};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sessiond::crypto::envelope::{Envelope, EnvelopeCipher};
use sessiond::crypto::keys::KeyManager;
use sessiond::error::AppError;

static KEYS: OnceLock<Arc<KeyManager>> = OnceLock::new();

fn test_keys() -> Arc<KeyManager> {
    KEYS.get_or_init(|| Arc::new(KeyManager::ephemeral(2048).unwrap()))
        .clone()
}

fn cipher() -> EnvelopeCipher {
    EnvelopeCipher::new(test_keys())
}

/// Flips one byte inside a base64-encoded envelope component.
fn corrupt(encoded: &str) -> String {
    let mut bytes = STANDARD.decode(encoded).unwrap();
    bytes[0] ^= 0xFF;
    STANDARD.encode(bytes)
}

#[test]
fn seal_and_open_roundtrip() {
    let cipher = cipher();
    let plaintext = b"alice@example.com";

    let envelope = cipher.seal(plaintext).unwrap();
    let opened = cipher.open(&envelope).unwrap();
    assert_eq!(opened, plaintext);
}

#[test]
fn empty_plaintext_roundtrips() {
    let cipher = cipher();
    let envelope = cipher.seal(b"").unwrap();
    assert_eq!(cipher.open(&envelope).unwrap(), b"");
}

#[test]
fn sealing_twice_yields_distinct_envelopes() {
    let cipher = cipher();
    let plaintext = b"00:1A:2B:3C:4D:5E";

    let first = cipher.seal(plaintext).unwrap();
    let second = cipher.seal(plaintext).unwrap();

    // Fresh key and nonce per call: nothing may repeat.
    assert_ne!(first.wrapped_key, second.wrapped_key);
    assert_ne!(first.nonce, second.nonce);
    assert_ne!(first.ciphertext, second.ciphertext);
    assert_ne!(first.to_wire().unwrap(), second.to_wire().unwrap());

    assert_eq!(cipher.open(&first).unwrap(), plaintext);
    assert_eq!(cipher.open(&second).unwrap(), plaintext);
}

#[test]
fn tampered_ciphertext_detected() {
    let cipher = cipher();
    let mut envelope = cipher.seal(b"203.0.113.7").unwrap();

    envelope.ciphertext = corrupt(&envelope.ciphertext);

    let err = cipher.open(&envelope).unwrap_err();
    assert!(
        matches!(err, AppError::Decryption(_)),
        "tampered ciphertext should fail decryption, got: {err:?}"
    );
}

#[test]
fn tampered_wrapped_key_detected() {
    let cipher = cipher();
    let mut envelope = cipher.seal(b"203.0.113.7").unwrap();

    envelope.wrapped_key = corrupt(&envelope.wrapped_key);

    let err = cipher.open(&envelope).unwrap_err();
    assert!(matches!(err, AppError::Decryption(_)));
}

#[test]
fn tampered_nonce_detected() {
    let cipher = cipher();
    let mut envelope = cipher.seal(b"203.0.113.7").unwrap();

    envelope.nonce = corrupt(&envelope.nonce);

    let err = cipher.open(&envelope).unwrap_err();
    assert!(matches!(err, AppError::Decryption(_)));
}

#[test]
fn wrong_keypair_cannot_open() {
    let sealer = cipher();
    let other = EnvelopeCipher::new(Arc::new(KeyManager::ephemeral(2048).unwrap()));

    let envelope = sealer.seal(b"secret").unwrap();

    let err = other.open(&envelope).unwrap_err();
    assert!(
        matches!(err, AppError::Decryption(_)),
        "a different keypair should never open the envelope, got: {err:?}"
    );
}

#[test]
fn wire_form_roundtrips() {
    let cipher = cipher();
    let envelope = cipher.seal(b"payload").unwrap();

    let wire = envelope.to_wire().unwrap();
    let parsed = Envelope::from_wire(&wire).unwrap();

    assert_eq!(parsed.wrapped_key, envelope.wrapped_key);
    assert_eq!(cipher.open(&parsed).unwrap(), b"payload");
}

#[test]
fn malformed_wire_rejected() {
    let err = Envelope::from_wire("definitely not an envelope").unwrap_err();
    assert!(matches!(err, AppError::Decryption(_)));
}

#[test]
fn invalid_base64_rejected() {
    let cipher = cipher();
    let mut envelope = cipher.seal(b"payload").unwrap();
    envelope.ciphertext = "!!not base64!!".to_string();

    let err = cipher.open(&envelope).unwrap_err();
    assert!(matches!(err, AppError::Decryption(_)));
}

#[test]
fn undersized_rsa_key_rejected_at_generation() {
    let err = KeyManager::ephemeral(1024).unwrap_err();
    assert!(
        matches!(err, AppError::InvalidConfiguration(_)),
        "a 1024-bit modulus must be rejected up front, got: {err:?}"
    );
}
