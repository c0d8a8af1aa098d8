use std::sync::Arc;

use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::keys::KeyManager;
use crate::error::{AppError, Result};

/// The size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// A secure key wrapper that ensures the key is zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
struct SecureKey([u8; KEY_SIZE]);

/// One sealed value: the RSA-wrapped data key, the AES-GCM nonce, and the
/// ciphertext, each base64-encoded.
///
/// An envelope is self-contained - nothing beyond the recipient's private
/// key is needed to open it - and immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// RSA-OAEP-encrypted AES-256 key.
    pub wrapped_key: String,
    /// AES-GCM nonce.
    pub nonce: String,
    /// AES-256-GCM ciphertext (includes the authentication tag).
    pub ciphertext: String,
}

impl Envelope {
    /// Serializes the envelope to its wire form: a single JSON object.
    pub fn to_wire(&self) -> Result<String> {
        sonic_rs::to_string(self)
            .map_err(|e| AppError::Encryption(format!("Envelope serialization failed: {}", e)))
    }

    /// Parses an envelope from its wire form.
    pub fn from_wire(wire: &str) -> Result<Self> {
        sonic_rs::from_str(wire)
            .map_err(|e| AppError::Decryption(format!("Malformed envelope: {}", e)))
    }
}

/// Hybrid cipher: a fresh AES-256-GCM key per value, wrapped with the
/// process RSA public key.
#[derive(Clone)]
pub struct EnvelopeCipher {
    keys: Arc<KeyManager>,
}

impl EnvelopeCipher {
    /// Creates a new `EnvelopeCipher` over the given keypair.
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }

    /// Seals a plaintext into an [`Envelope`].
    ///
    /// Every call draws a fresh random key and nonce from the OS generator,
    /// so sealing the same plaintext twice yields byte-distinct envelopes
    /// and no key material is ever shared between records.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Envelope> {
        let mut key_bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key_bytes);
        let key = SecureKey(key_bytes);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let cipher = Aes256Gcm::new((&key.0).into());
        let ciphertext = cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| AppError::Encryption(format!("Encryption failed: {}", e)))?;

        let wrapped_key = self.keys.wrap_key(&key.0)?;

        Ok(Envelope {
            wrapped_key: STANDARD.encode(wrapped_key),
            nonce: STANDARD.encode(nonce_bytes),
            ciphertext: STANDARD.encode(ciphertext),
        })
    }

    /// Opens an [`Envelope`], recovering the original plaintext.
    ///
    /// Fails with a decryption error when any component is malformed,
    /// tampered with, or was sealed under a different keypair. A corrupted
    /// envelope never yields wrong plaintext - AES-GCM authentication
    /// rejects it.
    pub fn open(&self, envelope: &Envelope) -> Result<Vec<u8>> {
        let wrapped_key = STANDARD
            .decode(&envelope.wrapped_key)
            .map_err(|e| AppError::Decryption(format!("Invalid wrapped key encoding: {}", e)))?;
        let nonce_vec = STANDARD
            .decode(&envelope.nonce)
            .map_err(|e| AppError::Decryption(format!("Invalid nonce encoding: {}", e)))?;
        let ciphertext = STANDARD
            .decode(&envelope.ciphertext)
            .map_err(|e| AppError::Decryption(format!("Invalid ciphertext encoding: {}", e)))?;

        let key_vec = self.keys.unwrap_key(&wrapped_key)?;
        let key_arr: [u8; KEY_SIZE] = key_vec
            .as_slice()
            .try_into()
            .map_err(|_| AppError::Decryption("Unwrapped key has wrong size".to_string()))?;
        let key = SecureKey(key_arr);

        let nonce_arr: [u8; NONCE_SIZE] = nonce_vec
            .as_slice()
            .try_into()
            .map_err(|_| AppError::Decryption("Invalid nonce size".to_string()))?;
        let nonce = Nonce::from(nonce_arr);

        let cipher = Aes256Gcm::new((&key.0).into());
        cipher
            .decrypt(&nonce, ciphertext.as_ref())
            .map_err(|_| {
                AppError::Decryption("Envelope open failed (wrong key or tampered data)".to_string())
            })
    }

    /// Seals a UTF-8 string, returning the envelope's wire form.
    pub fn seal_str(&self, plaintext: &str) -> Result<String> {
        self.seal(plaintext.as_bytes())?.to_wire()
    }

    /// Opens an envelope from its wire form into a UTF-8 string.
    pub fn open_str(&self, wire: &str) -> Result<String> {
        let plaintext = self.open(&Envelope::from_wire(wire)?)?;
        String::from_utf8(plaintext)
            .map_err(|_| AppError::Decryption("Decrypted value is not valid UTF-8".to_string()))
    }
}
