use std::fs;
use std::path::Path;

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{AppError, Result};

/// Minimum RSA modulus size. A 256-bit data key plus OAEP padding must fit
/// inside a single RSA block, and anything below 2048 bits is rejected
/// outright rather than discovered later as a cipher failure.
pub const MIN_RSA_BITS: usize = 2048;

/// File name of the persisted public key (SPKI PEM).
const PUBLIC_PEM: &str = "public.pem";
/// File name of the persisted private key (PKCS#8 PEM).
const PRIVATE_PEM: &str = "private.pem";

/// Holds the process keypair.
///
/// ⚠️ IMPORTANT: the private key NEVER leaves this type. There is no
/// private-key accessor; the only way to use it is `unwrap_key`, which is
/// called exclusively by the envelope decrypt path. Response serialization
/// can only ever see the public half.
pub struct KeyManager {
    public: RsaPublicKey,
    private: RsaPrivateKey,
}

impl std::fmt::Debug for KeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyManager")
            .field("public", &self.public)
            .field("private", &"<redacted>")
            .finish()
    }
}

impl KeyManager {
    /// Loads the keypair from `dir`, generating and persisting a fresh one
    /// if none exists yet. Idempotent: the two PEM files are written on the
    /// first run only and reused on every later startup.
    ///
    /// # Arguments
    ///
    /// * `dir` - Directory holding `public.pem` / `private.pem`.
    /// * `bits` - RSA modulus size used when generating.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `KeyManager`.
    pub fn ensure(dir: &Path, bits: usize) -> Result<Self> {
        let public_path = dir.join(PUBLIC_PEM);
        let private_path = dir.join(PRIVATE_PEM);

        match (public_path.exists(), private_path.exists()) {
            (true, true) => Self::load(&public_path, &private_path),
            (false, false) => {
                let manager = Self::generate(bits)?;
                manager.persist(dir, &public_path, &private_path)?;
                tracing::info!("✅ RSA keypair generated and persisted to {}", dir.display());
                Ok(manager)
            }
            _ => Err(AppError::KeyLoad(format!(
                "Incomplete keypair in {}: one of {}/{} is missing",
                dir.display(),
                PUBLIC_PEM,
                PRIVATE_PEM
            ))),
        }
    }

    /// Generates an in-memory keypair that is never persisted. Intended for
    /// tests that need a working cipher without touching the filesystem.
    pub fn ephemeral(bits: usize) -> Result<Self> {
        Self::generate(bits)
    }

    fn generate(bits: usize) -> Result<Self> {
        if bits < MIN_RSA_BITS {
            return Err(AppError::InvalidConfiguration(format!(
                "RSA key size {} is below the {}-bit minimum",
                bits, MIN_RSA_BITS
            )));
        }

        let private = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| AppError::KeyGeneration(format!("RSA key generation failed: {}", e)))?;
        let public = RsaPublicKey::from(&private);

        Ok(Self { public, private })
    }

    fn load(public_path: &Path, private_path: &Path) -> Result<Self> {
        let public_pem = fs::read_to_string(public_path)
            .map_err(|e| AppError::KeyLoad(format!("Failed to read {}: {}", PUBLIC_PEM, e)))?;
        let public = RsaPublicKey::from_public_key_pem(&public_pem)
            .map_err(|e| AppError::KeyLoad(format!("Corrupt {}: {}", PUBLIC_PEM, e)))?;

        let private_pem = Zeroizing::new(
            fs::read_to_string(private_path)
                .map_err(|e| AppError::KeyLoad(format!("Failed to read {}: {}", PRIVATE_PEM, e)))?,
        );
        let private = RsaPrivateKey::from_pkcs8_pem(&private_pem)
            .map_err(|e| AppError::KeyLoad(format!("Corrupt {}: {}", PRIVATE_PEM, e)))?;

        tracing::info!("✅ RSA keypair loaded from disk");
        Ok(Self { public, private })
    }

    fn persist(&self, dir: &Path, public_path: &Path, private_path: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;

        let public_pem = self
            .public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AppError::KeyGeneration(format!("Public key encoding failed: {}", e)))?;
        fs::write(public_path, public_pem)?;

        // to_pkcs8_pem returns a Zeroizing<String>, wiped once written out.
        let private_pem = self
            .private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AppError::KeyGeneration(format!("Private key encoding failed: {}", e)))?;
        fs::write(private_path, private_pem.as_bytes())?;

        Ok(())
    }

    /// Returns the public half of the keypair.
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// Encrypts a symmetric key with the public key (RSA-OAEP-SHA256).
    pub fn wrap_key(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.public
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key)
            .map_err(|e| AppError::Encryption(format!("Key wrap failed: {}", e)))
    }

    /// Decrypts a wrapped symmetric key with the private key.
    ///
    /// Fails when the wrapped key is malformed, tampered, or was produced
    /// under a different keypair.
    pub fn unwrap_key(&self, wrapped: &[u8]) -> Result<Vec<u8>> {
        self.private
            .decrypt(Oaep::new::<Sha256>(), wrapped)
            .map_err(|_| {
                AppError::Decryption("Key unwrap failed (wrong keypair or tampered data)".to_string())
            })
    }
}
