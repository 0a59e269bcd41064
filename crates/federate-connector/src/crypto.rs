//! Masked property encryption
//!
//! AES-256-GCM with an HKDF-derived key. Masked values travel as the
//! standard base64 text of `nonce || ciphertext || tag`.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use hkdf::Hkdf;
use sha2::Sha256;

use crate::error::{ConnectorError, ConnectorResult};

/// Length of AES-256 key in bytes.
const KEY_LENGTH: usize = 32;

/// Length of GCM nonce in bytes.
const NONCE_LENGTH: usize = 12;

/// Length of GCM authentication tag in bytes.
const TAG_LENGTH: usize = 16;

/// Salt for HKDF key derivation.
const HKDF_SALT: &[u8] = b"federate-connector-properties";

/// Context string for HKDF key derivation.
const HKDF_INFO: &[u8] = b"federate-masked-properties-v1";

/// The engine's reversible transform for masked configuration values.
#[derive(Clone)]
pub struct PropertyCipher {
    /// Key derived from the master key.
    key: [u8; KEY_LENGTH],
}

impl PropertyCipher {
    /// Create a cipher from a 32-byte master key.
    pub fn new(master_key: [u8; KEY_LENGTH]) -> ConnectorResult<Self> {
        let hkdf = Hkdf::<Sha256>::new(Some(HKDF_SALT), &master_key);
        let mut key = [0u8; KEY_LENGTH];
        hkdf.expand(HKDF_INFO, &mut key)
            .map_err(|e| ConnectorError::EncryptionFailed {
                message: format!("key derivation failed: {e}"),
            })?;
        Ok(Self { key })
    }

    /// Create a cipher from a hex-encoded master key.
    pub fn from_hex(hex_key: &str) -> ConnectorResult<Self> {
        let bytes = hex::decode(hex_key.trim()).map_err(|e| ConnectorError::EncryptionFailed {
            message: format!("invalid hex key: {e}"),
        })?;
        Self::from_key_bytes(&bytes)
    }

    /// Create a cipher from a base64-encoded master key.
    pub fn from_base64(base64_key: &str) -> ConnectorResult<Self> {
        let bytes = STANDARD
            .decode(base64_key.trim())
            .map_err(|e| ConnectorError::EncryptionFailed {
                message: format!("invalid base64 key: {e}"),
            })?;
        Self::from_key_bytes(&bytes)
    }

    fn from_key_bytes(bytes: &[u8]) -> ConnectorResult<Self> {
        let key: [u8; KEY_LENGTH] =
            bytes
                .try_into()
                .map_err(|_| ConnectorError::EncryptionFailed {
                    message: format!("key must be {} bytes, got {}", KEY_LENGTH, bytes.len()),
                })?;
        Self::new(key)
    }

    fn cipher(&self) -> ConnectorResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(&self.key).map_err(|e| ConnectorError::Internal {
            message: format!("failed to create cipher: {e}"),
            source: None,
        })
    }

    /// Encrypt raw bytes.
    ///
    /// # Returns
    /// Encrypted data as bytes (nonce || ciphertext || tag).
    pub fn encrypt(&self, plaintext: &[u8]) -> ConnectorResult<Vec<u8>> {
        use rand::rngs::OsRng;
        use rand::RngCore;

        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext =
            self.cipher()?
                .encrypt(nonce, plaintext)
                .map_err(|e| ConnectorError::EncryptionFailed {
                    message: format!("encryption failed: {e}"),
                })?;

        let mut result = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt bytes produced by [`PropertyCipher::encrypt`].
    pub fn decrypt(&self, ciphertext: &[u8]) -> ConnectorResult<Vec<u8>> {
        // nonce + tag, an empty plaintext is still valid
        if ciphertext.len() < NONCE_LENGTH + TAG_LENGTH {
            return Err(ConnectorError::DecryptionFailed {
                message: "ciphertext too short".to_string(),
            });
        }

        let (nonce_bytes, encrypted) = ciphertext.split_at(NONCE_LENGTH);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher()?
            .decrypt(nonce, encrypted)
            .map_err(|e| ConnectorError::DecryptionFailed {
                message: format!("decryption failed: {e}"),
            })
    }

    /// Mask a property value.
    pub fn encrypt_property(&self, plaintext: &str) -> ConnectorResult<String> {
        Ok(STANDARD.encode(self.encrypt(plaintext.as_bytes())?))
    }

    /// Unmask a property value produced by [`PropertyCipher::encrypt_property`].
    pub fn decrypt_property(&self, masked: &str) -> ConnectorResult<String> {
        let bytes = STANDARD
            .decode(masked.trim())
            .map_err(|e| ConnectorError::DecryptionFailed {
                message: format!("masked value is not base64: {e}"),
            })?;
        let plaintext = self.decrypt(&bytes)?;
        String::from_utf8(plaintext).map_err(|e| ConnectorError::DecryptionFailed {
            message: format!("decrypted data is not valid UTF-8: {e}"),
        })
    }
}

impl std::fmt::Debug for PropertyCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Generate a random master key.
///
/// This should only be used for initial setup or testing.
#[must_use]
pub fn generate_master_key() -> [u8; KEY_LENGTH] {
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut key = [0u8; KEY_LENGTH];
    OsRng.fill_bytes(&mut key);
    key
}

/// Generate a random master key as a hex string.
#[must_use]
pub fn generate_master_key_hex() -> String {
    hex::encode(generate_master_key())
}
