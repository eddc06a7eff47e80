//! AES-256-GCM symmetric encryption.
//!
//! Every call to [`encrypt`] draws a fresh 96-bit nonce from the OS random
//! source. There is no API that accepts a caller-supplied nonce, so content
//! and name encryption cannot reuse a nonce under the same key.

use crate::codec;
use crate::error::{CryptoError, CryptoResult};
use crate::random;
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

/// AES-GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// A 256-bit AES key. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Returns the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.bytes))
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// Output of AES-256-GCM encryption. The 16-byte tag is appended to
/// `ciphertext`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymmetricEnvelope {
    #[serde(with = "codec::b64")]
    pub nonce: [u8; NONCE_SIZE],
    #[serde(with = "codec::b64")]
    pub ciphertext: Vec<u8>,
}

/// Generates a random AES-256 key.
pub fn generate_key() -> CryptoResult<SymmetricKey> {
    Ok(SymmetricKey::from_bytes(random::random_array()?))
}

/// Exports the raw key bytes.
pub fn export_raw(key: &SymmetricKey) -> [u8; KEY_SIZE] {
    *key.as_bytes()
}

/// Imports a key from raw bytes, which must be exactly 32 bytes long.
pub fn import_raw(bytes: &[u8]) -> CryptoResult<SymmetricKey> {
    let raw: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
        expected: KEY_SIZE,
        actual: bytes.len(),
    })?;
    Ok(SymmetricKey::from_bytes(raw))
}

/// Encrypts `plaintext` under `key` with a freshly generated nonce.
pub fn encrypt(key: &SymmetricKey, plaintext: &[u8]) -> CryptoResult<SymmetricEnvelope> {
    let nonce: [u8; NONCE_SIZE] = random::random_array()?;

    let ciphertext = key
        .cipher()
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("AES-GCM seal failed: {e}")))?;

    Ok(SymmetricEnvelope { nonce, ciphertext })
}

/// Decrypts an envelope, failing closed on any tag mismatch.
pub fn decrypt(key: &SymmetricKey, envelope: &SymmetricEnvelope) -> CryptoResult<Vec<u8>> {
    key.cipher()
        .decrypt(Nonce::from_slice(&envelope.nonce), envelope.ciphertext.as_ref())
        .map_err(|_| CryptoError::AuthenticationFailed)
}

/// Encrypts a UTF-8 string.
pub fn encrypt_string(key: &SymmetricKey, plaintext: &str) -> CryptoResult<SymmetricEnvelope> {
    encrypt(key, plaintext.as_bytes())
}

/// Decrypts an envelope produced by [`encrypt_string`].
pub fn decrypt_string(key: &SymmetricKey, envelope: &SymmetricEnvelope) -> CryptoResult<String> {
    let bytes = decrypt(key, envelope)?;
    String::from_utf8(bytes)
        .map_err(|e| CryptoError::Encoding(format!("decrypted text is not UTF-8: {e}")))
}
