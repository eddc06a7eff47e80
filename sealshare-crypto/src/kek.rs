//! Key-encryption-key derivation and private-key-at-rest protection.
//!
//! The KEK is PBKDF2-HMAC-SHA256 over the identity provider's UID with a
//! fixed application salt. It only protects the private key blob stored on
//! the metadata server; the UID is not a secret, so the KEK is not an
//! authentication factor.

use crate::asymmetric::{self, KeyPair};
use crate::error::{CryptoError, CryptoResult};
use crate::symmetric::{self, KEY_SIZE, SymmetricEnvelope, SymmetricKey};
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Lowest accepted PBKDF2 iteration count.
pub const MIN_KEK_ITERATIONS: u32 = 100_000;

/// Application-wide salt. Changing it orphans every stored private key.
pub const DEFAULT_KEK_SALT: &str = "pca_kek_salt_v1";

/// PBKDF2 parameters for KEK derivation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KekParams {
    pub salt: String,
    pub iterations: u32,
}

impl Default for KekParams {
    fn default() -> Self {
        Self {
            salt: DEFAULT_KEK_SALT.to_string(),
            iterations: MIN_KEK_ITERATIONS,
        }
    }
}

impl KekParams {
    /// Checks the parameters against the minimum strength policy.
    pub fn validate(&self) -> CryptoResult<()> {
        if self.iterations < MIN_KEK_ITERATIONS {
            return Err(CryptoError::KeyDerivation(format!(
                "{} PBKDF2 iterations is below the minimum of {MIN_KEK_ITERATIONS}",
                self.iterations
            )));
        }
        if self.salt.is_empty() {
            return Err(CryptoError::KeyDerivation("KEK salt is empty".to_string()));
        }
        Ok(())
    }
}

/// Derives the 256-bit KEK for `uid`. Deterministic for a given uid and params.
pub fn derive_kek(uid: &str, params: &KekParams) -> CryptoResult<SymmetricKey> {
    params.validate()?;
    if uid.is_empty() {
        return Err(CryptoError::KeyDerivation("uid is empty".to_string()));
    }

    let mut out = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(
        uid.as_bytes(),
        params.salt.as_bytes(),
        params.iterations,
        &mut out,
    );
    let key = SymmetricKey::from_bytes(out);
    zeroize::Zeroize::zeroize(&mut out);
    Ok(key)
}

/// Encrypts the PKCS#8 PEM of `private` under the KEK.
pub fn seal_private_key(private: &RsaPrivateKey, kek: &SymmetricKey) -> CryptoResult<SymmetricEnvelope> {
    let pem = asymmetric::export_private_pem(private)?;
    symmetric::encrypt_string(kek, &pem)
}

/// Decrypts and parses a private key sealed by [`seal_private_key`].
pub fn open_private_key(envelope: &SymmetricEnvelope, kek: &SymmetricKey) -> CryptoResult<KeyPair> {
    let pem = zeroize::Zeroizing::new(symmetric::decrypt_string(kek, envelope)?);
    let private = asymmetric::import_private_pem(&pem)?;
    Ok(KeyPair::from_private(private))
}
