//! RSA-OAEP key pairs and key wrapping.
//!
//! Public keys travel as SPKI PEM, private keys as PKCS#8 PEM. Wrapping uses
//! OAEP with SHA-256 for both the hash and MGF1, matching WebCrypto's
//! `{ name: "RSA-OAEP", hash: "SHA-256" }` so keys and wrapped DEKs produced
//! by browser clients interoperate.

use crate::codec;
use crate::error::{CryptoError, CryptoResult};
use crate::random;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// Default and minimum RSA modulus size in bits.
pub const RSA_MODULUS_BITS: usize = 2048;

/// Fixed public exponent (F4).
pub const RSA_PUBLIC_EXPONENT: u64 = 65_537;

/// SHA-256 output length, used for the OAEP capacity bound.
const OAEP_HASH_LEN: usize = 32;

const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";
const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";

/// An RSA key pair.
#[derive(Clone)]
pub struct KeyPair {
    pub public: RsaPublicKey,
    pub private: RsaPrivateKey,
}

impl KeyPair {
    /// Rebuilds a pair from its private half.
    pub fn from_private(private: RsaPrivateKey) -> Self {
        let public = RsaPublicKey::from(&private);
        Self { public, private }
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("modulus_bits", &(self.public.size() * 8))
            .field("private", &"[REDACTED]")
            .finish()
    }
}

/// Wrapping algorithm identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WrapAlgorithm {
    #[default]
    #[serde(rename = "RSA-OAEP-SHA256")]
    RsaOaepSha256,
}

/// A short secret encrypted under a recipient's public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedSecret {
    #[serde(default)]
    pub algorithm: WrapAlgorithm,
    #[serde(with = "codec::b64")]
    pub ciphertext: Vec<u8>,
}

impl WrappedSecret {
    /// Builds a wrapped secret from raw RSA-OAEP-SHA256 ciphertext.
    pub fn rsa_oaep_sha256(ciphertext: Vec<u8>) -> Self {
        Self {
            algorithm: WrapAlgorithm::RsaOaepSha256,
            ciphertext,
        }
    }

    /// Standard base64 of the ciphertext, as stored in `dekWrapped` entries.
    pub fn to_base64(&self) -> String {
        codec::encode_b64(&self.ciphertext)
    }

    /// Parses the base64 form stored in `dekWrapped` entries.
    pub fn from_base64(encoded: &str) -> CryptoResult<Self> {
        Ok(Self::rsa_oaep_sha256(codec::decode_b64(encoded)?))
    }
}

/// Generates a 2048-bit RSA key pair.
pub fn generate_keypair() -> CryptoResult<KeyPair> {
    generate_keypair_with_bits(RSA_MODULUS_BITS)
}

/// Generates an RSA key pair with the given modulus size (at least 2048).
pub fn generate_keypair_with_bits(bits: usize) -> CryptoResult<KeyPair> {
    if bits < RSA_MODULUS_BITS {
        return Err(CryptoError::KeyGeneration(format!(
            "modulus of {bits} bits is below the {RSA_MODULUS_BITS}-bit minimum"
        )));
    }

    // Surface a dead entropy source as Unavailable before keygen would panic on it.
    random::random_array::<16>()?;

    let exponent = BigUint::from(RSA_PUBLIC_EXPONENT);
    let private = RsaPrivateKey::new_with_exp(&mut OsRng, bits, &exponent)
        .map_err(|e| CryptoError::KeyGeneration(format!("RSA key generation failed: {e}")))?;

    Ok(KeyPair::from_private(private))
}

/// Encodes a public key as SPKI PEM.
pub fn export_public_pem(key: &RsaPublicKey) -> CryptoResult<String> {
    let der = key
        .to_public_key_der()
        .map_err(|e| CryptoError::MalformedKey(format!("SPKI encoding failed: {e}")))?;
    Ok(codec::pem_encode(PUBLIC_KEY_LABEL, der.as_bytes()))
}

/// Encodes a private key as PKCS#8 PEM.
pub fn export_private_pem(key: &RsaPrivateKey) -> CryptoResult<Zeroizing<String>> {
    let der = key
        .to_pkcs8_der()
        .map_err(|e| CryptoError::MalformedKey(format!("PKCS#8 encoding failed: {e}")))?;
    Ok(Zeroizing::new(codec::pem_encode(PRIVATE_KEY_LABEL, der.as_bytes())))
}

/// Parses an SPKI PEM public key.
pub fn import_public_pem(pem: &str) -> CryptoResult<RsaPublicKey> {
    let der = codec::pem_decode(pem)?;
    let key = RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| CryptoError::MalformedKey(format!("invalid SPKI public key: {e}")))?;
    check_modulus(key.size())?;
    Ok(key)
}

/// Parses a PKCS#8 PEM private key.
pub fn import_private_pem(pem: &str) -> CryptoResult<RsaPrivateKey> {
    let der = Zeroizing::new(codec::pem_decode(pem)?);
    let key = RsaPrivateKey::from_pkcs8_der(&der)
        .map_err(|e| CryptoError::MalformedKey(format!("invalid PKCS#8 private key: {e}")))?;
    check_modulus(key.size())?;
    Ok(key)
}

fn check_modulus(size_bytes: usize) -> CryptoResult<()> {
    if size_bytes * 8 < RSA_MODULUS_BITS {
        return Err(CryptoError::MalformedKey(format!(
            "RSA modulus of {} bits is below the {RSA_MODULUS_BITS}-bit minimum",
            size_bytes * 8
        )));
    }
    Ok(())
}

/// Largest secret that can be wrapped under `key`: `k - 2*hLen - 2`.
pub fn max_wrap_len(key: &RsaPublicKey) -> usize {
    key.size().saturating_sub(2 * OAEP_HASH_LEN + 2)
}

/// Wraps `secret` for the holder of `key` with RSA-OAEP-SHA256.
pub fn wrap(key: &RsaPublicKey, secret: &[u8]) -> CryptoResult<WrappedSecret> {
    let max = max_wrap_len(key);
    if secret.len() > max {
        return Err(CryptoError::SecretTooLarge {
            len: secret.len(),
            max,
        });
    }

    let ciphertext = key
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), secret)
        .map_err(|e| CryptoError::Encryption(format!("RSA-OAEP wrap failed: {e}")))?;

    Ok(WrappedSecret::rsa_oaep_sha256(ciphertext))
}

/// Unwraps a secret with the recipient's private key.
pub fn unwrap(key: &RsaPrivateKey, wrapped: &WrappedSecret) -> CryptoResult<Zeroizing<Vec<u8>>> {
    match wrapped.algorithm {
        WrapAlgorithm::RsaOaepSha256 => key
            .decrypt(Oaep::new::<Sha256>(), &wrapped.ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| CryptoError::UnwrapFailed),
    }
}

/// Hex SHA-256 over the SPKI DER encoding. Safe to log.
pub fn public_key_fingerprint(key: &RsaPublicKey) -> CryptoResult<String> {
    let der = key
        .to_public_key_der()
        .map_err(|e| CryptoError::MalformedKey(format!("SPKI encoding failed: {e}")))?;
    Ok(hex::encode(Sha256::digest(der.as_bytes())))
}
