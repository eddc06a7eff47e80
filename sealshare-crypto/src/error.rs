//! Crypto error types.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors produced by the envelope encryption primitives.
///
/// `UnwrapFailed` and `AuthenticationFailed` carry neither partial plaintext
/// nor the underlying cause.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("secure random source unavailable: {0}")]
    Unavailable(String),

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("secret too large to wrap: {len} bytes exceeds capacity of {max}")]
    SecretTooLarge { len: usize, max: usize },

    #[error("key unwrap failed (wrong key or corrupted data)")]
    UnwrapFailed,

    #[error("authentication failed (wrong key or tampered data)")]
    AuthenticationFailed,

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("encoding error: {0}")]
    Encoding(String),
}
