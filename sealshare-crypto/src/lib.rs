//! Envelope encryption primitives for SealShare.
//!
//! Provides the client-side building blocks for end-to-end encrypted file
//! sharing:
//! - RSA-OAEP (SHA-256) key pairs for wrapping per-file keys
//! - AES-256-GCM for file content and filenames
//! - PBKDF2-HMAC-SHA256 key-encryption keys protecting private keys at rest
//! - PEM / base64 codecs shared by the wire format
//!
//! # Architecture
//!
//! Each file gets a random data encryption key (DEK). The DEK encrypts the
//! file bytes and the filename, then is wrapped once per authorized reader
//! with that reader's RSA public key. Granting access is one more wrap of
//! the same DEK; file content is never re-encrypted.
//!
//! The user's RSA private key is stored server-side only as an AES-GCM
//! envelope under a KEK derived from the user's identifier.

pub mod asymmetric;
pub mod codec;
mod error;
pub mod kek;
pub mod random;
pub mod symmetric;

pub use asymmetric::{
    KeyPair, RSA_MODULUS_BITS, WrapAlgorithm, WrappedSecret, export_private_pem,
    export_public_pem, generate_keypair, import_private_pem, import_public_pem, max_wrap_len,
    public_key_fingerprint, unwrap, wrap,
};
pub use error::{CryptoError, CryptoResult};
pub use kek::{KekParams, derive_kek, open_private_key, seal_private_key};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
pub use symmetric::{
    KEY_SIZE, NONCE_SIZE, SymmetricEnvelope, SymmetricKey, TAG_SIZE, decrypt, decrypt_string,
    encrypt, encrypt_string, export_raw, generate_key, import_raw,
};
