//! Cloud client error types.

use sealshare_crypto::CryptoError;
use thiserror::Error;

/// Result type for cloud operations.
pub type CloudResult<T> = Result<T, CloudError>;

/// Errors that can occur while talking to the metadata store or running the
/// file envelope protocol.
#[derive(Debug, Error)]
pub enum CloudError {
    #[error("access denied: {uid} has no wrapped key for file {file_id}")]
    AccessDenied { file_id: String, uid: String },

    #[error("recipient {0} has not published a public key")]
    RecipientKeyMissing(String),

    #[error("identity publication rejected: {0}")]
    PublishRejected(String),

    #[error("no local private key; generate or restore keys first")]
    LocalKeyMissing,

    #[error("identity key restoration failed: {0}")]
    RestoreFailed(CryptoError),

    #[error("share operation denied: {0}")]
    ShareDenied(String),

    #[error("authentication required")]
    AuthRequired,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("API request failed: {0}")]
    Api(String),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("background task failed: {0}")]
    Task(String),
}

/// What the user should do about a failure.
///
/// Lacking access, corrupted data, and a missing local key each need a
/// different action, so callers present these distinctly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Remedy {
    /// Not a registered reader: ask the owner to share the file.
    RequestShare,
    /// Ciphertext or metadata is corrupted: the owner must re-upload.
    Reupload,
    /// Local key absent or unusable: regenerate or wait for restoration.
    RestoreKeys,
    /// Transport-level failure: retry later.
    Retry,
    /// Sign in again.
    Reauthenticate,
    /// Nothing the user can do.
    None,
}

impl CloudError {
    /// Classifies the error for user-facing presentation.
    pub fn remedy(&self) -> Remedy {
        match self {
            CloudError::AccessDenied { .. } | CloudError::Crypto(CryptoError::UnwrapFailed) => {
                Remedy::RequestShare
            }
            CloudError::Crypto(CryptoError::AuthenticationFailed)
            | CloudError::Crypto(CryptoError::Encoding(_)) => Remedy::Reupload,
            CloudError::LocalKeyMissing
            | CloudError::RestoreFailed(_)
            | CloudError::Crypto(CryptoError::MalformedKey(_)) => Remedy::RestoreKeys,
            CloudError::Http(_) | CloudError::Api(_) | CloudError::PublishRejected(_) => {
                Remedy::Retry
            }
            CloudError::AuthRequired | CloudError::AuthFailed(_) => Remedy::Reauthenticate,
            _ => Remedy::None,
        }
    }
}
