//! SealShare client: end-to-end encrypted file storage and sharing.
//!
//! Provides:
//! - Identity key lifecycle (generate, publish, restore) with KEK-sealed
//!   private keys in the key directory
//! - Per-file envelope encryption with one wrapped DEK per reader
//! - Sharing by re-wrapping a file's DEK for a recipient's public key
//! - API client for the metadata service
//! - Category grouping and search over decrypted names

pub mod api_client;
pub mod category;
pub mod config;
pub mod dek_registry;
pub mod envelope;
pub mod error;
pub mod files;
pub mod identity;
pub mod session;
pub mod types;

pub use api_client::CloudApiClient;
pub use category::{Category, classify};
pub use config::CloudConfig;
pub use envelope::{DecryptedFile, UploadPayload};
pub use error::{CloudError, CloudResult, Remedy};
pub use files::{FileEntry, FileManager};
pub use identity::{IdentityKeyManager, IdentityState, PendingKeyPair};
pub use session::{LocalIdentity, SessionKeyStore};
pub use types::*;
