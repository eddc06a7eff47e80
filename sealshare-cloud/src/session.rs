//! Volatile per-process store for the signed-in user's key pair.
//!
//! The whole identity is swapped under one write lock, so readers never see
//! a private key paired with another user's public key. An empty store is
//! the normal state before key generation or restoration.

use crate::identity::IdentityState;
use sealshare_crypto::{
    CryptoResult, KeyPair, RsaPrivateKey, RsaPublicKey, export_private_pem, export_public_pem,
    public_key_fingerprint,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

/// The local plaintext copy of a user's key pair.
pub struct LocalIdentity {
    uid: String,
    keys: KeyPair,
    public_key_pem: String,
    private_key_pem: Zeroizing<String>,
    fingerprint: String,
    state: IdentityState,
}

impl LocalIdentity {
    pub fn new(uid: impl Into<String>, keys: KeyPair, state: IdentityState) -> CryptoResult<Self> {
        Ok(Self {
            uid: uid.into(),
            public_key_pem: export_public_pem(&keys.public)?,
            private_key_pem: export_private_pem(&keys.private)?,
            fingerprint: public_key_fingerprint(&keys.public)?,
            keys,
            state,
        })
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn state(&self) -> IdentityState {
        self.state
    }

    pub fn keys(&self) -> &KeyPair {
        &self.keys
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.keys.public
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.keys.private
    }

    pub fn public_key_pem(&self) -> &str {
        &self.public_key_pem
    }

    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }

    /// Hex SHA-256 of the public key, safe to log.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

impl std::fmt::Debug for LocalIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalIdentity")
            .field("uid", &self.uid)
            .field("fingerprint", &self.fingerprint)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Shared handle to the current local identity.
#[derive(Clone, Default)]
pub struct SessionKeyStore {
    current: Arc<RwLock<Option<Arc<LocalIdentity>>>>,
}

impl SessionKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored identity as one unit.
    pub async fn replace(&self, identity: LocalIdentity) {
        *self.current.write().await = Some(Arc::new(identity));
    }

    /// Returns the stored identity regardless of owner.
    pub async fn get(&self) -> Option<Arc<LocalIdentity>> {
        self.current.read().await.clone()
    }

    /// Returns the stored identity only if it belongs to `uid`.
    pub async fn get_for(&self, uid: &str) -> Option<Arc<LocalIdentity>> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|identity| identity.uid == uid)
            .cloned()
    }

    pub async fn clear(&self) {
        self.current.write().await.take();
    }

    pub async fn is_empty(&self) -> bool {
        self.current.read().await.is_none()
    }
}
