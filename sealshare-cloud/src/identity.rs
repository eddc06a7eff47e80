//! Identity key lifecycle: generate, publish, restore.
//!
//! A user's RSA key pair is created once, published to the key directory
//! with the private half sealed under the UID-derived KEK, and restored from
//! that record on later sessions. Key generation returns an explicit
//! [`PendingKeyPair`] that [`IdentityKeyManager::publish`] consumes.

use crate::api_client::CloudApiClient;
use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use crate::session::{LocalIdentity, SessionKeyStore};
use crate::types::PublishKeyRequest;
use sealshare_crypto::asymmetric::generate_keypair_with_bits;
use sealshare_crypto::{
    CryptoError, KekParams, KeyPair, RsaPrivateKey, RsaPublicKey, SymmetricEnvelope, derive_kek,
    export_public_pem, import_public_pem, open_private_key, public_key_fingerprint,
    seal_private_key,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where the local key pair came from in this session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityState {
    NoLocalKey,
    /// Generated locally, not yet accepted by the key directory.
    Generated,
    Published,
    /// Recovered from the key directory.
    Restored,
}

impl IdentityState {
    /// Whether a usable private key is held locally.
    pub fn has_local_key(self) -> bool {
        self != IdentityState::NoLocalKey
    }
}

/// A freshly generated key pair awaiting publication.
pub struct PendingKeyPair {
    uid: String,
    keys: KeyPair,
}

impl PendingKeyPair {
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.keys.public
    }

    pub fn public_key_pem(&self) -> CloudResult<String> {
        Ok(export_public_pem(&self.keys.public)?)
    }

    pub fn fingerprint(&self) -> CloudResult<String> {
        Ok(public_key_fingerprint(&self.keys.public)?)
    }
}

impl std::fmt::Debug for PendingKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingKeyPair")
            .field("uid", &self.uid)
            .finish_non_exhaustive()
    }
}

/// Ensures the signed-in user has a usable key pair.
pub struct IdentityKeyManager {
    api: Arc<CloudApiClient>,
    store: SessionKeyStore,
    kek: KekParams,
    modulus_bits: usize,
}

impl IdentityKeyManager {
    pub fn new(api: Arc<CloudApiClient>, store: SessionKeyStore) -> Self {
        let CloudConfig {
            kek, rsa_modulus_bits, ..
        } = api.config().clone();
        Self {
            api,
            store,
            kek,
            modulus_bits: rsa_modulus_bits,
        }
    }

    pub fn store(&self) -> &SessionKeyStore {
        &self.store
    }

    /// Current state for the signed-in user, without touching the network.
    pub async fn state(&self) -> IdentityState {
        self.local_identity()
            .await
            .map_or(IdentityState::NoLocalKey, |identity| identity.state())
    }

    /// Returns the local state, restoring from the key directory when no
    /// local key exists. `NoLocalKey` means the user must generate keys.
    pub async fn ensure_key_pair(&self) -> CloudResult<IdentityState> {
        let uid = self.api.session_uid().await?;
        if let Some(local) = self.store.get_for(&uid).await {
            return Ok(local.state());
        }

        let Some(record) = self.api.get_own_keys().await? else {
            debug!("no identity record for {uid}");
            return Ok(IdentityState::NoLocalKey);
        };
        let Some(sealed) = record.sealed_private_key().map_err(restore_failed)? else {
            debug!("identity record for {uid} holds no sealed private key");
            return Ok(IdentityState::NoLocalKey);
        };

        let keys = self.open_sealed(&uid, sealed).await.map_err(|e| {
            warn!("sealed private key for {uid} did not open: {e}");
            restore_failed(e)
        })?;
        if let Some(pem) = record.pub_key.as_deref() {
            let published = import_public_pem(pem)?;
            if published != keys.public {
                warn!("restored private key for {uid} does not match the published public key");
                return Err(CryptoError::MalformedKey(
                    "restored private key does not match published public key".to_string(),
                )
                .into());
            }
        }

        let identity = LocalIdentity::new(uid, keys, IdentityState::Restored)?;
        info!(
            fingerprint = identity.fingerprint(),
            "restored identity key for {}",
            identity.uid()
        );
        self.store.replace(identity).await;
        Ok(IdentityState::Restored)
    }

    /// Generates a new key pair and holds it locally as unpublished.
    pub async fn generate(&self) -> CloudResult<PendingKeyPair> {
        let uid = self.api.session_uid().await?;
        let bits = self.modulus_bits;
        let keys = tokio::task::spawn_blocking(move || generate_keypair_with_bits(bits))
            .await
            .map_err(|e| CloudError::Task(e.to_string()))??;

        let identity = LocalIdentity::new(uid.clone(), keys.clone(), IdentityState::Generated)?;
        info!(
            fingerprint = identity.fingerprint(),
            "generated {bits}-bit identity key for {uid}"
        );
        self.store.replace(identity).await;
        Ok(PendingKeyPair { uid, keys })
    }

    /// Seals the private key under the KEK and publishes the pair.
    ///
    /// On refusal the key stays local and unpublished; publishing again
    /// overwrites the directory record.
    pub async fn publish(&self, pending: PendingKeyPair) -> CloudResult<IdentityState> {
        let uid = self.api.session_uid().await?;
        if pending.uid != uid {
            return Err(CloudError::AuthFailed(format!(
                "key pair was generated for {}, session is {uid}",
                pending.uid
            )));
        }

        let sealed = self.seal(&uid, &pending.keys.private).await?;
        let request = PublishKeyRequest::new(pending.public_key_pem()?, sealed);

        if let Err(e) = self.api.publish_keys(&request).await {
            warn!("publishing identity key for {uid} failed: {e}");
            return Err(e);
        }

        let identity = LocalIdentity::new(uid, pending.keys, IdentityState::Published)?;
        info!(
            fingerprint = identity.fingerprint(),
            "published identity key for {}",
            identity.uid()
        );
        self.store.replace(identity).await;
        Ok(IdentityState::Published)
    }

    pub async fn generate_and_publish(&self) -> CloudResult<IdentityState> {
        let pending = self.generate().await?;
        self.publish(pending).await
    }

    /// The stored identity, if it belongs to the signed-in user.
    pub async fn local_identity(&self) -> Option<Arc<LocalIdentity>> {
        let uid = self.api.uid().await?;
        self.store.get_for(&uid).await
    }

    pub async fn local_private_key(&self) -> Option<RsaPrivateKey> {
        self.local_identity()
            .await
            .map(|identity| identity.private_key().clone())
    }

    pub async fn local_public_key(&self) -> Option<RsaPublicKey> {
        self.local_identity()
            .await
            .map(|identity| identity.public_key().clone())
    }

    pub async fn local_public_key_pem(&self) -> Option<String> {
        self.local_identity()
            .await
            .map(|identity| identity.public_key_pem().to_string())
    }

    /// Drops the local plaintext key. The published record is untouched.
    pub async fn logout(&self) {
        self.store.clear().await;
        debug!("cleared local identity key");
    }

    async fn seal(&self, uid: &str, private: &RsaPrivateKey) -> CloudResult<SymmetricEnvelope> {
        let uid = uid.to_string();
        let params = self.kek.clone();
        let private = private.clone();
        tokio::task::spawn_blocking(move || {
            let kek = derive_kek(&uid, &params)?;
            seal_private_key(&private, &kek)
        })
        .await
        .map_err(|e| CloudError::Task(e.to_string()))?
        .map_err(CloudError::from)
    }

    async fn open_sealed(&self, uid: &str, sealed: SymmetricEnvelope) -> CloudResult<KeyPair> {
        let uid = uid.to_string();
        let params = self.kek.clone();
        tokio::task::spawn_blocking(move || {
            let kek = derive_kek(&uid, &params)?;
            open_private_key(&sealed, &kek)
        })
        .await
        .map_err(|e| CloudError::Task(e.to_string()))?
        .map_err(CloudError::from)
    }
}

/// Crypto failures while restoring point at the identity key, not the file.
fn restore_failed(err: CloudError) -> CloudError {
    match err {
        CloudError::Crypto(cause) => CloudError::RestoreFailed(cause),
        other => other,
    }
}
