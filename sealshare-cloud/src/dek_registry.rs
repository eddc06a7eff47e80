//! Thread-safe cache of per-file data encryption keys.
//!
//! Populated at upload (and whenever a DEK is unwrapped for sharing or
//! download) so the owner can share without another RSA unwrap. Keys are
//! zeroized when evicted or dropped.

use sealshare_crypto::SymmetricKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// File DEKs keyed by file id.
#[derive(Clone)]
pub struct DekRegistry {
    deks: Arc<RwLock<HashMap<String, SymmetricKey>>>,
}

impl DekRegistry {
    pub fn new() -> Self {
        Self {
            deks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers the DEK for a file, replacing any previous one.
    pub async fn insert(&self, file_id: impl Into<String>, dek: SymmetricKey) {
        self.deks.write().await.insert(file_id.into(), dek);
    }

    pub async fn get(&self, file_id: &str) -> Option<SymmetricKey> {
        self.deks.read().await.get(file_id).cloned()
    }

    pub async fn contains(&self, file_id: &str) -> bool {
        self.deks.read().await.contains_key(file_id)
    }

    /// Removes a DEK (e.g. after file deletion).
    pub async fn remove(&self, file_id: &str) -> Option<SymmetricKey> {
        self.deks.write().await.remove(file_id)
    }

    /// Drops every cached key, e.g. on sign-out.
    pub async fn clear(&self) {
        self.deks.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.deks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.deks.read().await.is_empty()
    }
}

impl Default for DekRegistry {
    fn default() -> Self {
        Self::new()
    }
}
