//! File operations against the metadata API.
//!
//! Wires the envelope functions to the HTTP surface: upload, list, download,
//! share, delete. Owner DEKs produced at upload are cached in the
//! [`DekRegistry`] for later sharing.

use crate::api_client::CloudApiClient;
use crate::category::{Category, classify, matches_query};
use crate::dek_registry::DekRegistry;
use crate::envelope::{self, DecryptedFile};
use crate::error::{CloudError, CloudResult};
use crate::identity::IdentityKeyManager;
use crate::session::LocalIdentity;
use crate::types::{FileRecord, ShareRequest};
use sealshare_crypto::{SymmetricKey, import_public_pem};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// A listed file as the signed-in user sees it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub id: String,
    pub display_name: String,
    pub category: Category,
    pub mime_type: String,
    pub size: u64,
    pub owner_uid: String,
    pub owned: bool,
    /// Number of readers besides the owner.
    pub shared_with: usize,
}

impl FileEntry {
    fn from_record(record: &FileRecord, uid: &str, identity: Option<&LocalIdentity>) -> Self {
        let display_name =
            envelope::display_name(record, uid, identity.map(LocalIdentity::private_key));
        Self {
            id: record.id.clone(),
            category: classify(&display_name),
            display_name,
            mime_type: record.mime_type.clone(),
            size: record.size,
            owner_uid: record.owner_uid.clone(),
            owned: record.is_owned_by(uid),
            shared_with: record.readers().filter(|r| *r != record.owner_uid).count(),
        }
    }
}

/// Groups entries by category. Every category is present, possibly empty.
pub fn group_by_category(entries: Vec<FileEntry>) -> BTreeMap<Category, Vec<FileEntry>> {
    let mut groups: BTreeMap<Category, Vec<FileEntry>> =
        Category::ALL.iter().map(|c| (*c, Vec::new())).collect();
    for entry in entries {
        groups.entry(entry.category).or_default().push(entry);
    }
    groups
}

/// Entries whose display name contains `query`, case-insensitively.
pub fn search<'a>(entries: &'a [FileEntry], query: &str) -> Vec<&'a FileEntry> {
    entries
        .iter()
        .filter(|entry| matches_query(&entry.display_name, query))
        .collect()
}

/// High-level file operations for the signed-in user.
pub struct FileManager {
    api: Arc<CloudApiClient>,
    identity: Arc<IdentityKeyManager>,
    deks: DekRegistry,
    /// UID whose DEKs are currently cached.
    deks_owner: Mutex<Option<String>>,
}

impl FileManager {
    pub fn new(api: Arc<CloudApiClient>, identity: Arc<IdentityKeyManager>) -> Self {
        Self {
            api,
            identity,
            deks: DekRegistry::new(),
            deks_owner: Mutex::new(None),
        }
    }

    pub fn dek_registry(&self) -> &DekRegistry {
        &self.deks
    }

    /// The DEK cache for `uid`, emptied first if another user filled it.
    async fn deks_for(&self, uid: &str) -> &DekRegistry {
        let mut owner = self.deks_owner.lock().await;
        if owner.as_deref() != Some(uid) {
            if let Some(previous) = owner.as_deref() {
                debug!("session moved from {previous} to {uid}; dropping cached DEKs");
            }
            self.deks.clear().await;
            *owner = Some(uid.to_string());
        }
        &self.deks
    }

    async fn require_identity(&self) -> CloudResult<Arc<LocalIdentity>> {
        self.identity
            .local_identity()
            .await
            .ok_or(CloudError::LocalKeyMissing)
    }

    /// Encrypts and uploads a file. Returns the new file id.
    pub async fn upload(&self, bytes: &[u8], name: &str, mime_type: &str) -> CloudResult<String> {
        let identity = self.require_identity().await?;
        let payload = envelope::encrypt_for_upload(bytes, name, mime_type, identity.public_key())?;

        let file_id = self.api.upload_file(&payload.request).await?;
        self.deks_for(identity.uid())
            .await
            .insert(file_id.clone(), payload.dek)
            .await;
        info!("uploaded file {file_id} ({} bytes)", bytes.len());
        Ok(file_id)
    }

    /// Every file the user owns or has been granted.
    pub async fn list(&self) -> CloudResult<Vec<FileRecord>> {
        self.api.list_files().await
    }

    /// Listed files with decrypted display names, in server order.
    pub async fn list_entries(&self) -> CloudResult<Vec<FileEntry>> {
        let uid = self.api.session_uid().await?;
        let identity = self.identity.local_identity().await;
        let records = self.api.list_files().await?;
        Ok(records
            .iter()
            .map(|record| FileEntry::from_record(record, &uid, identity.as_deref()))
            .collect())
    }

    pub async fn list_by_category(&self) -> CloudResult<BTreeMap<Category, Vec<FileEntry>>> {
        Ok(group_by_category(self.list_entries().await?))
    }

    /// Fetches and decrypts a file. Access is checked before content bytes
    /// are downloaded.
    pub async fn download(&self, file_id: &str) -> CloudResult<DecryptedFile> {
        let identity = self.require_identity().await?;
        let record = self.api.get_file(file_id).await?;
        let dek = self.file_dek(&record, &identity).await?;

        let ciphertext = self.api.download_raw(file_id).await?;
        let file = envelope::decrypt_with_dek(&record, ciphertext, &dek)?;
        debug!("decrypted file {file_id} ({} bytes)", file.bytes.len());
        Ok(file)
    }

    /// Grants `recipient_uid` read access by wrapping the file DEK for
    /// their published public key.
    pub async fn share(&self, file_id: &str, recipient_uid: &str) -> CloudResult<()> {
        let identity = self.require_identity().await?;
        let record = self.api.get_file(file_id).await?;
        if record.entry_for(recipient_uid).is_some() {
            return Err(CloudError::ShareDenied(format!(
                "{recipient_uid} already has access to file {file_id}"
            )));
        }
        let dek = self.file_dek(&record, &identity).await?;

        let recipient_pem = self.api.get_public_key(recipient_uid).await?;
        let recipient_public = import_public_pem(&recipient_pem)?;
        let wrapped = envelope::share_with(&record, recipient_uid, &recipient_public, &dek)?;

        self.api
            .share_file(&ShareRequest::new(file_id, recipient_uid, wrapped))
            .await?;
        info!("shared file {file_id} with {recipient_uid}");
        Ok(())
    }

    pub async fn delete(&self, file_id: &str) -> CloudResult<()> {
        self.api.delete_file(file_id).await?;
        self.deks.remove(file_id).await;
        info!("deleted file {file_id}");
        Ok(())
    }

    /// Drops cached DEKs and the local identity key.
    pub async fn logout(&self) {
        *self.deks_owner.lock().await = None;
        self.deks.clear().await;
        self.identity.logout().await;
    }

    async fn file_dek(&self, record: &FileRecord, identity: &LocalIdentity) -> CloudResult<SymmetricKey> {
        if record.entry_for(identity.uid()).is_none() {
            return Err(CloudError::AccessDenied {
                file_id: record.id.clone(),
                uid: identity.uid().to_string(),
            });
        }
        let deks = self.deks_for(identity.uid()).await;
        if let Some(dek) = deks.get(&record.id).await {
            return Ok(dek);
        }
        let dek = envelope::open_file_dek(record, identity.uid(), identity.private_key())?;
        deks.insert(record.id.clone(), dek.clone()).await;
        Ok(dek)
    }
}
