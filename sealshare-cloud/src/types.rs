//! Wire types shared with the metadata API.
//!
//! All binary fields travel as standard base64 strings; field names are
//! camelCase.

use crate::error::CloudResult;
use sealshare_crypto::codec::{self, b64};
use sealshare_crypto::{CryptoError, NONCE_SIZE, SymmetricEnvelope, WrappedSecret};
use serde::{Deserialize, Serialize};

/// One reader's copy of a file DEK, wrapped under that reader's public key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrappedKeyEntry {
    pub for_uid: String,
    #[serde(with = "b64")]
    pub wrapped: Vec<u8>,
}

impl WrappedKeyEntry {
    pub fn new(for_uid: impl Into<String>, secret: &WrappedSecret) -> Self {
        Self {
            for_uid: for_uid.into(),
            wrapped: secret.ciphertext.clone(),
        }
    }

    pub fn wrapped_secret(&self) -> WrappedSecret {
        WrappedSecret::rsa_oaep_sha256(self.wrapped.clone())
    }
}

/// Metadata for one stored file.
///
/// `dek_wrapped` is the complete access list: one entry for the owner from
/// upload, plus one per share. Entries are never removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub owner_uid: String,
    #[serde(with = "b64")]
    pub name_enc: Vec<u8>,
    #[serde(with = "b64")]
    pub name_iv: [u8; NONCE_SIZE],
    #[serde(default, alias = "storagePath", skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<String>,
    #[serde(with = "b64")]
    pub content_iv: [u8; NONCE_SIZE],
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name_hint: Option<String>,
    #[serde(default)]
    pub dek_wrapped: Vec<WrappedKeyEntry>,
}

impl FileRecord {
    /// The encrypted filename as a decryptable envelope.
    pub fn name_envelope(&self) -> SymmetricEnvelope {
        SymmetricEnvelope {
            nonce: self.name_iv,
            ciphertext: self.name_enc.clone(),
        }
    }

    /// Pairs downloaded content bytes with this record's content nonce.
    pub fn content_envelope(&self, ciphertext: Vec<u8>) -> SymmetricEnvelope {
        SymmetricEnvelope {
            nonce: self.content_iv,
            ciphertext,
        }
    }

    pub fn entry_for(&self, uid: &str) -> Option<&WrappedKeyEntry> {
        self.dek_wrapped.iter().find(|e| e.for_uid == uid)
    }

    pub fn readers(&self) -> impl Iterator<Item = &str> {
        self.dek_wrapped.iter().map(|e| e.for_uid.as_str())
    }

    pub fn is_owned_by(&self, uid: &str) -> bool {
        self.owner_uid == uid
    }

    /// Appends a reader entry. Returns `false` without modifying the record
    /// when the UID already has one.
    pub fn add_reader(&mut self, entry: WrappedKeyEntry) -> bool {
        if self.entry_for(&entry.for_uid).is_some() {
            return false;
        }
        self.dek_wrapped.push(entry);
        true
    }
}

/// `POST /files/upload` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[serde(with = "b64")]
    pub name_enc: Vec<u8>,
    #[serde(with = "b64")]
    pub name_iv: [u8; NONCE_SIZE],
    #[serde(with = "b64")]
    pub content_iv: [u8; NONCE_SIZE],
    #[serde(rename = "cipherBase64", with = "b64")]
    pub ciphertext: Vec<u8>,
    #[serde(with = "b64")]
    pub dek_wrapped_for_owner: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name_hint: Option<String>,
    pub mime_type: String,
    pub size: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: String,
}

/// `POST /auth/pubkey` body: the public key plus the KEK-sealed private key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishKeyRequest {
    pub pub_key: String,
    #[serde(with = "b64")]
    pub encrypted_private_key: Vec<u8>,
    #[serde(with = "b64")]
    pub private_key_iv: [u8; NONCE_SIZE],
}

impl PublishKeyRequest {
    pub fn new(pub_key: String, sealed_private_key: SymmetricEnvelope) -> Self {
        Self {
            pub_key,
            encrypted_private_key: sealed_private_key.ciphertext,
            private_key_iv: sealed_private_key.nonce,
        }
    }
}

/// `GET /auth/keys` response. Fields are absent for users who never
/// published.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    #[serde(default)]
    pub pub_key: Option<String>,
    #[serde(default)]
    pub encrypted_private_key: Option<String>,
    #[serde(default)]
    pub private_key_iv: Option<String>,
}

impl IdentityRecord {
    /// The sealed private key, if the record carries one.
    pub fn sealed_private_key(&self) -> CloudResult<Option<SymmetricEnvelope>> {
        let (Some(ciphertext), Some(iv)) = (&self.encrypted_private_key, &self.private_key_iv)
        else {
            return Ok(None);
        };
        let iv = codec::decode_b64(iv)?;
        let nonce: [u8; NONCE_SIZE] = iv.as_slice().try_into().map_err(|_| {
            CryptoError::Encoding(format!(
                "private key nonce is {} bytes, expected {NONCE_SIZE}",
                iv.len()
            ))
        })?;
        Ok(Some(SymmetricEnvelope {
            nonce,
            ciphertext: codec::decode_b64(ciphertext)?,
        }))
    }
}

impl From<&PublishKeyRequest> for IdentityRecord {
    fn from(req: &PublishKeyRequest) -> Self {
        Self {
            uid: None,
            pub_key: Some(req.pub_key.clone()),
            encrypted_private_key: Some(codec::encode_b64(&req.encrypted_private_key)),
            private_key_iv: Some(codec::encode_b64(req.private_key_iv)),
        }
    }
}

/// `GET /auth/pubkey/{uid}` response.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyResponse {
    #[serde(default)]
    pub pub_key: Option<String>,
}

/// `POST /files/share` body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRequest {
    pub file_id: String,
    pub for_uid: String,
    #[serde(with = "b64")]
    pub wrapped_dek: Vec<u8>,
}

impl ShareRequest {
    pub fn new(file_id: impl Into<String>, for_uid: impl Into<String>, wrapped: WrappedSecret) -> Self {
        Self {
            file_id: file_id.into(),
            for_uid: for_uid.into(),
            wrapped_dek: wrapped.ciphertext,
        }
    }
}

/// Generic acknowledgement body. `ok: false` is a refusal even on 200.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OkResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OkResponse {
    pub fn accepted() -> Self {
        Self { ok: true, error: None }
    }

    pub fn refused(reason: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(reason.into()),
        }
    }

    pub(crate) fn reason(&self) -> String {
        self.error
            .clone()
            .unwrap_or_else(|| "server responded with ok=false".to_string())
    }
}
