//! Per-file envelope encryption.
//!
//! Each upload gets a fresh DEK that encrypts both content and filename
//! under independent nonces. The DEK is wrapped once for the owner; sharing
//! wraps the same DEK for one more reader and never re-encrypts content.
//! Access is permanent: there is no operation that removes a reader.
//!
//! Everything here is pure over its inputs; network I/O lives in
//! [`crate::files`].

use crate::error::{CloudError, CloudResult};
use crate::types::{FileRecord, UploadRequest};
use sealshare_crypto::{
    RsaPrivateKey, RsaPublicKey, SymmetricKey, WrappedSecret, decrypt, decrypt_string, encrypt,
    encrypt_string, generate_key, import_raw, unwrap, wrap,
};

/// Shown when neither the decrypted name nor a hint is available.
pub const ENCRYPTED_NAME_PLACEHOLDER: &str = "(encrypted name)";

/// Output of [`encrypt_for_upload`]: the request body plus the DEK, kept so
/// the owner can share without unwrapping again.
pub struct UploadPayload {
    pub request: UploadRequest,
    pub dek: SymmetricKey,
}

/// A file decrypted for its reader.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecryptedFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Encrypts a file and its name under a fresh DEK wrapped for the owner.
pub fn encrypt_for_upload(
    bytes: &[u8],
    name: &str,
    mime_type: &str,
    owner_public: &RsaPublicKey,
) -> CloudResult<UploadPayload> {
    let dek = generate_key()?;
    let content = encrypt(&dek, bytes)?;
    let encrypted_name = encrypt_string(&dek, name)?;
    let wrapped = wrap(owner_public, dek.as_bytes())?;

    let request = UploadRequest {
        name_enc: encrypted_name.ciphertext,
        name_iv: encrypted_name.nonce,
        content_iv: content.nonce,
        ciphertext: content.ciphertext,
        dek_wrapped_for_owner: wrapped.ciphertext,
        original_name_hint: (!name.is_empty()).then(|| name.to_string()),
        mime_type: mime_type.to_string(),
        size: bytes.len() as u64,
    };
    Ok(UploadPayload { request, dek })
}

/// Unwraps the caller's copy of the file DEK.
pub fn open_file_dek(
    record: &FileRecord,
    my_uid: &str,
    my_private: &RsaPrivateKey,
) -> CloudResult<SymmetricKey> {
    let entry = record
        .entry_for(my_uid)
        .ok_or_else(|| CloudError::AccessDenied {
            file_id: record.id.clone(),
            uid: my_uid.to_string(),
        })?;
    let raw = unwrap(my_private, &entry.wrapped_secret())?;
    Ok(import_raw(&raw)?)
}

pub fn decrypt_name(record: &FileRecord, dek: &SymmetricKey) -> CloudResult<String> {
    Ok(decrypt_string(dek, &record.name_envelope())?)
}

/// Decrypts name and content with an already opened DEK.
pub fn decrypt_with_dek(
    record: &FileRecord,
    ciphertext: Vec<u8>,
    dek: &SymmetricKey,
) -> CloudResult<DecryptedFile> {
    let name = decrypt_name(record, dek)?;
    let bytes = decrypt(dek, &record.content_envelope(ciphertext))?;
    Ok(DecryptedFile {
        name,
        mime_type: record.mime_type.clone(),
        bytes,
    })
}

/// Opens the caller's DEK entry and decrypts the file.
pub fn decrypt_for_read(
    record: &FileRecord,
    ciphertext: Vec<u8>,
    my_uid: &str,
    my_private: &RsaPrivateKey,
) -> CloudResult<DecryptedFile> {
    let dek = open_file_dek(record, my_uid, my_private)?;
    decrypt_with_dek(record, ciphertext, &dek)
}

/// Wraps the file DEK for one more reader.
///
/// The DEK must open the record's name envelope, so a key belonging to a
/// different file cannot be shared under this record. Recipients who
/// already hold an entry are refused.
pub fn share_with(
    record: &FileRecord,
    recipient_uid: &str,
    recipient_public: &RsaPublicKey,
    dek: &SymmetricKey,
) -> CloudResult<WrappedSecret> {
    if record.entry_for(recipient_uid).is_some() {
        return Err(CloudError::ShareDenied(format!(
            "{recipient_uid} already has access to file {}",
            record.id
        )));
    }
    if decrypt_name(record, dek).is_err() {
        return Err(CloudError::ShareDenied(format!(
            "key does not belong to file {}",
            record.id
        )));
    }
    Ok(wrap(recipient_public, dek.as_bytes())?)
}

/// Best available name for display: decrypted, then the plaintext hint,
/// then a placeholder. The hint is never treated as authoritative.
pub fn display_name(record: &FileRecord, my_uid: &str, my_private: Option<&RsaPrivateKey>) -> String {
    let decrypted = my_private
        .and_then(|private| open_file_dek(record, my_uid, private).ok())
        .and_then(|dek| decrypt_name(record, &dek).ok());
    decrypted.unwrap_or_else(|| fallback_name(record))
}

pub(crate) fn fallback_name(record: &FileRecord) -> String {
    record
        .original_name_hint
        .clone()
        .filter(|hint| !hint.is_empty())
        .unwrap_or_else(|| ENCRYPTED_NAME_PLACEHOLDER.to_string())
}
