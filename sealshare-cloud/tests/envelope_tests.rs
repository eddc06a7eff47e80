//! File envelope protocol: upload encryption, reader access, sharing.
//!
//! Validates that:
//! - Only UIDs with a `dekWrapped` entry can decrypt
//! - Sharing appends a wrap of the same DEK without touching content
//! - Tampered name or content fails closed
//! - Display names fall back to hints, then a placeholder

use pretty_assertions::assert_eq;
use sealshare_cloud::envelope::{
    ENCRYPTED_NAME_PLACEHOLDER, decrypt_for_read, decrypt_name, display_name, encrypt_for_upload,
    open_file_dek, share_with,
};
use sealshare_cloud::{CloudError, FileRecord, Remedy, WrappedKeyEntry};
use sealshare_crypto::{CryptoError, KeyPair, TAG_SIZE, generate_key, generate_keypair};
use std::sync::OnceLock;

fn alice() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| generate_keypair().expect("keygen"))
}

fn bob() -> &'static KeyPair {
    static KEYS: OnceLock<KeyPair> = OnceLock::new();
    KEYS.get_or_init(|| generate_keypair().expect("keygen"))
}

const REPORT: &[u8] = b"%PDF-1.7 quarterly figures attached.\n";

/// Uploads as Alice and returns what the server would store.
fn uploaded(bytes: &[u8], name: &str) -> (FileRecord, Vec<u8>, sealshare_crypto::SymmetricKey) {
    let payload = encrypt_for_upload(bytes, name, "application/pdf", &alice().public).unwrap();
    let req = payload.request;
    let record = FileRecord {
        id: "file-1".into(),
        owner_uid: "uid-a".into(),
        name_enc: req.name_enc,
        name_iv: req.name_iv,
        content_ref: Some("blobs/file-1".into()),
        content_iv: req.content_iv,
        mime_type: req.mime_type,
        size: req.size,
        original_name_hint: req.original_name_hint,
        dek_wrapped: vec![WrappedKeyEntry {
            for_uid: "uid-a".into(),
            wrapped: req.dek_wrapped_for_owner,
        }],
    };
    (record, req.ciphertext, payload.dek)
}

// ── Upload ──

#[test]
fn upload_payload_hides_content_and_name() {
    let payload = encrypt_for_upload(REPORT, "report.pdf", "application/pdf", &alice().public).unwrap();
    let req = &payload.request;

    assert_eq!(req.ciphertext.len(), REPORT.len() + TAG_SIZE);
    assert_ne!(&req.ciphertext[..REPORT.len()], REPORT);
    assert_eq!(req.name_enc.len(), "report.pdf".len() + TAG_SIZE);
    assert_ne!(req.name_iv, req.content_iv);
    assert_eq!(req.size, REPORT.len() as u64);
    assert_eq!(req.mime_type, "application/pdf");
    assert_eq!(req.original_name_hint.as_deref(), Some("report.pdf"));
    assert_eq!(req.dek_wrapped_for_owner.len(), 256);
}

#[test]
fn each_upload_uses_a_fresh_dek() {
    let (_, _, dek1) = uploaded(REPORT, "a.pdf");
    let (_, _, dek2) = uploaded(REPORT, "a.pdf");
    assert_ne!(dek1.as_bytes(), dek2.as_bytes());
}

#[test]
fn empty_file_roundtrips() {
    let (record, ciphertext, _) = uploaded(b"", "empty.txt");
    let file = decrypt_for_read(&record, ciphertext, "uid-a", &alice().private).unwrap();
    assert!(file.bytes.is_empty());
    assert_eq!(file.name, "empty.txt");
}

// ── Read ──

#[test]
fn owner_reads_back_name_and_bytes() {
    let (record, ciphertext, _) = uploaded(REPORT, "report.pdf");
    let file = decrypt_for_read(&record, ciphertext, "uid-a", &alice().private).unwrap();

    assert_eq!(file.name, "report.pdf");
    assert_eq!(file.bytes, REPORT);
    assert_eq!(file.mime_type, "application/pdf");
}

#[test]
fn non_reader_is_access_denied() {
    let (record, ciphertext, _) = uploaded(REPORT, "report.pdf");
    let err = decrypt_for_read(&record, ciphertext, "uid-b", &bob().private).unwrap_err();

    assert!(matches!(
        err,
        CloudError::AccessDenied { ref file_id, ref uid } if file_id == "file-1" && uid == "uid-b"
    ));
    assert_eq!(err.remedy(), Remedy::RequestShare);
}

#[test]
fn entry_under_wrong_uid_fails_to_unwrap() {
    // A mislabeled entry: Bob's UID pointing at a DEK wrapped for Alice.
    let (mut record, ciphertext, _) = uploaded(REPORT, "report.pdf");
    record.dek_wrapped[0].for_uid = "uid-b".into();

    let err = decrypt_for_read(&record, ciphertext, "uid-b", &bob().private).unwrap_err();
    assert!(matches!(err, CloudError::Crypto(CryptoError::UnwrapFailed)));
}

#[test]
fn tampered_content_fails_closed() {
    let (record, mut ciphertext, _) = uploaded(REPORT, "report.pdf");
    ciphertext[3] ^= 0x80;

    let err = decrypt_for_read(&record, ciphertext, "uid-a", &alice().private).unwrap_err();
    assert!(matches!(err, CloudError::Crypto(CryptoError::AuthenticationFailed)));
    assert_eq!(err.remedy(), Remedy::Reupload);
}

#[test]
fn tampered_name_fails_closed() {
    let (mut record, ciphertext, _) = uploaded(REPORT, "report.pdf");
    record.name_enc[0] ^= 0x01;

    let err = decrypt_for_read(&record, ciphertext, "uid-a", &alice().private).unwrap_err();
    assert!(matches!(err, CloudError::Crypto(CryptoError::AuthenticationFailed)));
}

#[test]
fn swapped_content_nonce_fails_closed() {
    let (mut record, ciphertext, _) = uploaded(REPORT, "report.pdf");
    record.content_iv = record.name_iv;

    assert!(decrypt_for_read(&record, ciphertext, "uid-a", &alice().private).is_err());
}

// ── Share ──

#[test]
fn share_grants_access_without_touching_content() {
    let (mut record, ciphertext, dek) = uploaded(REPORT, "report.pdf");
    let before = record.clone();

    let wrapped = share_with(&record, "uid-b", &bob().public, &dek).unwrap();
    assert!(record.add_reader(WrappedKeyEntry::new("uid-b", &wrapped)));

    assert_eq!(record.name_enc, before.name_enc);
    assert_eq!(record.name_iv, before.name_iv);
    assert_eq!(record.content_iv, before.content_iv);
    assert_eq!(record.dek_wrapped[0], before.dek_wrapped[0]);
    assert_eq!(record.readers().collect::<Vec<_>>(), vec!["uid-a", "uid-b"]);

    let for_bob = decrypt_for_read(&record, ciphertext.clone(), "uid-b", &bob().private).unwrap();
    let for_alice = decrypt_for_read(&record, ciphertext, "uid-a", &alice().private).unwrap();
    assert_eq!(for_bob, for_alice);
    assert_eq!(for_bob.bytes, REPORT);
}

#[test]
fn both_readers_unwrap_the_same_dek() {
    let (mut record, _, dek) = uploaded(REPORT, "report.pdf");
    let wrapped = share_with(&record, "uid-b", &bob().public, &dek).unwrap();
    record.add_reader(WrappedKeyEntry::new("uid-b", &wrapped));

    let a = open_file_dek(&record, "uid-a", &alice().private).unwrap();
    let b = open_file_dek(&record, "uid-b", &bob().private).unwrap();
    assert_eq!(a.as_bytes(), b.as_bytes());
    assert_eq!(a.as_bytes(), dek.as_bytes());
}

#[test]
fn share_refuses_existing_reader() {
    let (record, _, dek) = uploaded(REPORT, "report.pdf");
    let err = share_with(&record, "uid-a", &alice().public, &dek).unwrap_err();
    assert!(matches!(err, CloudError::ShareDenied(_)));
}

#[test]
fn share_refuses_foreign_dek() {
    let (record, _, _) = uploaded(REPORT, "report.pdf");
    let other = generate_key().unwrap();

    let err = share_with(&record, "uid-b", &bob().public, &other).unwrap_err();
    assert!(matches!(err, CloudError::ShareDenied(ref m) if m.contains("does not belong")));
}

// ── Display names ──

#[test]
fn display_name_prefers_decrypted_name() {
    let (mut record, _, dek) = uploaded(REPORT, "report.pdf");
    record.original_name_hint = Some("misleading.exe".into());

    assert_eq!(display_name(&record, "uid-a", Some(&alice().private)), "report.pdf");
    assert_eq!(decrypt_name(&record, &dek).unwrap(), "report.pdf");
}

#[test]
fn display_name_falls_back_to_hint_then_placeholder() {
    let (mut record, _, _) = uploaded(REPORT, "report.pdf");

    assert_eq!(display_name(&record, "uid-b", Some(&bob().private)), "report.pdf");
    assert_eq!(display_name(&record, "uid-a", None), "report.pdf");

    record.original_name_hint = None;
    assert_eq!(display_name(&record, "uid-a", None), ENCRYPTED_NAME_PLACEHOLDER);

    record.original_name_hint = Some(String::new());
    assert_eq!(display_name(&record, "uid-b", Some(&bob().private)), ENCRYPTED_NAME_PLACEHOLDER);
}
