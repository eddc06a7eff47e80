//! Shared test helpers: an in-memory metadata API behind wiremock.
//!
//! The fake treats the bearer token as the caller's UID and enforces the
//! same access rules as the real service: only readers listed in
//! `dekWrapped` may fetch a file, only the owner may share or delete.

#![allow(dead_code)]

use sealshare_cloud::{
    CloudApiClient, CloudConfig, FileManager, FileRecord, IdentityKeyManager, IdentityRecord,
    OkResponse, PublishKeyRequest, SessionKeyStore, ShareRequest, UploadRequest, UploadResponse,
    WrappedKeyEntry,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::any;
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

struct StoredFile {
    record: FileRecord,
    blob: Vec<u8>,
}

#[derive(Default)]
struct BackendState {
    identities: HashMap<String, PublishKeyRequest>,
    files: Vec<StoredFile>,
    next_id: u64,
    reject_publish: bool,
    requests: Vec<String>,
}

/// Stateful stand-in for the metadata API and blob store.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<BackendState>>,
}

impl FakeBackend {
    pub fn record(&self, file_id: &str) -> Option<FileRecord> {
        let state = self.state.lock().unwrap();
        state
            .files
            .iter()
            .find(|f| f.record.id == file_id)
            .map(|f| f.record.clone())
    }

    pub fn blob(&self, file_id: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state
            .files
            .iter()
            .find(|f| f.record.id == file_id)
            .map(|f| f.blob.clone())
    }

    pub fn file_count(&self) -> usize {
        self.state.lock().unwrap().files.len()
    }

    pub fn identity(&self, uid: &str) -> Option<PublishKeyRequest> {
        self.state.lock().unwrap().identities.get(uid).cloned()
    }

    pub fn put_identity(&self, uid: &str, req: PublishKeyRequest) {
        self.state
            .lock()
            .unwrap()
            .identities
            .insert(uid.to_string(), req);
    }

    pub fn set_reject_publish(&self, reject: bool) {
        self.state.lock().unwrap().reject_publish = reject;
    }

    /// Applies `f` to the stored record, e.g. to simulate corruption.
    pub fn edit_record(&self, file_id: &str, f: impl FnOnce(&mut FileRecord)) {
        let mut state = self.state.lock().unwrap();
        if let Some(file) = state.files.iter_mut().find(|f| f.record.id == file_id) {
            f(&mut file.record);
        }
    }

    pub fn edit_blob(&self, file_id: &str, f: impl FnOnce(&mut Vec<u8>)) {
        let mut state = self.state.lock().unwrap();
        if let Some(file) = state.files.iter_mut().find(|f| f.record.id == file_id) {
            f(&mut file.blob);
        }
    }

    /// "METHOD /path" for every request seen, in order.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }
}

fn bearer_uid(req: &Request) -> Option<String> {
    let value = req.headers.get("authorization")?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::to_string)
}

fn status(code: u16, error: &str) -> ResponseTemplate {
    ResponseTemplate::new(code).set_body_json(json!({ "error": error }))
}

fn ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(OkResponse::accepted())
}

impl BackendState {
    fn find(&self, file_id: &str) -> Option<&StoredFile> {
        self.files.iter().find(|f| f.record.id == file_id)
    }

    fn readable(&self, uid: &str, file_id: &str) -> Result<&StoredFile, ResponseTemplate> {
        let file = self.find(file_id).ok_or_else(|| status(404, "file not found"))?;
        if file.record.entry_for(uid).is_none() {
            return Err(status(403, "not a reader"));
        }
        Ok(file)
    }

    fn own_keys(&self, uid: &str) -> ResponseTemplate {
        match self.identities.get(uid) {
            Some(req) => {
                let mut record = IdentityRecord::from(req);
                record.uid = Some(uid.to_string());
                ResponseTemplate::new(200).set_body_json(record)
            }
            None => status(404, "no keys"),
        }
    }

    fn publish(&mut self, uid: &str, body: &[u8]) -> ResponseTemplate {
        if self.reject_publish {
            return status(403, "key directory is read-only");
        }
        match serde_json::from_slice::<PublishKeyRequest>(body) {
            Ok(req) => {
                self.identities.insert(uid.to_string(), req);
                ok()
            }
            Err(e) => status(400, &e.to_string()),
        }
    }

    fn public_key(&self, uid: &str) -> ResponseTemplate {
        match self.identities.get(uid) {
            Some(req) => ResponseTemplate::new(200).set_body_json(json!({ "pubKey": req.pub_key })),
            None => status(404, "no public key"),
        }
    }

    fn upload(&mut self, uid: &str, body: &[u8]) -> ResponseTemplate {
        let req: UploadRequest = match serde_json::from_slice(body) {
            Ok(req) => req,
            Err(e) => return status(400, &e.to_string()),
        };
        self.next_id += 1;
        let id = format!("file-{:04}", self.next_id);
        let record = FileRecord {
            id: id.clone(),
            owner_uid: uid.to_string(),
            name_enc: req.name_enc,
            name_iv: req.name_iv,
            content_ref: Some(format!("blobs/{uid}/{id}")),
            content_iv: req.content_iv,
            mime_type: req.mime_type,
            size: req.size,
            original_name_hint: req.original_name_hint,
            dek_wrapped: vec![WrappedKeyEntry {
                for_uid: uid.to_string(),
                wrapped: req.dek_wrapped_for_owner,
            }],
        };
        self.files.push(StoredFile {
            record,
            blob: req.ciphertext,
        });
        ResponseTemplate::new(200).set_body_json(UploadResponse { file_id: id })
    }

    fn list(&self, uid: &str) -> ResponseTemplate {
        let visible: Vec<&FileRecord> = self
            .files
            .iter()
            .map(|f| &f.record)
            .filter(|r| r.entry_for(uid).is_some())
            .collect();
        ResponseTemplate::new(200).set_body_json(visible)
    }

    fn share(&mut self, uid: &str, body: &[u8]) -> ResponseTemplate {
        let req: ShareRequest = match serde_json::from_slice(body) {
            Ok(req) => req,
            Err(e) => return status(400, &e.to_string()),
        };
        let Some(file) = self.files.iter_mut().find(|f| f.record.id == req.file_id) else {
            return status(404, "file not found");
        };
        if !file.record.is_owned_by(uid) {
            return status(403, "only the owner can share");
        }
        let entry = WrappedKeyEntry {
            for_uid: req.for_uid,
            wrapped: req.wrapped_dek,
        };
        if file.record.add_reader(entry) {
            ok()
        } else {
            ResponseTemplate::new(200).set_body_json(OkResponse::refused("already shared"))
        }
    }

    fn delete(&mut self, uid: &str, file_id: &str) -> ResponseTemplate {
        let Some(pos) = self.files.iter().position(|f| f.record.id == file_id) else {
            return status(404, "file not found");
        };
        if !self.files[pos].record.is_owned_by(uid) {
            return status(403, "only the owner can delete");
        }
        self.files.remove(pos);
        ok()
    }
}

impl Respond for FakeBackend {
    fn respond(&self, req: &Request) -> ResponseTemplate {
        let full_path = req.url.path();
        let path = full_path.strip_prefix("/api").unwrap_or(full_path);
        let mut state = self.state.lock().unwrap();
        state.requests.push(format!("{} {path}", req.method.as_str()));

        let Some(uid) = bearer_uid(req) else {
            return status(401, "missing bearer token");
        };
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();

        match (req.method.as_str(), segments.as_slice()) {
            ("GET", ["auth", "keys"]) => state.own_keys(&uid),
            ("POST", ["auth", "pubkey"]) => state.publish(&uid, &req.body),
            ("GET", ["auth", "pubkey", target]) => state.public_key(target),
            ("POST", ["files", "upload"]) => state.upload(&uid, &req.body),
            ("GET", ["files"]) => state.list(&uid),
            ("GET", ["files", "download", id]) => match state.readable(&uid, id) {
                Ok(file) => ResponseTemplate::new(200).set_body_json(&file.record),
                Err(resp) => resp,
            },
            ("GET", ["files", "raw", id]) => match state.readable(&uid, id) {
                Ok(file) => ResponseTemplate::new(200).set_body_bytes(file.blob.clone()),
                Err(resp) => resp,
            },
            ("POST", ["files", "share"]) => state.share(&uid, &req.body),
            ("DELETE", ["files", id]) => state.delete(&uid, id),
            _ => status(404, "no such route"),
        }
    }
}

/// Starts a wiremock server backed by a fresh [`FakeBackend`].
pub async fn start_backend() -> (MockServer, FakeBackend) {
    init_tracing();
    let server = MockServer::start().await;
    let backend = FakeBackend::default();
    Mock::given(any())
        .respond_with(backend.clone())
        .mount(&server)
        .await;
    (server, backend)
}

pub fn config_for(server: &MockServer) -> CloudConfig {
    CloudConfig::for_base_url(format!("{}/api", server.uri()))
}

/// One signed-in client with its own session key store.
pub struct TestUser {
    pub uid: String,
    pub api: Arc<CloudApiClient>,
    pub identity: Arc<IdentityKeyManager>,
    pub files: FileManager,
}

pub async fn signed_in(server: &MockServer, uid: &str) -> TestUser {
    let api = Arc::new(CloudApiClient::new(config_for(server)).expect("client"));
    api.set_session(uid, uid).await;
    let identity = Arc::new(IdentityKeyManager::new(api.clone(), SessionKeyStore::new()));
    let files = FileManager::new(api.clone(), identity.clone());
    TestUser {
        uid: uid.to_string(),
        api,
        identity,
        files,
    }
}

/// A signed-in user whose key pair is generated and published.
pub async fn published(server: &MockServer, uid: &str) -> TestUser {
    let user = signed_in(server, uid).await;
    user.identity
        .generate_and_publish()
        .await
        .expect("publish identity");
    user
}
