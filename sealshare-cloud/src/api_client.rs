//! HTTP client for the metadata API.
//!
//! Carries the identity provider session (UID and bearer token) and exposes
//! the key directory and file endpoints. Status codes are mapped to
//! [`CloudError`] variants per endpoint so callers can tell refusal, absence,
//! and transport failure apart.

use crate::config::CloudConfig;
use crate::error::{CloudError, CloudResult};
use crate::types::*;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Default)]
struct SessionState {
    uid: Option<String>,
    token: Option<String>,
}

/// HTTP client for the SealShare metadata API.
pub struct CloudApiClient {
    client: Client,
    config: CloudConfig,
    session: Arc<RwLock<SessionState>>,
}

impl CloudApiClient {
    pub fn new(config: CloudConfig) -> CloudResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| CloudError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            session: Arc::new(RwLock::new(SessionState::default())),
        })
    }

    pub fn config(&self) -> &CloudConfig {
        &self.config
    }

    /// Installs the identity provider session.
    pub async fn set_session(&self, uid: impl Into<String>, token: impl Into<String>) {
        let mut session = self.session.write().await;
        session.uid = Some(uid.into());
        session.token = Some(token.into());
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.token.is_some()
    }

    pub async fn uid(&self) -> Option<String> {
        self.session.read().await.uid.clone()
    }

    /// The session UID, or `AuthRequired` when signed out.
    pub async fn session_uid(&self) -> CloudResult<String> {
        self.uid().await.ok_or(CloudError::AuthRequired)
    }

    pub async fn logout(&self) {
        let mut session = self.session.write().await;
        session.uid = None;
        session.token = None;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url(), path)
    }

    async fn token(&self) -> CloudResult<String> {
        self.session
            .read()
            .await
            .token
            .clone()
            .ok_or(CloudError::AuthRequired)
    }

    async fn authed(&self, method: Method, path: &str) -> CloudResult<RequestBuilder> {
        let token = self.token().await?;
        Ok(self.client.request(method, self.url(path)).bearer_auth(token))
    }

    async fn auth_get(&self, path: &str) -> CloudResult<Response> {
        debug!("GET {path}");
        Ok(self.authed(Method::GET, path).await?.send().await?)
    }

    async fn auth_post(&self, path: &str, body: &impl Serialize) -> CloudResult<Response> {
        debug!("POST {path}");
        Ok(self
            .authed(Method::POST, path)
            .await?
            .json(body)
            .send()
            .await?)
    }

    async fn auth_delete(&self, path: &str) -> CloudResult<Response> {
        debug!("DELETE {path}");
        Ok(self.authed(Method::DELETE, path).await?.send().await?)
    }

    // ── Key directory ──

    /// Fetches the caller's own identity record. `None` when the user has
    /// never published.
    pub async fn get_own_keys(&self) -> CloudResult<Option<IdentityRecord>> {
        let resp = self.auth_get("/auth/keys").await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = ensure_success(resp).await?;
        Ok(Some(resp.json().await?))
    }

    /// Publishes the public key and sealed private key, overwriting any
    /// previous record.
    pub async fn publish_keys(&self, req: &PublishKeyRequest) -> CloudResult<()> {
        let resp = self.auth_post("/auth/pubkey", req).await?;
        if resp.status() == StatusCode::FORBIDDEN || resp.status() == StatusCode::CONFLICT {
            return Err(CloudError::PublishRejected(error_detail(resp).await));
        }
        let ack: OkResponse = ensure_success(resp).await?.json().await?;
        if !ack.ok {
            return Err(CloudError::PublishRejected(ack.reason()));
        }
        Ok(())
    }

    /// Looks up another user's public key PEM.
    pub async fn get_public_key(&self, uid: &str) -> CloudResult<String> {
        let resp = self.auth_get(&format!("/auth/pubkey/{uid}")).await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(CloudError::RecipientKeyMissing(uid.to_string()));
        }
        let data: PublicKeyResponse = ensure_success(resp).await?.json().await?;
        data.pub_key
            .filter(|pem| !pem.trim().is_empty())
            .ok_or_else(|| CloudError::RecipientKeyMissing(uid.to_string()))
    }

    // ── Files ──

    pub async fn upload_file(&self, req: &UploadRequest) -> CloudResult<String> {
        let resp = self.auth_post("/files/upload", req).await?;
        let data: UploadResponse = ensure_success(resp).await?.json().await?;
        Ok(data.file_id)
    }

    /// Lists every file the caller can read: owned and shared. Records that
    /// do not parse are skipped so one bad entry cannot hide the rest.
    pub async fn list_files(&self) -> CloudResult<Vec<FileRecord>> {
        let resp = self.auth_get("/files/").await?;
        let raw: Vec<serde_json::Value> = ensure_success(resp).await?.json().await?;
        Ok(raw
            .into_iter()
            .filter_map(|value| {
                let id = value
                    .get("_id")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("<no id>")
                    .to_string();
                match serde_json::from_value::<FileRecord>(value) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!("skipping malformed file record {id}: {e}");
                        None
                    }
                }
            })
            .collect())
    }

    pub async fn get_file(&self, file_id: &str) -> CloudResult<FileRecord> {
        let resp = self.auth_get(&format!("/files/download/{file_id}")).await?;
        self.check_file_access(&resp, file_id).await?;
        Ok(ensure_success(resp).await?.json().await?)
    }

    /// Fetches the content ciphertext from the blob store.
    pub async fn download_raw(&self, file_id: &str) -> CloudResult<Vec<u8>> {
        let resp = self.auth_get(&format!("/files/raw/{file_id}")).await?;
        self.check_file_access(&resp, file_id).await?;
        let bytes = ensure_success(resp).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Appends one reader entry to a file's access list.
    pub async fn share_file(&self, req: &ShareRequest) -> CloudResult<()> {
        let resp = self.auth_post("/files/share", req).await?;
        match resp.status() {
            StatusCode::FORBIDDEN | StatusCode::CONFLICT => {
                return Err(CloudError::ShareDenied(error_detail(resp).await));
            }
            StatusCode::NOT_FOUND => return Err(CloudError::NotFound(req.file_id.clone())),
            _ => {}
        }
        let ack: OkResponse = ensure_success(resp).await?.json().await?;
        if !ack.ok {
            return Err(CloudError::ShareDenied(ack.reason()));
        }
        Ok(())
    }

    pub async fn delete_file(&self, file_id: &str) -> CloudResult<()> {
        let resp = self.auth_delete(&format!("/files/{file_id}")).await?;
        self.check_file_access(&resp, file_id).await?;
        ensure_success(resp).await?;
        Ok(())
    }

    async fn check_file_access(&self, resp: &Response, file_id: &str) -> CloudResult<()> {
        match resp.status() {
            StatusCode::FORBIDDEN => Err(CloudError::AccessDenied {
                file_id: file_id.to_string(),
                uid: self.uid().await.unwrap_or_default(),
            }),
            StatusCode::NOT_FOUND => Err(CloudError::NotFound(format!("file {file_id}"))),
            _ => Ok(()),
        }
    }
}

/// Maps the statuses every endpoint treats the same way.
async fn ensure_success(resp: Response) -> CloudResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let detail = error_detail(resp).await;
    Err(match status {
        StatusCode::UNAUTHORIZED => CloudError::AuthFailed(detail),
        StatusCode::NOT_FOUND => CloudError::NotFound(detail),
        _ => CloudError::Api(detail),
    })
}

async fn error_detail(resp: Response) -> String {
    let status = resp.status();
    match resp.text().await {
        Ok(body) if !body.trim().is_empty() => format!("{status}: {}", body.trim()),
        _ => status.to_string(),
    }
}
