//! # Remote CSV Store
//!
//! [`ItemStore`] backed by a Git-hosting contents API: one CSV file per
//! document path, fetched and updated through JSON endpoints.
//!
//! ## Wire Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  fetch(path)                                                            │
//! │    GET {api_base}/repos/{repo}/contents/{path}?ref={branch}            │
//! │      200 → { content: base64(csv), sha }  → Document                   │
//! │      404 → Document::empty()              (first run, nothing stored)  │
//! │                                                                         │
//! │  upload(path, csv, revision)                                            │
//! │    PUT {api_base}/repos/{repo}/contents/{path}                         │
//! │      body: { message, branch, content: base64(csv), sha? }             │
//! │      200/201 → { content: { sha } }       → new revision token         │
//! │      409/422 → RevisionConflict           (document moved under us)    │
//! │                                                                         │
//! │  The sha IS the revision token. It is opaque to us: we only ever echo  │
//! │  the last one we saw.                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The access token is equally opaque: it goes into the `Authorization`
//! header and is never logged.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::{Document, ItemStore};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const COMMIT_MESSAGE: &str = "Atualização via Precify";

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for the contents API.
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// API root, e.g. `https://api.github.com`.
    pub api_base: String,
    /// `owner/repository` slug holding the documents.
    pub repo: String,
    /// Branch the documents live on.
    pub branch: String,
    /// Opaque access token, sent as-is in the Authorization header.
    pub token: String,
}

// =============================================================================
// Wire Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

#[derive(Debug, Serialize)]
struct UploadRequest<'a> {
    message: &'a str,
    branch: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    content: UploadedContent,
}

#[derive(Debug, Deserialize)]
struct UploadedContent {
    sha: String,
}

// =============================================================================
// Store
// =============================================================================

/// Contents-API-backed document store.
pub struct RemoteCsvStore {
    client: reqwest::Client,
    config: RemoteStoreConfig,
}

impl RemoteCsvStore {
    pub fn new(config: RemoteStoreConfig) -> StoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("precify")
            .build()?;
        Ok(RemoteCsvStore { client, config })
    }

    fn document_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.config.api_base, self.config.repo, path
        )
    }

    fn auth_header(&self) -> String {
        format!("token {}", self.config.token)
    }
}

#[async_trait]
impl ItemStore for RemoteCsvStore {
    async fn fetch(&self, path: &str) -> StoreResult<Document> {
        let response = self
            .client
            .get(self.document_url(path))
            .query(&[("ref", self.config.branch.as_str())])
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(path, "document not found, starting from an empty collection");
            return Ok(Document::empty());
        }

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: ContentsResponse = response.json().await?;

        // The API wraps base64 at 60 columns; strip the newlines first.
        let packed: String = body.content.split_whitespace().collect();
        let bytes = BASE64
            .decode(packed)
            .map_err(|e| StoreError::MalformedDocument(format!("invalid base64: {e}")))?;
        let content = String::from_utf8(bytes)
            .map_err(|e| StoreError::MalformedDocument(format!("invalid UTF-8: {e}")))?;

        debug!(path, bytes = content.len(), "fetched document");
        Ok(Document {
            content,
            revision: Some(body.sha),
        })
    }

    async fn upload(
        &self,
        path: &str,
        content: &str,
        revision: Option<&str>,
    ) -> StoreResult<String> {
        let payload = UploadRequest {
            message: COMMIT_MESSAGE,
            branch: &self.config.branch,
            content: BASE64.encode(content.as_bytes()),
            sha: revision,
        };

        let response = self
            .client
            .put(self.document_url(path))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();

        // 409 is the documented conflict; 422 shows up when the sha is stale
        // or missing for an existing file.
        if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(StoreError::conflict(path));
        }

        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let body: UploadResponse = response.json().await?;
        debug!(path, revision = %body.content.sha, "uploaded document");
        Ok(body.content.sha)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RemoteStoreConfig {
        RemoteStoreConfig {
            api_base: "https://api.github.com".to_string(),
            repo: "acme/precificacao".to_string(),
            branch: "main".to_string(),
            token: "t0k3n".to_string(),
        }
    }

    #[test]
    fn test_document_url_shape() {
        let store = RemoteCsvStore::new(config()).unwrap();
        assert_eq!(
            store.document_url("produtos_papelaria.csv"),
            "https://api.github.com/repos/acme/precificacao/contents/produtos_papelaria.csv"
        );
    }

    #[test]
    fn test_upload_payload_omits_sha_on_create() {
        let payload = UploadRequest {
            message: COMMIT_MESSAGE,
            branch: "main",
            content: BASE64.encode(b"Produto,Qtd\n"),
            sha: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("sha").is_none());

        let payload = UploadRequest { sha: Some("abc123"), ..payload };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["sha"], "abc123");
    }

    #[test]
    fn test_base64_round_trip_with_wrapping() {
        let csv = "Produto,Qtd\nCaderno,10\n";
        let encoded = BASE64.encode(csv.as_bytes());

        // Simulate the 60-column wrapping the API applies
        let wrapped: String = encoded
            .as_bytes()
            .chunks(16)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");

        let packed: String = wrapped.split_whitespace().collect();
        let decoded = BASE64.decode(packed).unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), csv);
    }
}
