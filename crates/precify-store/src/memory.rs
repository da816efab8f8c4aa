//! # In-Memory Store
//!
//! A process-local [`ItemStore`] with the same revision-check semantics as
//! the remote one. Used by tests and by offline sessions (work locally, never
//! persist anywhere).
//!
//! Revision tokens are monotonic counters rendered as strings, so conflict
//! behavior can be exercised deterministically.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::store::{Document, ItemStore};

#[derive(Debug, Default)]
struct StoredDoc {
    content: String,
    revision: u64,
}

/// In-process document store keyed by path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<HashMap<String, StoredDoc>>,
    fail_uploads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent upload fail with a synthetic API error, so the
    /// session layer's keep-working-on-failure path can be tested.
    pub fn set_fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Writes a document directly, bypassing the revision check. Test setup
    /// helper standing in for "someone else edited the remote file".
    pub async fn seed(&self, path: &str, content: &str) {
        let mut docs = self.docs.lock().await;
        let entry = docs.entry(path.to_string()).or_default();
        entry.content = content.to_string();
        entry.revision += 1;
    }
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn fetch(&self, path: &str) -> StoreResult<Document> {
        let docs = self.docs.lock().await;
        Ok(match docs.get(path) {
            Some(doc) => Document {
                content: doc.content.clone(),
                revision: Some(doc.revision.to_string()),
            },
            None => Document::empty(),
        })
    }

    async fn upload(
        &self,
        path: &str,
        content: &str,
        revision: Option<&str>,
    ) -> StoreResult<String> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StoreError::Api {
                status: 503,
                message: "upload failure injected".to_string(),
            });
        }

        let mut docs = self.docs.lock().await;
        match docs.get_mut(path) {
            Some(existing) => {
                // Updating an existing document requires the current token.
                if revision != Some(existing.revision.to_string().as_str()) {
                    return Err(StoreError::conflict(path));
                }
                existing.content = content.to_string();
                existing.revision += 1;
                Ok(existing.revision.to_string())
            }
            None => {
                docs.insert(
                    path.to_string(),
                    StoredDoc {
                        content: content.to_string(),
                        revision: 1,
                    },
                );
                Ok("1".to_string())
            }
        }
    }
}
