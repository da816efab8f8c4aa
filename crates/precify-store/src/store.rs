//! # Store Abstraction
//!
//! The seam between the session layer and whatever actually holds the CSV
//! document. Two implementations ship:
//!
//! - [`crate::remote::RemoteCsvStore`] — content API over HTTPS
//! - [`crate::memory::MemoryStore`] — in-process, for tests and offline work
//!
//! The trait speaks documents and revision tokens, not items: encoding and
//! decoding belong to [`crate::codec`], and the session glues the two.

use async_trait::async_trait;

use crate::error::StoreResult;

/// A fetched document plus the revision token to send with the next upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Raw CSV text. Empty when the document does not exist yet.
    pub content: String,
    /// Opaque revision token. `None` when the document does not exist yet;
    /// the first upload then creates it.
    pub revision: Option<String>,
}

impl Document {
    /// The "nothing stored yet" document: an empty collection, not an error.
    pub fn empty() -> Self {
        Document {
            content: String::new(),
            revision: None,
        }
    }

    pub fn exists(&self) -> bool {
        self.revision.is_some()
    }
}

/// Read/write access to one CSV document per path.
///
/// ## Contract
/// - `fetch` on a missing path returns [`Document::empty`], never an error
/// - `upload` is revision-checked: pass the token from the last fetch/upload,
///   or `None` to create; a stale token yields
///   [`crate::error::StoreError::RevisionConflict`]
/// - on success `upload` returns the new token, which becomes the baseline
///   for the next write
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn fetch(&self, path: &str) -> StoreResult<Document>;

    async fn upload(
        &self,
        path: &str,
        content: &str,
        revision: Option<&str>,
    ) -> StoreResult<String>;
}

// A shared handle is as good as the store itself; lets the session own an
// `Arc<MemoryStore>` the caller keeps a handle to.
#[async_trait]
impl<S: ItemStore + ?Sized> ItemStore for std::sync::Arc<S> {
    async fn fetch(&self, path: &str) -> StoreResult<Document> {
        (**self).fetch(path).await
    }

    async fn upload(
        &self,
        path: &str,
        content: &str,
        revision: Option<&str>,
    ) -> StoreResult<String> {
        (**self).upload(path, content, revision).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_does_not_exist() {
        let doc = Document::empty();
        assert!(!doc.exists());
        assert!(doc.content.is_empty());
    }
}
