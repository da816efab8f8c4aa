//! # Store Error Types
//!
//! Error types for persistence operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  Transport error (reqwest::Error) / codec error (csv::Error)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← Adds context and categorization            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SessionError (precify-session) ← Downgraded to a warning; the         │
//! │       │                            in-memory state always survives     │
//! │       ▼                                                                 │
//! │  Caller shows the warning and keeps working                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `RevisionConflict` is the one recoverable variant: the session re-fetches
//! the current revision token and retries the upload once.

use thiserror::Error;

/// Persistence operation errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The revision token sent with an upload no longer matches the remote
    /// document.
    ///
    /// ## When This Occurs
    /// - Another session wrote the document since our last fetch
    /// - Recoverable: re-fetch the token and retry
    #[error("Revision conflict on '{path}': document changed remotely")]
    RevisionConflict { path: String },

    /// The remote API answered with a non-success status.
    ///
    /// ## When This Occurs
    /// - Bad credentials (401/403)
    /// - Rate limiting (429)
    /// - Server-side failure (5xx)
    #[error("Remote API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure (DNS, TLS, timeout, connection reset).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The fetched document body was not valid for the wire format.
    ///
    /// ## When This Occurs
    /// - Remote content is not valid base64
    /// - Response JSON is missing expected fields
    #[error("Malformed remote document: {0}")]
    MalformedDocument(String),

    /// CSV reading/writing failed structurally.
    ///
    /// Cell-level garbage never lands here (lenient coercion turns it into
    /// zeros); this is for unreadable framing, e.g. unbalanced quotes.
    #[error("CSV codec error: {0}")]
    Csv(#[from] csv::Error),
}

impl StoreError {
    /// Creates a RevisionConflict for a given document path.
    pub fn conflict(path: impl Into<String>) -> Self {
        StoreError::RevisionConflict { path: path.into() }
    }

    /// Whether the session layer may retry after refreshing the revision.
    pub fn is_revision_conflict(&self) -> bool {
        matches!(self, StoreError::RevisionConflict { .. })
    }
}

/// Result type for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_constructor_and_predicate() {
        let err = StoreError::conflict("produtos.csv");
        assert!(err.is_revision_conflict());
        assert!(err.to_string().contains("produtos.csv"));
    }

    #[test]
    fn test_api_error_message() {
        let err = StoreError::Api {
            status: 401,
            message: "bad credentials".to_string(),
        };
        assert!(!err.is_revision_conflict());
        assert!(err.to_string().contains("401"));
    }
}
