//! Session error types.
//!
//! A thin sum over the layers below. Domain rejections (validation, unknown
//! item, grid row-count) surface as errors the caller shows the user;
//! persistence failures never appear here — they come back inside
//! [`crate::session::CommandOutcome`] as warnings, because the in-memory
//! state is still valid and the next mutation retries the write.

use precify_core::error::CoreError;
use precify_store::error::StoreError;
use thiserror::Error;

/// Session operation errors.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A business rule rejected the command; nothing changed.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The initial load could not reach or read the store.
    ///
    /// Only `load` propagates store errors — after that, persistence is a
    /// best-effort side effect.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
