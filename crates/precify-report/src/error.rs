//! Report delivery error types.
//!
//! Generation itself is pure and cannot fail; only delivery can. Callers are
//! expected to downgrade delivery errors to warnings — a report that could
//! not be sent never blocks the pricing workflow.

use thiserror::Error;

/// Report delivery errors.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The webhook endpoint answered with a non-success status.
    #[error("Webhook rejected the report ({status}): {message}")]
    Delivery { status: u16, message: String },

    /// Transport-level failure reaching the endpoint.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Result type for report delivery.
pub type ReportResult<T> = Result<T, ReportError>;
