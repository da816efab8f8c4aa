//! # Error Types
//!
//! Domain-specific error types for precify-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                 │
//! │                                                                     │
//! │  precify-core errors (this file)                                    │
//! │  ├── CoreError        - Catalog / schema rule violations            │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  precify-store errors (separate crate)                              │
//! │  └── StoreError       - Remote content API / codec failures         │
//! │                                                                     │
//! │  precify-session errors (separate crate)                            │
//! │  └── SessionError     - What the caller (UI layer) sees             │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → SessionError → Caller          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (item name, field name, counts)
//! 3. Errors are enum variants, never String
//! 4. No error here is fatal: every failing operation leaves the catalog
//!    exactly as it was, and the caller gets a diagnostic

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Catalog and schema rule violations.
///
/// Note what is deliberately NOT here: bad numbers. Non-numeric or missing
/// numeric input is coerced to zero in [`crate::validation`], never raised —
/// the upstream data is an uncurated remote CSV and the engine takes a
/// forgiving, best-effort posture toward it.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No item with the given name exists in the catalog.
    ///
    /// ## When This Occurs
    /// - Edit targets a name that was never added or was deleted
    /// - Delete targets a name with no matches
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// No supply with the given name exists in the collection.
    #[error("Supply not found: {0}")]
    SupplyNotFound(String),

    /// No dynamic field with the given name exists in the registry.
    #[error("Field not found: {0}")]
    FieldNotFound(String),

    /// A field with this name already exists for the same scope.
    ///
    /// Rejected at the point of definition; no mutation occurs. The name
    /// comparison is case-insensitive, matching how the sheet columns behave.
    #[error("Field '{name}' already exists for scope {scope}")]
    DuplicateField { name: String, scope: String },

    /// A grid (bulk table) edit contained more rows than the catalog.
    ///
    /// ## When This Occurs
    /// Additions must go through the explicit add command, which captures a
    /// creation timestamp. A grid edit that grew the table is treated as
    /// misuse of the wrong entry point and the catalog is left unchanged.
    #[error("Grid edit rejected: {got} rows submitted but catalog has {expected}; additions must use the add command")]
    GridAdditionRejected { expected: usize, got: usize },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before catalog mutation runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., a choice value outside the declared options).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
