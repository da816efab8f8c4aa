//! # precify-core: Pure Business Logic for Precify
//!
//! This crate is the **heart** of Precify. It contains all business logic
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Precify Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  precify-session (Commands)                     │   │
//! │  │    add_item, edit_item, reconcile_grid, persist_if_changed     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ precify-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │  pricing  │  │  catalog  │  │  fields   │  │fingerprint│  │   │
//! │  │   │ apportion │  │ reconcile │  │ registry  │  │  SHA-256  │  │   │
//! │  │   │  margins  │  │ add/edit  │  │ migrate   │  │  digest   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO PERSISTENCE • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                precify-store (Persistence Layer)                │   │
//! │  │          CSV codec, remote revision-checked blob store          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Item, CostPool, PricedItem, MarginPolicy, etc.)
//! - [`pricing`] - Apportionment and margin-based price derivation
//! - [`catalog`] - The item collection and its reconciliation rules
//! - [`fields`] - Dynamic field registry and schema migrations
//! - [`fingerprint`] - Content digests gating the write-through
//! - [`validation`] - Input validation and lenient numeric coercion
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: recompute is deterministic - same input = same output
//! 2. **No I/O**: Network, file system, persistence access is FORBIDDEN here
//! 3. **Forgiving Reads, Strict Entry Points**: raw cells coerce leniently,
//!    explicit user commands validate strictly
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use precify_core::catalog::Catalog;
//! use precify_core::types::{ItemDraft, MarginPolicy};
//!
//! let mut catalog = Catalog::new(MarginPolicy::Fixed { pct: 20.0 });
//! catalog.set_pool(10.0, 0.0); // freight, misc
//! catalog.add(ItemDraft::new("Caderno A5", 10.0, 5.0)).unwrap();
//!
//! let row = &catalog.priced()[0];
//! assert_eq!(row.total_unit_cost, 6.0); // 5.00 + 10.00/10 apportioned
//! assert!((row.cash_price - 7.2).abs() < 1e-9);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod fields;
pub mod fingerprint;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use precify_core::Catalog` instead of
// `use precify_core::catalog::Catalog`

pub use catalog::Catalog;
pub use error::{CoreError, CoreResult, ValidationError};
pub use fields::{EntityKind, FieldDef, FieldKind, FieldRegistry, FieldScope, FieldValue};
pub use fingerprint::{fingerprint, fingerprint_supplies, Fingerprint};
pub use pricing::{compute, CARD_NET_FACTOR};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default margin percentage applied when no other margin is configured.
///
/// ## Why a constant?
/// A fresh session starts under `MarginPolicy::Fixed` at this percentage so
/// the derived table is meaningful before the user touches any settings.
pub const DEFAULT_FIXED_MARGIN_PCT: f64 = 30.0;

/// Maximum length of an item name
///
/// ## Business Reason
/// Item names are the identity key and become CSV cells; an absurdly long
/// name is almost always a paste accident.
pub const MAX_ITEM_NAME_LEN: usize = 120;

/// Maximum length of a dynamic field (column) name
///
/// ## Business Reason
/// Field names become CSV column headers and report labels, so they must
/// stay short enough to render.
pub const MAX_FIELD_NAME_LEN: usize = 64;
