//! # Validation & Coercion Module
//!
//! Input validation and the single, explicit home of best-effort numeric
//! coercion.
//!
//! ## Coercion Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │              Why coercion lives in exactly one place                │
//! │                                                                     │
//! │  The raw data comes from an uncurated remote CSV: cells may be      │
//! │  empty, carry "12,50" (comma decimals), stray whitespace, or        │
//! │  plain garbage. The engine's posture is forgiving: a cell that      │
//! │  cannot be read as a number is worth 0, never an error.             │
//! │                                                                     │
//! │  That is a deliberate design choice — but scattered try/parse       │
//! │  fallbacks hide it. Every lenient parse in the workspace goes       │
//! │  through coerce_number() so the policy is visible and testable.     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation, by contrast, is strict and only guards the explicit entry
//! points (adding an item, defining a field) where the user is present to
//! see the message.

use crate::error::ValidationError;
use crate::{MAX_FIELD_NAME_LEN, MAX_ITEM_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Column labels owned by the base schema (item and supply documents alike).
///
/// A dynamic field under one of these names would collide with its base
/// column in the persisted document: the header would appear twice and the
/// read side would silently keep only one of them.
pub const RESERVED_COLUMN_NAMES: [&str; 13] = [
    "Produto",
    "Qtd",
    "Custo Unitário",
    "Custos Extras Produto",
    "Margem (%)",
    "Rateio",
    "Custo Total Unitário",
    "Preço à Vista",
    "Preço no Cartão",
    "Insumos Usados",
    "Nome",
    "Unidade",
    "Preço Unitário (R$)",
];

// =============================================================================
// Numeric Coercion
// =============================================================================

/// Reads a monetary/numeric cell leniently.
///
/// ## Rules
/// - Leading/trailing whitespace is ignored
/// - An empty cell is 0
/// - Comma decimal separators are accepted ("12,50" → 12.50)
/// - Anything unparseable is 0
/// - NaN/infinite results are 0 (they would poison every downstream sum)
///
/// ## Example
/// ```rust
/// use precify_core::validation::coerce_number;
///
/// assert_eq!(coerce_number("12.5"), 12.5);
/// assert_eq!(coerce_number(" 12,50 "), 12.5);
/// assert_eq!(coerce_number(""), 0.0);
/// assert_eq!(coerce_number("n/a"), 0.0);
/// ```
pub fn coerce_number(raw: &str) -> f64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0.0;
    }

    let parsed = raw
        .parse::<f64>()
        .or_else(|_| raw.replace(',', ".").parse::<f64>())
        .unwrap_or(0.0);

    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

/// Reads a quantity cell leniently.
///
/// Same policy as [`coerce_number`], additionally clamping negatives to zero:
/// a negative quantity has no meaning in the apportionment denominator.
pub fn coerce_quantity(raw: &str) -> f64 {
    coerce_number(raw).max(0.0)
}

/// Clamps a shared cost pool input to the non-negative range.
///
/// Negative freight/misc totals are a caller error; the consistent, documented
/// policy is to clamp to zero rather than reject.
#[inline]
pub fn clamp_cost(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates an item name (the identity key).
///
/// ## Rules
/// - Must not be empty after trimming
/// - Must be at most [`MAX_ITEM_NAME_LEN`] characters
///
/// Uniqueness is deliberately NOT enforced here: duplicate names are allowed
/// in the catalog, with first-match-wins lookup semantics.
pub fn validate_item_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }

    if name.len() > MAX_ITEM_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_ITEM_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates a dynamic field (column) name.
///
/// Field names become CSV column headers, so they must be non-empty,
/// reasonably short, and must not shadow a base column.
pub fn validate_field_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "field name".to_string(),
        });
    }

    if name.len() > MAX_FIELD_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "field name".to_string(),
            max: MAX_FIELD_NAME_LEN,
        });
    }

    if RESERVED_COLUMN_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(ValidationError::InvalidFormat {
            field: "field name".to_string(),
            reason: format!("'{name}' is a base column"),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity supplied through the explicit add command.
///
/// The engine tolerates anything (see [`coerce_quantity`]), but the add form
/// is an explicit entry point where the user should be told that a
/// non-positive quantity makes no sense.
pub fn validate_quantity(qty: f64) -> ValidationResult<()> {
    if !(qty > 0.0) {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
