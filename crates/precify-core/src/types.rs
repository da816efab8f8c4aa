//! # Domain Types
//!
//! Core domain types used throughout Precify.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                │
//! │                                                                     │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐   │
//! │  │      Item       │   │   PricedItem    │   │    CostPool     │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │   │
//! │  │  name (key)     │   │  raw: Item      │   │  freight_total  │   │
//! │  │  quantity       │   │  apportioned…   │   │  misc_costs     │   │
//! │  │  unit_cost      │   │  total_unit_cost│   └─────────────────┘   │
//! │  │  extra_cost     │   │  cash_price     │                         │
//! │  │  margin_pct?    │   │  card_price     │   ┌─────────────────┐   │
//! │  │  extras {…}     │   └─────────────────┘   │  MarginPolicy   │   │
//! │  └─────────────────┘                         │  Fixed | PerItem│   │
//! │                                              └─────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Items are keyed by `name`. Uniqueness is NOT enforced — duplicates are
//! legal, lookups take the first match, and the last write wins on a remote
//! collision. This mirrors how the original pricing sheet behaves.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::{FieldValue, HasExtras};
use crate::validation::clamp_cost;
use crate::DEFAULT_FIXED_MARGIN_PCT;

// =============================================================================
// Margin Policy
// =============================================================================

/// Rule for choosing each item's profit percentage.
///
/// ## Variants
/// - `Fixed`: one percentage applied to every item, overriding stored values
/// - `PerItem`: each item's own stored margin, falling back to the fixed
///   percentage when the item has none
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum MarginPolicy {
    /// Every item gets the same margin percentage.
    Fixed { pct: f64 },
    /// Use the item's stored margin, falling back to `fallback_pct`.
    PerItem { fallback_pct: f64 },
}

impl MarginPolicy {
    /// Resolves the effective margin for one item.
    pub fn resolve(&self, item_margin: Option<f64>) -> f64 {
        match *self {
            MarginPolicy::Fixed { pct } => pct,
            MarginPolicy::PerItem { fallback_pct } => item_margin.unwrap_or(fallback_pct),
        }
    }
}

impl Default for MarginPolicy {
    fn default() -> Self {
        MarginPolicy::Fixed {
            pct: DEFAULT_FIXED_MARGIN_PCT,
        }
    }
}

// =============================================================================
// Cost Pool
// =============================================================================

/// Shared cost pool apportioned across the whole catalog.
///
/// Two independent accumulators; the apportionment denominator (total
/// quantity) is derived from the catalog, not stored here. Recomputing the
/// apportionment is idempotent given the same pool and item quantities.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostPool {
    /// Total freight cost for the purchase, in currency units.
    pub freight_total: f64,
    /// Miscellaneous shared costs (packaging, fees, ...).
    pub misc_costs_total: f64,
}

impl CostPool {
    /// Creates a pool, clamping negative inputs to zero.
    ///
    /// Clamping (rather than rejecting) is the documented policy for caller
    /// errors on these fields; see `validation::clamp_cost`.
    pub fn new(freight_total: f64, misc_costs_total: f64) -> Self {
        CostPool {
            freight_total: clamp_cost(freight_total),
            misc_costs_total: clamp_cost(misc_costs_total),
        }
    }

    /// Empty pool (no shared costs to distribute).
    pub const fn zero() -> Self {
        CostPool {
            freight_total: 0.0,
            misc_costs_total: 0.0,
        }
    }

    /// Combined pooled cost to distribute.
    #[inline]
    pub fn total(&self) -> f64 {
        self.freight_total + self.misc_costs_total
    }
}

// =============================================================================
// Item
// =============================================================================

/// One raw catalog row: a product with its acquisition inputs.
///
/// ## Lifecycle
/// - Created via the explicit add command (captures `created_at`)
/// - Mutated by edit (input fields only) or bulk reconciliation
/// - Destroyed by explicit delete
///
/// Derived pricing never lives here — see [`PricedItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Display name; identity key (first match wins on duplicates).
    pub name: String,

    /// Units purchased. Feeds the apportionment denominator.
    pub quantity: f64,

    /// Base acquisition cost per unit.
    pub unit_cost: f64,

    /// Cost specific to this item only (excludes the shared pool).
    pub extra_cost: f64,

    /// Per-item margin override; `None` falls back to the fixed margin
    /// under the per-item policy.
    pub margin_pct: Option<f64>,

    /// Optional product photo. Never persisted and never fingerprinted.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image: Option<Vec<u8>>,

    /// Dynamic field values, keyed by field name.
    /// BTreeMap keeps iteration order stable for fingerprints and CSV.
    #[serde(default)]
    pub extras: BTreeMap<String, FieldValue>,

    /// Bill of materials for a composed (crafted) product. Empty for items
    /// bought ready-made. Each line's cost was already folded into
    /// `unit_cost` at composition time; the lines are kept for reporting.
    #[serde(default)]
    pub supply_uses: Vec<SupplyUse>,

    /// When the item was added to the catalog.
    pub created_at: DateTime<Utc>,

    /// When any input field last changed.
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Creates an item from a draft, capturing the creation timestamp.
    pub fn from_draft(draft: ItemDraft) -> Self {
        let now = Utc::now();
        Item {
            name: draft.name.trim().to_string(),
            quantity: draft.quantity,
            unit_cost: draft.unit_cost,
            extra_cost: draft.extra_cost,
            margin_pct: draft.margin_pct,
            image: draft.image,
            extras: draft.extras,
            supply_uses: draft.supply_uses,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrites the input fields named by the patch, in place.
    ///
    /// Returns `true` if anything actually changed; `updated_at` is bumped
    /// only in that case. Derived fields are untouchable by design — they
    /// only ever come out of a recompute pass.
    pub fn apply_patch(&mut self, patch: ItemPatch) -> bool {
        let mut changed = false;

        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name != self.name {
                self.name = name;
                changed = true;
            }
        }
        if let Some(quantity) = patch.quantity {
            if quantity != self.quantity {
                self.quantity = quantity;
                changed = true;
            }
        }
        if let Some(unit_cost) = patch.unit_cost {
            if unit_cost != self.unit_cost {
                self.unit_cost = unit_cost;
                changed = true;
            }
        }
        if let Some(extra_cost) = patch.extra_cost {
            if extra_cost != self.extra_cost {
                self.extra_cost = extra_cost;
                changed = true;
            }
        }
        if let Some(margin_pct) = patch.margin_pct {
            if margin_pct != self.margin_pct {
                self.margin_pct = margin_pct;
                changed = true;
            }
        }
        if let Some(image) = patch.image {
            if image != self.image {
                self.image = image;
                changed = true;
            }
        }
        if let Some(extras) = patch.extras {
            if extras != self.extras {
                self.extras = extras;
                changed = true;
            }
        }
        if let Some(supply_uses) = patch.supply_uses {
            if supply_uses != self.supply_uses {
                self.supply_uses = supply_uses;
                changed = true;
            }
        }

        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }
}

impl HasExtras for Item {
    fn extras(&self) -> &BTreeMap<String, FieldValue> {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut BTreeMap<String, FieldValue> {
        &mut self.extras
    }
}

// =============================================================================
// Item Draft & Patch
// =============================================================================

/// Input record for creating an item (no timestamps yet).
///
/// Also the row shape for bulk replace / grid reconciliation, where the
/// surviving item keeps its original identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    pub name: String,
    pub quantity: f64,
    pub unit_cost: f64,
    pub extra_cost: f64,
    pub margin_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub image: Option<Vec<u8>>,
    #[serde(default)]
    pub extras: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub supply_uses: Vec<SupplyUse>,
}

impl ItemDraft {
    /// Convenience constructor for the common manual-entry path.
    pub fn new(name: impl Into<String>, quantity: f64, unit_cost: f64) -> Self {
        ItemDraft {
            name: name.into(),
            quantity,
            unit_cost,
            ..Default::default()
        }
    }
}

/// Partial overwrite of an item's input fields.
///
/// `None` means "leave as is". The nested options on `margin_pct` and `image`
/// distinguish "don't touch" (`None`) from "clear it" (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit_cost: Option<f64>,
    pub extra_cost: Option<f64>,
    pub margin_pct: Option<Option<f64>>,
    pub image: Option<Option<Vec<u8>>>,
    pub extras: Option<BTreeMap<String, FieldValue>>,
    pub supply_uses: Option<Vec<SupplyUse>>,
}

// =============================================================================
// Priced Item
// =============================================================================

/// One derived pricing row: a pure function of (Item, CostPool, MarginPolicy).
///
/// Never hand-edited. Any edit to the inputs invalidates the whole derived
/// collection (the apportionment denominator is global) and triggers a full
/// recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedItem {
    /// The raw inputs, carried through unchanged (dynamic fields included).
    pub raw: Item,

    /// This item's per-unit share of the pooled costs.
    /// Identical across all items in a single recompute pass.
    pub apportioned_unit_cost: f64,

    /// `unit_cost + extra_cost + apportioned_unit_cost`.
    pub total_unit_cost: f64,

    /// Margin actually applied, after policy resolution.
    pub effective_margin_pct: f64,

    /// `total_unit_cost * (1 + effective_margin_pct / 100)`.
    pub cash_price: f64,

    /// `cash_price / CARD_NET_FACTOR` — grossed up for the card fee.
    pub card_price: f64,
}

// =============================================================================
// Supplies (secondary entity)
// =============================================================================

/// A raw material used to compose crafted products (the stationery side
/// of the business). Shares the dynamic field mechanism with items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supply {
    /// Display name; identity key, same duplicate semantics as items.
    pub name: String,
    pub category: String,
    /// Unit of measure ("un", "kg", "m", ...).
    pub unit: String,
    /// Price per unit of measure.
    pub unit_price: f64,
    #[serde(default)]
    pub extras: BTreeMap<String, FieldValue>,
}

impl Supply {
    /// Convenience constructor; trims the identity key.
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        unit: impl Into<String>,
        unit_price: f64,
    ) -> Self {
        Supply {
            name: name.into().trim().to_string(),
            category: category.into(),
            unit: unit.into(),
            unit_price,
            extras: BTreeMap::new(),
        }
    }
}

impl HasExtras for Supply {
    fn extras(&self) -> &BTreeMap<String, FieldValue> {
        &self.extras
    }

    fn extras_mut(&mut self) -> &mut BTreeMap<String, FieldValue> {
        &mut self.extras
    }
}

/// One supply line inside a crafted product's bill of materials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplyUse {
    /// Name of the supply drawn from.
    pub supply: String,
    pub quantity_used: f64,
    pub unit: String,
    /// Unit price snapshotted when the product was composed.
    pub unit_price: f64,
}

impl SupplyUse {
    /// Cost contributed by this line (`quantity_used × unit_price`).
    #[inline]
    pub fn cost(&self) -> f64 {
        self.quantity_used * self.unit_price
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_policy_resolve() {
        let fixed = MarginPolicy::Fixed { pct: 20.0 };
        assert_eq!(fixed.resolve(Some(55.0)), 20.0);
        assert_eq!(fixed.resolve(None), 20.0);

        let per_item = MarginPolicy::PerItem { fallback_pct: 30.0 };
        assert_eq!(per_item.resolve(Some(55.0)), 55.0);
        assert_eq!(per_item.resolve(None), 30.0);
    }

    #[test]
    fn test_cost_pool_clamps_negative_inputs() {
        let pool = CostPool::new(-5.0, 12.0);
        assert_eq!(pool.freight_total, 0.0);
        assert_eq!(pool.misc_costs_total, 12.0);
        assert_eq!(pool.total(), 12.0);
    }

    #[test]
    fn test_item_from_draft_captures_timestamps() {
        let item = Item::from_draft(ItemDraft::new("  Caderno A5  ", 10.0, 5.0));
        assert_eq!(item.name, "Caderno A5");
        assert_eq!(item.created_at, item.updated_at);
    }

    #[test]
    fn test_apply_patch_only_touches_named_fields() {
        let mut item = Item::from_draft(ItemDraft::new("Caderno", 10.0, 5.0));
        let created = item.created_at;

        let changed = item.apply_patch(ItemPatch {
            unit_cost: Some(6.5),
            ..Default::default()
        });

        assert!(changed);
        assert_eq!(item.unit_cost, 6.5);
        assert_eq!(item.quantity, 10.0);
        assert_eq!(item.created_at, created);
    }

    #[test]
    fn test_apply_patch_noop_keeps_updated_at() {
        let mut item = Item::from_draft(ItemDraft::new("Caderno", 10.0, 5.0));
        let updated = item.updated_at;

        let changed = item.apply_patch(ItemPatch {
            quantity: Some(10.0),
            ..Default::default()
        });

        assert!(!changed);
        assert_eq!(item.updated_at, updated);
    }

    #[test]
    fn test_patch_can_clear_margin_override() {
        let mut item = Item::from_draft(ItemDraft {
            margin_pct: Some(45.0),
            ..ItemDraft::new("Caderno", 10.0, 5.0)
        });

        item.apply_patch(ItemPatch {
            margin_pct: Some(None),
            ..Default::default()
        });
        assert_eq!(item.margin_pct, None);
    }

    #[test]
    fn test_supply_use_cost() {
        let line = SupplyUse {
            supply: "Papel".to_string(),
            quantity_used: 3.0,
            unit: "un".to_string(),
            unit_price: 1.25,
        };
        assert_eq!(line.cost(), 3.75);
    }
}
