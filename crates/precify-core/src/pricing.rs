//! # Pricing Engine
//!
//! Apportionment of shared costs and margin-based price derivation.
//!
//! ## The Apportionment Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  POOLED COST IS DIVIDED PER UNIT, NOT PER ITEM                      │
//! │                                                                     │
//! │  pool = freight_total + misc_costs_total                            │
//! │  share = pool / Σ quantity            (same share for every item)   │
//! │                                                                     │
//! │  A 10-unit item therefore absorbs 10× the pooled cost of a          │
//! │  1-unit item — per-unit fairness, conserving the pool exactly:      │
//! │                                                                     │
//! │      Σ share × quantity[i] == pool     (within float tolerance)     │
//! │                                                                     │
//! │  Σ quantity == 0 is a DEFINED edge case, not an error: the share    │
//! │  is 0 and nothing is distributed.                                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Price Derivation
//! ```text
//! total_unit_cost = unit_cost + extra_cost + share
//! cash_price      = total_unit_cost × (1 + margin/100)
//! card_price      = cash_price / CARD_NET_FACTOR
//! ```
//!
//! Everything in this module is a pure function: same inputs, bit-identical
//! outputs. That property is what lets the catalog fingerprint derived rows
//! and skip redundant writes to the remote store.

use crate::types::{CostPool, Item, MarginPolicy, PricedItem, SupplyUse};
use crate::validation::clamp_cost;

// =============================================================================
// Constants
// =============================================================================

/// Net factor applied when the customer pays by card.
///
/// `card_price = cash_price / 0.8872` grosses the cash price up so that the
/// card processor's 11.28% fee leaves the seller with the cash price. This is
/// a design decision baked into the business, not user-configurable.
pub const CARD_NET_FACTOR: f64 = 0.8872;

// =============================================================================
// Bulk Compute
// =============================================================================

/// Computes the derived pricing row for every item.
///
/// ## Contract
/// - Empty input returns an empty result with the same column contract,
///   never an error
/// - Item order is preserved; raw attributes (dynamic fields included) are
///   carried through unchanged
/// - Negative pool values are clamped to zero (documented caller-error
///   policy; see `CostPool::new`)
/// - No business-rule violation raises: a negative margin simply discounts
///
/// ## Example
/// ```rust
/// use precify_core::pricing::compute;
/// use precify_core::types::{CostPool, Item, ItemDraft, MarginPolicy};
///
/// let items = vec![Item::from_draft(ItemDraft::new("A", 10.0, 5.0))];
/// let priced = compute(&items, &CostPool::new(10.0, 0.0), MarginPolicy::Fixed { pct: 20.0 });
///
/// assert_eq!(priced[0].apportioned_unit_cost, 1.0);
/// assert_eq!(priced[0].total_unit_cost, 6.0);
/// assert!((priced[0].cash_price - 7.2).abs() < 1e-9);
/// ```
pub fn compute(items: &[Item], pool: &CostPool, policy: MarginPolicy) -> Vec<PricedItem> {
    let total_quantity: f64 = items.iter().map(|i| clamp_cost(i.quantity)).sum();

    // Guard the divide-by-zero: zero total quantity means no distribution.
    let share = if total_quantity > 0.0 {
        (clamp_cost(pool.freight_total) + clamp_cost(pool.misc_costs_total)) / total_quantity
    } else {
        0.0
    };

    items
        .iter()
        .map(|item| {
            let total_unit_cost = item.unit_cost + item.extra_cost + share;
            let effective_margin_pct = policy.resolve(item.margin_pct);
            let cash_price = total_unit_cost * (1.0 + effective_margin_pct / 100.0);

            PricedItem {
                raw: item.clone(),
                apportioned_unit_cost: share,
                total_unit_cost,
                effective_margin_pct,
                cash_price,
                card_price: card_price(cash_price),
            }
        })
        .collect()
}

// =============================================================================
// Point Computations
// =============================================================================

/// Grosses a cash price up to the card price.
#[inline]
pub fn card_price(cash_price: f64) -> f64 {
    cash_price / CARD_NET_FACTOR
}

/// Back-solves the margin that yields a desired cash price.
///
/// Used when a user supplies a target sale price instead of a margin during
/// item creation — a point computation, not part of the bulk recompute pass.
///
/// Returns 0 when `total_unit_cost` is not positive (no meaningful margin
/// exists over a free item).
///
/// ## Example
/// ```rust
/// use precify_core::pricing::margin_for_target_price;
///
/// // Cost 6.00, want to sell at 7.20 → 20% margin
/// let pct = margin_for_target_price(6.0, 7.2);
/// assert!((pct - 20.0).abs() < 1e-9);
/// ```
pub fn margin_for_target_price(total_unit_cost: f64, target_cash_price: f64) -> f64 {
    if total_unit_cost > 0.0 {
        (target_cash_price / total_unit_cost - 1.0) * 100.0
    } else {
        0.0
    }
}

/// Total cost of a crafted product's bill of materials.
///
/// Each line contributes `quantity_used × unit_price`; the sum becomes the
/// product's base cost before margin.
pub fn supplies_cost(uses: &[SupplyUse]) -> f64 {
    uses.iter().map(SupplyUse::cost).sum()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemDraft;

    const EPS: f64 = 1e-9;

    fn item(name: &str, qty: f64, unit_cost: f64) -> Item {
        Item::from_draft(ItemDraft::new(name, qty, unit_cost))
    }

    /// The worked example from the product owner: one 10-unit item at 5.00,
    /// freight 10, fixed 20% margin.
    #[test]
    fn test_worked_example() {
        let items = vec![item("A", 10.0, 5.0)];
        let priced = compute(
            &items,
            &CostPool::new(10.0, 0.0),
            MarginPolicy::Fixed { pct: 20.0 },
        );

        assert_eq!(priced.len(), 1);
        assert!((priced[0].apportioned_unit_cost - 1.0).abs() < EPS);
        assert!((priced[0].total_unit_cost - 6.0).abs() < EPS);
        assert!((priced[0].cash_price - 7.2).abs() < EPS);
        assert!((priced[0].card_price - 7.2 / 0.8872).abs() < EPS);
        assert!((priced[0].card_price - 8.1154).abs() < 1e-4);
    }

    #[test]
    fn test_empty_input_returns_empty() {
        let priced = compute(
            &[],
            &CostPool::new(100.0, 50.0),
            MarginPolicy::Fixed { pct: 30.0 },
        );
        assert!(priced.is_empty());
    }

    #[test]
    fn test_apportionment_conserves_pool() {
        let items = vec![
            item("A", 10.0, 5.0),
            item("B", 1.0, 2.0),
            item("C", 4.0, 8.0),
        ];
        let pool = CostPool::new(37.5, 12.5);
        let priced = compute(&items, &pool, MarginPolicy::Fixed { pct: 30.0 });

        let distributed: f64 = priced
            .iter()
            .map(|p| p.apportioned_unit_cost * p.raw.quantity)
            .sum();
        assert!((distributed - pool.total()).abs() < EPS);

        // Same per-unit share for every item
        let share = priced[0].apportioned_unit_cost;
        assert!(priced.iter().all(|p| p.apportioned_unit_cost == share));
    }

    #[test]
    fn test_zero_total_quantity_is_defined() {
        let items = vec![item("A", 0.0, 5.0)];
        let priced = compute(
            &items,
            &CostPool::new(10.0, 10.0),
            MarginPolicy::Fixed { pct: 20.0 },
        );
        assert_eq!(priced[0].apportioned_unit_cost, 0.0);
        assert_eq!(priced[0].total_unit_cost, 5.0);
    }

    #[test]
    fn test_zero_pool_zero_margin_price_equals_cost() {
        let items = vec![item("A", 3.0, 4.5), item("B", 2.0, 1.25)];
        let priced = compute(&items, &CostPool::zero(), MarginPolicy::Fixed { pct: 0.0 });

        for p in &priced {
            assert_eq!(p.cash_price, p.total_unit_cost);
        }
    }

    #[test]
    fn test_per_item_policy_with_fallback() {
        let mut a = item("A", 1.0, 10.0);
        a.margin_pct = Some(50.0);
        let b = item("B", 1.0, 10.0); // no stored margin

        let priced = compute(
            &[a, b],
            &CostPool::zero(),
            MarginPolicy::PerItem { fallback_pct: 30.0 },
        );
        assert_eq!(priced[0].effective_margin_pct, 50.0);
        assert_eq!(priced[1].effective_margin_pct, 30.0);
        assert!((priced[0].cash_price - 15.0).abs() < EPS);
        assert!((priced[1].cash_price - 13.0).abs() < EPS);
    }

    #[test]
    fn test_fixed_policy_overrides_stored_margin() {
        let mut a = item("A", 1.0, 10.0);
        a.margin_pct = Some(90.0);

        let priced = compute(&[a], &CostPool::zero(), MarginPolicy::Fixed { pct: 20.0 });
        assert_eq!(priced[0].effective_margin_pct, 20.0);
    }

    #[test]
    fn test_compute_is_idempotent_bit_identical() {
        let items = vec![item("A", 7.0, 3.33), item("B", 11.0, 0.07)];
        let pool = CostPool::new(19.99, 4.01);
        let policy = MarginPolicy::PerItem { fallback_pct: 27.5 };

        let first = compute(&items, &pool, policy);
        let second = compute(&items, &pool, policy);

        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.cash_price.to_bits(), b.cash_price.to_bits());
            assert_eq!(a.card_price.to_bits(), b.card_price.to_bits());
            assert_eq!(
                a.apportioned_unit_cost.to_bits(),
                b.apportioned_unit_cost.to_bits()
            );
        }
    }

    #[test]
    fn test_order_and_attributes_carried_through() {
        let mut a = item("Zeta", 1.0, 1.0);
        a.extras.insert(
            "Categoria".to_string(),
            crate::fields::FieldValue::Text("papel".into()),
        );
        let b = item("Alfa", 2.0, 2.0);

        let priced = compute(
            &[a.clone(), b],
            &CostPool::zero(),
            MarginPolicy::Fixed { pct: 10.0 },
        );
        assert_eq!(priced[0].raw.name, "Zeta");
        assert_eq!(priced[1].raw.name, "Alfa");
        assert_eq!(priced[0].raw.extras, a.extras);
    }

    #[test]
    fn test_margin_round_trip() {
        let items = vec![item("A", 5.0, 12.0)];
        let pool = CostPool::new(3.0, 2.0);
        let priced = compute(&items, &pool, MarginPolicy::Fixed { pct: 33.0 });

        // Back-solve the margin from the computed price, feed it back in,
        // and we must land on the same cash price.
        let solved = margin_for_target_price(priced[0].total_unit_cost, priced[0].cash_price);
        let reduced = compute(&items, &pool, MarginPolicy::Fixed { pct: solved });
        assert!((reduced[0].cash_price - priced[0].cash_price).abs() < 1e-9);
    }

    #[test]
    fn test_margin_for_target_price_on_free_item() {
        assert_eq!(margin_for_target_price(0.0, 10.0), 0.0);
        assert_eq!(margin_for_target_price(-1.0, 10.0), 0.0);
    }

    #[test]
    fn test_supplies_cost() {
        let uses = vec![
            SupplyUse {
                supply: "Papel".to_string(),
                quantity_used: 4.0,
                unit: "un".to_string(),
                unit_price: 0.5,
            },
            SupplyUse {
                supply: "Fita".to_string(),
                quantity_used: 1.5,
                unit: "m".to_string(),
                unit_price: 2.0,
            },
        ];
        assert!((supplies_cost(&uses) - 5.0).abs() < EPS);
        assert_eq!(supplies_cost(&[]), 0.0);
    }
}
