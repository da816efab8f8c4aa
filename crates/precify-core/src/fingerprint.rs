//! Content fingerprints for the derived collection.
//!
//! A fingerprint is a SHA-256 hex digest over the derived rows, order
//! sensitive, with binary fields (item images) excluded — images are never
//! persisted, so they must not influence the decision to write.
//!
//! The session layer compares the catalog's fingerprint against the last
//! persisted one after every mutation; persistence becomes an idempotent
//! side effect of state convergence instead of a separate user action.

use sha2::{Digest, Sha256};

use std::collections::BTreeMap;

use crate::fields::FieldValue;
use crate::types::{PricedItem, Supply, SupplyUse};

/// A stable digest of derived collection contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the fingerprint of a derived collection.
///
/// Determinism notes:
/// - floats are hashed via their raw bit patterns, so two recomputes from
///   identical inputs produce identical digests
/// - dynamic fields iterate in `BTreeMap` key order
/// - a length/tag prefix separates every component, so ("ab", "c") never
///   collides with ("a", "bc")
pub fn fingerprint(rows: &[PricedItem]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update((rows.len() as u64).to_le_bytes());

    for row in rows {
        hash_str(&mut hasher, &row.raw.name);
        hash_f64(&mut hasher, row.raw.quantity);
        hash_f64(&mut hasher, row.raw.unit_cost);
        hash_f64(&mut hasher, row.raw.extra_cost);
        match row.raw.margin_pct {
            Some(m) => {
                hasher.update([1u8]);
                hash_f64(&mut hasher, m);
            }
            None => hasher.update([0u8]),
        }

        // image deliberately skipped

        hash_extras(&mut hasher, &row.raw.extras);
        hash_supply_uses(&mut hasher, &row.raw.supply_uses);

        hash_f64(&mut hasher, row.apportioned_unit_cost);
        hash_f64(&mut hasher, row.total_unit_cost);
        hash_f64(&mut hasher, row.effective_margin_pct);
        hash_f64(&mut hasher, row.cash_price);
        hash_f64(&mut hasher, row.card_price);
    }

    Fingerprint(format!("{:x}", hasher.finalize()))
}

/// Computes the fingerprint of the supply collection. Same determinism rules
/// as [`fingerprint`]; gates the supply document's write-through.
pub fn fingerprint_supplies(supplies: &[Supply]) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update((supplies.len() as u64).to_le_bytes());

    for supply in supplies {
        hash_str(&mut hasher, &supply.name);
        hash_str(&mut hasher, &supply.category);
        hash_str(&mut hasher, &supply.unit);
        hash_f64(&mut hasher, supply.unit_price);
        hash_extras(&mut hasher, &supply.extras);
    }

    Fingerprint(format!("{:x}", hasher.finalize()))
}

fn hash_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hash_f64(hasher: &mut Sha256, v: f64) {
    hasher.update(v.to_bits().to_le_bytes());
}

fn hash_extras(hasher: &mut Sha256, extras: &BTreeMap<String, FieldValue>) {
    hasher.update((extras.len() as u64).to_le_bytes());
    for (key, value) in extras {
        hash_str(hasher, key);
        match value {
            FieldValue::Empty => hasher.update([0u8]),
            FieldValue::Text(s) => {
                hasher.update([1u8]);
                hash_str(hasher, s);
            }
            FieldValue::Number(n) => {
                hasher.update([2u8]);
                hash_f64(hasher, *n);
            }
        }
    }
}

fn hash_supply_uses(hasher: &mut Sha256, uses: &[SupplyUse]) {
    hasher.update((uses.len() as u64).to_le_bytes());
    for line in uses {
        hash_str(hasher, &line.supply);
        hash_f64(hasher, line.quantity_used);
        hash_str(hasher, &line.unit);
        hash_f64(hasher, line.unit_price);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::compute;
    use crate::types::{CostPool, Item, ItemDraft, MarginPolicy};

    fn priced(items: &[Item]) -> Vec<PricedItem> {
        compute(items, &CostPool::new(10.0, 0.0), MarginPolicy::Fixed { pct: 20.0 })
    }

    #[test]
    fn test_identical_inputs_identical_fingerprint() {
        let items = vec![Item::from_draft(ItemDraft::new("A", 10.0, 5.0))];
        assert_eq!(fingerprint(&priced(&items)), fingerprint(&priced(&items)));
    }

    #[test]
    fn test_any_input_change_changes_fingerprint() {
        let a = vec![Item::from_draft(ItemDraft::new("A", 10.0, 5.0))];
        let mut b = a.clone();
        b[0].unit_cost = 5.01;

        assert_ne!(fingerprint(&priced(&a)), fingerprint(&priced(&b)));
    }

    #[test]
    fn test_empty_distinct_from_nonempty() {
        let items = vec![Item::from_draft(ItemDraft::new("A", 10.0, 5.0))];
        assert_ne!(fingerprint(&[]), fingerprint(&priced(&items)));
    }

    #[test]
    fn test_image_does_not_affect_fingerprint() {
        let a = vec![Item::from_draft(ItemDraft::new("A", 10.0, 5.0))];
        let mut b = a.clone();
        b[0].image = Some(vec![0xFF, 0xD8, 0xFF]);

        assert_eq!(fingerprint(&priced(&a)), fingerprint(&priced(&b)));
    }

    #[test]
    fn test_supply_lines_affect_fingerprint() {
        let a = vec![Item::from_draft(ItemDraft::new("A", 10.0, 5.0))];
        let mut b = a.clone();
        b[0].supply_uses.push(SupplyUse {
            supply: "Papel".to_string(),
            quantity_used: 2.0,
            unit: "un".to_string(),
            unit_price: 0.5,
        });

        assert_ne!(fingerprint(&priced(&a)), fingerprint(&priced(&b)));
    }

    #[test]
    fn test_supply_collection_fingerprint() {
        let a = vec![Supply::new("Papel", "papelaria", "un", 0.5)];
        let mut b = a.clone();

        assert_eq!(fingerprint_supplies(&a), fingerprint_supplies(&b));

        b[0].unit_price = 0.6;
        assert_ne!(fingerprint_supplies(&a), fingerprint_supplies(&b));
        assert_ne!(fingerprint_supplies(&a), fingerprint_supplies(&[]));
    }

    #[test]
    fn test_order_sensitive() {
        let a = Item::from_draft(ItemDraft::new("A", 10.0, 5.0));
        let b = Item::from_draft(ItemDraft::new("B", 2.0, 3.0));

        let ab = priced(&[a.clone(), b.clone()]);
        let ba = priced(&[b, a]);
        assert_ne!(fingerprint(&ab), fingerprint(&ba));
    }
}
