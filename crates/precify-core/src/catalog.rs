//! # Catalog Reconciler
//!
//! Owns the raw item collection and keeps the derived pricing view
//! synchronized with it.
//!
//! ## Reconciliation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                    Catalog Operations                               │
//! │                                                                     │
//! │  Caller Action            Catalog Method        State Change        │
//! │  ─────────────            ──────────────        ────────────        │
//! │                                                                     │
//! │  New product ────────────► add() ──────────────► items.push(..)     │
//! │  Inline edit ────────────► edit() ─────────────► first match patched│
//! │  Remove row ─────────────► delete() ───────────► matches removed    │
//! │  Load / external edit ───► bulk_replace() ─────► keyed merge        │
//! │  Grid (table) edit ──────► reconcile_grid() ───► count-based rules  │
//! │  Freight/misc input ─────► set_pool() ─────────► pool replaced      │
//! │                                                                     │
//! │  EVERY mutation above ends in a full recompute of the derived       │
//! │  collection — never incremental, because the apportionment          │
//! │  denominator (total quantity) is global.                            │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! After each recompute the catalog refreshes its content fingerprint; the
//! session layer compares it against the last persisted digest to decide
//! whether a write-through is due.

use crate::error::{CoreError, CoreResult};
use crate::fields::{backfill_field, rename_field_values, strip_field};
use crate::fingerprint::{fingerprint, Fingerprint};
use crate::pricing::compute;
use crate::types::{CostPool, Item, ItemDraft, ItemPatch, MarginPolicy, PricedItem};
use crate::validation::{validate_item_name, validate_quantity};

/// The raw item collection plus its synchronized derived view.
///
/// ## Invariants
/// - `priced` is always the result of `compute(items, pool, policy)`
/// - `fingerprint` is always the digest of `priced`
/// - a failing operation leaves all of the above untouched
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<Item>,
    pool: CostPool,
    policy: MarginPolicy,
    priced: Vec<PricedItem>,
    fingerprint: Fingerprint,
}

impl Catalog {
    /// Creates an empty catalog under the given margin policy.
    pub fn new(policy: MarginPolicy) -> Self {
        let priced = Vec::new();
        let fp = fingerprint(&priced);
        Catalog {
            items: Vec::new(),
            pool: CostPool::zero(),
            policy,
            priced,
            fingerprint: fp,
        }
    }

    // =========================================================================
    // Read Access
    // =========================================================================

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// The derived pricing rows, one per item, in item order.
    pub fn priced(&self) -> &[PricedItem] {
        &self.priced
    }

    pub fn pool(&self) -> &CostPool {
        &self.pool
    }

    pub fn policy(&self) -> MarginPolicy {
        self.policy
    }

    /// Digest of the current derived collection. Refreshed on every mutation.
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// Apportionment denominator: Σ quantity over current items.
    pub fn total_quantity(&self) -> f64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    // =========================================================================
    // Mutations (each ends in a full recompute)
    // =========================================================================

    /// Appends a new item, capturing its creation timestamp.
    pub fn add(&mut self, draft: ItemDraft) -> CoreResult<()> {
        validate_item_name(&draft.name)?;
        validate_quantity(draft.quantity)?;

        self.items.push(Item::from_draft(draft));
        self.recompute();
        Ok(())
    }

    /// Overwrites input fields on the first item matching `name`.
    ///
    /// Returns whether anything actually changed. Derived fields cannot be
    /// edited through this path — they only come out of the recompute.
    pub fn edit(&mut self, name: &str, patch: ItemPatch) -> CoreResult<bool> {
        // A rename must clear the same bar as an add.
        if let Some(new_name) = &patch.name {
            validate_item_name(new_name)?;
        }

        let item = self
            .items
            .iter_mut()
            .find(|i| i.name == name)
            .ok_or_else(|| CoreError::ItemNotFound(name.to_string()))?;

        let changed = item.apply_patch(patch);
        if changed {
            self.recompute();
        }
        Ok(changed)
    }

    /// Removes every item matching `name`, returning how many went away.
    ///
    /// Deleting the last item yields a well-defined empty derived collection,
    /// not an error.
    pub fn delete(&mut self, name: &str) -> CoreResult<usize> {
        let before = self.items.len();
        self.items.retain(|i| i.name != name);
        let removed = before - self.items.len();

        if removed == 0 {
            return Err(CoreError::ItemNotFound(name.to_string()));
        }

        self.recompute();
        Ok(removed)
    }

    /// Replaces the entire raw collection, preserving surviving identities.
    ///
    /// Rows whose key already exists keep their `created_at` (and their image
    /// when the incoming row carries none — external grids drop binary data).
    /// Keys absent from `rows` are deletions. Used when loading from
    /// persistence or reconciling an external bulk edit.
    pub fn bulk_replace(&mut self, rows: Vec<ItemDraft>) {
        let old = std::mem::take(&mut self.items);

        self.items = rows
            .into_iter()
            .map(|row| merge_surviving(&old, row))
            .collect();

        self.recompute();
    }

    /// Reconciles an edited copy of the whole table.
    ///
    /// Row-count rules:
    /// - more rows than the catalog ⇒ rejected, catalog unchanged
    ///   (additions must go through [`Catalog::add`])
    /// - fewer rows ⇒ deletion reconciliation (keyed, like `bulk_replace`)
    /// - same count ⇒ positional field-level edits (the grid may rename an
    ///   item, so identity follows row position here)
    pub fn reconcile_grid(&mut self, rows: Vec<ItemDraft>) -> CoreResult<()> {
        if rows.len() > self.items.len() {
            return Err(CoreError::GridAdditionRejected {
                expected: self.items.len(),
                got: rows.len(),
            });
        }

        if rows.len() < self.items.len() {
            // Fewer rows means the user deleted from the grid.
            self.bulk_replace(rows);
            return Ok(());
        }

        // Equal count: positional renames are legal, empty names are not.
        // Checked up front so a bad row leaves the whole grid untouched.
        for row in &rows {
            validate_item_name(&row.name)?;
        }

        let mut changed = false;
        for (item, row) in self.items.iter_mut().zip(rows) {
            let patch = ItemPatch {
                name: Some(row.name),
                quantity: Some(row.quantity),
                unit_cost: Some(row.unit_cost),
                extra_cost: Some(row.extra_cost),
                margin_pct: Some(row.margin_pct),
                // Grids never carry the photo or the bill of materials;
                // keep whatever is stored.
                image: row.image.map(Some),
                extras: Some(row.extras),
                supply_uses: None,
            };
            changed |= item.apply_patch(patch);
        }

        if changed {
            self.recompute();
        }
        Ok(())
    }

    /// Replaces the shared cost pool (negatives clamped to zero).
    pub fn set_pool(&mut self, freight_total: f64, misc_costs_total: f64) {
        self.pool = CostPool::new(freight_total, misc_costs_total);
        self.recompute();
    }

    /// Switches the margin policy.
    pub fn set_policy(&mut self, policy: MarginPolicy) {
        self.policy = policy;
        self.recompute();
    }

    // =========================================================================
    // Field-Schema Migrations
    // =========================================================================
    // Called by the session layer after the FieldRegistry accepted the change;
    // each re-establishes the "every record has every field" invariant and
    // recomputes so the fingerprint reflects the new row content.

    /// Back-fills an empty value for a freshly declared field.
    pub fn field_added(&mut self, name: &str) {
        backfill_field(&mut self.items, name);
        self.recompute();
    }

    /// Strips a deleted field's values from every item.
    pub fn field_removed(&mut self, name: &str) {
        strip_field(&mut self.items, name);
        self.recompute();
    }

    /// Renames a field's values in place, without data loss.
    pub fn field_renamed(&mut self, old_name: &str, new_name: &str) {
        rename_field_values(&mut self.items, old_name, new_name);
        self.recompute();
    }

    // =========================================================================
    // Internal
    // =========================================================================

    /// Whole-collection recompute + fingerprint refresh.
    ///
    /// Always whole-collection: any input edit shifts the apportionment
    /// denominator and with it every row's derived values.
    fn recompute(&mut self) {
        self.priced = compute(&self.items, &self.pool, self.policy);
        self.fingerprint = fingerprint(&self.priced);
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::new(MarginPolicy::default())
    }
}

/// Builds the post-replace row: a survivor keeps its identity, a new key
/// becomes a fresh item.
fn merge_surviving(old: &[Item], row: ItemDraft) -> Item {
    match old.iter().find(|i| i.name == row.name) {
        Some(existing) => {
            let mut merged = existing.clone();
            let image = row.image.or_else(|| existing.image.clone());
            // Grids drop binary data and bills of materials; an empty
            // incoming value means "keep what is stored", same as the image.
            let supply_uses = if row.supply_uses.is_empty() {
                existing.supply_uses.clone()
            } else {
                row.supply_uses
            };
            merged.apply_patch(ItemPatch {
                name: None, // key matched, nothing to rename
                quantity: Some(row.quantity),
                unit_cost: Some(row.unit_cost),
                extra_cost: Some(row.extra_cost),
                margin_pct: Some(row.margin_pct),
                image: Some(image),
                extras: Some(row.extras),
                supply_uses: Some(supply_uses),
            });
            merged
        }
        None => Item::from_draft(row),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(name: &str, qty: f64, unit_cost: f64) -> ItemDraft {
        ItemDraft::new(name, qty, unit_cost)
    }

    fn catalog_with(names: &[(&str, f64, f64)]) -> Catalog {
        let mut cat = Catalog::new(MarginPolicy::Fixed { pct: 20.0 });
        for (n, q, c) in names {
            cat.add(draft(n, *q, *c)).unwrap();
        }
        cat
    }

    #[test]
    fn test_add_recomputes_whole_collection() {
        let mut cat = Catalog::new(MarginPolicy::Fixed { pct: 20.0 });
        cat.set_pool(10.0, 0.0);

        cat.add(draft("A", 10.0, 5.0)).unwrap();
        assert_eq!(cat.priced()[0].apportioned_unit_cost, 1.0);

        // Adding B doubles the denominator: A's share must drop too
        cat.add(draft("B", 10.0, 3.0)).unwrap();
        assert_eq!(cat.priced()[0].apportioned_unit_cost, 0.5);
        assert_eq!(cat.priced()[1].apportioned_unit_cost, 0.5);
    }

    #[test]
    fn test_add_rejects_invalid_input() {
        let mut cat = Catalog::default();
        assert!(cat.add(draft("", 1.0, 1.0)).is_err());
        assert!(cat.add(draft("A", 0.0, 1.0)).is_err());
        assert!(cat.is_empty());
    }

    #[test]
    fn test_edit_first_match_wins() {
        let mut cat = catalog_with(&[("A", 1.0, 1.0), ("A", 2.0, 2.0)]);

        cat.edit(
            "A",
            ItemPatch {
                unit_cost: Some(9.0),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(cat.items()[0].unit_cost, 9.0);
        assert_eq!(cat.items()[1].unit_cost, 2.0);
    }

    #[test]
    fn test_edit_unknown_name_is_diagnosed() {
        let mut cat = catalog_with(&[("A", 1.0, 1.0)]);
        let before = cat.fingerprint().clone();

        let err = cat.edit("missing", ItemPatch::default()).unwrap_err();
        assert!(matches!(err, CoreError::ItemNotFound(_)));
        assert_eq!(cat.fingerprint(), &before);
    }

    #[test]
    fn test_delete_removes_all_matches() {
        let mut cat = catalog_with(&[("A", 1.0, 1.0), ("B", 1.0, 1.0), ("A", 2.0, 2.0)]);
        let removed = cat.delete("A").unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cat.len(), 1);
        assert_eq!(cat.items()[0].name, "B");
    }

    #[test]
    fn test_delete_last_item_yields_empty_derived_state() {
        let mut cat = catalog_with(&[("A", 10.0, 5.0)]);
        let nonempty_fp = cat.fingerprint().clone();

        cat.delete("A").unwrap();
        assert!(cat.priced().is_empty());
        assert_ne!(cat.fingerprint(), &nonempty_fp);
    }

    #[test]
    fn test_bulk_replace_preserves_survivors() {
        let mut cat = catalog_with(&[("A", 1.0, 1.0), ("B", 2.0, 2.0), ("C", 3.0, 3.0)]);
        cat.items[1].image = Some(vec![1, 2, 3]);
        let b_created = cat.items()[1].created_at;

        // External edit dropped C and changed B's cost; A untouched.
        cat.bulk_replace(vec![draft("A", 1.0, 1.0), draft("B", 2.0, 4.5)]);

        assert_eq!(cat.len(), 2);
        let b = &cat.items()[1];
        assert_eq!(b.unit_cost, 4.5);
        assert_eq!(b.created_at, b_created);
        // Incoming row had no image: stored one survives
        assert_eq!(b.image, Some(vec![1, 2, 3]));
        // A's fields are untouched
        assert_eq!(cat.items()[0].unit_cost, 1.0);
    }

    #[test]
    fn test_edit_rejects_empty_rename() {
        let mut cat = catalog_with(&[("A", 1.0, 1.0)]);
        let before = cat.fingerprint().clone();

        let err = cat
            .edit(
                "A",
                ItemPatch {
                    name: Some("   ".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();

        assert!(matches!(err, CoreError::Validation(_)));
        assert_eq!(cat.items()[0].name, "A");
        assert_eq!(cat.fingerprint(), &before);
    }

    #[test]
    fn test_grid_edit_rejects_empty_name_untouched() {
        let mut cat = catalog_with(&[("A", 1.0, 1.0), ("B", 2.0, 2.0)]);
        let before = cat.fingerprint().clone();

        let err = cat
            .reconcile_grid(vec![draft("", 1.5, 1.0), draft("B", 2.0, 2.0)])
            .unwrap_err();

        assert!(matches!(err, CoreError::Validation(_)));
        // The valid second row was not applied either
        assert_eq!(cat.items()[0].quantity, 1.0);
        assert_eq!(cat.fingerprint(), &before);
    }

    #[test]
    fn test_grid_edit_with_more_rows_rejected_unchanged() {
        let mut cat = catalog_with(&[("A", 1.0, 1.0)]);
        let before_fp = cat.fingerprint().clone();

        let err = cat
            .reconcile_grid(vec![draft("A", 1.0, 1.0), draft("B", 1.0, 1.0)])
            .unwrap_err();
        assert!(matches!(err, CoreError::GridAdditionRejected { .. }));
        assert_eq!(cat.len(), 1);
        assert_eq!(cat.fingerprint(), &before_fp);
    }

    #[test]
    fn test_grid_edit_same_count_is_positional() {
        let mut cat = catalog_with(&[("A", 1.0, 1.0), ("B", 2.0, 2.0)]);
        let a_created = cat.items()[0].created_at;

        // Renaming A to A2 in the grid keeps the row's identity
        cat.reconcile_grid(vec![draft("A2", 1.5, 1.0), draft("B", 2.0, 2.0)])
            .unwrap();

        assert_eq!(cat.items()[0].name, "A2");
        assert_eq!(cat.items()[0].quantity, 1.5);
        assert_eq!(cat.items()[0].created_at, a_created);
    }

    #[test]
    fn test_grid_edit_fewer_rows_reconciles_deletions() {
        let mut cat = catalog_with(&[("A", 1.0, 1.0), ("B", 2.0, 2.0)]);
        cat.reconcile_grid(vec![draft("B", 2.0, 2.0)]).unwrap();

        assert_eq!(cat.len(), 1);
        assert_eq!(cat.items()[0].name, "B");
    }

    #[test]
    fn test_set_pool_recomputes_and_clamps() {
        let mut cat = catalog_with(&[("A", 10.0, 5.0)]);
        cat.set_pool(10.0, -3.0);

        assert_eq!(cat.pool().misc_costs_total, 0.0);
        assert_eq!(cat.priced()[0].apportioned_unit_cost, 1.0);
    }

    #[test]
    fn test_pool_change_shifts_fingerprint() {
        let mut cat = catalog_with(&[("A", 10.0, 5.0)]);
        let before = cat.fingerprint().clone();

        cat.set_pool(25.0, 0.0);
        assert_ne!(cat.fingerprint(), &before);
    }

    #[test]
    fn test_field_migrations_touch_every_item() {
        let mut cat = catalog_with(&[("A", 1.0, 1.0), ("B", 1.0, 1.0)]);

        cat.field_added("Categoria");
        assert!(cat
            .items()
            .iter()
            .all(|i| i.extras.contains_key("Categoria")));

        cat.field_renamed("Categoria", "Tipo");
        assert!(cat.items().iter().all(|i| i.extras.contains_key("Tipo")));

        cat.field_removed("Tipo");
        assert!(cat.items().iter().all(|i| i.extras.is_empty()));
    }
}
