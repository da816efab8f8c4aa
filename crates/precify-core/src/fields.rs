//! # Dynamic Field Registry
//!
//! User-declared columns that extend the item and supply schemas at runtime.
//!
//! ## Schema Migration Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  Registry change          Effect on every matching record           │
//! │  ───────────────          ─────────────────────────────────────     │
//! │  add field        ──────► back-fill an empty value                  │
//! │  rename field     ──────► rename the attribute in place, no loss    │
//! │  delete field     ──────► strip the attribute                       │
//! │                                                                     │
//! │  Invariant: every record exposes a value (possibly empty) for       │
//! │  every field whose scope matches its entity type.                   │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The registry itself is pure bookkeeping; applying a migration to a
//! concrete collection goes through the free functions at the bottom, which
//! work on anything implementing [`HasExtras`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::validation::{coerce_number, validate_field_name};

// =============================================================================
// Entity Kind & Field Scope
// =============================================================================

/// The two record families dynamic fields can attach to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Items,
    Supplies,
}

/// Which entity family a field applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldScope {
    Items,
    Supplies,
    Both,
}

impl FieldScope {
    /// Whether this scope covers records of the given entity kind.
    pub fn covers(&self, entity: EntityKind) -> bool {
        matches!(
            (self, entity),
            (FieldScope::Both, _)
                | (FieldScope::Items, EntityKind::Items)
                | (FieldScope::Supplies, EntityKind::Supplies)
        )
    }

    /// Stable lowercase label for messages and logs.
    pub fn label(&self) -> &'static str {
        match self {
            FieldScope::Items => "items",
            FieldScope::Supplies => "supplies",
            FieldScope::Both => "both",
        }
    }
}

// =============================================================================
// Field Kind & Value
// =============================================================================

/// Declared type of a dynamic field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    /// One of a declared list of options.
    Choice,
}

/// A value stored under a dynamic field.
///
/// `Empty` is the back-fill value for records that predate the field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum FieldValue {
    Empty,
    Text(String),
    Number(f64),
}

impl FieldValue {
    /// Renders the value as a CSV cell / report line fragment.
    pub fn as_display(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => format!("{}", n),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FieldValue::Empty) || matches!(self, FieldValue::Text(s) if s.is_empty())
    }
}

/// Anything carrying a dynamic-field map. Implemented by `Item` and `Supply`.
pub trait HasExtras {
    fn extras(&self) -> &BTreeMap<String, FieldValue>;
    fn extras_mut(&mut self) -> &mut BTreeMap<String, FieldValue>;
}

// =============================================================================
// Field Definition
// =============================================================================

/// A user-declared column definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub scope: FieldScope,
    pub kind: FieldKind,
    /// Options for `Choice` fields; ignored for other kinds.
    #[serde(default)]
    pub choices: Vec<String>,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, scope: FieldScope, kind: FieldKind) -> Self {
        FieldDef {
            name: name.into(),
            scope,
            kind,
            choices: Vec::new(),
        }
    }
}

// =============================================================================
// Field Registry
// =============================================================================

/// The ordered set of declared dynamic fields.
///
/// Order matters: CSV columns and report lines follow declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldRegistry {
    defs: Vec<FieldDef>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All declared fields, in declaration order.
    pub fn defs(&self) -> &[FieldDef] {
        &self.defs
    }

    /// Fields covering the given entity kind, in declaration order.
    pub fn fields_for(&self, entity: EntityKind) -> Vec<&FieldDef> {
        self.defs.iter().filter(|d| d.scope.covers(entity)).collect()
    }

    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.defs.iter().find(|d| d.name == name)
    }

    /// Declares a new field.
    ///
    /// Rejected when a field with the same name (case-insensitive) already
    /// exists for the same scope; no mutation occurs in that case.
    pub fn add(&mut self, def: FieldDef) -> CoreResult<()> {
        validate_field_name(&def.name)?;

        let exists = self.defs.iter().any(|d| {
            d.name.eq_ignore_ascii_case(def.name.trim()) && d.scope == def.scope
        });
        if exists {
            return Err(CoreError::DuplicateField {
                name: def.name,
                scope: def.scope.label().to_string(),
            });
        }

        self.defs.push(FieldDef {
            name: def.name.trim().to_string(),
            ..def
        });
        Ok(())
    }

    /// Renames a field (first match by old name).
    ///
    /// Callers must follow up with [`rename_field_values`] on every affected
    /// collection, or the invariant above breaks.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> CoreResult<FieldScope> {
        validate_field_name(new_name)?;

        let def = self
            .defs
            .iter_mut()
            .find(|d| d.name == old_name)
            .ok_or_else(|| CoreError::FieldNotFound(old_name.to_string()))?;
        def.name = new_name.trim().to_string();
        Ok(def.scope)
    }

    /// Removes a field definition, returning its scope so callers can strip
    /// the attribute from the matching collections.
    pub fn remove(&mut self, name: &str) -> CoreResult<FieldScope> {
        let pos = self
            .defs
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| CoreError::FieldNotFound(name.to_string()))?;
        Ok(self.defs.remove(pos).scope)
    }

    /// Coerces a raw string into a typed value for the named field.
    ///
    /// Best-effort by design: a number cell that won't parse becomes 0, a
    /// choice outside the declared options is kept as text (the registry may
    /// have changed after the data was written). Unknown fields default to
    /// text — uncurated CSVs routinely carry columns nobody declared.
    pub fn normalize_value(&self, field_name: &str, raw: &str) -> FieldValue {
        let raw = raw.trim();
        if raw.is_empty() {
            return FieldValue::Empty;
        }

        match self.get(field_name).map(|d| d.kind) {
            Some(FieldKind::Number) => FieldValue::Number(coerce_number(raw)),
            _ => FieldValue::Text(raw.to_string()),
        }
    }
}

// =============================================================================
// Collection Migrations
// =============================================================================

/// Back-fills an empty value for `name` on every record missing it.
pub fn backfill_field<R: HasExtras>(rows: &mut [R], name: &str) {
    for row in rows {
        row.extras_mut()
            .entry(name.to_string())
            .or_insert(FieldValue::Empty);
    }
}

/// Removes the `name` attribute from every record.
pub fn strip_field<R: HasExtras>(rows: &mut [R], name: &str) {
    for row in rows {
        row.extras_mut().remove(name);
    }
}

/// Renames the attribute in place on every record, without data loss.
/// Records lacking the old attribute get an empty value under the new name.
pub fn rename_field_values<R: HasExtras>(rows: &mut [R], old_name: &str, new_name: &str) {
    for row in rows {
        let extras = row.extras_mut();
        let value = extras.remove(old_name).unwrap_or(FieldValue::Empty);
        extras.insert(new_name.to_string(), value);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Item, ItemDraft};

    fn registry_with(fields: Vec<FieldDef>) -> FieldRegistry {
        let mut reg = FieldRegistry::new();
        for f in fields {
            reg.add(f).unwrap();
        }
        reg
    }

    #[test]
    fn test_scope_covers() {
        assert!(FieldScope::Both.covers(EntityKind::Items));
        assert!(FieldScope::Both.covers(EntityKind::Supplies));
        assert!(FieldScope::Items.covers(EntityKind::Items));
        assert!(!FieldScope::Items.covers(EntityKind::Supplies));
        assert!(!FieldScope::Supplies.covers(EntityKind::Items));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut reg = registry_with(vec![FieldDef::new(
            "Categoria",
            FieldScope::Items,
            FieldKind::Text,
        )]);

        // Same name + scope, case-insensitive: rejected, registry unchanged
        let err = reg
            .add(FieldDef::new("categoria", FieldScope::Items, FieldKind::Text))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateField { .. }));
        assert_eq!(reg.defs().len(), 1);

        // Same name, different scope: allowed
        reg.add(FieldDef::new(
            "Categoria",
            FieldScope::Supplies,
            FieldKind::Text,
        ))
        .unwrap();
        assert_eq!(reg.defs().len(), 2);
    }

    #[test]
    fn test_fields_for_entity() {
        let reg = registry_with(vec![
            FieldDef::new("A", FieldScope::Items, FieldKind::Text),
            FieldDef::new("B", FieldScope::Supplies, FieldKind::Text),
            FieldDef::new("C", FieldScope::Both, FieldKind::Number),
        ]);

        let item_fields: Vec<&str> = reg
            .fields_for(EntityKind::Items)
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(item_fields, vec!["A", "C"]);
    }

    #[test]
    fn test_normalize_value_by_kind() {
        let reg = registry_with(vec![
            FieldDef::new("Peso", FieldScope::Items, FieldKind::Number),
            FieldDef::new("Cor", FieldScope::Items, FieldKind::Text),
        ]);

        assert_eq!(reg.normalize_value("Peso", "2,5"), FieldValue::Number(2.5));
        assert_eq!(reg.normalize_value("Peso", "junk"), FieldValue::Number(0.0));
        assert_eq!(
            reg.normalize_value("Cor", "azul"),
            FieldValue::Text("azul".to_string())
        );
        assert_eq!(reg.normalize_value("Peso", "  "), FieldValue::Empty);
        // Undeclared column: kept as text rather than dropped
        assert_eq!(
            reg.normalize_value("Obs", "frágil"),
            FieldValue::Text("frágil".to_string())
        );
    }

    #[test]
    fn test_backfill_strip_rename_roundtrip() {
        let mut items: Vec<Item> = vec![
            Item::from_draft(ItemDraft::new("A", 1.0, 1.0)),
            Item::from_draft(ItemDraft::new("B", 1.0, 1.0)),
        ];
        items[0]
            .extras
            .insert("Categoria".to_string(), FieldValue::Text("papel".into()));

        backfill_field(&mut items, "Categoria");
        // Existing value untouched, missing one filled
        assert_eq!(
            items[0].extras["Categoria"],
            FieldValue::Text("papel".to_string())
        );
        assert_eq!(items[1].extras["Categoria"], FieldValue::Empty);

        rename_field_values(&mut items, "Categoria", "Tipo");
        assert!(items[0].extras.get("Categoria").is_none());
        assert_eq!(
            items[0].extras["Tipo"],
            FieldValue::Text("papel".to_string())
        );

        strip_field(&mut items, "Tipo");
        assert!(items[0].extras.is_empty());
        assert!(items[1].extras.is_empty());
    }

    #[test]
    fn test_supply_collection_migrates_like_items() {
        use crate::types::Supply;

        let mut supplies = vec![
            Supply::new("Papel", "papelaria", "un", 0.5),
            Supply::new("Fita", "papelaria", "m", 2.0),
        ];

        backfill_field(&mut supplies, "Fornecedor");
        assert!(supplies
            .iter()
            .all(|s| s.extras["Fornecedor"] == FieldValue::Empty));

        supplies[0]
            .extras
            .insert("Fornecedor".to_string(), FieldValue::Text("Loja do Zé".into()));
        rename_field_values(&mut supplies, "Fornecedor", "Origem");
        assert_eq!(
            supplies[0].extras["Origem"],
            FieldValue::Text("Loja do Zé".to_string())
        );
        assert_eq!(supplies[1].extras["Origem"], FieldValue::Empty);

        strip_field(&mut supplies, "Origem");
        assert!(supplies.iter().all(|s| s.extras.is_empty()));
    }

    #[test]
    fn test_remove_missing_field_errors() {
        let mut reg = FieldRegistry::new();
        assert!(matches!(
            reg.remove("nope"),
            Err(CoreError::FieldNotFound(_))
        ));
    }
}
