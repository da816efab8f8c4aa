//! # CSV Codec
//!
//! Translates between the in-memory collection and the remote CSV document.
//!
//! ## Column Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Produto │ Qtd │ Custo Unitário │ Custos Extras Produto │ Margem (%)   │
//! │──────────┼─────┼────────────────┼───────────────────────┼──────────────│
//! │  ← raw input columns: read back on decode ───────────────────────────  │
//! │                                                                         │
//! │  Rateio │ Custo Total Unitário │ Preço à Vista │ Preço no Cartão       │
//! │─────────┼──────────────────────┼───────────────┼───────────────────────│
//! │  ← derived columns: written for human readers, IGNORED on decode       │
//! │    (they are recomputed from the inputs after every load)               │
//! │                                                                         │
//! │  <dynamic fields in registry order> │ <unknown columns>                 │
//! │─────────────────────────────────────┼───────────────────────────────────│
//! │  ← extension attributes             │ ← preserved as text extras        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Decode Posture: Tolerant
//! The remote document is hand-editable, so decode never fails on content:
//! - missing columns are back-filled with defaults
//! - non-numeric cells in numeric columns coerce to 0
//! - columns nobody declared are kept as text extras, not dropped
//!
//! Only structural problems (unbalanced quotes, broken framing) error out.
//!
//! Binary fields (item images) are never written: the document must stay a
//! plain, diffable CSV.

use std::collections::BTreeMap;

use csv::{ReaderBuilder, WriterBuilder};
use precify_core::fields::FieldValue;
use precify_core::types::{ItemDraft, PricedItem, Supply, SupplyUse};
use precify_core::validation::{coerce_number, coerce_quantity};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Column Names
// =============================================================================
// Headers are user-facing (they show up when the document is opened in a
// spreadsheet), hence the domain language rather than identifiers.

pub const COL_NAME: &str = "Produto";
pub const COL_QUANTITY: &str = "Qtd";
pub const COL_UNIT_COST: &str = "Custo Unitário";
pub const COL_EXTRA_COST: &str = "Custos Extras Produto";
pub const COL_MARGIN: &str = "Margem (%)";
pub const COL_SUPPLY_USES: &str = "Insumos Usados";
pub const COL_APPORTIONED: &str = "Rateio";
pub const COL_TOTAL_UNIT_COST: &str = "Custo Total Unitário";
pub const COL_CASH_PRICE: &str = "Preço à Vista";
pub const COL_CARD_PRICE: &str = "Preço no Cartão";

pub const COL_SUPPLY_NAME: &str = "Nome";
pub const COL_SUPPLY_CATEGORY: &str = "Categoria";
pub const COL_SUPPLY_UNIT: &str = "Unidade";
pub const COL_SUPPLY_PRICE: &str = "Preço Unitário (R$)";

/// Raw input columns, in wire order.
const INPUT_COLUMNS: [&str; 5] = [
    COL_NAME,
    COL_QUANTITY,
    COL_UNIT_COST,
    COL_EXTRA_COST,
    COL_MARGIN,
];

/// Derived columns: written on encode, skipped on decode.
const DERIVED_COLUMNS: [&str; 4] = [
    COL_APPORTIONED,
    COL_TOTAL_UNIT_COST,
    COL_CASH_PRICE,
    COL_CARD_PRICE,
];

/// Base columns of the supply document, in wire order.
const SUPPLY_COLUMNS: [&str; 4] = [
    COL_SUPPLY_NAME,
    COL_SUPPLY_CATEGORY,
    COL_SUPPLY_UNIT,
    COL_SUPPLY_PRICE,
];

// =============================================================================
// Encode
// =============================================================================

/// Serializes the derived collection (minus binary fields) to CSV text.
///
/// `dynamic_fields` supplies the extension columns in registry order, so the
/// document layout is stable across sessions. An item missing one of those
/// fields gets an empty cell.
pub fn encode(rows: &[PricedItem], dynamic_fields: &[String]) -> StoreResult<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let mut header: Vec<&str> = INPUT_COLUMNS.to_vec();
    header.push(COL_SUPPLY_USES);
    header.extend(DERIVED_COLUMNS);
    header.extend(dynamic_fields.iter().map(String::as_str));
    writer.write_record(&header)?;

    for row in rows {
        let mut record: Vec<String> = vec![
            row.raw.name.clone(),
            format_number(row.raw.quantity),
            format_money(row.raw.unit_cost),
            format_money(row.raw.extra_cost),
            row.raw.margin_pct.map(format_number).unwrap_or_default(),
            encode_supply_uses(&row.raw.supply_uses)?,
            format_money(row.apportioned_unit_cost),
            format_money(row.total_unit_cost),
            format_money(row.cash_price),
            format_money(row.card_price),
        ];
        for field in dynamic_fields {
            let cell = row
                .raw
                .extras
                .get(field)
                .map(FieldValue::as_display)
                .unwrap_or_default();
            record.push(cell);
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| StoreError::MalformedDocument(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StoreError::MalformedDocument(e.to_string()))
}

// =============================================================================
// Decode
// =============================================================================

/// Parses CSV text back into raw item drafts.
///
/// Derived columns are ignored (the catalog recomputes them), images never
/// travel through the document, and every unknown column survives as a text
/// extra so a round trip loses nothing a human typed in.
///
/// An empty or header-only document decodes to an empty collection.
pub fn decode(text: &str) -> StoreResult<Vec<ItemDraft>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut drafts = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cell = |col: &str| -> &str {
            headers
                .iter()
                .position(|h| h.as_str() == col)
                .and_then(|idx| record.get(idx))
                .unwrap_or("")
                .trim()
        };

        let margin_cell = cell(COL_MARGIN);
        let mut draft = ItemDraft {
            name: cell(COL_NAME).to_string(),
            quantity: coerce_quantity(cell(COL_QUANTITY)),
            unit_cost: coerce_number(cell(COL_UNIT_COST)),
            extra_cost: coerce_number(cell(COL_EXTRA_COST)),
            margin_pct: if margin_cell.is_empty() {
                None
            } else {
                Some(coerce_number(margin_cell))
            },
            image: None,
            extras: BTreeMap::new(),
            supply_uses: decode_supply_uses(cell(COL_SUPPLY_USES)),
        };

        for (idx, header) in headers.iter().enumerate() {
            if INPUT_COLUMNS.contains(&header.as_str())
                || DERIVED_COLUMNS.contains(&header.as_str())
                || header.as_str() == COL_SUPPLY_USES
            {
                continue;
            }
            let raw = record.get(idx).unwrap_or("").trim();
            let value = if raw.is_empty() {
                FieldValue::Empty
            } else {
                FieldValue::Text(raw.to_string())
            };
            draft.extras.insert(header.clone(), value);
        }

        drafts.push(draft);
    }

    Ok(drafts)
}

// =============================================================================
// Supply Document
// =============================================================================

/// Serializes the supply collection to CSV text.
///
/// Dynamic fields shadowing a base supply column are skipped — the base
/// column already carries that data.
pub fn encode_supplies(supplies: &[Supply], dynamic_fields: &[String]) -> StoreResult<String> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let dynamic: Vec<&str> = dynamic_fields
        .iter()
        .map(String::as_str)
        .filter(|f| !SUPPLY_COLUMNS.contains(f))
        .collect();

    let mut header: Vec<&str> = SUPPLY_COLUMNS.to_vec();
    header.extend(&dynamic);
    writer.write_record(&header)?;

    for supply in supplies {
        let mut record: Vec<String> = vec![
            supply.name.clone(),
            supply.category.clone(),
            supply.unit.clone(),
            format_money(supply.unit_price),
        ];
        for field in &dynamic {
            let cell = supply
                .extras
                .get(*field)
                .map(FieldValue::as_display)
                .unwrap_or_default();
            record.push(cell);
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| StoreError::MalformedDocument(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| StoreError::MalformedDocument(e.to_string()))
}

/// Parses CSV text back into supplies, with the same tolerant posture as
/// [`decode`].
pub fn decode_supplies(text: &str) -> StoreResult<Vec<Supply>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut supplies = Vec::new();
    for record in reader.records() {
        let record = record?;
        let cell = |col: &str| -> &str {
            headers
                .iter()
                .position(|h| h.as_str() == col)
                .and_then(|idx| record.get(idx))
                .unwrap_or("")
                .trim()
        };

        let mut supply = Supply::new(
            cell(COL_SUPPLY_NAME),
            cell(COL_SUPPLY_CATEGORY),
            cell(COL_SUPPLY_UNIT),
            coerce_number(cell(COL_SUPPLY_PRICE)),
        );

        for (idx, header) in headers.iter().enumerate() {
            if SUPPLY_COLUMNS.contains(&header.as_str()) {
                continue;
            }
            let raw = record.get(idx).unwrap_or("").trim();
            let value = if raw.is_empty() {
                FieldValue::Empty
            } else {
                FieldValue::Text(raw.to_string())
            };
            supply.extras.insert(header.clone(), value);
        }

        supplies.push(supply);
    }

    Ok(supplies)
}

// =============================================================================
// Cell Formatting
// =============================================================================

/// The bill of materials travels as JSON inside one cell; an empty bill is
/// an empty cell.
fn encode_supply_uses(uses: &[SupplyUse]) -> StoreResult<String> {
    if uses.is_empty() {
        return Ok(String::new());
    }
    serde_json::to_string(uses).map_err(|e| StoreError::MalformedDocument(e.to_string()))
}

/// Lenient inverse: a cell that is not valid JSON decodes as no bill of
/// materials rather than an error.
fn decode_supply_uses(cell: &str) -> Vec<SupplyUse> {
    if cell.is_empty() {
        return Vec::new();
    }
    serde_json::from_str(cell).unwrap_or_default()
}

/// Monetary cells carry two decimal places.
fn format_money(value: f64) -> String {
    format!("{:.2}", value)
}

/// Quantities and margins keep their natural representation, dropping the
/// trailing ".0" on whole numbers so hand editing stays pleasant.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
