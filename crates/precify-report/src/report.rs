//! # Report Builder
//!
//! Renders the derived collection into a paginated plain-text document, one
//! section per item.
//!
//! ## Page Layout
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Relatório de Precificação — página 1/2      │
//! │                                             │
//! │ ── Caderno A5 ──────────────────────        │
//! │ Custo total unitário: R$ 6.00               │
//! │ Margem: 20%                                 │
//! │ Preço à Vista: R$ 7.20                      │
//! │ Preço no Cartão: R$ 8.12                    │
//! │ Categoria: papelaria                        │
//! │                                             │
//! │ ── Fita Dupla Face ─────────────────        │
//! │ ...                                         │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Pagination is a fixed number of item sections per page. Rendering is pure:
//! the PDF rasterizer, download button, chat webhook — whatever consumes the
//! document — only ever sees finished text lines.

use chrono::{DateTime, NaiveDate, Utc};
use precify_core::types::PricedItem;
use serde::Serialize;
use uuid::Uuid;

/// Item sections per page. Matches what fits a portrait A4 at the default
/// font once extras are present.
pub const DEFAULT_ITEMS_PER_PAGE: usize = 5;

// =============================================================================
// Document Types
// =============================================================================

/// A finished, paginated report.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub pages: Vec<ReportPage>,
}

#[derive(Debug, Clone)]
pub struct ReportPage {
    /// 1-based page number.
    pub number: usize,
    pub lines: Vec<String>,
}

impl ReportDocument {
    /// Flattens the document into one text blob, pages separated by a form
    /// feed. This is what travels to the webhook.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.lines.join("\n"))
            .collect::<Vec<_>>()
            .join("\n\u{0c}\n")
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Metadata sent alongside the report text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub item_count: usize,
    /// Creation-date span of the covered items, absent for an empty report.
    pub date_range: Option<DateRange>,
    /// Representative image for chat previews, when the caller has one.
    pub cover_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

// =============================================================================
// Builder
// =============================================================================

/// Builds [`ReportDocument`]s from priced rows.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    items_per_page: usize,
}

impl Default for ReportBuilder {
    fn default() -> Self {
        ReportBuilder {
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the pagination density (minimum 1).
    pub fn items_per_page(mut self, count: usize) -> Self {
        self.items_per_page = count.max(1);
        self
    }

    /// Renders one section per item, `dynamic_fields` in registry order.
    ///
    /// An empty collection produces a single page saying so — the caller can
    /// always deliver whatever comes back.
    pub fn build(&self, rows: &[PricedItem], dynamic_fields: &[String]) -> ReportDocument {
        let generated_at = Utc::now();

        if rows.is_empty() {
            return ReportDocument {
                id: Uuid::new_v4(),
                generated_at,
                pages: vec![ReportPage {
                    number: 1,
                    lines: vec![
                        header_line(1, 1),
                        String::new(),
                        "Nenhum produto na coleção.".to_string(),
                    ],
                }],
            };
        }

        let chunks: Vec<&[PricedItem]> = rows.chunks(self.items_per_page).collect();
        let total_pages = chunks.len();

        let pages = chunks
            .into_iter()
            .enumerate()
            .map(|(idx, chunk)| {
                let number = idx + 1;
                let mut lines = vec![header_line(number, total_pages)];
                for row in chunk {
                    lines.push(String::new());
                    lines.extend(item_section(row, dynamic_fields));
                }
                ReportPage { number, lines }
            })
            .collect();

        ReportDocument {
            id: Uuid::new_v4(),
            generated_at,
            pages,
        }
    }

    /// Builds the delivery metadata for the same rows.
    pub fn summary(&self, rows: &[PricedItem], cover_image_url: Option<String>) -> ReportSummary {
        let dates: Vec<NaiveDate> = rows
            .iter()
            .map(|r| r.raw.created_at.date_naive())
            .collect();

        let date_range = match (dates.iter().min(), dates.iter().max()) {
            (Some(&from), Some(&to)) => Some(DateRange { from, to }),
            _ => None,
        };

        ReportSummary {
            item_count: rows.len(),
            date_range,
            cover_image_url,
        }
    }
}

// =============================================================================
// Rendering Helpers
// =============================================================================

fn header_line(page: usize, total: usize) -> String {
    format!("Relatório de Precificação — página {page}/{total}")
}

fn item_section(row: &PricedItem, dynamic_fields: &[String]) -> Vec<String> {
    let mut lines = vec![
        format!("── {} ──", row.raw.name),
        format!("Custo total unitário: {}", brl(row.total_unit_cost)),
        format!("Margem: {}%", trim_number(row.effective_margin_pct)),
        format!("Preço à Vista: {}", brl(row.cash_price)),
        format!("Preço no Cartão: {}", brl(row.card_price)),
    ];

    if !row.raw.supply_uses.is_empty() {
        lines.push("Insumos Usados:".to_string());
        for line in &row.raw.supply_uses {
            lines.push(format!(
                "- {}: {} {} x {} = {}",
                line.supply,
                trim_number(line.quantity_used),
                line.unit,
                brl(line.unit_price),
                brl(line.cost()),
            ));
        }
    }

    for field in dynamic_fields {
        if let Some(value) = row.raw.extras.get(field) {
            if !value.is_empty() {
                lines.push(format!("{}: {}", field, value.as_display()));
            }
        }
    }

    lines
}

fn brl(value: f64) -> String {
    format!("R$ {:.2}", value)
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use precify_core::catalog::Catalog;
    use precify_core::fields::FieldValue;
    use precify_core::types::{ItemDraft, MarginPolicy};

    fn rows(count: usize) -> Vec<PricedItem> {
        let mut cat = Catalog::new(MarginPolicy::Fixed { pct: 20.0 });
        cat.set_pool(10.0, 0.0);
        for i in 0..count {
            cat.add(ItemDraft::new(format!("Produto {i}"), 1.0, 5.0))
                .unwrap();
        }
        cat.priced().to_vec()
    }

    #[test]
    fn test_one_section_per_item() {
        let doc = ReportBuilder::new().build(&rows(3), &[]);
        let text = doc.text();

        for i in 0..3 {
            assert!(text.contains(&format!("── Produto {i} ──")));
        }
        assert!(text.contains("Preço à Vista"));
        assert!(text.contains("Preço no Cartão"));
    }

    #[test]
    fn test_fixed_items_per_page() {
        let doc = ReportBuilder::new().items_per_page(2).build(&rows(5), &[]);

        assert_eq!(doc.page_count(), 3);
        assert!(doc.pages[0].lines[0].contains("página 1/3"));
        assert!(doc.pages[2].lines[0].contains("página 3/3"));
        // Last page holds the remainder
        let last = doc.pages[2].lines.join("\n");
        assert!(last.contains("Produto 4"));
        assert!(!last.contains("Produto 3"));
    }

    #[test]
    fn test_empty_collection_is_graceful() {
        let doc = ReportBuilder::new().build(&[], &[]);

        assert_eq!(doc.page_count(), 1);
        assert!(doc.text().contains("Nenhum produto"));
    }

    #[test]
    fn test_dynamic_extras_rendered_in_order() {
        let mut cat = Catalog::new(MarginPolicy::Fixed { pct: 20.0 });
        let mut draft = ItemDraft::new("Caderno", 1.0, 5.0);
        draft.extras.insert(
            "Categoria".to_string(),
            FieldValue::Text("papelaria".to_string()),
        );
        draft
            .extras
            .insert("Fornecedor".to_string(), FieldValue::Empty);
        cat.add(draft).unwrap();

        let fields = vec!["Categoria".to_string(), "Fornecedor".to_string()];
        let doc = ReportBuilder::new().build(cat.priced(), &fields);
        let text = doc.text();

        assert!(text.contains("Categoria: papelaria"));
        // Empty extras are skipped rather than rendered blank
        assert!(!text.contains("Fornecedor:"));
    }

    #[test]
    fn test_supply_lines_rendered_under_their_heading() {
        use precify_core::types::SupplyUse;

        let mut cat = Catalog::new(MarginPolicy::Fixed { pct: 20.0 });
        let mut draft = ItemDraft::new("Caixa Decorada", 1.0, 5.0);
        draft.supply_uses.push(SupplyUse {
            supply: "Fita de Cetim".to_string(),
            quantity_used: 0.5,
            unit: "m".to_string(),
            unit_price: 1.2,
        });
        cat.add(draft).unwrap();
        cat.add(ItemDraft::new("Caderno", 1.0, 5.0)).unwrap();

        let doc = ReportBuilder::new().build(cat.priced(), &[]);
        let text = doc.text();

        assert!(text.contains("Insumos Usados:"));
        assert!(text.contains("- Fita de Cetim: 0.50 m x R$ 1.20 = R$ 0.60"));
        // Items without a bill of materials get no heading
        assert_eq!(text.matches("Insumos Usados:").count(), 1);
    }

    #[test]
    fn test_summary_metadata() {
        let rows = rows(4);
        let summary = ReportBuilder::new().summary(&rows, Some("https://img/capa.png".into()));

        assert_eq!(summary.item_count, 4);
        let range = summary.date_range.unwrap();
        assert!(range.from <= range.to);
        assert_eq!(summary.cover_image_url.as_deref(), Some("https://img/capa.png"));
    }

    #[test]
    fn test_summary_of_empty_collection() {
        let summary = ReportBuilder::new().summary(&[], None);
        assert_eq!(summary.item_count, 0);
        assert!(summary.date_range.is_none());
        assert!(summary.cover_image_url.is_none());
    }
}
