//! # precify-report: Report Generation & Delivery for Precify
//!
//! Two thin collaborators around the derived collection:
//!
//! - [`report::ReportBuilder`] — pure rendering into a paginated plain-text
//!   document, one section per priced item
//! - [`notifier::WebhookNotifier`] — JSON delivery to a messaging endpoint;
//!   failure is reported, never fatal to the pricing workflow
//!
//! The builder knows nothing about transport; the notifier knows nothing
//! about pricing. The session layer (or any caller) glues them.

pub mod error;
pub mod notifier;
pub mod report;

pub use error::{ReportError, ReportResult};
pub use notifier::{Notifier, WebhookNotifier};
pub use report::{ReportBuilder, ReportDocument, ReportPage, ReportSummary};
