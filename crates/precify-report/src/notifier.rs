//! # Webhook Notifier
//!
//! Delivers a finished report to a chat/messaging webhook as JSON.
//!
//! Delivery failure is a warning, never a workflow error: the caller logs it
//! and moves on. That policy lives with the caller; this module just reports
//! honestly what happened.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::error::{ReportError, ReportResult};
use crate::report::{ReportDocument, ReportSummary};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Anything that can carry a report to the outside world.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, document: &ReportDocument, summary: &ReportSummary)
        -> ReportResult<()>;
}

/// The JSON body posted to the endpoint.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: String,
    summary: &'a ReportSummary,
}

/// Posts reports to a fixed HTTP endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: impl Into<String>) -> ReportResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()?;
        Ok(WebhookNotifier {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(
        &self,
        document: &ReportDocument,
        summary: &ReportSummary,
    ) -> ReportResult<()> {
        let payload = WebhookPayload {
            text: document.text(),
            summary,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReportError::Delivery {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        debug!(
            report = %document.id,
            items = summary.item_count,
            "report delivered"
        );
        Ok(())
    }
}
