use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{FollowupMessage, InvoiceFact, PipelineState, WithholdReason};
use super::drafting::MessageDrafter;
use super::pipeline::{FollowupPipeline, InvoiceOutcome};
use super::report::{render_markdown, SummaryRow};

/// Service running invoice batches through the pipeline and an injected drafter.
pub struct FollowupService<D: ?Sized> {
    pipeline: Arc<FollowupPipeline>,
    dry_pipeline: Arc<FollowupPipeline>,
    drafter: Arc<D>,
}

impl<D> FollowupService<D>
where
    D: MessageDrafter + ?Sized + 'static,
{
    pub fn new(pipeline: FollowupPipeline, drafter: Arc<D>) -> Self {
        let dry_pipeline = Arc::new(pipeline.clone().dry_run());
        Self {
            pipeline: Arc::new(pipeline),
            dry_pipeline,
            drafter,
        }
    }

    pub fn pipeline(&self) -> &FollowupPipeline {
        &self.pipeline
    }

    /// Evaluate every invoice independently; one invoice's drafting failure never aborts the batch.
    pub async fn evaluate_batch(
        &self,
        invoices: Vec<InvoiceFact>,
        today: NaiveDate,
        dry_run: bool,
    ) -> BatchReport {
        let pipeline = if dry_run {
            &self.dry_pipeline
        } else {
            &self.pipeline
        };

        let mut outcomes = Vec::with_capacity(invoices.len());
        for invoice in invoices {
            outcomes.push(pipeline.run(invoice, today, self.drafter.as_ref()).await);
        }

        BatchReport::new(today, outcomes)
    }
}

/// Batch result with reviewer-facing views precomputed.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub today: NaiveDate,
    pub entries: Vec<ReviewEntry>,
}

impl BatchReport {
    pub fn new(today: NaiveDate, outcomes: Vec<InvoiceOutcome>) -> Self {
        Self {
            today,
            entries: outcomes.into_iter().map(ReviewEntry::from).collect(),
        }
    }

    pub fn states(&self) -> Vec<PipelineState> {
        self.entries.iter().map(|entry| entry.state.clone()).collect()
    }

    pub fn summary(&self) -> Vec<SummaryRow> {
        self.entries
            .iter()
            .map(|entry| SummaryRow::from_state(&entry.state))
            .collect()
    }

    pub fn markdown(&self) -> String {
        render_markdown(&self.states())
    }

    pub fn failed_drafts(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.drafting_error.is_some())
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewEntry {
    pub state: PipelineState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surfaced_message: Option<FollowupMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub withhold_reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drafting_error: Option<String>,
}

impl From<InvoiceOutcome> for ReviewEntry {
    fn from(outcome: InvoiceOutcome) -> Self {
        let InvoiceOutcome {
            state,
            drafting_error,
        } = outcome;
        let surfaced_message = state.surfaced_message().cloned();
        let withhold_reason = state.withhold_reason().map(WithholdReason::label);
        Self {
            state,
            surfaced_message,
            withhold_reason,
            drafting_error,
        }
    }
}
