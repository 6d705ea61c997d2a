use super::common::*;

use std::sync::Arc;

use crate::workflows::followup::{FollowupPipeline, FollowupService, InvoiceFact, MessageDrafter};

fn batch() -> Vec<InvoiceFact> {
    vec![
        escalated_invoice(),
        InvoiceFact {
            invoice_id: "INV-1002".to_string(),
            days_overdue: 0,
            ..invoice()
        },
        invoice(),
    ]
}

#[tokio::test]
async fn one_failed_draft_does_not_abort_the_batch() {
    let drafter = Arc::new(UnavailableDrafter::for_invoices(&["INV-2001"]));
    let service = FollowupService::new(
        FollowupPipeline::default().with_retry(no_backoff(2)),
        drafter.clone(),
    );

    let report = service.evaluate_batch(batch(), today(), false).await;

    assert_eq!(report.entries.len(), 3);
    assert_eq!(report.failed_drafts(), 1);
    assert_eq!(drafter.calls(), 2);

    let failed = &report.entries[0];
    assert!(failed.drafting_error.is_some());
    assert!(failed.surfaced_message.is_none());
    assert!(failed.state.decision.is_some());

    let skipped = &report.entries[1];
    assert_eq!(skipped.withhold_reason, Some("Follow-up not required."));

    let drafted = &report.entries[2];
    assert!(drafted.surfaced_message.is_some());
    assert!(drafted.withhold_reason.is_none());
}

#[tokio::test]
async fn dry_run_batches_never_call_the_drafter() {
    let drafter = Arc::new(StaticDrafter::polite());
    let service = FollowupService::new(FollowupPipeline::default(), drafter.clone());

    let report = service.evaluate_batch(batch(), today(), true).await;

    assert_eq!(drafter.calls(), 0);
    assert_eq!(report.failed_drafts(), 0);
    assert!(report
        .entries
        .iter()
        .all(|entry| entry.state.message.is_none() && entry.state.control_decision.is_some()));
    assert!(service.pipeline().has_drafting());
}

#[tokio::test]
async fn summary_and_markdown_follow_input_order() {
    let drafter: Arc<dyn MessageDrafter> = Arc::new(StaticDrafter::polite());
    let service = FollowupService::new(FollowupPipeline::default(), drafter);

    let report = service.evaluate_batch(batch(), today(), false).await;
    let ids: Vec<_> = report
        .summary()
        .into_iter()
        .map(|row| row.invoice_id)
        .collect();
    assert_eq!(ids, vec!["INV-2001", "INV-1002", "INV-1001"]);

    let markdown = report.markdown();
    let first = markdown.find("## Invoice 1: INV-2001").expect("first section");
    let third = markdown.find("## Invoice 3: INV-1001").expect("third section");
    assert!(first < third);
}
