use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::workflows::followup::{
    ContextBuilder, DecisionEngine, DraftingBundle, DraftingError, FollowupMessage,
    FollowupPolicy, InvoiceFact, MessageDrafter, RelationshipTier, RetryPolicy,
};

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 30).expect("valid date")
}

pub(super) fn days_ago(days: i64) -> NaiveDate {
    today() - chrono::Duration::days(days)
}

/// Recurring client, two weeks overdue, no history.
pub(super) fn invoice() -> InvoiceFact {
    InvoiceFact {
        client_name: "Acme Co".to_string(),
        invoice_id: "INV-1001".to_string(),
        invoice_amount: 1500.0,
        currency: "USD".to_string(),
        invoice_issue_date: NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid date"),
        days_overdue: 14,
        last_followup_date: None,
        relationship_tag: RelationshipTier::Recurring,
        notes: String::new(),
    }
}

/// Long overdue, large, risky client with negative payment history.
pub(super) fn escalated_invoice() -> InvoiceFact {
    InvoiceFact {
        invoice_id: "INV-2001".to_string(),
        client_name: "Globex".to_string(),
        invoice_amount: 9000.0,
        days_overdue: 45,
        relationship_tag: RelationshipTier::Risky,
        notes: "Late payment, ignored prior reminders.".to_string(),
        ..invoice()
    }
}

pub(super) fn context_builder() -> ContextBuilder {
    let policy = FollowupPolicy::default();
    ContextBuilder::new(policy.scoring, policy.keywords)
}

pub(super) fn decision_engine() -> DecisionEngine {
    let policy = FollowupPolicy::default();
    DecisionEngine::new(policy.timing, policy.keywords)
}

pub(super) fn no_backoff(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        backoff_min: Duration::ZERO,
        backoff_max: Duration::ZERO,
    }
}

pub(super) fn polite_message(invoice_id: &str) -> FollowupMessage {
    FollowupMessage {
        subject: format!("Friendly reminder: invoice {invoice_id}"),
        body: format!(
            "Hi there, this is a quick reminder that invoice {invoice_id} is now past due. \
             Please let us know if you have any questions."
        ),
        reasoning: "Neutral reminder for an overdue invoice.".to_string(),
    }
}

/// Returns the same message every time.
pub(super) struct StaticDrafter {
    pub(super) message: Option<FollowupMessage>,
    pub(super) calls: AtomicU32,
}

impl StaticDrafter {
    pub(super) fn polite() -> Self {
        Self {
            message: None,
            calls: AtomicU32::new(0),
        }
    }

    pub(super) fn with_message(message: FollowupMessage) -> Self {
        Self {
            message: Some(message),
            calls: AtomicU32::new(0),
        }
    }

    pub(super) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageDrafter for StaticDrafter {
    async fn draft(&self, bundle: &DraftingBundle) -> Result<FollowupMessage, DraftingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .message
            .clone()
            .unwrap_or_else(|| polite_message(&bundle.invoice.invoice_id)))
    }
}

/// Fails with a transport error a fixed number of times before succeeding.
pub(super) struct FlakyDrafter {
    pub(super) failures: u32,
    pub(super) calls: AtomicU32,
}

impl FlakyDrafter {
    pub(super) fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    pub(super) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageDrafter for FlakyDrafter {
    async fn draft(&self, bundle: &DraftingBundle) -> Result<FollowupMessage, DraftingError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(DraftingError::Transport(format!("connection reset ({call})")));
        }
        Ok(polite_message(&bundle.invoice.invoice_id))
    }
}

/// Drafting backend that is switched off for the listed invoices (all when empty).
#[derive(Default)]
pub(super) struct UnavailableDrafter {
    pub(super) invoice_ids: HashSet<String>,
    pub(super) calls: AtomicU32,
}

impl UnavailableDrafter {
    pub(super) fn for_invoices(ids: &[&str]) -> Self {
        Self {
            invoice_ids: ids.iter().map(|id| id.to_string()).collect(),
            calls: AtomicU32::new(0),
        }
    }

    pub(super) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageDrafter for UnavailableDrafter {
    async fn draft(&self, bundle: &DraftingBundle) -> Result<FollowupMessage, DraftingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.invoice_ids.is_empty() || self.invoice_ids.contains(&bundle.invoice.invoice_id) {
            return Err(DraftingError::Unavailable("drafting disabled".to_string()));
        }
        Ok(polite_message(&bundle.invoice.invoice_id))
    }
}

pub(super) async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json body")
}

pub(super) async fn text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    String::from_utf8(body.to_vec()).expect("utf8 body")
}
