use chrono::NaiveDate;
use tracing::debug;

use super::domain::{InvoiceContext, InvoiceFact};
use super::policy::{KeywordFamilies, ScoringPolicy};
use super::scoring::{RiskAssessment, RiskScorer};
use super::signals::NotesSignals;

/// Composes the scoring outcome into the summaries consumed downstream.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    scorer: RiskScorer,
    keywords: KeywordFamilies,
}

impl ContextBuilder {
    pub fn new(scoring: ScoringPolicy, keywords: KeywordFamilies) -> Self {
        Self {
            scorer: RiskScorer::new(scoring),
            keywords,
        }
    }

    pub fn build(&self, invoice: &InvoiceFact, today: NaiveDate) -> InvoiceContext {
        let days_since_followup = days_since_followup(invoice, today);
        let signals = NotesSignals::extract(&invoice.notes, &self.keywords);
        let assessment = self.scorer.score(invoice, &signals);

        debug!(
            invoice_id = %invoice.invoice_id,
            risk = %assessment.tier,
            score = assessment.score,
            "scored invoice context"
        );

        InvoiceContext {
            risk_level: assessment.tier,
            relationship_summary: relationship_summary(invoice, &signals),
            invoice_status_summary: invoice_status_summary(invoice, days_since_followup),
            days_since_last_followup: days_since_followup,
            context_summary: context_summary(invoice, days_since_followup, &signals, assessment),
        }
    }
}

pub fn days_since_followup(invoice: &InvoiceFact, today: NaiveDate) -> Option<i64> {
    invoice
        .last_followup_date
        .map(|last| (today - last).num_days().max(0))
}

fn relationship_summary(invoice: &InvoiceFact, signals: &NotesSignals) -> String {
    let flags = signals.flags(false);
    let notes = if flags.is_empty() {
        "none".to_string()
    } else {
        flags.join(",")
    };
    format!("{} relationship (notes: {notes})", invoice.relationship_tag)
}

fn invoice_status_summary(invoice: &InvoiceFact, days_since_followup: Option<i64>) -> String {
    let recency = match days_since_followup {
        Some(days) => format!("last follow-up {days}d ago"),
        None => "no prior follow-up".to_string(),
    };
    format!(
        "{}d overdue, {} {}, {recency}",
        invoice.days_overdue,
        format_amount(invoice.invoice_amount),
        invoice.currency
    )
}

fn context_summary(
    invoice: &InvoiceFact,
    days_since_followup: Option<i64>,
    signals: &NotesSignals,
    assessment: RiskAssessment,
) -> String {
    let flags = signals.flags(true);
    let flags = if flags.is_empty() {
        "none".to_string()
    } else {
        flags.join(",")
    };
    let last_followup = days_since_followup
        .map(|days| days.to_string())
        .unwrap_or_else(|| "none".to_string());

    [
        format!("days_overdue={}", invoice.days_overdue),
        format!("amount={}", format_amount(invoice.invoice_amount)),
        format!("currency={}", invoice.currency),
        format!("relationship={}", invoice.relationship_tag),
        format!("last_followup_days={last_followup}"),
        format!("notes_flags={flags}"),
        format!("risk={}", assessment.tier),
        format!("risk_score={}", assessment.score),
    ]
    .join(" | ")
}

/// Whole amounts drop the fraction; anything else shows two decimals.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.is_finite() {
        format!("{amount:.0}")
    } else {
        format!("{amount:.2}")
    }
}
