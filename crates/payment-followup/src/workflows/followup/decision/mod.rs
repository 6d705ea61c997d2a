mod rules;

pub use rules::RuleToken;

use chrono::NaiveDate;

use super::context::days_since_followup;
use super::domain::{FollowupDecision, InvoiceContext, InvoiceFact};
use super::policy::{KeywordFamilies, TimingPolicy};
use super::signals::NotesSignals;
use rules::Verdict;

/// Deterministic rule cascade producing timing, tone and an audit explanation.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    timing: TimingPolicy,
    keywords: KeywordFamilies,
}

impl DecisionEngine {
    pub fn new(timing: TimingPolicy, keywords: KeywordFamilies) -> Self {
        Self { timing, keywords }
    }

    pub fn decide(
        &self,
        invoice: &InvoiceFact,
        context: Option<&InvoiceContext>,
        today: NaiveDate,
    ) -> FollowupDecision {
        let (decision, _) = self.decide_with_trace(invoice, context, today);
        decision
    }

    /// Same as [`DecisionEngine::decide`], also returning the ordered rule trace.
    pub fn decide_with_trace(
        &self,
        invoice: &InvoiceFact,
        context: Option<&InvoiceContext>,
        today: NaiveDate,
    ) -> (FollowupDecision, Vec<RuleToken>) {
        let days_since = context
            .and_then(|ctx| ctx.days_since_last_followup)
            .or_else(|| days_since_followup(invoice, today));
        let signals = NotesSignals::extract(&invoice.notes, &self.keywords);

        let mut trace = Vec::new();
        let verdict = rules::determine(
            invoice,
            context,
            days_since,
            &signals,
            &self.timing,
            &mut trace,
        );
        let explanation = render_explanation(invoice, context, days_since, &trace, &verdict);

        let decision = FollowupDecision {
            followup_required: verdict.followup_required,
            recommended_timing: verdict.timing,
            tone: verdict.tone,
            explanation,
        };
        (decision, trace)
    }
}

fn render_explanation(
    invoice: &InvoiceFact,
    context: Option<&InvoiceContext>,
    days_since: Option<i64>,
    trace: &[RuleToken],
    verdict: &Verdict,
) -> String {
    let last_followup = days_since
        .map(|days| days.to_string())
        .unwrap_or_else(|| "none".to_string());
    let risk = context.map_or("unknown", |ctx| ctx.risk_level.as_str());
    let inputs = format!(
        "days_overdue={}, amount={:?}, relationship={}, last_followup_days={last_followup}, risk={risk}",
        invoice.days_overdue, invoice.invoice_amount, invoice.relationship_tag
    );

    let rules = if trace.is_empty() {
        "none".to_string()
    } else {
        trace
            .iter()
            .map(|token| token.as_str())
            .collect::<Vec<_>>()
            .join(",")
    };

    format!(
        "inputs: {inputs} | rules: {rules} | decision: followup_required={}, timing={}, tone={}",
        verdict.followup_required, verdict.timing, verdict.tone
    )
}
