use serde::Serialize;

use super::domain::{InvoiceFact, RiskTier};
use super::policy::{Breakpoint, ScoringPolicy};
use super::signals::NotesSignals;

const HIGH_RISK_NOTES_WEIGHT: i32 = 2;
const LOW_RISK_NOTES_RELIEF: i32 = 1;

/// Clamped risk score and the tier it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub tier: RiskTier,
    pub score: u32,
}

/// Stateless scorer applying the configured breakpoint tables.
#[derive(Debug, Clone)]
pub struct RiskScorer {
    policy: ScoringPolicy,
}

impl RiskScorer {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    pub fn score(&self, invoice: &InvoiceFact, signals: &NotesSignals) -> RiskAssessment {
        let mut total = score_by_breakpoints(invoice.days_overdue as f64, &self.policy.days_overdue);
        total += score_by_breakpoints(invoice.invoice_amount, &self.policy.amount);
        total += self
            .policy
            .relationship
            .get(&invoice.relationship_tag)
            .copied()
            .unwrap_or(0);

        if !signals.high.is_empty() {
            total += HIGH_RISK_NOTES_WEIGHT;
        }
        if !signals.low.is_empty() {
            total -= LOW_RISK_NOTES_RELIEF;
        }

        let score = total.max(0) as u32;
        RiskAssessment {
            tier: self.tier_for(score),
            score,
        }
    }

    pub fn tier_for(&self, score: u32) -> RiskTier {
        let thresholds = &self.policy.risk_thresholds;
        if score <= thresholds.low_max {
            RiskTier::Low
        } else if score <= thresholds.medium_max {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }
}

/// Smallest breakpoint not exceeded by `value` wins; past the table the last entry applies.
pub(crate) fn score_by_breakpoints(value: f64, table: &[Breakpoint]) -> i32 {
    table
        .iter()
        .find(|breakpoint| value <= breakpoint.max)
        .or_else(|| table.last())
        .map(|breakpoint| breakpoint.score)
        .unwrap_or(0)
}
