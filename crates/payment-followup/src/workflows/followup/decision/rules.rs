use serde::Serialize;

use super::super::domain::{
    FollowupTiming, InvoiceContext, InvoiceFact, RelationshipTier, RiskTier, Tone,
};
use super::super::policy::TimingPolicy;
use super::super::signals::NotesSignals;

/// Named rule recorded in the decision trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleToken {
    NoFollowupKeyword,
    NotOverdue,
    RecentFollowup,
    UrgentOverdue,
    RiskHighTiming,
    StandardOverdue,
    LowOverdueWait,
    RelationshipSoften,
    RelationshipSoftenHigh,
    RelationshipFirm,
    RelationshipFirmLow,
    SoftenNotes,
    SoftenNotesDowngrade,
}

impl RuleToken {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoFollowupKeyword => "NO_FOLLOWUP_KEYWORD",
            Self::NotOverdue => "NOT_OVERDUE",
            Self::RecentFollowup => "RECENT_FOLLOWUP",
            Self::UrgentOverdue => "URGENT_OVERDUE",
            Self::RiskHighTiming => "RISK_HIGH_TIMING",
            Self::StandardOverdue => "STANDARD_OVERDUE",
            Self::LowOverdueWait => "LOW_OVERDUE_WAIT",
            Self::RelationshipSoften => "RELATIONSHIP_SOFTEN",
            Self::RelationshipSoftenHigh => "RELATIONSHIP_SOFTEN_HIGH",
            Self::RelationshipFirm => "RELATIONSHIP_FIRM",
            Self::RelationshipFirmLow => "RELATIONSHIP_FIRM_LOW",
            Self::SoftenNotes => "SOFTEN_NOTES",
            Self::SoftenNotesDowngrade => "SOFTEN_NOTES_DOWNGRADE",
        }
    }
}

/// Timing and tone before the explanation is attached.
pub(crate) struct Verdict {
    pub followup_required: bool,
    pub timing: FollowupTiming,
    pub tone: Tone,
}

impl Verdict {
    const fn skip() -> Self {
        Self {
            followup_required: false,
            timing: FollowupTiming::Skip,
            tone: Tone::Soft,
        }
    }
}

pub(crate) fn determine(
    invoice: &InvoiceFact,
    context: Option<&InvoiceContext>,
    days_since_followup: Option<i64>,
    signals: &NotesSignals,
    timing: &TimingPolicy,
    trace: &mut Vec<RuleToken>,
) -> Verdict {
    if !signals.no_followup.is_empty() {
        trace.push(RuleToken::NoFollowupKeyword);
        return Verdict::skip();
    }

    if invoice.days_overdue <= 0 {
        trace.push(RuleToken::NotOverdue);
        return Verdict::skip();
    }

    let recommended = determine_timing(invoice, context, days_since_followup, timing, trace);
    let tone = determine_tone(invoice, context, signals, trace);

    Verdict {
        followup_required: true,
        timing: recommended,
        tone,
    }
}

fn determine_timing(
    invoice: &InvoiceFact,
    context: Option<&InvoiceContext>,
    days_since_followup: Option<i64>,
    policy: &TimingPolicy,
    trace: &mut Vec<RuleToken>,
) -> FollowupTiming {
    if let Some(since) = days_since_followup {
        if since < policy.min_days_between_followups {
            trace.push(RuleToken::RecentFollowup);
            let remaining = (policy.min_days_between_followups - since).max(0);
            return if remaining <= policy.wait_short_days {
                FollowupTiming::Wait3Days
            } else {
                FollowupTiming::Wait7Days
            };
        }
    }

    if invoice.days_overdue >= policy.urgent_days_overdue {
        trace.push(RuleToken::UrgentOverdue);
        return FollowupTiming::Now;
    }

    if context.map(|ctx| ctx.risk_level) == Some(RiskTier::High) {
        trace.push(RuleToken::RiskHighTiming);
        return FollowupTiming::Now;
    }

    if invoice.days_overdue >= policy.standard_days_overdue {
        trace.push(RuleToken::StandardOverdue);
        return FollowupTiming::Now;
    }

    trace.push(RuleToken::LowOverdueWait);
    FollowupTiming::Wait3Days
}

fn determine_tone(
    invoice: &InvoiceFact,
    context: Option<&InvoiceContext>,
    signals: &NotesSignals,
    trace: &mut Vec<RuleToken>,
) -> Tone {
    let risk = context.map_or(RiskTier::Medium, |ctx| ctx.risk_level);
    let mut tone = Tone::from_risk(risk);

    match invoice.relationship_tag {
        RelationshipTier::Vip | RelationshipTier::New => {
            if risk == RiskTier::High {
                tone = Tone::Neutral;
                trace.push(RuleToken::RelationshipSoftenHigh);
            } else {
                tone = Tone::Soft;
                trace.push(RuleToken::RelationshipSoften);
            }
        }
        RelationshipTier::Risky => {
            if risk == RiskTier::Low {
                tone = Tone::Neutral;
                trace.push(RuleToken::RelationshipFirmLow);
            } else {
                tone = Tone::Firm;
                trace.push(RuleToken::RelationshipFirm);
            }
        }
        RelationshipTier::Recurring => {}
    }

    if !signals.soften.is_empty() {
        if tone == Tone::Firm {
            tone = Tone::Neutral;
            trace.push(RuleToken::SoftenNotesDowngrade);
        } else {
            tone = Tone::Soft;
            trace.push(RuleToken::SoftenNotes);
        }
    }

    tone
}
