use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Client-relationship classification supplied with every invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipTier {
    New,
    Recurring,
    Vip,
    Risky,
}

impl RelationshipTier {
    pub const fn ordered() -> [Self; 4] {
        [Self::New, Self::Recurring, Self::Vip, Self::Risky]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Recurring => "recurring",
            Self::Vip => "vip",
            Self::Risky => "risky",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "new" => Some(Self::New),
            "recurring" => Some(Self::Recurring),
            "vip" => Some(Self::Vip),
            "risky" => Some(Self::Risky),
            _ => None,
        }
    }
}

impl fmt::Display for RelationshipTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Risk tier derived from the bounded risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowupTiming {
    Now,
    Wait3Days,
    Wait7Days,
    Skip,
}

impl FollowupTiming {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Wait3Days => "wait_3_days",
            Self::Wait7Days => "wait_7_days",
            Self::Skip => "skip",
        }
    }

    /// Human-facing send date used by the report.
    pub const fn suggested_send(self) -> &'static str {
        match self {
            Self::Now => "now",
            Self::Wait3Days => "in 3 days",
            Self::Wait7Days => "in 7 days",
            Self::Skip => "no follow-up",
        }
    }
}

impl fmt::Display for FollowupTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message tone, ordered from gentlest to strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Soft,
    Neutral,
    Firm,
}

impl Tone {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Neutral => "neutral",
            Self::Firm => "firm",
        }
    }

    pub const fn rank(self) -> u8 {
        match self {
            Self::Soft => 0,
            Self::Neutral => 1,
            Self::Firm => 2,
        }
    }

    pub fn from_risk(tier: RiskTier) -> Self {
        match tier {
            RiskTier::Low => Self::Soft,
            RiskTier::Medium => Self::Neutral,
            RiskTier::High => Self::Firm,
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated invoice snapshot produced by the ledger importer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceFact {
    pub client_name: String,
    pub invoice_id: String,
    pub invoice_amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub invoice_issue_date: NaiveDate,
    pub days_overdue: i64,
    #[serde(default)]
    pub last_followup_date: Option<NaiveDate>,
    pub relationship_tag: RelationshipTier,
    #[serde(default)]
    pub notes: String,
}

pub(crate) fn default_currency() -> String {
    "USD".to_string()
}

/// Scoring context for a single invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceContext {
    pub risk_level: RiskTier,
    pub relationship_summary: String,
    pub invoice_status_summary: String,
    pub days_since_last_followup: Option<i64>,
    pub context_summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupDecision {
    pub followup_required: bool,
    pub recommended_timing: FollowupTiming,
    pub tone: Tone,
    pub explanation: String,
}

impl FollowupDecision {
    /// Drafting and message control only apply to decisions that schedule a follow-up.
    pub fn expects_message(&self) -> bool {
        self.followup_required && self.recommended_timing != FollowupTiming::Skip
    }
}

/// Structured draft returned by the drafting collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupMessage {
    pub subject: String,
    pub body: String,
    pub reasoning: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlStage {
    Decision,
    Message,
}

impl ControlStage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decision => "decision",
            Self::Message => "message",
        }
    }
}

impl fmt::Display for ControlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single control gate invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResult {
    pub stage: ControlStage,
    pub passed: bool,
    #[serde(default)]
    pub violations: Vec<String>,
}

impl ControlResult {
    pub(crate) fn from_violations(stage: ControlStage, violations: Vec<String>) -> Self {
        Self {
            stage,
            passed: violations.is_empty(),
            violations,
        }
    }

    pub fn status_label(&self) -> &'static str {
        if self.passed {
            "pass"
        } else {
            "fail"
        }
    }
}

/// Reason a drafted message is kept away from the reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WithholdReason {
    NotRequired,
    DecisionControlFailed,
    MessageControlFailed,
}

impl WithholdReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::NotRequired => "Follow-up not required.",
            Self::DecisionControlFailed => "Decision control failed; message withheld.",
            Self::MessageControlFailed => "Message control failed; message withheld.",
        }
    }
}

/// Per-invoice accumulator populated stage by stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub invoice: InvoiceFact,
    pub context: Option<InvoiceContext>,
    pub decision: Option<FollowupDecision>,
    pub control_decision: Option<ControlResult>,
    pub message: Option<FollowupMessage>,
    pub control_message: Option<ControlResult>,
}

impl PipelineState {
    pub fn new(invoice: InvoiceFact) -> Self {
        Self {
            invoice,
            context: None,
            decision: None,
            control_decision: None,
            message: None,
            control_message: None,
        }
    }

    pub fn withhold_reason(&self) -> Option<WithholdReason> {
        if let Some(decision) = &self.decision {
            if !decision.expects_message() {
                return Some(WithholdReason::NotRequired);
            }
        }
        if matches!(&self.control_decision, Some(control) if !control.passed) {
            return Some(WithholdReason::DecisionControlFailed);
        }
        if matches!(&self.control_message, Some(control) if !control.passed) {
            return Some(WithholdReason::MessageControlFailed);
        }
        None
    }

    /// Message cleared for the reviewer, if any.
    pub fn surfaced_message(&self) -> Option<&FollowupMessage> {
        match self.withhold_reason() {
            Some(_) => None,
            None => self.message.as_ref(),
        }
    }
}
