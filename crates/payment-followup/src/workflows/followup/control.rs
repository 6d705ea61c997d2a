use super::domain::{
    ControlResult, ControlStage, FollowupDecision, FollowupMessage, InvoiceFact, PipelineState,
    Tone,
};
use super::policy::ControlPolicy;
use tracing::debug;

/// Typed view of a field for required-field checks.
pub(crate) enum FieldValue<'a> {
    Missing,
    Text(&'a str),
    Present,
}

/// Exposes named fields to the control gate without runtime reflection.
pub(crate) trait FieldLookup {
    fn field(&self, name: &str) -> FieldValue<'_>;
}

impl FieldLookup for FollowupDecision {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "followup_required" => FieldValue::Present,
            "recommended_timing" => FieldValue::Text(self.recommended_timing.as_str()),
            "tone" => FieldValue::Text(self.tone.as_str()),
            "explanation" => FieldValue::Text(&self.explanation),
            _ => FieldValue::Missing,
        }
    }
}

impl FieldLookup for FollowupMessage {
    fn field(&self, name: &str) -> FieldValue<'_> {
        match name {
            "subject" => FieldValue::Text(&self.subject),
            "body" => FieldValue::Text(&self.body),
            "reasoning" => FieldValue::Text(&self.reasoning),
            _ => FieldValue::Missing,
        }
    }
}

/// Business-safety gate shared by the decision and message stages.
#[derive(Debug, Clone)]
pub struct ControlGate {
    policy: ControlPolicy,
}

impl ControlGate {
    pub fn new(policy: ControlPolicy) -> Self {
        Self { policy }
    }

    pub fn run(&self, state: &PipelineState, stage: ControlStage) -> ControlResult {
        let result = match stage {
            ControlStage::Decision => self.check_decision(&state.invoice, state.decision.as_ref()),
            ControlStage::Message => {
                self.check_message(state.decision.as_ref(), state.message.as_ref())
            }
        };
        if !result.passed {
            debug!(
                invoice_id = %state.invoice.invoice_id,
                %stage,
                violations = ?result.violations,
                "control check failed"
            );
        }
        result
    }

    pub fn check_decision(
        &self,
        invoice: &InvoiceFact,
        decision: Option<&FollowupDecision>,
    ) -> ControlResult {
        let Some(decision) = decision else {
            return ControlResult::from_violations(
                ControlStage::Decision,
                vec!["DECISION_MISSING".to_string()],
            );
        };

        let mut violations = Vec::new();
        validate_required_fields(
            decision,
            &self.policy.required_decision_fields,
            "DECISION",
            &mut violations,
        );
        if decision.explanation.trim().is_empty() {
            violations.push("DECISION_EXPLANATION_MISSING".to_string());
        }

        if let Some(cap) = self.tone_cap(invoice) {
            if decision.tone.rank() > cap.rank() {
                violations.push(format!("TONE_CAP_EXCEEDED:cap={cap},tone={}", decision.tone));
            }
        }

        ControlResult::from_violations(ControlStage::Decision, violations)
    }

    pub fn check_message(
        &self,
        decision: Option<&FollowupDecision>,
        message: Option<&FollowupMessage>,
    ) -> ControlResult {
        if decision.is_some_and(|decision| !decision.expects_message()) {
            return ControlResult::from_violations(ControlStage::Message, Vec::new());
        }

        let Some(message) = message else {
            return ControlResult::from_violations(
                ControlStage::Message,
                vec!["MESSAGE_MISSING".to_string()],
            );
        };

        let mut violations = Vec::new();
        validate_required_fields(
            message,
            &self.policy.required_message_fields,
            "MESSAGE",
            &mut violations,
        );

        let text = normalize_text(&[&message.subject, &message.body, &message.reasoning]);
        find_phrases(
            &text,
            &self.policy.forbidden_phrases,
            "FORBIDDEN_PHRASE",
            &mut violations,
        );
        find_phrases(
            &text,
            &self.policy.unsupported_claims,
            "UNSUPPORTED_CLAIM",
            &mut violations,
        );

        ControlResult::from_violations(ControlStage::Message, violations)
    }

    /// Strictest of the relationship cap and the days-overdue bucket cap.
    pub fn tone_cap(&self, invoice: &InvoiceFact) -> Option<Tone> {
        let relationship_cap = self
            .policy
            .tone_caps_by_relationship
            .get(&invoice.relationship_tag)
            .copied();
        let days_cap = self
            .policy
            .tone_caps_by_days_overdue
            .iter()
            .find(|bucket| invoice.days_overdue <= bucket.max_days)
            .map(|bucket| bucket.tone);

        [relationship_cap, days_cap]
            .into_iter()
            .flatten()
            .min_by_key(|tone| tone.rank())
    }
}

fn validate_required_fields<T: FieldLookup>(
    model: &T,
    fields: &[String],
    prefix: &str,
    violations: &mut Vec<String>,
) {
    for field in fields {
        match model.field(field) {
            FieldValue::Missing => violations.push(format!("{prefix}_FIELD_MISSING:{field}")),
            FieldValue::Text(value) if value.trim().is_empty() => {
                violations.push(format!("{prefix}_FIELD_EMPTY:{field}"))
            }
            FieldValue::Text(_) | FieldValue::Present => {}
        }
    }
}

fn normalize_text(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

fn find_phrases(text: &str, phrases: &[String], label: &str, violations: &mut Vec<String>) {
    violations.extend(
        phrases
            .iter()
            .filter(|phrase| text.contains(phrase.as_str()))
            .map(|phrase| format!("{label}:{phrase}")),
    );
}
