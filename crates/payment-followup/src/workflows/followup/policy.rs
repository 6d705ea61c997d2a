use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::domain::{RelationshipTier, Tone};

/// Immutable policy tables shared by every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowupPolicy {
    pub scoring: ScoringPolicy,
    pub keywords: KeywordFamilies,
    pub timing: TimingPolicy,
    pub control: ControlPolicy,
}

impl FollowupPolicy {
    /// Load a policy override file; keys left out keep their defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PolicyLoadError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyLoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, PolicyLoadError> {
        let policy: Self = serde_json::from_str(raw)?;
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> Result<(), PolicyLoadError> {
        let thresholds = &self.scoring.risk_thresholds;
        if thresholds.low_max > thresholds.medium_max {
            return Err(PolicyLoadError::Invalid(format!(
                "risk thresholds overlap (low_max {} > medium_max {})",
                thresholds.low_max, thresholds.medium_max
            )));
        }
        if !is_ascending(&self.scoring.days_overdue) || !is_ascending(&self.scoring.amount) {
            return Err(PolicyLoadError::Invalid(
                "breakpoint tables must be sorted ascending".to_string(),
            ));
        }
        let buckets = &self.control.tone_caps_by_days_overdue;
        if !buckets.windows(2).all(|pair| pair[0].max_days <= pair[1].max_days) {
            return Err(PolicyLoadError::Invalid(
                "tone caps by days overdue must be sorted ascending by max_days".to_string(),
            ));
        }
        Ok(())
    }

    /// Thresholds handed to the drafting collaborator alongside the decision.
    pub fn escalation_thresholds(&self) -> EscalationThresholds {
        EscalationThresholds {
            urgent_days_overdue: self.timing.urgent_days_overdue,
            standard_days_overdue: self.timing.standard_days_overdue,
            min_days_between_followups: self.timing.min_days_between_followups,
            high_risk_min_score: self.scoring.risk_thresholds.medium_max + 1,
        }
    }
}

fn is_ascending(table: &[Breakpoint]) -> bool {
    table.windows(2).all(|pair| pair[0].max <= pair[1].max)
}

/// Upper bound (inclusive) paired with the score it contributes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub max: f64,
    pub score: i32,
}

impl Breakpoint {
    pub const fn new(max: f64, score: i32) -> Self {
        Self { max, score }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub days_overdue: Vec<Breakpoint>,
    pub amount: Vec<Breakpoint>,
    pub relationship: BTreeMap<RelationshipTier, i32>,
    pub risk_thresholds: RiskThresholds,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            days_overdue: vec![
                Breakpoint::new(7.0, 0),
                Breakpoint::new(30.0, 1),
                Breakpoint::new(60.0, 2),
                Breakpoint::new(10_000.0, 3),
            ],
            amount: vec![
                Breakpoint::new(500.0, 0),
                Breakpoint::new(2_000.0, 1),
                Breakpoint::new(10_000.0, 2),
                Breakpoint::new(1_000_000.0, 3),
            ],
            relationship: BTreeMap::from([
                (RelationshipTier::Vip, -1),
                (RelationshipTier::Recurring, 0),
                (RelationshipTier::New, 1),
                (RelationshipTier::Risky, 2),
            ]),
            risk_thresholds: RiskThresholds::default(),
        }
    }
}

/// Inclusive score ceilings for the low and medium tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    pub low_max: u32,
    pub medium_max: u32,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low_max: 2,
            medium_max: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordFamilies {
    pub high: Vec<String>,
    pub low: Vec<String>,
    pub soften: Vec<String>,
    pub no_followup: Vec<String>,
}

impl Default for KeywordFamilies {
    fn default() -> Self {
        Self {
            high: owned(&[
                "late payment",
                "overdue",
                "broken promise",
                "collection",
                "ignored",
            ]),
            low: owned(&["apologized", "good standing", "long-term", "paid on time"]),
            soften: owned(&["dispute", "billing issue", "invoice error", "incorrect"]),
            no_followup: owned(&["paid", "settled", "resolved", "closed"]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingPolicy {
    pub urgent_days_overdue: i64,
    pub standard_days_overdue: i64,
    pub min_days_between_followups: i64,
    pub wait_short_days: i64,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            urgent_days_overdue: 30,
            standard_days_overdue: 7,
            min_days_between_followups: 3,
            wait_short_days: 3,
        }
    }
}

/// Tone ceiling applied while the invoice is at most `max_days` overdue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToneBucket {
    pub max_days: i64,
    pub tone: Tone,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlPolicy {
    pub tone_caps_by_relationship: BTreeMap<RelationshipTier, Tone>,
    pub tone_caps_by_days_overdue: Vec<ToneBucket>,
    pub required_decision_fields: Vec<String>,
    pub required_message_fields: Vec<String>,
    pub forbidden_phrases: Vec<String>,
    pub unsupported_claims: Vec<String>,
}

impl Default for ControlPolicy {
    fn default() -> Self {
        Self {
            tone_caps_by_relationship: BTreeMap::from([
                (RelationshipTier::Vip, Tone::Neutral),
                (RelationshipTier::New, Tone::Neutral),
            ]),
            tone_caps_by_days_overdue: vec![
                ToneBucket {
                    max_days: 7,
                    tone: Tone::Neutral,
                },
                ToneBucket {
                    max_days: 30,
                    tone: Tone::Firm,
                },
            ],
            required_decision_fields: owned(&[
                "followup_required",
                "recommended_timing",
                "tone",
                "explanation",
            ]),
            required_message_fields: owned(&["subject", "body", "reasoning"]),
            forbidden_phrases: owned(&[
                "legal action",
                "lawsuit",
                "litigation",
                "take you to court",
                "attorney",
                "lawyer",
                "collection agency",
                "collections agency",
                "debt collector",
                "police",
                "authorities",
                "final warning",
                "or else",
            ]),
            unsupported_claims: owned(&[
                "late fee",
                "penalty",
                "interest will be charged",
                "credit score",
                "credit report",
                "has been sent automatically",
                "will be sent automatically",
            ]),
        }
    }
}

/// Serializable threshold summary included in the drafting bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationThresholds {
    pub urgent_days_overdue: i64,
    pub standard_days_overdue: i64,
    pub min_days_between_followups: i64,
    pub high_risk_min_score: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyLoadError {
    #[error("failed to read policy file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid policy JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid policy: {0}")]
    Invalid(String),
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_override_keeps_remaining_defaults() {
        let policy = FollowupPolicy::from_json(
            r#"{ "timing": { "urgent_days_overdue": 45 }, "control": { "forbidden_phrases": ["shame"] } }"#,
        )
        .expect("policy parses");

        assert_eq!(policy.timing.urgent_days_overdue, 45);
        assert_eq!(policy.timing.standard_days_overdue, 7);
        assert_eq!(policy.control.forbidden_phrases, vec!["shame".to_string()]);
        assert_eq!(policy.scoring, ScoringPolicy::default());
        assert_eq!(
            policy.control.tone_caps_by_relationship.get(&RelationshipTier::Vip),
            Some(&Tone::Neutral)
        );
    }

    #[test]
    fn rejects_overlapping_risk_thresholds() {
        let error = FollowupPolicy::from_json(
            r#"{ "scoring": { "risk_thresholds": { "low_max": 6, "medium_max": 5 } } }"#,
        )
        .expect_err("thresholds overlap");

        match error {
            PolicyLoadError::Invalid(message) => assert!(message.contains("overlap")),
            other => panic!("expected invalid policy, got {other:?}"),
        }
    }

    #[test]
    fn rejects_unsorted_breakpoints() {
        let error = FollowupPolicy::from_json(
            r#"{ "scoring": { "amount": [ { "max": 100.0, "score": 1 }, { "max": 50.0, "score": 0 } ] } }"#,
        )
        .expect_err("unsorted table");
        assert!(matches!(error, PolicyLoadError::Invalid(_)));
    }

    #[test]
    fn rejects_unsorted_tone_buckets() {
        let error = FollowupPolicy::from_json(
            r#"{ "control": { "tone_caps_by_days_overdue": [ { "max_days": 30, "tone": "firm" }, { "max_days": 7, "tone": "soft" } ] } }"#,
        )
        .expect_err("unsorted buckets");

        match error {
            PolicyLoadError::Invalid(message) => assert!(message.contains("max_days")),
            other => panic!("expected invalid policy, got {other:?}"),
        }
    }

    #[test]
    fn timing_policy_exposes_only_the_consulted_windows() {
        let value = serde_json::to_value(TimingPolicy::default()).expect("serializes");
        let mut keys: Vec<_> = value
            .as_object()
            .expect("timing is an object")
            .keys()
            .cloned()
            .collect();
        keys.sort();
        assert_eq!(
            keys,
            vec![
                "min_days_between_followups",
                "standard_days_overdue",
                "urgent_days_overdue",
                "wait_short_days",
            ]
        );
    }

    #[test]
    fn from_path_reports_missing_file() {
        let error = FollowupPolicy::from_path("./missing-policy.json").expect_err("io error");
        assert!(matches!(error, PolicyLoadError::Io { .. }));
    }

    #[test]
    fn escalation_thresholds_follow_timing_and_risk_tables() {
        let thresholds = FollowupPolicy::default().escalation_thresholds();
        assert_eq!(thresholds.urgent_days_overdue, 30);
        assert_eq!(thresholds.standard_days_overdue, 7);
        assert_eq!(thresholds.min_days_between_followups, 3);
        assert_eq!(thresholds.high_risk_min_score, 6);
    }
}
