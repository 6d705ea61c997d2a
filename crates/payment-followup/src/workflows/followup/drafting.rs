//! Boundary to the generative drafting collaborator.
//!
//! The pipeline only sees [`MessageDrafter`]; transport, prompting and retry live here so the
//! scoring, decision and control stages stay free of I/O.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{FollowupDecision, FollowupMessage, InvoiceContext, InvoiceFact};
use super::policy::EscalationThresholds;

pub const SYSTEM_PROMPT: &str = "You are a business-safe follow-up drafting assistant.
Your task: produce a professional payment follow-up message based on the provided invoice context and decision.

Safety constraints (non-negotiable):
- No threats, intimidation, or harassment.
- No legal claims, legal advice, or implications of enforcement actions.
- Do not mention collections, litigation, or authorities.
- Do not claim the message was sent or will be sent automatically; this is a draft for human review.

Formatting requirements:
- Output must be valid JSON and nothing else.
- Use the exact keys: subject, body, reasoning.
- Do not include markdown, code fences, or extra commentary.";

const USER_PROMPT_GUIDANCE: &str = "Guidance:
- Match the requested tone (soft / neutral / firm).
- Keep the subject concise (5-12 words).
- Keep the body short (80-180 words).
- Be specific about invoice and timing facts when available.
- If timing is \"wait_3_days\" or \"wait_7_days\", you may still draft a polite reminder noting a planned follow-up.";

/// Input handed to the drafting collaborator. Field names are part of the prompt contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftingBundle {
    pub invoice: InvoiceFact,
    pub context: Option<InvoiceContext>,
    pub decision: FollowupDecision,
    pub escalation_thresholds: EscalationThresholds,
}

impl DraftingBundle {
    pub fn to_json(&self) -> Result<String, DraftingError> {
        serde_json::to_string(self).map_err(|err| DraftingError::Malformed(err.to_string()))
    }

    pub fn user_prompt(&self) -> Result<String, DraftingError> {
        Ok(format!(
            "Draft a follow-up message using this input:\n{}\n\n{USER_PROMPT_GUIDANCE}",
            self.to_json()?
        ))
    }
}

/// Capability that turns a bundle into a structured draft.
#[async_trait]
pub trait MessageDrafter: Send + Sync {
    async fn draft(&self, bundle: &DraftingBundle) -> Result<FollowupMessage, DraftingError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DraftingError {
    #[error("drafting response was malformed: {0}")]
    Malformed(String),
    #[error("drafting transport failed: {0}")]
    Transport(String),
    #[error("drafting unavailable: {0}")]
    Unavailable(String),
    #[error("drafting gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        last: Box<DraftingError>,
    },
}

impl DraftingError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::Transport(_))
    }
}

/// Bounded exponential backoff around a drafter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_min: Duration::from_millis(500),
            backoff_max: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based), doubling from the minimum.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_min
            .saturating_mul(factor)
            .clamp(self.backoff_min, self.backoff_max.max(self.backoff_min))
    }

    pub async fn draft<D>(
        &self,
        drafter: &D,
        bundle: &DraftingBundle,
    ) -> Result<FollowupMessage, DraftingError>
    where
        D: MessageDrafter + ?Sized,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match drafter.draft(bundle).await {
                Ok(message) => return Ok(message),
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= max_attempts => {
                    return Err(DraftingError::Exhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    })
                }
                Err(err) => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        invoice_id = %bundle.invoice.invoice_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "drafting failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Parse a drafter response, tolerating prose around a single JSON object.
pub fn parse_message(content: &str) -> Result<FollowupMessage, DraftingError> {
    let value: serde_json::Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(_) => {
            let trimmed = content.trim();
            match (trimmed.find('{'), trimmed.rfind('}')) {
                (Some(start), Some(end)) if end > start => {
                    serde_json::from_str(&trimmed[start..=end]).map_err(|_| {
                        DraftingError::Malformed("failed to parse JSON response".to_string())
                    })?
                }
                _ => {
                    return Err(DraftingError::Malformed(
                        "no JSON object found in response".to_string(),
                    ))
                }
            }
        }
    };

    serde_json::from_value(value)
        .map_err(|err| DraftingError::Malformed(format!("invalid message JSON: {err}")))
}
