use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info};

use super::context::ContextBuilder;
use super::control::ControlGate;
use super::decision::DecisionEngine;
use super::domain::{ControlStage, InvoiceFact, PipelineState};
use super::drafting::{DraftingBundle, DraftingError, MessageDrafter, RetryPolicy};
use super::policy::{EscalationThresholds, FollowupPolicy};

/// Stage of the per-invoice pipeline. Order in the step list is execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStep {
    Context,
    Decision,
    DecisionControl,
    Drafting,
    MessageControl,
}

impl PipelineStep {
    pub const fn full() -> [Self; 5] {
        [
            Self::Context,
            Self::Decision,
            Self::DecisionControl,
            Self::Drafting,
            Self::MessageControl,
        ]
    }

    /// Steps that need the drafting collaborator (or its output).
    pub const fn is_post_drafting(self) -> bool {
        matches!(self, Self::Drafting | Self::MessageControl)
    }
}

/// Configurable step list wiring the context, decision and control stages together.
#[derive(Debug, Clone)]
pub struct FollowupPipeline {
    context_builder: ContextBuilder,
    decision_engine: DecisionEngine,
    control_gate: ControlGate,
    escalation: EscalationThresholds,
    retry: RetryPolicy,
    steps: Vec<PipelineStep>,
}

impl FollowupPipeline {
    pub fn new(policy: FollowupPolicy) -> Self {
        let escalation = policy.escalation_thresholds();
        let FollowupPolicy {
            scoring,
            keywords,
            timing,
            control,
        } = policy;

        Self {
            context_builder: ContextBuilder::new(scoring, keywords.clone()),
            decision_engine: DecisionEngine::new(timing, keywords),
            control_gate: ControlGate::new(control),
            escalation,
            retry: RetryPolicy::default(),
            steps: PipelineStep::full().to_vec(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_steps(mut self, steps: Vec<PipelineStep>) -> Self {
        self.steps = steps;
        self
    }

    /// Drop both control stages, keeping the remaining order.
    pub fn without_control(self) -> Self {
        let steps = self
            .steps
            .iter()
            .copied()
            .filter(|step| {
                !matches!(step, PipelineStep::DecisionControl | PipelineStep::MessageControl)
            })
            .collect();
        self.with_steps(steps)
    }

    /// Context, decision and decision control only; nothing is drafted.
    pub fn dry_run(self) -> Self {
        let steps = self
            .steps
            .iter()
            .copied()
            .filter(|step| !step.is_post_drafting())
            .collect();
        self.with_steps(steps)
    }

    pub fn steps(&self) -> &[PipelineStep] {
        &self.steps
    }

    pub fn control_gate(&self) -> &ControlGate {
        &self.control_gate
    }

    pub fn has_drafting(&self) -> bool {
        self.steps.contains(&PipelineStep::Drafting)
    }

    /// Run every synchronous stage for one invoice.
    pub fn evaluate(&self, invoice: InvoiceFact, today: NaiveDate) -> PipelineState {
        let mut state = PipelineState::new(invoice);

        for step in self.steps.iter().filter(|step| !step.is_post_drafting()) {
            match step {
                PipelineStep::Context => {
                    state.context = Some(self.context_builder.build(&state.invoice, today));
                }
                PipelineStep::Decision => {
                    state.decision = Some(self.decision_engine.decide(
                        &state.invoice,
                        state.context.as_ref(),
                        today,
                    ));
                }
                PipelineStep::DecisionControl => {
                    state.control_decision =
                        Some(self.control_gate.run(&state, ControlStage::Decision));
                }
                PipelineStep::Drafting | PipelineStep::MessageControl => {}
            }
        }

        if let Some(decision) = &state.decision {
            info!(
                invoice_id = %state.invoice.invoice_id,
                followup_required = decision.followup_required,
                timing = %decision.recommended_timing,
                tone = %decision.tone,
                decision_control = state.control_decision.as_ref().map(|c| c.status_label()),
                "evaluated invoice"
            );
        }

        state
    }

    /// Draft and check the message for an evaluated state.
    ///
    /// On a drafting error the state is left as it was, so the call can be repeated without
    /// re-running context or decision.
    pub async fn complete<D>(
        &self,
        state: &mut PipelineState,
        drafter: &D,
    ) -> Result<(), DraftingError>
    where
        D: MessageDrafter + ?Sized,
    {
        if state
            .decision
            .as_ref()
            .is_some_and(|decision| !decision.expects_message())
        {
            return Ok(());
        }

        for step in self.steps.iter().filter(|step| step.is_post_drafting()) {
            match step {
                PipelineStep::Drafting => {
                    if state.message.is_some() {
                        continue;
                    }
                    if let Some(bundle) = self.bundle(state) {
                        let message = self.retry.draft(drafter, &bundle).await?;
                        state.message = Some(message);
                    }
                }
                PipelineStep::MessageControl => {
                    state.control_message =
                        Some(self.control_gate.run(state, ControlStage::Message));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Full run for one invoice; drafting failures are reported alongside the partial state.
    pub async fn run<D>(&self, invoice: InvoiceFact, today: NaiveDate, drafter: &D) -> InvoiceOutcome
    where
        D: MessageDrafter + ?Sized,
    {
        let mut state = self.evaluate(invoice, today);
        let drafting_error = match self.complete(&mut state, drafter).await {
            Ok(()) => None,
            Err(err) => {
                error!(
                    invoice_id = %state.invoice.invoice_id,
                    error = %err,
                    "drafting failed for invoice"
                );
                Some(err.to_string())
            }
        };

        InvoiceOutcome {
            state,
            drafting_error,
        }
    }

    pub fn bundle(&self, state: &PipelineState) -> Option<DraftingBundle> {
        let decision = state.decision.clone()?;
        Some(DraftingBundle {
            invoice: state.invoice.clone(),
            context: state.context.clone(),
            decision,
            escalation_thresholds: self.escalation,
        })
    }
}

impl Default for FollowupPipeline {
    fn default() -> Self {
        Self::new(FollowupPolicy::default())
    }
}

/// Evaluated state plus the drafting failure that interrupted it, if any.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceOutcome {
    pub state: PipelineState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drafting_error: Option<String>,
}
