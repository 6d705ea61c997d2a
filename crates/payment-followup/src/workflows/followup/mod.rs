//! Payment follow-up advisor: context scoring, the decision rule cascade and the
//! business-safety control gate, wired together by a configurable pipeline.

pub mod context;
pub mod control;
pub mod decision;
pub mod domain;
pub mod drafting;
pub mod pipeline;
pub mod policy;
pub mod report;
pub mod router;
pub mod scoring;
pub mod service;
pub mod signals;

#[cfg(test)]
mod tests;

pub use context::{format_amount, ContextBuilder};
pub use control::ControlGate;
pub use decision::{DecisionEngine, RuleToken};
pub use domain::{
    ControlResult, ControlStage, FollowupDecision, FollowupMessage, FollowupTiming,
    InvoiceContext, InvoiceFact, PipelineState, RelationshipTier, RiskTier, Tone, WithholdReason,
};
pub use drafting::{DraftingBundle, DraftingError, MessageDrafter, RetryPolicy};
pub use pipeline::{FollowupPipeline, InvoiceOutcome, PipelineStep};
pub use policy::{EscalationThresholds, FollowupPolicy, PolicyLoadError};
pub use report::{render_markdown, SummaryRow};
pub use router::{followup_router, EvaluateRequest};
pub use scoring::{RiskAssessment, RiskScorer};
pub use service::{BatchReport, FollowupService, ReviewEntry};
pub use signals::NotesSignals;
