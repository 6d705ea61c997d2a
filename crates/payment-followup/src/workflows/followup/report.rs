use serde::Serialize;

use super::context::format_amount;
use super::domain::{ControlResult, InvoiceFact, PipelineState};

/// One row of the reviewer summary table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRow {
    pub invoice_id: String,
    pub client_name: String,
    pub amount: String,
    pub days_overdue: i64,
    pub timing: String,
    pub tone: String,
    pub followup: &'static str,
    pub decision_control: &'static str,
    pub message_control: &'static str,
}

impl SummaryRow {
    pub fn from_state(state: &PipelineState) -> Self {
        let invoice = &state.invoice;
        let decision = state.decision.as_ref();
        Self {
            invoice_id: invoice.invoice_id.clone(),
            client_name: invoice.client_name.clone(),
            amount: amount_with_currency(invoice),
            days_overdue: invoice.days_overdue,
            timing: decision.map_or("unknown".to_string(), |d| {
                d.recommended_timing.to_string()
            }),
            tone: decision.map_or("unknown".to_string(), |d| d.tone.to_string()),
            followup: match decision {
                Some(d) if d.followup_required => "yes",
                Some(_) => "no",
                None => "unknown",
            },
            decision_control: control_status(state.control_decision.as_ref()),
            message_control: control_status(state.control_message.as_ref()),
        }
    }
}

/// Render the reviewer-facing Markdown report.
pub fn render_markdown(states: &[PipelineState]) -> String {
    let mut lines = vec!["# Follow-up Recommendations".to_string(), String::new()];
    lines.extend(summary_table(states));
    lines.push(String::new());

    for (index, state) in states.iter().enumerate() {
        lines.extend(invoice_section(state, index + 1));
        lines.push(String::new());
    }

    let mut content = lines.join("\n").trim_end().to_string();
    content.push('\n');
    content
}

fn summary_table(states: &[PipelineState]) -> Vec<String> {
    let mut lines = vec![
        "## Summary".to_string(),
        String::new(),
        "| Invoice ID | Client | Amount | Days Overdue | Timing | Tone | Follow-up | Decision Control | Message Control |".to_string(),
        "| --- | --- | --- | --- | --- | --- | --- | --- | --- |".to_string(),
    ];
    for state in states {
        let row = SummaryRow::from_state(state);
        lines.push(format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
            row.invoice_id,
            row.client_name,
            row.amount,
            row.days_overdue,
            row.timing,
            row.tone,
            row.followup,
            row.decision_control,
            row.message_control
        ));
    }
    lines
}

fn invoice_section(state: &PipelineState, index: usize) -> Vec<String> {
    let invoice = &state.invoice;
    let mut lines = vec![
        format!("## Invoice {index}: {}", invoice.invoice_id),
        String::new(),
        "**Identifiers**".to_string(),
        format!("- Client: {}", invoice.client_name),
        format!("- Invoice ID: {}", invoice.invoice_id),
        format!("- Amount: {}", amount_with_currency(invoice)),
        format!("- Issue Date: {}", invoice.invoice_issue_date),
        format!("- Days Overdue: {}", invoice.days_overdue),
        String::new(),
        "**Decision**".to_string(),
    ];

    match &state.decision {
        Some(decision) => {
            lines.push(format!(
                "- Follow-up Required: {}",
                decision.followup_required
            ));
            lines.push(format!("- Timing: {}", decision.recommended_timing));
            lines.push(format!(
                "- Suggested Send Date: {}",
                decision.recommended_timing.suggested_send()
            ));
            lines.push(format!("- Tone: {}", decision.tone));
        }
        None => lines.push("- Decision: unavailable".to_string()),
    }

    lines.push(String::new());
    lines.push("**Control Checks**".to_string());
    if state.control_decision.is_none() && state.control_message.is_none() {
        lines.push("- Control: unavailable".to_string());
    } else {
        lines.push(control_line("Decision", state.control_decision.as_ref()));
        lines.push(control_line("Message", state.control_message.as_ref()));
    }

    lines.push(String::new());
    lines.push("**Message Draft**".to_string());
    match (state.surfaced_message(), state.withhold_reason()) {
        (Some(message), _) => {
            lines.push(format!("- Subject: {}", message.subject));
            lines.push(String::new());
            lines.push(message.body.trim().to_string());
        }
        (None, Some(reason)) => lines.push(format!("- Message: {}", reason.label())),
        (None, None) => lines.push("- Message: Message unavailable (not generated).".to_string()),
    }

    lines.push(String::new());
    lines.push("**Explanation**".to_string());
    match &state.decision {
        Some(decision) if !decision.explanation.is_empty() => {
            lines.push(decision.explanation.clone())
        }
        _ => lines.push("Explanation unavailable.".to_string()),
    }

    lines
}

fn amount_with_currency(invoice: &InvoiceFact) -> String {
    format!("{} {}", format_amount(invoice.invoice_amount), invoice.currency)
}

fn control_status(control: Option<&ControlResult>) -> &'static str {
    control.map_or("unknown", ControlResult::status_label)
}

fn control_line(label: &str, control: Option<&ControlResult>) -> String {
    match control {
        None => format!("- {label} Control: unavailable"),
        Some(control) if control.violations.is_empty() => {
            format!("- {label} Control: {}", control.status_label())
        }
        Some(control) => format!(
            "- {label} Control: {} ({})",
            control.status_label(),
            control.violations.join("; ")
        ),
    }
}
