use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};
use payment_followup::config::AppConfig;
use payment_followup::error::AppError;
use payment_followup::telemetry;
use payment_followup::workflows::followup::{
    BatchReport, DraftingError, FollowupPipeline, FollowupService,
};
use payment_followup::workflows::ledger::InvoiceLedgerImporter;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::drafting::ServiceDrafter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum ReportFormat {
    /// Markdown review report
    Md,
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Invoice ledger to evaluate (.csv, .xls or .xlsx)
    pub(crate) path: PathBuf,
    /// Where to write the review report
    #[arg(long, default_value = "outputs/report.md")]
    pub(crate) output: PathBuf,
    /// Only evaluate the first N invoices
    #[arg(long)]
    pub(crate) limit: Option<usize>,
    /// Stop after the decision control; no messages are drafted
    #[arg(long)]
    pub(crate) dry_run: bool,
    /// Evaluation date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Report format
    #[arg(long, value_enum, default_value = "md")]
    pub(crate) format: ReportFormat,
}

pub(crate) async fn run_batch(args: RunArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let report = evaluate_ledger(&args, &config).await?;
    print!("{}", summary_table(&report));
    println!("Report written to {}", args.output.display());
    if report.failed_drafts() > 0 {
        println!(
            "Drafting failed for {} invoice(s); see the report for details.",
            report.failed_drafts()
        );
    }
    Ok(())
}

/// Import, evaluate and write the report; returns the batch for console output.
pub(crate) async fn evaluate_ledger(
    args: &RunArgs,
    config: &AppConfig,
) -> Result<BatchReport, AppError> {
    if !args.dry_run && !config.drafting.enabled() {
        return Err(DraftingError::Unavailable(
            "OPENAI_API_KEY is required unless --dry-run is set".to_string(),
        )
        .into());
    }

    let mut invoices = InvoiceLedgerImporter::from_path(&args.path)?;
    if let Some(limit) = args.limit.filter(|limit| *limit > 0) {
        invoices.truncate(limit);
    }

    let pipeline =
        FollowupPipeline::new(config.followup_policy()?).with_retry(config.drafting.retry);
    let drafter = Arc::new(ServiceDrafter::from_config(&config.drafting));
    let service = FollowupService::new(pipeline, drafter);

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    info!(
        path = %args.path.display(),
        invoices = invoices.len(),
        %today,
        dry_run = args.dry_run,
        "evaluating invoice ledger"
    );
    let report = service.evaluate_batch(invoices, today, args.dry_run).await;

    let ReportFormat::Md = args.format;
    write_report(&args.output, &report.markdown())?;
    Ok(report)
}

fn write_report(path: &Path, content: &str) -> Result<(), AppError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn summary_table(report: &BatchReport) -> String {
    let header = ["Invoice ID", "Client", "Timing", "Tone", "Follow-up"];
    let rows: Vec<[String; 5]> = report
        .summary()
        .into_iter()
        .map(|row| {
            [
                row.invoice_id,
                row.client_name,
                row.timing,
                row.tone,
                row.followup.to_string(),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let render = |cells: [&str; 5]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec!["Follow-up Summary".to_string(), render(header)];
    lines.extend(rows.iter().map(|row| render(row.each_ref().map(String::as_str))));
    let mut table = lines.join("\n");
    table.push('\n');
    table
}
