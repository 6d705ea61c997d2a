use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::domain::InvoiceFact;
use super::drafting::MessageDrafter;
use super::service::FollowupService;

/// Evaluation request accepted by the follow-up endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateRequest {
    pub invoices: Vec<InvoiceFact>,
    #[serde(default)]
    pub today: Option<NaiveDate>,
    #[serde(default)]
    pub dry_run: bool,
}

impl EvaluateRequest {
    fn validate(&self) -> Result<(), String> {
        if self.invoices.is_empty() {
            return Err("at least one invoice is required".to_string());
        }
        for invoice in &self.invoices {
            if invoice.invoice_id.trim().is_empty() || invoice.client_name.trim().is_empty() {
                return Err("invoice_id and client_name must not be blank".to_string());
            }
            if !invoice.invoice_amount.is_finite() || invoice.invoice_amount < 0.0 {
                return Err(format!(
                    "invoice {} has an invalid amount {}",
                    invoice.invoice_id, invoice.invoice_amount
                ));
            }
        }
        Ok(())
    }
}

/// Router exposing batch evaluation as JSON and as a Markdown report.
pub fn followup_router<D>(service: Arc<FollowupService<D>>) -> Router
where
    D: MessageDrafter + ?Sized + 'static,
{
    Router::new()
        .route("/api/v1/followups/evaluate", post(evaluate_handler::<D>))
        .route("/api/v1/followups/report", post(report_handler::<D>))
        .with_state(service)
}

pub(crate) async fn evaluate_handler<D>(
    State(service): State<Arc<FollowupService<D>>>,
    axum::Json(request): axum::Json<EvaluateRequest>,
) -> Response
where
    D: MessageDrafter + ?Sized + 'static,
{
    if let Err(error) = request.validate() {
        return unprocessable(error);
    }

    let today = request.today.unwrap_or_else(|| Local::now().date_naive());
    let report = service
        .evaluate_batch(request.invoices, today, request.dry_run)
        .await;
    (StatusCode::OK, axum::Json(report)).into_response()
}

pub(crate) async fn report_handler<D>(
    State(service): State<Arc<FollowupService<D>>>,
    axum::Json(request): axum::Json<EvaluateRequest>,
) -> Response
where
    D: MessageDrafter + ?Sized + 'static,
{
    if let Err(error) = request.validate() {
        return unprocessable(error);
    }

    let today = request.today.unwrap_or_else(|| Local::now().date_naive());
    let report = service
        .evaluate_batch(request.invoices, today, request.dry_run)
        .await;
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        report.markdown(),
    )
        .into_response()
}

fn unprocessable(error: String) -> Response {
    let payload = json!({ "error": error });
    (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
}
