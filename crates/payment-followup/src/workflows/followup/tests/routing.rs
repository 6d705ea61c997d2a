use super::common::*;

use axum::extract::State;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::followup::router::{evaluate_handler, report_handler};
use crate::workflows::followup::{
    followup_router, EvaluateRequest, FollowupPipeline, FollowupService, InvoiceFact,
};

fn service(drafter: StaticDrafter) -> Arc<FollowupService<StaticDrafter>> {
    Arc::new(FollowupService::new(
        FollowupPipeline::default().with_retry(no_backoff(1)),
        Arc::new(drafter),
    ))
}

fn request(invoices: Vec<InvoiceFact>) -> EvaluateRequest {
    EvaluateRequest {
        invoices,
        today: Some(today()),
        dry_run: false,
    }
}

#[tokio::test]
async fn evaluate_handler_returns_review_entries() {
    let response = evaluate_handler::<StaticDrafter>(
        State(service(StaticDrafter::polite())),
        axum::Json(request(vec![escalated_invoice(), invoice()])),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["today"], "2025-06-30");
    assert_eq!(body["entries"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["entries"][0]["state"]["decision"]["tone"], "firm");
    assert_eq!(
        body["entries"][0]["state"]["decision"]["recommended_timing"],
        "now"
    );
    assert_eq!(
        body["entries"][0]["surfaced_message"]["subject"],
        "Friendly reminder: invoice INV-2001"
    );
    assert_eq!(body["entries"][1]["state"]["context"]["risk_level"], "low");
}

#[tokio::test]
async fn evaluate_handler_rejects_empty_batches() {
    let response = evaluate_handler::<StaticDrafter>(
        State(service(StaticDrafter::polite())),
        axum::Json(request(Vec::new())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["error"], "at least one invoice is required");
}

#[tokio::test]
async fn evaluate_handler_rejects_negative_amounts() {
    let invoice = InvoiceFact {
        invoice_amount: -10.0,
        ..invoice()
    };
    let response = evaluate_handler::<StaticDrafter>(
        State(service(StaticDrafter::polite())),
        axum::Json(request(vec![invoice])),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn report_handler_renders_markdown() {
    let response = report_handler::<StaticDrafter>(
        State(service(StaticDrafter::polite())),
        axum::Json(request(vec![escalated_invoice()])),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/markdown; charset=utf-8"
    );
    let body = text_body(response).await;
    assert!(body.starts_with("# Follow-up Recommendations"));
}

#[tokio::test]
async fn evaluate_route_accepts_json_payloads() {
    let drafter_service = service(StaticDrafter::polite());
    let router = followup_router(drafter_service.clone());
    let payload = json!({
        "today": "2025-06-30",
        "dry_run": true,
        "invoices": [{
            "client_name": "Globex",
            "invoice_id": "INV-2001",
            "invoice_amount": 9000.0,
            "invoice_issue_date": "2025-05-01",
            "days_overdue": 45,
            "relationship_tag": "risky",
            "notes": "Late payment, ignored prior reminders."
        }]
    });

    let response = router
        .oneshot(
            Request::post("/api/v1/followups/evaluate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&payload).expect("payload serializes"),
                ))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let entry = &body["entries"][0];
    assert_eq!(entry["state"]["invoice"]["currency"], "USD");
    assert_eq!(entry["state"]["context"]["risk_level"], "high");
    assert!(entry["state"]["message"].is_null());
    assert!(entry.get("surfaced_message").is_none());
}

#[tokio::test]
async fn evaluate_route_rejects_unknown_relationship() {
    let router = followup_router(service(StaticDrafter::polite()));
    let payload = json!({
        "invoices": [{
            "client_name": "Globex",
            "invoice_id": "INV-2001",
            "invoice_amount": 10.0,
            "invoice_issue_date": "2025-05-01",
            "days_overdue": 4,
            "relationship_tag": "partner"
        }]
    });

    let response = router
        .oneshot(
            Request::post("/api/v1/followups/evaluate")
                .header(header::CONTENT_TYPE, "application/json")
                .body(axum::body::Body::from(
                    serde_json::to_vec(&payload).expect("payload serializes"),
                ))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
