use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::followup::{DraftingError, PolicyLoadError};
use crate::workflows::ledger::LedgerImportError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server error: {0}")]
    Server(#[from] axum::Error),
    #[error("policy error: {0}")]
    Policy(#[from] PolicyLoadError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerImportError),
    #[error("drafting error: {0}")]
    Drafting(#[from] DraftingError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Ledger(_) | AppError::Policy(_) => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Drafting(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
