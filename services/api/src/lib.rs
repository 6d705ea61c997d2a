mod batch;
mod cli;
mod drafting;
mod infra;
mod routes;
mod server;

use payment_followup::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
