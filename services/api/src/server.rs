use crate::cli::ServeArgs;
use crate::drafting::ServiceDrafter;
use crate::infra::AppState;
use crate::routes::with_followup_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use payment_followup::config::AppConfig;
use payment_followup::error::AppError;
use payment_followup::telemetry;
use payment_followup::workflows::followup::{FollowupPipeline, FollowupService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let pipeline =
        FollowupPipeline::new(config.followup_policy()?).with_retry(config.drafting.retry);
    if !config.drafting.enabled() {
        warn!("OPENAI_API_KEY not set; drafting disabled, use dry_run requests");
    }
    info!(steps = ?pipeline.steps(), "follow-up pipeline configured");
    let drafter = Arc::new(ServiceDrafter::from_config(&config.drafting));
    let followup_service = Arc::new(FollowupService::new(pipeline, drafter));

    let app = with_followup_routes(followup_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        drafting_enabled = config.drafting.enabled(),
        "payment follow-up advisor ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
