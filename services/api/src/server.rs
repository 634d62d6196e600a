use crate::cli::ServeArgs;
use crate::infra::{AppState, CrmSubmitter, LoggingSubmitter};
use crate::routes::with_assessment_routes;
use ai_quotient::config::AppConfig;
use ai_quotient::error::AppError;
use ai_quotient::telemetry::{self, TracingTelemetry};
use ai_quotient::workflows::assessment::{AssessmentService, HubSpotFormsSubmitter, QuestionCatalog};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let submitter = match config.assessment.hubspot.clone() {
        Some(target) => {
            let client = reqwest::Client::builder()
                .timeout(config.assessment.submission_timeout)
                .build()?;
            CrmSubmitter::HubSpot(HubSpotFormsSubmitter::new(client, target))
        }
        None => CrmSubmitter::Logging(LoggingSubmitter),
    };
    info!(crm = submitter.label(), "results submitter configured");

    let assessment_service = Arc::new(AssessmentService::new(
        Arc::new(QuestionCatalog::ai_quotient()),
        Arc::new(submitter),
        Arc::new(TracingTelemetry),
        config.assessment.settings(),
    ));

    let app = with_assessment_routes(assessment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "ai quotient assessment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
