use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryConsultationRecorder};
use crate::routes::with_consultation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use cf_diagnosis::config::AppConfig;
use cf_diagnosis::consultation::ConsultationService;
use cf_diagnosis::error::AppError;
use cf_diagnosis::knowledge::CsvKnowledgeStore;
use cf_diagnosis::telemetry;
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

    let scoring = config.scoring.clone();
    let store = Arc::new(CsvKnowledgeStore::new(&scoring.knowledge_dir));
    let recorder = Arc::new(InMemoryConsultationRecorder::default());
    let consultation_service = Arc::new(ConsultationService::with_retry(
        store,
        recorder,
        scoring.policy,
        scoring.retry,
    )?);

    // Fail fast on an unreadable knowledge base rather than on the first request.
    let probe = consultation_service.clone();
    let questionnaire = tokio::task::spawn_blocking(move || probe.questionnaire())
        .await
        .map_err(std::io::Error::other)??;

    let app = with_consultation_routes(consultation_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        knowledge_dir = %scoring.knowledge_dir.display(),
        symptoms = questionnaire.symptoms.len(),
        duplicate_rules = %config.scoring.policy.duplicate_rules,
        "certainty factor diagnosis service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
