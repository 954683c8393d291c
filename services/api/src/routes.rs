use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use cf_diagnosis::consultation::{consultation_router, ConsultationRecorder, ConsultationService};
use cf_diagnosis::knowledge::KnowledgeStore;
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_consultation_routes<S, C>(
    service: Arc<ConsultationService<S, C>>,
) -> axum::Router
where
    S: KnowledgeStore + 'static,
    C: ConsultationRecorder + 'static,
{
    consultation_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Acquire);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryConsultationRecorder;
    use cf_diagnosis::consultation::ScoringPolicy;
    use cf_diagnosis::knowledge::{CsvKnowledgeStore, RetryPolicy};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        }
    }

    fn sample_app(state: AppState) -> axum::Router {
        let store = Arc::new(CsvKnowledgeStore::new(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../../data"
        )));
        let service = Arc::new(
            ConsultationService::with_retry(
                store,
                Arc::new(InMemoryConsultationRecorder::default()),
                ScoringPolicy::default(),
                RetryPolicy::none(),
            )
            .expect("valid policy"),
        );
        with_consultation_routes(service).layer(Extension(state))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = axum::body::to_bytes(response.into_body(), 256 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&body).expect("json payload")
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_bound() {
        let response = readiness_endpoint(Extension(app_state(false)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            json_body(response).await,
            json!({ "status": "initializing" })
        );

        let response = readiness_endpoint(Extension(app_state(true)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_route_is_always_ok() {
        let response = sample_app(app_state(false))
            .oneshot(
                axum::http::Request::get("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn metrics_route_serves_prometheus_text() {
        let response = sample_app(app_state(true))
            .oneshot(
                axum::http::Request::get("/metrics")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn consultation_route_is_mounted_beside_probes() {
        let answers: serde_json::Map<String, serde_json::Value> = (1..=16)
            .map(|id| (id.to_string(), json!(if id == 10 { 1.0 } else { 0.0 })))
            .collect();

        let response = sample_app(app_state(true))
            .oneshot(
                axum::http::Request::post("/api/v1/consultations")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(axum::body::Body::from(
                        serde_json::to_vec(&json!({ "answers": answers })).unwrap(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(
            body["ranking"]["primary"]["disease_name"],
            json!("Gastroenteritis")
        );
    }
}
