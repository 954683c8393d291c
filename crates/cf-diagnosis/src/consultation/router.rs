use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::evidence::EvidenceError;
use super::recorder::ConsultationRecorder;
use super::service::{ConsultationService, ConsultationServiceError};
use crate::knowledge::{KnowledgeStore, SymptomId};

/// Answer sheet submitted by a respondent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsultationRequest {
    pub answers: BTreeMap<SymptomId, f64>,
}

/// Router builder exposing the questionnaire and consultation endpoints.
pub fn consultation_router<S, C>(service: Arc<ConsultationService<S, C>>) -> Router
where
    S: KnowledgeStore + 'static,
    C: ConsultationRecorder + 'static,
{
    Router::new()
        .route("/api/v1/questionnaire", get(questionnaire_handler::<S, C>))
        .route("/api/v1/consultations", post(consult_handler::<S, C>))
        .with_state(service)
}

pub(crate) async fn questionnaire_handler<S, C>(
    State(service): State<Arc<ConsultationService<S, C>>>,
) -> Response
where
    S: KnowledgeStore + 'static,
    C: ConsultationRecorder + 'static,
{
    match tokio::task::spawn_blocking(move || service.questionnaire()).await {
        Ok(Ok(questionnaire)) => (StatusCode::OK, axum::Json(questionnaire)).into_response(),
        Ok(Err(error)) => service_error_response(error),
        Err(join_error) => internal_error(join_error.to_string()),
    }
}

pub(crate) async fn consult_handler<S, C>(
    State(service): State<Arc<ConsultationService<S, C>>>,
    axum::Json(request): axum::Json<ConsultationRequest>,
) -> Response
where
    S: KnowledgeStore + 'static,
    C: ConsultationRecorder + 'static,
{
    match tokio::task::spawn_blocking(move || service.consult(&request.answers)).await {
        Ok(Ok(report)) => (StatusCode::OK, axum::Json(report)).into_response(),
        Ok(Err(error)) => service_error_response(error),
        Err(join_error) => internal_error(join_error.to_string()),
    }
}

fn service_error_response(error: ConsultationServiceError) -> Response {
    match error {
        ConsultationServiceError::Evidence(EvidenceError::Incomplete { missing }) => {
            let payload = json!({
                "error": "incomplete evidence",
                "missing_symptoms": missing,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        ConsultationServiceError::Evidence(error) => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        ConsultationServiceError::KnowledgeStore(error) if error.is_transient() => {
            let payload = json!({
                "error": error.to_string(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
        ConsultationServiceError::KnowledgeStore(error) => internal_error(error.to_string()),
    }
}

fn internal_error(message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
}
