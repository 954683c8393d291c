use crate::config::ConfigError;
use crate::consultation::{ConsultationServiceError, EvidenceError, PolicyError};
use crate::knowledge::KnowledgeStoreError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Consultation(ConsultationServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Consultation(err) => write!(f, "consultation error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Consultation(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Consultation(ConsultationServiceError::Evidence(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Consultation(ConsultationServiceError::KnowledgeStore(err))
                if err.is_transient() =>
            {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Consultation(_)
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<PolicyError> for AppError {
    fn from(value: PolicyError) -> Self {
        Self::Config(ConfigError::InvalidPolicy(value))
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ConsultationServiceError> for AppError {
    fn from(value: ConsultationServiceError) -> Self {
        Self::Consultation(value)
    }
}

impl From<KnowledgeStoreError> for AppError {
    fn from(value: KnowledgeStoreError) -> Self {
        Self::Consultation(ConsultationServiceError::KnowledgeStore(value))
    }
}

impl From<EvidenceError> for AppError {
    fn from(value: EvidenceError) -> Self {
        Self::Consultation(ConsultationServiceError::Evidence(value))
    }
}
