use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::evidence::EvidenceEntry;
use super::ranking::RankedDiagnosis;
use crate::knowledge::DiseaseId;

/// Identifier assigned by the recorder to a persisted consultation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConsultationId(pub String);

/// Alternative candidate listed after the primary diagnosis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DifferentialEntry {
    pub disease_id: DiseaseId,
    pub combined_cf: f64,
}

/// The single payload handed to the recorder per consultation.
///
/// `primary_diagnosis` is `None` only when the knowledge base held no
/// candidate at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationPayload {
    pub primary_diagnosis: Option<DiseaseId>,
    pub combined_cf: f64,
    pub differential: Vec<DifferentialEntry>,
    pub evidence_list: Vec<EvidenceEntry>,
}

impl From<&RankedDiagnosis> for ConsultationPayload {
    fn from(ranking: &RankedDiagnosis) -> Self {
        ConsultationPayload {
            primary_diagnosis: ranking.primary.as_ref().map(|result| result.disease_id),
            combined_cf: ranking.primary_cf(),
            differential: ranking
                .differential
                .iter()
                .map(|result| DifferentialEntry {
                    disease_id: result.disease_id,
                    combined_cf: result.combined_cf,
                })
                .collect(),
            evidence_list: ranking.evidence_list.clone(),
        }
    }
}

/// Persisted parent record; each `evidence_list` entry becomes one child row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub id: ConsultationId,
    pub recorded_at: DateTime<Utc>,
    pub payload: ConsultationPayload,
}

/// Storage abstraction for finished consultations.
pub trait ConsultationRecorder: Send + Sync {
    fn record(&self, payload: &ConsultationPayload) -> Result<ConsultationRecord, RecorderError>;
}

/// Error enumeration for recorder failures.
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("consultation already recorded")]
    Conflict,
    #[error("recorder unavailable: {0}")]
    Unavailable(String),
}

impl RecorderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, RecorderError::Unavailable(_))
    }
}
