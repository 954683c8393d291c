use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for diseases in the knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiseaseId(pub u32);

/// Identifier wrapper for symptoms asked during a consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymptomId(pub u32);

/// Identifier wrapper for entries of the certainty vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CfScaleId(pub u32);

impl fmt::Display for DiseaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for SymptomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for CfScaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub const DEFAULT_ADVICE: &str =
    "Consult a qualified medical professional for further examination and treatment.";

/// Candidate condition managed by knowledge engineers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disease {
    pub id: DiseaseId,
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

impl Disease {
    /// Treatment recommendation shown alongside a primary diagnosis.
    pub fn advice_or_default(&self) -> &str {
        self.advice.as_deref().unwrap_or(DEFAULT_ADVICE)
    }
}

/// Question presented to the respondent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symptom {
    pub id: SymptomId,
    pub code: String,
    pub description: String,
}

/// One step of the discretized confidence vocabulary (e.g. "Sangat Yakin" = 1.0).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CfScaleEntry {
    pub id: CfScaleId,
    pub label: String,
    pub value: f64,
}

/// Expert rule binding a disease to a symptom with a weight drawn from the scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleEntry {
    pub disease_id: DiseaseId,
    pub symptom_id: SymptomId,
    pub expert_scale_id: CfScaleId,
}
