use serde::{Deserialize, Serialize};

use super::engine::DiagnosisResult;
use super::evidence::{Evidence, EvidenceEntry};
use super::policy::ScoringPolicy;

/// Results ordered by confidence, with the primary diagnosis and differentials split out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDiagnosis {
    pub primary: Option<DiagnosisResult>,
    pub differential: Vec<DiagnosisResult>,
    pub results: Vec<DiagnosisResult>,
    /// Accepted answers behind the diagnosis.
    pub evidence_list: Vec<EvidenceEntry>,
}

impl RankedDiagnosis {
    /// False when nothing matched, i.e. the leading disease scored 0.
    pub fn is_conclusive(&self) -> bool {
        self.primary_cf() > 0.0
    }

    pub fn primary_cf(&self) -> f64 {
        self.primary
            .as_ref()
            .map(|result| result.combined_cf)
            .unwrap_or(0.0)
    }
}

/// Sort by descending confidence; ties fall back to ascending disease id.
pub fn rank(
    mut results: Vec<DiagnosisResult>,
    evidence: &Evidence,
    policy: &ScoringPolicy,
) -> RankedDiagnosis {
    results.sort_by(|a, b| {
        b.combined_cf
            .total_cmp(&a.combined_cf)
            .then_with(|| a.disease_id.cmp(&b.disease_id))
    });

    let primary = results.first().cloned();
    let differential = results
        .iter()
        .skip(1)
        .take(policy.differential_limit)
        .cloned()
        .collect();

    RankedDiagnosis {
        primary,
        differential,
        results,
        evidence_list: evidence.present(policy.acceptance_threshold),
    }
}
