//! Consultation pipeline: evidence collection, Certainty Factor scoring,
//! ranking, and the handoff to the consultation recorder.

pub mod engine;
pub mod evidence;
pub mod policy;
pub mod ranking;
pub mod recorder;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use engine::{
    combine, CertaintyFactorEngine, DiagnosisResult, RuleContribution, ScoringOutcome,
    SkipReason, SkippedRule,
};
pub use evidence::{Evidence, EvidenceCollector, EvidenceEntry, EvidenceError};
pub use policy::{DuplicateRuleResolution, PolicyError, ScoringPolicy};
pub use ranking::{rank, RankedDiagnosis};
pub use recorder::{
    ConsultationId, ConsultationPayload, ConsultationRecord, ConsultationRecorder,
    DifferentialEntry, RecorderError,
};
pub use router::{consultation_router, ConsultationRequest};
pub use service::{
    ConsultationReport, ConsultationService, ConsultationServiceError, ConsultationSession,
    Questionnaire, RecordingStatus,
};
