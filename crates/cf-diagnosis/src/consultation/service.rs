use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::engine::{CertaintyFactorEngine, SkippedRule};
use super::evidence::{EvidenceCollector, EvidenceError};
use super::policy::{PolicyError, ScoringPolicy};
use super::ranking::{rank, RankedDiagnosis};
use super::recorder::{
    ConsultationId, ConsultationPayload, ConsultationRecorder, RecorderError,
};
use crate::knowledge::{
    CfScaleEntry, KnowledgeBase, KnowledgeStore, KnowledgeStoreError, RetryPolicy, SnapshotLoader,
    Symptom, SymptomId,
};

/// Service composing the snapshot loader, scoring engine, and recorder.
pub struct ConsultationService<S, C> {
    loader: SnapshotLoader<S>,
    recorder: Arc<C>,
    engine: Arc<CertaintyFactorEngine>,
    recording_retry: RetryPolicy,
}

impl<S, C> ConsultationService<S, C>
where
    S: KnowledgeStore + 'static,
    C: ConsultationRecorder + 'static,
{
    pub fn new(
        store: Arc<S>,
        recorder: Arc<C>,
        policy: ScoringPolicy,
    ) -> Result<Self, PolicyError> {
        Self::with_retry(store, recorder, policy, RetryPolicy::default())
    }

    /// Build a service whose store loads and recorder writes share `retry`.
    pub fn with_retry(
        store: Arc<S>,
        recorder: Arc<C>,
        policy: ScoringPolicy,
        retry: RetryPolicy,
    ) -> Result<Self, PolicyError> {
        let engine = CertaintyFactorEngine::new(policy)?;
        Ok(Self {
            loader: SnapshotLoader::new(store, retry.clone()),
            recorder,
            engine: Arc::new(engine),
            recording_retry: retry,
        })
    }

    pub fn policy(&self) -> &ScoringPolicy {
        self.engine.policy()
    }

    /// Questions and answer vocabulary for the current knowledge base.
    pub fn questionnaire(&self) -> Result<Questionnaire, ConsultationServiceError> {
        let snapshot = self.loader.load()?;
        Ok(Questionnaire::from_snapshot(&snapshot))
    }

    /// Start a consultation against a freshly loaded snapshot.
    pub fn begin(&self) -> Result<ConsultationSession, ConsultationServiceError> {
        let snapshot = self.loader.load()?;
        let collector = EvidenceCollector::for_snapshot(&snapshot);
        Ok(ConsultationSession {
            snapshot,
            collector,
        })
    }

    /// Score a completed session and hand the result to the recorder.
    ///
    /// A recording failure never discards the computed result; it is reported
    /// through [`ConsultationReport::recording`].
    pub fn diagnose(
        &self,
        session: ConsultationSession,
    ) -> Result<ConsultationReport, ConsultationServiceError> {
        let ConsultationSession {
            snapshot,
            collector,
        } = session;
        let evidence = collector.submit()?;

        let outcome = self.engine.score(&snapshot, &evidence);
        let ranking = rank(outcome.results, &evidence, self.engine.policy());
        let payload = ConsultationPayload::from(&ranking);

        let advice = ranking
            .primary
            .as_ref()
            .filter(|_| ranking.is_conclusive())
            .and_then(|result| snapshot.disease(result.disease_id))
            .map(|disease| disease.advice_or_default().to_string());

        let recording = self.record(&payload);

        info!(
            primary = ?payload.primary_diagnosis,
            combined_cf = payload.combined_cf,
            evidence = payload.evidence_list.len(),
            skipped_rules = outcome.skipped_rules.len(),
            recorded = recording.is_recorded(),
            "consultation diagnosed"
        );

        Ok(ConsultationReport {
            ranking,
            payload,
            recording,
            skipped_rules: outcome.skipped_rules,
            advice,
        })
    }

    /// Run a whole consultation from a complete answer sheet.
    pub fn consult(
        &self,
        answers: &BTreeMap<SymptomId, f64>,
    ) -> Result<ConsultationReport, ConsultationServiceError> {
        let mut session = self.begin()?;
        for (symptom_id, certainty) in answers {
            session.record_answer(*symptom_id, *certainty)?;
        }
        self.diagnose(session)
    }

    /// Hand a payload to the recorder, retrying transient failures.
    ///
    /// Also usable to re-submit the payload of a report whose recording failed.
    pub fn record(&self, payload: &ConsultationPayload) -> RecordingStatus {
        let outcome = self.recording_retry.run(
            "consultation recording",
            || self.recorder.record(payload),
            RecorderError::is_transient,
        );

        match outcome {
            Ok(record) => RecordingStatus::Recorded {
                consultation_id: record.id,
                recorded_at: record.recorded_at,
            },
            Err(err) => {
                let reason = err.into_inner().to_string();
                error!(error = %reason, "failed to record consultation");
                RecordingStatus::Failed { reason }
            }
        }
    }
}

/// Explicit per-respondent context: one snapshot plus the answers so far.
#[derive(Debug, Clone)]
pub struct ConsultationSession {
    snapshot: Arc<KnowledgeBase>,
    collector: EvidenceCollector,
}

impl ConsultationSession {
    pub fn snapshot(&self) -> &Arc<KnowledgeBase> {
        &self.snapshot
    }

    pub fn record_answer(
        &mut self,
        symptom_id: SymptomId,
        certainty: f64,
    ) -> Result<(), EvidenceError> {
        self.collector.record_answer(symptom_id, certainty)
    }

    pub fn is_complete(&self) -> bool {
        self.collector.is_complete(self.collector.questions())
    }

    pub fn missing(&self) -> Vec<SymptomId> {
        self.collector.missing()
    }
}

/// Questions in presentation order and the answer options offered for each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Questionnaire {
    pub symptoms: Vec<Symptom>,
    pub options: Vec<CfScaleEntry>,
}

impl Questionnaire {
    pub fn from_snapshot(snapshot: &KnowledgeBase) -> Self {
        Self {
            symptoms: snapshot.symptoms().to_vec(),
            options: snapshot.scale().entries().to_vec(),
        }
    }
}

/// Outcome of handing the payload to the recorder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordingStatus {
    Recorded {
        consultation_id: ConsultationId,
        recorded_at: DateTime<Utc>,
    },
    Failed {
        reason: String,
    },
}

impl RecordingStatus {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordingStatus::Recorded { .. })
    }
}

/// Everything the caller needs to display, audit, and retry a consultation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationReport {
    pub ranking: RankedDiagnosis,
    pub payload: ConsultationPayload,
    pub recording: RecordingStatus,
    pub skipped_rules: Vec<SkippedRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

/// Error raised by the consultation service.
#[derive(Debug, thiserror::Error)]
pub enum ConsultationServiceError {
    #[error(transparent)]
    Evidence(#[from] EvidenceError),
    #[error(transparent)]
    KnowledgeStore(#[from] KnowledgeStoreError),
}
