use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::consultation::engine::CertaintyFactorEngine;
use crate::consultation::evidence::Evidence;
use crate::consultation::policy::ScoringPolicy;
use crate::consultation::recorder::{
    ConsultationId, ConsultationPayload, ConsultationRecord, ConsultationRecorder, RecorderError,
};
use crate::consultation::service::ConsultationService;
use crate::knowledge::{
    CfScaleEntry, CfScaleId, Disease, DiseaseId, KnowledgeBase, KnowledgeRecords, KnowledgeStore,
    KnowledgeStoreError, RetryPolicy, RuleEntry, Symptom, SymptomId,
};

pub(super) const GASTRITIS: DiseaseId = DiseaseId(1);
pub(super) const GERD: DiseaseId = DiseaseId(2);
pub(super) const DISPEPSIA: DiseaseId = DiseaseId(3);

pub(super) const DEMAM: SymptomId = SymptomId(1);
pub(super) const NYERI_ULU_HATI: SymptomId = SymptomId(2);
pub(super) const MUAL: SymptomId = SymptomId(3);
pub(super) const KEMBUNG: SymptomId = SymptomId(4);

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

fn scale() -> Vec<CfScaleEntry> {
    [
        (1, "Tidak", 0.0),
        (2, "Sedikit Yakin", 0.3),
        (3, "Kurang Yakin", 0.4),
        (4, "Setengah Yakin", 0.5),
        (5, "Cukup Yakin", 0.6),
        (6, "Yakin", 0.8),
        (7, "Sangat Yakin", 1.0),
    ]
    .into_iter()
    .map(|(id, label, value)| CfScaleEntry {
        id: CfScaleId(id),
        label: label.to_string(),
        value,
    })
    .collect()
}

pub(super) fn rule(disease: DiseaseId, symptom: SymptomId, scale_id: u32) -> RuleEntry {
    RuleEntry {
        disease_id: disease,
        symptom_id: symptom,
        expert_scale_id: CfScaleId(scale_id),
    }
}

/// Gastritis <- demam (0.6); GERD <- nyeri ulu hati (0.3), mual (0.5);
/// Dispepsia <- perut kembung (0.8).
pub(super) fn records() -> KnowledgeRecords {
    KnowledgeRecords {
        diseases: vec![
            Disease {
                id: GASTRITIS,
                code: "P01".to_string(),
                name: "Gastritis".to_string(),
                advice: Some("Antasida, hindari makanan pedas.".to_string()),
            },
            Disease {
                id: GERD,
                code: "P02".to_string(),
                name: "GERD".to_string(),
                advice: Some("Omeprazole, jangan telat makan.".to_string()),
            },
            Disease {
                id: DISPEPSIA,
                code: "P03".to_string(),
                name: "Dispepsia".to_string(),
                advice: None,
            },
        ],
        symptoms: vec![
            symptom(DEMAM, "G1", "Demam"),
            symptom(NYERI_ULU_HATI, "G2", "Nyeri ulu hati"),
            symptom(MUAL, "G3", "Mual"),
            symptom(KEMBUNG, "G4", "Perut kembung"),
        ],
        scale: scale(),
        rules: vec![
            rule(GASTRITIS, DEMAM, 5),
            rule(GERD, NYERI_ULU_HATI, 2),
            rule(GERD, MUAL, 4),
            rule(DISPEPSIA, KEMBUNG, 6),
        ],
    }
}

fn symptom(id: SymptomId, code: &str, description: &str) -> Symptom {
    Symptom {
        id,
        code: code.to_string(),
        description: description.to_string(),
    }
}

pub(super) fn snapshot_from(records: KnowledgeRecords) -> KnowledgeBase {
    KnowledgeBase::from_records(records).expect("valid fixture knowledge base")
}

pub(super) fn snapshot() -> KnowledgeBase {
    snapshot_from(records())
}

/// Complete answer sheet: listed symptoms get their value, the rest "Tidak".
pub(super) fn answers(values: &[(SymptomId, f64)]) -> BTreeMap<SymptomId, f64> {
    let mut sheet: BTreeMap<SymptomId, f64> = [DEMAM, NYERI_ULU_HATI, MUAL, KEMBUNG]
        .into_iter()
        .map(|id| (id, 0.0))
        .collect();
    for (id, value) in values {
        sheet.insert(*id, *value);
    }
    sheet
}

pub(super) fn evidence(values: &[(SymptomId, f64)]) -> Evidence {
    Evidence::from_values(answers(values))
}

pub(super) fn scoring_engine(policy: ScoringPolicy) -> CertaintyFactorEngine {
    CertaintyFactorEngine::new(policy).expect("valid policy")
}

pub(super) fn instant_retries() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        initial_backoff: Duration::ZERO,
        max_backoff: Duration::ZERO,
    }
}

pub(super) fn build_service() -> (
    ConsultationService<MemoryStore, MemoryRecorder>,
    Arc<MemoryStore>,
    Arc<MemoryRecorder>,
) {
    let store = Arc::new(MemoryStore::new(records()));
    let recorder = Arc::new(MemoryRecorder::default());
    let service = ConsultationService::with_retry(
        store.clone(),
        recorder.clone(),
        ScoringPolicy::default(),
        instant_retries(),
    )
    .expect("valid policy");
    (service, store, recorder)
}

pub(super) struct MemoryStore {
    records: Mutex<KnowledgeRecords>,
    loads: AtomicU32,
}

impl MemoryStore {
    pub(super) fn new(records: KnowledgeRecords) -> Self {
        Self {
            records: Mutex::new(records),
            loads: AtomicU32::new(0),
        }
    }

    pub(super) fn replace(&self, records: KnowledgeRecords) {
        *self.records.lock().expect("store mutex poisoned") = records;
    }

    pub(super) fn loads(&self) -> u32 {
        self.loads.load(Ordering::SeqCst)
    }
}

impl KnowledgeStore for MemoryStore {
    fn load(&self) -> Result<KnowledgeRecords, KnowledgeStoreError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.lock().expect("store mutex poisoned").clone())
    }
}

pub(super) struct UnavailableStore;

impl KnowledgeStore for UnavailableStore {
    fn load(&self) -> Result<KnowledgeRecords, KnowledgeStoreError> {
        Err(KnowledgeStoreError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemoryRecorder {
    records: Mutex<Vec<ConsultationRecord>>,
    sequence: AtomicU64,
}

impl MemoryRecorder {
    pub(super) fn records(&self) -> Vec<ConsultationRecord> {
        self.records.lock().expect("recorder mutex poisoned").clone()
    }
}

impl ConsultationRecorder for MemoryRecorder {
    fn record(&self, payload: &ConsultationPayload) -> Result<ConsultationRecord, RecorderError> {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let record = ConsultationRecord {
            id: ConsultationId(format!("kons-{id:06}")),
            recorded_at: Utc::now(),
            payload: payload.clone(),
        };
        self.records
            .lock()
            .expect("recorder mutex poisoned")
            .push(record.clone());
        Ok(record)
    }
}

/// Recorder that fails a fixed number of times with a transient error.
pub(super) struct FlakyRecorder {
    failures: u32,
    calls: AtomicU32,
    inner: MemoryRecorder,
}

impl FlakyRecorder {
    pub(super) fn failing(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
            inner: MemoryRecorder::default(),
        }
    }

    pub(super) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConsultationRecorder for FlakyRecorder {
    fn record(&self, payload: &ConsultationPayload) -> Result<ConsultationRecord, RecorderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(RecorderError::Unavailable("database offline".to_string()));
        }
        self.inner.record(payload)
    }
}

pub(super) struct ConflictRecorder {
    calls: AtomicU32,
}

impl ConflictRecorder {
    pub(super) fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
        }
    }

    pub(super) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ConsultationRecorder for ConflictRecorder {
    fn record(&self, _payload: &ConsultationPayload) -> Result<ConsultationRecord, RecorderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RecorderError::Conflict)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
