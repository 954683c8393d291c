use cf_diagnosis::consultation::{
    ConsultationId, ConsultationPayload, ConsultationRecord, ConsultationRecorder, RecorderError,
};
use cf_diagnosis::knowledge::SymptomId;
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local consultation ledger; records are lost on restart.
#[derive(Default, Clone)]
pub(crate) struct InMemoryConsultationRecorder {
    records: Arc<Mutex<Vec<ConsultationRecord>>>,
    sequence: Arc<AtomicU64>,
}

impl ConsultationRecorder for InMemoryConsultationRecorder {
    fn record(&self, payload: &ConsultationPayload) -> Result<ConsultationRecord, RecorderError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| RecorderError::Unavailable("ledger mutex poisoned".to_string()))?;
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let record = ConsultationRecord {
            id: ConsultationId(format!("KONS-{sequence:06}")),
            recorded_at: Utc::now(),
            payload: payload.clone(),
        };
        guard.push(record.clone());
        Ok(record)
    }
}

impl InMemoryConsultationRecorder {
    #[cfg(test)]
    pub(crate) fn records(&self) -> Vec<ConsultationRecord> {
        self.records.lock().expect("ledger mutex poisoned").clone()
    }
}

/// Parse a `SYMPTOM_ID=VALUE` answer given on the command line.
pub(crate) fn parse_answer(raw: &str) -> Result<(SymptomId, f64), String> {
    let (id, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SYMPTOM_ID=VALUE, got '{raw}'"))?;
    let id = id
        .trim()
        .parse::<u32>()
        .map_err(|err| format!("invalid symptom id '{id}' ({err})"))?;
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("invalid certainty '{value}' ({err})"))?;
    Ok((SymptomId(id), value))
}
