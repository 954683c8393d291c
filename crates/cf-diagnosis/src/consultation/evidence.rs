use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::knowledge::{CfScale, KnowledgeBase, SymptomId};

/// Validation errors raised while collecting respondent answers.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvidenceError {
    #[error("symptom {0} is not part of the active question set")]
    UnknownSymptom(SymptomId),
    #[error("certainty {value} for symptom {symptom_id} is outside [0, 1]")]
    OutOfRange { symptom_id: SymptomId, value: f64 },
    #[error("certainty {value} for symptom {symptom_id} is not a value of the configured scale")]
    NotOnScale { symptom_id: SymptomId, value: f64 },
    #[error("incomplete evidence: {} symptom(s) unanswered", .missing.len())]
    Incomplete { missing: Vec<SymptomId> },
}

/// One (symptom, certainty) pair, as shown in audit trails and recorded payloads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvidenceEntry {
    pub symptom_id: SymptomId,
    pub certainty: f64,
}

/// Gathers exactly one answer per symptom of the active question set.
#[derive(Debug, Clone)]
pub struct EvidenceCollector {
    questions: Vec<SymptomId>,
    scale: CfScale,
    answers: BTreeMap<SymptomId, f64>,
}

impl EvidenceCollector {
    pub fn new(questions: Vec<SymptomId>, scale: CfScale) -> Self {
        Self {
            questions,
            scale,
            answers: BTreeMap::new(),
        }
    }

    /// Collector asking every symptom of the snapshot on its scale.
    pub fn for_snapshot(snapshot: &KnowledgeBase) -> Self {
        Self::new(snapshot.question_set(), snapshot.scale().clone())
    }

    pub fn questions(&self) -> &[SymptomId] {
        &self.questions
    }

    /// Record (or overwrite) the answer for a symptom.
    pub fn record_answer(
        &mut self,
        symptom_id: SymptomId,
        certainty: f64,
    ) -> Result<(), EvidenceError> {
        if !self.questions.contains(&symptom_id) {
            return Err(EvidenceError::UnknownSymptom(symptom_id));
        }

        if !certainty.is_finite() || !(0.0..=1.0).contains(&certainty) {
            return Err(EvidenceError::OutOfRange {
                symptom_id,
                value: certainty,
            });
        }

        let entry = self
            .scale
            .entry_for_value(certainty)
            .ok_or(EvidenceError::NotOnScale {
                symptom_id,
                value: certainty,
            })?;

        self.answers.insert(symptom_id, entry.value);
        Ok(())
    }

    pub fn answer(&self, symptom_id: SymptomId) -> Option<f64> {
        self.answers.get(&symptom_id).copied()
    }

    pub fn answered(&self) -> usize {
        self.answers.len()
    }

    /// True when every symptom in `symptoms` has a recorded answer.
    pub fn is_complete(&self, symptoms: &[SymptomId]) -> bool {
        symptoms.iter().all(|id| self.answers.contains_key(id))
    }

    /// Unanswered questions, in presentation order.
    pub fn missing(&self) -> Vec<SymptomId> {
        self.questions
            .iter()
            .filter(|id| !self.answers.contains_key(id))
            .copied()
            .collect()
    }

    /// Freeze the answers; fails unless the whole question set is answered.
    pub fn submit(self) -> Result<Evidence, EvidenceError> {
        if !self.is_complete(&self.questions) {
            return Err(EvidenceError::Incomplete {
                missing: self.missing(),
            });
        }

        Ok(Evidence {
            values: self.answers,
        })
    }
}

/// Complete, frozen symptom -> certainty map consumed by one scoring run.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    values: BTreeMap<SymptomId, f64>,
}

impl Evidence {
    #[cfg(test)]
    pub(crate) fn from_values(values: BTreeMap<SymptomId, f64>) -> Self {
        Self { values }
    }

    pub fn certainty(&self, symptom_id: SymptomId) -> Option<f64> {
        self.values.get(&symptom_id).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Answers strictly above `threshold`, ordered by symptom id.
    pub fn present(&self, threshold: f64) -> Vec<EvidenceEntry> {
        self.values
            .iter()
            .filter(|(_, certainty)| **certainty > threshold)
            .map(|(symptom_id, certainty)| EvidenceEntry {
                symptom_id: *symptom_id,
                certainty: *certainty,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{CfScaleEntry, CfScaleId};

    fn scale() -> CfScale {
        let entries = [
            (1, "Tidak", 0.0),
            (2, "Tidak Tahu", 0.2),
            (3, "Kurang Yakin", 0.4),
            (4, "Cukup Yakin", 0.6),
            (5, "Yakin", 0.8),
            (6, "Sangat Yakin", 1.0),
        ]
        .into_iter()
        .map(|(id, label, value)| CfScaleEntry {
            id: CfScaleId(id),
            label: label.to_string(),
            value,
        })
        .collect();
        CfScale::new(entries).expect("valid scale")
    }

    fn collector() -> EvidenceCollector {
        EvidenceCollector::new(vec![SymptomId(1), SymptomId(2), SymptomId(3)], scale())
    }

    #[test]
    fn record_answer_overwrites_previous_value() {
        let mut collector = collector();
        collector.record_answer(SymptomId(1), 0.4).expect("valid");
        collector.record_answer(SymptomId(1), 0.8).expect("valid");

        assert_eq!(collector.answer(SymptomId(1)), Some(0.8));
        assert_eq!(collector.answered(), 1);
    }

    #[test]
    fn record_answer_rejects_values_off_the_scale() {
        let mut collector = collector();

        assert_eq!(
            collector.record_answer(SymptomId(1), 0.5),
            Err(EvidenceError::NotOnScale {
                symptom_id: SymptomId(1),
                value: 0.5,
            })
        );
        assert!(matches!(
            collector.record_answer(SymptomId(1), 1.5),
            Err(EvidenceError::OutOfRange { .. })
        ));
        assert!(matches!(
            collector.record_answer(SymptomId(1), f64::NAN),
            Err(EvidenceError::OutOfRange { .. })
        ));
        assert_eq!(collector.answered(), 0);
    }

    #[test]
    fn record_answer_rejects_unknown_symptoms() {
        let mut collector = collector();
        assert_eq!(
            collector.record_answer(SymptomId(99), 0.8),
            Err(EvidenceError::UnknownSymptom(SymptomId(99)))
        );
    }

    #[test]
    fn record_answer_snaps_to_the_scale_value() {
        let mut collector = collector();
        collector
            .record_answer(SymptomId(2), 0.6 + 1e-12)
            .expect("within tolerance");
        assert_eq!(collector.answer(SymptomId(2)), Some(0.6));
    }

    #[test]
    fn submit_requires_every_question() {
        let mut collector = collector();
        collector.record_answer(SymptomId(1), 0.8).expect("valid");
        collector.record_answer(SymptomId(3), 0.0).expect("valid");

        assert!(!collector.is_complete(collector.questions()));
        assert!(collector.is_complete(&[SymptomId(1), SymptomId(3)]));

        match collector.submit() {
            Err(EvidenceError::Incomplete { missing }) => {
                assert_eq!(missing, vec![SymptomId(2)]);
            }
            other => panic!("expected incomplete evidence, got {other:?}"),
        }
    }

    #[test]
    fn present_excludes_answers_at_or_below_threshold() {
        let mut collector = collector();
        collector.record_answer(SymptomId(1), 0.8).expect("valid");
        collector.record_answer(SymptomId(2), 0.4).expect("valid");
        collector.record_answer(SymptomId(3), 0.0).expect("valid");
        let evidence = collector.submit().expect("complete");

        let present: Vec<SymptomId> = evidence
            .present(0.0)
            .iter()
            .map(|entry| entry.symptom_id)
            .collect();
        assert_eq!(present, vec![SymptomId(1), SymptomId(2)]);

        let strict: Vec<SymptomId> = evidence
            .present(0.4)
            .iter()
            .map(|entry| entry.symptom_id)
            .collect();
        assert_eq!(strict, vec![SymptomId(1)]);
    }
}
