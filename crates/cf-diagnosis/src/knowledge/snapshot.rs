use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::domain::{CfScaleEntry, CfScaleId, Disease, DiseaseId, RuleEntry, Symptom, SymptomId};

/// Tolerance used when matching an answer against the scale vocabulary.
pub const SCALE_TOLERANCE: f64 = 1e-9;

/// Raw collections exactly as returned by a knowledge store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeRecords {
    pub diseases: Vec<Disease>,
    pub symptoms: Vec<Symptom>,
    pub scale: Vec<CfScaleEntry>,
    pub rules: Vec<RuleEntry>,
}

/// Schema violations detected while validating a snapshot.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum KnowledgeBaseError {
    #[error("disease id {0} appears more than once")]
    DuplicateDisease(DiseaseId),
    #[error("symptom id {0} appears more than once")]
    DuplicateSymptom(SymptomId),
    #[error("scale entry id {0} appears more than once")]
    DuplicateScaleEntry(CfScaleId),
    #[error("scale entry '{label}' has value {value}, expected a number within [0, 1]")]
    ScaleValueOutOfRange { label: String, value: f64 },
    #[error("scale entries '{first}' and '{second}' share the value {value}")]
    AmbiguousScaleValue {
        first: String,
        second: String,
        value: f64,
    },
}

/// Certainty vocabulary, ordered by ascending value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CfScale {
    entries: Vec<CfScaleEntry>,
}

impl CfScale {
    pub fn new(mut entries: Vec<CfScaleEntry>) -> Result<Self, KnowledgeBaseError> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(entry.id) {
                return Err(KnowledgeBaseError::DuplicateScaleEntry(entry.id));
            }
            if !entry.value.is_finite() || !(0.0..=1.0).contains(&entry.value) {
                return Err(KnowledgeBaseError::ScaleValueOutOfRange {
                    label: entry.label.clone(),
                    value: entry.value,
                });
            }
        }

        entries.sort_by(|a, b| a.value.total_cmp(&b.value).then(a.id.cmp(&b.id)));

        for pair in entries.windows(2) {
            if (pair[1].value - pair[0].value).abs() < SCALE_TOLERANCE {
                return Err(KnowledgeBaseError::AmbiguousScaleValue {
                    first: pair[0].label.clone(),
                    second: pair[1].label.clone(),
                    value: pair[0].value,
                });
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[CfScaleEntry] {
        &self.entries
    }

    pub fn entry(&self, id: CfScaleId) -> Option<&CfScaleEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Scale entry matching `value`, if the value belongs to the vocabulary.
    pub fn entry_for_value(&self, value: f64) -> Option<&CfScaleEntry> {
        self.entries
            .iter()
            .find(|entry| (entry.value - value).abs() < SCALE_TOLERANCE)
    }

    pub fn contains(&self, value: f64) -> bool {
        self.entry_for_value(value).is_some()
    }

    /// Lowest value of the vocabulary ("Tidak" in the stock scale).
    pub fn zero(&self) -> Option<&CfScaleEntry> {
        self.entries.first()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validated, immutable point-in-time view of the knowledge base.
///
/// A scoring run reads exactly one snapshot; edits made in the store after the
/// snapshot was taken are not observed.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    diseases: BTreeMap<DiseaseId, Disease>,
    symptoms: Vec<Symptom>,
    scale: CfScale,
    rules: Vec<RuleEntry>,
}

impl KnowledgeBase {
    /// Validate raw records once at the store boundary.
    ///
    /// Rules are kept verbatim, including ones pointing at entities that do
    /// not exist; the engine skips and reports those individually.
    pub fn from_records(records: KnowledgeRecords) -> Result<Self, KnowledgeBaseError> {
        let KnowledgeRecords {
            diseases: disease_rows,
            symptoms: symptom_rows,
            scale,
            rules,
        } = records;

        let mut diseases = BTreeMap::new();
        for disease in disease_rows {
            let id = disease.id;
            if diseases.insert(id, disease).is_some() {
                return Err(KnowledgeBaseError::DuplicateDisease(id));
            }
        }

        let mut seen = HashSet::new();
        for symptom in &symptom_rows {
            if !seen.insert(symptom.id) {
                return Err(KnowledgeBaseError::DuplicateSymptom(symptom.id));
            }
        }
        let mut symptoms = symptom_rows;
        symptoms.sort_by_cached_key(|symptom| code_order_key(&symptom.code, symptom.id));

        Ok(Self {
            diseases,
            symptoms,
            scale: CfScale::new(scale)?,
            rules,
        })
    }

    /// Diseases in ascending id order.
    pub fn diseases(&self) -> impl Iterator<Item = &Disease> {
        self.diseases.values()
    }

    pub fn disease(&self, id: DiseaseId) -> Option<&Disease> {
        self.diseases.get(&id)
    }

    /// Symptoms in presentation order (natural ordering of their codes).
    pub fn symptoms(&self) -> &[Symptom] {
        &self.symptoms
    }

    pub fn symptom(&self, id: SymptomId) -> Option<&Symptom> {
        self.symptoms.iter().find(|symptom| symptom.id == id)
    }

    pub fn scale(&self) -> &CfScale {
        &self.scale
    }

    pub fn rules(&self) -> &[RuleEntry] {
        &self.rules
    }

    /// The active question set: every symptom must be answered before scoring.
    pub fn question_set(&self) -> Vec<SymptomId> {
        self.symptoms.iter().map(|symptom| symptom.id).collect()
    }
}

fn code_order_key(code: &str, id: SymptomId) -> (u64, String, SymptomId) {
    let digits: String = code.chars().filter(char::is_ascii_digit).collect();
    let number = digits.parse::<u64>().unwrap_or(u64::MAX);
    (number, code.to_string(), id)
}
