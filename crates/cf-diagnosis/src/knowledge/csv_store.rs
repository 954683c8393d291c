use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use super::domain::{CfScaleEntry, CfScaleId, Disease, DiseaseId, RuleEntry, Symptom, SymptomId};
use super::snapshot::KnowledgeRecords;
use super::store::{KnowledgeStore, KnowledgeStoreError};

pub const DISEASES_FILE: &str = "diseases.csv";
pub const SYMPTOMS_FILE: &str = "symptoms.csv";
pub const SCALE_FILE: &str = "cf_scale.csv";
pub const RULES_FILE: &str = "rules.csv";

/// Knowledge store backed by a directory of CSV exports.
///
/// Files are re-read on every `load`, so edits made between consultations are
/// picked up by the next snapshot.
#[derive(Debug, Clone)]
pub struct CsvKnowledgeStore {
    root: PathBuf,
}

impl CsvKnowledgeStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_table<T, R>(&self, file_name: &str) -> Result<Vec<R>, KnowledgeStoreError>
    where
        T: DeserializeOwned + Into<R>,
    {
        let path = self.root.join(file_name);
        let file = File::open(&path).map_err(|source| KnowledgeStoreError::Io {
            path: path.clone(),
            source,
        })?;
        parse_rows::<T, R, _>(file).map_err(|source| KnowledgeStoreError::Csv { path, source })
    }
}

impl KnowledgeStore for CsvKnowledgeStore {
    fn load(&self) -> Result<KnowledgeRecords, KnowledgeStoreError> {
        Ok(KnowledgeRecords {
            diseases: self.read_table::<DiseaseRow, Disease>(DISEASES_FILE)?,
            symptoms: self.read_table::<SymptomRow, Symptom>(SYMPTOMS_FILE)?,
            scale: self.read_table::<ScaleRow, CfScaleEntry>(SCALE_FILE)?,
            rules: self.read_table::<RuleRow, RuleEntry>(RULES_FILE)?,
        })
    }
}

pub(crate) fn parse_rows<T, R, I>(reader: I) -> Result<Vec<R>, csv::Error>
where
    T: DeserializeOwned + Into<R>,
    I: Read,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();

    for record in csv_reader.deserialize::<T>() {
        rows.push(record?.into());
    }

    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct DiseaseRow {
    id: u32,
    code: String,
    name: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    advice: Option<String>,
}

impl From<DiseaseRow> for Disease {
    fn from(row: DiseaseRow) -> Self {
        Disease {
            id: DiseaseId(row.id),
            code: row.code,
            name: row.name,
            advice: row.advice,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SymptomRow {
    id: u32,
    code: String,
    description: String,
}

impl From<SymptomRow> for Symptom {
    fn from(row: SymptomRow) -> Self {
        Symptom {
            id: SymptomId(row.id),
            code: row.code,
            description: row.description,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScaleRow {
    id: u32,
    label: String,
    value: f64,
}

impl From<ScaleRow> for CfScaleEntry {
    fn from(row: ScaleRow) -> Self {
        CfScaleEntry {
            id: CfScaleId(row.id),
            label: row.label,
            value: row.value,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RuleRow {
    disease_id: u32,
    symptom_id: u32,
    expert_scale_id: u32,
}

impl From<RuleRow> for RuleEntry {
    fn from(row: RuleRow) -> Self {
        RuleEntry {
            disease_id: DiseaseId(row.disease_id),
            symptom_id: SymptomId(row.symptom_id),
            expert_scale_id: CfScaleId(row.expert_scale_id),
        }
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
