//! Read-only knowledge base: canonical schema, store boundary, and snapshots.

mod csv_store;
pub mod domain;
pub mod snapshot;
pub mod store;

pub use csv_store::{CsvKnowledgeStore, DISEASES_FILE, RULES_FILE, SCALE_FILE, SYMPTOMS_FILE};
pub use domain::{
    CfScaleEntry, CfScaleId, Disease, DiseaseId, RuleEntry, Symptom, SymptomId, DEFAULT_ADVICE,
};
pub use snapshot::{CfScale, KnowledgeBase, KnowledgeBaseError, KnowledgeRecords};
pub use store::{KnowledgeStore, KnowledgeStoreError, RetryError, RetryPolicy, SnapshotLoader};
