use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use cf_diagnosis::knowledge::{
    CsvKnowledgeStore, DiseaseId, KnowledgeBaseError, KnowledgeStore, KnowledgeStoreError,
    RetryPolicy, SnapshotLoader, DISEASES_FILE, RULES_FILE, SCALE_FILE, SYMPTOMS_FILE,
};

fn sample_dir() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/../../data"))
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cf-diagnosis-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create scratch dir");
    for file in [DISEASES_FILE, SYMPTOMS_FILE, SCALE_FILE, RULES_FILE] {
        fs::copy(sample_dir().join(file), dir.join(file)).expect("copy sample table");
    }
    dir
}

#[test]
fn sample_knowledge_base_loads_into_snapshot() {
    let loader = SnapshotLoader::new(
        Arc::new(CsvKnowledgeStore::new(sample_dir())),
        RetryPolicy::none(),
    );
    let snapshot = loader.load().expect("sample data loads");

    assert_eq!(snapshot.diseases().count(), 10);
    assert_eq!(snapshot.symptoms().len(), 16);
    assert_eq!(snapshot.scale().entries().len(), 6);
    assert!(!snapshot.rules().is_empty());

    let zero = snapshot.scale().zero().expect("scale has a zero entry");
    assert_eq!(zero.label, "Tidak");

    let gerd = snapshot.disease(DiseaseId(6)).expect("GERD present");
    assert_eq!(gerd.name, "GERD");
    assert!(gerd
        .advice
        .as_deref()
        .is_some_and(|advice| advice.starts_with("Omeprazole, Polysilane.")));
}

#[test]
fn symptoms_follow_natural_code_order() {
    let records = CsvKnowledgeStore::new(sample_dir())
        .load()
        .expect("sample data loads");
    let snapshot =
        cf_diagnosis::knowledge::KnowledgeBase::from_records(records).expect("valid snapshot");

    let codes: Vec<&str> = snapshot
        .symptoms()
        .iter()
        .map(|symptom| symptom.code.as_str())
        .collect();
    assert_eq!(&codes[8..11], &["G9", "G10", "G11"]);
    assert_eq!(codes.last(), Some(&"G16"));
}

#[test]
fn out_of_range_scale_value_is_a_permanent_error() {
    let dir = scratch_dir("bad-scale");
    fs::write(
        dir.join(SCALE_FILE),
        "id,label,value\n1,Tidak,0\n2,Sangat Yakin,1.4\n",
    )
    .expect("write scale");

    let loader = SnapshotLoader::new(
        Arc::new(CsvKnowledgeStore::new(&dir)),
        RetryPolicy::default(),
    );
    let error = loader.load().expect_err("scale rejected");

    assert!(!error.is_transient());
    assert!(matches!(
        error,
        KnowledgeStoreError::Schema(KnowledgeBaseError::ScaleValueOutOfRange { .. })
    ));
    fs::remove_dir_all(dir).ok();
}

#[test]
fn missing_table_reports_its_path() {
    let dir = scratch_dir("missing-rules");
    fs::remove_file(dir.join(RULES_FILE)).expect("remove rules");

    let error = CsvKnowledgeStore::new(&dir)
        .load()
        .expect_err("rules table missing");

    match error {
        KnowledgeStoreError::Io { path, .. } => assert!(path.ends_with(RULES_FILE)),
        other => panic!("unexpected error: {other:?}"),
    }
    fs::remove_dir_all(dir).ok();
}
