use crate::infra::{parse_answer, InMemoryConsultationRecorder};
use cf_diagnosis::config::{AppConfig, ScoringConfig};
use cf_diagnosis::consultation::{
    ConsultationReport, ConsultationService, DuplicateRuleResolution, RecordingStatus,
};
use cf_diagnosis::error::AppError;
use cf_diagnosis::knowledge::{CsvKnowledgeStore, KnowledgeBase, SymptomId};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct QuestionnaireArgs {
    /// Directory holding the knowledge base CSV files (defaults to CF_KNOWLEDGE_DIR)
    #[arg(long)]
    pub(crate) knowledge_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DiagnoseArgs {
    /// Answer for one symptom as SYMPTOM_ID=VALUE; every symptom must be answered
    #[arg(long = "answer", value_name = "SYMPTOM_ID=VALUE", value_parser = parse_answer)]
    pub(crate) answers: Vec<(SymptomId, f64)>,
    /// Directory holding the knowledge base CSV files (defaults to CF_KNOWLEDGE_DIR)
    #[arg(long)]
    pub(crate) knowledge_dir: Option<PathBuf>,
    /// Answers at or below this certainty count as "not present"
    #[arg(long)]
    pub(crate) threshold: Option<f64>,
    /// Treat duplicate disease/symptom rules as independent evidence
    #[arg(long)]
    pub(crate) accumulate_duplicates: bool,
    /// Leave diseases without any evidence out of the ranking
    #[arg(long)]
    pub(crate) omit_zero: bool,
    /// Print the full report as JSON
    #[arg(long)]
    pub(crate) json: bool,
}

fn scoring_config(knowledge_dir: Option<PathBuf>) -> Result<ScoringConfig, AppError> {
    let mut scoring = AppConfig::load()?.scoring;
    if let Some(dir) = knowledge_dir {
        scoring.knowledge_dir = dir;
    }
    Ok(scoring)
}

fn build_service(
    scoring: ScoringConfig,
) -> Result<ConsultationService<CsvKnowledgeStore, InMemoryConsultationRecorder>, AppError> {
    let service = ConsultationService::with_retry(
        Arc::new(CsvKnowledgeStore::new(&scoring.knowledge_dir)),
        Arc::new(InMemoryConsultationRecorder::default()),
        scoring.policy,
        scoring.retry,
    )?;
    Ok(service)
}

pub(crate) fn run_questionnaire(args: QuestionnaireArgs) -> Result<(), AppError> {
    let service = build_service(scoring_config(args.knowledge_dir)?)?;
    let questionnaire = service.questionnaire()?;

    println!("Answer options");
    for option in &questionnaire.options {
        println!("- {:.1} {}", option.value, option.label);
    }

    println!("\nSymptoms ({})", questionnaire.symptoms.len());
    for symptom in &questionnaire.symptoms {
        println!("- [{}] {}: {}", symptom.id, symptom.code, symptom.description);
    }

    Ok(())
}

pub(crate) fn run_diagnose(args: DiagnoseArgs) -> Result<(), AppError> {
    let DiagnoseArgs {
        answers,
        knowledge_dir,
        threshold,
        accumulate_duplicates,
        omit_zero,
        json,
    } = args;

    let mut scoring = scoring_config(knowledge_dir)?;
    if let Some(threshold) = threshold {
        scoring.policy.acceptance_threshold = threshold;
    }
    if accumulate_duplicates {
        scoring.policy.duplicate_rules = DuplicateRuleResolution::Accumulate;
    }
    if omit_zero {
        scoring.policy.include_zero_evidence = false;
    }
    let service = build_service(scoring)?;
    let mut session = service.begin()?;
    for (symptom_id, certainty) in answers {
        session.record_answer(symptom_id, certainty)?;
    }

    if !session.is_complete() {
        let snapshot = session.snapshot();
        eprintln!("Unanswered symptoms:");
        for id in session.missing() {
            if let Some(symptom) = snapshot.symptom(id) {
                eprintln!("- {} {}: {}", id, symptom.code, symptom.description);
            }
        }
    }

    let snapshot = Arc::clone(session.snapshot());
    let report = service.diagnose(session)?;

    if json {
        match serde_json::to_string_pretty(&report) {
            Ok(body) => println!("{body}"),
            Err(err) => println!("Report unavailable as JSON: {err}"),
        }
    } else {
        render_report(&snapshot, &report);
    }

    Ok(())
}

pub(crate) fn render_report(snapshot: &KnowledgeBase, report: &ConsultationReport) {
    let ranking = &report.ranking;

    match ranking.primary.as_ref().filter(|_| ranking.is_conclusive()) {
        Some(primary) => println!(
            "Diagnosis: {} ({}) {:.1}%",
            primary.disease_name,
            primary.disease_code,
            primary.percentage()
        ),
        None => println!("Diagnosis: not diagnosed (no reported symptom matched a rule)"),
    }

    if !ranking.differential.is_empty() {
        println!("\nDifferential");
        for candidate in &ranking.differential {
            println!(
                "- {} ({}) {:.1}%",
                candidate.disease_name,
                candidate.disease_code,
                candidate.percentage()
            );
        }
    }

    println!("\nReported symptoms");
    if ranking.evidence_list.is_empty() {
        println!("- none");
    }
    for entry in &ranking.evidence_list {
        let label = snapshot
            .scale()
            .entry_for_value(entry.certainty)
            .map(|scale| scale.label.as_str())
            .unwrap_or("-");
        match snapshot.symptom(entry.symptom_id) {
            Some(symptom) => println!(
                "- {} {}: {} ({:.1})",
                symptom.code, symptom.description, label, entry.certainty
            ),
            None => println!("- {}: {} ({:.1})", entry.symptom_id, label, entry.certainty),
        }
    }

    if let Some(advice) = &report.advice {
        println!("\nAdvice: {advice}");
    }

    if !report.skipped_rules.is_empty() {
        println!("\nSkipped rules ({})", report.skipped_rules.len());
        for skipped in &report.skipped_rules {
            println!(
                "- disease {} / symptom {} / scale {}: {}",
                skipped.rule.disease_id,
                skipped.rule.symptom_id,
                skipped.rule.expert_scale_id,
                skipped.reason.label()
            );
        }
    }

    match &report.recording {
        RecordingStatus::Recorded {
            consultation_id,
            recorded_at,
        } => println!(
            "\nRecorded as {} at {}",
            consultation_id.0,
            recorded_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        RecordingStatus::Failed { reason } => println!("\nNot recorded: {reason}"),
    }
}
