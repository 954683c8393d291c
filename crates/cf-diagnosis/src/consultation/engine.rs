use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::evidence::Evidence;
use super::policy::{DuplicateRuleResolution, PolicyError, ScoringPolicy};
use crate::knowledge::{DiseaseId, KnowledgeBase, RuleEntry, SymptomId};

/// Stateless evaluator combining rule evidence with the Certainty Factor model.
#[derive(Debug, Clone)]
pub struct CertaintyFactorEngine {
    policy: ScoringPolicy,
}

impl CertaintyFactorEngine {
    /// Rejects a policy whose acceptance threshold lies outside `[0, 1)`.
    pub fn new(policy: ScoringPolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self { policy })
    }

    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Score every disease of `snapshot` against the frozen `evidence`.
    ///
    /// Rules pointing at a disease, symptom, or scale entry missing from the
    /// snapshot are skipped one by one and reported in the outcome.
    pub fn score(&self, snapshot: &KnowledgeBase, evidence: &Evidence) -> ScoringOutcome {
        let mut qualifying: BTreeMap<DiseaseId, Vec<RuleContribution>> = BTreeMap::new();
        let mut skipped_rules = Vec::new();

        for rule in snapshot.rules() {
            let expert = match check_references(snapshot, rule) {
                Ok(expert) => expert,
                Err(reason) => {
                    warn!(
                        disease_id = %rule.disease_id,
                        symptom_id = %rule.symptom_id,
                        scale_id = %rule.expert_scale_id,
                        reason = reason.label(),
                        "skipping rule with dangling reference"
                    );
                    skipped_rules.push(SkippedRule {
                        rule: *rule,
                        reason,
                    });
                    continue;
                }
            };

            let Some(user) = evidence.certainty(rule.symptom_id) else {
                continue;
            };
            if !self.policy.accepts(user) {
                continue;
            }

            let contribution = RuleContribution {
                symptom_id: rule.symptom_id,
                user_certainty: user,
                expert_certainty: expert,
                evidence: user * expert,
            };
            let contributions = qualifying.entry(rule.disease_id).or_default();

            match self.policy.duplicate_rules {
                DuplicateRuleResolution::Accumulate => contributions.push(contribution),
                DuplicateRuleResolution::Maximum => {
                    match contributions
                        .iter_mut()
                        .find(|existing| existing.symptom_id == contribution.symptom_id)
                    {
                        Some(existing) if contribution.evidence > existing.evidence => {
                            *existing = contribution;
                        }
                        Some(_) => {}
                        None => contributions.push(contribution),
                    }
                }
            }
        }

        let mut results = Vec::new();
        for disease in snapshot.diseases() {
            let contributions = qualifying.remove(&disease.id).unwrap_or_default();
            let combined_cf = combine(contributions.iter().map(|item| item.evidence));
            // Rules weighted 0.0 by the expert still leave the disease at zero.
            if combined_cf <= 0.0 && !self.policy.include_zero_evidence {
                continue;
            }

            results.push(DiagnosisResult {
                disease_id: disease.id,
                disease_code: disease.code.clone(),
                disease_name: disease.name.clone(),
                combined_cf,
                contributions,
            });
        }

        debug!(
            diseases = results.len(),
            skipped = skipped_rules.len(),
            "certainty factor scoring complete"
        );

        ScoringOutcome {
            results,
            skipped_rules,
        }
    }
}

fn check_references(snapshot: &KnowledgeBase, rule: &RuleEntry) -> Result<f64, SkipReason> {
    if snapshot.disease(rule.disease_id).is_none() {
        return Err(SkipReason::UnknownDisease);
    }
    if snapshot.symptom(rule.symptom_id).is_none() {
        return Err(SkipReason::UnknownSymptom);
    }
    snapshot
        .scale()
        .entry(rule.expert_scale_id)
        .map(|entry| entry.value)
        .ok_or(SkipReason::UnknownScaleEntry)
}

/// Parallel combination `1 - prod(1 - e_i)`; an empty set combines to 0.
///
/// Equivalent to folding `acc + e * (1 - acc)` in any order.
pub fn combine<I>(evidence: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let disbelief: f64 = evidence.into_iter().map(|value| 1.0 - value).product();
    (1.0 - disbelief).clamp(0.0, 1.0)
}

/// Evidence contributed by one qualifying rule, kept for explainability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleContribution {
    pub symptom_id: SymptomId,
    pub user_certainty: f64,
    pub expert_certainty: f64,
    pub evidence: f64,
}

/// Combined confidence for one disease, as a fraction in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisResult {
    pub disease_id: DiseaseId,
    pub disease_code: String,
    pub disease_name: String,
    pub combined_cf: f64,
    pub contributions: Vec<RuleContribution>,
}

impl DiagnosisResult {
    /// Confidence scaled to a percentage and rounded to one decimal place.
    pub fn percentage(&self) -> f64 {
        (self.combined_cf * 1000.0).round() / 10.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnknownDisease,
    UnknownSymptom,
    UnknownScaleEntry,
}

impl SkipReason {
    pub const fn label(self) -> &'static str {
        match self {
            SkipReason::UnknownDisease => "unknown_disease",
            SkipReason::UnknownSymptom => "unknown_symptom",
            SkipReason::UnknownScaleEntry => "unknown_scale_entry",
        }
    }
}

/// Rule ignored during scoring because it references a missing entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedRule {
    pub rule: RuleEntry,
    pub reason: SkipReason,
}

/// Engine output: one result per scored disease plus the skipped-rule report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringOutcome {
    pub results: Vec<DiagnosisResult>,
    pub skipped_rules: Vec<SkippedRule>,
}
