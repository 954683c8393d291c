use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How repeated (disease, symptom) rules contribute evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateRuleResolution {
    /// Keep only the strongest evidence for each pair.
    #[default]
    Maximum,
    /// Treat every duplicate as independent evidence.
    Accumulate,
}

impl DuplicateRuleResolution {
    pub const fn label(self) -> &'static str {
        match self {
            DuplicateRuleResolution::Maximum => "max",
            DuplicateRuleResolution::Accumulate => "accumulate",
        }
    }
}

impl fmt::Display for DuplicateRuleResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for DuplicateRuleResolution {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "max" | "maximum" => Ok(Self::Maximum),
            "accumulate" | "independent" => Ok(Self::Accumulate),
            other => Err(format!(
                "unknown duplicate rule resolution '{other}' (expected 'max' or 'accumulate')"
            )),
        }
    }
}

/// Policy knobs shared by the evidence collector, engine, and ranker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Answers at or below this value count as "symptom not present".
    pub acceptance_threshold: f64,
    pub duplicate_rules: DuplicateRuleResolution,
    /// Report diseases without qualifying evidence at 0 instead of omitting them.
    pub include_zero_evidence: bool,
    /// Number of differential candidates listed after the primary diagnosis.
    pub differential_limit: usize,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.0,
            duplicate_rules: DuplicateRuleResolution::Maximum,
            include_zero_evidence: true,
            differential_limit: 3,
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), PolicyError> {
        let threshold = self.acceptance_threshold;
        if !threshold.is_finite() || !(0.0..1.0).contains(&threshold) {
            return Err(PolicyError::ThresholdOutOfRange(threshold));
        }
        Ok(())
    }

    /// Whether a respondent certainty counts as evidence under this policy.
    pub fn accepts(&self, certainty: f64) -> bool {
        certainty > self.acceptance_threshold
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PolicyError {
    #[error("acceptance threshold {0} must lie within [0, 1)")]
    ThresholdOutOfRange(f64),
}
