use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::dimension::{Dimension, OVERALL_CEILING};
use crate::result::RuleResult;

/// Points earned by one dimension against its ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub earned: f64,
    pub ceiling: f64,
}

impl DimensionScore {
    pub fn new(earned: f64, ceiling: f64) -> Self {
        Self {
            earned: earned.clamp(0.0, ceiling),
            ceiling,
        }
    }
}

/// Per-column summary derived during assessment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldAnalysis {
    /// Fraction of rows where the column holds a non-missing value.
    pub presence_ratio: f64,
    /// Names of rules touching this column that passed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules_passed: Vec<String>,
    /// Names of rules touching this column that failed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules_failed: Vec<String>,
}

/// The unit of hand-off between the orchestrator, the standards evaluator,
/// the audit trail, and the protection guard. Read-only once sealed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssessmentReport {
    /// Sum of dimension scores, in `[0, 100]`.
    pub overall_score: f64,
    /// Per-dimension earned points against the 20-point ceilings.
    pub dimension_scores: BTreeMap<Dimension, DimensionScore>,
    /// Whether `overall_score` met the minimum supplied at sealing time.
    pub passed: bool,
    /// Every rule result produced during the assessment, for traceability.
    pub rule_execution_log: Vec<RuleResult>,
    /// Per-column presence and rule outcomes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub field_analysis: BTreeMap<String, FieldAnalysis>,
    /// Free-form assessment metadata (row counts, timings, standard id).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, JsonValue>,
}

impl AssessmentReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a rule result and fold its score into the owning dimension.
    pub fn push_result(&mut self, result: RuleResult) {
        let entry = self
            .dimension_scores
            .entry(result.dimension)
            .or_insert_with(|| DimensionScore::new(0.0, result.dimension.ceiling()));
        *entry = DimensionScore::new(entry.earned + result.score, entry.ceiling);
        self.rule_execution_log.push(result);
    }

    /// Compute the overall score and the pass flag against `minimum`.
    /// Dimensions with no executed rules contribute zero.
    pub fn seal(&mut self, minimum: f64) {
        for dimension in Dimension::ALL {
            self.dimension_scores
                .entry(dimension)
                .or_insert_with(|| DimensionScore::new(0.0, dimension.ceiling()));
        }
        let total: f64 = self.dimension_scores.values().map(|s| s.earned).sum();
        self.overall_score = total.clamp(0.0, OVERALL_CEILING);
        self.passed = self.overall_score >= minimum;
    }

    /// Earned points for one dimension (zero when absent).
    pub fn dimension_score(&self, dimension: Dimension) -> f64 {
        self.dimension_scores
            .get(&dimension)
            .map(|s| s.earned)
            .unwrap_or(0.0)
    }

    /// Look up a rule's pass flag in the execution log.
    pub fn rule_passed(&self, rule: &str) -> Option<bool> {
        self.rule_execution_log
            .iter()
            .find(|r| r.rule == rule)
            .map(|r| r.valid)
    }

    /// Failed rule results, most significant (largest lost points) first.
    pub fn top_findings(&self, cap: usize) -> Vec<&RuleResult> {
        let mut failed: Vec<&RuleResult> = self
            .rule_execution_log
            .iter()
            .filter(|r| !r.valid)
            .collect();
        failed.sort_by(|a, b| {
            let lost_a = a.weight - a.score;
            let lost_b = b.weight - b.score;
            lost_b
                .partial_cmp(&lost_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.rule.cmp(&b.rule))
        });
        failed.truncate(cap);
        failed
    }
}
