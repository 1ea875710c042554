use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::dimension::Dimension;

/// How many offending examples a rule carries in its result.
pub const EXAMPLE_CAP: usize = 5;

/// Outcome of one rule evaluation.
///
/// Invariant: `0 <= score <= weight`, and `score == weight` whenever the
/// computed conformity ratio is 1.0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleResult {
    /// Rule name (e.g. "required_fields", "outlier_detection").
    pub rule: String,
    /// Quality dimension the rule scores into.
    pub dimension: Dimension,
    /// Whether the rule considers the data acceptable.
    pub valid: bool,
    /// Points earned, in `[0, weight]`.
    pub score: f64,
    /// Maximum points this rule can contribute.
    pub weight: f64,
    /// Human-readable explanation of the outcome.
    pub narrative: String,
    /// Offending values or row references, capped at [`EXAMPLE_CAP`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
    /// Rule-specific detail fields (counts, ratios, statistics).
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, JsonValue>,
}

impl RuleResult {
    /// Build a result from a conformity ratio in `[0, 1]`.
    ///
    /// `score = weight * ratio`, clamped so the invariant holds even for
    /// ratios produced by floating-point drift.
    pub fn from_ratio(
        rule: impl Into<String>,
        dimension: Dimension,
        weight: f64,
        ratio: f64,
        valid: bool,
        narrative: impl Into<String>,
    ) -> Self {
        let score = (weight * ratio).clamp(0.0, weight);
        Self {
            rule: rule.into(),
            dimension,
            valid,
            score,
            weight,
            narrative: narrative.into(),
            examples: Vec::new(),
            details: Map::new(),
        }
    }

    /// A fully conforming result.
    pub fn passing(
        rule: impl Into<String>,
        dimension: Dimension,
        weight: f64,
        narrative: impl Into<String>,
    ) -> Self {
        Self::from_ratio(rule, dimension, weight, 1.0, true, narrative)
    }

    /// A zero-score result for a rule that could not run (missing column,
    /// malformed config). Evaluation degradation is absorbed here rather
    /// than propagated.
    pub fn degraded(
        rule: impl Into<String>,
        dimension: Dimension,
        weight: f64,
        narrative: impl Into<String>,
    ) -> Self {
        Self::from_ratio(rule, dimension, weight, 0.0, false, narrative)
    }

    /// Attach offending examples, truncating at [`EXAMPLE_CAP`].
    #[must_use]
    pub fn with_examples(mut self, examples: Vec<String>) -> Self {
        self.examples = examples;
        self.examples.truncate(EXAMPLE_CAP);
        self
    }

    /// Attach a rule-specific detail field.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.details.insert(key.into(), value);
        self
    }
}
