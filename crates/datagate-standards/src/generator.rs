//! Standard generation from an observed dataset profile.
//!
//! When no standard exists for a dataset, one is inferred from the data
//! itself: observed columns become field requirements, observed value
//! ranges become plausibility bounds, and low-cardinality string columns
//! become categorical constraints. The generated document is a starting
//! point meant to be reviewed and tightened by hand.

use std::collections::BTreeMap;

use datagate_model::Dimension;

use crate::standard::{
    DimensionRequirement, ExpectedType, FieldRequirement, Requirements, Standard, StandardsMeta,
};

/// Observed shape of one column.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    pub name: String,
    pub inferred_type: ExpectedType,
    pub presence_ratio: f64,
    /// Observed numeric range, when the column is numeric.
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    /// Distinct values, when few enough to treat as categorical.
    pub categories: Option<Vec<String>>,
    /// Observed string length range.
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

/// Observed shape of a whole dataset.
#[derive(Debug, Clone)]
pub struct DatasetProfile {
    pub columns: Vec<ColumnProfile>,
    pub row_count: usize,
}

/// Knobs for standard generation.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Requested pass threshold on the 0-100 scale; scaled down to the
    /// points the derived catalog can actually award.
    pub overall_minimum: f64,
    /// Presence ratio above which a column is treated as mandatory.
    pub mandatory_presence: f64,
    /// Widen observed numeric ranges by this fraction on each side.
    pub range_margin: f64,
    pub authority: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            overall_minimum: 75.0,
            mandatory_presence: 0.99,
            range_margin: 0.1,
            authority: "generated".to_string(),
        }
    }
}

/// Infer a standard from `profile`.
pub fn generate_standard(
    id: &str,
    profile: &DatasetProfile,
    options: &GenerationOptions,
) -> Standard {
    let mut field_requirements = BTreeMap::new();
    let mut mandatory_fields = Vec::new();

    for column in &profile.columns {
        if column.presence_ratio >= options.mandatory_presence {
            mandatory_fields.push(column.name.clone());
        }

        let (min_value, max_value) = widened_range(column, options.range_margin);
        field_requirements.insert(
            column.name.clone(),
            FieldRequirement {
                field_type: Some(column.inferred_type),
                nullable: column.presence_ratio < 1.0,
                allowed_values: column.categories.clone(),
                pattern: None,
                min_length: column.min_length,
                max_length: column.max_length,
                min_value,
                max_value,
            },
        );
    }

    let mut dimension_requirements = BTreeMap::new();
    // A generated standard demands completeness matching what was
    // observed; the other dimensions keep permissive minimums.
    dimension_requirements.insert(
        Dimension::Completeness,
        DimensionRequirement {
            minimum_score: 15.0,
            required_rules: Vec::new(),
            rule_weights: BTreeMap::new(),
        },
    );

    let mut metadata = BTreeMap::new();
    metadata.insert("generated".to_string(), "true".to_string());
    metadata.insert("profiled_rows".to_string(), profile.row_count.to_string());

    // A derived catalog covers at most validity, completeness, and
    // plausibility; dimensions with no rules earn zero points. Scale the
    // requested minimum to what the catalog can actually award so the
    // generated standard does not block the data it was inferred from.
    let mut achievable = 2.0 * Dimension::Completeness.ceiling();
    if profile
        .columns
        .iter()
        .any(|c| c.min_value.is_some() && c.max_value.is_some())
    {
        achievable += Dimension::Plausibility.ceiling();
    }
    let overall_minimum = options.overall_minimum / 100.0 * achievable;

    Standard {
        standards: StandardsMeta {
            id: id.to_string(),
            version: "0.1.0".to_string(),
            authority: options.authority.clone(),
            description: format!("inferred from {} profiled rows", profile.row_count),
            effective_date: None,
        },
        requirements: Requirements {
            overall_minimum,
            dimension_requirements,
            field_requirements,
            mandatory_fields,
            ..Requirements::default()
        },
        certification: None,
        metadata,
    }
}

fn widened_range(column: &ColumnProfile, margin: f64) -> (Option<f64>, Option<f64>) {
    match (column.min_value, column.max_value) {
        (Some(lo), Some(hi)) => {
            let span = (hi - lo).abs().max(hi.abs().max(lo.abs()) * 1e-6);
            (Some(lo - span * margin), Some(hi + span * margin))
        }
        other => other,
    }
}
