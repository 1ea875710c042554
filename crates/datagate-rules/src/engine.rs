//! Rule dispatch: one entry point mapping a catalog spec onto its
//! evaluator.

use polars::prelude::DataFrame;

use datagate_frame::column_lookup;
use datagate_model::RuleResult;
use datagate_standards::{CheckKind, RuleSpec};

pub(crate) use datagate_model::result::EXAMPLE_CAP;

use crate::{completeness, consistency, freshness, plausibility, validity};

/// Evaluate one rule against the frame.
///
/// Never errors: a rule that cannot run (missing column, invalid
/// pattern, too little data) produces a zero-score result whose
/// narrative says why.
pub fn evaluate_rule(df: &DataFrame, spec: &RuleSpec) -> RuleResult {
    let name = spec.name.as_str();
    let weight = spec.weight;

    // Single-column checks resolve their column case-insensitively up
    // front; multi-column checks resolve internally.
    let resolved_column = |column: &str| -> Result<String, RuleResult> {
        let lookup = column_lookup(df);
        lookup.get(column).map(str::to_string).ok_or_else(|| {
            RuleResult::degraded(
                name,
                spec.dimension,
                weight,
                format!("column '{column}' not found"),
            )
        })
    };

    match &spec.check {
        CheckKind::TypeConsistency {
            column,
            expected,
            threshold,
        } => match resolved_column(column) {
            Ok(column) => {
                validity::type_consistency(df, &column, *expected, *threshold, name, weight)
            }
            Err(degraded) => degraded,
        },
        CheckKind::AllowedValues {
            column,
            allowed,
            case_insensitive,
        } => match resolved_column(column) {
            Ok(column) => {
                validity::allowed_values(df, &column, allowed, *case_insensitive, name, weight)
            }
            Err(degraded) => degraded,
        },
        CheckKind::FormatPattern { column, pattern } => match resolved_column(column) {
            Ok(column) => validity::format_pattern(df, &column, pattern, name, weight),
            Err(degraded) => degraded,
        },
        CheckKind::LengthBounds {
            column,
            min_length,
            max_length,
        } => match resolved_column(column) {
            Ok(column) => {
                validity::length_bounds(df, &column, *min_length, *max_length, name, weight)
            }
            Err(degraded) => degraded,
        },
        CheckKind::PrimaryKeyUnique { columns } => {
            let lookup = column_lookup(df);
            let resolved: Vec<String> = columns
                .iter()
                .map(|c| lookup.get(c).unwrap_or(c).to_string())
                .collect();
            validity::primary_key_unique(df, &resolved, name, weight)
        }
        CheckKind::RequiredFields { fields, threshold } => {
            completeness::required_fields(df, fields, *threshold, name, weight)
        }
        CheckKind::PopulationDensity {
            threshold,
            column_threshold,
        } => completeness::population_density(df, *threshold, *column_threshold, name, weight),
        CheckKind::SchemaCompleteness {
            expected_fields,
            case_insensitive,
            allow_extra,
        } => completeness::schema_completeness(
            df,
            expected_fields,
            *case_insensitive,
            *allow_extra,
            name,
            weight,
        ),
        CheckKind::CrossField { mode } => consistency::cross_field(df, mode, name, weight),
        CheckKind::CalculationConsistency {
            expression,
            target_column,
            tolerance,
        } => consistency::calculation_consistency(
            df,
            expression,
            target_column,
            *tolerance,
            name,
            weight,
        ),
        CheckKind::UniformRepresentation { column, format } => match resolved_column(column) {
            Ok(column) => consistency::uniform_representation(df, &column, format, name, weight),
            Err(degraded) => degraded,
        },
        CheckKind::Recency {
            column,
            max_age_days,
            as_of,
        } => match resolved_column(column) {
            Ok(column) => freshness::recency(df, &column, *max_age_days, *as_of, name, weight),
            Err(degraded) => degraded,
        },
        CheckKind::LastUpdateWithin {
            column,
            max_age_days,
            as_of,
        } => match resolved_column(column) {
            Ok(column) => {
                freshness::last_update_within(df, &column, *max_age_days, *as_of, name, weight)
            }
            Err(degraded) => degraded,
        },
        CheckKind::OutlierDetection {
            column,
            method,
            threshold,
            multiplier,
            exclude_outliers,
        } => match resolved_column(column) {
            Ok(column) => plausibility::outlier_detection(
                df,
                &column,
                *method,
                *threshold,
                *multiplier,
                *exclude_outliers,
                name,
                weight,
            ),
            Err(degraded) => degraded,
        },
        CheckKind::ValueDistribution {
            column,
            distribution,
            p_threshold,
        } => match resolved_column(column) {
            Ok(column) => plausibility::value_distribution(
                df,
                &column,
                distribution,
                *p_threshold,
                name,
                weight,
            ),
            Err(degraded) => degraded,
        },
        CheckKind::RangeCheck {
            column,
            min,
            max,
            log_scale,
            quantile_bounds,
        } => match resolved_column(column) {
            Ok(column) => plausibility::range_check(
                df,
                &column,
                *min,
                *max,
                *log_scale,
                *quantile_bounds,
                name,
                weight,
            ),
            Err(degraded) => degraded,
        },
        CheckKind::PatternFrequency {
            column,
            min_frequency,
            max_frequency,
            expected_frequencies,
            tolerance,
            max_distinct,
        } => match resolved_column(column) {
            Ok(column) => plausibility::pattern_frequency(
                df,
                &column,
                *min_frequency,
                *max_frequency,
                expected_frequencies,
                *tolerance,
                *max_distinct,
                name,
                weight,
            ),
            Err(degraded) => degraded,
        },
    }
}

/// Threshold-relative score: full credit once the conformity ratio
/// reaches the threshold, proportional credit below it.
pub(crate) fn conformity_score(weight: f64, ratio: f64, threshold: f64) -> f64 {
    let scaled = if threshold > 0.0 && threshold < 1.0 {
        (ratio / threshold).min(1.0)
    } else {
        ratio
    };
    (weight * scaled).clamp(0.0, weight)
}

/// Conformity over zero checked values counts as fully conforming.
pub(crate) fn ratio_of(conforming: usize, checked: usize) -> f64 {
    if checked == 0 {
        1.0
    } else {
        conforming as f64 / checked as f64
    }
}

pub(crate) fn for_each_cell<F>(df: &DataFrame, column: &str, mut f: F)
where
    F: FnMut(&polars::prelude::AnyValue<'_>),
{
    let Ok(series) = df.column(column) else {
        return;
    };
    for idx in 0..df.height() {
        let value = series.get(idx).unwrap_or(polars::prelude::AnyValue::Null);
        f(&value);
    }
}

pub(crate) fn details(
    pairs: &[(&str, serde_json::Value)],
) -> serde_json::Map<String, serde_json::Value> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}
