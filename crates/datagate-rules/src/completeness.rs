//! Completeness rules: is the data actually there?

use polars::prelude::DataFrame;
use serde_json::json;

use datagate_frame::{column_lookup, presence_ratio};
use datagate_model::{Dimension, RuleResult};

use crate::engine::{conformity_score, details, EXAMPLE_CAP};

/// Presence of mandatory fields across all rows.
///
/// Ratio = populated cells / (fields x rows); a field absent from the
/// frame contributes zero populated cells.
pub fn required_fields(
    df: &DataFrame,
    fields: &[String],
    threshold: f64,
    name: &str,
    weight: f64,
) -> RuleResult {
    if fields.is_empty() {
        return RuleResult::passing(name, Dimension::Completeness, weight, "no required fields");
    }

    let lookup = column_lookup(df);
    let mut total_ratio = 0.0;
    let mut examples = Vec::new();
    let mut per_field = serde_json::Map::new();

    for field in fields {
        let ratio = lookup
            .get(field)
            .map(|actual| presence_ratio(df, actual))
            .unwrap_or(0.0);
        total_ratio += ratio;
        per_field.insert(field.clone(), json!(ratio));
        if ratio < threshold && examples.len() < EXAMPLE_CAP {
            examples.push(format!("{field}: {:.0}% populated", ratio * 100.0));
        }
    }

    let ratio = total_ratio / fields.len() as f64;
    let valid = ratio >= threshold;
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Completeness,
        valid,
        score: conformity_score(weight, ratio, threshold),
        weight,
        narrative: format!(
            "required fields {:.1}% populated (threshold {:.0}%)",
            ratio * 100.0,
            threshold * 100.0
        ),
        examples,
        details: details(&[
            ("ratio", json!(ratio)),
            ("threshold", json!(threshold)),
            ("per_field", json!(per_field)),
        ]),
    }
}

/// Overall cell population across every column, with per-column sparse
/// flags below `column_threshold`.
pub fn population_density(
    df: &DataFrame,
    threshold: f64,
    column_threshold: f64,
    name: &str,
    weight: f64,
) -> RuleResult {
    let columns = df.get_column_names_owned();
    if columns.is_empty() || df.height() == 0 {
        return RuleResult::degraded(
            name,
            Dimension::Completeness,
            weight,
            "empty frame, nothing to measure",
        );
    }

    let mut total = 0.0;
    let mut sparse = Vec::new();
    for column in &columns {
        let ratio = presence_ratio(df, column);
        total += ratio;
        if ratio < column_threshold && sparse.len() < EXAMPLE_CAP {
            sparse.push(format!("{column}: {:.0}% populated", ratio * 100.0));
        }
    }

    let density = total / columns.len() as f64;
    let valid = density >= threshold;
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Completeness,
        valid,
        score: conformity_score(weight, density, threshold),
        weight,
        narrative: format!(
            "overall density {:.1}% (threshold {:.0}%), {} sparse column(s)",
            density * 100.0,
            threshold * 100.0,
            sparse.len()
        ),
        examples: sparse,
        details: details(&[
            ("density", json!(density)),
            ("threshold", json!(threshold)),
            ("column_threshold", json!(column_threshold)),
        ]),
    }
}

/// Expected column names present in the frame, with an optional penalty
/// for unexpected extras.
pub fn schema_completeness(
    df: &DataFrame,
    expected_fields: &[String],
    case_insensitive: bool,
    allow_extra: bool,
    name: &str,
    weight: f64,
) -> RuleResult {
    if expected_fields.is_empty() {
        return RuleResult::passing(name, Dimension::Completeness, weight, "no expected schema");
    }

    let actual = df.get_column_names_owned();
    let lookup = column_lookup(df);
    let has = |field: &str| -> bool {
        if case_insensitive {
            lookup.contains(field)
        } else {
            actual.iter().any(|c| c.as_str() == field)
        }
    };

    let mut missing = Vec::new();
    let mut present = 0usize;
    for field in expected_fields {
        if has(field) {
            present += 1;
        } else if missing.len() < EXAMPLE_CAP {
            missing.push(field.clone());
        }
    }

    let expected_probe: Vec<String> = if case_insensitive {
        expected_fields.iter().map(|f| f.to_uppercase()).collect()
    } else {
        expected_fields.to_vec()
    };
    let extra: Vec<String> = actual
        .iter()
        .filter(|c| {
            let probe = if case_insensitive {
                c.to_uppercase()
            } else {
                c.to_string()
            };
            !expected_probe.contains(&probe)
        })
        .map(|c| c.to_string())
        .collect();

    let mut ratio = present as f64 / expected_fields.len() as f64;
    if !allow_extra && !actual.is_empty() {
        ratio = (ratio - (extra.len() as f64 / actual.len() as f64) * 0.5).max(0.0);
    }

    let valid = missing.is_empty() && (allow_extra || extra.is_empty());
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Completeness,
        valid,
        score: (weight * ratio).clamp(0.0, weight),
        weight,
        narrative: format!(
            "{present}/{} expected columns present, {} unexpected",
            expected_fields.len(),
            extra.len()
        ),
        examples: missing,
        details: details(&[
            ("present", json!(present)),
            ("expected", json!(expected_fields.len())),
            ("extra_columns", json!(extra)),
        ]),
    }
}
