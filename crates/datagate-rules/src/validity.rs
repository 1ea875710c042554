//! Validity rules: do values conform to their declared shape?

use polars::prelude::{AnyValue, DataFrame};
use regex::Regex;
use serde_json::json;

use datagate_frame::{
    is_missing_value, value_to_date, value_to_f64, value_to_string,
};
use datagate_model::{Dimension, RuleResult};
use datagate_standards::standard::ExpectedType;

use crate::engine::{conformity_score, details, for_each_cell, ratio_of, EXAMPLE_CAP};

/// Share of non-missing values parseable as the expected type.
pub fn type_consistency(
    df: &DataFrame,
    column: &str,
    expected: ExpectedType,
    threshold: f64,
    name: &str,
    weight: f64,
) -> RuleResult {
    let mut checked = 0usize;
    let mut conforming = 0usize;
    let mut examples = Vec::new();

    for_each_cell(df, column, |value| {
        if is_missing_value(value) {
            return;
        }
        checked += 1;
        if matches_type(value, expected) {
            conforming += 1;
        } else if examples.len() < EXAMPLE_CAP {
            examples.push(value_to_string(value));
        }
    });

    let ratio = if checked == 0 {
        1.0
    } else {
        conforming as f64 / checked as f64
    };
    let valid = ratio >= threshold;
    let narrative = if valid {
        format!("{column}: all checked values parse as {expected:?}")
    } else {
        format!(
            "{column}: {}/{checked} values fail to parse as {expected:?}",
            checked - conforming
        )
    };
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Validity,
        valid,
        score: conformity_score(weight, ratio, threshold),
        weight,
        narrative,
        examples,
        details: details(&[
            ("checked", json!(checked)),
            ("conforming", json!(conforming)),
            ("ratio", json!(ratio)),
        ]),
    }
}

fn matches_type(value: &AnyValue<'_>, expected: ExpectedType) -> bool {
    match expected {
        ExpectedType::String => true,
        ExpectedType::Numeric => value_to_f64(value).is_some(),
        ExpectedType::Date => value_to_date(value).is_some(),
        ExpectedType::Boolean => match value {
            AnyValue::Boolean(_) => true,
            other => matches!(
                value_to_string(other).trim().to_lowercase().as_str(),
                "true" | "false" | "0" | "1" | "yes" | "no"
            ),
        },
    }
}

/// Share of non-missing values found in the allowed set.
pub fn allowed_values(
    df: &DataFrame,
    column: &str,
    allowed: &[String],
    case_insensitive: bool,
    name: &str,
    weight: f64,
) -> RuleResult {
    let normalized: Vec<String> = if case_insensitive {
        allowed.iter().map(|v| v.to_lowercase()).collect()
    } else {
        allowed.to_vec()
    };

    let mut checked = 0usize;
    let mut conforming = 0usize;
    let mut examples = Vec::new();

    for_each_cell(df, column, |value| {
        if is_missing_value(value) {
            return;
        }
        checked += 1;
        let text = value_to_string(value).trim().to_string();
        let probe = if case_insensitive {
            text.to_lowercase()
        } else {
            text.clone()
        };
        if normalized.iter().any(|a| *a == probe) {
            conforming += 1;
        } else if examples.len() < EXAMPLE_CAP {
            examples.push(text);
        }
    });

    let ratio = ratio_of(conforming, checked);
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Validity,
        valid: conforming == checked,
        score: (weight * ratio).clamp(0.0, weight),
        weight,
        narrative: format!(
            "{column}: {conforming}/{checked} values in the allowed set"
        ),
        examples,
        details: details(&[
            ("checked", json!(checked)),
            ("conforming", json!(conforming)),
        ]),
    }
}

/// Share of non-missing values fully matching the pattern.
pub fn format_pattern(
    df: &DataFrame,
    column: &str,
    pattern: &str,
    name: &str,
    weight: f64,
) -> RuleResult {
    let anchored = format!("^(?:{pattern})$");
    let regex = match Regex::new(&anchored) {
        Ok(regex) => regex,
        Err(e) => {
            return RuleResult::degraded(
                name,
                Dimension::Validity,
                weight,
                format!("invalid pattern '{pattern}': {e}"),
            );
        }
    };

    let mut checked = 0usize;
    let mut conforming = 0usize;
    let mut examples = Vec::new();

    for_each_cell(df, column, |value| {
        if is_missing_value(value) {
            return;
        }
        checked += 1;
        let text = value_to_string(value);
        if regex.is_match(text.trim()) {
            conforming += 1;
        } else if examples.len() < EXAMPLE_CAP {
            examples.push(text);
        }
    });

    let ratio = ratio_of(conforming, checked);
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Validity,
        valid: conforming == checked,
        score: (weight * ratio).clamp(0.0, weight),
        weight,
        narrative: format!("{column}: {conforming}/{checked} values match '{pattern}'"),
        examples,
        details: details(&[
            ("checked", json!(checked)),
            ("conforming", json!(conforming)),
            ("pattern", json!(pattern)),
        ]),
    }
}

/// Share of non-missing values whose character length is in bounds.
pub fn length_bounds(
    df: &DataFrame,
    column: &str,
    min_length: Option<usize>,
    max_length: Option<usize>,
    name: &str,
    weight: f64,
) -> RuleResult {
    let mut checked = 0usize;
    let mut conforming = 0usize;
    let mut examples = Vec::new();

    for_each_cell(df, column, |value| {
        if is_missing_value(value) {
            return;
        }
        checked += 1;
        let text = value_to_string(value);
        let len = text.chars().count();
        let ok = min_length.is_none_or(|min| len >= min)
            && max_length.is_none_or(|max| len <= max);
        if ok {
            conforming += 1;
        } else if examples.len() < EXAMPLE_CAP {
            examples.push(text);
        }
    });

    let ratio = ratio_of(conforming, checked);
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Validity,
        valid: conforming == checked,
        score: (weight * ratio).clamp(0.0, weight),
        weight,
        narrative: format!("{column}: {conforming}/{checked} values within length bounds"),
        examples,
        details: details(&[
            ("checked", json!(checked)),
            ("conforming", json!(conforming)),
        ]),
    }
}

/// Composite-key uniqueness over the given columns.
pub fn primary_key_unique(
    df: &DataFrame,
    columns: &[String],
    name: &str,
    weight: f64,
) -> RuleResult {
    use std::collections::HashMap;

    let height = df.height();
    let series: Vec<_> = columns
        .iter()
        .filter_map(|c| df.column(c).ok())
        .collect();
    if series.len() != columns.len() {
        let missing: Vec<&str> = columns
            .iter()
            .filter(|c| df.column(c).is_err())
            .map(String::as_str)
            .collect();
        return RuleResult::degraded(
            name,
            Dimension::Validity,
            weight,
            format!("key columns not found: {}", missing.join(", ")),
        );
    }

    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut duplicates = 0usize;
    let mut examples = Vec::new();

    for idx in 0..height {
        let key = series
            .iter()
            .map(|s| value_to_string(&s.get(idx).unwrap_or(AnyValue::Null)))
            .collect::<Vec<_>>()
            .join("\u{1f}");
        let count = seen.entry(key.clone()).or_insert(0);
        *count += 1;
        if *count > 1 {
            duplicates += 1;
            if examples.len() < EXAMPLE_CAP {
                examples.push(key.replace('\u{1f}', "|"));
            }
        }
    }

    let ratio = if height == 0 {
        1.0
    } else {
        (height - duplicates) as f64 / height as f64
    };
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Validity,
        valid: duplicates == 0,
        score: (weight * ratio).clamp(0.0, weight),
        weight,
        narrative: format!(
            "{duplicates} duplicate key(s) over ({})",
            columns.join(", ")
        ),
        examples,
        details: details(&[
            ("rows", json!(height)),
            ("duplicates", json!(duplicates)),
        ]),
    }
}

