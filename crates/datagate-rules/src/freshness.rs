//! Freshness rules: is the data recent enough to act on?

use chrono::{NaiveDate, Utc};
use polars::prelude::{AnyValue, DataFrame};
use serde_json::json;

use datagate_frame::{is_missing_value, value_to_date, value_to_string};
use datagate_model::{Dimension, RuleResult};

use crate::engine::{details, EXAMPLE_CAP};

fn reference_date(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Utc::now().date_naive())
}

/// Share of rows whose date falls within the freshness window.
pub fn recency(
    df: &DataFrame,
    column: &str,
    max_age_days: i64,
    as_of: Option<NaiveDate>,
    name: &str,
    weight: f64,
) -> RuleResult {
    let Ok(series) = df.column(column) else {
        return RuleResult::degraded(
            name,
            Dimension::Freshness,
            weight,
            format!("column '{column}' not found"),
        );
    };
    let today = reference_date(as_of);

    let mut checked = 0usize;
    let mut fresh = 0usize;
    let mut unparseable = 0usize;
    let mut examples = Vec::new();

    for idx in 0..df.height() {
        let value = series.get(idx).unwrap_or(AnyValue::Null);
        if is_missing_value(&value) {
            continue;
        }
        checked += 1;
        match value_to_date(&value) {
            Some(date) => {
                let age = (today - date).num_days();
                if age <= max_age_days {
                    fresh += 1;
                } else if examples.len() < EXAMPLE_CAP {
                    examples.push(format!("row {idx}: {date} ({age} days old)"));
                }
            }
            None => {
                unparseable += 1;
                if examples.len() < EXAMPLE_CAP {
                    examples.push(format!("row {idx}: unparseable '{}'", value_to_string(&value)));
                }
            }
        }
    }

    let fresh_ratio = if checked == 0 {
        1.0
    } else {
        fresh as f64 / checked as f64
    };
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Freshness,
        valid: fresh == checked,
        score: (weight * fresh_ratio).clamp(0.0, weight),
        weight,
        narrative: format!(
            "{column}: {:.1}% of rows within {max_age_days} day(s) of {today}",
            fresh_ratio * 100.0
        ),
        examples,
        details: details(&[
            ("checked", json!(checked)),
            ("fresh", json!(fresh)),
            ("unparseable", json!(unparseable)),
            ("fresh_ratio", json!(fresh_ratio)),
            ("max_age_days", json!(max_age_days)),
        ]),
    }
}

/// The newest value in the column must fall inside the window.
/// Binary: full score or zero.
pub fn last_update_within(
    df: &DataFrame,
    column: &str,
    max_age_days: i64,
    as_of: Option<NaiveDate>,
    name: &str,
    weight: f64,
) -> RuleResult {
    let Ok(series) = df.column(column) else {
        return RuleResult::degraded(
            name,
            Dimension::Freshness,
            weight,
            format!("column '{column}' not found"),
        );
    };
    let today = reference_date(as_of);

    let mut newest: Option<NaiveDate> = None;
    for idx in 0..df.height() {
        let value = series.get(idx).unwrap_or(AnyValue::Null);
        if let Some(date) = value_to_date(&value) {
            newest = Some(newest.map_or(date, |current| current.max(date)));
        }
    }

    let Some(newest) = newest else {
        return RuleResult::degraded(
            name,
            Dimension::Freshness,
            weight,
            format!("{column}: no parseable dates"),
        );
    };

    let age = (today - newest).num_days();
    let valid = age <= max_age_days;
    RuleResult {
        rule: name.to_string(),
        dimension: Dimension::Freshness,
        valid,
        score: if valid { weight } else { 0.0 },
        weight,
        narrative: format!(
            "{column}: last update {newest} is {age} day(s) old (window {max_age_days})"
        ),
        examples: Vec::new(),
        details: details(&[
            ("newest", json!(newest.to_string())),
            ("age_days", json!(age)),
            ("max_age_days", json!(max_age_days)),
        ]),
    }
}
